//! Voice style embeddings stored as a NumPy `.npz` archive.
//!
//! Each archive member `<name>.npy` is a C-order `float32` matrix; row `i` is
//! the style vector for an input of length `i`.  Only the NPY subset the
//! model ships with is read: format 1.0/2.0, `f4`, C order.

use std::{collections::HashMap, io::Read, path::Path};

use anyhow::{bail, ensure, Context, Result};
use zip::ZipArchive;

/// One voice: `rows × cols` style matrix, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleMatrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f32>,
}

impl StyleMatrix {
    /// Style row for an input of `len` characters, clamped to the last row.
    pub fn row_for(&self, len: usize) -> &[f32] {
        let i = len.min(self.rows.saturating_sub(1));
        &self.data[i * self.cols..(i + 1) * self.cols]
    }
}

pub type VoiceBank = HashMap<String, StyleMatrix>;

/// Read every member of the archive at `path`.
pub fn load_voices(path: &Path) -> Result<VoiceBank> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Cannot open voices file: {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("Cannot open ZIP archive: {}", path.display()))?;

    let mut bank = VoiceBank::new();
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).context("Failed to read ZIP entry")?;
        let name = entry.name().trim_end_matches(".npy").to_string();
        let mut buf = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut buf).context("Failed to read NPY entry")?;

        let (shape, data) = parse_npy(&buf).with_context(|| format!("Bad voice '{name}'"))?;
        let (rows, cols) = match shape.as_slice() {
            [rows, cols] => (*rows, *cols),
            [cols] => (1, *cols),
            other => bail!("voice '{name}' has shape {other:?}, expected 1-D or 2-D"),
        };
        ensure!(rows > 0 && cols > 0, "voice '{name}' is empty");
        bank.insert(name, StyleMatrix { rows, cols, data });
    }
    Ok(bank)
}

/// Parse an `.npy` buffer into `(shape, values)`.
pub fn parse_npy(data: &[u8]) -> Result<(Vec<usize>, Vec<f32>)> {
    ensure!(data.len() >= 10 && &data[..6] == b"\x93NUMPY", "Not a valid NPY file (bad magic)");

    let (header_len, header_start) = match data[6] {
        1 => (u16::from_le_bytes([data[8], data[9]]) as usize, 10),
        2 => {
            ensure!(data.len() >= 12, "NPY v2 file too short");
            (u32::from_le_bytes([data[8], data[9], data[10], data[11]]) as usize, 12)
        }
        major => bail!("Unsupported NPY version {major}.{}", data[7]),
    };
    let header_end = header_start + header_len;
    ensure!(data.len() >= header_end, "NPY file truncated in header");
    let header = std::str::from_utf8(&data[header_start..header_end]).context("NPY header is not valid UTF-8")?;

    let descr = header_field(header, "descr").context("NPY header missing 'descr'")?;
    let big_endian = match descr {
        "<f4" | "=f4" | "|f4" => false,
        ">f4" => true,
        other => bail!("Unsupported dtype '{other}', only float32 is supported"),
    };
    if header_field(header, "fortran_order").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        bail!("Fortran-order arrays are not supported");
    }
    let shape = parse_shape(header_field(header, "shape").context("NPY header missing 'shape'")?)?;

    let count: usize = shape.iter().product();
    let body = &data[header_end..];
    ensure!(body.len() >= count * 4, "NPY data too short: expected {} bytes, got {}", count * 4, body.len());

    let values = body[..count * 4]
        .chunks_exact(4)
        .map(|b| {
            let bytes = [b[0], b[1], b[2], b[3]];
            if big_endian { f32::from_be_bytes(bytes) } else { f32::from_le_bytes(bytes) }
        })
        .collect();
    Ok((shape, values))
}

/// Value of `key` in the Python-literal header dict: a quoted string's
/// contents, a whole tuple, or a bare word.
fn header_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = [format!("'{key}':"), format!("\"{key}\":")]
        .iter()
        .find_map(|k| header.find(k.as_str()).map(|p| p + k.len()))?;
    let rest = header[start..].trim_start();

    match rest.chars().next()? {
        '(' => rest.find(')').map(|end| &rest[..=end]),
        q @ ('\'' | '"') => {
            let inner = &rest[1..];
            inner.find(q).map(|end| &inner[..end])
        }
        _ => {
            let end = rest.find([',', '}']).unwrap_or(rest.len());
            Some(rest[..end].trim())
        }
    }
}

/// `(256, 512, )`, `(100,)` or `()`.
fn parse_shape(s: &str) -> Result<Vec<usize>> {
    s.trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| t.parse::<usize>().with_context(|| format!("Bad shape dim: '{t}'")))
        .collect()
}
