//! Audio plumbing shared by every synthesis tier.
//!
//! Every tier ends in [`canonicalize`]: force mono, resample to the target
//! rate, peak-normalise, encode MP3.  [`probe_mp3`] reads back the first frame
//! header so callers (and tests) can check what was produced.

use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use mp3lame_encoder::{max_required_buffer_size, Bitrate, Builder, FlushNoGap, MonoPcm, Quality};
use rubato::{FftFixedIn, Resampler};

/// Headroom left by peak normalisation, in dB below full scale.
pub const NORMALIZE_HEADROOM_DB: f32 = 0.1;

/// Requested frames per resampler block.
const RESAMPLE_CHUNK: usize = 1024;

/// Worst-case MP3 bytes emitted by a LAME flush.
const LAME_FLUSH_RESERVE: usize = 7200;

// ─────────────────────────────────────────────────────────────────────────────
// AudioClip
// ─────────────────────────────────────────────────────────────────────────────

/// Interleaved `f32` samples in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, channels: 1, sample_rate }
    }

    /// `duration_ms` of digital silence.
    pub fn silent(duration_ms: u32, sample_rate: u32) -> Self {
        let frames = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        Self::mono(vec![0.0; frames], sample_rate)
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f32 {
        self.frames() as f32 / self.sample_rate as f32
    }

    /// Decode a PCM or IEEE-float WAV file.
    pub fn from_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path)
            .with_context(|| format!("Cannot open WAV: {}", path.display()))?;
        let spec = reader.spec();
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .context("WAV read error")?,
            hound::SampleFormat::Int => {
                let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / scale))
                    .collect::<Result<_, _>>()
                    .context("WAV read error")?
            }
        };
        ensure!(spec.channels > 0, "WAV has no channels: {}", path.display());
        Ok(Self { samples, channels: spec.channels, sample_rate: spec.sample_rate })
    }

    /// Write a 16-bit PCM WAV.
    pub fn write_wav(&self, path: &Path) -> Result<()> {
        let spec = hound::WavSpec {
            channels: self.channels,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec)
            .with_context(|| format!("Cannot create WAV: {}", path.display()))?;
        for &s in &self.samples {
            writer.write_sample(to_i16(s)).context("WAV write error")?;
        }
        writer.finalize().context("WAV finalise error")?;
        Ok(())
    }

    /// Average all channels into one.
    pub fn into_mono(self) -> Self {
        if self.channels <= 1 {
            return Self { channels: 1, ..self };
        }
        let n = self.channels as usize;
        let samples = self
            .samples
            .chunks_exact(n)
            .map(|frame| frame.iter().sum::<f32>() / n as f32)
            .collect();
        Self::mono(samples, self.sample_rate)
    }

    /// Resample a mono clip to `target_rate`.
    pub fn resample(self, target_rate: u32) -> Result<Self> {
        ensure!(self.channels == 1, "resampling expects mono audio, got {} channels", self.channels);
        if self.sample_rate == target_rate || self.samples.is_empty() {
            return Ok(Self { sample_rate: target_rate, ..self });
        }

        let mut resampler =
            FftFixedIn::<f32>::new(self.sample_rate as usize, target_rate as usize, RESAMPLE_CHUNK, 2, 1)
                .map_err(|e| anyhow!("Failed to create resampler: {e}"))?;

        let expected_len =
            (self.samples.len() as f64 * target_rate as f64 / self.sample_rate as f64).ceil() as usize;
        let delay = resampler.output_delay();
        let mut out = Vec::with_capacity(delay + expected_len + resampler.output_frames_max());

        // The resampler rounds the block size to suit the ratio.  Zero-padded
        // blocks are fed past the end until the delayed output is complete.
        let block_len = resampler.input_frames_next();
        let len = self.samples.len();
        let mut pos = 0;
        while out.len() < delay + expected_len {
            let end = (pos + block_len).min(len);
            let mut input = vec![0.0f32; block_len];
            input[..end - pos].copy_from_slice(&self.samples[pos..end]);
            let frames = resampler
                .process(&[input], None)
                .map_err(|e| anyhow!("Resampling failed: {e}"))?;
            out.extend_from_slice(&frames[0]);
            pos = end;
        }
        out.drain(..delay);
        out.truncate(expected_len);

        Ok(Self::mono(out, target_rate))
    }

    /// Scale so the loudest sample sits `headroom_db` below full scale.
    /// Silence is returned unchanged.
    pub fn normalize_peak(mut self, headroom_db: f32) -> Self {
        let peak = self.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak <= f32::EPSILON {
            return self;
        }
        let gain = 10f32.powf(-headroom_db / 20.0) / peak;
        for s in &mut self.samples {
            *s *= gain;
        }
        self
    }

    /// Encode a mono clip as constant-bitrate MP3.
    pub fn encode_mp3(&self, bitrate_kbps: u32) -> Result<Vec<u8>> {
        ensure!(self.channels == 1, "MP3 export expects mono audio, got {} channels", self.channels);

        let mut builder = Builder::new().context("Failed to create LAME builder")?;
        builder.set_num_channels(1).map_err(|e| anyhow!("LAME rejected channel count: {e:?}"))?;
        builder
            .set_sample_rate(self.sample_rate)
            .map_err(|e| anyhow!("LAME rejected sample rate {}: {e:?}", self.sample_rate))?;
        builder
            .set_brate(bitrate(bitrate_kbps)?)
            .map_err(|e| anyhow!("LAME rejected bitrate {bitrate_kbps}: {e:?}"))?;
        builder.set_quality(Quality::Good).map_err(|e| anyhow!("LAME rejected quality: {e:?}"))?;
        let mut encoder = builder.build().map_err(|e| anyhow!("LAME init failed: {e:?}"))?;

        let pcm: Vec<i16> = self.samples.iter().map(|&s| to_i16(s)).collect();
        let mut out: Vec<u8> = Vec::with_capacity(max_required_buffer_size(pcm.len()));

        let written = encoder
            .encode(MonoPcm(&pcm), out.spare_capacity_mut())
            .map_err(|e| anyhow!("MP3 encode failed: {e:?}"))?;
        // SAFETY: the encoder initialised exactly `written` bytes of spare capacity.
        unsafe { out.set_len(out.len() + written) };

        out.reserve(LAME_FLUSH_RESERVE);
        let flushed = encoder
            .flush::<FlushNoGap>(out.spare_capacity_mut())
            .map_err(|e| anyhow!("MP3 flush failed: {e:?}"))?;
        // SAFETY: as above, for the flushed tail.
        unsafe { out.set_len(out.len() + flushed) };

        ensure!(!out.is_empty(), "MP3 encoder produced no data");
        Ok(out)
    }
}

fn to_i16(s: f32) -> i16 {
    (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
}

fn bitrate(kbps: u32) -> Result<Bitrate> {
    Ok(match kbps {
        8 => Bitrate::Kbps8,
        16 => Bitrate::Kbps16,
        24 => Bitrate::Kbps24,
        32 => Bitrate::Kbps32,
        40 => Bitrate::Kbps40,
        48 => Bitrate::Kbps48,
        64 => Bitrate::Kbps64,
        80 => Bitrate::Kbps80,
        96 => Bitrate::Kbps96,
        112 => Bitrate::Kbps112,
        128 => Bitrate::Kbps128,
        160 => Bitrate::Kbps160,
        192 => Bitrate::Kbps192,
        224 => Bitrate::Kbps224,
        256 => Bitrate::Kbps256,
        320 => Bitrate::Kbps320,
        other => bail!("unsupported MP3 bitrate {other} kbps"),
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Canonical output
// ─────────────────────────────────────────────────────────────────────────────

/// Target of [`canonicalize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub sample_rate: u32,
    pub bitrate_kbps: u32,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self { sample_rate: 16_000, bitrate_kbps: 64 }
    }
}

/// Mono, resampled, peak-normalised MP3 bytes.
pub fn canonicalize(clip: AudioClip, format: OutputFormat) -> Result<Vec<u8>> {
    clip.into_mono()
        .resample(format.sample_rate)?
        .normalize_peak(NORMALIZE_HEADROOM_DB)
        .encode_mp3(format.bitrate_kbps)
}

// ─────────────────────────────────────────────────────────────────────────────
// MP3 probe
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// Properties read from the first MPEG audio frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mp3Info {
    pub version: MpegVersion,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Find the first Layer III frame header in `bytes`, skipping an ID3v2 tag.
pub fn probe_mp3(bytes: &[u8]) -> Result<Mp3Info> {
    let mut pos = 0;
    if bytes.len() >= 10 && &bytes[..3] == b"ID3" {
        // Synchsafe 28-bit size, excluding the 10-byte header.
        let size = bytes[6..10].iter().fold(0usize, |acc, &b| (acc << 7) | (b & 0x7f) as usize);
        pos = 10 + size;
    }

    while pos + 4 <= bytes.len() {
        if let Some(info) = parse_frame_header(&bytes[pos..pos + 4]) {
            return Ok(info);
        }
        pos += 1;
    }
    bail!("no MPEG Layer III frame header found")
}

fn parse_frame_header(h: &[u8]) -> Option<Mp3Info> {
    if h[0] != 0xFF || h[1] & 0xE0 != 0xE0 {
        return None;
    }
    let version = match (h[1] >> 3) & 0b11 {
        0b11 => MpegVersion::Mpeg1,
        0b10 => MpegVersion::Mpeg2,
        0b00 => MpegVersion::Mpeg25,
        _ => return None,
    };
    // Layer bits 01 = Layer III.
    if (h[1] >> 1) & 0b11 != 0b01 {
        return None;
    }
    let bitrate_idx = h[2] >> 4;
    if bitrate_idx == 0 || bitrate_idx == 0xF {
        return None;
    }
    let base = match (h[2] >> 2) & 0b11 {
        0 => 44_100,
        1 => 48_000,
        2 => 32_000,
        _ => return None,
    };
    let sample_rate = match version {
        MpegVersion::Mpeg1 => base,
        MpegVersion::Mpeg2 => base / 2,
        MpegVersion::Mpeg25 => base / 4,
    };
    let channels = if (h[3] >> 6) == 0b11 { 1 } else { 2 };
    Some(Mp3Info { version, sample_rate, channels })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
