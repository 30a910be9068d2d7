//! Offline synthesis engine: espeak-ng run as a child process.
//!
//! The engine is available when `<program> --version` runs.  Voices come from
//! `--voices=en`; rendering writes a WAV with `-w`, text on stdin so leading
//! dashes are never read as options.

use std::{
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{bail, Context, Result};
use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::config::OfflineConfig;

/// An offline text-to-speech engine that renders to a WAV file.
pub trait OfflineEngine: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the engine can run in this environment.
    fn is_available(&self) -> bool;

    /// Voice identifiers, in the engine's own order.
    fn voices(&self) -> Result<Vec<String>>;

    /// Speaking rate before the caller's rate factor, in words per minute.
    fn base_rate(&self) -> u32;

    /// Render `text` to an uncompressed WAV at `path`.  `voice: None` means
    /// the engine default.
    fn render_to_file(&self, text: &str, voice: Option<&str>, rate_wpm: u32, path: &Path) -> Result<()>;
}

pub struct EspeakEngine {
    program: String,
    base_rate: u32,
    available: OnceCell<bool>,
}

impl EspeakEngine {
    pub fn new(program: impl Into<String>, base_rate: u32) -> Self {
        Self { program: program.into(), base_rate, available: OnceCell::new() }
    }

    pub fn from_config(cfg: &OfflineConfig) -> Self {
        Self::new(cfg.program.clone(), cfg.base_rate)
    }

    /// Run the program with `args`, feeding `stdin`, and return its stdout.
    fn run(&self, args: &[&str], stdin: Option<&str>) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Cannot run {}", self.program))?;

        if let (Some(text), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(text.as_bytes())
                .with_context(|| format!("Cannot write text to {}", self.program))?;
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("{} did not finish", self.program))?;
        if !output.status.success() {
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// IPA phonemes for `text` (US English), clauses joined by spaces.
    pub fn phonemize(&self, text: &str) -> Result<String> {
        let out = self.run(&["-q", "--ipa", "-v", "en-us", "--stdin"], Some(text))?;
        Ok(out.split_whitespace().collect::<Vec<_>>().join(" "))
    }
}

/// Language column of `espeak-ng --voices` output, header skipped, duplicates
/// dropped.
pub fn parse_voice_list(listing: &str) -> Vec<String> {
    let mut voices: Vec<String> = Vec::new();
    for line in listing.lines() {
        let mut cols = line.split_whitespace();
        match cols.next() {
            Some("Pty") | None => continue,
            Some(_) => {}
        }
        if let Some(lang) = cols.next() {
            if !voices.iter().any(|v| v == lang) {
                voices.push(lang.to_string());
            }
        }
    }
    voices
}

impl OfflineEngine for EspeakEngine {
    fn name(&self) -> &str {
        &self.program
    }

    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| match self.run(&["--version"], None) {
            Ok(version) => {
                info!("Offline engine: {}", version.trim());
                true
            }
            Err(e) => {
                info!("Offline engine unavailable: {e:#}");
                false
            }
        })
    }

    fn voices(&self) -> Result<Vec<String>> {
        Ok(parse_voice_list(&self.run(&["--voices=en"], None)?))
    }

    fn base_rate(&self) -> u32 {
        self.base_rate
    }

    fn render_to_file(&self, text: &str, voice: Option<&str>, rate_wpm: u32, path: &Path) -> Result<()> {
        let rate = rate_wpm.to_string();
        let path_str = path.to_string_lossy();
        let mut args: Vec<&str> = vec!["-s", &rate, "-w", &path_str];
        if let Some(voice) = voice {
            args.extend(["-v", voice]);
        }
        args.push("--stdin");
        debug!("{} {}", self.program, args.join(" "));

        self.run(&args, Some(text))?;
        if !path.exists() {
            bail!("{} produced no file at {}", self.program, path.display());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 2  en-029          --/M      English_(Caribbean) gmw/en-029
 2  en-gb           --/M      English_(Great_Britain) gmw/en           (en 2)
 5  en-gb-scotland  --/M      English_(Scotland) gmw/en-GB-scotland
 2  en-us           --/M      English_(America)  gmw/en-US            (en 3)
 2  en-us           --/F      English_(America)  gmw/en-US-nyc
";

    #[test]
    fn test_parse_voice_list() {
        assert_eq!(parse_voice_list(LISTING), vec!["en-029", "en-gb", "en-gb-scotland", "en-us"]);
    }

    #[test]
    fn test_parse_empty_listing() {
        assert!(parse_voice_list("").is_empty());
        assert!(parse_voice_list("Pty Language Age/Gender\n").is_empty());
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let engine = EspeakEngine::new("echoverse-no-such-speech-engine", 175);
        assert!(!engine.is_available());
        assert!(engine.voices().is_err());
        assert_eq!(engine.base_rate(), 175);
    }

    #[test]
    fn test_render_with_missing_program_fails() {
        let dir = tempfile::tempdir().unwrap();
        let engine = EspeakEngine::new("echoverse-no-such-speech-engine", 175);
        let err = engine.render_to_file("hi", None, 175, &dir.path().join("x.wav")).unwrap_err();
        assert!(format!("{err:#}").contains("Cannot run"), "got: {err:#}");
    }
}
