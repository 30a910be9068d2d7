//! `echoverse` command-line front end.
//!
//! ```text
//! echoverse rewrite --tone suspenseful "The door opened."
//! echoverse synthesize --voice "Voice B" --rate 1.2 --file story.txt
//! echoverse narrate --tone inspiring -            # text from stdin
//! ```
//!
//! Logging goes to stderr; `RUST_LOG` overrides the default `info` filter.

use std::{
    io::Read,
    path::PathBuf,
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use echoverse::{EchoConfig, Echoverse, RewriteOutcome, SynthesisRequest, Tone, VoiceLabel};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "echoverse", version, about = "Tone-adaptive rewriting and narration")]
struct Cli {
    /// JSON config file (default: $ECHOVERSE_CONFIG, then ./echoverse.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite text in a tone and print it
    Rewrite {
        #[arg(long, short, default_value = "Neutral")]
        tone: Tone,
        #[command(flatten)]
        input: Input,
    },
    /// Speak text to an MP3 file and print its path
    Synthesize {
        #[command(flatten)]
        voice: VoiceArgs,
        /// Write here instead of the configured output path
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[command(flatten)]
        input: Input,
    },
    /// Rewrite, then speak the result
    Narrate {
        #[arg(long, short, default_value = "Neutral")]
        tone: Tone,
        #[command(flatten)]
        voice: VoiceArgs,
        #[command(flatten)]
        input: Input,
    },
}

#[derive(Args, Debug)]
struct VoiceArgs {
    /// Voice label: "VoiceA", "VoiceB" or anything else for the engine default
    #[arg(long, short, default_value = "VoiceA")]
    voice: String,
    /// Speaking-rate factor, clamped to 0.6..=1.6
    #[arg(long, short, default_value_t = 1.0)]
    rate: f32,
}

#[derive(Args, Debug)]
struct Input {
    /// Read text from a file
    #[arg(long, short, conflicts_with = "text")]
    file: Option<PathBuf>,
    /// The text, or "-" for stdin
    text: Option<String>,
}

impl Input {
    fn read(&self) -> Result<String> {
        match (&self.file, self.text.as_deref()) {
            (Some(path), _) => {
                std::fs::read_to_string(path).with_context(|| format!("Cannot read {}", path.display()))
            }
            (None, Some("-")) | (None, None) => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf).context("Cannot read stdin")?;
                Ok(buf)
            }
            (None, Some(text)) => Ok(text.to_string()),
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let cfg = EchoConfig::load(cli.config.as_deref())?;
    let app = Echoverse::from_config(&cfg);

    match cli.command {
        Command::Rewrite { tone, input } => {
            let outcome = app.rewrite(&input.read()?, tone);
            if let RewriteOutcome::Degraded { reason } = &outcome {
                error!("Rewrite degraded: {reason}");
            }
            println!("{}", outcome.text());
        }
        Command::Synthesize { voice, output, input } => {
            let mut request = SynthesisRequest::new(input.read()?)
                .voice(VoiceLabel::parse(&voice.voice))
                .rate(voice.rate);
            request.output = output;
            let artifact = app.synthesize(&request)?;
            info!("{} tier, {} bytes", artifact.tier, artifact.bytes.len());
            println!("{}", artifact.path.display());
        }
        Command::Narrate { tone, voice, input } => {
            let narration = app.narrate(&input.read()?, tone, VoiceLabel::parse(&voice.voice), voice.rate)?;
            println!("{}", narration.rewrite.text());
            println!("{}", narration.audio.path.display());
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
