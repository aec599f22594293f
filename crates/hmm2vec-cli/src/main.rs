//! hmm2vec batch CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Embed a corpus with the built-in top31 scheme
//! hmm2vec embed --vocab vocab.json --corpus corpus.jsonl \
//!     --output features.safetensors --seed 42
//!
//! # Custom scheme table, labels, and parallelism
//! hmm2vec embed --config config/schemes.toml --scheme top1000 \
//!     --vocab vocab1000.txt --corpus corpus.jsonl --labels labels.json \
//!     --output features.safetensors --chunk-size 5000 --workers 16
//!
//! # Bare NumPy matrix for np.load (labels go to features.labels.npy)
//! hmm2vec embed --vocab vocab.json --corpus corpus.jsonl --labels labels.json \
//!     --output features.npy
//!
//! # Build a vocabulary from a corpus
//! hmm2vec build-vocab --corpus corpus.jsonl --output vocab.json
//!
//! # Summarize an artifact
//! hmm2vec inspect features.safetensors
//! ```
//!
//! ## Logging
//!
//! `--log-level` sets the maximum level. `HMM2VEC_LOG` takes precedence and
//! accepts a full filter directive (e.g. `hmm2vec_embeddings=debug`).

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use commands::embed::EmbedArgs;
use commands::inspect::InspectArgs;
use commands::vocab::BuildVocabArgs;

/// Environment variable holding a tracing filter directive.
const LOG_ENV: &str = "HMM2VEC_LOG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}

/// Per-sample HMM emission embeddings for opcode traces.
#[derive(Parser, Debug)]
#[command(name = "hmm2vec")]
#[command(version, about = "Per-sample HMM emission embeddings for opcode traces")]
struct Cli {
    /// Maximum log level.
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Embed every sample of a corpus into a feature matrix
    Embed(EmbedArgs),
    /// Build a first-appearance vocabulary from a corpus
    BuildVocab(BuildVocabArgs),
    /// Print the shape, degraded count, and metadata of an artifact
    Inspect(InspectArgs),
}

fn init_logging(level: LogLevel) -> Result<()> {
    let builder = FmtSubscriber::builder().with_target(false);

    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => {
            let subscriber = builder.with_env_filter(EnvFilter::try_new(directive)?).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        _ => {
            let subscriber = builder.with_max_level(Level::from(level)).finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level)?;

    match cli.command {
        Command::Embed(args) => commands::embed::run(&args),
        Command::BuildVocab(args) => commands::vocab::run(&args),
        Command::Inspect(args) => commands::inspect::run(&args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_embed_overrides() {
        let cli = Cli::try_parse_from([
            "hmm2vec",
            "--log-level",
            "debug",
            "embed",
            "--vocab",
            "v.json",
            "--corpus",
            "c.jsonl",
            "--output",
            "out.safetensors",
            "--chunk-size",
            "50",
            "--workers",
            "4",
            "--seed",
            "7",
        ])
        .unwrap();

        assert_eq!(cli.log_level, LogLevel::Debug);
        let Command::Embed(args) = cli.command else {
            panic!("expected embed");
        };
        assert_eq!(args.scheme, "top31");
        assert_eq!(args.chunk_size, Some(50));
        assert_eq!(args.workers, Some(4));
        assert_eq!(args.seed, Some(7));
        assert!(args.config.is_none());
        assert!(args.labels.is_none());
    }

    #[test]
    fn test_inspect_takes_positional_path() {
        let cli = Cli::try_parse_from(["hmm2vec", "inspect", "features.safetensors"]).unwrap();
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.artifact.to_str(), Some("features.safetensors"));
    }
}
