//! `hmm2vec embed`: corpus to feature matrix.
//!
//! Configuration is layered: built-in defaults or `--config`, then
//! `HMM2VEC_*` environment overrides, then command-line flags. Every fatal
//! configuration check (scheme lookup, reference token, label count) runs
//! before the first sample is fitted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hmm2vec_embeddings::{
    check_label_count, count_samples, load_labels, BatchOrchestrator, BatchSummary, CorpusReader,
    Hmm2VecConfig, SampleEmbedder, Vocabulary,
};

/// Arguments for the embed command.
#[derive(Args, Debug)]
pub struct EmbedArgs {
    /// TOML configuration file (built-in defaults if omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Scheme name from the configuration's scheme table
    #[arg(long, default_value = "top31")]
    pub scheme: String,

    /// Vocabulary file (JSON array or one token per line)
    #[arg(long)]
    pub vocab: PathBuf,

    /// Corpus file (JSON Lines, one token array per sample)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Output artifact (`.npy` for a bare NumPy matrix, otherwise safetensors)
    #[arg(long)]
    pub output: PathBuf,

    /// Optional label file, one label per corpus sample
    #[arg(long)]
    pub labels: Option<PathBuf>,

    /// Samples per chunk
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Worker threads
    #[arg(long)]
    pub workers: Option<usize>,

    /// Base seed for emission initialization
    #[arg(long)]
    pub seed: Option<u64>,
}

impl EmbedArgs {
    /// Resolves the layered configuration.
    pub fn resolve_config(&self) -> Result<Hmm2VecConfig> {
        let config = match &self.config {
            Some(path) => Hmm2VecConfig::from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => Hmm2VecConfig::default(),
        };
        let mut config = config.with_env_overrides();

        if let Some(chunk_size) = self.chunk_size {
            config.batch.chunk_size = chunk_size;
        }
        if let Some(workers) = self.workers {
            config.batch.workers = Some(workers);
        }
        if let Some(seed) = self.seed {
            config.fit.seed = Some(seed);
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Runs the full pipeline and writes the artifact.
pub fn embed(args: &EmbedArgs) -> Result<BatchSummary> {
    let config = args.resolve_config()?;
    let scheme = config.scheme(&args.scheme)?.clone();

    let vocab = Arc::new(
        Vocabulary::load(&args.vocab)
            .with_context(|| format!("loading vocabulary {}", args.vocab.display()))?,
    );

    let labels = match &args.labels {
        Some(path) => {
            let labels =
                load_labels(path).with_context(|| format!("loading labels {}", path.display()))?;
            let samples = count_samples(&args.corpus)
                .with_context(|| format!("reading corpus {}", args.corpus.display()))?;
            check_label_count(samples, labels.len())?;
            Some(labels)
        }
        None => None,
    };

    let embedder = SampleEmbedder::for_scheme(&scheme, vocab.clone(), config.fit.clone())
        .with_context(|| format!("scheme '{}'", args.scheme))?;
    let orchestrator = BatchOrchestrator::new(embedder, config.batch.clone())?;

    info!(
        scheme = %args.scheme,
        corpus = %args.corpus.display(),
        workers = orchestrator.workers(),
        "Embedding corpus"
    );

    let reader = CorpusReader::open(&args.corpus)
        .with_context(|| format!("opening corpus {}", args.corpus.display()))?;
    let mut output = orchestrator.run(reader)?;

    if let Some(labels) = labels {
        output.matrix.set_labels(labels)?;
    }
    output.matrix.set_metadata("scheme", &args.scheme);
    output.matrix.set_metadata("vocab_size", vocab.len());
    output.matrix.set_metadata("target_len", scheme.target_len);
    output.matrix.set_metadata("reference_token", &scheme.reference_token);
    output.matrix.set_metadata("oov_policy", scheme.oov_policy.as_str());
    output.matrix.set_metadata("alignment", scheme.alignment.as_str());
    if let Some(seed) = config.fit.seed {
        output.matrix.set_metadata("seed", seed);
    }

    let format = output
        .matrix
        .save_artifact(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(format = format.name(), output = %args.output.display(), "Artifact written");

    Ok(output.summary)
}

pub fn run(args: &EmbedArgs) -> Result<()> {
    let summary = embed(args)?;

    println!("Wrote {}", args.output.display());
    println!("  Samples:  {}", summary.samples);
    println!(
        "  Degraded: {} ({:.2}%)",
        summary.degraded,
        summary.degraded_ratio() * 100.0
    );
    for (reason, count) in &summary.by_reason {
        println!("    {:<16} {}", reason, count);
    }
    if !summary.degraded_samples.is_empty() {
        println!("  First degraded samples:");
        for (index, reason) in &summary.degraded_samples {
            println!("    #{:<8} {}", index, reason);
        }
    }
    println!(
        "  Elapsed:  {:.2}s ({:.1} samples/s)",
        summary.elapsed.as_secs_f64(),
        summary.throughput()
    );
    Ok(())
}
