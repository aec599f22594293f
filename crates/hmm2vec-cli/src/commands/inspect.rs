//! `hmm2vec inspect`: artifact summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use hmm2vec_embeddings::{ArtifactFormat, FeatureMatrix};

/// Arguments for the inspect command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Artifact written by `hmm2vec embed` (safetensors or `.npy`)
    pub artifact: PathBuf,
}

pub fn run(args: &InspectArgs) -> Result<()> {
    let format = ArtifactFormat::from_path(&args.artifact);
    let matrix = FeatureMatrix::load_artifact(&args.artifact)
        .with_context(|| format!("reading {}", args.artifact.display()))?;

    println!("{} ({})", args.artifact.display(), format.name());
    println!("  Shape:    [{}, {}]", matrix.n_rows(), matrix.n_cols());
    match format {
        ArtifactFormat::SafeTensors => println!("  Degraded: {}", matrix.degraded_count()),
        ArtifactFormat::Npy => println!("  Degraded: not recorded"),
    }
    println!(
        "  Labels:   {}",
        if matrix.labels().is_some() { "yes" } else { "no" }
    );

    let mut metadata: Vec<_> = matrix.metadata().iter().collect();
    metadata.sort();
    if !metadata.is_empty() {
        println!("  Metadata:");
        for (key, value) in metadata {
            println!("    {:<16} {}", key, value);
        }
    }
    Ok(())
}
