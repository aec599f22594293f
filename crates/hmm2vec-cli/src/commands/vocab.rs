//! `hmm2vec build-vocab`: first-appearance vocabulary from a corpus.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use hmm2vec_embeddings::{read_corpus, Vocabulary};

/// Arguments for the build-vocab command.
#[derive(Args, Debug)]
pub struct BuildVocabArgs {
    /// Corpus file (JSON Lines, one token array per sample)
    #[arg(long)]
    pub corpus: PathBuf,

    /// Output vocabulary file (`.json` for a JSON array, otherwise one token per line)
    #[arg(long)]
    pub output: PathBuf,
}

/// Builds and writes the vocabulary. Returns it with the most frequent token.
pub fn build(args: &BuildVocabArgs) -> Result<(Vocabulary, Option<String>)> {
    let samples = read_corpus(&args.corpus)
        .with_context(|| format!("reading corpus {}", args.corpus.display()))?;

    let vocab = Vocabulary::from_corpus(&samples)?;
    let most_frequent = Vocabulary::most_frequent(&samples);

    vocab
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    info!(
        samples = samples.len(),
        vocab_size = vocab.len(),
        output = %args.output.display(),
        "Vocabulary written"
    );
    Ok((vocab, most_frequent))
}

pub fn run(args: &BuildVocabArgs) -> Result<()> {
    let (vocab, most_frequent) = build(args)?;

    println!("Wrote {} tokens to {}", vocab.len(), args.output.display());
    if let Some(token) = most_frequent {
        println!("Most frequent token: {}", token);
    }
    Ok(())
}
