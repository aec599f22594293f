//! Per-sample HMM emission embeddings for tokenized instruction traces.
//!
//! Every sample (a sequence of opcode tokens) gets its own 2-state
//! categorical hidden Markov model fitted with Baum–Welch. The fitted
//! emission matrix is put into a canonical state order, flattened row-major,
//! and padded or truncated to a fixed length, giving one row of a feature
//! matrix per sample.
//!
//! # Architecture
//!
//! - **Vocabulary / Codec**: token to symbol code mapping with OOV policy
//! - **BaumWelchFitter**: scaled EM for one sequence, fails recoverably on degenerate input
//! - **StateAligner**: fixes label switching (reference token or entropy rule)
//! - **VectorEncoder**: flatten + pad/truncate to the scheme's length
//! - **SampleEmbedder**: codec, fit, align, encode for one sample
//! - **BatchOrchestrator**: chunked, order-preserving parallel run over a corpus
//! - **FeatureMatrix**: output rows, degraded mask, labels, safetensors persistence
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use hmm2vec_embeddings::{
//!     BatchOrchestrator, CorpusReader, Hmm2VecConfig, SampleEmbedder, Vocabulary,
//! };
//!
//! let config = Hmm2VecConfig::default();
//! let scheme = config.scheme("top31")?;
//! let vocab = Arc::new(Vocabulary::load("vocab.json")?);
//! let embedder = SampleEmbedder::for_scheme(scheme, vocab, config.fit.clone())?;
//! let orchestrator = BatchOrchestrator::new(embedder, config.batch.clone())?;
//! let output = orchestrator.run(CorpusReader::open("corpus.jsonl")?)?;
//! output.matrix.save("features.safetensors")?;
//! ```

pub mod align;
pub mod batch;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod encoder;
pub mod error;
pub mod hmm;
pub mod storage;
pub mod vocab;

pub use align::{aligner_for, EntropyAligner, ReferenceTokenAligner, StateAligner};
pub use batch::{BatchOrchestrator, BatchOutput, BatchSummary};
pub use config::{
    AlignmentRule, BatchConfig, FitConfig, Hmm2VecConfig, OovPolicy, SchemeConfig, HIDDEN_STATES,
};
pub use corpus::{check_label_count, count_samples, load_labels, read_corpus, CorpusReader};
pub use embedder::{SampleEmbedder, SampleOutcome};
pub use encoder::VectorEncoder;
pub use error::{EmbeddingError, EmbeddingResult, FitError};
pub use hmm::{BaumWelchFitter, EmissionMatrix, FitReport};
pub use storage::{ArtifactFormat, FeatureMatrix};
pub use vocab::{Codec, Vocabulary};
