//! Error types for hmm2vec operations.
//!
//! Two taxonomies are kept apart:
//!
//! - [`EmbeddingError`]: fatal. Configuration, IO, and resource errors that
//!   abort a run before (or instead of) producing a feature matrix.
//! - [`FitError`]: recoverable. A single sample could not be fitted; the
//!   orchestrator turns it into a degraded all-zero row and keeps going.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal errors for the embedding pipeline.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Configuration is invalid.
    #[error("[H2V-E001] Configuration error: {message}")]
    ConfigError { message: String },

    /// Scheme name not present in the scheme table.
    #[error("[H2V-E002] Unknown scheme '{name}' (available: {available})")]
    UnknownScheme { name: String, available: String },

    /// Reference token is not part of the vocabulary.
    #[error("[H2V-E003] Reference token '{token}' not found in vocabulary of {vocab_size} tokens")]
    ReferenceTokenMissing { token: String, vocab_size: usize },

    /// Reference column lies outside the emission matrix.
    #[error("[H2V-E004] Reference index {index} out of range for {n_symbols} symbols")]
    ReferenceIndexOutOfRange { index: usize, n_symbols: usize },

    /// Vocabulary file content is invalid.
    #[error("[H2V-E005] Invalid vocabulary: {message}")]
    InvalidVocabulary { message: String },

    /// Label array does not line up with the corpus.
    #[error("[H2V-E006] Label count mismatch: corpus has {corpus} samples, labels file has {labels}")]
    LabelCountMismatch { corpus: usize, labels: usize },

    /// A corpus line could not be parsed as a token sequence.
    #[error("[H2V-E007] Corpus parse error at line {line}: {message}")]
    CorpusParse { line: usize, message: String },

    /// A single chunk would exceed the configured memory bound.
    #[error(
        "[H2V-E008] Chunk {chunk} working set estimated at {estimated_bytes} bytes exceeds limit of {limit_bytes} bytes; lower batch.chunk_size"
    )]
    ResourceExhausted {
        chunk: usize,
        estimated_bytes: usize,
        limit_bytes: usize,
    },

    /// Worker pool could not be created.
    #[error("[H2V-E009] Worker pool error: {message}")]
    WorkerPool { message: String },

    /// Artifact could not be written or read.
    #[error("[H2V-E010] Feature matrix persistence failed for {}: {message}", .path.display())]
    PersistError { path: PathBuf, message: String },

    /// Dimension mismatch.
    #[error("[H2V-E011] Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type for embedding operations.
pub type EmbeddingResult<T> = Result<T, EmbeddingError>;

/// Recoverable per-sample failures.
///
/// Every variant maps to a degraded row; none of them abort a batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Fewer than two observations.
    #[error("sequence too short to fit two states: {len} observation(s)")]
    TooShort { len: usize },

    /// Only one distinct symbol; the two states are indistinguishable.
    #[error("sequence contains a single distinct symbol ({symbol})")]
    SingleSymbol { symbol: usize },

    /// Token absent from a closed vocabulary under the reject policy.
    #[error("unknown token '{token}' at position {position}")]
    UnknownToken { token: String, position: usize },

    /// Encoded symbol outside the emission alphabet.
    #[error("symbol {symbol} at position {position} out of range for {n_symbols} symbols")]
    SymbolOutOfRange {
        symbol: usize,
        position: usize,
        n_symbols: usize,
    },

    /// EM produced an unusable parameter set.
    #[error("numerical failure: {reason}")]
    NumericalFailure { reason: String },

    /// Per-sample deadline exceeded.
    #[error("fit timed out after {elapsed_ms} ms ({iterations} EM iterations)")]
    Timeout { elapsed_ms: u64, iterations: usize },
}

impl FitError {
    /// Short stable label used to aggregate failures in run summaries.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TooShort { .. } => "too_short",
            Self::SingleSymbol { .. } => "single_symbol",
            Self::UnknownToken { .. } => "unknown_token",
            Self::SymbolOutOfRange { .. } => "symbol_out_of_range",
            Self::NumericalFailure { .. } => "numerical_failure",
            Self::Timeout { .. } => "timeout",
        }
    }
}
