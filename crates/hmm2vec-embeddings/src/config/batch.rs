//! Chunked batch orchestration configuration.

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

/// Configuration for chunked batch processing.
///
/// `chunk_size` bounds peak memory: only one chunk's sequences, models, and
/// vectors are alive at a time. It does not affect the produced matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Samples per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Worker threads per chunk (None = one per available core).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,

    /// Upper bound on the estimated working set of a single chunk, in bytes.
    /// `0` disables the check.
    #[serde(default = "default_max_chunk_bytes")]
    pub max_chunk_bytes: usize,

    /// How many degraded sample indices the run summary keeps.
    #[serde(default = "default_max_reported_degraded")]
    pub max_reported_degraded: usize,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_max_chunk_bytes() -> usize {
    4 * 1024 * 1024 * 1024
}

fn default_max_reported_degraded() -> usize {
    100
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            workers: None,
            max_chunk_bytes: default_max_chunk_bytes(),
            max_reported_degraded: default_max_reported_degraded(),
        }
    }
}

impl BatchConfig {
    /// Validate batch configuration values.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if chunk_size is 0
    /// - `EmbeddingError::ConfigError` if workers is Some(0)
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.chunk_size == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "chunk_size must be > 0".to_string(),
            });
        }

        if self.workers == Some(0) {
            return Err(EmbeddingError::ConfigError {
                message: "workers must be > 0 when set".to_string(),
            });
        }

        Ok(())
    }
}
