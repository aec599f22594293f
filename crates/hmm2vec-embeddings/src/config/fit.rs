//! Baum-Welch fitting configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

/// Configuration for the per-sample EM fit.
///
/// Defaults follow the reference categorical HMM trainer: 100 iterations and a
/// log-likelihood plateau tolerance of 0.01.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitConfig {
    /// Maximum number of EM iterations per sample.
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Stop when the log-likelihood gain drops below this value.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Seed for emission initialization. `None` draws from OS entropy, so
    /// repeated runs produce different (equally valid) vectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,

    /// Per-sample wall clock budget in milliseconds. `0` disables the limit.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_max_iterations() -> usize {
    100
}

fn default_tolerance() -> f64 {
    1e-2
}

fn default_timeout_ms() -> u64 {
    30_000
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            seed: None,
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl FitConfig {
    /// Per-sample timeout, if any.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms))
    }

    /// Validate fit configuration values.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if max_iterations is 0
    /// - `EmbeddingError::ConfigError` if tolerance is negative or not finite
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.max_iterations == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "max_iterations must be > 0".to_string(),
            });
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(EmbeddingError::ConfigError {
                message: format!("tolerance must be finite and >= 0, got {}", self.tolerance),
            });
        }

        Ok(())
    }
}
