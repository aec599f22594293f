//! Root configuration for the hmm2vec pipeline.
//!
//! This module defines `Hmm2VecConfig`, the top-level configuration struct
//! that aggregates fit, batch, and per-scheme settings.
//!
//! # Loading Configuration
//!
//! ```
//! use hmm2vec_embeddings::Hmm2VecConfig;
//!
//! // Use defaults for development
//! let config = Hmm2VecConfig::default();
//! config.validate().expect("Default config should be valid");
//!
//! // With environment overrides
//! let config = Hmm2VecConfig::default().with_env_overrides();
//! ```
//!
//! # TOML Structure
//!
//! ```toml
//! [fit]
//! max_iterations = 100
//! tolerance = 0.01
//! seed = 42
//! timeout_ms = 30000
//!
//! [batch]
//! chunk_size = 1000
//! workers = 8
//!
//! [schemes.top31]
//! reference_token = "mov"
//! target_len = 62
//!
//! [schemes.bpe]
//! reference_token = "mov"
//! target_len = 1000
//! oov_policy = "sentinel"
//! ```
//!
//! # Design Principles
//!
//! - **FAIL FAST**: File not found or parse error returns immediately
//! - **VALIDATION**: All nested configs are validated together, first error wins

mod batch;
mod fit;
mod scheme;

pub use batch::BatchConfig;
pub use fit::FitConfig;
pub use scheme::{AlignmentRule, OovPolicy, SchemeConfig, HIDDEN_STATES};

use std::collections::BTreeMap;
use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

// ============================================================================
// ROOT CONFIG
// ============================================================================

/// Root configuration for the hmm2vec pipeline.
///
/// # Example
///
/// ```
/// use hmm2vec_embeddings::Hmm2VecConfig;
///
/// let config = Hmm2VecConfig::default();
/// let scheme = config.scheme("top31").unwrap();
/// assert_eq!(scheme.target_len, 62);
/// assert!(config.batch.chunk_size > 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hmm2VecConfig {
    /// Baum-Welch settings
    #[serde(default)]
    pub fit: FitConfig,

    /// Chunking and worker pool settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Scheme table keyed by scheme name
    #[serde(default = "default_schemes")]
    pub schemes: BTreeMap<String, SchemeConfig>,
}

fn default_schemes() -> BTreeMap<String, SchemeConfig> {
    let mut schemes = BTreeMap::new();
    schemes.insert("top31".to_string(), SchemeConfig::top31());
    schemes
}

impl Default for Hmm2VecConfig {
    fn default() -> Self {
        Self {
            fit: FitConfig::default(),
            batch: BatchConfig::default(),
            schemes: default_schemes(),
        }
    }
}

impl Hmm2VecConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();

        let contents = std::fs::read_to_string(path).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to read config file '{}': {}", path.display(), e),
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to parse TOML in '{}': {}", path.display(), e),
        })?;

        Ok(config)
    }

    /// Create configuration from TOML string.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if TOML parsing fails
    pub fn from_toml_str(toml: &str) -> EmbeddingResult<Self> {
        toml::from_str(toml).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to parse TOML: {}", e),
        })
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if serialization fails
    pub fn to_toml_string(&self) -> EmbeddingResult<String> {
        toml::to_string_pretty(self).map_err(|e| EmbeddingError::ConfigError {
            message: format!("Failed to serialize to TOML: {}", e),
        })
    }

    /// Look up a scheme by name.
    ///
    /// # Errors
    /// - `EmbeddingError::UnknownScheme` if the name is not in the table
    pub fn scheme(&self, name: &str) -> EmbeddingResult<&SchemeConfig> {
        self.schemes
            .get(name)
            .ok_or_else(|| EmbeddingError::UnknownScheme {
                name: name.to_string(),
                available: self
                    .schemes
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    /// Validate all configuration values.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` with the failing section as prefix
    pub fn validate(&self) -> EmbeddingResult<()> {
        self.fit.validate().map_err(|e| in_section("fit", e))?;
        self.batch.validate().map_err(|e| in_section("batch", e))?;

        if self.schemes.is_empty() {
            return Err(EmbeddingError::ConfigError {
                message: "[schemes] at least one scheme must be configured".to_string(),
            });
        }

        for (name, scheme) in &self.schemes {
            scheme
                .validate()
                .map_err(|e| in_section(&format!("schemes.{}", name), e))?;
        }

        Ok(())
    }

    /// Create configuration with environment variable overrides.
    ///
    /// Environment variables override TOML values. Prefix: `HMM2VEC_`
    ///
    /// | Variable | Config Path | Type |
    /// |----------|-------------|------|
    /// | `HMM2VEC_MAX_ITERATIONS` | `fit.max_iterations` | usize |
    /// | `HMM2VEC_SEED` | `fit.seed` | u64 |
    /// | `HMM2VEC_FIT_TIMEOUT_MS` | `fit.timeout_ms` | u64 |
    /// | `HMM2VEC_CHUNK_SIZE` | `batch.chunk_size` | usize |
    /// | `HMM2VEC_WORKERS` | `batch.workers` | usize |
    /// | `HMM2VEC_MAX_CHUNK_BYTES` | `batch.max_chunk_bytes` | usize |
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = env::var("HMM2VEC_MAX_ITERATIONS") {
            if let Ok(n) = val.parse::<usize>() {
                self.fit.max_iterations = n;
            }
        }
        if let Ok(val) = env::var("HMM2VEC_SEED") {
            if let Ok(n) = val.parse::<u64>() {
                self.fit.seed = Some(n);
            }
        }
        if let Ok(val) = env::var("HMM2VEC_FIT_TIMEOUT_MS") {
            if let Ok(n) = val.parse::<u64>() {
                self.fit.timeout_ms = n;
            }
        }

        if let Ok(val) = env::var("HMM2VEC_CHUNK_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                self.batch.chunk_size = n;
            }
        }
        if let Ok(val) = env::var("HMM2VEC_WORKERS") {
            if let Ok(n) = val.parse::<usize>() {
                self.batch.workers = Some(n);
            }
        }
        if let Ok(val) = env::var("HMM2VEC_MAX_CHUNK_BYTES") {
            if let Ok(n) = val.parse::<usize>() {
                self.batch.max_chunk_bytes = n;
            }
        }

        self
    }
}

/// Prefixes a nested config error's message with its TOML section.
fn in_section(section: &str, err: EmbeddingError) -> EmbeddingError {
    match err {
        EmbeddingError::ConfigError { message } => EmbeddingError::ConfigError {
            message: format!("[{}] {}", section, message),
        },
        other => other,
    }
}
