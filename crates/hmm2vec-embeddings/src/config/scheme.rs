//! Per-tokenization-scheme settings.

use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

/// The only hidden-state count the pipeline supports.
pub const HIDDEN_STATES: usize = 2;

/// What the codec does with a token missing from the vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OovPolicy {
    /// The sample is degraded with `FitError::UnknownToken`.
    #[default]
    Reject,

    /// Unknown tokens map to an extra sentinel symbol with code `V`.
    Sentinel,
}

impl OovPolicy {
    /// Returns the policy name as snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OovPolicy::Reject => "reject",
            OovPolicy::Sentinel => "sentinel",
        }
    }
}

/// Rule used to give hidden states a stable identity across samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentRule {
    /// State with the higher reference-token emission comes first.
    #[default]
    ReferenceToken,

    /// State with the lower emission entropy comes first.
    Entropy,
}

impl AlignmentRule {
    /// Returns the rule name as snake_case string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AlignmentRule::ReferenceToken => "reference_token",
            AlignmentRule::Entropy => "entropy",
        }
    }
}

/// Settings for one tokenization scheme.
///
/// `target_len` (L) is deliberately independent of the vocabulary size V.
/// When `2 * V > L` the encoded vector is truncated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeConfig {
    /// Token used to align hidden states, e.g. the most frequent opcode.
    pub reference_token: String,

    /// Fixed feature vector length L.
    pub target_len: usize,

    /// Hidden-state count. Must be 2.
    #[serde(default = "default_hidden_states")]
    pub hidden_states: usize,

    #[serde(default)]
    pub oov_policy: OovPolicy,

    #[serde(default)]
    pub alignment: AlignmentRule,
}

fn default_hidden_states() -> usize {
    HIDDEN_STATES
}

impl SchemeConfig {
    /// Creates a scheme with default policy settings.
    pub fn new(reference_token: impl Into<String>, target_len: usize) -> Self {
        Self {
            reference_token: reference_token.into(),
            target_len,
            hidden_states: HIDDEN_STATES,
            oov_policy: OovPolicy::default(),
            alignment: AlignmentRule::default(),
        }
    }

    /// Top-31 opcode scheme: 2 states x 31 opcodes, no padding or truncation.
    pub fn top31() -> Self {
        Self::new("mov", 62)
    }

    /// Validate scheme values.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if hidden_states != 2
    /// - `EmbeddingError::ConfigError` if target_len is 0
    /// - `EmbeddingError::ConfigError` if reference_token is empty
    pub fn validate(&self) -> EmbeddingResult<()> {
        if self.hidden_states != HIDDEN_STATES {
            return Err(EmbeddingError::ConfigError {
                message: format!(
                    "hidden_states must be {}, got {}",
                    HIDDEN_STATES, self.hidden_states
                ),
            });
        }

        if self.target_len == 0 {
            return Err(EmbeddingError::ConfigError {
                message: "target_len must be > 0".to_string(),
            });
        }

        if self.reference_token.is_empty() {
            return Err(EmbeddingError::ConfigError {
                message: "reference_token must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top31_preset() {
        let scheme = SchemeConfig::top31();
        assert_eq!(scheme.reference_token, "mov");
        assert_eq!(scheme.target_len, 62);
        assert_eq!(scheme.oov_policy, OovPolicy::Reject);
        scheme.validate().unwrap();
    }

    #[test]
    fn test_three_states_rejected() {
        let scheme = SchemeConfig {
            hidden_states: 3,
            ..SchemeConfig::top31()
        };
        let err = scheme.validate().unwrap_err();
        assert!(err.to_string().contains("hidden_states"));
    }

    #[test]
    fn test_policy_names() {
        assert_eq!(OovPolicy::Sentinel.as_str(), "sentinel");
        assert_eq!(AlignmentRule::ReferenceToken.as_str(), "reference_token");
    }
}
