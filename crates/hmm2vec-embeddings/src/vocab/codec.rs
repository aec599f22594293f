//! Token sequence to integer code mapping.

use std::sync::Arc;

use super::Vocabulary;
use crate::config::OovPolicy;
use crate::error::FitError;

/// Encodes token sequences against a fixed vocabulary.
///
/// Pure mapping; cheap to clone and share between workers.
#[derive(Debug, Clone)]
pub struct Codec {
    vocab: Arc<Vocabulary>,
    policy: OovPolicy,
}

impl Codec {
    pub fn new(vocab: Arc<Vocabulary>, policy: OovPolicy) -> Self {
        Self { vocab, policy }
    }

    #[must_use]
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    #[must_use]
    pub fn policy(&self) -> OovPolicy {
        self.policy
    }

    /// Size of the emission alphabet: V, plus one under the sentinel policy.
    #[must_use]
    pub fn n_symbols(&self) -> usize {
        match self.policy {
            OovPolicy::Reject => self.vocab.len(),
            OovPolicy::Sentinel => self.vocab.len() + 1,
        }
    }

    /// Code assigned to unknown tokens under the sentinel policy.
    #[must_use]
    pub fn sentinel(&self) -> Option<usize> {
        match self.policy {
            OovPolicy::Reject => None,
            OovPolicy::Sentinel => Some(self.vocab.len()),
        }
    }

    /// Encodes one sample.
    ///
    /// # Errors
    /// - `FitError::UnknownToken` for the first unknown token under `OovPolicy::Reject`
    pub fn encode<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<usize>, FitError> {
        let sentinel = self.sentinel();

        tokens
            .iter()
            .enumerate()
            .map(|(position, token)| {
                let token = token.as_ref();
                match (self.vocab.get(token), sentinel) {
                    (Some(code), _) => Ok(code),
                    (None, Some(code)) => Ok(code),
                    (None, None) => Err(FitError::UnknownToken {
                        token: token.to_string(),
                        position,
                    }),
                }
            })
            .collect()
    }
}
