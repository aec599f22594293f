//! Closed token vocabularies and the token-to-code codec.
//!
//! A [`Vocabulary`] is built once per tokenization scheme and shared
//! read-only across every fit of that scheme. The [`Codec`] applies the
//! scheme's out-of-vocabulary policy when encoding a sample.
//!
//! # Module Structure
//!
//! - `codec`: token sequence to dense integer codes
//! - `io`: JSON array / newline-delimited vocabulary files

mod codec;
mod io;

pub use codec::Codec;

use std::collections::HashMap;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Ordered set of unique tokens with O(1) code lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
    tokens: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from an ordered token list.
    ///
    /// # Errors
    /// - `EmbeddingError::InvalidVocabulary` if the list is empty or has duplicates
    pub fn from_tokens<I, S>(tokens: I) -> EmbeddingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocab = Self {
            tokens: Vec::new(),
            index: HashMap::new(),
        };

        for token in tokens {
            let token = token.into();
            if vocab.index.contains_key(&token) {
                return Err(EmbeddingError::InvalidVocabulary {
                    message: format!("duplicate token '{}'", token),
                });
            }
            vocab.push(token);
        }

        if vocab.is_empty() {
            return Err(EmbeddingError::InvalidVocabulary {
                message: "vocabulary is empty".to_string(),
            });
        }

        Ok(vocab)
    }

    /// Builds a vocabulary from a corpus, assigning codes in order of first
    /// appearance.
    ///
    /// # Errors
    /// - `EmbeddingError::InvalidVocabulary` if the corpus has no tokens
    pub fn from_corpus<I, S>(samples: I) -> EmbeddingResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[String]>,
    {
        let mut vocab = Self {
            tokens: Vec::new(),
            index: HashMap::new(),
        };

        for sample in samples {
            for token in sample.as_ref() {
                if !vocab.index.contains_key(token) {
                    vocab.push(token.clone());
                }
            }
        }

        if vocab.is_empty() {
            return Err(EmbeddingError::InvalidVocabulary {
                message: "corpus contains no tokens".to_string(),
            });
        }

        tracing::debug!(vocab_size = vocab.len(), "Built vocabulary from corpus");
        Ok(vocab)
    }

    /// Most frequent token across a corpus. Ties go to the token seen first.
    pub fn most_frequent<I, S>(samples: I) -> Option<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[String]>,
    {
        let mut counts: HashMap<String, (usize, usize)> = HashMap::new();
        let mut next_order = 0usize;

        for sample in samples {
            for token in sample.as_ref() {
                let entry = counts.entry(token.clone()).or_insert_with(|| {
                    next_order += 1;
                    (0, next_order)
                });
                entry.0 += 1;
            }
        }

        counts
            .into_iter()
            .max_by(|(_, (ca, oa)), (_, (cb, ob))| ca.cmp(cb).then(ob.cmp(oa)))
            .map(|(token, _)| token)
    }

    fn push(&mut self, token: String) {
        self.index.insert(token.clone(), self.tokens.len());
        self.tokens.push(token);
    }

    /// Number of tokens (V).
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Tokens in code order.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Code of a token, if present.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<usize> {
        self.index.get(token).copied()
    }

    /// Token for a code, if in range.
    #[must_use]
    pub fn token(&self, code: usize) -> Option<&str> {
        self.tokens.get(code).map(String::as_str)
    }

    /// Code of a token that must be present, such as the reference token.
    ///
    /// # Errors
    /// - `EmbeddingError::ReferenceTokenMissing` if the token is absent
    pub fn require(&self, token: &str) -> EmbeddingResult<usize> {
        self.get(token).ok_or_else(|| EmbeddingError::ReferenceTokenMissing {
            token: token.to_string(),
            vocab_size: self.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_from_tokens_assigns_dense_codes() {
        let vocab = Vocabulary::from_tokens(["mov", "push", "pop"]).unwrap();
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.get("mov"), Some(0));
        assert_eq!(vocab.get("pop"), Some(2));
        assert_eq!(vocab.token(1), Some("push"));
        assert_eq!(vocab.get("jmp"), None);
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let err = Vocabulary::from_tokens(["mov", "mov"]).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidVocabulary { .. }));
    }

    #[test]
    fn test_empty_vocabulary_rejected() {
        let err = Vocabulary::from_tokens(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidVocabulary { .. }));
    }

    #[test]
    fn test_from_corpus_first_appearance_order() {
        let corpus = vec![sample(&["push", "mov"]), sample(&["mov", "call", "push"])];
        let vocab = Vocabulary::from_corpus(&corpus).unwrap();
        assert_eq!(vocab.tokens(), &sample(&["push", "mov", "call"])[..]);
    }

    #[test]
    fn test_most_frequent_breaks_ties_by_first_seen() {
        let corpus = vec![sample(&["push", "mov", "mov"]), sample(&["push", "call"])];
        assert_eq!(Vocabulary::most_frequent(&corpus).as_deref(), Some("push"));

        let corpus = vec![sample(&["call", "mov", "mov"])];
        assert_eq!(Vocabulary::most_frequent(&corpus).as_deref(), Some("mov"));

        assert_eq!(Vocabulary::most_frequent(Vec::<Vec<String>>::new()), None);
    }

    #[test]
    fn test_require_missing_reference_is_fatal_error() {
        let vocab = Vocabulary::from_tokens(["push", "pop"]).unwrap();
        let err = vocab.require("mov").unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::ReferenceTokenMissing { ref token, vocab_size: 2 } if token == "mov"
        ));
    }
}
