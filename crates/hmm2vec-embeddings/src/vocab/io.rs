//! Vocabulary file loading and saving.
//!
//! `.json` files hold a JSON array of strings and are lossless. Any other
//! extension is read as newline-delimited tokens with each line trimmed and
//! blank lines ignored, so tokens that are empty, carry edge whitespace, or
//! contain a line break can only be stored as `.json`.

use std::fs;
use std::path::Path;

use super::Vocabulary;
use crate::error::{EmbeddingError, EmbeddingResult};

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

/// A token survives a write/trim/read cycle of the line format.
fn is_line_safe(token: &str) -> bool {
    !token.is_empty() && token.trim() == token && !token.contains(['\n', '\r'])
}

impl Vocabulary {
    /// Loads a vocabulary file.
    ///
    /// # Errors
    /// - `EmbeddingError::IoError` if the file cannot be read
    /// - `EmbeddingError::InvalidVocabulary` on malformed JSON, duplicates, or empty files
    pub fn load(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;

        let vocab = if is_json(path) {
            let tokens: Vec<String> =
                serde_json::from_str(&contents).map_err(|e| EmbeddingError::InvalidVocabulary {
                    message: format!("'{}' is not a JSON string array: {}", path.display(), e),
                })?;
            Self::from_tokens(tokens)?
        } else {
            Self::from_tokens(
                contents
                    .lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty()),
            )?
        };

        tracing::info!(
            path = %path.display(),
            vocab_size = vocab.len(),
            "Loaded vocabulary"
        );
        Ok(vocab)
    }

    /// Writes the vocabulary in the format implied by the file extension.
    ///
    /// # Errors
    /// - `EmbeddingError::InvalidVocabulary` if a token cannot be represented
    ///   in the newline-delimited format
    /// - `EmbeddingError::IoError` if the file cannot be written
    pub fn save(&self, path: impl AsRef<Path>) -> EmbeddingResult<()> {
        let path = path.as_ref();

        let contents = if is_json(path) {
            serde_json::to_string_pretty(self.tokens()).map_err(|e| {
                EmbeddingError::InvalidVocabulary {
                    message: format!("failed to serialize vocabulary: {}", e),
                }
            })?
        } else {
            if let Some((code, token)) = self
                .tokens()
                .iter()
                .enumerate()
                .find(|(_, t)| !is_line_safe(t))
            {
                return Err(EmbeddingError::InvalidVocabulary {
                    message: format!(
                        "token {} ({:?}) does not survive the line format of '{}'; save as .json",
                        code,
                        token,
                        path.display()
                    ),
                });
            }
            let mut text = self.tokens().join("\n");
            text.push('\n');
            text
        };

        fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_newline_delimited() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("top31.txt");
        fs::write(&path, "mov\npush\n\n  pop  \n").unwrap();

        let vocab = Vocabulary::load(&path).unwrap();
        assert_eq!(vocab.tokens(), &["mov", "push", "pop"]);
    }

    #[test]
    fn test_json_save_load_preserves_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.json");
        let vocab = Vocabulary::from_tokens(["xor", "mov", "lea"]).unwrap();

        vocab.save(&path).unwrap();
        let loaded = Vocabulary::load(&path).unwrap();
        assert_eq!(loaded, vocab);
    }

    #[test]
    fn test_malformed_json_is_invalid_vocabulary() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.json");
        fs::write(&path, "{\"mov\": 0}").unwrap();

        let err = Vocabulary::load(&path).unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidVocabulary { .. }));
    }

    #[test]
    fn test_line_format_rejects_unrepresentable_tokens() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.txt");

        for bad in [" mov", "push\npop", "lea\r", ""] {
            let vocab = Vocabulary::from_tokens(["xor", bad]).unwrap();
            let err = vocab.save(&path).unwrap_err();
            assert!(
                matches!(err, EmbeddingError::InvalidVocabulary { .. }),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(!path.exists());

        let json = dir.path().join("vocab.json");
        let vocab = Vocabulary::from_tokens(["xor", " mov", "push\npop"]).unwrap();
        vocab.save(&json).unwrap();
        assert_eq!(Vocabulary::load(&json).unwrap(), vocab);
    }

    #[test]
    fn test_line_format_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vocab.txt");
        let vocab = Vocabulary::from_tokens(["mov_mov", "mov_push", "##call"]).unwrap();
        vocab.save(&path).unwrap();
        assert_eq!(Vocabulary::load(&path).unwrap(), vocab);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = Vocabulary::load("/nonexistent/vocab.txt").unwrap_err();
        assert!(matches!(err, EmbeddingError::IoError(_)));
    }
}
