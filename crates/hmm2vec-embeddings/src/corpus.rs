//! Corpus and label file readers.
//!
//! The corpus is JSON Lines: one JSON array of token strings per sample.
//! Blank lines are skipped and do not count as samples. [`CorpusReader`]
//! parses lazily so the orchestrator only ever holds one chunk in memory.

use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use crate::error::{EmbeddingError, EmbeddingResult};

/// Streaming reader over a JSON Lines corpus.
pub struct CorpusReader<R: BufRead> {
    lines: Lines<R>,
    line_no: usize,
}

impl CorpusReader<BufReader<File>> {
    /// Opens a corpus file.
    ///
    /// # Errors
    /// - `EmbeddingError::IoError` if the file cannot be opened
    pub fn open(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let file = File::open(path.as_ref())?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> CorpusReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

impl<R: BufRead> Iterator for CorpusReader<R> {
    type Item = EmbeddingResult<Vec<String>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(EmbeddingError::IoError(e))),
            };
            self.line_no += 1;

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            return Some(serde_json::from_str::<Vec<String>>(trimmed).map_err(|e| {
                EmbeddingError::CorpusParse {
                    line: self.line_no,
                    message: e.to_string(),
                }
            }));
        }
    }
}

/// Reads a whole corpus into memory.
///
/// # Errors
/// - `EmbeddingError::IoError` / `EmbeddingError::CorpusParse` on bad input
pub fn read_corpus(path: impl AsRef<Path>) -> EmbeddingResult<Vec<Vec<String>>> {
    CorpusReader::open(path)?.collect()
}

/// Counts samples without parsing them.
///
/// # Errors
/// - `EmbeddingError::IoError` if the file cannot be read
pub fn count_samples(path: impl AsRef<Path>) -> EmbeddingResult<usize> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    let mut count = 0;
    for line in reader.lines() {
        if !line?.trim().is_empty() {
            count += 1;
        }
    }
    Ok(count)
}

/// Loads an integer label array: a JSON array for `.json`, otherwise one
/// integer per non-blank line.
///
/// # Errors
/// - `EmbeddingError::IoError` if the file cannot be read
/// - `EmbeddingError::ConfigError` on malformed labels
pub fn load_labels(path: impl AsRef<Path>) -> EmbeddingResult<Vec<i64>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return serde_json::from_str(&contents).map_err(|e| EmbeddingError::ConfigError {
            message: format!("labels file '{}' is not a JSON integer array: {}", path.display(), e),
        });
    }

    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            line.trim().parse::<i64>().map_err(|e| EmbeddingError::ConfigError {
                message: format!(
                    "labels file '{}' line {}: '{}' is not an integer: {}",
                    path.display(),
                    i + 1,
                    line.trim(),
                    e
                ),
            })
        })
        .collect()
}

/// Fails fast unless the label array lines up with the corpus.
///
/// # Errors
/// - `EmbeddingError::LabelCountMismatch` if the counts differ
pub fn check_label_count(corpus: usize, labels: usize) -> EmbeddingResult<()> {
    if corpus != labels {
        tracing::error!(corpus, labels, "Label count does not match corpus");
        return Err(EmbeddingError::LabelCountMismatch { corpus, labels });
    }
    Ok(())
}
