//! Fixed-length vector encoding of canonical emission matrices.
//!
//! The matrix is flattened row-major to `2 * W` values and then fitted to the
//! scheme's target length L: zero right-padding when shorter, truncation to the
//! first L values when longer. Truncation drops the tail of row 1 (and, for
//! `W > L`, all of row 1 plus the tail of row 0) without warning per sample;
//! [`VectorEncoder::is_lossy`] lets callers report it once per run.

use crate::config::HIDDEN_STATES;
use crate::hmm::EmissionMatrix;

/// Pads or truncates flattened emission matrices to a fixed length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VectorEncoder {
    target_len: usize,
}

impl VectorEncoder {
    pub fn new(target_len: usize) -> Self {
        Self { target_len }
    }

    /// Output vector length L.
    #[must_use]
    pub fn target_len(&self) -> usize {
        self.target_len
    }

    /// Whether a matrix of `width` columns loses values when encoded.
    #[must_use]
    pub fn is_lossy(&self, width: usize) -> bool {
        HIDDEN_STATES * width > self.target_len
    }

    /// Number of flattened values discarded for a matrix of `width` columns.
    #[must_use]
    pub fn dropped_values(&self, width: usize) -> usize {
        (HIDDEN_STATES * width).saturating_sub(self.target_len)
    }

    /// Flattens and pads/truncates to exactly `target_len` values.
    #[must_use]
    pub fn encode(&self, emission: &EmissionMatrix) -> Vec<f64> {
        let flat = emission.as_slice();
        let keep = flat.len().min(self.target_len);

        let mut vector = Vec::with_capacity(self.target_len);
        vector.extend_from_slice(&flat[..keep]);
        vector.resize(self.target_len, 0.0);
        vector
    }

    /// All-zero vector used for degraded samples.
    #[must_use]
    pub fn fallback(&self) -> Vec<f64> {
        vec![0.0; self.target_len]
    }
}
