//! Two-state emission matrix.

use crate::config::HIDDEN_STATES;
use crate::error::{EmbeddingError, EmbeddingResult, FitError};

/// Maximum deviation of an emission row sum from 1.0.
pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

/// Emission matrix B with `HIDDEN_STATES` rows and one column per symbol,
/// stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct EmissionMatrix {
    width: usize,
    data: Vec<f64>,
}

impl EmissionMatrix {
    /// Wraps row-major data of shape `[HIDDEN_STATES, width]`.
    ///
    /// # Errors
    /// - `EmbeddingError::DimensionMismatch` if `data.len() != HIDDEN_STATES * width`
    pub fn new(width: usize, data: Vec<f64>) -> EmbeddingResult<Self> {
        if width == 0 || data.len() != HIDDEN_STATES * width {
            return Err(EmbeddingError::DimensionMismatch {
                expected: HIDDEN_STATES * width,
                actual: data.len(),
            });
        }
        Ok(Self { width, data })
    }

    /// Builds a matrix from its two rows.
    ///
    /// # Errors
    /// - `EmbeddingError::DimensionMismatch` if the rows differ in length or are empty
    pub fn from_rows(row0: &[f64], row1: &[f64]) -> EmbeddingResult<Self> {
        if row0.len() != row1.len() {
            return Err(EmbeddingError::DimensionMismatch {
                expected: row0.len(),
                actual: row1.len(),
            });
        }
        let mut data = Vec::with_capacity(row0.len() * HIDDEN_STATES);
        data.extend_from_slice(row0);
        data.extend_from_slice(row1);
        Self::new(row0.len(), data)
    }

    /// Number of symbols (columns).
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Emission distribution of one state.
    ///
    /// # Panics
    /// Panics if `state >= HIDDEN_STATES`.
    #[must_use]
    pub fn row(&self, state: usize) -> &[f64] {
        &self.data[state * self.width..(state + 1) * self.width]
    }

    /// P(symbol | state), or `None` when either index is out of range.
    #[must_use]
    pub fn get(&self, state: usize, symbol: usize) -> Option<f64> {
        if state >= HIDDEN_STATES || symbol >= self.width {
            return None;
        }
        Some(self.data[state * self.width + symbol])
    }

    /// Row-major flattened view, length `HIDDEN_STATES * width`.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Same matrix with the two state rows exchanged.
    #[must_use]
    pub fn swapped(self) -> Self {
        let mut data = self.data;
        let (first, second) = data.split_at_mut(self.width);
        first.swap_with_slice(second);
        Self {
            width: self.width,
            data,
        }
    }

    /// Checks that every row is a probability distribution.
    ///
    /// # Errors
    /// - `FitError::NumericalFailure` on NaN, infinite, negative, or non-normalized rows
    pub fn check_distribution(&self) -> Result<(), FitError> {
        for state in 0..HIDDEN_STATES {
            let row = self.row(state);
            if let Some(bad) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
                return Err(FitError::NumericalFailure {
                    reason: format!("emission row {} contains invalid probability {}", state, bad),
                });
            }
            let sum: f64 = row.iter().sum();
            if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(FitError::NumericalFailure {
                    reason: format!("emission row {} sums to {}", state, sum),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_get() {
        let b = EmissionMatrix::from_rows(&[0.7, 0.3], &[0.2, 0.8]).unwrap();
        assert_eq!(b.width(), 2);
        assert_eq!(b.row(1), &[0.2, 0.8]);
        assert_eq!(b.get(0, 1), Some(0.3));
        assert_eq!(b.get(0, 2), None);
        assert_eq!(b.get(2, 0), None);
        assert_eq!(b.as_slice(), &[0.7, 0.3, 0.2, 0.8]);
    }

    #[test]
    fn test_swapped_exchanges_rows() {
        let b = EmissionMatrix::from_rows(&[0.7, 0.3], &[0.2, 0.8]).unwrap();
        let s = b.swapped();
        assert_eq!(s.row(0), &[0.2, 0.8]);
        assert_eq!(s.row(1), &[0.7, 0.3]);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        assert!(EmissionMatrix::new(3, vec![0.0; 5]).is_err());
        assert!(EmissionMatrix::new(0, vec![]).is_err());
        assert!(EmissionMatrix::from_rows(&[1.0], &[0.5, 0.5]).is_err());
    }

    #[test]
    fn test_check_distribution() {
        let ok = EmissionMatrix::from_rows(&[0.5, 0.5], &[1.0, 0.0]).unwrap();
        assert!(ok.check_distribution().is_ok());

        let nan = EmissionMatrix::from_rows(&[f64::NAN, 1.0], &[1.0, 0.0]).unwrap();
        assert!(matches!(
            nan.check_distribution(),
            Err(FitError::NumericalFailure { .. })
        ));

        let unnormalized = EmissionMatrix::from_rows(&[0.5, 0.4], &[1.0, 0.0]).unwrap();
        assert!(unnormalized.check_distribution().is_err());

        let negative = EmissionMatrix::from_rows(&[1.5, -0.5], &[1.0, 0.0]).unwrap();
        assert!(negative.check_distribution().is_err());
    }
}
