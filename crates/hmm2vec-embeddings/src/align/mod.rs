//! Hidden-state alignment across independently fitted models.
//!
//! State identity is arbitrary per fit (label switching). An aligner reorders
//! the emission rows so that "state 0" means the same thing for every sample.
//!
//! - [`ReferenceTokenAligner`]: row with the higher probability on the
//!   reference token first. Default for compatibility with existing vectors.
//! - [`EntropyAligner`]: row with the lower emission entropy first.
//!
//! Both keep the original order on exact ties.

use std::sync::Arc;

use crate::config::AlignmentRule;
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::hmm::EmissionMatrix;

/// Canonical ordering rule for the two emission rows.
pub trait StateAligner: Send + Sync + std::fmt::Debug {
    /// Returns the matrix with rows in canonical order.
    fn align(&self, emission: EmissionMatrix) -> EmissionMatrix;

    /// Rule name for logs and artifact metadata.
    fn name(&self) -> &'static str;
}

/// Builds the aligner for a scheme's configured rule.
///
/// # Errors
/// - `EmbeddingError::ReferenceIndexOutOfRange` if the reference column is
///   outside the emission alphabet (only checked for the reference rule)
pub fn aligner_for(
    rule: AlignmentRule,
    reference_index: usize,
    n_symbols: usize,
) -> EmbeddingResult<Arc<dyn StateAligner>> {
    match rule {
        AlignmentRule::ReferenceToken => Ok(Arc::new(ReferenceTokenAligner::new(
            reference_index,
            n_symbols,
        )?)),
        AlignmentRule::Entropy => Ok(Arc::new(EntropyAligner)),
    }
}

/// Orders states by their emission probability on a reference token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTokenAligner {
    reference_index: usize,
}

impl ReferenceTokenAligner {
    /// Validates the reference column once, up front.
    ///
    /// # Errors
    /// - `EmbeddingError::ReferenceIndexOutOfRange` if `reference_index >= n_symbols`
    pub fn new(reference_index: usize, n_symbols: usize) -> EmbeddingResult<Self> {
        if reference_index >= n_symbols {
            return Err(EmbeddingError::ReferenceIndexOutOfRange {
                index: reference_index,
                n_symbols,
            });
        }
        Ok(Self { reference_index })
    }

    #[must_use]
    pub fn reference_index(&self) -> usize {
        self.reference_index
    }
}

impl StateAligner for ReferenceTokenAligner {
    fn align(&self, emission: EmissionMatrix) -> EmissionMatrix {
        let r = self.reference_index;
        let p0 = emission.row(0)[r];
        let p1 = emission.row(1)[r];
        if p1 > p0 {
            emission.swapped()
        } else {
            emission
        }
    }

    fn name(&self) -> &'static str {
        "reference_token"
    }
}

/// Orders states by Shannon entropy of their emission rows, lowest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntropyAligner;

fn entropy(row: &[f64]) -> f64 {
    -row.iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| p * p.ln())
        .sum::<f64>()
}

impl StateAligner for EntropyAligner {
    fn align(&self, emission: EmissionMatrix) -> EmissionMatrix {
        if entropy(emission.row(1)) < entropy(emission.row(0)) {
            emission.swapped()
        } else {
            emission
        }
    }

    fn name(&self) -> &'static str {
        "entropy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(row0: &[f64], row1: &[f64]) -> EmissionMatrix {
        EmissionMatrix::from_rows(row0, row1).unwrap()
    }

    #[test]
    fn test_reference_row_moves_to_front() {
        let aligner = ReferenceTokenAligner::new(0, 2).unwrap();
        let aligned = aligner.align(matrix(&[0.1, 0.9], &[0.6, 0.4]));
        assert_eq!(aligned.row(0), &[0.6, 0.4]);
        assert_eq!(aligned.row(1), &[0.1, 0.9]);
    }

    #[test]
    fn test_already_canonical_untouched() {
        let aligner = ReferenceTokenAligner::new(1, 3).unwrap();
        let b = matrix(&[0.2, 0.5, 0.3], &[0.4, 0.1, 0.5]);
        assert_eq!(aligner.align(b.clone()), b);
    }

    #[test]
    fn test_exact_tie_keeps_original_order() {
        let aligner = ReferenceTokenAligner::new(0, 3).unwrap();
        let b = matrix(&[0.5, 0.5, 0.0], &[0.5, 0.0, 0.5]);
        assert_eq!(aligner.align(b.clone()), b);

        let b = matrix(&[0.5, 0.0, 0.5], &[0.5, 0.5, 0.0]);
        assert_eq!(aligner.align(b.clone()), b);
    }

    #[test]
    fn test_reference_property_holds_after_alignment() {
        let aligner = ReferenceTokenAligner::new(2, 3).unwrap();
        let cases = [
            matrix(&[0.1, 0.1, 0.8], &[0.3, 0.3, 0.4]),
            matrix(&[0.3, 0.3, 0.4], &[0.1, 0.1, 0.8]),
            matrix(&[0.0, 1.0, 0.0], &[0.5, 0.5, 0.0]),
        ];
        for b in cases {
            let aligned = aligner.align(b);
            assert!(aligned.row(0)[2] >= aligned.row(1)[2]);
        }
    }

    #[test]
    fn test_out_of_range_reference_rejected_up_front() {
        let err = ReferenceTokenAligner::new(5, 5).unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::ReferenceIndexOutOfRange {
                index: 5,
                n_symbols: 5
            }
        ));
    }

    #[test]
    fn test_entropy_aligner_puts_peaked_row_first() {
        let aligned = EntropyAligner.align(matrix(&[0.5, 0.5], &[0.9, 0.1]));
        assert_eq!(aligned.row(0), &[0.9, 0.1]);
        assert_eq!(EntropyAligner.name(), "entropy");
    }

    #[test]
    fn test_entropy_tie_keeps_original_order() {
        // Mirror-image rows have identical entropy.
        let b = matrix(&[0.7, 0.3], &[0.3, 0.7]);
        assert_eq!(EntropyAligner.align(b.clone()), b);

        let b = matrix(&[0.3, 0.7], &[0.7, 0.3]);
        assert_eq!(EntropyAligner.align(b.clone()), b);
    }

    #[test]
    fn test_aligner_for_rules() {
        let reference = aligner_for(AlignmentRule::ReferenceToken, 0, 2).unwrap();
        assert_eq!(reference.name(), "reference_token");
        assert!(aligner_for(AlignmentRule::ReferenceToken, 2, 2).is_err());

        // Entropy alignment ignores the reference column entirely.
        let entropy = aligner_for(AlignmentRule::Entropy, 99, 2).unwrap();
        assert_eq!(entropy.name(), "entropy");
    }
}
