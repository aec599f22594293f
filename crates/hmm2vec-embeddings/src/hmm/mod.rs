//! Per-sequence two-state hidden Markov model fitting.
//!
//! # Module Structure
//!
//! - `emission`: the `[2, W]` emission matrix handed to alignment and encoding
//! - `fitter`: stateless Baum-Welch fitter with degenerate-input detection

mod emission;
mod fitter;

pub use emission::{EmissionMatrix, ROW_SUM_TOLERANCE};
pub use fitter::{check_sequence, BaumWelchFitter, FitReport, WORKING_BYTES_PER_OBSERVATION};
