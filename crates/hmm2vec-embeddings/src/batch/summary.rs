//! Run summary for batch embedding.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::FitError;

/// Counts and samples of what happened during a batch run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Samples processed.
    pub samples: usize,
    /// Samples replaced by the all-zero fallback.
    pub degraded: usize,
    /// Chunks processed.
    pub chunks: usize,
    /// Wall clock time for the whole run.
    pub elapsed: Duration,
    /// Degraded sample count per `FitError::kind`.
    pub by_reason: BTreeMap<&'static str, usize>,
    /// First degraded samples as (corpus index, reason), capped.
    pub degraded_samples: Vec<(usize, FitError)>,
    max_reported: usize,
}

impl BatchSummary {
    pub fn new(max_reported: usize) -> Self {
        Self {
            max_reported,
            ..Self::default()
        }
    }

    pub(crate) fn record_degraded(&mut self, index: usize, reason: &FitError) {
        self.degraded += 1;
        *self.by_reason.entry(reason.kind()).or_insert(0) += 1;
        if self.degraded_samples.len() < self.max_reported {
            self.degraded_samples.push((index, reason.clone()));
        }
    }

    /// Fraction of samples that degraded, 0.0 for an empty run.
    #[must_use]
    pub fn degraded_ratio(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.degraded as f64 / self.samples as f64
        }
    }

    /// Samples per second over the whole run.
    #[must_use]
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.samples as f64 / secs
        } else {
            0.0
        }
    }
}
