//! Baum-Welch fitting of a two-state categorical HMM to a single sequence.
//!
//! Forward and backward passes use per-step scaling (Rabiner), so traces of
//! hundreds of thousands of opcodes neither underflow nor need log-space
//! arithmetic. The log-likelihood is the sum of the log scaling factors.

use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use super::emission::EmissionMatrix;
use crate::config::{FitConfig, HIDDEN_STATES};
use crate::error::FitError;

const N: usize = HIDDEN_STATES;

/// Bytes of EM scratch space per observation (alpha, beta, scale).
pub const WORKING_BYTES_PER_OBSERVATION: usize = (2 * N + 1) * std::mem::size_of::<f64>();

/// Result of one successful fit. The transition and initial parameters are
/// dropped with the model; only the emission matrix survives.
#[derive(Debug, Clone, PartialEq)]
pub struct FitReport {
    pub emission: EmissionMatrix,
    /// EM iterations performed.
    pub iterations: usize,
    /// Log-likelihood of the sequence under the parameters of the last E-step.
    pub log_likelihood: f64,
    /// Whether the likelihood plateaued before the iteration budget ran out.
    pub converged: bool,
}

/// Transient per-sequence model, owned by a single fit.
struct HmmModel {
    start: [f64; N],
    transition: [[f64; N]; N],
    /// Row-major `[N, n_symbols]`.
    emission: Vec<f64>,
    n_symbols: usize,
}

/// Sufficient statistics from one E-step.
struct Expectations {
    log_likelihood: f64,
    start: [f64; N],
    transition: [[f64; N]; N],
    emission: Vec<f64>,
    occupancy: [f64; N],
}

impl HmmModel {
    /// Uniform start and transition probabilities, random emission rows.
    fn initialize(n_symbols: usize, rng: &mut ChaCha8Rng) -> Self {
        let mut emission: Vec<f64> = (0..N * n_symbols).map(|_| rng.gen::<f64>()).collect();
        for row in emission.chunks_mut(n_symbols) {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 {
                row.iter_mut().for_each(|p| *p /= sum);
            } else {
                row.iter_mut().for_each(|p| *p = 1.0 / n_symbols as f64);
            }
        }

        Self {
            start: [1.0 / N as f64; N],
            transition: [[1.0 / N as f64; N]; N],
            emission,
            n_symbols,
        }
    }

    #[inline]
    fn b(&self, state: usize, symbol: usize) -> f64 {
        self.emission[state * self.n_symbols + symbol]
    }

    /// Scaled forward-backward pass and accumulation of expected counts.
    fn expectations(&self, obs: &[usize]) -> Result<Expectations, FitError> {
        let t_len = obs.len();
        let mut alpha = vec![[0.0f64; N]; t_len];
        let mut beta = vec![[0.0f64; N]; t_len];
        let mut scale = vec![0.0f64; t_len];

        // Forward
        for i in 0..N {
            alpha[0][i] = self.start[i] * self.b(i, obs[0]);
        }
        scale[0] = normalize(&mut alpha[0], 0)?;

        for t in 1..t_len {
            for j in 0..N {
                let mut acc = 0.0;
                for i in 0..N {
                    acc += alpha[t - 1][i] * self.transition[i][j];
                }
                alpha[t][j] = acc * self.b(j, obs[t]);
            }
            scale[t] = normalize(&mut alpha[t], t)?;
        }

        // Backward, reusing the forward scale factors
        beta[t_len - 1] = [1.0; N];
        for t in (0..t_len - 1).rev() {
            for i in 0..N {
                let mut acc = 0.0;
                for j in 0..N {
                    acc += self.transition[i][j] * self.b(j, obs[t + 1]) * beta[t + 1][j];
                }
                beta[t][i] = acc / scale[t + 1];
            }
        }

        let log_likelihood: f64 = scale.iter().map(|c| c.ln()).sum();

        let mut stats = Expectations {
            log_likelihood,
            start: [0.0; N],
            transition: [[0.0; N]; N],
            emission: vec![0.0; N * self.n_symbols],
            occupancy: [0.0; N],
        };

        for t in 0..t_len {
            for i in 0..N {
                let gamma = alpha[t][i] * beta[t][i];
                if t == 0 {
                    stats.start[i] = gamma;
                }
                stats.emission[i * self.n_symbols + obs[t]] += gamma;
                stats.occupancy[i] += gamma;
            }
            if t + 1 < t_len {
                for i in 0..N {
                    for j in 0..N {
                        stats.transition[i][j] += alpha[t][i]
                            * self.transition[i][j]
                            * self.b(j, obs[t + 1])
                            * beta[t + 1][j]
                            / scale[t + 1];
                    }
                }
            }
        }

        Ok(stats)
    }

    /// M-step. A state that received no probability mass keeps its previous
    /// parameters rather than becoming an all-zero row.
    fn maximize(&mut self, stats: &Expectations) {
        let start_sum: f64 = stats.start.iter().sum();
        if start_sum > 0.0 && start_sum.is_finite() {
            for i in 0..N {
                self.start[i] = stats.start[i] / start_sum;
            }
        }

        for i in 0..N {
            let row_sum: f64 = stats.transition[i].iter().sum();
            if row_sum > 0.0 && row_sum.is_finite() {
                for j in 0..N {
                    self.transition[i][j] = stats.transition[i][j] / row_sum;
                }
            }
        }

        for i in 0..N {
            let occupancy = stats.occupancy[i];
            if occupancy > 0.0 && occupancy.is_finite() {
                let m = self.n_symbols;
                for k in 0..m {
                    self.emission[i * m + k] = stats.emission[i * m + k] / occupancy;
                }
            }
        }
    }

    /// Consumes the model, keeping only a renormalized emission matrix.
    fn into_emission(mut self) -> Result<EmissionMatrix, FitError> {
        for row in self.emission.chunks_mut(self.n_symbols) {
            let sum: f64 = row.iter().sum();
            if sum > 0.0 && sum.is_finite() {
                row.iter_mut().for_each(|p| *p /= sum);
            }
        }
        let matrix = EmissionMatrix::new(self.n_symbols, self.emission).map_err(|e| {
            FitError::NumericalFailure {
                reason: e.to_string(),
            }
        })?;
        matrix.check_distribution()?;
        Ok(matrix)
    }
}

/// Normalizes one forward step in place and returns its scale factor.
fn normalize(step: &mut [f64; N], t: usize) -> Result<f64, FitError> {
    let sum: f64 = step.iter().sum();
    if !(sum > 0.0 && sum.is_finite()) {
        return Err(FitError::NumericalFailure {
            reason: format!("forward scale factor {} at step {}", sum, t),
        });
    }
    step.iter_mut().for_each(|p| *p /= sum);
    Ok(sum)
}

/// Rejects inputs for which two hidden states cannot be distinguished.
///
/// # Errors
/// - `FitError::TooShort` for fewer than 2 observations
/// - `FitError::SymbolOutOfRange` for codes `>= n_symbols`
/// - `FitError::SingleSymbol` when every observation is the same symbol
pub fn check_sequence(obs: &[usize], n_symbols: usize) -> Result<(), FitError> {
    if obs.len() < 2 {
        return Err(FitError::TooShort { len: obs.len() });
    }

    if let Some((position, &symbol)) = obs.iter().enumerate().find(|(_, s)| **s >= n_symbols) {
        return Err(FitError::SymbolOutOfRange {
            symbol,
            position,
            n_symbols,
        });
    }

    let first = obs[0];
    if obs.iter().all(|&s| s == first) {
        return Err(FitError::SingleSymbol { symbol: first });
    }

    Ok(())
}

/// Stateless Baum-Welch fitter.
///
/// Every call builds, trains, and drops its own model. Nothing is shared or
/// warm-started between calls, so one fitter can serve all workers.
#[derive(Debug, Clone)]
pub struct BaumWelchFitter {
    config: FitConfig,
}

impl BaumWelchFitter {
    pub fn new(config: FitConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Fits one sequence, enforcing the configured per-sample timeout.
    ///
    /// # Errors
    /// Any `FitError`; all of them are recoverable at the sample boundary.
    pub fn fit(&self, obs: &[usize], n_symbols: usize) -> Result<FitReport, FitError> {
        let deadline = self.config.timeout().map(|t| Instant::now() + t);
        self.fit_with_deadline(obs, n_symbols, deadline)
    }

    /// Fits one sequence, giving up once `deadline` has passed. The deadline is
    /// checked between EM iterations.
    ///
    /// # Errors
    /// Any `FitError`; all of them are recoverable at the sample boundary.
    pub fn fit_with_deadline(
        &self,
        obs: &[usize],
        n_symbols: usize,
        deadline: Option<Instant>,
    ) -> Result<FitReport, FitError> {
        check_sequence(obs, n_symbols)?;

        let started = Instant::now();
        let mut rng = self.rng();
        let mut model = HmmModel::initialize(n_symbols, &mut rng);

        let mut prev_ll = f64::NEG_INFINITY;
        let mut log_likelihood = f64::NEG_INFINITY;
        let mut converged = false;
        let mut iterations = 0;

        while iterations < self.config.max_iterations {
            let stats = model.expectations(obs)?;
            model.maximize(&stats);
            iterations += 1;

            log_likelihood = stats.log_likelihood;
            if !log_likelihood.is_finite() {
                return Err(FitError::NumericalFailure {
                    reason: format!("log-likelihood {} at iteration {}", log_likelihood, iterations),
                });
            }

            trace!(iteration = iterations, log_likelihood, "EM step");

            if log_likelihood - prev_ll < self.config.tolerance {
                converged = true;
                break;
            }
            prev_ll = log_likelihood;

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(FitError::Timeout {
                    elapsed_ms: started.elapsed().as_millis() as u64,
                    iterations,
                });
            }
        }

        debug!(
            observations = obs.len(),
            n_symbols,
            iterations,
            converged,
            log_likelihood,
            "Fitted sequence model"
        );

        Ok(FitReport {
            emission: model.into_emission()?,
            iterations,
            log_likelihood,
            converged,
        })
    }
}
