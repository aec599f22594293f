//! Chunked, order-preserving batch embedding.
//!
//! # Chunking
//!
//! The corpus iterator is drained `chunk_size` samples at a time. Each chunk
//! is fitted on a dedicated rayon pool and fully completed before the next
//! one is read, so peak memory is one chunk's working set plus the output
//! matrix. Within a chunk, rayon's indexed collect writes each outcome at the
//! sample's own offset; completion order never affects row order.
//!
//! # Failure Policy
//!
//! - Per-sample `FitError`s degrade the row to zeros and are counted.
//! - Corpus read/parse errors and oversized chunks abort the run.

use std::mem::size_of;
use std::time::Instant;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use super::summary::BatchSummary;
use crate::config::BatchConfig;
use crate::embedder::{SampleEmbedder, SampleOutcome};
use crate::error::{EmbeddingError, EmbeddingResult};
use crate::hmm::WORKING_BYTES_PER_OBSERVATION;
use crate::storage::FeatureMatrix;

/// Feature matrix plus run summary.
#[derive(Debug, Clone)]
pub struct BatchOutput {
    pub matrix: FeatureMatrix,
    pub summary: BatchSummary,
}

/// Drives a [`SampleEmbedder`] over a corpus in bounded chunks.
pub struct BatchOrchestrator {
    embedder: SampleEmbedder,
    config: BatchConfig,
    pool: ThreadPool,
}

impl BatchOrchestrator {
    /// Creates the orchestrator and its worker pool.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if the batch config is invalid
    /// - `EmbeddingError::WorkerPool` if the thread pool cannot be built
    pub fn new(embedder: SampleEmbedder, config: BatchConfig) -> EmbeddingResult<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers.unwrap_or(0))
            .thread_name(|i| format!("hmm2vec-fit-{}", i))
            .build()
            .map_err(|e| EmbeddingError::WorkerPool {
                message: e.to_string(),
            })?;

        info!(
            chunk_size = config.chunk_size,
            workers = pool.current_num_threads(),
            alignment = embedder.aligner().name(),
            reference_index = embedder.reference_index(),
            max_iterations = embedder.fitter().config().max_iterations,
            timeout_ms = embedder.fitter().config().timeout_ms,
            "Batch orchestrator ready"
        );

        Ok(Self {
            embedder,
            config,
            pool,
        })
    }

    #[must_use]
    pub fn embedder(&self) -> &SampleEmbedder {
        &self.embedder
    }

    #[must_use]
    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Worker threads per chunk.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Rough upper bound on the memory one chunk needs while being fitted:
    /// the token strings, encoded codes, EM scratch space, per-sample model
    /// parameters, and output vectors.
    #[must_use]
    pub fn estimate_chunk_bytes(&self, chunk: &[Vec<String>]) -> usize {
        let n_symbols = self.embedder.codec().n_symbols();
        let target_len = self.embedder.target_len();

        let per_sample_fixed = size_of::<Vec<String>>()
            // model emission, expected counts, canonical matrix
            + 3 * 2 * n_symbols * size_of::<f64>()
            + target_len * size_of::<f64>();

        chunk
            .iter()
            .map(|tokens| {
                let strings: usize = tokens.iter().map(|t| t.len() + size_of::<String>()).sum();
                let per_obs = WORKING_BYTES_PER_OBSERVATION + size_of::<usize>();
                strings + tokens.len() * per_obs + per_sample_fixed
            })
            .sum()
    }

    fn check_chunk_budget(&self, chunk_index: usize, chunk: &[Vec<String>]) -> EmbeddingResult<()> {
        if self.config.max_chunk_bytes == 0 {
            return Ok(());
        }
        let estimated_bytes = self.estimate_chunk_bytes(chunk);
        if estimated_bytes > self.config.max_chunk_bytes {
            tracing::error!(
                chunk = chunk_index,
                estimated_bytes,
                limit_bytes = self.config.max_chunk_bytes,
                "Chunk exceeds memory bound"
            );
            return Err(EmbeddingError::ResourceExhausted {
                chunk: chunk_index,
                estimated_bytes,
                limit_bytes: self.config.max_chunk_bytes,
            });
        }
        debug!(chunk = chunk_index, estimated_bytes, "Chunk within memory bound");
        Ok(())
    }

    /// Fits one chunk in parallel. Outcome `i` belongs to `chunk[i]`.
    fn embed_chunk(&self, chunk: &[Vec<String>]) -> Vec<SampleOutcome> {
        let embedder = &self.embedder;
        self.pool.install(|| {
            chunk
                .par_iter()
                .map(|tokens| embedder.embed_sample(tokens.as_slice()))
                .collect()
        })
    }

    /// Embeds every sample of a streamed corpus.
    ///
    /// # Errors
    /// - Any error yielded by `samples` (IO, parse)
    /// - `EmbeddingError::ResourceExhausted` if a chunk exceeds `max_chunk_bytes`
    pub fn run<I>(&self, samples: I) -> EmbeddingResult<BatchOutput>
    where
        I: IntoIterator<Item = EmbeddingResult<Vec<String>>>,
    {
        let started = Instant::now();
        let encoder = *self.embedder.encoder();
        let mut samples = samples.into_iter();
        let (rows_hint, _) = samples.size_hint();
        let mut matrix = FeatureMatrix::with_capacity(encoder.target_len(), rows_hint);
        let mut summary = BatchSummary::new(self.config.max_reported_degraded);
        let mut offset = 0usize;

        loop {
            let chunk: Vec<Vec<String>> = samples
                .by_ref()
                .take(self.config.chunk_size)
                .collect::<EmbeddingResult<_>>()?;
            if chunk.is_empty() {
                break;
            }

            let chunk_index = summary.chunks;
            let chunk_started = Instant::now();
            self.check_chunk_budget(chunk_index, &chunk)?;

            let outcomes = self.embed_chunk(&chunk);
            let chunk_len = chunk.len();
            drop(chunk);

            let mut chunk_degraded = 0usize;
            for (i, outcome) in outcomes.into_iter().enumerate() {
                let index = offset + i;
                if let Some(reason) = outcome.reason() {
                    warn!(sample = index, reason = %reason, "Sample degraded to zero vector");
                    summary.record_degraded(index, reason);
                    chunk_degraded += 1;
                }
                let degraded = outcome.is_degraded();
                matrix.push_row(&outcome.into_row(&encoder), degraded)?;
            }

            offset += chunk_len;
            summary.samples = offset;
            summary.chunks += 1;

            info!(
                chunk = chunk_index,
                samples = chunk_len,
                degraded = chunk_degraded,
                total = offset,
                elapsed_ms = chunk_started.elapsed().as_millis() as u64,
                "Chunk complete"
            );
        }

        summary.elapsed = started.elapsed();

        info!(
            samples = summary.samples,
            degraded = summary.degraded,
            chunks = summary.chunks,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            throughput = summary.throughput(),
            "Batch complete"
        );
        for (kind, count) in &summary.by_reason {
            info!(reason = kind, count, "Degraded samples by reason");
        }

        Ok(BatchOutput { matrix, summary })
    }

    /// Embeds an in-memory corpus.
    ///
    /// # Errors
    /// - `EmbeddingError::ResourceExhausted` if a chunk exceeds `max_chunk_bytes`
    pub fn run_in_memory(&self, samples: &[Vec<String>]) -> EmbeddingResult<BatchOutput> {
        self.run(samples.iter().cloned().map(Ok))
    }
}
