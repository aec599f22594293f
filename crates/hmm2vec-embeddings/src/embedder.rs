//! Single-sample embedding: codec, fit, align, encode.
//!
//! [`SampleEmbedder::embed_sample`] is a pure function of the token sequence
//! and the embedder's immutable configuration, which is what lets the batch
//! orchestrator fan samples out over a worker pool without coordination.

use std::sync::Arc;

use tracing::{info, warn};

use crate::align::{aligner_for, StateAligner};
use crate::config::{FitConfig, SchemeConfig};
use crate::encoder::VectorEncoder;
use crate::error::{EmbeddingResult, FitError};
use crate::hmm::BaumWelchFitter;
use crate::vocab::{Codec, Vocabulary};

/// Tagged result of embedding one sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Vector of exactly the scheme's target length.
    Success(Vec<f64>),
    /// The fit failed; the row becomes the all-zero fallback.
    Degraded(FitError),
}

impl SampleOutcome {
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }

    /// Failure reason, if degraded.
    #[must_use]
    pub fn reason(&self) -> Option<&FitError> {
        match self {
            Self::Success(_) => None,
            Self::Degraded(reason) => Some(reason),
        }
    }

    /// Row to store in the feature matrix.
    #[must_use]
    pub fn into_row(self, encoder: &VectorEncoder) -> Vec<f64> {
        match self {
            Self::Success(vector) => vector,
            Self::Degraded(_) => encoder.fallback(),
        }
    }
}

/// Everything needed to turn one token sequence into a feature vector.
///
/// Construction performs the fatal configuration checks (reference token in
/// vocabulary, reference column in range) so that per-sample work can only
/// fail recoverably.
#[derive(Debug, Clone)]
pub struct SampleEmbedder {
    codec: Codec,
    fitter: BaumWelchFitter,
    aligner: Arc<dyn StateAligner>,
    encoder: VectorEncoder,
    reference_index: usize,
}

impl SampleEmbedder {
    /// Builds an embedder for one scheme.
    ///
    /// # Errors
    /// - `EmbeddingError::ConfigError` if the scheme or fit config is invalid
    /// - `EmbeddingError::ReferenceTokenMissing` if the reference token is not in `vocab`
    /// - `EmbeddingError::ReferenceIndexOutOfRange` if the reference column is unusable
    pub fn for_scheme(
        scheme: &SchemeConfig,
        vocab: Arc<Vocabulary>,
        fit: FitConfig,
    ) -> EmbeddingResult<Self> {
        scheme.validate()?;
        fit.validate()?;

        let reference_index = vocab.require(&scheme.reference_token).map_err(|e| {
            tracing::error!(
                reference_token = %scheme.reference_token,
                vocab_size = vocab.len(),
                "Reference token missing from vocabulary"
            );
            e
        })?;

        let codec = Codec::new(vocab, scheme.oov_policy);
        let n_symbols = codec.n_symbols();
        let aligner = aligner_for(scheme.alignment, reference_index, n_symbols)?;
        let encoder = VectorEncoder::new(scheme.target_len);

        if encoder.is_lossy(n_symbols) {
            warn!(
                n_symbols,
                target_len = scheme.target_len,
                dropped = encoder.dropped_values(n_symbols),
                "Flattened emission matrix exceeds target length; vectors will be truncated"
            );
        }

        info!(
            reference_token = %scheme.reference_token,
            reference_index,
            n_symbols,
            target_len = scheme.target_len,
            oov_policy = scheme.oov_policy.as_str(),
            alignment = aligner.name(),
            seeded = fit.seed.is_some(),
            "Sample embedder ready"
        );

        Ok(Self {
            codec,
            fitter: BaumWelchFitter::new(fit),
            aligner,
            encoder,
            reference_index,
        })
    }

    #[must_use]
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    #[must_use]
    pub fn encoder(&self) -> &VectorEncoder {
        &self.encoder
    }

    #[must_use]
    pub fn aligner(&self) -> &dyn StateAligner {
        self.aligner.as_ref()
    }

    #[must_use]
    pub fn fitter(&self) -> &BaumWelchFitter {
        &self.fitter
    }

    #[must_use]
    pub fn reference_index(&self) -> usize {
        self.reference_index
    }

    /// Output vector length L.
    #[must_use]
    pub fn target_len(&self) -> usize {
        self.encoder.target_len()
    }

    /// Embeds an already encoded sequence.
    #[must_use]
    pub fn embed_codes(&self, codes: &[usize]) -> SampleOutcome {
        match self.fitter.fit(codes, self.codec.n_symbols()) {
            Ok(report) => {
                let canonical = self.aligner.align(report.emission);
                SampleOutcome::Success(self.encoder.encode(&canonical))
            }
            Err(reason) => SampleOutcome::Degraded(reason),
        }
    }

    /// Embeds one token sequence. Never panics on degenerate input.
    #[must_use]
    pub fn embed_sample<S: AsRef<str>>(&self, tokens: &[S]) -> SampleOutcome {
        match self.codec.encode(tokens) {
            Ok(codes) => self.embed_codes(&codes),
            Err(reason) => SampleOutcome::Degraded(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OovPolicy;
    use crate::error::EmbeddingError;

    fn seeded_fit() -> FitConfig {
        FitConfig {
            seed: Some(42),
            ..FitConfig::default()
        }
    }

    fn mov_push() -> Arc<Vocabulary> {
        Arc::new(Vocabulary::from_tokens(["mov", "push"]).unwrap())
    }

    #[test]
    fn test_mov_push_scenario() {
        let embedder =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), mov_push(), seeded_fit())
                .unwrap();

        let codes = embedder.codec().encode(&["mov", "mov", "push", "mov"]).unwrap();
        assert_eq!(codes, vec![0, 0, 1, 0]);

        let v = match embedder.embed_sample(&["mov", "mov", "push", "mov"]) {
            SampleOutcome::Success(v) => v,
            other => panic!("expected success, got {:?}", other),
        };

        assert_eq!(v.len(), 8);
        let (p00, p01, p10, p11) = (v[0], v[1], v[2], v[3]);
        assert!(p00 >= p10, "row 0 must favour mov: {} < {}", p00, p10);
        assert!((p00 + p01 - 1.0).abs() < 1e-9);
        assert!((p10 + p11 - 1.0).abs() < 1e-9);
        assert_eq!(&v[4..], &[0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_missing_reference_token_is_fatal() {
        let vocab = Arc::new(Vocabulary::from_tokens(["push", "pop"]).unwrap());
        let err = SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), vocab, seeded_fit())
            .unwrap_err();
        assert!(matches!(err, EmbeddingError::ReferenceTokenMissing { .. }));
    }

    #[test]
    fn test_degenerate_inputs_degrade() {
        let embedder =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), mov_push(), seeded_fit())
                .unwrap();

        for tokens in [vec![], vec!["mov"], vec!["push", "push", "push"]] {
            let outcome = embedder.embed_sample(&tokens);
            assert!(outcome.is_degraded(), "{:?} should degrade", tokens);
            let row = outcome.into_row(embedder.encoder());
            assert_eq!(row, vec![0.0; 8]);
        }
    }

    #[test]
    fn test_unknown_token_degrades_under_reject() {
        let embedder =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), mov_push(), seeded_fit())
                .unwrap();
        let outcome = embedder.embed_sample(&["mov", "jmp", "push"]);
        assert!(matches!(outcome.reason(), Some(FitError::UnknownToken { .. })));
    }

    #[test]
    fn test_sentinel_policy_embeds_unknown_tokens() {
        let scheme = SchemeConfig {
            oov_policy: OovPolicy::Sentinel,
            ..SchemeConfig::new("mov", 8)
        };
        let embedder = SampleEmbedder::for_scheme(&scheme, mov_push(), seeded_fit()).unwrap();
        let outcome = embedder.embed_sample(&["mov", "jmp", "push", "mov", "jmp"]);
        let SampleOutcome::Success(v) = outcome else {
            panic!("expected success");
        };
        // 2 rows x 3 symbols, then 2 zeros of padding
        assert_eq!(v.len(), 8);
        assert_eq!(&v[6..], &[0.0, 0.0]);
    }

    #[test]
    fn test_slow_fit_degrades_with_timeout() {
        let fit = FitConfig {
            seed: Some(42),
            tolerance: 0.0,
            timeout_ms: 1,
            ..FitConfig::default()
        };
        let embedder = SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), mov_push(), fit)
            .unwrap();

        let tokens: Vec<&str> = (0..400_000)
            .map(|i| if i % 3 == 0 { "push" } else { "mov" })
            .collect();
        let outcome = embedder.embed_sample(&tokens);

        assert!(
            matches!(outcome.reason(), Some(FitError::Timeout { iterations, .. }) if *iterations >= 1),
            "got {:?}",
            outcome.reason()
        );
        assert_eq!(outcome.into_row(embedder.encoder()), vec![0.0; 8]);
    }

    #[test]
    fn test_truncation_matches_flattened_prefix() {
        let vocab = Arc::new(Vocabulary::from_tokens(["mov", "push", "pop", "call"]).unwrap());
        let wide =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), vocab.clone(), seeded_fit())
                .unwrap();
        let narrow =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 5), vocab, seeded_fit()).unwrap();

        let tokens = ["mov", "push", "pop", "mov", "call", "mov", "push"];
        let SampleOutcome::Success(full) = wide.embed_sample(&tokens) else {
            panic!("expected success");
        };
        let SampleOutcome::Success(cut) = narrow.embed_sample(&tokens) else {
            panic!("expected success");
        };
        assert_eq!(cut, full[..5].to_vec());
    }
}
