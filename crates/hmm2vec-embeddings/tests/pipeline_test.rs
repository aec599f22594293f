//! End-to-end pipeline: files on disk -> feature artifact.
//!
//! Run: cargo test -p hmm2vec-embeddings --test pipeline_test -- --nocapture

use std::path::Path;
use std::sync::Arc;

use hmm2vec_embeddings::{
    check_label_count, count_samples, load_labels, BatchConfig, BatchOrchestrator, CorpusReader,
    EmbeddingError, FeatureMatrix, FitConfig, Hmm2VecConfig, SampleEmbedder, SampleOutcome,
    SchemeConfig, Vocabulary,
};
use tempfile::TempDir;

const CORPUS: &str = r#"["mov","push","mov","pop","call","mov","push","ret"]
["mov"]
["push","push","pop","push","mov","ret","ret","call"]

[]
["call","call","call"]
["pop","mov","pop","mov","push","call","call","ret","mov"]
["ret","mov","ret","push","pop","pop","mov"]
"#;

fn write(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn seeded(seed: u64) -> FitConfig {
    FitConfig {
        seed: Some(seed),
        ..FitConfig::default()
    }
}

// ============================================================================
// Concrete scenario
// ============================================================================

#[test]
fn mov_push_scenario_produces_padded_canonical_vector() {
    let vocab = Arc::new(Vocabulary::from_tokens(["mov", "push"]).unwrap());
    let embedder =
        SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 8), vocab, seeded(7)).unwrap();

    let v = match embedder.embed_sample(&["mov", "mov", "push", "mov"]) {
        SampleOutcome::Success(v) => v,
        other => panic!("expected success, got {:?}", other),
    };

    println!("=== SCENARIO ===");
    println!("vector = {:?}", v);

    assert_eq!(v.len(), 8);
    assert!(v[0] >= v[2], "canonical row 0 must favour mov");
    assert!((v[0] + v[1] - 1.0).abs() < 1e-9);
    assert!((v[2] + v[3] - 1.0).abs() < 1e-9);
    assert!(v.iter().all(|p| p.is_finite() && *p >= 0.0));
    assert_eq!(&v[4..], &[0.0; 4]);
    println!("[PASS]\n");
}

// ============================================================================
// Files -> artifact
// ============================================================================

#[test]
fn corpus_files_roundtrip_through_artifact() {
    let dir = TempDir::new().unwrap();
    let corpus_path = write(dir.path(), "corpus.jsonl", CORPUS);
    let vocab_path = write(dir.path(), "vocab.txt", "mov\npush\npop\ncall\nret\n");
    let labels_path = write(dir.path(), "labels.json", "[1, 0, 1, 0, 0, 1, 1]");
    let out_path = dir.path().join("features.safetensors");

    let config = Hmm2VecConfig::from_toml_str(
        r#"
        [fit]
        seed = 11

        [batch]
        chunk_size = 3
        workers = 2

        [schemes.tiny]
        reference_token = "mov"
        target_len = 12
        "#,
    )
    .unwrap();

    let vocab = Arc::new(Vocabulary::load(&vocab_path).unwrap());
    let labels = load_labels(&labels_path).unwrap();
    check_label_count(count_samples(&corpus_path).unwrap(), labels.len()).unwrap();

    let embedder = SampleEmbedder::for_scheme(
        config.scheme("tiny").unwrap(),
        vocab.clone(),
        config.fit.clone(),
    )
    .unwrap();
    let orchestrator = BatchOrchestrator::new(embedder, config.batch.clone()).unwrap();
    let mut output = orchestrator
        .run(CorpusReader::open(&corpus_path).unwrap())
        .unwrap();

    output.matrix.set_labels(labels.clone()).unwrap();
    output.matrix.set_metadata("scheme", "tiny");
    output.matrix.set_metadata("vocab_size", vocab.len());
    output.matrix.save(&out_path).unwrap();

    let loaded = FeatureMatrix::load(&out_path).unwrap();

    println!("=== ARTIFACT ===");
    println!("rows={} cols={} degraded={}", loaded.n_rows(), loaded.n_cols(), loaded.degraded_count());

    assert_eq!(loaded.n_rows(), 7);
    assert_eq!(loaded.n_cols(), 12);
    assert_eq!(loaded.labels(), Some(labels.as_slice()));
    assert_eq!(loaded.metadata().get("scheme").map(String::as_str), Some("tiny"));
    assert_eq!(loaded.metadata().get("vocab_size").map(String::as_str), Some("5"));

    // ["mov"], [] and ["call","call","call"]
    assert_eq!(loaded.degraded_count(), 3);
    for i in [1, 3, 4] {
        assert!(loaded.is_degraded(i));
        assert_eq!(loaded.row(i).unwrap(), &[0.0; 12]);
    }
    for i in [0, 2, 5, 6] {
        let row = loaded.row(i).unwrap();
        assert!(!loaded.is_degraded(i));
        assert!((row[..5].iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((row[5..10].iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(row[0] >= row[5], "row {} not canonical", i);
        assert_eq!(&row[10..], &[0.0, 0.0]);
    }
    assert_eq!(loaded.as_slice(), output.matrix.as_slice());
    println!("[PASS]\n");
}

#[test]
fn label_count_mismatch_detected_before_processing() {
    let dir = TempDir::new().unwrap();
    let corpus_path = write(dir.path(), "corpus.jsonl", CORPUS);
    let labels_path = write(dir.path(), "labels.txt", "1\n0\n1\n");

    let labels = load_labels(&labels_path).unwrap();
    let err = check_label_count(count_samples(&corpus_path).unwrap(), labels.len()).unwrap_err();
    assert!(matches!(
        err,
        EmbeddingError::LabelCountMismatch {
            corpus: 7,
            labels: 3
        }
    ));
}

// ============================================================================
// Parallel determinism
// ============================================================================

#[test]
fn seeded_runs_identical_across_parallelism() {
    let vocab = Arc::new(Vocabulary::from_tokens(["mov", "push", "pop", "call", "ret"]).unwrap());
    let corpus: Vec<Vec<String>> = CorpusReader::new(std::io::Cursor::new(CORPUS))
        .collect::<Result<_, _>>()
        .unwrap();

    let run = |chunk_size: usize, workers: usize| {
        let embedder =
            SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 10), vocab.clone(), seeded(3))
                .unwrap();
        let orchestrator = BatchOrchestrator::new(
            embedder,
            BatchConfig {
                chunk_size,
                workers: Some(workers),
                ..BatchConfig::default()
            },
        )
        .unwrap();
        orchestrator.run_in_memory(&corpus).unwrap()
    };

    let serial = run(1, 1);
    for (chunk_size, workers) in [(2, 2), (3, 4), (50, 8)] {
        let parallel = run(chunk_size, workers);
        assert_eq!(
            parallel.matrix.as_slice(),
            serial.matrix.as_slice(),
            "chunk_size={} workers={}",
            chunk_size,
            workers
        );
        assert_eq!(parallel.summary.degraded, serial.summary.degraded);
    }
}

#[test]
fn missing_reference_token_fails_before_any_sample() {
    let vocab = Arc::new(Vocabulary::from_tokens(["push", "pop"]).unwrap());
    let err = SampleEmbedder::for_scheme(&SchemeConfig::top31(), vocab, FitConfig::default())
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::ReferenceTokenMissing { .. }));
}

#[test]
fn malformed_corpus_line_aborts_run() {
    let dir = TempDir::new().unwrap();
    let corpus_path = write(dir.path(), "corpus.jsonl", "[\"mov\",\"push\"]\n{\"oops\": 1}\n");
    let vocab = Arc::new(Vocabulary::from_tokens(["mov", "push"]).unwrap());
    let embedder =
        SampleEmbedder::for_scheme(&SchemeConfig::new("mov", 4), vocab, seeded(1)).unwrap();
    let orchestrator = BatchOrchestrator::new(embedder, BatchConfig::default()).unwrap();

    let err = orchestrator
        .run(CorpusReader::open(&corpus_path).unwrap())
        .unwrap_err();
    assert!(matches!(err, EmbeddingError::CorpusParse { line: 2, .. }));
}
