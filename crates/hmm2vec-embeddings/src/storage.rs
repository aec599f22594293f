//! Feature matrix container and its on-disk artifacts.
//!
//! # SafeTensors Layout
//!
//! | Tensor | Dtype | Shape |
//! |--------|-------|-------|
//! | `features` | F64 | `[num_samples, L]` |
//! | `degraded` | U8 | `[num_samples]` |
//! | `labels` (optional) | I64 | `[num_samples]` |
//!
//! String metadata (scheme, vocabulary size, target length, degraded count)
//! is stored in the SafeTensors header.
//!
//! # NumPy Layout
//!
//! A path ending in `.npy` gets the bare `[num_samples, L]` little-endian f64
//! matrix, loadable with `np.load`. Labels, when set, go to a sibling
//! `<stem>.labels.npy`. The degraded mask and metadata are not kept; use
//! SafeTensors when they matter.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use ndarray_npy::{read_npy, write_npy};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};

use crate::error::{EmbeddingError, EmbeddingResult};

pub const FEATURES_TENSOR: &str = "features";
pub const DEGRADED_TENSOR: &str = "degraded";
pub const LABELS_TENSOR: &str = "labels";

/// Artifact encoding, chosen from the output path's extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactFormat {
    SafeTensors,
    Npy,
}

impl ArtifactFormat {
    /// `.npy` (any case) selects NumPy; everything else is SafeTensors.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("npy") => Self::Npy,
            _ => Self::SafeTensors,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SafeTensors => "safetensors",
            Self::Npy => "npy",
        }
    }
}

/// Sidecar path holding the labels of a `.npy` artifact.
#[must_use]
pub fn npy_labels_path(path: &Path) -> PathBuf {
    path.with_extension("labels.npy")
}

/// Row-major `[rows, cols]` matrix of feature vectors plus per-row flags.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    cols: usize,
    data: Vec<f64>,
    degraded: Vec<bool>,
    labels: Option<Vec<i64>>,
    metadata: HashMap<String, String>,
}

impl FeatureMatrix {
    /// Empty matrix with `cols` columns.
    pub fn new(cols: usize) -> Self {
        Self {
            cols,
            data: Vec::new(),
            degraded: Vec::new(),
            labels: None,
            metadata: HashMap::new(),
        }
    }

    /// Empty matrix with room for `rows` rows.
    pub fn with_capacity(cols: usize, rows: usize) -> Self {
        Self {
            data: Vec::with_capacity(cols * rows),
            degraded: Vec::with_capacity(rows),
            ..Self::new(cols)
        }
    }

    /// Appends one row.
    ///
    /// # Errors
    /// - `EmbeddingError::DimensionMismatch` if `row.len() != cols`
    pub fn push_row(&mut self, row: &[f64], degraded: bool) -> EmbeddingResult<()> {
        if row.len() != self.cols {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.cols,
                actual: row.len(),
            });
        }
        self.data.extend_from_slice(row);
        self.degraded.push(degraded);
        Ok(())
    }

    #[must_use]
    pub fn n_rows(&self) -> usize {
        self.degraded.len()
    }

    #[must_use]
    pub fn n_cols(&self) -> usize {
        self.cols
    }

    /// One row, or `None` when out of range.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        (index < self.n_rows()).then(|| &self.data[index * self.cols..(index + 1) * self.cols])
    }

    /// Row-major data.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    #[must_use]
    pub fn is_degraded(&self, index: usize) -> bool {
        self.degraded.get(index).copied().unwrap_or(false)
    }

    #[must_use]
    pub fn degraded_count(&self) -> usize {
        self.degraded.iter().filter(|d| **d).count()
    }

    #[must_use]
    pub fn labels(&self) -> Option<&[i64]> {
        self.labels.as_deref()
    }

    /// Attaches a row-aligned label array.
    ///
    /// # Errors
    /// - `EmbeddingError::LabelCountMismatch` if the lengths differ
    pub fn set_labels(&mut self, labels: Vec<i64>) -> EmbeddingResult<()> {
        if labels.len() != self.n_rows() {
            return Err(EmbeddingError::LabelCountMismatch {
                corpus: self.n_rows(),
                labels: labels.len(),
            });
        }
        self.labels = Some(labels);
        Ok(())
    }

    #[must_use]
    pub fn metadata(&self) -> &HashMap<String, String> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: impl Into<String>, value: impl ToString) {
        self.metadata.insert(key.into(), value.to_string());
    }

    /// Writes the matrix as a SafeTensors file, via a temporary sibling file
    /// so a crash never leaves a truncated artifact behind.
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if serialization or writing fails
    pub fn save(&self, path: impl AsRef<Path>) -> EmbeddingResult<()> {
        let path = path.as_ref();
        let persist_err = |message: String| EmbeddingError::PersistError {
            path: path.to_path_buf(),
            message,
        };

        let feature_bytes: Vec<u8> = self.data.iter().flat_map(|v| v.to_le_bytes()).collect();
        let degraded_bytes: Vec<u8> = self.degraded.iter().map(|d| u8::from(*d)).collect();
        let label_bytes: Option<Vec<u8>> = self
            .labels
            .as_ref()
            .map(|labels| labels.iter().flat_map(|l| l.to_le_bytes()).collect());

        let mut tensors: HashMap<String, TensorView<'_>> = HashMap::with_capacity(3);
        tensors.insert(
            FEATURES_TENSOR.to_string(),
            TensorView::new(Dtype::F64, vec![self.n_rows(), self.cols], &feature_bytes)
                .map_err(|e| persist_err(format!("features tensor: {}", e)))?,
        );
        tensors.insert(
            DEGRADED_TENSOR.to_string(),
            TensorView::new(Dtype::U8, vec![self.n_rows()], &degraded_bytes)
                .map_err(|e| persist_err(format!("degraded tensor: {}", e)))?,
        );
        if let Some(bytes) = &label_bytes {
            tensors.insert(
                LABELS_TENSOR.to_string(),
                TensorView::new(Dtype::I64, vec![self.n_rows()], bytes)
                    .map_err(|e| persist_err(format!("labels tensor: {}", e)))?,
            );
        }

        let mut metadata = self.metadata.clone();
        metadata.insert("degraded_count".to_string(), self.degraded_count().to_string());

        let bytes = safetensors::serialize(&tensors, &Some(metadata))
            .map_err(|e| persist_err(format!("serialize: {}", e)))?;

        let tmp = path.with_extension("safetensors.tmp");
        fs::write(&tmp, &bytes).map_err(|e| persist_err(format!("write: {}", e)))?;
        fs::rename(&tmp, path).map_err(|e| persist_err(format!("rename: {}", e)))?;

        tracing::info!(
            path = %path.display(),
            rows = self.n_rows(),
            cols = self.cols,
            degraded = self.degraded_count(),
            bytes = bytes.len(),
            "Persisted feature matrix"
        );
        Ok(())
    }

    /// Reads an artifact written by [`FeatureMatrix::save`].
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if the file is missing, malformed, or
    ///   its tensors have unexpected dtypes or shapes
    pub fn load(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        let persist_err = |message: String| EmbeddingError::PersistError {
            path: path.to_path_buf(),
            message,
        };

        let bytes = fs::read(path).map_err(|e| persist_err(format!("read: {}", e)))?;
        let tensors =
            SafeTensors::deserialize(&bytes).map_err(|e| persist_err(format!("parse: {}", e)))?;

        let features = tensors
            .tensor(FEATURES_TENSOR)
            .map_err(|e| persist_err(format!("features tensor: {}", e)))?;
        let (rows, cols) = match (features.dtype(), features.shape()) {
            (Dtype::F64, [rows, cols]) => (*rows, *cols),
            (dtype, shape) => {
                return Err(persist_err(format!(
                    "features tensor must be F64 [rows, cols], found {:?} {:?}",
                    dtype, shape
                )))
            }
        };
        let data: Vec<f64> = features
            .data()
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]))
            .collect();

        let degraded_view = tensors
            .tensor(DEGRADED_TENSOR)
            .map_err(|e| persist_err(format!("degraded tensor: {}", e)))?;
        if degraded_view.dtype() != Dtype::U8 || degraded_view.shape() != [rows] {
            return Err(persist_err(format!(
                "degraded tensor must be U8 [{}], found {:?} {:?}",
                rows,
                degraded_view.dtype(),
                degraded_view.shape()
            )));
        }
        let degraded: Vec<bool> = degraded_view.data().iter().map(|b| *b != 0).collect();

        let labels = match tensors.tensor(LABELS_TENSOR) {
            Ok(view) => {
                if view.dtype() != Dtype::I64 || view.shape() != [rows] {
                    return Err(persist_err(format!(
                        "labels tensor must be I64 [{}], found {:?} {:?}",
                        rows,
                        view.dtype(),
                        view.shape()
                    )));
                }
                Some(
                    view.data()
                        .chunks_exact(8)
                        .map(|c| {
                            i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                        })
                        .collect(),
                )
            }
            Err(_) => None,
        };

        let (_, header) = SafeTensors::read_metadata(&bytes)
            .map_err(|e| persist_err(format!("header: {}", e)))?;
        let metadata = header.metadata().clone().unwrap_or_default();

        Ok(Self {
            cols,
            data,
            degraded,
            labels,
            metadata,
        })
    }

    /// Writes the artifact in the format implied by `path`.
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if serialization or writing fails
    pub fn save_artifact(&self, path: impl AsRef<Path>) -> EmbeddingResult<ArtifactFormat> {
        let path = path.as_ref();
        let format = ArtifactFormat::from_path(path);
        match format {
            ArtifactFormat::SafeTensors => self.save(path)?,
            ArtifactFormat::Npy => self.save_npy(path)?,
        }
        Ok(format)
    }

    /// Reads an artifact in the format implied by `path`.
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if the file is missing or malformed
    pub fn load_artifact(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        match ArtifactFormat::from_path(path) {
            ArtifactFormat::SafeTensors => Self::load(path),
            ArtifactFormat::Npy => Self::load_npy(path),
        }
    }

    /// Writes the feature matrix as a NumPy `.npy` array, plus a labels
    /// sidecar when labels are set.
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if encoding or writing fails
    pub fn save_npy(&self, path: impl AsRef<Path>) -> EmbeddingResult<()> {
        let path = path.as_ref();
        let persist_err = |message: String| EmbeddingError::PersistError {
            path: path.to_path_buf(),
            message,
        };

        let features = ArrayView2::from_shape((self.n_rows(), self.cols), self.data.as_slice())
            .map_err(|e| persist_err(format!("features shape: {}", e)))?;
        let tmp = path.with_extension("npy.tmp");
        write_npy(&tmp, &features).map_err(|e| persist_err(format!("write: {}", e)))?;
        fs::rename(&tmp, path).map_err(|e| persist_err(format!("rename: {}", e)))?;

        if let Some(labels) = &self.labels {
            let labels_path = npy_labels_path(path);
            write_npy(&labels_path, &ArrayView1::from(labels.as_slice())).map_err(|e| {
                EmbeddingError::PersistError {
                    path: labels_path.clone(),
                    message: format!("write: {}", e),
                }
            })?;
        }

        tracing::info!(
            path = %path.display(),
            rows = self.n_rows(),
            cols = self.cols,
            labels = self.labels.is_some(),
            "Persisted feature matrix as npy"
        );
        if self.degraded_count() > 0 {
            tracing::warn!(
                degraded = self.degraded_count(),
                "npy artifact does not record which rows are degraded"
            );
        }
        Ok(())
    }

    /// Reads a `.npy` feature matrix and its labels sidecar, if present.
    ///
    /// No row is marked degraded and metadata is empty.
    ///
    /// # Errors
    /// - `EmbeddingError::PersistError` if the file is missing, is not a 2-D
    ///   f64 array, or its labels sidecar does not match the row count
    pub fn load_npy(path: impl AsRef<Path>) -> EmbeddingResult<Self> {
        let path = path.as_ref();
        let features: Array2<f64> = read_npy(path).map_err(|e| EmbeddingError::PersistError {
            path: path.to_path_buf(),
            message: format!("read: {}", e),
        })?;
        let (rows, cols) = features.dim();

        let labels_path = npy_labels_path(path);
        let labels = if labels_path.exists() {
            let labels: Array1<i64> =
                read_npy(&labels_path).map_err(|e| EmbeddingError::PersistError {
                    path: labels_path.clone(),
                    message: format!("read: {}", e),
                })?;
            if labels.len() != rows {
                return Err(EmbeddingError::PersistError {
                    path: labels_path,
                    message: format!("{} labels for {} rows", labels.len(), rows),
                });
            }
            Some(labels.to_vec())
        } else {
            None
        };

        Ok(Self {
            cols,
            data: features.iter().copied().collect(),
            degraded: vec![false; rows],
            labels,
            metadata: HashMap::new(),
        })
    }
}
