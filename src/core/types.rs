//! Core type definitions: sparse feature vectors and training problems

use crate::core::{Result, SvmError};

/// Sparse feature vector with strictly ascending indices
///
/// Indices are 1-based feature numbers as they appear in LIBSVM files; any
/// index that is not stored is an implicit zero. Index 0 is only meaningful
/// for precomputed kernels, where `0:<id>` carries the sample serial number.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct FeatureVector {
    /// Sorted, unique feature indices
    pub indices: Vec<usize>,
    /// Values corresponding to indices
    pub values: Vec<f64>,
}

impl FeatureVector {
    /// Create a new feature vector, sorting the entries by index
    ///
    /// # Panics
    /// Panics if the two slices differ in length or an index repeats.
    /// Use [`FeatureVector::try_new`] for untrusted input.
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        assert_eq!(
            indices.len(),
            values.len(),
            "Indices and values must have same length"
        );
        match Self::try_new(indices, values) {
            Ok(vector) => vector,
            Err(e) => panic!("{e}"),
        }
    }

    /// Fallible constructor used by the file readers
    pub fn try_new(indices: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        if indices.len() != values.len() {
            return Err(SvmError::InvalidDataset(format!(
                "{} indices but {} values",
                indices.len(),
                values.len()
            )));
        }

        let mut pairs: Vec<_> = indices.into_iter().zip(values).collect();
        pairs.sort_by_key(|&(idx, _)| idx);

        if let Some(w) = pairs.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(SvmError::InvalidDataset(format!(
                "duplicate feature index {}",
                w[0].0
            )));
        }

        let (indices, values) = pairs.into_iter().unzip();
        Ok(Self { indices, values })
    }

    /// Build from `(index, value)` pairs
    pub fn from_pairs(pairs: &[(usize, f64)]) -> Self {
        let (indices, values) = pairs.iter().copied().unzip();
        Self::new(indices, values)
    }

    /// Build from a dense slice; position `k` becomes index `k + 1`, zeros are skipped
    pub fn from_dense(dense: &[f64]) -> Self {
        let (indices, values) = dense
            .iter()
            .enumerate()
            .filter(|(_, &v)| v != 0.0)
            .map(|(k, &v)| (k + 1, v))
            .unzip();
        Self { indices, values }
    }

    /// Create an empty (all-zero) vector
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the value at a specific index (0 if not present)
    pub fn get(&self, index: usize) -> f64 {
        match self.indices.binary_search(&index) {
            Ok(pos) => self.values[pos],
            Err(_) => 0.0,
        }
    }

    /// Squared L2 norm
    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|&v| v * v).sum()
    }

    /// Number of stored entries
    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Largest stored index, 0 for an empty vector
    pub fn max_index(&self) -> usize {
        self.indices.last().copied().unwrap_or(0)
    }

    /// Iterate over `(index, value)` entries
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }
}

/// Training problem: one label per feature vector
///
/// Labels are arbitrary doubles. Classification compares them by exact
/// equality, regression uses them as targets.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Problem {
    pub labels: Vec<f64>,
    pub vectors: Vec<FeatureVector>,
}

impl Problem {
    /// Create a problem from parallel label and vector lists
    pub fn new(labels: Vec<f64>, vectors: Vec<FeatureVector>) -> Result<Self> {
        if labels.len() != vectors.len() {
            return Err(SvmError::InvalidDataset(format!(
                "{} labels but {} feature vectors",
                labels.len(),
                vectors.len()
            )));
        }
        Ok(Self { labels, vectors })
    }

    /// Append one sample
    pub fn push(&mut self, label: f64, vector: FeatureVector) {
        self.labels.push(label);
        self.vectors.push(vector);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Largest feature index used by any sample
    pub fn num_features(&self) -> usize {
        self.vectors
            .iter()
            .map(FeatureVector::max_index)
            .max()
            .unwrap_or(0)
    }

    /// Problem restricted to the given sample positions, in that order
    pub fn subset(&self, positions: &[usize]) -> Problem {
        Problem {
            labels: positions.iter().map(|&i| self.labels[i]).collect(),
            vectors: positions.iter().map(|&i| self.vectors[i].clone()).collect(),
        }
    }
}
