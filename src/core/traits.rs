//! Core traits

use crate::core::{FeatureVector, Problem};

/// Dataset abstraction over the supported input formats
pub trait Dataset: Send + Sync {
    /// Number of samples in the dataset
    fn len(&self) -> usize;

    /// Number of features (largest feature index)
    fn dim(&self) -> usize;

    /// Label of sample `i`
    ///
    /// # Panics
    /// Panics if index >= len()
    fn label(&self, i: usize) -> f64;

    /// Features of sample `i`
    ///
    /// # Panics
    /// Panics if index >= len()
    fn features(&self, i: usize) -> &FeatureVector;

    /// Get all labels as a vector
    fn labels(&self) -> Vec<f64> {
        (0..self.len()).map(|i| self.label(i)).collect()
    }

    /// Copy the samples into a training problem
    fn to_problem(&self) -> Problem {
        Problem {
            labels: self.labels(),
            vectors: (0..self.len()).map(|i| self.features(i).clone()).collect(),
        }
    }

    /// Check if the dataset is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Dataset for Problem {
    fn len(&self) -> usize {
        self.labels.len()
    }

    fn dim(&self) -> usize {
        self.num_features()
    }

    fn label(&self, i: usize) -> f64 {
        self.labels[i]
    }

    fn features(&self, i: usize) -> &FeatureVector {
        &self.vectors[i]
    }

    fn to_problem(&self) -> Problem {
        self.clone()
    }
}
