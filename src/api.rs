//! High-level API for Support Vector Machine operations
//!
//! This module provides a builder over [`Parameters`], free functions for
//! the common train / validate / persist cycle, and evaluation metrics.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use svm_engine::api::Svm;
//! use svm_engine::KernelType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = Svm::new()
//!     .with_kernel_type(KernelType::Rbf)
//!     .with_c(1.0)
//!     .with_gamma(0.5)
//!     .train_from_file("data.libsvm")?;
//!
//! model.save("data.model")?;
//! # Ok(())
//! # }
//! ```

use crate::core::{Dataset, KernelType, Parameters, Problem, Result, SvmType};
use crate::data::{CsvDataset, LibSvmDataset};
use crate::model::Model;
use std::path::Path;

pub use crate::core::check_parameter;
pub use crate::cross_validation::cross_validate;
pub use crate::persistence::{load_model, save_model};
pub use crate::train::train;

/// Builder over [`Parameters`]
#[derive(Debug, Clone, Default)]
pub struct Svm {
    param: Parameters,
}

impl Svm {
    /// Start from the default parameters (C_SVC, RBF kernel)
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing parameter set
    pub fn with_parameters(param: Parameters) -> Self {
        Self { param }
    }

    pub fn with_svm_type(mut self, svm_type: SvmType) -> Self {
        self.param.svm_type = svm_type;
        self
    }

    pub fn with_kernel_type(mut self, kernel_type: KernelType) -> Self {
        self.param.kernel_type = kernel_type;
        self
    }

    /// Set regularization parameter C
    pub fn with_c(mut self, c: f64) -> Self {
        self.param.c = c;
        self
    }

    pub fn with_nu(mut self, nu: f64) -> Self {
        self.param.nu = nu;
        self
    }

    /// Set the epsilon-SVR tube width
    pub fn with_p(mut self, p: f64) -> Self {
        self.param.p = p;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.param.gamma = gamma;
        self
    }

    pub fn with_degree(mut self, degree: i32) -> Self {
        self.param.degree = degree;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.param.coef0 = coef0;
        self
    }

    /// Set convergence tolerance
    pub fn with_eps(mut self, eps: f64) -> Self {
        self.param.eps = eps;
        self
    }

    /// Set kernel cache size in MB
    pub fn with_cache_size(mut self, cache_size: f64) -> Self {
        self.param.cache_size = cache_size;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.param.shrinking = shrinking;
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.param.probability = probability;
        self
    }

    /// Scale C for one class label
    pub fn with_class_weight(mut self, label: f64, weight: f64) -> Self {
        self.param.class_weights.push((label, weight));
        self
    }

    pub fn parameters(&self) -> &Parameters {
        &self.param
    }

    /// Train on a dataset
    pub fn train<D: Dataset>(&self, dataset: &D) -> Result<Model> {
        train(&dataset.to_problem(), &self.param)
    }

    /// Train on a problem without copying it
    pub fn train_problem(&self, problem: &Problem) -> Result<Model> {
        train(problem, &self.param)
    }

    /// Train from LIBSVM format file
    pub fn train_from_file<P: AsRef<Path>>(&self, path: P) -> Result<Model> {
        let dataset = LibSvmDataset::from_file(path)?;
        self.train_problem(dataset.problem())
    }

    /// Train from CSV file (automatically detects headers)
    pub fn train_from_csv<P: AsRef<Path>>(&self, path: P) -> Result<Model> {
        let dataset = CsvDataset::from_file(path)?;
        self.train_problem(dataset.problem())
    }

    /// Held-out predictions from k-fold cross-validation
    pub fn cross_validate<D: Dataset>(&self, dataset: &D, folds: usize) -> Result<Vec<f64>> {
        cross_validate(&dataset.to_problem(), &self.param, folds)
    }
}

/// Prediction quality against known targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationMetrics {
    pub total: usize,
    pub correct: usize,
    /// Mean squared error
    pub mse: f64,
    /// Squared correlation coefficient
    pub squared_correlation: f64,
}

impl EvaluationMetrics {
    /// Compare predictions with targets pairwise
    ///
    /// Extra entries of the longer slice are ignored.
    pub fn from_predictions(predicted: &[f64], actual: &[f64]) -> Self {
        let mut total = 0;
        let mut correct = 0;
        let (mut error, mut sumv, mut sumy, mut sumvv, mut sumyy, mut sumvy) =
            (0.0, 0.0, 0.0, 0.0, 0.0, 0.0);

        for (&v, &y) in predicted.iter().zip(actual) {
            total += 1;
            if v == y {
                correct += 1;
            }
            error += (v - y) * (v - y);
            sumv += v;
            sumy += y;
            sumvv += v * v;
            sumyy += y * y;
            sumvy += v * y;
        }

        if total == 0 {
            return Self {
                total,
                correct,
                mse: 0.0,
                squared_correlation: 0.0,
            };
        }

        let n = total as f64;
        let numerator = n * sumvy - sumv * sumy;
        let denominator = (n * sumvv - sumv * sumv) * (n * sumyy - sumy * sumy);
        let squared_correlation = if denominator > 0.0 {
            numerator * numerator / denominator
        } else {
            0.0
        };

        Self {
            total,
            correct,
            mse: error / n,
            squared_correlation,
        }
    }

    /// Fraction of exact label matches
    pub fn accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }
}

/// Evaluate a model on a dataset
pub fn evaluate<D: Dataset>(model: &Model, dataset: &D) -> EvaluationMetrics {
    let predicted: Vec<f64> = (0..dataset.len())
        .map(|i| model.predict(dataset.features(i)))
        .collect();
    EvaluationMetrics::from_predictions(&predicted, &dataset.labels())
}
