//! Trained model

use crate::core::{FeatureVector, KernelType, Parameters, SvmType};

/// A trained SVM
///
/// Owns copies of its support vectors, so it outlives the training
/// problem. Immutable once built; prediction only reads it, so a model
/// can be shared between threads.
///
/// For classification the support vectors are stored grouped by class
/// (class order of [`Model::labels`]) and `sv_coef` has `nr_class - 1`
/// rows. One-class and regression models have a single coefficient row
/// and one `rho`.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub(crate) param: Parameters,
    pub(crate) nr_class: usize,
    pub(crate) labels: Vec<f64>,
    pub(crate) n_sv: Vec<usize>,
    pub(crate) support_vectors: Vec<FeatureVector>,
    pub(crate) sv_coef: Vec<Vec<f64>>,
    pub(crate) rho: Vec<f64>,
    pub(crate) prob_a: Vec<f64>,
    pub(crate) prob_b: Vec<f64>,
    pub(crate) prob_density_marks: Vec<f64>,
    /// 1-based positions of the support vectors in the training problem
    pub(crate) sv_indices: Vec<usize>,
}

impl Model {
    /// Parameters the model was trained with
    pub fn param(&self) -> &Parameters {
        &self.param
    }

    pub fn svm_type(&self) -> SvmType {
        self.param.svm_type
    }

    pub fn kernel_type(&self) -> KernelType {
        self.param.kernel_type
    }

    /// Number of classes; 2 for one-class and regression models
    pub fn nr_class(&self) -> usize {
        self.nr_class
    }

    /// Total number of support vectors
    pub fn nr_sv(&self) -> usize {
        self.support_vectors.len()
    }

    /// Class labels in internal class order (empty for one-class and regression)
    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Support vectors per class (empty for one-class and regression)
    pub fn n_sv(&self) -> &[usize] {
        &self.n_sv
    }

    /// 1-based training positions of the support vectors
    ///
    /// Empty for a model read from a file.
    pub fn sv_indices(&self) -> &[usize] {
        &self.sv_indices
    }

    pub fn support_vectors(&self) -> &[FeatureVector] {
        &self.support_vectors
    }

    pub fn sv_coef(&self) -> &[Vec<f64>] {
        &self.sv_coef
    }

    /// Biases, one per class pair
    pub fn rho(&self) -> &[f64] {
        &self.rho
    }

    pub fn prob_a(&self) -> &[f64] {
        &self.prob_a
    }

    pub fn prob_b(&self) -> &[f64] {
        &self.prob_b
    }

    pub fn prob_density_marks(&self) -> &[f64] {
        &self.prob_density_marks
    }

    /// Number of pairwise decision functions
    pub fn nr_decision_values(&self) -> usize {
        if self.svm_type().is_classification() {
            self.nr_class * self.nr_class.saturating_sub(1) / 2
        } else {
            1
        }
    }

    /// Whether the model carries calibration data for its type
    pub fn check_probability_model(&self) -> bool {
        match self.svm_type() {
            SvmType::CSvc | SvmType::NuSvc => !self.prob_a.is_empty() && !self.prob_b.is_empty(),
            SvmType::EpsilonSvr | SvmType::NuSvr => !self.prob_a.is_empty(),
            SvmType::OneClass => !self.prob_density_marks.is_empty(),
        }
    }

    /// Scale of the Laplace residual model of a calibrated regression model
    pub fn svr_probability(&self) -> Option<f64> {
        if self.svm_type().is_regression() {
            self.prob_a.first().copied()
        } else {
            None
        }
    }
}
