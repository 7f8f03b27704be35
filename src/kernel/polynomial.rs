//! Polynomial kernel implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! With d = 1, γ = 1 and r = 0 this is the linear kernel.

use crate::core::FeatureVector;
use crate::kernel::linear::dot;
use crate::kernel::traits::Kernel;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialKernel {
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
    /// Degree of the polynomial
    pub degree: i32,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel
    ///
    /// No range checks are made here; the parameter validator rejects
    /// negative degrees before training.
    ///
    /// # Examples
    /// ```
    /// use svm_engine::kernel::{Kernel, PolynomialKernel};
    /// use svm_engine::FeatureVector;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let kernel = PolynomialKernel::new(2, 1.0, 1.0);
    /// let x = FeatureVector::from_dense(&[1.0, 2.0]);
    /// assert_eq!(kernel.compute(&x, &x), 36.0);
    /// ```
    pub fn new(degree: i32, gamma: f64, coef0: f64) -> Self {
        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).powi(self.degree)
    }
}
