//! Sigmoid (tanh) kernel implementation
//!
//! K(x, y) = tanh(γ * <x, y> + r)
//!
//! The kernel is not positive semi-definite for every choice of γ and r;
//! the solver copes with non-positive curvature on its own.

use crate::core::FeatureVector;
use crate::kernel::linear::dot;
use crate::kernel::traits::Kernel;

/// Sigmoid (hyperbolic tangent) kernel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SigmoidKernel {
    /// Scaling parameter for the dot product
    pub gamma: f64,
    /// Offset parameter
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).tanh()
    }
}
