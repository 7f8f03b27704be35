//! Kernel trait definition

use crate::core::FeatureVector;

/// Kernel function trait
///
/// Implementations must never panic on well-typed input. Overflow saturates
/// to `±inf` or `0` following IEEE semantics.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64;

    /// Compute kernel value using precomputed squared norms
    ///
    /// Only the RBF kernel makes use of the norms; the default ignores them.
    fn compute_with_norms(
        &self,
        x: &FeatureVector,
        y: &FeatureVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        let _ = (x_norm_sq, y_norm_sq);
        self.compute(x, y)
    }
}
