//! Gaussian kernel, K(x, y) = exp(-gamma * ||x - y||²)

use crate::core::FeatureVector;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// RBF kernel
///
/// `gamma = 0` is accepted and yields the constant kernel 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RbfKernel {
    gamma: f64,
}

impl RbfKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    /// Get the gamma parameter
    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RbfKernel {
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64 {
        let squared_distance = squared_euclidean_distance(x, y);
        (-self.gamma * squared_distance).exp()
    }

    fn compute_with_norms(
        &self,
        x: &FeatureVector,
        y: &FeatureVector,
        x_norm_sq: f64,
        y_norm_sq: f64,
    ) -> f64 {
        // ||x - y||² = ||x||² + ||y||² - 2*x^T*y
        let squared_distance = (x_norm_sq + y_norm_sq - 2.0 * dot(x, y)).max(0.0);
        (-self.gamma * squared_distance).exp()
    }
}

/// Squared Euclidean distance between two sparse vectors
///
/// Entries stored in only one vector contribute their square.
fn squared_euclidean_distance(x: &FeatureVector, y: &FeatureVector) -> f64 {
    let mut distance_sq = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.indices.len() && j < y.indices.len() {
        let x_idx = x.indices[i];
        let y_idx = y.indices[j];

        if x_idx == y_idx {
            let diff = x.values[i] - y.values[j];
            distance_sq += diff * diff;
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            distance_sq += x.values[i] * x.values[i];
            i += 1;
        } else {
            distance_sq += y.values[j] * y.values[j];
            j += 1;
        }
    }

    distance_sq += x.values[i..].iter().map(|v| v * v).sum::<f64>();
    distance_sq += y.values[j..].iter().map(|v| v * v).sum::<f64>();

    distance_sq
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rbf_kernel_creation() {
        assert_eq!(RbfKernel::new(0.5).gamma(), 0.5);
    }

    #[test]
    fn test_rbf_kernel_identical_vectors() {
        let kernel = RbfKernel::new(1.0);
        let x = FeatureVector::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0]);

        assert_eq!(kernel.compute(&x, &x), 1.0);
    }

    #[test]
    fn test_rbf_kernel_disjoint_vectors() {
        let kernel = RbfKernel::new(1.0);
        let x = FeatureVector::new(vec![1, 3], vec![1.0, 1.0]);
        let y = FeatureVector::new(vec![2, 4], vec![1.0, 1.0]);

        // ||x - y||² = 4 (no overlap)
        assert_relative_eq!(kernel.compute(&x, &y), (-4.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_rbf_kernel_different_gammas() {
        let x = FeatureVector::from_dense(&[1.0]);
        let y = FeatureVector::from_dense(&[3.0]);

        let low = RbfKernel::new(0.1).compute(&x, &y);
        let high = RbfKernel::new(10.0).compute(&x, &y);

        assert!(low > high);
        assert_relative_eq!(low, (-0.4_f64).exp(), epsilon = 1e-12);
        assert_relative_eq!(high, (-40.0_f64).exp(), epsilon = 1e-12);
    }

    #[test]
    fn test_rbf_kernel_symmetry() {
        let kernel = RbfKernel::new(0.5);
        let x = FeatureVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);
        let y = FeatureVector::new(vec![2, 3, 4], vec![1.0, 2.0, 3.0]);

        assert_eq!(kernel.compute(&x, &y), kernel.compute(&y, &x));
    }

    #[test]
    fn test_rbf_kernel_with_norms() {
        let kernel = RbfKernel::new(2.0);
        let x = FeatureVector::from_dense(&[3.0, 4.0]);
        let y = FeatureVector::from_dense(&[1.0, 2.0]);

        let direct = kernel.compute(&x, &y);
        let with_norms = kernel.compute_with_norms(&x, &y, 25.0, 5.0);
        assert_relative_eq!(direct, with_norms, epsilon = 1e-12);
    }

    #[test]
    fn test_norms_rounding_never_exceeds_one() {
        let kernel = RbfKernel::new(1.0);
        let x = FeatureVector::from_dense(&[0.1, 0.2, 0.3]);
        let norm = x.norm_squared();
        assert!(kernel.compute_with_norms(&x, &x, norm, norm) <= 1.0);
    }

    #[test]
    fn test_extreme_gamma() {
        let x = FeatureVector::from_dense(&[1.0]);
        let y = FeatureVector::from_dense(&[2.0]);

        assert_eq!(RbfKernel::new(0.0).compute(&x, &y), 1.0);
        assert_eq!(RbfKernel::new(1e308).compute(&x, &y), 0.0);
    }
}
