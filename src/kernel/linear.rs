//! Linear kernel implementation

use crate::core::FeatureVector;
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LinearKernel;

impl LinearKernel {
    /// Create a new linear kernel
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two sparse vectors
///
/// Both index lists are sorted, so a merge walk visits each stored entry
/// once; indices present in only one vector contribute nothing.
pub fn dot(x: &FeatureVector, y: &FeatureVector) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.indices.len() && j < y.indices.len() {
        let x_idx = x.indices[i];
        let y_idx = y.indices[j];

        if x_idx == y_idx {
            result += x.values[i] * y.values[j];
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_kernel_basic() {
        let kernel = LinearKernel::new();

        let x = FeatureVector::new(vec![1, 3, 5], vec![1.0, 2.0, 3.0]);
        let y = FeatureVector::new(vec![2, 3, 4], vec![1.0, 2.0, 3.0]);

        // Only index 3 overlaps: 2.0 * 2.0 = 4.0
        assert_eq!(kernel.compute(&x, &y), 4.0);
    }

    #[test]
    fn test_linear_kernel_identical() {
        let kernel = LinearKernel::new();
        let x = FeatureVector::new(vec![1, 2, 3], vec![1.0, 2.0, 3.0]);

        assert_eq!(kernel.compute(&x, &x), 14.0);
    }

    #[test]
    fn test_linear_kernel_no_overlap() {
        let kernel = LinearKernel::new();

        let x = FeatureVector::new(vec![1, 3], vec![1.0, 2.0]);
        let y = FeatureVector::new(vec![2, 4], vec![1.0, 2.0]);

        assert_eq!(kernel.compute(&x, &y), 0.0);
    }

    #[test]
    fn test_dot_sparse() {
        let x = FeatureVector::new(vec![1, 3, 6], vec![1.0, 3.0, 2.0]);
        let y = FeatureVector::new(vec![3, 4, 6], vec![2.0, 1.0, 4.0]);

        assert_eq!(dot(&x, &y), 14.0);
        assert_eq!(dot(&y, &x), 14.0);
    }

    #[test]
    fn test_dot_empty() {
        let x = FeatureVector::empty();
        let y = FeatureVector::new(vec![1, 2], vec![1.0, 2.0]);

        assert_eq!(dot(&x, &y), 0.0);
        assert_eq!(dot(&y, &x), 0.0);
    }
}
