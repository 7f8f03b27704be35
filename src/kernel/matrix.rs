//! Kernel matrix view over a training set
//!
//! Used by the solver's Q matrices: evaluates K(x_i, x_j) for sample
//! positions, with squared norms cached up front for the RBF kernel.

use crate::core::FeatureVector;
use crate::kernel::{Kernel, KernelFunction};

pub struct KernelMatrix<'a> {
    vectors: Vec<&'a FeatureVector>,
    norms: Option<Vec<f64>>,
    kernel: KernelFunction,
}

impl<'a> KernelMatrix<'a> {
    pub fn new(vectors: Vec<&'a FeatureVector>, kernel: KernelFunction) -> Self {
        let norms = kernel
            .uses_norms()
            .then(|| vectors.iter().map(|x| x.norm_squared()).collect());
        Self {
            vectors,
            norms,
            kernel,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// K(x_i, x_j)
    pub fn eval(&self, i: usize, j: usize) -> f64 {
        match &self.norms {
            Some(norms) => self.kernel.compute_with_norms(
                self.vectors[i],
                self.vectors[j],
                norms[i],
                norms[j],
            ),
            None => self.kernel.compute(self.vectors[i], self.vectors[j]),
        }
    }

    /// Row `i` of the kernel matrix
    pub fn row(&self, i: usize) -> Vec<f64> {
        (0..self.len()).map(|j| self.eval(i, j)).collect()
    }
}
