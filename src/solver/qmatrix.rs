//! Q matrices of the dual problems
//!
//! The solver only sees `Q` through [`QMatrix`]: one row per optimization
//! variable plus the diagonal. Rows come from an LRU [`KernelCache`].

use crate::cache::KernelCache;
use crate::core::FeatureVector;
use crate::kernel::{KernelFunction, KernelMatrix};
use std::rc::Rc;

/// Access to the quadratic term of the dual objective
pub trait QMatrix {
    /// Row `i` of Q over all variables
    fn row(&mut self, i: usize) -> Rc<[f64]>;

    /// Diagonal entries Q_ii
    fn diagonal(&self) -> &[f64];

    /// Number of optimization variables
    fn len(&self) -> usize {
        self.diagonal().len()
    }
}

/// Classification: Q_ij = y_i y_j K(x_i, x_j)
pub struct SvcQ<'a> {
    kernel: KernelMatrix<'a>,
    y: Vec<i8>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a> SvcQ<'a> {
    pub fn new(
        vectors: Vec<&'a FeatureVector>,
        y: &[i8],
        kernel: KernelFunction,
        cache_bytes: usize,
    ) -> Self {
        let kernel = KernelMatrix::new(vectors, kernel);
        let qd = (0..kernel.len()).map(|i| kernel.eval(i, i)).collect();
        let cache = KernelCache::with_memory_limit(kernel.len(), cache_bytes);
        Self {
            kernel,
            y: y.to_vec(),
            cache,
            qd,
        }
    }
}

impl QMatrix for SvcQ<'_> {
    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let Self {
            kernel, y, cache, ..
        } = self;
        cache.get_or_insert_with(i, || {
            (0..kernel.len())
                .map(|j| f64::from(y[i] * y[j]) * kernel.eval(i, j))
                .collect()
        })
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

/// One-class: Q_ij = K(x_i, x_j)
pub struct OneClassQ<'a> {
    kernel: KernelMatrix<'a>,
    cache: KernelCache,
    qd: Vec<f64>,
}

impl<'a> OneClassQ<'a> {
    pub fn new(vectors: Vec<&'a FeatureVector>, kernel: KernelFunction, cache_bytes: usize) -> Self {
        let kernel = KernelMatrix::new(vectors, kernel);
        let qd = (0..kernel.len()).map(|i| kernel.eval(i, i)).collect();
        let cache = KernelCache::with_memory_limit(kernel.len(), cache_bytes);
        Self { kernel, cache, qd }
    }
}

impl QMatrix for OneClassQ<'_> {
    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let Self { kernel, cache, .. } = self;
        cache.get_or_insert_with(i, || kernel.row(i))
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}

/// Regression: `2l` variables over `l` samples
///
/// Variable `k < l` is alpha_k with sign +1, variable `k >= l` is alpha*_{k-l}
/// with sign -1; Q_ij = s_i s_j K(x_{i mod l}, x_{j mod l}). Plain kernel
/// rows are cached by sample and signed rows by variable, each within half
/// of the memory budget, so alpha_k and alpha*_k share one kernel row.
pub struct SvrQ<'a> {
    kernel: KernelMatrix<'a>,
    cache: KernelCache,
    signed: KernelCache,
    qd: Vec<f64>,
}

impl<'a> SvrQ<'a> {
    pub fn new(vectors: Vec<&'a FeatureVector>, kernel: KernelFunction, cache_bytes: usize) -> Self {
        let kernel = KernelMatrix::new(vectors, kernel);
        let l = kernel.len();
        let qd = (0..2 * l).map(|k| kernel.eval(k % l, k % l)).collect();
        let cache = KernelCache::with_memory_limit(l, cache_bytes / 2);
        let signed = KernelCache::with_memory_limit(2 * l, cache_bytes / 2);
        Self {
            kernel,
            cache,
            signed,
            qd,
        }
    }
}

fn svr_sign(k: usize, l: usize) -> f64 {
    if k < l {
        1.0
    } else {
        -1.0
    }
}

impl QMatrix for SvrQ<'_> {
    fn row(&mut self, i: usize) -> Rc<[f64]> {
        let Self {
            kernel,
            cache,
            signed,
            ..
        } = self;
        let l = kernel.len();
        signed.get_or_insert_with(i, || {
            let sample = i % l;
            let krow = cache.get_or_insert_with(sample, || kernel.row(sample));
            let si = svr_sign(i, l);
            (0..2 * l).map(|j| si * svr_sign(j, l) * krow[j % l]).collect()
        })
    }

    fn diagonal(&self) -> &[f64] {
        &self.qd
    }
}
