//! Precomputed kernel
//!
//! Each feature vector is a row of a user-supplied kernel matrix: entry
//! `0:<id>` holds the 1-based serial number of the sample, and entry `k`
//! holds K(sample, training sample k).

use crate::core::FeatureVector;
use crate::kernel::traits::Kernel;

/// Looks kernel values up in precomputed rows
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PrecomputedKernel;

impl PrecomputedKernel {
    pub fn new() -> Self {
        Self
    }
}

/// Serial number stored in the `0:<id>` column of `y`
fn serial_number(y: &FeatureVector) -> Option<usize> {
    match (y.indices.first(), y.values.first()) {
        (Some(0), Some(&id)) if id >= 0.0 => Some(id as usize),
        _ => None,
    }
}

impl Kernel for PrecomputedKernel {
    /// K(x, y) is the entry of row `x` in the column named by `y`'s serial number
    fn compute(&self, x: &FeatureVector, y: &FeatureVector) -> f64 {
        serial_number(y).map_or(0.0, |col| x.get(col))
    }
}
