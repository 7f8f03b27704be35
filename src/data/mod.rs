//! Data loading and dataset implementations
//!
//! Readers for the LIBSVM sparse text format and for dense CSV files. Both
//! produce a [`Problem`](crate::core::Problem) with 1-based feature indices.

pub mod csv;
pub mod libsvm;

pub use self::csv::*;
pub use self::libsvm::*;
