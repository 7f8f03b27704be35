//! SVM dual solver
//!
//! Sequential Minimal Optimization with second-order working-set selection
//! and shrinking, as described in "Working Set Selection Using Second Order
//! Information for Training Support Vector Machines" (Fan, Chen and Lin).

pub mod qmatrix;
pub mod shrinking;
pub mod smo;

pub use self::qmatrix::*;
pub use self::shrinking::*;
pub use self::smo::*;
