//! Support Vector Machine training and inference
//!
//! C-SVC, nu-SVC, one-class SVM, epsilon-SVR and nu-SVR trained with an SMO
//! solver using second-order working-set selection, shrinking and an LRU
//! kernel cache. Multi-class problems are decomposed one-vs-one; optional
//! Platt calibration yields class probabilities. Models are stored in the
//! LIBSVM text format.
//!
//! Based on "Working Set Selection Using Second Order Information for
//! Training Support Vector Machines" by Fan, Chen and Lin (JMLR 2005)
//! and "Probability Estimates for Multi-class Classification by Pairwise
//! Coupling" by Wu, Lin and Weng (JMLR 2004).
//!
//! ```rust
//! use svm_engine::{train, FeatureVector, KernelType, Parameters, Problem};
//!
//! let problem = Problem::new(
//!     vec![1.0, -1.0],
//!     vec![FeatureVector::from_dense(&[1.0]), FeatureVector::from_dense(&[-1.0])],
//! )?;
//! let param = Parameters { kernel_type: KernelType::Linear, ..Parameters::default() };
//! let model = train(&problem, &param)?;
//! assert_eq!(model.predict(&FeatureVector::from_dense(&[0.3])), 1.0);
//! # Ok::<(), svm_engine::SvmError>(())
//! ```

pub mod api;
pub mod cache;
pub mod core;
pub mod cross_validation;
pub mod data;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod predict;
pub mod probability;
pub mod solver;
pub mod train;

// Re-export main types for convenience
pub use crate::api::{evaluate, EvaluationMetrics, Svm};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{check_parameter, KernelType, Parameters, Result, SvmError, SvmType};
pub use crate::cross_validation::cross_validate;
pub use crate::data::{CsvDataset, LibSvmDataset};
pub use crate::kernel::{Kernel, KernelFunction};
pub use crate::model::Model;
pub use crate::persistence::{load_model, save_model, ModelSummary, TrainingReport};
pub use crate::train::train;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
