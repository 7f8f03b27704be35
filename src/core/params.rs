//! Training parameters and the parameter validator

use crate::core::{Problem, Result, SvmError};
use crate::train::group_classes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// SVM formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SvmType {
    CSvc,
    NuSvc,
    OneClass,
    EpsilonSvr,
    NuSvr,
}

impl SvmType {
    pub const ALL: [SvmType; 5] = [
        SvmType::CSvc,
        SvmType::NuSvc,
        SvmType::OneClass,
        SvmType::EpsilonSvr,
        SvmType::NuSvr,
    ];

    /// Name used in model files
    pub fn name(self) -> &'static str {
        match self {
            SvmType::CSvc => "c_svc",
            SvmType::NuSvc => "nu_svc",
            SvmType::OneClass => "one_class",
            SvmType::EpsilonSvr => "epsilon_svr",
            SvmType::NuSvr => "nu_svr",
        }
    }

    /// C_SVC or NU_SVC
    pub fn is_classification(self) -> bool {
        matches!(self, SvmType::CSvc | SvmType::NuSvc)
    }

    /// EPSILON_SVR or NU_SVR
    pub fn is_regression(self) -> bool {
        matches!(self, SvmType::EpsilonSvr | SvmType::NuSvr)
    }
}

impl fmt::Display for SvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SvmType {
    type Err = SvmError;

    fn from_str(s: &str) -> Result<Self> {
        SvmType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| SvmError::ParseError(format!("unknown svm type: {s}")))
    }
}

/// Kernel function family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelType {
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
    Precomputed,
}

impl KernelType {
    pub const ALL: [KernelType; 5] = [
        KernelType::Linear,
        KernelType::Polynomial,
        KernelType::Rbf,
        KernelType::Sigmoid,
        KernelType::Precomputed,
    ];

    /// Name used in model files
    pub fn name(self) -> &'static str {
        match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Rbf => "rbf",
            KernelType::Sigmoid => "sigmoid",
            KernelType::Precomputed => "precomputed",
        }
    }

    pub fn uses_gamma(self) -> bool {
        matches!(
            self,
            KernelType::Polynomial | KernelType::Rbf | KernelType::Sigmoid
        )
    }

    pub fn uses_coef0(self) -> bool {
        matches!(self, KernelType::Polynomial | KernelType::Sigmoid)
    }
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KernelType {
    type Err = SvmError;

    fn from_str(s: &str) -> Result<Self> {
        KernelType::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| SvmError::ParseError(format!("unknown kernel type: {s}")))
    }
}

/// Training configuration
///
/// Deserializing fills absent fields from [`Parameters::default`], so a JSON
/// config file only needs the fields it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    /// Polynomial degree
    pub degree: i32,
    /// Kernel coefficient for polynomial, RBF and sigmoid kernels
    pub gamma: f64,
    /// Independent term for polynomial and sigmoid kernels
    pub coef0: f64,
    /// Kernel cache size in MB
    pub cache_size: f64,
    /// Stopping tolerance on the maximal KKT violation
    pub eps: f64,
    /// Regularization parameter for C_SVC, EPSILON_SVR and NU_SVR
    pub c: f64,
    /// Nu for NU_SVC, ONE_CLASS and NU_SVR
    pub nu: f64,
    /// Width of the epsilon-insensitive tube for EPSILON_SVR
    pub p: f64,
    pub shrinking: bool,
    /// Fit probability calibration during training
    pub probability: bool,
    /// `(label, weight)` pairs; the effective C of a class is `C * weight`
    pub class_weights: Vec<(f64, f64)>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Rbf,
            degree: 3,
            gamma: 0.5,
            coef0: 0.0,
            cache_size: 100.0,
            eps: 1e-3,
            c: 1.0,
            nu: 0.5,
            p: 0.1,
            shrinking: true,
            probability: false,
            class_weights: Vec::new(),
        }
    }
}

impl Parameters {
    /// Validate against a problem, mapping the reason to an error
    pub fn validate(&self, problem: &Problem) -> Result<()> {
        match check_parameter(problem, self) {
            Some(reason) => Err(SvmError::InvalidParameter(reason)),
            None => Ok(()),
        }
    }

    /// Kernel cache size in bytes
    pub(crate) fn cache_bytes(&self) -> usize {
        (self.cache_size * (1 << 20) as f64) as usize
    }
}

/// Check parameters against a problem
///
/// Returns the first violated rule as a human-readable reason, or `None`
/// when training may proceed. The check is pure.
pub fn check_parameter(problem: &Problem, param: &Parameters) -> Option<String> {
    let svm_type = param.svm_type;
    let kernel_type = param.kernel_type;

    if kernel_type == KernelType::Polynomial && param.degree < 0 {
        return Some("degree of polynomial kernel < 0".to_string());
    }
    if kernel_type.uses_gamma() && !(param.gamma >= 0.0) {
        return Some("gamma < 0".to_string());
    }
    if !(param.cache_size > 0.0) {
        return Some("cache_size <= 0".to_string());
    }
    if !(param.eps > 0.0) {
        return Some("eps <= 0".to_string());
    }
    if matches!(
        svm_type,
        SvmType::CSvc | SvmType::EpsilonSvr | SvmType::NuSvr
    ) && !(param.c > 0.0)
    {
        return Some("C <= 0".to_string());
    }
    if matches!(svm_type, SvmType::NuSvc | SvmType::OneClass | SvmType::NuSvr)
        && !(param.nu > 0.0 && param.nu <= 1.0)
    {
        return Some("nu <= 0 or nu > 1".to_string());
    }
    if svm_type == SvmType::EpsilonSvr && !(param.p >= 0.0) {
        return Some("p < 0".to_string());
    }

    if svm_type == SvmType::NuSvc {
        let counts = group_classes(&problem.labels).counts;
        for i in 0..counts.len() {
            for j in i + 1..counts.len() {
                let (n1, n2) = (counts[i] as f64, counts[j] as f64);
                if param.nu * (n1 + n2) / 2.0 > n1.min(n2) {
                    return Some("specified nu is infeasible".to_string());
                }
            }
        }
    }

    if problem.labels.len() != problem.vectors.len() {
        return Some("number of labels does not match number of feature vectors".to_string());
    }
    if problem.is_empty() {
        return Some("problem has no samples".to_string());
    }

    if kernel_type == KernelType::Precomputed {
        let columns = problem.num_features() as f64;
        let well_formed = problem.vectors.iter().all(|x| {
            x.indices.first() == Some(&0) && {
                let id = x.values[0];
                id.fract() == 0.0 && id >= 1.0 && id <= columns
            }
        });
        if !well_formed {
            return Some(
                "precomputed kernel rows must start with 0:<serial number> naming a column"
                    .to_string(),
            );
        }
    }

    None
}
