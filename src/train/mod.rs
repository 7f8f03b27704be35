//! Model training
//!
//! Sets up the dual problem of each SVM formulation, runs the SMO solver,
//! and assembles the resulting [`Model`]. Classification is decomposed
//! one-vs-one: every pair of classes gets its own binary sub-problem, and
//! support vectors shared between pairs are stored once.

use crate::core::{FeatureVector, Parameters, Problem, Result, SvmType};
use crate::kernel::KernelFunction;
use crate::model::Model;
use crate::probability;
use crate::solver::{
    OneClassQ, SmoSolver, SolutionInfo, SolverConfig, SolverVariant, SvcQ, SvrQ,
};
use log::{debug, info, warn};

/// Samples grouped by class, classes in order of first appearance
#[derive(Debug, Clone, PartialEq)]
pub struct ClassGroups {
    pub labels: Vec<f64>,
    pub counts: Vec<usize>,
    /// Offset of each class in `perm`
    pub start: Vec<usize>,
    /// Sample positions ordered by class, problem order within a class
    pub perm: Vec<usize>,
}

impl ClassGroups {
    pub fn nr_class(&self) -> usize {
        self.labels.len()
    }

    /// Positions of the samples of class `c`
    pub fn members(&self, c: usize) -> &[usize] {
        &self.perm[self.start[c]..self.start[c] + self.counts[c]]
    }
}

/// Group labels by exact value in order of first appearance
pub fn group_classes(labels: &[f64]) -> ClassGroups {
    let mut distinct: Vec<f64> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    let mut class_of = Vec::with_capacity(labels.len());

    for &y in labels {
        match distinct.iter().position(|&d| d == y) {
            Some(c) => {
                counts[c] += 1;
                class_of.push(c);
            }
            None => {
                class_of.push(distinct.len());
                distinct.push(y);
                counts.push(1);
            }
        }
    }

    let mut start = vec![0; distinct.len()];
    for c in 1..distinct.len() {
        start[c] = start[c - 1] + counts[c - 1];
    }

    let mut next = start.clone();
    let mut perm = vec![0; labels.len()];
    for (i, &c) in class_of.iter().enumerate() {
        perm[next[c]] = i;
        next[c] += 1;
    }

    ClassGroups {
        labels: distinct,
        counts,
        start,
        perm,
    }
}

/// Train a model after validating the parameters
pub fn train(problem: &Problem, param: &Parameters) -> Result<Model> {
    param.validate(problem)?;
    Ok(train_unchecked(problem, param))
}

/// Train without validation; used for the sub-problems of cross-validation
/// and calibration, which inherit already validated parameters
pub(crate) fn train_unchecked(problem: &Problem, param: &Parameters) -> Model {
    if param.svm_type.is_classification() {
        train_classification(problem, param)
    } else {
        train_single(problem, param)
    }
}

/// Coefficients and bias of one decision function
struct DecisionFunction {
    alpha: Vec<f64>,
    rho: f64,
}

fn solver_config(param: &Parameters, cp: f64, cn: f64) -> SolverConfig {
    SolverConfig {
        cp,
        cn,
        eps: param.eps,
        shrinking: param.shrinking,
    }
}

fn solve_c_svc(
    x: &[&FeatureVector],
    y: &[i8],
    param: &Parameters,
    cp: f64,
    cn: f64,
) -> (Vec<f64>, SolutionInfo) {
    let l = x.len();
    let kernel = KernelFunction::from_parameters(param);
    let mut q = SvcQ::new(x.to_vec(), y, kernel, param.cache_bytes());
    let (mut alpha, info) = SmoSolver::new(
        &mut q,
        SolverVariant::Standard,
        solver_config(param, cp, cn),
        vec![-1.0; l],
        y.to_vec(),
        vec![0.0; l],
    )
    .solve();

    for (a, &s) in alpha.iter_mut().zip(y) {
        *a *= f64::from(s);
    }
    (alpha, info)
}

fn solve_nu_svc(x: &[&FeatureVector], y: &[i8], param: &Parameters) -> (Vec<f64>, SolutionInfo) {
    let l = x.len();
    let mut sum_pos = param.nu * l as f64 / 2.0;
    let mut sum_neg = sum_pos;
    let init: Vec<f64> = y
        .iter()
        .map(|&s| {
            let remaining = if s == 1 { &mut sum_pos } else { &mut sum_neg };
            let a = remaining.min(1.0);
            *remaining -= a;
            a
        })
        .collect();

    let kernel = KernelFunction::from_parameters(param);
    let mut q = SvcQ::new(x.to_vec(), y, kernel, param.cache_bytes());
    let (mut alpha, mut info) = SmoSolver::new(
        &mut q,
        SolverVariant::Nu,
        solver_config(param, 1.0, 1.0),
        vec![0.0; l],
        y.to_vec(),
        init,
    )
    .solve();

    let r = info.r;
    debug!("C = {}", 1.0 / r);
    for (a, &s) in alpha.iter_mut().zip(y) {
        *a *= f64::from(s) / r;
    }
    info.rho /= r;
    info.obj /= r * r;
    info.upper_bound_p = 1.0 / r;
    info.upper_bound_n = 1.0 / r;
    (alpha, info)
}

fn solve_one_class(x: &[&FeatureVector], param: &Parameters) -> (Vec<f64>, SolutionInfo) {
    let l = x.len();
    let total = param.nu * l as f64;
    let n = (total as usize).min(l);
    let mut init = vec![0.0; l];
    init[..n].iter_mut().for_each(|a| *a = 1.0);
    if n < l {
        init[n] = total - n as f64;
    }

    let kernel = KernelFunction::from_parameters(param);
    let mut q = OneClassQ::new(x.to_vec(), kernel, param.cache_bytes());
    SmoSolver::new(
        &mut q,
        SolverVariant::Standard,
        solver_config(param, 1.0, 1.0),
        vec![0.0; l],
        vec![1; l],
        init,
    )
    .solve()
}

/// Sign layout shared by both regression formulations: variable `i` is
/// alpha_i (+1), variable `i + l` is alpha*_i (-1)
fn svr_signs(l: usize) -> Vec<i8> {
    (0..2 * l).map(|k| if k < l { 1 } else { -1 }).collect()
}

fn fold_svr_alphas(alpha2: &[f64], l: usize) -> Vec<f64> {
    (0..l).map(|i| alpha2[i] - alpha2[i + l]).collect()
}

fn solve_epsilon_svr(
    x: &[&FeatureVector],
    targets: &[f64],
    param: &Parameters,
) -> (Vec<f64>, SolutionInfo) {
    let l = x.len();
    let linear_term: Vec<f64> = targets
        .iter()
        .map(|&t| param.p - t)
        .chain(targets.iter().map(|&t| param.p + t))
        .collect();

    let kernel = KernelFunction::from_parameters(param);
    let mut q = SvrQ::new(x.to_vec(), kernel, param.cache_bytes());
    let (alpha2, info) = SmoSolver::new(
        &mut q,
        SolverVariant::Standard,
        solver_config(param, param.c, param.c),
        linear_term,
        svr_signs(l),
        vec![0.0; 2 * l],
    )
    .solve();

    (fold_svr_alphas(&alpha2, l), info)
}

fn solve_nu_svr(
    x: &[&FeatureVector],
    targets: &[f64],
    param: &Parameters,
) -> (Vec<f64>, SolutionInfo) {
    let l = x.len();
    let c = param.c;
    let mut sum = c * param.nu * l as f64 / 2.0;
    let mut init = vec![0.0; 2 * l];
    for i in 0..l {
        let a = sum.min(c);
        init[i] = a;
        init[i + l] = a;
        sum -= a;
    }
    let linear_term: Vec<f64> = targets
        .iter()
        .map(|&t| -t)
        .chain(targets.iter().copied())
        .collect();

    let kernel = KernelFunction::from_parameters(param);
    let mut q = SvrQ::new(x.to_vec(), kernel, param.cache_bytes());
    let (alpha2, info) = SmoSolver::new(
        &mut q,
        SolverVariant::Nu,
        solver_config(param, c, c),
        linear_term,
        svr_signs(l),
        init,
    )
    .solve();

    debug!("epsilon = {}", -info.r);
    (fold_svr_alphas(&alpha2, l), info)
}

/// Solve one sub-problem
///
/// `targets` are ±1 for classification and the regression targets for
/// SVR; one-class ignores them.
fn train_one(
    x: &[&FeatureVector],
    targets: &[f64],
    param: &Parameters,
    cp: f64,
    cn: f64,
) -> DecisionFunction {
    let signs = || -> Vec<i8> { targets.iter().map(|&t| if t > 0.0 { 1 } else { -1 }).collect() };
    let (alpha, info) = match param.svm_type {
        SvmType::CSvc => solve_c_svc(x, &signs(), param, cp, cn),
        SvmType::NuSvc => solve_nu_svc(x, &signs(), param),
        SvmType::OneClass => solve_one_class(x, param),
        SvmType::EpsilonSvr => solve_epsilon_svr(x, targets, param),
        SvmType::NuSvr => solve_nu_svr(x, targets, param),
    };

    debug!("obj = {}, rho = {}", info.obj, info.rho);

    let mut n_sv = 0;
    let mut n_bsv = 0;
    for (i, a) in alpha.iter().enumerate() {
        if a.abs() > 0.0 {
            n_sv += 1;
            let bound = if targets.get(i).map_or(true, |&t| t > 0.0) {
                info.upper_bound_p
            } else {
                info.upper_bound_n
            };
            if a.abs() >= bound {
                n_bsv += 1;
            }
        }
    }
    debug!("nSV = {n_sv}, nBSV = {n_bsv}");

    DecisionFunction {
        alpha,
        rho: info.rho,
    }
}

/// One-class and regression: a single decision function over all samples
fn train_single(problem: &Problem, param: &Parameters) -> Model {
    let x: Vec<&FeatureVector> = problem.vectors.iter().collect();
    let f = train_one(&x, &problem.labels, param, 0.0, 0.0);

    let mut support_vectors = Vec::new();
    let mut coef = Vec::new();
    let mut sv_indices = Vec::new();
    for (i, &a) in f.alpha.iter().enumerate() {
        if a.abs() > 0.0 {
            support_vectors.push(problem.vectors[i].clone());
            coef.push(a);
            sv_indices.push(i + 1);
        }
    }
    info!("Total nSV = {}", support_vectors.len());

    let mut model = Model {
        param: param.clone(),
        nr_class: 2,
        labels: Vec::new(),
        n_sv: Vec::new(),
        support_vectors,
        sv_coef: vec![coef],
        rho: vec![f.rho],
        prob_a: Vec::new(),
        prob_b: Vec::new(),
        prob_density_marks: Vec::new(),
        sv_indices,
    };

    if param.probability {
        match param.svm_type {
            SvmType::EpsilonSvr | SvmType::NuSvr => {
                model.prob_a = vec![probability::svr_probability(problem, param)];
            }
            SvmType::OneClass => {
                if let Some(marks) = probability::one_class_density_marks(problem, &model) {
                    model.prob_density_marks = marks;
                }
            }
            SvmType::CSvc | SvmType::NuSvc => {}
        }
    }

    model
}

/// Per-class C after applying the weight table
fn weighted_c(param: &Parameters, groups: &ClassGroups) -> Vec<f64> {
    let mut weighted = vec![param.c; groups.nr_class()];
    for &(label, weight) in &param.class_weights {
        match groups.labels.iter().position(|&l| l == label) {
            Some(c) => weighted[c] *= weight,
            None => warn!("class label {label} specified in weight is not found"),
        }
    }
    weighted
}

fn train_classification(problem: &Problem, param: &Parameters) -> Model {
    let groups = group_classes(&problem.labels);
    let nr_class = groups.nr_class();
    if nr_class == 1 {
        warn!("training data in only one class");
    }

    // samples reordered so each class is contiguous
    let x: Vec<&FeatureVector> = groups.perm.iter().map(|&i| &problem.vectors[i]).collect();
    let l = x.len();
    let weighted = weighted_c(param, &groups);

    let mut nonzero = vec![false; l];
    let n_pairs = nr_class * nr_class.saturating_sub(1) / 2;
    let mut decisions = Vec::with_capacity(n_pairs);
    let mut prob_a = Vec::new();
    let mut prob_b = Vec::new();

    for i in 0..nr_class {
        for j in i + 1..nr_class {
            let (si, ci) = (groups.start[i], groups.counts[i]);
            let (sj, cj) = (groups.start[j], groups.counts[j]);

            let sub_x: Vec<&FeatureVector> =
                x[si..si + ci].iter().chain(&x[sj..sj + cj]).copied().collect();
            let mut sub_y = vec![1.0; ci];
            sub_y.extend(std::iter::repeat(-1.0).take(cj));

            if param.probability {
                let (a, b) =
                    probability::binary_svc_probability(&sub_x, &sub_y, param, weighted[i], weighted[j]);
                prob_a.push(a);
                prob_b.push(b);
            }

            let f = train_one(&sub_x, &sub_y, param, weighted[i], weighted[j]);
            for k in 0..ci {
                if f.alpha[k].abs() > 0.0 {
                    nonzero[si + k] = true;
                }
            }
            for k in 0..cj {
                if f.alpha[ci + k].abs() > 0.0 {
                    nonzero[sj + k] = true;
                }
            }
            decisions.push(f);
        }
    }

    let n_sv: Vec<usize> = (0..nr_class)
        .map(|c| {
            (groups.start[c]..groups.start[c] + groups.counts[c])
                .filter(|&k| nonzero[k])
                .count()
        })
        .collect();
    let total_sv: usize = n_sv.iter().sum();
    info!("Total nSV = {total_sv}");

    let mut support_vectors = Vec::with_capacity(total_sv);
    let mut sv_indices = Vec::with_capacity(total_sv);
    for k in (0..l).filter(|&k| nonzero[k]) {
        support_vectors.push(x[k].clone());
        sv_indices.push(groups.perm[k] + 1);
    }

    let mut nz_start = vec![0; nr_class];
    for c in 1..nr_class {
        nz_start[c] = nz_start[c - 1] + n_sv[c - 1];
    }

    // pair (i, j): class i coefficients go to row j-1, class j to row i
    let mut sv_coef = vec![vec![0.0; total_sv]; nr_class.saturating_sub(1)];
    let mut p = 0;
    for i in 0..nr_class {
        for j in i + 1..nr_class {
            let (si, ci) = (groups.start[i], groups.counts[i]);
            let (sj, cj) = (groups.start[j], groups.counts[j]);
            let alpha = &decisions[p].alpha;

            let mut q = nz_start[i];
            for k in (0..ci).filter(|&k| nonzero[si + k]) {
                sv_coef[j - 1][q] = alpha[k];
                q += 1;
            }
            let mut q = nz_start[j];
            for k in (0..cj).filter(|&k| nonzero[sj + k]) {
                sv_coef[i][q] = alpha[ci + k];
                q += 1;
            }
            p += 1;
        }
    }

    Model {
        param: param.clone(),
        nr_class,
        labels: groups.labels,
        n_sv,
        support_vectors,
        sv_coef,
        rho: decisions.iter().map(|d| d.rho).collect(),
        prob_a,
        prob_b,
        prob_density_marks: Vec::new(),
        sv_indices,
    }
}
