//! Probability calibration
//!
//! - classification: Platt scaling of each pair's decision values, fitted on
//!   held-out values from an internal 5-fold cross-validation, and pairwise
//!   coupling (Wu, Lin and Weng, 2004) at prediction time
//! - regression: scale of a Laplace model of the held-out residuals
//! - one-class: density marks over the training decision values
//!
//! Folds come from [`assign_folds`], so calibration is deterministic.

use crate::core::{FeatureVector, Parameters, Problem};
use crate::cross_validation::{assign_folds, held_out_predictions};
use crate::model::Model;
use crate::train::train_unchecked;
use log::{info, warn};

const NR_FOLD: usize = 5;
const NR_MARKS: usize = 10;

/// Fit `P(y = 1 | f) = 1 / (1 + exp(A f + B))` to decision values
///
/// Newton's method with backtracking line search on the regularized
/// negative log-likelihood. `labels` are interpreted by sign.
pub fn sigmoid_train(dec_values: &[f64], labels: &[f64]) -> (f64, f64) {
    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    let max_iter = 100;
    let min_step = 1e-10;
    let sigma = 1e-12;
    let eps = 1e-5;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let t: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        dec_values
            .iter()
            .zip(&t)
            .map(|(&f, &ti)| {
                let f_apb = f * a + b;
                if f_apb >= 0.0 {
                    ti * f_apb + (-f_apb).exp().ln_1p()
                } else {
                    (ti - 1.0) * f_apb + f_apb.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for iter in 0..max_iter {
        // gradient and Hessian (plus sigma on the diagonal)
        let mut h11 = sigma;
        let mut h22 = sigma;
        let mut h21 = 0.0;
        let mut g1 = 0.0;
        let mut g2 = 0.0;
        for (&f, &ti) in dec_values.iter().zip(&t) {
            let f_apb = f * a + b;
            let (p, q) = if f_apb >= 0.0 {
                let e = (-f_apb).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_apb.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = ti - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < eps && g2.abs() < eps {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let da = -(h22 * g1 - h21 * g2) / det;
        let db = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * da + g2 * db;

        let mut step = 1.0;
        while step >= min_step {
            let new_a = a + step * da;
            let new_b = b + step * db;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 0.0001 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < min_step {
            warn!("line search fails in two-class probability estimates");
            break;
        }
        if iter + 1 == max_iter {
            warn!("reaching maximal iterations in two-class probability estimates");
        }
    }

    (a, b)
}

/// Evaluate the fitted sigmoid without overflow
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_apb = decision_value * a + b;
    if f_apb >= 0.0 {
        (-f_apb).exp() / (1.0 + (-f_apb).exp())
    } else {
        1.0 / (1.0 + f_apb.exp())
    }
}

/// Couple pairwise probabilities into one distribution over `k` classes
///
/// `r[i][j]` estimates P(class i | class i or j). The result sums to 1.
pub fn multiclass_probability(r: &[Vec<f64>]) -> Vec<f64> {
    let k = r.len();
    if k == 0 {
        return Vec::new();
    }
    let max_iter = 100.max(k);
    let eps = 0.005 / k as f64;

    let mut q = vec![vec![0.0; k]; k];
    for t in 0..k {
        for j in 0..t {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = q[j][t];
        }
        for j in t + 1..k {
            q[t][t] += r[j][t] * r[j][t];
            q[t][j] = -r[j][t] * r[t][j];
        }
    }

    let mut p = vec![1.0 / k as f64; k];
    let mut qp = vec![0.0; k];
    let mut converged = false;

    for _ in 0..max_iter {
        let mut p_qp = 0.0;
        for t in 0..k {
            qp[t] = (0..k).map(|j| q[t][j] * p[j]).sum();
            p_qp += p[t] * qp[t];
        }

        let max_error = qp.iter().map(|&v| (v - p_qp).abs()).fold(0.0, f64::max);
        if max_error < eps {
            converged = true;
            break;
        }

        for t in 0..k {
            let diff = (-qp[t] + p_qp) / q[t][t];
            p[t] += diff;
            p_qp = (p_qp + diff * (diff * q[t][t] + 2.0 * qp[t])) / (1.0 + diff) / (1.0 + diff);
            for j in 0..k {
                qp[j] = (qp[j] + diff * q[t][j]) / (1.0 + diff);
                p[j] /= 1.0 + diff;
            }
        }
    }

    if !converged {
        warn!("exceeds max_iter in multiclass probability coupling");
    }
    p
}

/// Platt parameters `(A, B)` for one class pair
///
/// `y` is +1 for the first class of the pair and -1 for the second. Each
/// held-out decision value comes from a model trained on the other folds
/// with `C = 1` and class weights `cp`, `cn`.
pub(crate) fn binary_svc_probability(
    x: &[&FeatureVector],
    y: &[f64],
    param: &Parameters,
    cp: f64,
    cn: f64,
) -> (f64, f64) {
    let l = y.len();
    let folds = assign_folds(y, NR_FOLD, true);
    let mut dec_values = vec![0.0; l];

    let sub_param = Parameters {
        probability: false,
        c: 1.0,
        class_weights: vec![(1.0, cp), (-1.0, cn)],
        ..param.clone()
    };

    for fold in 0..NR_FOLD {
        let (held_out, training): (Vec<usize>, Vec<usize>) =
            (0..l).partition(|&i| folds[i] == fold);
        if held_out.is_empty() {
            continue;
        }

        let p_count = training.iter().filter(|&&i| y[i] > 0.0).count();
        let n_count = training.len() - p_count;

        let fixed = match (p_count, n_count) {
            (0, 0) => Some(0.0),
            (_, 0) => Some(1.0),
            (0, _) => Some(-1.0),
            _ => None,
        };
        if let Some(value) = fixed {
            for i in held_out {
                dec_values[i] = value;
            }
            continue;
        }

        let sub_problem = Problem {
            labels: training.iter().map(|&i| y[i]).collect(),
            vectors: training.iter().map(|&i| x[i].clone()).collect(),
        };
        let model = train_unchecked(&sub_problem, &sub_param);
        // the sub-model's first class is whichever label its training part starts with
        let orientation = model.labels.first().copied().unwrap_or(1.0);
        for i in held_out {
            let (_, dec) = model.predict_values(x[i]);
            dec_values[i] = dec.first().copied().unwrap_or(0.0) * orientation;
        }
    }

    sigmoid_train(&dec_values, y)
}

/// Laplace scale of the held-out residuals of a regression problem
///
/// Residuals beyond `5 * sqrt(2 * mae^2)` are treated as outliers. The
/// result is always strictly positive.
pub(crate) fn svr_probability(problem: &Problem, param: &Parameters) -> f64 {
    let l = problem.len();
    let sub_param = Parameters {
        probability: false,
        ..param.clone()
    };
    let predictions = held_out_predictions(problem, &sub_param, NR_FOLD);

    let residuals: Vec<f64> = problem
        .labels
        .iter()
        .zip(&predictions)
        .map(|(y, prediction)| y - prediction)
        .collect();
    let mae = residuals.iter().map(|r| r.abs()).sum::<f64>() / l.max(1) as f64;

    let std = (2.0 * mae * mae).sqrt();
    let kept: Vec<f64> = residuals
        .iter()
        .map(|r| r.abs())
        .filter(|&r| r <= 5.0 * std)
        .collect();
    let sigma = if kept.is_empty() {
        mae
    } else {
        kept.iter().sum::<f64>() / kept.len() as f64
    };
    let sigma = sigma.max(f64::MIN_POSITIVE);

    info!(
        "Prob. model for test data: target value = predicted value + z, \
         z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma = {sigma}"
    );
    sigma
}

/// Density marks for a one-class model
///
/// Needs at least 5 negative and 5 non-negative training decision values.
pub(crate) fn one_class_density_marks(problem: &Problem, model: &Model) -> Option<Vec<f64>> {
    let mut dec_values: Vec<f64> = problem
        .vectors
        .iter()
        .map(|x| model.predict_values(x).1[0])
        .collect();
    dec_values.sort_by(f64::total_cmp);

    let l = dec_values.len();
    let neg_counter = dec_values.iter().take_while(|&&v| v < 0.0).count();
    let pos_counter = l - neg_counter;
    let mid = NR_MARKS / 2;

    if neg_counter < mid || pos_counter < mid {
        warn!(
            "number of positive or negative decision values < {mid}; \
             too few to do a probability estimation"
        );
        return None;
    }

    let mut tmp = vec![0.0; NR_MARKS + 1];
    for i in 0..mid {
        tmp[i] = dec_values[i * neg_counter / mid];
    }
    tmp[mid] = 0.0;
    for i in mid + 1..=NR_MARKS {
        tmp[i] = dec_values[neg_counter - 1 + (i - mid) * pos_counter / mid];
    }

    Some(tmp.windows(2).map(|w| (w[0] + w[1]) / 2.0).collect())
}

/// Probability of being an inlier given a one-class decision value
pub fn one_class_probability(marks: &[f64], dec_value: f64) -> f64 {
    let (first, last) = match (marks.first(), marks.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return 0.5,
    };

    if dec_value < first {
        return 0.001;
    }
    if dec_value > last {
        return 0.999;
    }
    for (i, &mark) in marks.iter().enumerate().skip(1) {
        if dec_value < mark {
            return i as f64 / marks.len() as f64;
        }
    }
    0.999
}
