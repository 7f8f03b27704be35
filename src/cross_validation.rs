//! k-fold cross-validation
//!
//! Fold assignment is deterministic: classification samples are dealt
//! round-robin class by class (classes in first-appearance order, samples
//! in problem order), so every fold gets a proportional share of each
//! class; other problem types deal sample `i` to fold `i % k`. Repeated
//! calls with the same inputs give bit-identical results.

use crate::core::{FeatureVector, Parameters, Problem, Result, SvmError, SvmType};
use crate::model::Model;
use crate::train::{group_classes, train_unchecked};
use log::{debug, warn};

/// Fold index of every sample
///
/// With `stratified`, samples are grouped by label first.
pub fn assign_folds(labels: &[f64], folds: usize, stratified: bool) -> Vec<usize> {
    let folds = folds.max(1);
    if !stratified {
        return (0..labels.len()).map(|i| i % folds).collect();
    }

    let groups = group_classes(labels);
    let mut assignment = vec![0; labels.len()];
    for (counter, &i) in groups.perm.iter().enumerate() {
        assignment[i] = counter % folds;
    }
    assignment
}

/// Held-out prediction for every sample of `problem`
///
/// Fails for invalid parameters, `folds < 2`, or fewer than two samples.
/// `folds > l` is clamped to `l` (leave-one-out).
pub fn cross_validate(problem: &Problem, param: &Parameters, folds: usize) -> Result<Vec<f64>> {
    param.validate(problem)?;
    if folds < 2 {
        return Err(SvmError::InvalidParameter(
            "number of folds must be >= 2".to_string(),
        ));
    }
    let l = problem.len();
    if l < 2 {
        return Err(SvmError::InvalidDataset(
            "cross validation needs at least 2 samples".to_string(),
        ));
    }

    let folds = if folds > l {
        warn!("# folds ({folds}) > # data ({l}); using leave-one-out cross validation");
        l
    } else {
        folds
    };

    Ok(held_out_predictions(problem, param, folds))
}

/// Fold loop shared with probability calibration; never fails
///
/// A fold whose training part is empty predicts 0 for its samples.
pub(crate) fn held_out_predictions(problem: &Problem, param: &Parameters, folds: usize) -> Vec<f64> {
    let l = problem.len();
    let folds = folds.clamp(1, l.max(1));
    let assignment = assign_folds(&problem.labels, folds, param.svm_type.is_classification());
    let mut target = vec![0.0; l];

    for fold in 0..folds {
        let (held_out, training): (Vec<usize>, Vec<usize>) =
            (0..l).partition(|&i| assignment[i] == fold);
        if held_out.is_empty() || training.is_empty() {
            continue;
        }
        debug!(
            "fold {}/{}: {} training, {} held out",
            fold + 1,
            folds,
            training.len(),
            held_out.len()
        );

        let model = train_unchecked(&problem.subset(&training), param);
        for i in held_out {
            target[i] = held_out_target(&model, param, &problem.vectors[i]);
        }
    }

    target
}

fn held_out_target(model: &Model, param: &Parameters, x: &FeatureVector) -> f64 {
    if param.probability && matches!(param.svm_type, SvmType::CSvc | SvmType::NuSvc) {
        model.predict_probability(x).0
    } else {
        model.predict(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::KernelType;

    fn blobs() -> Problem {
        let mut problem = Problem::default();
        for k in 0..12 {
            let t = k as f64 * 0.1;
            problem.push(1.0, FeatureVector::from_dense(&[2.0 + t, 1.0 - t]));
            problem.push(2.0, FeatureVector::from_dense(&[-2.0 + t, -1.0 - t]));
        }
        problem
    }

    #[test]
    fn test_stratified_round_robin() {
        // classes: 5.0 at 0, 2, 3; 7.0 at 1, 4
        let labels = [5.0, 7.0, 5.0, 5.0, 7.0];
        let folds = assign_folds(&labels, 2, true);

        // order dealt: 0, 2, 3, 1, 4
        assert_eq!(folds, vec![0, 1, 1, 0, 0]);
    }

    #[test]
    fn test_plain_assignment() {
        assert_eq!(assign_folds(&[0.1, 0.2, 0.3, 0.4, 0.5], 3, false), vec![0, 1, 2, 0, 1]);
    }

    #[test]
    fn test_each_fold_has_every_class() {
        let problem = blobs();
        let folds = assign_folds(&problem.labels, 4, true);
        for fold in 0..4 {
            for label in [1.0, 2.0] {
                assert!(problem
                    .labels
                    .iter()
                    .zip(&folds)
                    .any(|(&y, &f)| f == fold && y == label));
            }
        }
    }

    #[test]
    fn test_cross_validate_accuracy_and_determinism() {
        let problem = blobs();
        let param = Parameters {
            kernel_type: KernelType::Linear,
            ..Parameters::default()
        };

        let first = cross_validate(&problem, &param, 5).unwrap();
        let second = cross_validate(&problem, &param, 5).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), problem.len());
        assert_eq!(first, problem.labels);
    }

    #[test]
    fn test_fold_count_validation() {
        let problem = blobs();
        let param = Parameters::default();

        for folds in [0, 1] {
            match cross_validate(&problem, &param, folds) {
                Err(SvmError::InvalidParameter(msg)) => {
                    assert_eq!(msg, "number of folds must be >= 2")
                }
                other => panic!("unexpected result: {other:?}"),
            }
        }
    }

    #[test]
    fn test_too_many_folds_is_leave_one_out() {
        let problem = blobs();
        let param = Parameters::default();

        let clamped = cross_validate(&problem, &param, 1000).unwrap();
        let loo = cross_validate(&problem, &param, problem.len()).unwrap();
        assert_eq!(clamped, loo);
    }

    #[test]
    fn test_invalid_parameters_checked_first() {
        let param = Parameters {
            eps: 0.0,
            ..Parameters::default()
        };
        assert!(matches!(
            cross_validate(&blobs(), &param, 0),
            Err(SvmError::InvalidParameter(msg)) if msg == "eps <= 0"
        ));
    }

    #[test]
    fn test_single_sample_rejected() {
        let mut problem = Problem::default();
        problem.push(1.0, FeatureVector::from_dense(&[1.0]));
        assert!(matches!(
            cross_validate(&problem, &Parameters::default(), 2),
            Err(SvmError::InvalidDataset(_))
        ));
    }
}
