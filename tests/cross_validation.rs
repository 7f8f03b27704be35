//! Cross-validation tests

mod common;

use svm_engine::cross_validation::assign_folds;
use svm_engine::{cross_validate, EvaluationMetrics, KernelType, Parameters, SvmError, SvmType};

#[test]
fn test_cross_validation_is_reproducible() {
    let problem = common::xor(10, 0.1);
    let param = Parameters {
        kernel_type: KernelType::Rbf,
        gamma: 1.0,
        c: 4.0,
        ..Parameters::default()
    };

    let first = cross_validate(&problem, &param, 5).unwrap();
    let second = cross_validate(&problem, &param, 5).unwrap();
    let first_bits: Vec<u64> = first.iter().map(|v| v.to_bits()).collect();
    let second_bits: Vec<u64> = second.iter().map(|v| v.to_bits()).collect();
    assert_eq!(first_bits, second_bits);
    assert_eq!(first.len(), problem.len());
}

#[test]
fn test_cross_validation_accuracy_on_separable_data() {
    let problem = common::separable_2d(30);
    let predicted = cross_validate(&problem, &Parameters::default(), 10).unwrap();

    let metrics = EvaluationMetrics::from_predictions(&predicted, &problem.labels);
    assert!(metrics.accuracy() > 0.9);
    // held-out predictions are labels from the problem
    assert!(predicted.iter().all(|&p| p == 1.0 || p == -1.0));
}

#[test]
fn test_leave_one_out() {
    let problem = common::separable_2d(6);
    let param = Parameters {
        kernel_type: KernelType::Linear,
        ..Parameters::default()
    };

    let loo = cross_validate(&problem, &param, problem.len()).unwrap();
    let clamped = cross_validate(&problem, &param, problem.len() + 10).unwrap();
    assert_eq!(loo, clamped);
}

#[test]
fn test_regression_cross_validation() {
    let problem = common::linear_regression(60, 0.1);
    let param = Parameters {
        svm_type: SvmType::EpsilonSvr,
        kernel_type: KernelType::Linear,
        c: 10.0,
        ..Parameters::default()
    };

    let predicted = cross_validate(&problem, &param, 5).unwrap();
    let metrics = EvaluationMetrics::from_predictions(&predicted, &problem.labels);
    assert!(metrics.mse < 1.0, "mse {}", metrics.mse);
    assert!(metrics.squared_correlation > 0.8);
}

#[test]
fn test_probability_cross_validation_returns_labels() {
    let problem = common::blobs(&[[3.0, 0.0], [-3.0, 0.0], [0.0, 3.0]], &[4.0, 5.0, 6.0], 12, 0.5);
    let param = Parameters {
        probability: true,
        ..Parameters::default()
    };

    let predicted = cross_validate(&problem, &param, 3).unwrap();
    assert!(predicted.iter().all(|p| [4.0, 5.0, 6.0].contains(p)));
}

#[test]
fn test_fold_assignment_is_stratified() {
    let problem = common::blobs(&[[0.0, 0.0], [1.0, 1.0]], &[1.0, 2.0], 10, 0.1);
    let folds = assign_folds(&problem.labels, 5, true);

    for fold in 0..5 {
        for label in [1.0, 2.0] {
            let count = folds
                .iter()
                .zip(&problem.labels)
                .filter(|(&f, &y)| f == fold && y == label)
                .count();
            assert_eq!(count, 2);
        }
    }
}

#[test]
fn test_invalid_fold_counts() {
    let problem = common::separable_2d(5);
    for folds in [0, 1] {
        assert!(matches!(
            cross_validate(&problem, &Parameters::default(), folds),
            Err(SvmError::InvalidParameter(_))
        ));
    }
}

#[test]
fn test_invalid_parameters_are_reported() {
    let problem = common::separable_2d(5);
    let param = Parameters {
        svm_type: SvmType::NuSvc,
        nu: 1.5,
        ..Parameters::default()
    };
    assert!(matches!(
        cross_validate(&problem, &param, 3),
        Err(SvmError::InvalidParameter(_))
    ));
}
