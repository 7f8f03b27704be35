//! Dataset compatibility and format validation tests
//!
//! Tests for ensuring different data formats work correctly across the pipeline

use std::io::Write;
use svm_engine::{api::Svm, evaluate, CsvDataset, Dataset, KernelType, LibSvmDataset, SvmError};
use tempfile::NamedTempFile;

fn temp_file_with(data: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    write!(temp_file, "{}", data).expect("Failed to write");
    temp_file.flush().expect("Failed to flush");
    temp_file
}

/// Test LibSVM format variations
#[test]
fn test_libsvm_format_variations() {
    let test_cases = vec![
        ("+1 1:0.5 3:1.2 7:0.8\n-1 2:0.3 5:2.1\n", "basic format"),
        (
            "# This is a comment\n+1 1:0.5 3:1.2\n\n# Another comment\n-1 2:0.3\n",
            "with comments",
        ),
        ("1 1:0.5 2:1.0\n-1 1:-0.5 2:-1.0\n", "explicit +/-1 labels"),
        (
            "+1 1:1.0 10:2.0 100:3.0\n-1 5:1.5 50:2.5 500:3.5\n",
            "sparse indices",
        ),
        ("+1 1:2.0\n-1 1:-2.0\n+1 1:1.8\n-1 1:-1.8\n", "single feature"),
        ("+1 3:0.3 1:0.1 2:0.2\n-1 2:-0.2 1:-0.1\n", "unsorted indices"),
        ("1 1:1 \r\n-1 1:-1\t\r\n", "trailing whitespace"),
    ];

    for (data, description) in test_cases {
        let temp_file = temp_file_with(data);
        let dataset = LibSvmDataset::from_file(temp_file.path())
            .unwrap_or_else(|e| panic!("Failed to load LibSVM dataset ({description}): {e}"));

        assert!(dataset.len() >= 2, "{description}");
        assert!(dataset.dim() > 0, "{description}");

        let model = Svm::new()
            .train(&dataset)
            .unwrap_or_else(|e| panic!("Training should succeed for {description}: {e}"));
        let label = model.predict(dataset.features(0));
        assert!(label == 1.0 || label == -1.0, "{description}");
    }
}

/// Labels are used as given, so any set of values forms the classes
#[test]
fn test_multiclass_labels_are_not_coerced() {
    let temp_file = temp_file_with("3 1:1\n7 1:5\n3 1:1.2\n0 1:-4\n7 1:5.3\n0 1:-4.1\n");
    let dataset = LibSvmDataset::from_file(temp_file.path()).unwrap();
    assert_eq!(dataset.labels(), vec![3.0, 7.0, 3.0, 0.0, 7.0, 0.0]);

    let model = Svm::new()
        .with_kernel_type(KernelType::Linear)
        .with_c(10.0)
        .train(&dataset)
        .unwrap();
    assert_eq!(model.labels(), &[3.0, 7.0, 0.0]);
    assert_eq!(evaluate(&model, &dataset).accuracy(), 1.0);
}

/// Test CSV format variations
#[test]
fn test_csv_format_variations() {
    let test_cases = vec![
        (
            "feature1,feature2,label\n1.0,2.0,1\n-1.0,-2.0,-1\n2.0,1.0,1\n",
            "with header",
        ),
        ("1.0,2.0,1\n-1.0,-2.0,-1\n2.0,1.0,1\n", "without header"),
        (
            "1.0,2.0,3.0,1\n-1.0,-2.0,-3.0,-1\n0.5,1.5,2.5,1\n",
            "multiple features",
        ),
        ("1.0,2.0,1.0\n-1.0,-2.0,-1.0\n", "floating point labels"),
        (
            "1.5,-0.5,1\n-1.5,0.5,-1\n0.8,-1.2,1\n-0.8,1.2,-1\n",
            "mixed signs",
        ),
        (" 1.0 , 2.0 , 1\n-1.0, -2.0 ,-1\n", "padded fields"),
    ];

    for (data, description) in test_cases {
        let temp_file = temp_file_with(data);
        let dataset = CsvDataset::from_file(temp_file.path())
            .unwrap_or_else(|e| panic!("Failed to load CSV dataset ({description}): {e}"));

        assert!(dataset.len() >= 2, "{description}");
        assert!(dataset.dim() > 0, "{description}");
        assert!(Svm::new().train(&dataset).is_ok(), "{description}");
    }
}

/// The same samples in both formats give the same problem
#[test]
fn test_cross_format_compatibility() {
    let libsvm_file =
        temp_file_with("+1 1:2.0 2:1.0\n+1 1:1.8 2:1.1\n-1 1:-2.0 2:-1.0\n-1 1:-1.8 3:-1.1\n");
    let csv_file = temp_file_with(
        "feature1,feature2,feature3,label\n2.0,1.0,0,1\n1.8,1.1,0,1\n-2.0,-1.0,0,-1\n-1.8,0,-1.1,-1\n",
    );

    let libsvm_dataset = LibSvmDataset::from_file(libsvm_file.path()).unwrap();
    let csv_dataset = CsvDataset::from_file(csv_file.path()).unwrap();

    assert_eq!(libsvm_dataset.len(), csv_dataset.len());
    assert_eq!(libsvm_dataset.dim(), csv_dataset.dim());
    assert_eq!(libsvm_dataset.to_problem(), csv_dataset.to_problem());

    let svm = Svm::new();
    assert_eq!(
        svm.train(&libsvm_dataset).unwrap(),
        svm.train(&csv_dataset).unwrap()
    );
}

/// Test large dimension handling
#[test]
fn test_large_dimensions() {
    let mut data = String::new();
    for k in 0..10 {
        let sign = if k % 2 == 0 { 1 } else { -1 };
        data.push_str(&format!(
            "{sign} 1:{} 5000:{} 100000:{}\n",
            sign as f64 * 1.5,
            0.1 * k as f64,
            sign as f64
        ));
    }
    let temp_file = temp_file_with(&data);

    let dataset = LibSvmDataset::from_file(temp_file.path()).unwrap();
    assert_eq!(dataset.dim(), 100000);

    let model = Svm::new()
        .with_kernel_type(KernelType::Linear)
        .train(&dataset)
        .unwrap();
    assert_eq!(evaluate(&model, &dataset).accuracy(), 1.0);
}

/// Test malformed data handling
#[test]
fn test_malformed_data_handling() {
    let libsvm_cases = vec![
        ("+1 1:abc\n", "non-numeric value"),
        ("+1 x:1.0\n", "non-numeric index"),
        ("abc 1:1.0\n", "non-numeric label"),
        ("+1 1-1.0\n", "missing colon"),
        ("+1 1:1.0 1:2.0\n", "duplicate index"),
        ("+1 -3:1.0\n", "negative index"),
    ];
    for (data, description) in libsvm_cases {
        let temp_file = temp_file_with(data);
        assert!(
            matches!(
                LibSvmDataset::from_file(temp_file.path()),
                Err(SvmError::ParseError(_))
            ),
            "{description}"
        );
    }

    let empty = temp_file_with("# nothing here\n\n");
    assert!(matches!(
        LibSvmDataset::from_file(empty.path()),
        Err(SvmError::EmptyDataset)
    ));

    let ragged = temp_file_with("1,2,1\n1,2,3,1\n");
    assert!(CsvDataset::from_file(ragged.path()).is_err());
}
