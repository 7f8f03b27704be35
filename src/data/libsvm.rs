//! LIBSVM format dataset implementation
//!
//! One sample per line:
//!
//! ```text
//! label index:value index:value ...
//! ```
//!
//! Indices are 1-based (index 0 only appears in precomputed-kernel rows).
//! Labels are kept exactly as written; classification treats every distinct
//! value as its own class.
//!
//! Example:
//! ```text
//! +1 1:0.5 3:1.2 7:0.8
//! 3 2:0.3 5:2.1
//! ```

use crate::core::{Dataset, FeatureVector, Problem, Result, SvmError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset read from a LIBSVM format file
#[derive(Debug, Clone)]
pub struct LibSvmDataset {
    problem: Problem,
    dimensions: usize,
}

impl LibSvmDataset {
    /// Load a dataset from a LIBSVM format file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut problem = Problem::default();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (label, features) = Self::parse_line(line).map_err(|e| {
                SvmError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;
            problem.push(label, features);
        }

        if problem.is_empty() {
            return Err(SvmError::EmptyDataset);
        }

        let dimensions = problem.num_features();
        Ok(Self {
            problem,
            dimensions,
        })
    }

    /// Parse `label index:value ...`
    fn parse_line(line: &str) -> std::result::Result<(f64, FeatureVector), String> {
        let mut parts = line.split_whitespace();
        let label_str = parts.next().ok_or("empty line")?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| format!("invalid label: {label_str}"))?;

        let mut indices = Vec::new();
        let mut values = Vec::new();
        for feature_str in parts {
            // trailing comments are allowed after the features
            if feature_str.starts_with('#') {
                break;
            }
            let (index, value) = feature_str
                .split_once(':')
                .ok_or_else(|| format!("invalid feature format: {feature_str}"))?;
            let index = index
                .parse::<usize>()
                .map_err(|_| format!("invalid feature index: {index}"))?;
            let value = value
                .parse::<f64>()
                .map_err(|_| format!("invalid feature value: {value}"))?;
            indices.push(index);
            values.push(value);
        }

        let features = FeatureVector::try_new(indices, values).map_err(|e| e.to_string())?;
        Ok((label, features))
    }

    /// The samples as a training problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn into_problem(self) -> Problem {
        self.problem
    }
}

impl Dataset for LibSvmDataset {
    fn len(&self) -> usize {
        self.problem.len()
    }

    fn dim(&self) -> usize {
        self.dimensions
    }

    fn label(&self, i: usize) -> f64 {
        self.problem.labels[i]
    }

    fn features(&self, i: usize) -> &FeatureVector {
        &self.problem.vectors[i]
    }

    fn to_problem(&self) -> Problem {
        self.problem.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_parse_line_basic() {
        let (label, features) = LibSvmDataset::parse_line("+1 1:0.5 3:1.2").unwrap();

        assert_eq!(label, 1.0);
        assert_eq!(features.indices, vec![1, 3]);
        assert_eq!(features.values, vec![0.5, 1.2]);
    }

    #[test]
    fn test_labels_kept_verbatim() {
        for (line, expected) in [("2 1:1.0", 2.0), ("-3 1:1.0", -3.0), ("0.25 1:1", 0.25)] {
            let (label, _) = LibSvmDataset::parse_line(line).unwrap();
            assert_eq!(label, expected);
        }
    }

    #[test]
    fn test_parse_line_invalid_format() {
        assert!(LibSvmDataset::parse_line("+1 1").is_err());
        assert!(LibSvmDataset::parse_line("+1 abc:1.0").is_err());
        assert!(LibSvmDataset::parse_line("+1 1:abc").is_err());
        assert!(LibSvmDataset::parse_line("x 1:1").is_err());
        // duplicate index
        assert!(LibSvmDataset::parse_line("+1 2:1 2:3").is_err());
    }

    #[test]
    fn test_unsorted_indices_are_sorted() {
        let (_, features) = LibSvmDataset::parse_line("1 5:2.1 2:0.3").unwrap();
        assert_eq!(features.indices, vec![2, 5]);
        assert_eq!(features.values, vec![0.3, 2.1]);
    }

    #[test]
    fn test_from_reader_basic() {
        let dataset = LibSvmDataset::from_reader(Cursor::new("+1 1:0.5 3:1.2\n-1 2:0.3 5:2.1\n")).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
        assert_eq!(dataset.label(0), 1.0);
        assert_eq!(dataset.features(1).indices, vec![2, 5]);
    }

    #[test]
    fn test_label_only_line_is_empty_vector() {
        let dataset = LibSvmDataset::from_reader(Cursor::new("1\n2 1:1\n")).unwrap();
        assert!(dataset.features(0).is_empty());
    }

    #[test]
    fn test_from_reader_empty_lines_and_comments() {
        let data = "# Comment line\n+1 1:0.5\n\n# Another comment\n-1 2:0.3 # trailing\n";
        let dataset = LibSvmDataset::from_reader(Cursor::new(data)).unwrap();

        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.labels(), vec![1.0, -1.0]);
    }

    #[test]
    fn test_from_reader_empty_dataset() {
        let result = LibSvmDataset::from_reader(Cursor::new("# Only comments\n\n"));
        assert!(matches!(result, Err(SvmError::EmptyDataset)));
    }

    #[test]
    fn test_error_names_line() {
        let err = LibSvmDataset::from_reader(Cursor::new("1 1:1\n1 1:1\n1 oops\n")).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_precomputed_rows() {
        let dataset = LibSvmDataset::from_reader(Cursor::new("1 0:1 1:4 2:1\n-1 0:2 1:1 2:9\n")).unwrap();
        assert_eq!(dataset.features(1).get(0), 2.0);
    }

    #[test]
    fn test_to_problem() {
        let dataset = LibSvmDataset::from_reader(Cursor::new("3 1:1\n7 2:1\n")).unwrap();
        let problem = dataset.to_problem();

        assert_eq!(&problem, dataset.problem());
        assert_eq!(problem.labels, vec![3.0, 7.0]);
    }

    #[test]
    fn test_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        writeln!(temp_file, "+1 1:0.5 3:1.2").expect("Failed to write");
        writeln!(temp_file, "-1 2:0.3 5:2.1").expect("Failed to write");
        temp_file.flush().expect("Failed to flush");

        let dataset = LibSvmDataset::from_file(temp_file.path()).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.dim(), 5);
    }

    #[test]
    fn test_from_file_io_error() {
        let result = LibSvmDataset::from_file("/non/existent/file.libsvm");
        assert!(matches!(result, Err(SvmError::Io(_))));
    }
}
