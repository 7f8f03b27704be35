//! CSV format dataset implementation
//!
//! Supports loading datasets from CSV files where:
//! - The last column is the label
//! - All other columns are features (column `k` becomes feature index `k + 1`)
//! - First row can be headers (automatically detected)
//!
//! Zero-valued features are omitted from the sparse vectors.

use crate::core::{Dataset, FeatureVector, Problem, Result, SvmError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Dataset read from a CSV file
#[derive(Debug, Clone)]
pub struct CsvDataset {
    problem: Problem,
    dimensions: usize,
}

impl CsvDataset {
    /// Load a dataset from a CSV file
    ///
    /// The last column is assumed to be the label.
    /// Headers are automatically detected if present.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Load a dataset from a reader, detecting a header row
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        Self::from_reader_with_options(reader, true)
    }

    /// Load a dataset from a reader with explicit header option
    pub fn from_reader_with_options<R: BufRead>(reader: R, auto_detect_header: bool) -> Result<Self> {
        let mut problem = Problem::default();
        let mut columns: Option<usize> = None;
        let mut first_data_line = true;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if first_data_line {
                first_data_line = false;
                if auto_detect_header && Self::is_header_line(line) {
                    continue;
                }
            }

            let (label, features, width) = Self::parse_data_line(line).map_err(|e| {
                SvmError::ParseError(format!("Error parsing line {}: {}", line_num + 1, e))
            })?;

            match columns {
                Some(expected) if expected != width => {
                    return Err(SvmError::ParseError(format!(
                        "Error parsing line {}: expected {} columns, found {}",
                        line_num + 1,
                        expected,
                        width
                    )));
                }
                Some(_) => {}
                None => columns = Some(width),
            }

            problem.push(label, features);
        }

        if problem.is_empty() {
            return Err(SvmError::EmptyDataset);
        }

        // every row has the same width, so the feature count is the column count minus the label
        let dimensions = columns.map_or(0, |c| c - 1);
        Ok(Self {
            problem,
            dimensions,
        })
    }

    /// Check if a line appears to be a header
    fn is_header_line(line: &str) -> bool {
        let fields: Vec<&str> = line.split(',').collect();

        if fields.len() < 2 {
            return false;
        }

        let non_numeric_count = fields
            .iter()
            .take(fields.len() - 1)
            .filter(|field| field.trim().parse::<f64>().is_err())
            .count();

        non_numeric_count > fields.len() / 2
    }

    /// Parse a data row into its label, sparse features and column count
    fn parse_data_line(line: &str) -> std::result::Result<(f64, FeatureVector, usize), String> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();

        if fields.len() < 2 {
            return Err(format!("line has too few fields: {line}"));
        }

        let (label_str, feature_fields) = fields.split_last().ok_or("empty line")?;
        let label = label_str
            .parse::<f64>()
            .map_err(|_| format!("invalid label: {label_str}"))?;

        let mut dense = Vec::with_capacity(feature_fields.len());
        for (col, field) in feature_fields.iter().enumerate() {
            let value = field
                .parse::<f64>()
                .map_err(|_| format!("invalid feature value at column {}: {}", col + 1, field))?;
            dense.push(value);
        }

        Ok((label, FeatureVector::from_dense(&dense), fields.len()))
    }

    /// The samples as a training problem
    pub fn problem(&self) -> &Problem {
        &self.problem
    }

    pub fn into_problem(self) -> Problem {
        self.problem
    }
}

impl Dataset for CsvDataset {
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
