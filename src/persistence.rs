//! Model serialization and persistence
//!
//! Models are stored in the LIBSVM text format: a header of `key value...`
//! lines, an `SV` marker, then one line per support vector holding its
//! coefficients followed by `index:value` pairs. Doubles are written in
//! shortest round-trip form, so a loaded model predicts bit-identically to
//! the saved one.
//!
//! Loading never returns a partial model: any structural inconsistency is
//! a [`SvmError::ModelFormat`] error.
//!
//! JSON is used for [`ModelSummary`] and [`TrainingReport`], which describe
//! a model for tooling but cannot be loaded back as one.

use crate::core::{
    FeatureVector, KernelType, Parameters, Result, SvmError, SvmType,
};
use crate::model::Model;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Save a model to `path`
pub fn save_model<P: AsRef<Path>>(path: P, model: &Model) -> Result<()> {
    model.save(path)
}

/// Load a model from `path`
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model> {
    Model::load(path)
}

fn join<T: fmt::Display>(values: &[T]) -> String {
    values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Shortest round-trip text of a double, in exponent form for extreme magnitudes
fn format_double(v: f64) -> String {
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-5..1e16).contains(&magnitude) {
        format!("{v:e}")
    } else {
        v.to_string()
    }
}

fn join_doubles(values: &[f64]) -> String {
    values
        .iter()
        .map(|&v| format_double(v))
        .collect::<Vec<_>>()
        .join(" ")
}

impl Model {
    /// Save to a file, creating or truncating it
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Write the text representation
    pub fn write_to<W: Write>(&self, mut w: W) -> Result<()> {
        let param = &self.param;
        let kernel_type = param.kernel_type;

        writeln!(w, "svm_type {}", param.svm_type)?;
        writeln!(w, "kernel_type {kernel_type}")?;
        if kernel_type == KernelType::Polynomial {
            writeln!(w, "degree {}", param.degree)?;
        }
        if kernel_type.uses_gamma() {
            writeln!(w, "gamma {}", format_double(param.gamma))?;
        }
        if kernel_type.uses_coef0() {
            writeln!(w, "coef0 {}", format_double(param.coef0))?;
        }

        writeln!(w, "nr_class {}", self.nr_class)?;
        writeln!(w, "total_sv {}", self.nr_sv())?;
        writeln!(w, "rho {}", join_doubles(&self.rho))?;

        if !self.labels.is_empty() {
            writeln!(w, "label {}", join_doubles(&self.labels))?;
        }
        if !self.prob_a.is_empty() {
            writeln!(w, "probA {}", join_doubles(&self.prob_a))?;
        }
        if !self.prob_b.is_empty() {
            writeln!(w, "probB {}", join_doubles(&self.prob_b))?;
        }
        if !self.prob_density_marks.is_empty() {
            writeln!(w, "prob_density_marks {}", join_doubles(&self.prob_density_marks))?;
        }
        if !self.n_sv.is_empty() {
            writeln!(w, "nr_sv {}", join(&self.n_sv))?;
        }

        writeln!(w, "SV")?;
        for (i, sv) in self.support_vectors.iter().enumerate() {
            let mut fields: Vec<String> =
                self.sv_coef.iter().map(|row| format_double(row[i])).collect();
            if kernel_type == KernelType::Precomputed {
                // only the serial number is needed to look kernel values up
                fields.push(format!("0:{}", format_double(sv.get(0))));
            } else {
                fields.extend(
                    sv.iter()
                        .map(|(index, value)| format!("{index}:{}", format_double(value))),
                );
            }
            writeln!(w, "{}", fields.join(" "))?;
        }
        Ok(())
    }

    /// Load from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Model> {
        let file = File::open(path)?;
        Self::read_from(BufReader::new(file))
    }

    /// Parse the text representation
    pub fn read_from<R: BufRead>(reader: R) -> Result<Model> {
        let mut lines = reader.lines().enumerate();
        let mut header = Header::default();
        let mut saw_any = false;

        loop {
            let (n, line) = match lines.next() {
                Some((n, line)) => (n + 1, line?),
                None if saw_any => return Err(format_error("missing SV section")),
                None => return Err(format_error("empty model file")),
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            saw_any = true;
            if line == "SV" {
                break;
            }
            header.parse_line(n, line)?;
        }

        let layout = header.finish()?;
        let ncoef = layout.nr_class - 1;
        // total_sv is only trusted once that many lines have been read
        let mut support_vectors = Vec::new();
        let mut sv_coef = vec![Vec::new(); ncoef];

        for _ in 0..layout.total_sv {
            let (n, line) = match lines.next() {
                Some((n, line)) => (n + 1, line?),
                None => {
                    return Err(format_error(format!(
                        "expected {} support vectors, found {}",
                        layout.total_sv,
                        support_vectors.len()
                    )))
                }
            };
            let (coefs, sv) = parse_sv_line(n, &line, ncoef)?;
            for (row, c) in sv_coef.iter_mut().zip(coefs) {
                row.push(c);
            }
            support_vectors.push(sv);
        }

        for (n, line) in lines {
            if !line?.trim().is_empty() {
                return Err(format_error(format!(
                    "line {}: unexpected data after the support vectors",
                    n + 1
                )));
            }
        }

        let param = Parameters {
            probability: layout.has_probability(),
            ..layout.param
        };
        Ok(Model {
            param,
            nr_class: layout.nr_class,
            labels: layout.labels,
            n_sv: layout.n_sv,
            support_vectors,
            sv_coef,
            rho: layout.rho,
            prob_a: layout.prob_a,
            prob_b: layout.prob_b,
            prob_density_marks: layout.prob_density_marks,
            sv_indices: Vec::new(),
        })
    }
}

fn format_error(msg: impl Into<String>) -> SvmError {
    SvmError::ModelFormat(msg.into())
}

fn parse_value<T: std::str::FromStr>(n: usize, key: &str, token: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| format_error(format!("line {n}: invalid value '{token}' for {key}")))
}

fn parse_list<T: std::str::FromStr>(n: usize, key: &str, tokens: &[&str]) -> Result<Vec<T>> {
    tokens.iter().map(|t| parse_value(n, key, t)).collect()
}

fn parse_single<T: std::str::FromStr>(n: usize, key: &str, tokens: &[&str]) -> Result<T> {
    match tokens {
        [token] => parse_value(n, key, token),
        _ => Err(format_error(format!("line {n}: {key} takes exactly one value"))),
    }
}

fn parse_sv_line(n: usize, line: &str, ncoef: usize) -> Result<(Vec<f64>, FeatureVector)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < ncoef {
        return Err(format_error(format!(
            "line {n}: expected {ncoef} coefficients"
        )));
    }

    let coefs = parse_list(n, "sv_coef", &tokens[..ncoef])?;
    let mut indices = Vec::with_capacity(tokens.len() - ncoef);
    let mut values = Vec::with_capacity(tokens.len() - ncoef);
    for token in &tokens[ncoef..] {
        let (index, value) = token
            .split_once(':')
            .ok_or_else(|| format_error(format!("line {n}: expected index:value, got '{token}'")))?;
        indices.push(parse_value(n, "feature index", index)?);
        values.push(parse_value(n, "feature value", value)?);
    }

    let sv = FeatureVector::try_new(indices, values)
        .map_err(|e| format_error(format!("line {n}: {e}")))?;
    Ok((coefs, sv))
}

/// Header fields as read, before consistency checks
#[derive(Default)]
struct Header {
    svm_type: Option<SvmType>,
    kernel_type: Option<KernelType>,
    degree: Option<i32>,
    gamma: Option<f64>,
    coef0: Option<f64>,
    nr_class: Option<usize>,
    total_sv: Option<usize>,
    rho: Option<Vec<f64>>,
    labels: Option<Vec<f64>>,
    prob_a: Option<Vec<f64>>,
    prob_b: Option<Vec<f64>>,
    prob_density_marks: Option<Vec<f64>>,
    n_sv: Option<Vec<usize>>,
}

/// Checked header
struct Layout {
    param: Parameters,
    nr_class: usize,
    total_sv: usize,
    rho: Vec<f64>,
    labels: Vec<f64>,
    prob_a: Vec<f64>,
    prob_b: Vec<f64>,
    prob_density_marks: Vec<f64>,
    n_sv: Vec<usize>,
}

impl Layout {
    fn has_probability(&self) -> bool {
        !self.prob_a.is_empty() || !self.prob_density_marks.is_empty()
    }
}

impl Header {
    fn parse_line(&mut self, n: usize, line: &str) -> Result<()> {
        let mut tokens = line.split_whitespace();
        let key = tokens.next().unwrap_or_default();
        let values: Vec<&str> = tokens.collect();

        match key {
            "svm_type" => {
                let name: String = parse_single(n, key, &values)?;
                self.svm_type = Some(
                    name.parse()
                        .map_err(|_| format_error(format!("line {n}: unknown svm type '{name}'")))?,
                );
            }
            "kernel_type" => {
                let name: String = parse_single(n, key, &values)?;
                self.kernel_type = Some(name.parse().map_err(|_| {
                    format_error(format!("line {n}: unknown kernel type '{name}'"))
                })?);
            }
            "degree" => self.degree = Some(parse_single(n, key, &values)?),
            "gamma" => self.gamma = Some(parse_single(n, key, &values)?),
            "coef0" => self.coef0 = Some(parse_single(n, key, &values)?),
            "nr_class" => self.nr_class = Some(parse_single(n, key, &values)?),
            "total_sv" => self.total_sv = Some(parse_single(n, key, &values)?),
            "rho" => self.rho = Some(parse_list(n, key, &values)?),
            "label" => self.labels = Some(parse_list(n, key, &values)?),
            "probA" => self.prob_a = Some(parse_list(n, key, &values)?),
            "probB" => self.prob_b = Some(parse_list(n, key, &values)?),
            "prob_density_marks" => self.prob_density_marks = Some(parse_list(n, key, &values)?),
            "nr_sv" => self.n_sv = Some(parse_list(n, key, &values)?),
            other => {
                return Err(format_error(format!(
                    "line {n}: unknown header field '{other}'"
                )))
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Layout> {
        let svm_type = self.svm_type.ok_or_else(|| format_error("missing svm_type"))?;
        let kernel_type = self
            .kernel_type
            .ok_or_else(|| format_error("missing kernel_type"))?;
        let nr_class = self.nr_class.ok_or_else(|| format_error("missing nr_class"))?;
        let total_sv = self.total_sv.ok_or_else(|| format_error("missing total_sv"))?;
        let rho = self.rho.ok_or_else(|| format_error("missing rho"))?;

        let mut param = Parameters {
            svm_type,
            kernel_type,
            ..Parameters::default()
        };
        if kernel_type == KernelType::Polynomial {
            param.degree = self.degree.ok_or_else(|| format_error("missing degree"))?;
        }
        if kernel_type.uses_gamma() {
            param.gamma = self.gamma.ok_or_else(|| format_error("missing gamma"))?;
        }
        if kernel_type.uses_coef0() {
            param.coef0 = self.coef0.ok_or_else(|| format_error("missing coef0"))?;
        }

        let labels = self.labels.unwrap_or_default();
        let n_sv = self.n_sv.unwrap_or_default();
        let prob_a = self.prob_a.unwrap_or_default();
        let prob_b = self.prob_b.unwrap_or_default();
        let prob_density_marks = self.prob_density_marks.unwrap_or_default();

        let check = |ok: bool, msg: &str| if ok { Ok(()) } else { Err(format_error(msg)) };

        if svm_type.is_classification() {
            check(nr_class >= 1, "nr_class must be at least 1")?;
            check(labels.len() == nr_class, "label count does not match nr_class")?;
            check(n_sv.len() == nr_class, "nr_sv count does not match nr_class")?;
            let n_pairs = nr_class
                .checked_mul(nr_class - 1)
                .map(|n| n / 2)
                .ok_or_else(|| format_error("nr_class is too large"))?;
            check(rho.len() == n_pairs, "rho count does not match nr_class")?;
            let sv_sum = n_sv
                .iter()
                .try_fold(0usize, |acc, &n| acc.checked_add(n))
                .ok_or_else(|| format_error("nr_sv overflows"))?;
            check(sv_sum == total_sv, "nr_sv does not add up to total_sv")?;
            check(
                prob_a.len() == prob_b.len(),
                "probA and probB have different lengths",
            )?;
            check(
                prob_a.is_empty() || prob_a.len() == n_pairs,
                "probA count does not match nr_class",
            )?;
            check(
                prob_density_marks.is_empty(),
                "prob_density_marks only apply to one_class models",
            )?;
        } else {
            check(nr_class == 2, "nr_class must be 2 for one-class and regression models")?;
            check(rho.len() == 1, "expected a single rho")?;
            check(
                labels.is_empty() && n_sv.is_empty(),
                "label and nr_sv only apply to classification models",
            )?;
            check(prob_b.is_empty(), "probB only applies to classification models")?;
            if svm_type == SvmType::OneClass {
                check(prob_a.is_empty(), "probA does not apply to one_class models")?;
            } else {
                check(prob_a.len() <= 1, "expected a single probA")?;
                check(
                    prob_density_marks.is_empty(),
                    "prob_density_marks only apply to one_class models",
                )?;
            }
        }

        Ok(Layout {
            param,
            nr_class,
            total_sv,
            rho,
            labels,
            prob_a,
            prob_b,
            prob_density_marks,
            n_sv,
        })
    }
}

/// Machine-readable description of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    pub nr_class: usize,
    pub total_sv: usize,
    pub labels: Vec<f64>,
    pub n_sv: Vec<usize>,
    pub rho: Vec<f64>,
    pub probability: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub svr_probability: Option<f64>,
}

impl ModelSummary {
    pub fn from_model(model: &Model) -> Self {
        Self {
            svm_type: model.svm_type(),
            kernel_type: model.kernel_type(),
            nr_class: model.nr_class(),
            total_sv: model.nr_sv(),
            labels: model.labels().to_vec(),
            n_sv: model.n_sv().to_vec(),
            rho: model.rho().to_vec(),
            probability: model.check_probability_model(),
            svr_probability: model.svr_probability(),
        }
    }
}

impl fmt::Display for ModelSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== SVM Model Summary ===")?;
        writeln!(f, "SVM Type: {}", self.svm_type)?;
        writeln!(f, "Kernel Type: {}", self.kernel_type)?;
        writeln!(f, "Classes: {}", self.nr_class)?;
        writeln!(f, "Support Vectors: {}", self.total_sv)?;
        if !self.labels.is_empty() {
            writeln!(f, "Labels: {}", join(&self.labels))?;
            writeln!(f, "Support Vectors per Class: {}", join(&self.n_sv))?;
        }
        writeln!(f, "Rho: {}", join(&self.rho))?;
        write!(f, "Probability Estimates: {}", if self.probability { "yes" } else { "no" })?;
        if let Some(sigma) = self.svr_probability {
            write!(f, "\nLaplace Scale: {sigma}")?;
        }
        Ok(())
    }
}

/// Record of one training run, written next to the model by the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub library_version: String,
    pub created_at: String,
    pub data_file: String,
    pub model_file: String,
    pub num_samples: usize,
    pub num_features: usize,
    pub parameters: Parameters,
    pub model: ModelSummary,
    /// Accuracy (classification) or mean squared error (regression) on the training data
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub training_score: Option<f64>,
}

impl TrainingReport {
    pub fn new(
        data_file: impl Into<String>,
        model_file: impl Into<String>,
        num_samples: usize,
        num_features: usize,
        model: &Model,
    ) -> Self {
        Self {
            library_version: env!("CARGO_PKG_VERSION").to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            data_file: data_file.into(),
            model_file: model_file.into(),
            num_samples,
            num_features,
            parameters: model.param().clone(),
            model: ModelSummary::from_model(model),
            training_score: None,
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Problem;
    use crate::train::train;
    use tempfile::NamedTempFile;

    fn xor_problem() -> Problem {
        let mut problem = Problem::default();
        for (k, &(a, b, y)) in [
            (1.0, 1.0, 1.0),
            (-1.0, -1.0, 1.0),
            (1.0, -1.0, -1.0),
            (-1.0, 1.0, -1.0),
        ]
        .iter()
        .enumerate()
        {
            let jitter = k as f64 * 0.01;
            problem.push(y, FeatureVector::from_dense(&[a + jitter, b - jitter]));
            problem.push(y, FeatureVector::from_dense(&[a * 0.8, b * 1.1]));
        }
        problem
    }

    fn to_text(model: &Model) -> String {
        let mut buf = Vec::new();
        model.write_to(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let model = train(&xor_problem(), &Parameters::default()).unwrap();
        let text = to_text(&model);
        let keys: Vec<&str> = text
            .lines()
            .map(|l| l.split_whitespace().next().unwrap())
            .take_while(|&k| k != "SV")
            .collect();

        assert_eq!(
            keys,
            vec!["svm_type", "kernel_type", "gamma", "nr_class", "total_sv", "rho", "label", "nr_sv"]
        );
        assert!(text.starts_with("svm_type c_svc\nkernel_type rbf\ngamma 0.5\n"));
    }

    #[test]
    fn test_round_trip_is_bit_identical() {
        let problem = xor_problem();
        let model = train(&problem, &Parameters::default()).unwrap();

        let loaded = Model::read_from(to_text(&model).as_bytes()).unwrap();
        assert_eq!(loaded.sv_coef(), model.sv_coef());
        assert_eq!(loaded.rho(), model.rho());
        assert_eq!(loaded.support_vectors(), model.support_vectors());
        for x in &problem.vectors {
            assert_eq!(loaded.predict_values(x), model.predict_values(x));
        }
        assert_eq!(to_text(&loaded), to_text(&model));
    }

    #[test]
    fn test_extreme_doubles_use_exponent_form() {
        assert_eq!(format_double(1e-300), "1e-300");
        assert_eq!(format_double(-2.5e20), "-2.5e20");
        assert_eq!(format_double(0.25), "0.25");
        assert_eq!(format_double(1.0), "1");
        assert_eq!(format_double(0.0), "0");
        for v in [1e-300, 5e-324, 1.7976931348623157e308, -3.3e-7, 123456.789] {
            assert_eq!(format_double(v).parse::<f64>().unwrap().to_bits(), v.to_bits());
        }
    }

    #[test]
    fn test_save_and_load_file() -> Result<()> {
        let model = train(&xor_problem(), &Parameters::default())?;
        let file = NamedTempFile::new()?;

        save_model(file.path(), &model)?;
        let loaded = load_model(file.path())?;
        assert_eq!(loaded.nr_sv(), model.nr_sv());
        assert!(loaded.sv_indices().is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_and_missing_files_fail() {
        assert!(matches!(
            Model::read_from("".as_bytes()),
            Err(SvmError::ModelFormat(_))
        ));
        assert!(matches!(
            load_model("/nonexistent/dir/model.txt"),
            Err(SvmError::Io(_))
        ));
    }

    #[test]
    fn test_save_into_missing_directory_fails() {
        let model = train(&xor_problem(), &Parameters::default()).unwrap();
        assert!(save_model("/nonexistent/dir/model.txt", &model).is_err());
    }

    #[test]
    fn test_inconsistent_files_rejected() {
        let cases = [
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 0\nrho 0\nlabel 1 -1\nnr_sv 0 0\n",
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 1\nrho 0\nlabel 1 -1\nnr_sv 1 1\nSV\n1 1:1\n",
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 1\nrho 0 1\nlabel 1 -1\nnr_sv 1 0\nSV\n1 1:1\n",
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 2\nrho 0\nlabel 1 -1\nnr_sv 1 1\nSV\n1 1:1\n",
            "svm_type c_svc\nkernel_type rbf\nnr_class 2\ntotal_sv 0\nrho 0\nlabel 1 -1\nnr_sv 0 0\nSV\n",
            "svm_type c_svc\nkernel_type linear\nbogus 1\nnr_class 2\ntotal_sv 0\nrho 0\nlabel 1 -1\nnr_sv 0 0\nSV\n",
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 1\nrho 0\nlabel 1 -1\nnr_sv 1 0\nSV\n1 1:x\n",
            "svm_type c_svc\nkernel_type linear\nnr_class 2\ntotal_sv 1\nrho 0\nlabel 1 -1\nnr_sv 1 0\nSV\n1 1:1\n2 1:1\n",
            "svm_type bogus\nkernel_type linear\n",
        ];
        for text in cases {
            assert!(
                matches!(Model::read_from(text.as_bytes()), Err(SvmError::ModelFormat(_))),
                "accepted:\n{text}"
            );
        }
    }

    #[test]
    fn test_trailing_blank_lines_accepted() {
        let text = "svm_type epsilon_svr\nkernel_type linear\nnr_class 2\ntotal_sv 1\nrho 0.5\nSV\n2 1:1.5\n\n  \n";
        let model = Model::read_from(text.as_bytes()).unwrap();

        assert_eq!(model.svm_type(), SvmType::EpsilonSvr);
        assert_eq!(model.predict(&FeatureVector::from_dense(&[2.0])), 5.5);
    }

    #[test]
    fn test_summary_json() {
        let model = train(&xor_problem(), &Parameters::default()).unwrap();
        let summary = ModelSummary::from_model(&model);

        let json = serde_json::to_string(&summary).unwrap();
        let back: ModelSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
        assert!(json.contains("\"svm_type\":\"c_svc\""));
        assert!(summary.to_string().contains("Support Vectors: "));
    }

    #[test]
    fn test_training_report_file() -> Result<()> {
        let model = train(&xor_problem(), &Parameters::default())?;
        let report = TrainingReport::new("train.txt", "model.txt", 8, 2, &model);
        let file = NamedTempFile::new()?;

        report.save_to_file(file.path())?;
        let loaded = TrainingReport::load_from_file(file.path())?;
        assert_eq!(loaded.num_samples, 8);
        assert_eq!(loaded.model, report.model);
        assert!(chrono::DateTime::parse_from_rfc3339(&loaded.created_at).is_ok());
        Ok(())
    }
}
