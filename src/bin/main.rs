//! svm-engine Command Line Interface
//!
//! Train, cross-validate, apply and inspect SVM models on LIBSVM and CSV
//! data files.

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info, warn};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use svm_engine::{
    cross_validate, load_model, train, CsvDataset, EvaluationMetrics, KernelType, LibSvmDataset,
    Model, ModelSummary, Parameters, Problem, Result, SvmError, SvmType, TrainingReport,
};

#[derive(Parser)]
#[command(name = "svm-engine")]
#[command(about = "Support Vector Machine training and prediction")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a new SVM model
    Train(TrainArgs),
    /// Run k-fold cross-validation
    Cv(CvArgs),
    /// Make predictions using a trained model
    Predict(PredictArgs),
    /// Display model information
    Info(InfoArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
enum DataFormat {
    /// Pick by file extension
    Auto,
    Libsvm,
    Csv,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliSvmType {
    #[value(name = "c_svc", alias = "0")]
    CSvc,
    #[value(name = "nu_svc", alias = "1")]
    NuSvc,
    #[value(name = "one_class", alias = "2")]
    OneClass,
    #[value(name = "epsilon_svr", alias = "3")]
    EpsilonSvr,
    #[value(name = "nu_svr", alias = "4")]
    NuSvr,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CliKernelType {
    #[value(name = "linear", alias = "0")]
    Linear,
    #[value(name = "polynomial", alias = "1")]
    Polynomial,
    #[value(name = "rbf", alias = "2")]
    Rbf,
    #[value(name = "sigmoid", alias = "3")]
    Sigmoid,
    #[value(name = "precomputed", alias = "4")]
    Precomputed,
}

impl From<CliSvmType> for SvmType {
    fn from(cli_type: CliSvmType) -> Self {
        match cli_type {
            CliSvmType::CSvc => SvmType::CSvc,
            CliSvmType::NuSvc => SvmType::NuSvc,
            CliSvmType::OneClass => SvmType::OneClass,
            CliSvmType::EpsilonSvr => SvmType::EpsilonSvr,
            CliSvmType::NuSvr => SvmType::NuSvr,
        }
    }
}

impl From<CliKernelType> for KernelType {
    fn from(cli_type: CliKernelType) -> Self {
        match cli_type {
            CliKernelType::Linear => KernelType::Linear,
            CliKernelType::Polynomial => KernelType::Polynomial,
            CliKernelType::Rbf => KernelType::Rbf,
            CliKernelType::Sigmoid => KernelType::Sigmoid,
            CliKernelType::Precomputed => KernelType::Precomputed,
        }
    }
}

/// Data and parameter flags shared by `train` and `cv`
#[derive(Args)]
struct TrainingArgs {
    /// Training data file (LIBSVM or CSV format)
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(long, value_enum, default_value = "auto")]
    format: DataFormat,

    /// JSON parameter file; explicit flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// SVM type
    #[arg(short = 's', long = "svm-type", value_enum)]
    svm_type: Option<CliSvmType>,

    /// Kernel type
    #[arg(short = 't', long = "kernel", value_enum)]
    kernel_type: Option<CliKernelType>,

    /// Polynomial degree
    #[arg(short = 'd', long)]
    degree: Option<i32>,

    /// Kernel gamma (default 1/num_features)
    #[arg(short = 'g', long)]
    gamma: Option<f64>,

    /// Kernel coef0
    #[arg(short = 'r', long, allow_negative_numbers = true)]
    coef0: Option<f64>,

    /// Regularization parameter C
    #[arg(short = 'C', long = "cost")]
    c: Option<f64>,

    /// Nu for nu-SVC, one-class SVM and nu-SVR
    #[arg(short = 'n', long)]
    nu: Option<f64>,

    /// Epsilon-SVR tube width
    #[arg(short = 'p', long = "epsilon-loss")]
    p: Option<f64>,

    /// Kernel cache size in MB
    #[arg(short = 'm', long = "cache-size")]
    cache_size: Option<f64>,

    /// Stopping tolerance
    #[arg(short = 'e', long = "tolerance")]
    eps: Option<f64>,

    /// Disable the shrinking heuristics
    #[arg(long)]
    no_shrinking: bool,

    /// Train probability estimates
    #[arg(short = 'b', long)]
    probability: bool,

    /// Class weight as label:weight (repeatable)
    #[arg(short = 'w', long = "weight", value_parser = parse_weight, allow_hyphen_values = true)]
    weights: Vec<(f64, f64)>,
}

#[derive(Args)]
struct TrainArgs {
    #[command(flatten)]
    training: TrainingArgs,

    /// Output model file
    #[arg(short, long)]
    output: PathBuf,

    /// Write a JSON training report
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Args)]
struct CvArgs {
    #[command(flatten)]
    training: TrainingArgs,

    /// Number of folds
    #[arg(short = 'v', long, default_value = "5")]
    folds: usize,
}

#[derive(Args)]
struct PredictArgs {
    /// Trained model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input data file
    #[arg(long)]
    data: PathBuf,

    /// Data format
    #[arg(long, value_enum, default_value = "auto")]
    format: DataFormat,

    /// Output predictions file (prints to stdout if not specified)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output probability estimates
    #[arg(short = 'b', long)]
    probability: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Model file
    model: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();

    let log_level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    let result = match cli.command {
        Commands::Train(args) => train_command(args),
        Commands::Cv(args) => cv_command(args),
        Commands::Predict(args) => predict_command(args),
        Commands::Info(args) => info_command(args),
    };

    if let Err(e) = result {
        error!("Error: {e}");
        process::exit(1);
    }
}

fn parse_weight(s: &str) -> std::result::Result<(f64, f64), String> {
    let (label, weight) = s
        .split_once(':')
        .ok_or_else(|| format!("expected label:weight, got {s}"))?;
    let label = label
        .parse::<f64>()
        .map_err(|_| format!("invalid label: {label}"))?;
    let weight = weight
        .parse::<f64>()
        .map_err(|_| format!("invalid weight: {weight}"))?;
    Ok((label, weight))
}

fn detect_format(path: &Path) -> DataFormat {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => DataFormat::Csv,
        Some("libsvm") | Some("svm") | Some("txt") => DataFormat::Libsvm,
        Some(_) => {
            warn!("Unknown file extension, assuming LIBSVM format");
            DataFormat::Libsvm
        }
        None => DataFormat::Libsvm,
    }
}

fn load_problem(path: &Path, format: DataFormat) -> Result<Problem> {
    let format = if format == DataFormat::Auto {
        detect_format(path)
    } else {
        format
    };

    info!("Loading {path:?} as {format:?}");
    let problem = match format {
        DataFormat::Csv => CsvDataset::from_file(path)?.into_problem(),
        DataFormat::Libsvm | DataFormat::Auto => LibSvmDataset::from_file(path)?.into_problem(),
    };
    info!(
        "Loaded {} samples with {} features",
        problem.len(),
        problem.num_features()
    );
    Ok(problem)
}

/// Parameters from the config file, defaults and flags, in increasing precedence
fn build_parameters(args: &TrainingArgs, problem: &Problem) -> Result<Parameters> {
    let (mut param, config_has_gamma) = match &args.config {
        Some(path) => {
            let value: serde_json::Value = serde_json::from_reader(File::open(path)?)?;
            let has_gamma = value.get("gamma").is_some();
            (serde_json::from_value::<Parameters>(value)?, has_gamma)
        }
        None => (Parameters::default(), false),
    };

    if let Some(svm_type) = args.svm_type {
        param.svm_type = svm_type.into();
    }
    if let Some(kernel_type) = args.kernel_type {
        param.kernel_type = kernel_type.into();
    }
    if let Some(degree) = args.degree {
        param.degree = degree;
    }
    match args.gamma {
        Some(gamma) => param.gamma = gamma,
        None if !config_has_gamma && problem.num_features() > 0 => {
            param.gamma = 1.0 / problem.num_features() as f64;
        }
        None => {}
    }
    if let Some(coef0) = args.coef0 {
        param.coef0 = coef0;
    }
    if let Some(c) = args.c {
        param.c = c;
    }
    if let Some(nu) = args.nu {
        param.nu = nu;
    }
    if let Some(p) = args.p {
        param.p = p;
    }
    if let Some(cache_size) = args.cache_size {
        param.cache_size = cache_size;
    }
    if let Some(eps) = args.eps {
        param.eps = eps;
    }
    if args.no_shrinking {
        param.shrinking = false;
    }
    if args.probability {
        param.probability = true;
    }
    param.class_weights.extend(args.weights.iter().copied());

    Ok(param)
}

fn train_command(args: TrainArgs) -> Result<()> {
    let problem = load_problem(&args.training.data, args.training.format)?;
    let param = build_parameters(&args.training, &problem)?;
    info!(
        "Training {} with {} kernel (C={}, gamma={}, nu={})",
        param.svm_type, param.kernel_type, param.c, param.gamma, param.nu
    );

    let model = train(&problem, &param)?;
    info!(
        "Training completed: {} classes, {} support vectors",
        model.nr_class(),
        model.nr_sv()
    );

    model.save(&args.output)?;
    info!("Model saved to: {:?}", args.output);

    let score = training_score(&model, &problem);
    if let Some(score) = score {
        if param.svm_type.is_regression() {
            info!("Training mean squared error: {score}");
        } else {
            info!("Training accuracy: {:.2}%", score * 100.0);
        }
    }

    if let Some(report_path) = &args.report {
        let mut report = TrainingReport::new(
            args.training.data.display().to_string(),
            args.output.display().to_string(),
            problem.len(),
            problem.num_features(),
            &model,
        );
        report.training_score = score;
        report.save_to_file(report_path)?;
        info!("Report saved to: {report_path:?}");
    }

    Ok(())
}

/// Accuracy for classification, MSE for regression
fn training_score(model: &Model, problem: &Problem) -> Option<f64> {
    if model.svm_type() == SvmType::OneClass {
        return None;
    }
    let predicted: Vec<f64> = problem.vectors.iter().map(|x| model.predict(x)).collect();
    let metrics = EvaluationMetrics::from_predictions(&predicted, &problem.labels);
    if model.svm_type().is_regression() {
        Some(metrics.mse)
    } else {
        Some(metrics.accuracy())
    }
}

fn cv_command(args: CvArgs) -> Result<()> {
    let problem = load_problem(&args.training.data, args.training.format)?;
    let param = build_parameters(&args.training, &problem)?;
    info!("{}-fold cross validation", args.folds);

    let predicted = cross_validate(&problem, &param, args.folds)?;
    let metrics = EvaluationMetrics::from_predictions(&predicted, &problem.labels);

    if param.svm_type.is_regression() {
        println!("Cross Validation Mean squared error = {}", metrics.mse);
        println!(
            "Cross Validation Squared correlation coefficient = {}",
            metrics.squared_correlation
        );
    } else {
        println!("Cross Validation Accuracy = {}%", 100.0 * metrics.accuracy());
    }

    Ok(())
}

fn predict_command(args: PredictArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;
    let problem = load_problem(&args.data, args.format)?;

    if args.probability && !model.check_probability_model() {
        return Err(SvmError::InvalidParameter(
            "model does not support probability estimates".to_string(),
        ));
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let svm_type = model.svm_type();
    let with_distribution = args.probability && !svm_type.is_regression();

    if args.probability {
        if let Some(sigma) = model.svr_probability() {
            info!(
                "Prob. model for test data: target value = predicted value + z, \
                 z: Laplace distribution e^(-|z|/sigma)/(2sigma), sigma={sigma}"
            );
        }
    }

    if with_distribution {
        let labels: Vec<String> = if svm_type == SvmType::OneClass {
            vec!["1".to_string(), "-1".to_string()]
        } else {
            model.labels().iter().map(|l| l.to_string()).collect()
        };
        writeln!(writer, "labels {}", labels.join(" "))?;
    }

    let mut predicted = Vec::with_capacity(problem.len());
    for x in &problem.vectors {
        if with_distribution {
            let (label, prob) = model.predict_probability(x);
            let prob: Vec<String> = prob.iter().map(|p| format!("{p:.6}")).collect();
            writeln!(writer, "{label} {}", prob.join(" "))?;
            predicted.push(label);
        } else {
            let label = model.predict(x);
            writeln!(writer, "{label}")?;
            predicted.push(label);
        }
    }
    writer.flush()?;

    let metrics = EvaluationMetrics::from_predictions(&predicted, &problem.labels);
    if svm_type.is_regression() {
        info!("Mean squared error = {} (regression)", metrics.mse);
        info!(
            "Squared correlation coefficient = {} (regression)",
            metrics.squared_correlation
        );
    } else {
        info!(
            "Accuracy = {}% ({}/{}) (classification)",
            100.0 * metrics.accuracy(),
            metrics.correct,
            metrics.total
        );
    }

    Ok(())
}

fn info_command(args: InfoArgs) -> Result<()> {
    info!("Loading model from: {:?}", args.model);
    let model = load_model(&args.model)?;
    let summary = ModelSummary::from_model(&model);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{summary}");
    }

    Ok(())
}
