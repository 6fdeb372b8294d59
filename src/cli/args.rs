//! CLI argument structs for all subcommands.

use std::path::PathBuf;

use clap::{Args, Parser, ValueEnum};

use condflag::{Level, LogLevel, ScanConfig, SearchAlgorithm};

/// Where the trained patterns come from: a corpus trained on the fly, or a
/// model saved by `condflag train`.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ModelSource {
    /// Training corpus (lines prefixed with AST_expression markers)
    #[arg(short = 't', long = "train")]
    pub train: Option<PathBuf>,

    /// Saved model file
    #[arg(short = 'm', long = "model")]
    pub model: Option<PathBuf>,
}

/// Knobs shared by every command that searches.
#[derive(Args, Debug, Clone)]
pub struct ScanOptions {
    /// Maximum edit cost for autocorrect suggestions
    #[arg(short = 'c', long, default_value = "2")]
    pub max_cost: usize,

    /// Maximum number of autocorrect suggestions per expression
    #[arg(short = 'n', long, default_value = "5")]
    pub max_autocorrections: usize,

    /// Number of scanning threads
    #[arg(short = 'j', long, default_value = "1")]
    pub threads: usize,

    /// Percentage below which a rare exact match is reported as an anomaly
    #[arg(short = 'a', long, default_value = "5.0")]
    pub anomaly_threshold: f64,

    /// Log verbosity: error, info, debug (or 0, 1, 2)
    #[arg(short = 'v', long, default_value = "error")]
    pub log_level: String,

    /// Nearest-expression search: trie-traversal, candidate-generation, symmetric-delete
    #[arg(long, default_value = "trie-traversal")]
    pub algorithm: SearchAlgorithm,

    /// Abstraction levels to use, comma-separated (MIN, ONE, TWO, MAX or 0-3)
    #[arg(long, value_delimiter = ',', default_values = ["ONE", "TWO"])]
    pub levels: Vec<Level>,
}

impl ScanOptions {
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse_lenient(&self.log_level)
    }

    pub fn to_config(&self) -> ScanConfig {
        ScanConfig {
            max_cost: self.max_cost,
            max_autocorrections: self.max_autocorrections,
            num_threads: self.threads,
            anomaly_threshold: self.anomaly_threshold,
            log_level: self.log_level(),
            algorithm: self.algorithm,
            levels: self.levels.clone(),
        }
        .normalized()
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Tab-separated rows
    #[default]
    Tsv,
    /// One JSON object per line
    Json,
}

#[derive(Parser, Debug)]
pub struct TrainArgs {
    /// Training corpus (lines prefixed with AST_expression markers)
    #[arg(short = 't', long = "train")]
    pub train: PathBuf,

    /// Where to save the model [default: <local data dir>/condflag/<corpus>.cfmodel]
    #[arg(short = 'm', long = "model")]
    pub model: Option<PathBuf>,

    #[command(flatten)]
    pub options: ScanOptions,
}

/// Exactly one way of naming the files to scan.
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct ScanInputs {
    /// Single file to scan
    #[arg(short = 'e', long = "file")]
    pub file: Option<PathBuf>,

    /// File containing one path to scan per line
    #[arg(short = 'l', long = "list")]
    pub list: Option<PathBuf>,

    /// Directory to walk (respects .gitignore)
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub source: ModelSource,

    #[command(flatten)]
    pub inputs: ScanInputs,

    /// File extensions picked up by --dir, comma-separated
    #[arg(long, default_value = "txt")]
    pub ext: String,

    /// Write records here instead of stdout
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Record format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub options: ScanOptions,
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Abstracted expression, or marker lines (AST_expression_<LEVEL>:...)
    pub expression: String,

    #[command(flatten)]
    pub source: ModelSource,

    /// Record format
    #[arg(long, value_enum, default_value_t = OutputFormat::Tsv)]
    pub format: OutputFormat,

    #[command(flatten)]
    pub options: ScanOptions,
}

#[derive(Parser, Debug)]
pub struct DumpArgs {
    #[command(flatten)]
    pub source: ModelSource,

    /// Level whose trie is printed
    #[arg(long, default_value = "ONE")]
    pub level: Level,

    /// Sort by occurrences, most frequent first
    #[arg(long)]
    pub sorted: bool,

    /// For every stored expression, print its nearest neighbours instead
    #[arg(long)]
    pub neighbors: bool,

    /// Log verbosity: error, info, debug (or 0, 1, 2)
    #[arg(short = 'v', long, default_value = "error")]
    pub log_level: String,
}
