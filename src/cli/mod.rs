//! CLI layer: argument parsing, command dispatch, and subcommand implementations.

pub mod args;
mod scan;

pub use args::*;

use clap::{Parser, Subcommand};
use std::fs;
use std::io::Write;
use std::time::Instant;

use tracing::info;

use condflag::model::default_model_path;
use condflag::{
    is_potential_anomaly, load_model, sort_and_rank_results, FlagError, Level, LogLevel,
    ScanConfig, ScanContext, SearchAlgorithm,
};

/// Edit cost used when listing the neighbours of every stored expression.
const DUMP_NEIGHBOR_MAX_COST: usize = 3;

/// Anomaly threshold (percent) used when listing neighbours.
const DUMP_NEIGHBOR_THRESHOLD: f64 = 1.0;

// ─── CLI ─────────────────────────────────────────────────────────────

/// Flags rare conditional expressions that look like typos of common ones
#[derive(Parser, Debug)]
#[command(name = "condflag", version, about, after_help = "\
Run 'condflag <COMMAND> --help' for detailed options and examples.\n\
Common options: -t <CORPUS> (train) or -m <MODEL> (saved model), -c <COST>, -j <THREADS>")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Commands {
    /// Train on a corpus and save the model
    Train(TrainArgs),

    /// Scan files for anomalous conditional expressions
    Scan(ScanArgs),

    /// Evaluate a single abstracted expression
    Query(QueryArgs),

    /// Print the expressions stored for one level
    Dump(DumpArgs),
}

// ─── Main entry point ───────────────────────────────────────────────

pub fn run() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Train(args) => cmd_train(args),
        Commands::Scan(args) => scan::cmd_scan(args),
        Commands::Query(args) => scan::cmd_query(args),
        Commands::Dump(args) => cmd_dump(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

// ─── Shared helpers ─────────────────────────────────────────────────

fn init_logging(config: &ScanConfig) {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level.as_tracing_level())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Train from the corpus or load the saved model named by `source`.
pub(crate) fn load_context(source: &ModelSource, config: ScanConfig) -> Result<ScanContext, FlagError> {
    match (&source.train, &source.model) {
        (Some(corpus), None) => ScanContext::train(corpus, config),
        (None, Some(model)) => ScanContext::from_model(load_model(model)?, config),
        _ => Err(FlagError::InvalidArgs(
            "exactly one of --train or --model is required".to_string(),
        )),
    }
}

// ─── Train ──────────────────────────────────────────────────────────

fn cmd_train(args: TrainArgs) -> Result<(), FlagError> {
    let config = args.options.to_config();
    init_logging(&config);
    let start = Instant::now();
    let context = ScanContext::train(&args.train, config)?;

    let path = args.model.clone().unwrap_or_else(|| default_model_path(&args.train));
    context.save_model(&path)?;
    let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);

    let summary: Vec<String> = context
        .levels()
        .filter_map(|level| context.trie(level).ok())
        .map(|trie| format!("{}={}", trie.level(), trie.len()))
        .collect();
    eprintln!(
        "Trained {} [{}] from {} in {:.3}s, saved {} ({:.1} KB)",
        if summary.len() == 1 { "level" } else { "levels" },
        summary.join(", "),
        args.train.display(),
        start.elapsed().as_secs_f64(),
        path.display(),
        size as f64 / 1024.0
    );
    Ok(())
}

// ─── Dump ───────────────────────────────────────────────────────────

fn cmd_dump(args: DumpArgs) -> Result<(), FlagError> {
    let config = ScanConfig {
        log_level: LogLevel::parse_lenient(&args.log_level),
        levels: vec![args.level],
        max_cost: DUMP_NEIGHBOR_MAX_COST,
        num_threads: 1,
        anomaly_threshold: DUMP_NEIGHBOR_THRESHOLD,
        algorithm: SearchAlgorithm::TrieTraversal,
        ..ScanConfig::default()
    };
    init_logging(&config);
    let context = load_context(&args.source, config)?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    if args.neighbors {
        write_neighbors(&context, args.level, &mut out)?;
    } else {
        write_rows(&context, args.level, args.sorted, &mut out)?;
    }
    out.flush()?;
    Ok(())
}

/// `expression,occurrences,contributors,(id;count)...` per stored expression.
pub(crate) fn write_rows(
    context: &ScanContext,
    level: Level,
    sorted: bool,
    out: &mut impl Write,
) -> Result<(), FlagError> {
    let rows = context.trie(level)?.dump(sorted, context.compacter())?;
    for row in &rows {
        let contributors: Vec<String> = row
            .contributors
            .iter()
            .map(|(id, count)| format!("({};{})", id, count))
            .collect();
        writeln!(
            out,
            "{},{},{},{}",
            row.expression,
            row.occurrences,
            row.contributors.len(),
            contributors.join(",")
        )?;
    }
    info!(level = %level, rows = rows.len(), "Dumped trie");
    Ok(())
}

/// Every stored expression followed by its ranked neighbours, marking the
/// ones that would be reported as anomalies.
pub(crate) fn write_neighbors(
    context: &ScanContext,
    level: Level,
    out: &mut impl Write,
) -> Result<(), FlagError> {
    let trie = context.trie(level)?;
    let compacter = context.compacter();
    let rows = trie.dump(false, compacter)?;
    for row in &rows {
        let Some(target) = compacter.try_compact(&row.expression) else {
            continue;
        };
        let mut results =
            trie.search_nearest_expressions(&target, DUMP_NEIGHBOR_MAX_COST, 1, SearchAlgorithm::TrieTraversal);
        sort_and_rank_results(&mut results);
        let anomalous = is_potential_anomaly(&results, DUMP_NEIGHBOR_THRESHOLD);

        writeln!(
            out,
            "Expression: {} ({}) {}",
            row.expression,
            row.occurrences,
            if anomalous { "Anomaly" } else { "Okay" }
        )?;
        for result in results.iter().filter(|r| r.cost > 0) {
            writeln!(
                out,
                "  Did you mean: {} with editing cost: {} and occurrences: {}",
                compacter.expand(&result.expression)?,
                result.cost,
                result.occurrences
            )?;
        }
    }
    Ok(())
}
