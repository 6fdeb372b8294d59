//! `scan` and `query` commands: input collection, record output, summary.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use ignore::WalkBuilder;
use tracing::{info, warn};

use condflag::{FlagError, MarkerParser, ReportSink, ScanRecord, ScanSummary, Scanner};

use super::{init_logging, load_context, OutputFormat, QueryArgs, ScanArgs, ScanInputs};

pub(crate) fn cmd_scan(args: ScanArgs) -> Result<(), FlagError> {
    let config = args.options.to_config();
    init_logging(&config);
    let start = Instant::now();
    let files = collect_inputs(&args.inputs, &args.ext)?;
    if files.is_empty() {
        return Err(FlagError::InvalidArgs("no files to scan".to_string()));
    }

    let context = load_context(&args.source, config)?;
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&cancel);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        warn!(error = %e, "Could not install Ctrl-C handler");
    }

    let out: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(std::io::stdout())),
    };
    let sink = ReportWriter::new(out, args.format);
    let summary = Scanner::new(&context, &MarkerParser)
        .with_cancel_flag(cancel)
        .scan_files(&files, &sink)?;
    sink.flush()?;

    print_summary(&summary);
    eprintln!("Scanned {} files in {:.3}s", summary.items, start.elapsed().as_secs_f64());
    Ok(())
}

pub(crate) fn cmd_query(args: QueryArgs) -> Result<(), FlagError> {
    let config = args.options.to_config();
    init_logging(&config);
    let context = load_context(&args.source, config)?;
    let sink = ReportWriter::new(Box::new(std::io::stdout()), args.format);
    let summary = Scanner::new(&context, &MarkerParser).scan_queries(&[args.expression], &sink)?;
    sink.flush()?;
    print_summary(&summary);
    Ok(())
}

// ─── Inputs ──────────────────────────────────────────────────────────

/// Resolve `-e`, `-l` or `-d` to the list of files to scan.
pub(crate) fn collect_inputs(inputs: &ScanInputs, ext: &str) -> Result<Vec<PathBuf>, FlagError> {
    if let Some(file) = &inputs.file {
        return Ok(vec![file.clone()]);
    }
    if let Some(list) = &inputs.list {
        let text = fs::read_to_string(list)?;
        return Ok(text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .collect());
    }
    if let Some(dir) = &inputs.dir {
        return walk_dir(dir, ext);
    }
    Err(FlagError::InvalidArgs(
        "one of --file, --list or --dir is required".to_string(),
    ))
}

fn walk_dir(dir: &Path, ext: &str) -> Result<Vec<PathBuf>, FlagError> {
    if !dir.is_dir() {
        return Err(FlagError::InvalidArgs(format!(
            "Directory does not exist: {}",
            dir.display()
        )));
    }
    let extensions: Vec<String> = ext
        .split(',')
        .map(|e| e.trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect();

    let mut builder = WalkBuilder::new(dir);
    builder.hidden(true);
    builder.git_ignore(true);

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }
        let path = entry.into_path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
        if matches {
            files.push(path);
        }
    }
    files.sort();
    info!(dir = %dir.display(), files = files.len(), "Collected scan inputs");
    Ok(files)
}

// ─── Output ──────────────────────────────────────────────────────────

/// Writes one line per record, serialized across scanner threads.
pub(crate) struct ReportWriter {
    out: Mutex<Box<dyn Write + Send>>,
    format: OutputFormat,
}

impl ReportWriter {
    pub(crate) fn new(out: Box<dyn Write + Send>, format: OutputFormat) -> Self {
        Self { out: Mutex::new(out), format }
    }

    pub(crate) fn flush(&self) -> Result<(), FlagError> {
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        out.flush()?;
        Ok(())
    }
}

impl ReportSink for ReportWriter {
    fn report(&self, record: &ScanRecord) -> Result<(), FlagError> {
        log_record(record);
        let line = match self.format {
            OutputFormat::Tsv => format_tsv(record),
            OutputFormat::Json => serde_json::to_string(record).map_err(std::io::Error::other)?,
        };
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{}", line)?;
        Ok(())
    }
}

fn status(record: &ScanRecord) -> &'static str {
    match (record.found, record.anomalous) {
        (false, _) => "NotFound",
        (true, true) => "Anomaly",
        (true, false) => "Okay",
    }
}

/// `source  row:col  level  status  expression  suggestion;suggestion...`
/// where each suggestion is `expression|cost|occurrences`.
pub(crate) fn format_tsv(record: &ScanRecord) -> String {
    let position = record
        .position
        .map(|(row, col)| format!("{}:{}", row, col))
        .unwrap_or_else(|| "-".to_string());
    let suggestions: Vec<String> = record
        .suggestions
        .iter()
        .map(|s| format!("{}|{}|{}", s.expression, s.cost, s.occurrences))
        .collect();
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        record.source,
        position,
        record.level,
        status(record),
        record.expression,
        suggestions.join(";")
    )
}

fn log_record(record: &ScanRecord) {
    if record.anomalous {
        warn!(
            source = %record.source,
            level = %record.level,
            original = %record.original,
            "Potential anomaly: {}",
            record.expression
        );
        for s in record.suggestions.iter().filter(|s| s.cost > 0) {
            warn!(
                "Did you mean: {} with editing cost: {} and occurrences: {}",
                s.expression, s.cost, s.occurrences
            );
        }
    } else if record.found {
        info!(source = %record.source, level = %record.level, "Expression is Okay: {}", record.expression);
        for s in record.suggestions.iter().filter(|s| s.cost > 0) {
            info!(
                "Did you mean: {} with editing cost: {} and occurrences: {}",
                s.expression, s.cost, s.occurrences
            );
        }
    }
}

fn print_summary(summary: &ScanSummary) {
    eprintln!(
        "Expressions: {} ({} skipped), found: {}, not found: {}, anomalies: {}",
        summary.expressions,
        summary.skipped_expressions,
        summary.found,
        summary.not_found,
        summary.anomalies
    );
    if summary.skipped_items > 0 {
        eprintln!("Skipped {} of {} inputs", summary.skipped_items, summary.items);
    }
    for (level, (found, missing)) in &summary.lookups {
        eprintln!("Trie {}: {} found, {} not found", level, found, missing);
    }
    for (level, (hits, misses)) in &summary.cache {
        eprintln!("Cache {}: {} hits, {} misses", level, hits, misses);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use condflag::{Level, Suggestion};

    fn record(anomalous: bool) -> ScanRecord {
        ScanRecord {
            source: "a.txt".to_string(),
            position: Some((3, 1)),
            level: Level::One,
            expression: "(x)".to_string(),
            original: "if (x)".to_string(),
            found: true,
            anomalous,
            suggestions: vec![
                Suggestion { expression: "(x)".to_string(), cost: 0, occurrences: 1, contributors: 1 },
                Suggestion { expression: "(y)".to_string(), cost: 1, occurrences: 90, contributors: 40 },
            ],
        }
    }

    fn inputs(file: Option<PathBuf>, list: Option<PathBuf>, dir: Option<PathBuf>) -> ScanInputs {
        ScanInputs { file, list, dir }
    }

    #[test]
    fn test_format_tsv() {
        assert_eq!(
            format_tsv(&record(true)),
            "a.txt\t3:1\tONE\tAnomaly\t(x)\t(x)|0|1;(y)|1|90"
        );
        let mut missing = record(false);
        missing.found = false;
        missing.position = None;
        missing.suggestions.clear();
        assert_eq!(format_tsv(&missing), "a.txt\t-\tONE\tNotFound\t(x)\t");
    }

    /// Shared buffer so the test can read what the sink wrote.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_report_writer_json_lines() {
        let buf = SharedBuf::default();
        let writer = ReportWriter::new(Box::new(buf.clone()), OutputFormat::Json);
        writer.report(&record(true)).unwrap();
        writer.report(&record(false)).unwrap();
        writer.flush().unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<serde_json::Value> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["anomalous"], true);
        assert_eq!(lines[0]["level"], "One");
        assert_eq!(lines[1]["suggestions"][1]["occurrences"], 90);
    }

    #[test]
    fn test_collect_single_file() {
        let files = collect_inputs(&inputs(Some(PathBuf::from("x.txt")), None, None), "txt").unwrap();
        assert_eq!(files, vec![PathBuf::from("x.txt")]);
    }

    #[test]
    fn test_collect_list_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("list");
        fs::write(&list, "a.txt\n\n  b.txt  \n").unwrap();
        let files = collect_inputs(&inputs(None, Some(list), None), "txt").unwrap();
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
    }

    #[test]
    fn test_collect_dir_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.txt"), "").unwrap();
        fs::write(dir.path().join("a.C"), "").unwrap();
        fs::write(dir.path().join("sub").join("c.txt"), "").unwrap();
        fs::write(dir.path().join("d.rs"), "").unwrap();

        let files = collect_inputs(&inputs(None, None, Some(dir.path().to_path_buf())), "txt, .c").unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(names, vec!["a.C", "b.txt", "sub/c.txt"]);
    }

    #[test]
    fn test_collect_missing_dir() {
        let err = collect_inputs(&inputs(None, None, Some(PathBuf::from("/nonexistent/dir"))), "txt")
            .unwrap_err();
        assert!(matches!(err, FlagError::InvalidArgs(_)));
    }
}
