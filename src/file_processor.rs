use crate::data_models::{DataSourceMode, DatasetSummary, RawRow};
use crate::errors::PipelineError;
use crate::metrics::METRICS;
use crate::normalizer::{normalize_with_report, NormalizeReport};
use crate::parsers;
use crate::summary::Aggregator;
use crate::time_operation;
use log::{error, info, warn};
use std::path::Path;

/// Extensions the loaders understand.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["csv", "tsv", "json"];

/// Outcome of auditing one file.
#[derive(Debug, Clone)]
pub struct FileAudit {
    pub report: NormalizeReport,
    pub summary: DatasetSummary,
}

pub fn is_supported(path: &Path) -> bool {
    extension_of(path)
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Loads raw rows from a file, choosing the parser by extension.
pub fn load_rows(path: &Path) -> Result<Vec<RawRow>, PipelineError> {
    let extension = extension_of(path).unwrap_or_default();
    let parsed = match extension.as_str() {
        "csv" => parsers::csv_parser::parse_csv(path, b','),
        "tsv" => parsers::csv_parser::parse_csv(path, b'\t'),
        "json" => parsers::json_parser::parse_json(path),
        _ => {
            error!("Unsupported format '{}' for file {}. No parser defined.", extension, path.display());
            return Err(PipelineError::UnsupportedFormat {
                extension,
                path: path.to_path_buf(),
            });
        }
    };
    parsed.map_err(|parse_err| PipelineError::Parse(parse_err, path.to_path_buf()))
}

/// Loads, normalizes and summarizes one file as a static audit.
pub fn audit_file(path: &Path, aggregator: &Aggregator) -> Result<FileAudit, PipelineError> {
    info!("Processing file: {}", path.display());
    METRICS.lock().record_file_attempt();

    let result = time_operation!(format!("audit {}", path.display()), audit_inner(path, aggregator));
    match &result {
        Ok(_) => METRICS.lock().record_file_success(),
        Err(_) => METRICS.lock().record_file_failure(),
    }
    result
}

fn audit_inner(path: &Path, aggregator: &Aggregator) -> Result<FileAudit, PipelineError> {
    let rows = load_rows(path)?;
    let (records, report) = normalize_with_report(&rows);
    METRICS
        .lock()
        .record_rows(report.rows_seen as u64, report.rows_dropped() as u64);

    if report.rows_dropped() > 0 {
        warn!(
            "{}: dropped {} of {} rows ({} without a date column, {} with an unparseable date)",
            path.display(),
            report.rows_dropped(),
            report.rows_seen,
            report.missing_timestamp_column,
            report.invalid_timestamp
        );
    }
    if records.is_empty() {
        return Err(PipelineError::NoValidRecords {
            path: path.to_path_buf(),
        });
    }

    let summary = aggregator.summarize(&records, DataSourceMode::Static)?;
    METRICS.lock().record_summary();
    info!(
        "{}: {} records, {:.2} kWh total, efficiency {}",
        path.display(),
        records.len(),
        summary.total_consumption,
        summary.efficiency_score
    );
    Ok(FileAudit { report, summary })
}
