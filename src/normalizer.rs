//! Column inference and record normalization.
//!
//! Input headers are unknown ahead of time. Each semantic field owns a list of
//! synonym tokens; a column belongs to the field when its lowercased name
//! contains any token. The first matching column in the row's own order wins,
//! regardless of which token matched.

use crate::data_models::{CellValue, EnergyRecord, RawRow};
use crate::utils::{parse_leading_float, parse_timestamp_text, parse_unix_ms_utc};
use crate::validation::{sanitize_magnitude, validate_record};
use chrono::{DateTime, Utc};
use log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticField {
    Timestamp,
    Hvac,
    Lighting,
    Appliances,
    Electronics,
    Total,
}

impl SemanticField {
    pub fn synonyms(self) -> &'static [&'static str] {
        match self {
            SemanticField::Timestamp => &["date", "time", "timestamp"],
            SemanticField::Hvac => &["hvac", "heating", "cooling", "ac"],
            SemanticField::Lighting => &["lighting", "light", "illumination"],
            SemanticField::Appliances => &["appliance", "kitchen", "laundry", "washer", "dryer", "oven"],
            SemanticField::Electronics => &["electronic", "computer", "tv", "plug", "socket"],
            SemanticField::Total => &["total", "consumption", "usage", "energy", "value", "kwh", "power"],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SemanticField::Timestamp => "timestamp",
            SemanticField::Hvac => "hvac",
            SemanticField::Lighting => "lighting",
            SemanticField::Appliances => "appliances",
            SemanticField::Electronics => "electronics",
            SemanticField::Total => "total",
        }
    }
}

/// Why a row produced no record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    MissingTimestampColumn,
    InvalidTimestamp,
}

/// Row accounting for one normalization pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    pub rows_seen: usize,
    pub rows_accepted: usize,
    pub missing_timestamp_column: usize,
    pub invalid_timestamp: usize,
}

impl NormalizeReport {
    pub fn rows_dropped(&self) -> usize {
        self.missing_timestamp_column + self.invalid_timestamp
    }
}

/// Finds the first column, in row order, whose name contains one of the field's synonyms.
pub fn find_column(row: &RawRow, field: SemanticField) -> Option<(&str, &CellValue)> {
    let synonyms = field.synonyms();
    row.fields
        .iter()
        .find(|(key, _)| {
            let lower = key.to_lowercase();
            synonyms.iter().any(|token| lower.contains(token))
        })
        .map(|(key, value)| (key.as_str(), value))
}

fn cell_to_f64(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Number(n) if n.is_finite() => *n,
        CellValue::Number(_) => 0.0,
        CellValue::Text(s) => parse_leading_float(s).unwrap_or(0.0),
        CellValue::Empty => 0.0,
    }
}

fn cell_to_timestamp(cell: &CellValue) -> Option<DateTime<Utc>> {
    match cell {
        CellValue::Number(ms) => parse_unix_ms_utc(*ms),
        CellValue::Text(s) => parse_timestamp_text(s),
        CellValue::Empty => None,
    }
}

fn magnitude(row: &RawRow, field: SemanticField) -> f64 {
    let raw = find_column(row, field).map(|(_, cell)| cell_to_f64(cell)).unwrap_or(0.0);
    sanitize_magnitude(field.name(), raw)
}

/// Converts one row into a record, or reports why the row is unusable.
pub fn normalize_row(row: &RawRow) -> Result<EnergyRecord, DropReason> {
    let (_, ts_cell) = find_column(row, SemanticField::Timestamp).ok_or(DropReason::MissingTimestampColumn)?;
    let timestamp = cell_to_timestamp(ts_cell).ok_or(DropReason::InvalidTimestamp)?;

    let hvac = magnitude(row, SemanticField::Hvac);
    let lighting = magnitude(row, SemanticField::Lighting);
    let appliances = magnitude(row, SemanticField::Appliances);
    let electronics = magnitude(row, SemanticField::Electronics);
    let total = magnitude(row, SemanticField::Total);

    let total = if total > 0.0 {
        total
    } else {
        hvac + lighting + appliances + electronics
    };

    let record = EnergyRecord {
        timestamp,
        hvac,
        lighting,
        appliances,
        electronics,
        total,
    };
    debug_assert!(validate_record(&record).is_ok());
    Ok(record)
}

/// Normalizes rows into records sorted ascending by timestamp, with row accounting.
pub fn normalize_with_report(rows: &[RawRow]) -> (Vec<EnergyRecord>, NormalizeReport) {
    let mut report = NormalizeReport {
        rows_seen: rows.len(),
        ..Default::default()
    };
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        match normalize_row(row) {
            Ok(record) => records.push(record),
            Err(DropReason::MissingTimestampColumn) => {
                debug!("Skipping row {}: no date/time column", index + 1);
                report.missing_timestamp_column += 1;
            }
            Err(DropReason::InvalidTimestamp) => {
                debug!("Skipping row {}: unparseable timestamp", index + 1);
                report.invalid_timestamp += 1;
            }
        }
    }

    // Stable, so equal timestamps keep their input order
    records.sort_by_key(|record| record.timestamp);
    report.rows_accepted = records.len();
    (records, report)
}

/// Normalizes rows into records sorted ascending by timestamp. Unusable rows are dropped.
pub fn normalize(rows: &[RawRow]) -> Vec<EnergyRecord> {
    normalize_with_report(rows).0
}
