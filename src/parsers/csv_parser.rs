use crate::data_models::{CellValue, RawRow};
use crate::errors::ParseError;
use csv::{ReaderBuilder, StringRecord};
use log::{debug, error};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Reads a delimited file with a header row into raw rows.
pub fn parse_csv(file_path: &Path, delimiter: u8) -> Result<Vec<RawRow>, ParseError> {
    let file = File::open(file_path).map_err(|e| ParseError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    let rows = parse_csv_reader(file, delimiter)?;
    debug!("Finished parse_csv for {}. Read {} rows.", file_path.display(), rows.len());
    Ok(rows)
}

/// Reads delimited text with a header row. Each cell keeps its header as key,
/// in column order. Blank cells become `CellValue::Empty`; ragged rows only
/// carry the columns they have.
pub fn parse_csv_reader<R: Read>(reader: R, delimiter: u8) -> Result<Vec<RawRow>, ParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::CsvError { source: e })?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for (row_index, result) in reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // +2: one for the header, one for 1-based numbering
                error!("Failed to read record at file row {}: {}", row_index + 2, e);
                continue;
            }
        };
        if is_blank(&record) {
            continue;
        }
        rows.push(to_raw_row(&headers, &record));
    }
    Ok(rows)
}

fn is_blank(record: &StringRecord) -> bool {
    record.iter().all(|field| field.trim().is_empty())
}

fn to_raw_row(headers: &[String], record: &StringRecord) -> RawRow {
    let mut row = RawRow::new();
    for (header, field) in headers.iter().zip(record.iter()) {
        let trimmed = field.trim();
        let value = if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        };
        row.push(header.clone(), value);
    }
    row
}
