use crate::data_models::{CellValue, RawRow};
use crate::errors::ParseError;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Object keys under which a wrapped row array is accepted.
const ROW_CONTAINER_KEYS: &[&str] = &["records", "data", "rows"];

/// Reads a JSON file holding an array of row objects.
pub fn parse_json(file_path: &Path) -> Result<Vec<RawRow>, ParseError> {
    let content = fs::read_to_string(file_path).map_err(|e| ParseError::IoError {
        path: file_path.to_path_buf(),
        source: e,
    })?;
    let rows = parse_json_str(&content)?;
    debug!("Finished parse_json for {}. Read {} rows.", file_path.display(), rows.len());
    Ok(rows)
}

/// Parses either a top-level array of objects or an object wrapping one under
/// `records`, `data` or `rows`. Object key order is kept.
pub fn parse_json_str(content: &str) -> Result<Vec<RawRow>, ParseError> {
    let document: Value = serde_json::from_str(content).map_err(|e| ParseError::JsonParseError { source: e })?;

    let items = match &document {
        Value::Array(items) => items,
        Value::Object(map) => ROW_CONTAINER_KEYS
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_array))
            .ok_or_else(|| ParseError::UnexpectedShape {
                message: format!("object without a row array under any of {:?}", ROW_CONTAINER_KEYS),
            })?,
        other => {
            return Err(ParseError::UnexpectedShape {
                message: format!("expected an array of objects, found {}", type_name(other)),
            })
        }
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match item {
            Value::Object(object) => rows.push(object_to_row(object)),
            other => warn!("Skipping JSON item {}: expected an object, found {}", index, type_name(other)),
        }
    }
    Ok(rows)
}

fn object_to_row(object: &Map<String, Value>) -> RawRow {
    let mut row = RawRow::new();
    for (key, value) in object {
        row.push(key.clone(), to_cell(value));
    }
    row
}

fn to_cell(value: &Value) -> CellValue {
    match value {
        Value::Null => CellValue::Empty,
        Value::Number(n) => n.as_f64().map(CellValue::Number).unwrap_or(CellValue::Empty),
        Value::String(s) if s.trim().is_empty() => CellValue::Empty,
        Value::String(s) => CellValue::Text(s.trim().to_string()),
        Value::Bool(b) => CellValue::Text(b.to_string()),
        nested => CellValue::Text(nested.to_string()),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
