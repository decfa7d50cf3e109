use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid value '{value}' for {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Parsing failed for {1}: {0}")]
    Parse(ParseError, PathBuf),
    #[error("Unsupported format '{extension}' for file {path}")]
    UnsupportedFormat { extension: String, path: PathBuf },
    #[error("No valid energy records found in {path}")]
    NoValidRecords { path: PathBuf },
    #[error("Summary computation failed: {0}")]
    Summary(#[from] SummaryError),
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading data file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error reading CSV data: {source}")]
    CsvError {
        #[source]
        source: csv::Error,
    },
    #[error("JSON parsing error: {source}")]
    JsonParseError {
        #[source]
        source: serde_json::Error,
    },
    #[error("Unexpected document shape: {message}")]
    UnexpectedShape { message: String },
}

/// The aggregation precondition failure. It is the only error the core raises.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryError {
    #[error("No valid records found")]
    EmptyInput,
}

#[derive(Error, Debug)]
pub enum InsightError {
    #[error("Insight API key not set (expected in environment variable {var})")]
    MissingApiKey { var: String },
    #[error("Insight request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Insight service returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed insight reply: {0}")]
    Malformed(String),
    #[error("Insight service returned no items")]
    Empty,
}
