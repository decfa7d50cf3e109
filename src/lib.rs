pub mod config;
pub mod data_models;
pub mod errors;
pub mod file_processor;
pub mod insights;
pub mod live;
pub mod metrics;
pub mod normalizer;
pub mod parallel;
pub mod parsers;
pub mod report;
pub mod retry;
pub mod summary;
pub mod utils;
pub mod validation;

pub use data_models::{DataSourceMode, DatasetSummary, EnergyRecord, RawRow};
pub use normalizer::normalize;
pub use summary::{summarize, Aggregator};

#[cfg(test)]
mod tests;
