use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One loosely typed cell of an input row.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Empty,
}

/// One input row as produced by a loader. Column order is the source order and
/// drives column inference, so it is kept as a list rather than a map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRow {
    pub fields: Vec<(String, CellValue)>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: CellValue) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: CellValue) {
        self.fields.push((key.into(), value));
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A single normalized energy reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    pub timestamp: DateTime<Utc>,
    pub hvac: f64,
    pub lighting: f64,
    pub appliances: f64,
    pub electronics: f64,
    pub total: f64,
}

impl EnergyRecord {
    pub fn category_sum(&self) -> f64 {
        self.hvac + self.lighting + self.appliances + self.electronics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceMode {
    #[default]
    Static,
    Live,
}

impl fmt::Display for DataSourceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSourceMode::Static => f.write_str("static"),
            DataSourceMode::Live => f.write_str("live"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadLevel {
    Low,
    Normal,
    Peak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyData {
    pub time: String,
    pub value: f64,
    #[serde(rename = "type")]
    pub level: LoadLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyData {
    pub name: String,
    pub consumption: f64,
    pub cost: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub date: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakConsumption {
    pub value: f64,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryTotals {
    pub hvac: f64,
    pub lighting: f64,
    pub appliances: f64,
    pub electronics: f64,
}

impl CategoryTotals {
    pub fn sum(&self) -> f64 {
        self.hvac + self.lighting + self.appliances + self.electronics
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeakLoadIntensity {
    Low,
    Medium,
    High,
}

impl fmt::Display for PeakLoadIntensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeakLoadIntensity::Low => f.write_str("Low"),
            PeakLoadIntensity::Medium => f.write_str("Medium"),
            PeakLoadIntensity::High => f.write_str("High"),
        }
    }
}

/// Read-only snapshot derived from a record sequence. Field names follow the
/// dashboard's JSON contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub total_consumption: f64,
    pub avg_daily_consumption: f64,
    pub peak_consumption: PeakConsumption,
    pub category_totals: CategoryTotals,
    pub efficiency_score: u8,
    pub hourly_distribution: Vec<HourlyData>,
    pub monthly_distribution: Vec<MonthlyData>,
    pub anomalies: Vec<Anomaly>,
    pub estimated_cost: f64,
    pub potential_savings: f64,
    pub mode: DataSourceMode,
    pub consumption_trend: f64,
    pub cost_trend: f64,
    pub confidence_score: f64,
    pub peak_load_intensity: PeakLoadIntensity,
    pub performance_variance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Optimization,
    Anomaly,
    Forecast,
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InsightKind::Optimization => f.write_str("optimization"),
            InsightKind::Anomaly => f.write_str("anomaly"),
            InsightKind::Forecast => f.write_str("forecast"),
        }
    }
}

/// Advisory item produced by the insight service or the local fallback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
}
