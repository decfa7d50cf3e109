use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::time::Duration;

/// Constants of the summary formulas.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct SummaryConfig {
    /// Flat cost per energy unit.
    pub tariff_per_kwh: f64,
    /// Lower bound on the elapsed days used as a divisor.
    pub min_elapsed_days: f64,
    pub anomaly_sigma: f64,
    pub max_anomalies: usize,
    pub peak_bucket_ratio: f64,
    pub low_bucket_ratio: f64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            tariff_per_kwh: 0.12,
            min_elapsed_days: 0.1,
            anomaly_sigma: 2.5,
            max_anomalies: 2,
            peak_bucket_ratio: 0.85,
            low_bucket_ratio: 1.25,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct LiveConfig {
    pub window_size: usize,
    pub tick_interval_ms: u64,
    pub connect_delay_ms: u64,
    pub seed: Option<u64>,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            window_size: 100,
            tick_interval_ms: 3000,
            connect_delay_ms: 1500,
            seed: None,
        }
    }
}

impl LiveConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn connect_delay(&self) -> Duration {
        Duration::from_millis(self.connect_delay_ms)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct InsightConfig {
    pub endpoint: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for InsightConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-3-flash-preview".to_string(),
            api_key_env: "ENERGY_INSIGHT_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub summary: SummaryConfig,
    pub live: LiveConfig,
    pub insights: InsightConfig,
    /// Worker threads for batch audits; CPU count when unset.
    pub workers: Option<usize>,
}

impl AppConfig {
    /// Overrides fields from `ENERGY_*` environment variables.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tariff) = lookup("ENERGY_TARIFF_PER_KWH") {
            self.summary.tariff_per_kwh = parse_env("ENERGY_TARIFF_PER_KWH", &tariff)?;
        }
        if let Some(window) = lookup("ENERGY_LIVE_WINDOW") {
            self.live.window_size = parse_env("ENERGY_LIVE_WINDOW", &window)?;
        }
        if let Some(interval) = lookup("ENERGY_LIVE_INTERVAL_MS") {
            self.live.tick_interval_ms = parse_env("ENERGY_LIVE_INTERVAL_MS", &interval)?;
        }
        if let Some(endpoint) = lookup("ENERGY_INSIGHT_ENDPOINT") {
            self.insights.endpoint = endpoint;
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.live.window_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "live.window_size".to_string(),
                value: "0".to_string(),
                message: "window must hold at least one record".to_string(),
            });
        }
        if self.live.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "live.tick_interval_ms".to_string(),
                value: "0".to_string(),
                message: "tick interval must be positive".to_string(),
            });
        }
        if !(self.summary.min_elapsed_days > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "summary.min_elapsed_days".to_string(),
                value: self.summary.min_elapsed_days.to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !self.summary.tariff_per_kwh.is_finite() || self.summary.tariff_per_kwh < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "summary.tariff_per_kwh".to_string(),
                value: self.summary.tariff_per_kwh.to_string(),
                message: "must be a non-negative number".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: e.to_string(),
    })
}

/// Loads the application configuration from a JSON file. Missing fields take defaults.
pub fn load_config(path_str: &str) -> Result<AppConfig, ConfigError> {
    let path = PathBuf::from(path_str);
    if !path.exists() {
        return Err(ConfigError::NotFound { path });
    }

    let file = File::open(&path).map_err(|e| ConfigError::IoError {
        path: path.clone(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: AppConfig = serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
        path: path.clone(),
        source: e,
    })?;
    config.validate()?;

    Ok(config)
}
