//! Optional advisory items from an external text-generation service.
//!
//! Nothing in the summary pipeline depends on this module. Any failure here
//! degrades to a single locally built advisory.

use crate::config::InsightConfig;
use crate::data_models::{DatasetSummary, Insight, InsightKind};
use crate::errors::InsightError;
use crate::metrics::METRICS;
use crate::retry::{insight_retry_config, retry_with_backoff_if};
use log::{info, warn};
use serde_json::json;
use std::future::Future;
use std::time::Duration;

pub const MAX_INSIGHTS: usize = 3;
const DATE_FORMAT: &str = "%m/%d/%Y";

/// Transport that turns a prompt into raw reply text.
pub trait InsightProvider {
    fn generate(&self, prompt: &str) -> impl Future<Output = Result<String, InsightError>>;
}

/// Prompt describing the summary, asking for three typed advisory items.
pub fn build_prompt(summary: &DatasetSummary) -> String {
    format!(
        "Analyze this energy consumption summary and provide {count} strategic insights for building management.\n\
         Summary Data:\n\
         - Period: {start} to {end}\n\
         - Total Consumption: {total:.2} kWh\n\
         - Average Daily: {avg:.2} kWh\n\
         - Peak Consumption: {peak:.2} kWh on {peak_date}\n\
         - Category Breakdown: HVAC ({hvac:.2} kWh), Lighting ({lighting:.2} kWh), Appliances ({appliances:.2} kWh), Electronics ({electronics:.2} kWh).\n\
         \n\
         Format the response as a JSON array of objects with 'title', 'description', and 'type' (must be 'optimization', 'anomaly', or 'forecast').",
        count = MAX_INSIGHTS,
        start = summary.start_date.format(DATE_FORMAT),
        end = summary.end_date.format(DATE_FORMAT),
        total = summary.total_consumption,
        avg = summary.avg_daily_consumption,
        peak = summary.peak_consumption.value,
        peak_date = summary.peak_consumption.date.format(DATE_FORMAT),
        hvac = summary.category_totals.hvac,
        lighting = summary.category_totals.lighting,
        appliances = summary.category_totals.appliances,
        electronics = summary.category_totals.electronics,
    )
}

/// Parses a reply into at most three insights. Markdown code fences are tolerated.
pub fn parse_insights(text: &str) -> Result<Vec<Insight>, InsightError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);

    let mut insights: Vec<Insight> =
        serde_json::from_str(body.trim()).map_err(|e| InsightError::Malformed(e.to_string()))?;
    if insights.is_empty() {
        return Err(InsightError::Empty);
    }
    insights.truncate(MAX_INSIGHTS);
    Ok(insights)
}

/// The deterministic advisory used whenever the service is unavailable.
pub fn fallback_insights(summary: &DatasetSummary) -> Vec<Insight> {
    vec![Insight {
        title: "Manual Observation".to_string(),
        description: format!(
            "The peak consumption occurred on {}. Review operational logs for this period.",
            summary.peak_consumption.date.format(DATE_FORMAT)
        ),
        kind: InsightKind::Anomaly,
    }]
}

/// Asks the provider for insights, surfacing every failure.
pub async fn request_insights<P: InsightProvider>(
    summary: &DatasetSummary,
    provider: &P,
) -> Result<Vec<Insight>, InsightError> {
    let prompt = build_prompt(summary);
    let reply = provider.generate(&prompt).await?;
    parse_insights(&reply)
}

/// Asks the provider for insights; never fails.
pub async fn fetch_insights<P: InsightProvider>(summary: &DatasetSummary, provider: &P) -> Vec<Insight> {
    match request_insights(summary, provider).await {
        Ok(insights) => {
            info!("Received {} insights", insights.len());
            insights
        }
        Err(e) => {
            warn!("Insight service unavailable ({}); using local advisory", e);
            METRICS.lock().record_insight_fallback();
            fallback_insights(summary)
        }
    }
}

/// Calls a `generateContent`-style HTTP endpoint.
pub struct HttpInsightProvider {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpInsightProvider {
    /// Builds a provider, reading the API key from the configured environment variable.
    pub fn from_config(config: &InsightConfig) -> Result<Self, InsightError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| InsightError::MissingApiKey {
                var: config.api_key_env.clone(),
            })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &InsightConfig, api_key: String) -> Result<Self, InsightError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let url = format!(
            "{}/{}:generateContent",
            config.endpoint.trim_end_matches('/'),
            config.model
        );
        Ok(Self { client, url, api_key })
    }

    async fn send(&self, prompt: &str) -> Result<String, InsightError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": { "responseMimeType": "application/json" }
        });

        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(InsightError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: serde_json::Value = response.json().await?;
        data.pointer("/candidates/0/content/parts/0/text")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| InsightError::Malformed("reply has no candidate text".to_string()))
    }
}

fn is_transient(error: &InsightError) -> bool {
    match error {
        InsightError::Http(e) => e.is_timeout() || e.is_connect(),
        InsightError::Status { status, .. } => *status == 429 || *status >= 500,
        _ => false,
    }
}

impl InsightProvider for HttpInsightProvider {
    async fn generate(&self, prompt: &str) -> Result<String, InsightError> {
        retry_with_backoff_if(&insight_retry_config(), "insight request", || self.send(prompt), is_transient).await
    }
}
