//! Summary aggregation over a time-ordered record sequence.
//!
//! Every summary is a full recompute over the records it is given. Callers
//! must pass records sorted ascending by timestamp (the normalizer guarantees
//! this); the period bounds, the trend halves and the anomaly order depend on it.

use crate::config::SummaryConfig;
use crate::data_models::{
    Anomaly, CategoryTotals, DataSourceMode, DatasetSummary, EnergyRecord, HourlyData, LoadLevel, MonthlyData,
    PeakConsumption, PeakLoadIntensity,
};
use crate::errors::SummaryError;
use chrono::{Datelike, Timelike};

pub const HOURLY_BUCKETS: usize = 12;
const MS_PER_DAY: f64 = 86_400_000.0;
const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Running sums collected in a single pass.
#[derive(Debug, Clone, Copy)]
struct Totals<'a> {
    consumption: f64,
    categories: CategoryTotals,
    peak: &'a EnergyRecord,
}

impl<'a> Totals<'a> {
    fn collect(records: &'a [EnergyRecord]) -> Option<Self> {
        let first = records.first()?;
        let start = Totals {
            consumption: 0.0,
            categories: CategoryTotals::default(),
            peak: first,
        };
        Some(records.iter().fold(start, |mut acc, record| {
            acc.consumption += record.total;
            acc.categories.hvac += record.hvac;
            acc.categories.lighting += record.lighting;
            acc.categories.appliances += record.appliances;
            acc.categories.electronics += record.electronics;
            // Strictly greater: the first maximum seen is kept
            if record.total > acc.peak.total {
                acc.peak = record;
            }
            acc
        }))
    }
}

/// Mean and population standard deviation of the record totals.
pub fn mean_and_std_dev(records: &[EnergyRecord]) -> (f64, f64) {
    if records.is_empty() {
        return (0.0, 0.0);
    }
    let n = records.len() as f64;
    let mean = records.iter().map(|r| r.total).sum::<f64>() / n;
    let variance = records.iter().map(|r| (r.total - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Index of the two-hour bucket a record falls in.
pub fn bucket_index(record: &EnergyRecord) -> usize {
    (record.timestamp.hour() / 2) as usize
}

/// Mean total per two-hour time-of-day bucket, classified against the extremes.
pub fn hourly_distribution(records: &[EnergyRecord], config: &SummaryConfig) -> Vec<HourlyData> {
    let mut sums = [0.0_f64; HOURLY_BUCKETS];
    let mut counts = [0_usize; HOURLY_BUCKETS];
    for record in records {
        let index = bucket_index(record);
        sums[index] += record.total;
        counts[index] += 1;
    }

    let means: Vec<f64> = sums
        .iter()
        .zip(counts.iter())
        .map(|(sum, &count)| if count > 0 { sum / count as f64 } else { 0.0 })
        .collect();
    let max = means.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = means.iter().copied().fold(f64::INFINITY, f64::min);

    means
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            let level = if value > max * config.peak_bucket_ratio {
                LoadLevel::Peak
            } else if value < min * config.low_bucket_ratio {
                LoadLevel::Low
            } else {
                LoadLevel::Normal
            };
            HourlyData {
                time: format!("{:02}:00", index * 2),
                value,
                level,
            }
        })
        .collect()
}

/// Consumption per calendar month name, in order of first appearance. Years collapse.
pub fn monthly_distribution(records: &[EnergyRecord], config: &SummaryConfig) -> Vec<MonthlyData> {
    let mut months: Vec<MonthlyData> = Vec::new();
    for record in records {
        let name = MONTH_NAMES[record.timestamp.month0() as usize];
        match months.iter_mut().find(|m| m.name == name) {
            Some(entry) => entry.consumption += record.total,
            None => months.push(MonthlyData {
                name: name.to_string(),
                consumption: record.total,
                cost: 0.0,
            }),
        }
    }
    for entry in &mut months {
        entry.cost = entry.consumption * config.tariff_per_kwh;
    }
    months
}

/// Percent change between the mean totals of the first and second halves.
///
/// Returns 100 when the first half averages exactly zero, and 0 for fewer than two records.
pub fn calculate_trend(records: &[EnergyRecord]) -> f64 {
    if records.len() < 2 {
        return 0.0;
    }
    let (first, second) = records.split_at(records.len() / 2);
    let avg_first = first.iter().map(|r| r.total).sum::<f64>() / first.len() as f64;
    let avg_second = second.iter().map(|r| r.total).sum::<f64>() / second.len() as f64;

    if avg_first == 0.0 {
        return 100.0;
    }
    (avg_second - avg_first) / avg_first * 100.0
}

/// Flags readings above `mean + sigma * std_dev`, keeping only the latest ones.
pub fn detect_anomalies(records: &[EnergyRecord], mean: f64, std_dev: f64, config: &SummaryConfig) -> Vec<Anomaly> {
    let threshold = mean + config.anomaly_sigma * std_dev;
    let flagged: Vec<&EnergyRecord> = records.iter().filter(|r| r.total > threshold).collect();
    let keep_from = flagged.len().saturating_sub(config.max_anomalies);

    flagged[keep_from..]
        .iter()
        .map(|record| {
            let over_mean = (record.total / mean - 1.0) * 100.0;
            Anomaly {
                date: record.timestamp.format("%m/%d/%Y %H:%M").to_string(),
                description: format!("Unusual {}% spike detected", over_mean.round() as i64),
            }
        })
        .collect()
}

fn peak_load_intensity(max_bucket: f64, avg_daily: f64) -> PeakLoadIntensity {
    let avg_hourly = avg_daily / 24.0;
    if max_bucket > avg_hourly * 1.5 {
        PeakLoadIntensity::High
    } else if max_bucket > avg_hourly * 1.2 {
        PeakLoadIntensity::Medium
    } else {
        PeakLoadIntensity::Low
    }
}

/// Computes dataset summaries with a fixed set of formula constants.
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    config: SummaryConfig,
}

impl Aggregator {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SummaryConfig {
        &self.config
    }

    /// Builds the full summary for `records`, which must be sorted ascending by timestamp.
    pub fn summarize(&self, records: &[EnergyRecord], mode: DataSourceMode) -> Result<DatasetSummary, SummaryError> {
        let totals = Totals::collect(records).ok_or(SummaryError::EmptyInput)?;
        let (first, last) = match (records.first(), records.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(SummaryError::EmptyInput),
        };
        let cfg = &self.config;

        let span_ms = (last.timestamp - first.timestamp).num_milliseconds() as f64;
        let elapsed_days = (span_ms / MS_PER_DAY).max(cfg.min_elapsed_days);
        let total_consumption = totals.consumption;
        let avg_daily_consumption = total_consumption / elapsed_days;

        let hourly = hourly_distribution(records, cfg);
        let max_hourly = hourly.iter().map(|h| h.value).fold(f64::NEG_INFINITY, f64::max);
        let min_hourly = hourly.iter().map(|h| h.value).fold(f64::INFINITY, f64::min);
        let baseline = min_hourly;
        let variance = max_hourly - min_hourly;

        let divisor = avg_daily_consumption / 12.0;
        let divisor = if divisor == 0.0 || divisor.is_nan() { 1.0 } else { divisor };
        let score = (100.0 - variance / divisor * 50.0).clamp(0.0, 100.0);

        let (mean, std_dev) = mean_and_std_dev(records);
        let anomalies = detect_anomalies(records, mean, std_dev, cfg);

        let confidence_score = if mean > 0.0 {
            (100.0 - std_dev / mean * 20.0).clamp(70.0, 99.9)
        } else {
            70.0
        };

        let performance_variance = if total_consumption > 0.0 {
            (total_consumption - baseline * 24.0 * elapsed_days) / total_consumption * 100.0
        } else {
            0.0
        };

        // Cost trend mirrors the consumption trend
        let trend = calculate_trend(records);

        Ok(DatasetSummary {
            start_date: first.timestamp,
            end_date: last.timestamp,
            total_consumption,
            avg_daily_consumption,
            peak_consumption: PeakConsumption {
                value: totals.peak.total,
                date: totals.peak.timestamp,
            },
            category_totals: totals.categories,
            efficiency_score: score.round() as u8,
            hourly_distribution: hourly,
            monthly_distribution: monthly_distribution(records, cfg),
            anomalies,
            estimated_cost: total_consumption * cfg.tariff_per_kwh,
            potential_savings: (variance * 0.2 + baseline * 0.1) * elapsed_days,
            mode,
            consumption_trend: trend,
            cost_trend: trend,
            confidence_score,
            peak_load_intensity: peak_load_intensity(max_hourly, avg_daily_consumption),
            performance_variance,
        })
    }
}

/// Summarizes `records` with the default formula constants.
pub fn summarize(records: &[EnergyRecord], mode: DataSourceMode) -> Result<DatasetSummary, SummaryError> {
    Aggregator::default().summarize(records, mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    fn record(timestamp: DateTime<Utc>, total: f64) -> EnergyRecord {
        EnergyRecord {
            timestamp,
            hvac: total * 0.4,
            lighting: total * 0.2,
            appliances: total * 0.25,
            electronics: total * 0.15,
            total,
        }
    }

    #[test]
    fn test_empty_input_is_an_error() {
        assert_eq!(summarize(&[], DataSourceMode::Static), Err(SummaryError::EmptyInput));
        assert_eq!(summarize(&[], DataSourceMode::Live), Err(SummaryError::EmptyInput));
    }

    #[test]
    fn test_single_record_summary() {
        let records = vec![EnergyRecord {
            timestamp: at(2024, 1, 1, 10),
            hvac: 1.0,
            lighting: 0.5,
            appliances: 0.5,
            electronics: 0.5,
            total: 2.5,
        }];
        let summary = summarize(&records, DataSourceMode::Static).unwrap();
        assert_eq!(summary.total_consumption, 2.5);
        assert_eq!(summary.peak_consumption.value, 2.5);
        assert_relative_eq!(summary.avg_daily_consumption, 25.0);
        assert!(summary.anomalies.is_empty());
        assert_eq!(summary.consumption_trend, 0.0);
        assert_eq!(summary.start_date, summary.end_date);
        assert_eq!(summary.mode, DataSourceMode::Static);
        // Only the 10:00 bucket holds data; min bucket is 0 so nothing is low
        let ten = &summary.hourly_distribution[5];
        assert_eq!(ten.time, "10:00");
        assert_eq!(ten.level, LoadLevel::Peak);
        assert!(summary
            .hourly_distribution
            .iter()
            .all(|h| h.level != LoadLevel::Low));
        assert_eq!(summary.confidence_score, 99.9);
    }

    #[test]
    fn test_two_months_trend_and_costs() {
        let records = vec![record(at(2024, 1, 15, 12), 100.0), record(at(2024, 2, 15, 12), 300.0)];
        let summary = summarize(&records, DataSourceMode::Static).unwrap();

        assert_eq!(summary.monthly_distribution.len(), 2);
        assert_eq!(summary.monthly_distribution[0].name, "Jan");
        assert_eq!(summary.monthly_distribution[1].name, "Feb");
        for month in &summary.monthly_distribution {
            assert_relative_eq!(month.cost, month.consumption * 0.12);
        }
        assert_relative_eq!(summary.consumption_trend, 200.0);
        assert_eq!(summary.cost_trend, summary.consumption_trend);
        assert_relative_eq!(summary.estimated_cost, 400.0 * 0.12);
        assert_relative_eq!(summary.avg_daily_consumption, 400.0 / 31.0);
    }

    #[test]
    fn test_months_from_different_years_collapse() {
        let records = vec![
            record(at(2023, 3, 1, 0), 10.0),
            record(at(2023, 4, 1, 0), 5.0),
            record(at(2024, 3, 1, 0), 20.0),
        ];
        let months = monthly_distribution(&records, &SummaryConfig::default());
        assert_eq!(months.len(), 2);
        assert_eq!(months[0].name, "Mar");
        assert_relative_eq!(months[0].consumption, 30.0);
        assert_eq!(months[1].name, "Apr");
    }

    #[test]
    fn test_trend_fallback_when_first_half_is_zero() {
        let records = vec![
            record(at(2024, 1, 1, 0), 0.0),
            record(at(2024, 1, 1, 1), 0.0),
            record(at(2024, 1, 1, 2), 4.0),
            record(at(2024, 1, 1, 3), 8.0),
        ];
        assert_eq!(calculate_trend(&records), 100.0);
    }

    #[test]
    fn test_trend_uses_floor_midpoint() {
        // n = 3: first half [10], second half [20, 30]
        let records = vec![
            record(at(2024, 1, 1, 0), 10.0),
            record(at(2024, 1, 1, 1), 20.0),
            record(at(2024, 1, 1, 2), 30.0),
        ];
        assert_relative_eq!(calculate_trend(&records), 150.0);
    }

    #[test]
    fn test_peak_tie_keeps_first() {
        let records = vec![
            record(at(2024, 1, 1, 0), 5.0),
            record(at(2024, 1, 1, 4), 9.0),
            record(at(2024, 1, 1, 8), 9.0),
        ];
        let summary = summarize(&records, DataSourceMode::Static).unwrap();
        assert_eq!(summary.peak_consumption.value, 9.0);
        assert_eq!(summary.peak_consumption.date, at(2024, 1, 1, 4));
    }

    #[test]
    fn test_hourly_buckets_classification() {
        // Buckets 00, 02, 04 hold 1, 10 and 9; every other bucket is empty (0)
        let records = vec![
            record(at(2024, 1, 1, 1), 1.0),
            record(at(2024, 1, 1, 2), 10.0),
            record(at(2024, 1, 1, 3), 10.0),
            record(at(2024, 1, 2, 5), 9.0),
        ];
        let hourly = hourly_distribution(&records, &SummaryConfig::default());
        assert_eq!(hourly.len(), HOURLY_BUCKETS);
        assert_eq!(hourly[0].time, "00:00");
        assert_eq!(hourly[11].time, "22:00");
        assert_eq!(hourly[0].value, 1.0);
        assert_eq!(hourly[1].value, 10.0);
        assert_eq!(hourly[2].value, 9.0);
        assert_eq!(hourly[0].level, LoadLevel::Normal);
        assert_eq!(hourly[1].level, LoadLevel::Peak);
        assert_eq!(hourly[2].level, LoadLevel::Peak);
        assert_eq!(hourly[3].level, LoadLevel::Normal);
    }

    #[test]
    fn test_low_buckets_when_every_bucket_has_data() {
        let records: Vec<EnergyRecord> = (0..12)
            .map(|i| record(at(2024, 1, 1, i * 2), if i == 6 { 20.0 } else { 10.0 + i as f64 * 0.1 }))
            .collect();
        let hourly = hourly_distribution(&records, &SummaryConfig::default());
        assert_eq!(hourly[0].level, LoadLevel::Low);
        assert_eq!(hourly[6].level, LoadLevel::Peak);
        assert!(hourly.iter().filter(|h| h.level == LoadLevel::Normal).count() == 0);
    }

    #[test]
    fn test_bucket_means_reconstruct_total() {
        let records: Vec<EnergyRecord> = (0..50)
            .map(|i| record(at(2024, 3, 1, 0) + Duration::minutes(i * 47), 1.0 + (i % 7) as f64))
            .collect();
        let hourly = hourly_distribution(&records, &SummaryConfig::default());
        let mut counts = [0usize; HOURLY_BUCKETS];
        for r in &records {
            counts[bucket_index(r)] += 1;
        }
        let reconstructed: f64 = hourly.iter().zip(counts.iter()).map(|(h, &c)| h.value * c as f64).sum();
        let total: f64 = records.iter().map(|r| r.total).sum();
        assert_relative_eq!(reconstructed, total, epsilon = 1e-9);
    }

    #[test]
    fn test_anomalies_keep_latest_two() {
        let mut records: Vec<EnergyRecord> = (0..60).map(|i| record(at(2024, 1, 1, 0) + Duration::hours(i), 1.0)).collect();
        records[10].total = 50.0;
        records[20].total = 60.0;
        records[30].total = 70.0;

        let (mean, std_dev) = mean_and_std_dev(&records);
        let anomalies = detect_anomalies(&records, mean, std_dev, &SummaryConfig::default());
        assert_eq!(anomalies.len(), 2);
        assert_eq!(anomalies[0].date, records[20].timestamp.format("%m/%d/%Y %H:%M").to_string());
        assert_eq!(anomalies[1].date, "01/02/2024 06:00");

        let expected_pct = ((70.0 / mean - 1.0) * 100.0_f64).round() as i64;
        assert_eq!(anomalies[1].description, format!("Unusual {}% spike detected", expected_pct));
    }

    #[test]
    fn test_no_anomalies_for_constant_series() {
        let records: Vec<EnergyRecord> = (0..10).map(|i| record(at(2024, 1, 1, i), 3.0)).collect();
        let summary = summarize(&records, DataSourceMode::Live).unwrap();
        assert!(summary.anomalies.is_empty());
        assert_eq!(summary.confidence_score, 99.9);
    }

    #[test]
    fn test_derived_scores() {
        // One full day, hourly readings: 1.0 overnight, 3.0 in working hours
        let records: Vec<EnergyRecord> = (0..24)
            .map(|h| record(at(2024, 6, 1, h), if (8..18).contains(&h) { 3.0 } else { 1.0 }))
            .collect();
        let summary = summarize(&records, DataSourceMode::Static).unwrap();

        let elapsed_days = 23.0 / 24.0;
        let total = 10.0 * 3.0 + 14.0 * 1.0;
        assert_relative_eq!(summary.total_consumption, total);
        assert_relative_eq!(summary.avg_daily_consumption, total / elapsed_days);

        let max_bucket = 3.0;
        let min_bucket = 1.0;
        let variance = max_bucket - min_bucket;
        let expected_score = (100.0 - variance / (total / elapsed_days / 12.0) * 50.0).clamp(0.0, 100.0);
        assert_eq!(summary.efficiency_score, expected_score.round() as u8);

        assert_relative_eq!(summary.potential_savings, (variance * 0.2 + min_bucket * 0.1) * elapsed_days);
        assert_relative_eq!(
            summary.performance_variance,
            (total - min_bucket * 24.0 * elapsed_days) / total * 100.0
        );

        let (mean, std_dev) = mean_and_std_dev(&records);
        assert_relative_eq!(summary.confidence_score, (100.0 - std_dev / mean * 20.0).clamp(70.0, 99.9));

        // 3.0 > 1.5 * (avg daily / 24) = 1.5 * 1.913
        assert_eq!(summary.peak_load_intensity, PeakLoadIntensity::High);
        assert_relative_eq!(summary.category_totals.sum(), total, epsilon = 1e-9);
    }

    #[test]
    fn test_all_zero_readings() {
        let records: Vec<EnergyRecord> = (0..4).map(|i| record(at(2024, 1, 1, i), 0.0)).collect();
        let summary = summarize(&records, DataSourceMode::Static).unwrap();
        assert_eq!(summary.total_consumption, 0.0);
        assert_eq!(summary.efficiency_score, 100);
        assert_eq!(summary.confidence_score, 70.0);
        assert_eq!(summary.performance_variance, 0.0);
        assert_eq!(summary.consumption_trend, 100.0);
        assert_eq!(summary.peak_load_intensity, PeakLoadIntensity::Low);
        assert!(summary.anomalies.is_empty());
    }

    #[test]
    fn test_summarize_is_idempotent() {
        let records: Vec<EnergyRecord> = (0..30)
            .map(|i| record(at(2024, 2, 1, 0) + Duration::minutes(i * 95), ((i * 7) % 11) as f64 + 0.5))
            .collect();
        let a = summarize(&records, DataSourceMode::Live).unwrap();
        let b = summarize(&records, DataSourceMode::Live).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_custom_tariff() {
        let aggregator = Aggregator::new(SummaryConfig {
            tariff_per_kwh: 0.5,
            ..SummaryConfig::default()
        });
        let records = vec![record(at(2024, 1, 1, 0), 10.0)];
        let summary = aggregator.summarize(&records, DataSourceMode::Static).unwrap();
        assert_relative_eq!(summary.estimated_cost, 5.0);
        assert_relative_eq!(summary.monthly_distribution[0].cost, 5.0);
    }
}
