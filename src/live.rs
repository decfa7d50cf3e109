//! Synthetic live feed.
//!
//! A seeded random walk stands in for a real meter. The window is a bounded
//! FIFO; after every append the whole window is summarized again.

use crate::config::LiveConfig;
use crate::data_models::{DataSourceMode, DatasetSummary, EnergyRecord};
use crate::errors::SummaryError;
use crate::metrics::METRICS;
use crate::summary::Aggregator;
use chrono::{DateTime, Utc};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

/// Generator of synthetic readings with an injected RNG.
pub struct SyntheticFeed {
    rng: StdRng,
}

impl SyntheticFeed {
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Self {
        Self { rng }
    }

    /// The fixed warm-up reading emitted when a stream connects.
    pub fn first_record(&self, now: DateTime<Utc>) -> EnergyRecord {
        EnergyRecord {
            timestamp: now,
            hvac: 1.0,
            lighting: 0.5,
            appliances: 0.5,
            electronics: 0.5,
            total: 2.5,
        }
    }

    /// Draws a base load in [2, 5) and splits it across the categories.
    pub fn next_record(&mut self, now: DateTime<Utc>) -> EnergyRecord {
        let base = 2.0 + self.rng.gen::<f64>() * 3.0;
        EnergyRecord {
            timestamp: now,
            hvac: base * 0.4,
            lighting: base * 0.2,
            appliances: base * 0.25,
            electronics: base * 0.15,
            total: base,
        }
    }
}

/// Bounded sliding window holding the most recent records, oldest first.
#[derive(Debug, Clone)]
pub struct LiveWindow {
    capacity: usize,
    records: VecDeque<EnergyRecord>,
}

impl LiveWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a record, evicting the oldest once the window is full.
    pub fn push(&mut self, record: EnergyRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn latest(&self) -> Option<&EnergyRecord> {
        self.records.back()
    }

    pub fn records(&self) -> Vec<EnergyRecord> {
        self.records.iter().cloned().collect()
    }

    /// Full recompute over the current window in live mode.
    pub fn summarize(&self, aggregator: &Aggregator) -> Result<DatasetSummary, SummaryError> {
        aggregator.summarize(&self.records(), DataSourceMode::Live)
    }
}

/// One update delivered to the live consumer.
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    pub tick: u64,
    pub latest: EnergyRecord,
    pub summary: DatasetSummary,
}

/// Runs the synthetic stream: waits the connect delay, seeds the window with
/// the warm-up reading, then appends one reading per tick and hands every
/// recomputed summary to `on_update`. Returns the final window once
/// `max_ticks` ticks have run; runs until the task is dropped otherwise.
pub async fn run_live<F>(
    config: &LiveConfig,
    aggregator: &Aggregator,
    mut feed: SyntheticFeed,
    max_ticks: Option<u64>,
    mut on_update: F,
) -> Result<LiveWindow, SummaryError>
where
    F: FnMut(LiveUpdate),
{
    info!(
        "Connecting live feed (window {}, tick {:?})",
        config.window_size,
        config.tick_interval()
    );
    tokio::time::sleep(config.connect_delay()).await;

    let mut window = LiveWindow::new(config.window_size);
    let warm_up = feed.first_record(Utc::now());
    window.push(warm_up.clone());
    on_update(LiveUpdate {
        tick: 0,
        latest: warm_up,
        summary: window.summarize(aggregator)?,
    });
    METRICS.lock().record_summary();

    let mut interval = tokio::time::interval(config.tick_interval());
    // The first tick of a tokio interval completes immediately
    interval.tick().await;

    let mut tick = 0u64;
    while max_ticks.map_or(true, |max| tick < max) {
        interval.tick().await;
        tick += 1;

        let record = feed.next_record(Utc::now());
        window.push(record.clone());
        let summary = window.summarize(aggregator)?;
        {
            let mut metrics = METRICS.lock();
            metrics.record_live_tick();
            metrics.record_summary();
        }
        debug!("Live tick {}: {:.2} kWh, window {}", tick, record.total, window.len());
        on_update(LiveUpdate {
            tick,
            latest: record,
            summary,
        });
    }

    Ok(window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_seeded_feeds_are_deterministic() {
        let mut a = SyntheticFeed::seeded(7);
        let mut b = SyntheticFeed::seeded(7);
        for i in 0..20 {
            let now = t0() + Duration::seconds(3 * i);
            assert_eq!(a.next_record(now), b.next_record(now));
        }
    }

    #[test]
    fn test_generated_records_respect_split_and_range() {
        let mut feed = SyntheticFeed::seeded(42);
        for _ in 0..200 {
            let record = feed.next_record(t0());
            assert!(record.total >= 2.0 && record.total < 5.0);
            assert!((record.category_sum() - record.total).abs() < 1e-9);
            assert!((record.hvac - record.total * 0.4).abs() < 1e-12);
        }
    }

    #[test]
    fn test_first_record_is_fixed() {
        let feed = SyntheticFeed::seeded(1);
        let record = feed.first_record(t0());
        assert_eq!(record.total, 2.5);
        assert_eq!(record.category_sum(), 2.5);
    }

    #[test]
    fn test_window_evicts_oldest() {
        let mut feed = SyntheticFeed::seeded(3);
        let mut window = LiveWindow::new(5);
        for i in 0..12 {
            window.push(feed.next_record(t0() + Duration::seconds(i)));
            assert!(window.len() <= 5);
        }
        let records = window.records();
        assert_eq!(records.len(), 5);
        assert_eq!(records[0].timestamp, t0() + Duration::seconds(7));
        assert_eq!(window.latest().unwrap().timestamp, t0() + Duration::seconds(11));
    }

    #[test]
    fn test_empty_window_cannot_be_summarized() {
        let window = LiveWindow::new(3);
        assert_eq!(window.summarize(&Aggregator::default()).unwrap_err(), SummaryError::EmptyInput);
        assert_eq!(LiveWindow::new(0).capacity(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_live_delivers_every_tick() {
        let config = LiveConfig {
            window_size: 3,
            tick_interval_ms: 3000,
            connect_delay_ms: 1500,
            seed: Some(9),
        };
        let mut updates = Vec::new();
        let window = run_live(
            &config,
            &Aggregator::default(),
            SyntheticFeed::seeded(9),
            Some(5),
            |update| updates.push(update),
        )
        .await
        .unwrap();

        assert_eq!(updates.len(), 6);
        assert_eq!(updates[0].tick, 0);
        assert_eq!(updates[0].latest.total, 2.5);
        assert!(updates.iter().all(|u| u.summary.mode == DataSourceMode::Live));
        assert_eq!(window.len(), 3);
        assert_eq!(window.latest(), Some(&updates[5].latest));
    }
}
