use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Global metrics instance
pub static METRICS: Lazy<Mutex<Metrics>> = Lazy::new(|| Mutex::new(Metrics::new()));

/// Audit run metrics tracker
#[derive(Debug, Default)]
pub struct Metrics {
    pub total_files_attempted: u64,
    pub total_files_successful: u64,
    pub total_files_failed: u64,
    pub total_rows_read: u64,
    pub total_rows_dropped: u64,
    pub total_records_normalized: u64,
    pub total_summaries_computed: u64,
    pub total_live_ticks: u64,
    pub total_insight_fallbacks: u64,
    pub processing_times: HashMap<String, Duration>,
    pub start_time: Option<Instant>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            start_time: Some(Instant::now()),
            ..Default::default()
        }
    }

    pub fn record_file_attempt(&mut self) {
        self.total_files_attempted += 1;
    }

    pub fn record_file_success(&mut self) {
        self.total_files_successful += 1;
    }

    pub fn record_file_failure(&mut self) {
        self.total_files_failed += 1;
    }

    pub fn record_rows(&mut self, read: u64, dropped: u64) {
        self.total_rows_read += read;
        self.total_rows_dropped += dropped;
        self.total_records_normalized += read.saturating_sub(dropped);
    }

    pub fn record_summary(&mut self) {
        self.total_summaries_computed += 1;
    }

    pub fn record_live_tick(&mut self) {
        self.total_live_ticks += 1;
    }

    pub fn record_insight_fallback(&mut self) {
        self.total_insight_fallbacks += 1;
    }

    pub fn record_processing_time(&mut self, operation: String, duration: Duration) {
        self.processing_times.insert(operation, duration);
    }

    pub fn get_total_duration(&self) -> Duration {
        self.start_time.map(|start| start.elapsed()).unwrap_or_default()
    }

    pub fn get_throughput(&self) -> f64 {
        let duration_secs = self.get_total_duration().as_secs_f64();
        if duration_secs > 0.0 {
            self.total_rows_read as f64 / duration_secs
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        let duration = self.get_total_duration();
        eprintln!("\n========== Audit Metrics Summary ==========");
        eprintln!("Total Duration: {:.2?}", duration);
        eprintln!("Files Attempted: {}", self.total_files_attempted);
        eprintln!("Files Successful: {}", self.total_files_successful);
        eprintln!("Files Failed: {}", self.total_files_failed);
        eprintln!("Rows Read: {}", self.total_rows_read);
        eprintln!("Rows Dropped: {}", self.total_rows_dropped);
        eprintln!("Records Normalized: {}", self.total_records_normalized);
        eprintln!("Summaries Computed: {}", self.total_summaries_computed);
        eprintln!("Live Ticks: {}", self.total_live_ticks);
        eprintln!("Insight Fallbacks: {}", self.total_insight_fallbacks);
        eprintln!("Throughput: {:.2} rows/sec", self.get_throughput());

        if !self.processing_times.is_empty() {
            eprintln!("\nProcessing Times:");
            for (op, duration) in &self.processing_times {
                eprintln!("  {}: {:.2?}", op, duration);
            }
        }
        eprintln!("===========================================\n");
    }
}

/// Helper macro to time an operation
#[macro_export]
macro_rules! time_operation {
    ($name:expr, $op:expr) => {{
        let start = std::time::Instant::now();
        let result = $op;
        let duration = start.elapsed();
        $crate::metrics::METRICS
            .lock()
            .record_processing_time($name.to_string(), duration);
        result
    }};
}
