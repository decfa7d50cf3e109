#[cfg(test)]
mod live_tests {
    use crate::config::LiveConfig;
    use crate::data_models::DataSourceMode;
    use crate::live::{run_live, SyntheticFeed};
    use crate::summary::Aggregator;
    use approx::assert_relative_eq;

    fn fast_config(window_size: usize) -> LiveConfig {
        LiveConfig {
            window_size,
            tick_interval_ms: 10,
            connect_delay_ms: 5,
            seed: None,
        }
    }

    async fn totals_for_seed(seed: u64, ticks: u64) -> Vec<f64> {
        let mut totals = Vec::new();
        run_live(
            &fast_config(50),
            &Aggregator::default(),
            SyntheticFeed::seeded(seed),
            Some(ticks),
            |update| totals.push(update.latest.total),
        )
        .await
        .unwrap();
        totals
    }

    #[tokio::test(start_paused = true)]
    async fn test_equal_seeds_stream_the_same_readings() {
        let a = totals_for_seed(11, 8).await;
        let b = totals_for_seed(11, 8).await;
        let c = totals_for_seed(12, 8).await;
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a[0], 2.5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_summary_covers_only_retained_readings() {
        let mut last_summary = None;
        let window = run_live(
            &fast_config(4),
            &Aggregator::default(),
            SyntheticFeed::seeded(5),
            Some(10),
            |update| last_summary = Some(update.summary),
        )
        .await
        .unwrap();

        let summary = last_summary.unwrap();
        assert_eq!(window.len(), 4);
        assert_eq!(summary.mode, DataSourceMode::Live);
        let retained: f64 = window.records().iter().map(|r| r.total).sum();
        assert_relative_eq!(summary.total_consumption, retained, epsilon = 1e-9);
    }
}
