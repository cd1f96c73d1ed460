//! # Telemetry
//!
//! The aggregation counters show up in the Prometheus exposition once real
//! tasks have run.

#[cfg(test)]
mod tests {
    use crate::integration::support::{equal_stake_operators, AggregatorHarness, PriceUpdate};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_exposition_contains_aggregation_metrics() {
        let mut h = AggregatorHarness::new(equal_stake_operators(2, 100));
        let update = PriceUpdate::new(1, 1);

        h.init(900, 50, Duration::from_secs(5), Duration::ZERO)
            .unwrap();
        h.submit(900, 0, &update).await.unwrap();
        h.next_response().await.unwrap();

        let exposition = avs_telemetry::gather_metrics().unwrap();
        for name in [
            "avs_aggregation_tasks_initialized_total",
            "avs_aggregation_tasks_completed_total",
            "avs_aggregation_signatures_accepted_total",
            "avs_aggregation_active_tasks",
        ] {
            assert!(exposition.contains(name), "missing {name}");
        }
    }
}
