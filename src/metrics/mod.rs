//! Prometheus metrics module
//!
//! Recording goes through the `metrics` facade, so the free functions below
//! are no-ops until [`WaiterMetrics::install`] has set a recorder.

use crate::datahub::TopicRef;
use crate::error::WaiterError;
use ::metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Duration;

/// Owns the Prometheus recorder handle used by `/metrics`
#[derive(Clone)]
pub struct WaiterMetrics {
    handle: Arc<PrometheusHandle>,
}

impl WaiterMetrics {
    /// Install the global Prometheus recorder
    ///
    /// Fails if a recorder is already installed in this process.
    pub fn install() -> Result<Self, WaiterError> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| WaiterError::Config(format!("failed to install Prometheus recorder: {e}")))?;

        Self::register_metrics();

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    fn register_metrics() {
        describe_counter!(
            "shard_waiter_polls_total",
            Unit::Count,
            "ListShard polls issued, by result"
        );
        describe_counter!(
            "shard_waiter_source_errors_total",
            Unit::Count,
            "Failed ListShard polls"
        );

        describe_histogram!(
            "shard_waiter_wait_duration_seconds",
            Unit::Seconds,
            "Time from first poll to wait outcome"
        );

        describe_gauge!(
            "shard_waiter_shards",
            Unit::Count,
            "Shards seen in the latest snapshot"
        );
        describe_gauge!(
            "shard_waiter_shards_acceptable",
            Unit::Count,
            "Shards in ACTIVE or CLOSED state in the latest snapshot"
        );
        describe_gauge!(
            "shard_waiter_topics_ready",
            Unit::Count,
            "Topics whose shards have all settled"
        );
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Record a poll that returned a snapshot
pub fn record_snapshot(topic: &TopicRef, acceptable: usize, total: usize) {
    let ready = acceptable == total;
    counter!(
        "shard_waiter_polls_total",
        "topic" => topic.to_string(),
        "result" => if ready { "ready" } else { "not_ready" }
    )
    .increment(1);

    gauge!("shard_waiter_shards", "topic" => topic.to_string()).set(total as f64);
    gauge!("shard_waiter_shards_acceptable", "topic" => topic.to_string()).set(acceptable as f64);
}

/// Record a poll that failed
pub fn record_source_error(topic: &TopicRef, error: &WaiterError) {
    counter!(
        "shard_waiter_polls_total",
        "topic" => topic.to_string(),
        "result" => "error"
    )
    .increment(1);

    counter!(
        "shard_waiter_source_errors_total",
        "topic" => topic.to_string(),
        "error_type" => error.error_type_label()
    )
    .increment(1);
}

/// Record how a wait ended
pub fn record_wait_finished(topic: &TopicRef, outcome: &'static str, elapsed: Duration) {
    histogram!(
        "shard_waiter_wait_duration_seconds",
        "topic" => topic.to_string(),
        "outcome" => outcome
    )
    .record(elapsed.as_secs_f64());
}

/// Set count of ready topics
pub fn set_topics_ready(count: usize) {
    gauge!("shard_waiter_topics_ready").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_without_recorder_is_noop() {
        let topic = TopicRef::new("analytics", "t1").unwrap();
        record_snapshot(&topic, 1, 2);
        record_source_error(&topic, &WaiterError::opaque("down"));
        record_wait_finished(&topic, "ready", Duration::from_millis(5));
        set_topics_ready(1);
    }
}
