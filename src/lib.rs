//! DataHub shard waiter
//!
//! Waits for every shard of a DataHub topic to reach `ACTIVE` or `CLOSED`:
//! - Polls ListShard through a pluggable [`shard::ShardSource`]
//! - Races an optional deadline and supports explicit cancellation
//! - Tracks per-topic progress for health/ready endpoints
//! - Exports Prometheus metrics for observability

pub mod config;
pub mod datahub;
pub mod error;
pub mod health;
pub mod metrics;
pub mod shard;

pub use datahub::{RestShardSource, TopicRef};
pub use error::WaiterError;
pub use shard::{ReadinessWaiter, ShardSource, WaitOutcome, WaitSettings};
