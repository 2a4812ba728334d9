//! Shard model and readiness waiting
//!
//! A topic is ready once every one of its shards is `ACTIVE` or `CLOSED`.

mod source;
mod state;
mod status;
mod waiter;

pub use source::{source_fn, FnSource, ShardSource};
pub use state::{Shard, ShardSnapshot, ShardState};
pub use status::{saturating_millis, TopicStatusBoard, TopicStatusView, WaitPhase};
pub use waiter::{
    timeout_from_secs, wait_all_shards_ready, wait_all_shards_ready_with_time, ReadinessWaiter,
    WaitOutcome, WaitSettings, DEFAULT_ERROR_RETRY_INTERVAL, DEFAULT_POLL_INTERVAL,
    DEFAULT_WAIT_TIMEOUT_SECS,
};
