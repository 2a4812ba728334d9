//! Shard model
//!
//! Shards as DataHub reports them from ListShard. The waiter only reads
//! these; nothing in this crate changes a shard's state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a shard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShardState {
    /// Shard is being created
    Opening,
    /// Shard accepts reads and writes
    Active,
    /// Shard is being closed (split/merge in progress)
    Closing,
    /// Shard is closed and read-only
    Closed,
    /// Any state this client does not know about
    #[serde(other)]
    Unknown,
}

impl ShardState {
    /// Returns true if the shard has settled (`ACTIVE` or `CLOSED`)
    pub fn is_acceptable(&self) -> bool {
        matches!(self, ShardState::Active | ShardState::Closed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ShardState::Opening => "OPENING",
            ShardState::Active => "ACTIVE",
            ShardState::Closing => "CLOSING",
            ShardState::Closed => "CLOSED",
            ShardState::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ShardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One shard entry of a ListShard response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Shard {
    pub shard_id: String,
    pub state: ShardState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_hash_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_hash_key: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_shard_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_shard_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_shard_id: Option<String>,
    /// Epoch seconds at which the shard closed (0 while open)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Shard {
    /// Minimal shard with only id and state set
    pub fn new(shard_id: impl Into<String>, state: ShardState) -> Self {
        Self {
            shard_id: shard_id.into(),
            state,
            begin_hash_key: None,
            end_hash_key: None,
            parent_shard_ids: Vec::new(),
            left_shard_id: None,
            right_shard_id: None,
            closed_time: None,
            address: None,
        }
    }
}

/// Shards observed by a single poll, evaluated as a unit
#[derive(Debug, Clone, Default)]
pub struct ShardSnapshot {
    shards: Vec<Shard>,
}

impl ShardSnapshot {
    pub fn new(shards: Vec<Shard>) -> Self {
        Self { shards }
    }

    pub fn shards(&self) -> &[Shard] {
        &self.shards
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Count of shards in an acceptable state
    pub fn acceptable_count(&self) -> usize {
        self.shards.iter().filter(|s| s.state.is_acceptable()).count()
    }

    /// True when every shard is acceptable. An empty snapshot qualifies.
    pub fn all_acceptable(&self) -> bool {
        self.shards.iter().all(|s| s.state.is_acceptable())
    }

    /// Shards still in a transitional (or unknown) state
    pub fn unsettled(&self) -> impl Iterator<Item = &Shard> {
        self.shards.iter().filter(|s| !s.state.is_acceptable())
    }
}
