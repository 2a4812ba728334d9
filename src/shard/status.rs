//! Per-topic wait status
//!
//! Shared between the waiters (writers) and the health endpoints (readers).

use crate::datahub::TopicRef;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Milliseconds in `duration`, saturating at `u64::MAX`
pub fn saturating_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Where a topic's wait currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPhase {
    /// Registered, no poll issued yet
    Pending,
    /// Poll loop running
    Polling,
    /// Every shard reached an acceptable state
    Ready,
    /// Deadline elapsed with shards still unsettled
    TimedOut,
    /// Deadline elapsed while the source was failing
    SourceUnavailable,
    /// Wait abandoned by the caller
    Cancelled,
}

impl WaitPhase {
    /// Returns true once no further transitions can happen
    pub fn is_done(&self) -> bool {
        !matches!(self, WaitPhase::Pending | WaitPhase::Polling)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, WaitPhase::Ready)
    }
}

#[derive(Debug)]
struct TopicStatusEntry {
    phase: WaitPhase,
    polls: AtomicU64,
    source_errors: AtomicU64,
    shards_total: usize,
    shards_acceptable: usize,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Default for TopicStatusEntry {
    fn default() -> Self {
        Self {
            phase: WaitPhase::Pending,
            polls: AtomicU64::new(0),
            source_errors: AtomicU64::new(0),
            shards_total: 0,
            shards_acceptable: 0,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Point-in-time view of one topic, as served by `/ready`
#[derive(Debug, Clone, Serialize)]
pub struct TopicStatusView {
    pub topic: String,
    pub phase: WaitPhase,
    pub polls: u64,
    pub source_errors: u64,
    pub shards_total: usize,
    pub shards_acceptable: usize,
    pub elapsed_ms: Option<u64>,
}

/// Shared status across all waited topics
#[derive(Debug, Clone, Default)]
pub struct TopicStatusBoard {
    inner: Arc<DashMap<TopicRef, TopicStatusEntry>>,
}

impl TopicStatusBoard {
    /// Create a board with every topic in `Pending`
    pub fn new(topics: impl IntoIterator<Item = TopicRef>) -> Self {
        let inner = DashMap::new();
        for topic in topics {
            inner.insert(topic, TopicStatusEntry::default());
        }
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Start a fresh wait on `topic`, registering it if needed
    ///
    /// Clears the previous wait's outcome and timings; counters keep running.
    pub fn begin_wait(&self, topic: &TopicRef) {
        let mut entry = self.inner.entry(topic.clone()).or_default();
        entry.phase = WaitPhase::Polling;
        entry.started_at = Some(Instant::now());
        entry.finished_at = None;
    }

    /// Update a topic's phase, registering the topic if needed
    ///
    /// Finished phases are sticky until the next [`begin_wait`](Self::begin_wait).
    pub fn set_phase(&self, topic: &TopicRef, phase: WaitPhase) {
        let mut entry = self.inner.entry(topic.clone()).or_default();
        if entry.phase.is_done() {
            return;
        }
        entry.phase = phase;
        if phase == WaitPhase::Polling && entry.started_at.is_none() {
            entry.started_at = Some(Instant::now());
        }
        if phase.is_done() {
            entry.finished_at = Some(Instant::now());
        }
    }

    /// Record a successful poll and the counts it observed
    pub fn record_poll(&self, topic: &TopicRef, acceptable: usize, total: usize) {
        if let Some(mut entry) = self.inner.get_mut(topic) {
            entry.polls.fetch_add(1, Ordering::Relaxed);
            entry.shards_acceptable = acceptable;
            entry.shards_total = total;
        }
    }

    /// Record a failed poll
    pub fn record_source_error(&self, topic: &TopicRef) {
        if let Some(entry) = self.inner.get(topic) {
            entry.polls.fetch_add(1, Ordering::Relaxed);
            entry.source_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn phase(&self, topic: &TopicRef) -> Option<WaitPhase> {
        self.inner.get(topic).map(|e| e.phase)
    }

    pub fn topic_count(&self) -> usize {
        self.inner.len()
    }

    pub fn ready_topics(&self) -> usize {
        self.inner.iter().filter(|e| e.phase.is_ready()).count()
    }

    /// True when at least one topic is registered and all of them are ready
    pub fn all_ready(&self) -> bool {
        self.topic_count() > 0 && self.ready_topics() == self.topic_count()
    }

    /// Snapshot every topic, sorted by name
    pub fn views(&self) -> Vec<TopicStatusView> {
        let mut views: Vec<_> = self
            .inner
            .iter()
            .map(|e| {
                let elapsed_ms = e.started_at.map(|start| {
                    let end = e.finished_at.unwrap_or_else(Instant::now);
                    saturating_millis(end.saturating_duration_since(start))
                });
                TopicStatusView {
                    topic: e.key().to_string(),
                    phase: e.phase,
                    polls: e.polls.load(Ordering::Relaxed),
                    source_errors: e.source_errors.load(Ordering::Relaxed),
                    shards_total: e.shards_total,
                    shards_acceptable: e.shards_acceptable,
                    elapsed_ms,
                }
            })
            .collect();
        views.sort_by(|a, b| a.topic.cmp(&b.topic));
        views
    }
}
