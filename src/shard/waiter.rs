//! Shard readiness waiter
//!
//! Polls a [`ShardSource`] until every shard of a topic is `ACTIVE` or
//! `CLOSED`, racing an optional deadline. Two units run concurrently:
//!
//! - the poll loop, spawned as its own task
//! - the deadline, a plain sleep in the caller's task
//!
//! Whichever finishes first decides the outcome. The loser is cancelled
//! through a child [`CancellationToken`] and the poll task is aborted, so a
//! timed-out wait leaves nothing running behind it.
//!
//! Source errors never end a wait. They count as "not ready yet" and are
//! retried after `error_retry_interval`. A poll task that panics is treated
//! the same way: the failure is recorded and a fresh loop is spawned.

use crate::datahub::TopicRef;
use crate::error::WaiterError;
use crate::metrics;
use crate::shard::source::ShardSource;
use crate::shard::state::ShardSnapshot;
use crate::shard::status::{saturating_millis, TopicStatusBoard, WaitPhase};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Pause after a snapshot with unsettled shards
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Pause after a failed fetch
pub const DEFAULT_ERROR_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Timeout used by [`wait_all_shards_ready`]
pub const DEFAULT_WAIT_TIMEOUT_SECS: i64 = 60;

/// Poll pacing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub poll_interval: Duration,
    pub error_retry_interval: Duration,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            error_retry_interval: DEFAULT_ERROR_RETRY_INTERVAL,
        }
    }
}

/// Convert a timeout in seconds; zero or negative means no deadline
pub fn timeout_from_secs(secs: i64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs.unsigned_abs()))
}

/// How a wait ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitOutcome {
    /// A poll observed every shard in an acceptable state
    Ready { polls: u64, elapsed: Duration },
    /// Deadline elapsed; the latest poll succeeded but shards were unsettled
    TimedOut { polls: u64 },
    /// Deadline elapsed while the latest poll had failed
    SourceUnavailable { polls: u64, last_error: String },
    /// The caller cancelled the wait
    Cancelled,
}

impl WaitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, WaitOutcome::Ready { .. })
    }

    /// Static label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            WaitOutcome::Ready { .. } => "ready",
            WaitOutcome::TimedOut { .. } => "timed_out",
            WaitOutcome::SourceUnavailable { .. } => "source_unavailable",
            WaitOutcome::Cancelled => "cancelled",
        }
    }

    pub fn phase(&self) -> WaitPhase {
        match self {
            WaitOutcome::Ready { .. } => WaitPhase::Ready,
            WaitOutcome::TimedOut { .. } => WaitPhase::TimedOut,
            WaitOutcome::SourceUnavailable { .. } => WaitPhase::SourceUnavailable,
            WaitOutcome::Cancelled => WaitPhase::Cancelled,
        }
    }
}

/// Latest poll result, readable by the deadline branch
#[derive(Debug, Clone, Default)]
struct PollProgress {
    polls: u64,
    last_error: Option<String>,
}

/// Waits for a topic's shards to settle
pub struct ReadinessWaiter<S> {
    source: Arc<S>,
    settings: WaitSettings,
    status: Option<TopicStatusBoard>,
}

impl<S> ReadinessWaiter<S>
where
    S: ShardSource + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self {
            source,
            settings: WaitSettings::default(),
            status: None,
        }
    }

    pub fn with_settings(mut self, settings: WaitSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Report progress into a shared status board
    pub fn with_status(mut self, status: TopicStatusBoard) -> Self {
        self.status = Some(status);
        self
    }

    pub fn settings(&self) -> &WaitSettings {
        &self.settings
    }

    /// Block until every shard is acceptable or `timeout_secs` elapses
    ///
    /// `timeout_secs <= 0` waits indefinitely. Returns `true` only if a poll
    /// saw every shard in `ACTIVE` or `CLOSED`.
    pub async fn wait_until_ready(&self, topic: &TopicRef, timeout_secs: i64) -> bool {
        let cancel = CancellationToken::new();
        self.wait(topic, timeout_from_secs(timeout_secs), &cancel)
            .await
            .is_ready()
    }

    /// Wait with an explicit deadline and cancellation, reporting why it ended
    pub async fn wait(
        &self,
        topic: &TopicRef,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> WaitOutcome {
        let started = Instant::now();
        let poll_cancel = cancel.child_token();
        let (progress_tx, progress_rx) = watch::channel(PollProgress::default());
        let progress_tx = Arc::new(progress_tx);

        if let Some(ref status) = self.status {
            status.begin_wait(topic);
        }

        info!(
            topic = %topic,
            timeout_secs = timeout.map(|t| t.as_secs()),
            "Waiting for shards to settle"
        );

        let mut poll_task = self.spawn_poll_loop(topic, &poll_cancel, &progress_tx, 0, Duration::ZERO);

        let deadline = async move {
            match timeout {
                Some(timeout) => sleep(timeout).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::pin!(deadline);

        let outcome = loop {
            tokio::select! {
                joined = &mut poll_task => match joined {
                    Ok(Some(polls)) => break WaitOutcome::Ready {
                        polls,
                        elapsed: started.elapsed(),
                    },
                    Ok(None) => break WaitOutcome::Cancelled,
                    Err(e) if e.is_cancelled() => break WaitOutcome::Cancelled,
                    Err(e) => {
                        // A panicking fetch counts as one failed poll
                        let polls = progress_rx.borrow().polls + 1;
                        let failure = WaiterError::opaque(format!("poll task failed: {e}"));
                        error!(topic = %topic, polls, error = %e, "Poll task failed, restarting");

                        metrics::record_source_error(topic, &failure);
                        if let Some(ref status) = self.status {
                            status.record_source_error(topic);
                        }
                        progress_tx.send_replace(PollProgress {
                            polls,
                            last_error: Some(failure.to_string()),
                        });

                        poll_task = self.spawn_poll_loop(
                            topic,
                            &poll_cancel,
                            &progress_tx,
                            polls,
                            self.settings.error_retry_interval,
                        );
                    }
                },
                _ = &mut deadline => {
                    let progress = progress_rx.borrow().clone();
                    break match progress.last_error {
                        Some(last_error) => WaitOutcome::SourceUnavailable {
                            polls: progress.polls,
                            last_error,
                        },
                        None => WaitOutcome::TimedOut { polls: progress.polls },
                    };
                }
                _ = cancel.cancelled() => break WaitOutcome::Cancelled,
            }
        };

        poll_cancel.cancel();
        poll_task.abort();

        let elapsed = started.elapsed();
        if let Some(ref status) = self.status {
            status.set_phase(topic, outcome.phase());
        }
        metrics::record_wait_finished(topic, outcome.label(), elapsed);

        match &outcome {
            WaitOutcome::Ready { polls, .. } => {
                info!(topic = %topic, polls, elapsed_ms = saturating_millis(elapsed), "All shards settled");
            }
            WaitOutcome::TimedOut { polls } => {
                warn!(topic = %topic, polls, elapsed_ms = saturating_millis(elapsed), "Timed out waiting for shards");
            }
            WaitOutcome::SourceUnavailable { polls, last_error } => {
                warn!(topic = %topic, polls, error = %last_error, "Timed out while shard source was failing");
            }
            WaitOutcome::Cancelled => {
                info!(topic = %topic, "Shard wait cancelled");
            }
        }

        outcome
    }

    fn spawn_poll_loop(
        &self,
        topic: &TopicRef,
        cancel: &CancellationToken,
        progress: &Arc<watch::Sender<PollProgress>>,
        polls: u64,
        initial_delay: Duration,
    ) -> JoinHandle<Option<u64>> {
        let poll_loop = PollLoop {
            source: Arc::clone(&self.source),
            topic: topic.clone(),
            settings: self.settings,
            cancel: cancel.clone(),
            progress: Arc::clone(progress),
            status: self.status.clone(),
            polls,
            initial_delay,
        };
        tokio::spawn(poll_loop.run())
    }

    /// Wait on every topic concurrently; true only if all of them became ready
    ///
    /// Each topic gets its own task and the same `timeout`. An empty topic list
    /// is trivially ready.
    pub async fn wait_all(
        self: &Arc<Self>,
        topics: Vec<TopicRef>,
        timeout: Option<Duration>,
        cancel: &CancellationToken,
    ) -> bool {
        let mut handles = Vec::with_capacity(topics.len());

        for topic in topics {
            let waiter = Arc::clone(self);
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                waiter.wait(&topic, timeout, &cancel).await
            }));
        }

        let mut all_ready = true;
        for handle in handles {
            match handle.await {
                Ok(outcome) => all_ready &= outcome.is_ready(),
                Err(e) => {
                    error!(error = %e, "Wait task failed");
                    all_ready = false;
                }
            }
        }
        all_ready
    }
}

/// The polling half of a wait, moved into its own task
struct PollLoop<S> {
    source: Arc<S>,
    topic: TopicRef,
    settings: WaitSettings,
    cancel: CancellationToken,
    progress: Arc<watch::Sender<PollProgress>>,
    status: Option<TopicStatusBoard>,
    /// Polls already issued by earlier loops of the same wait
    polls: u64,
    initial_delay: Duration,
}

impl<S: ShardSource> PollLoop<S> {
    /// Returns the poll count once ready, or `None` if cancelled
    async fn run(self) -> Option<u64> {
        let mut polls = self.polls;

        if !self.initial_delay.is_zero() && !self.pause(self.initial_delay).await {
            return None;
        }

        loop {
            if self.cancel.is_cancelled() {
                return None;
            }

            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                fetched = self.source.list_shards(&self.topic) => fetched,
            };
            polls += 1;

            // The caller may have stopped listening while the fetch was in flight
            if self.cancel.is_cancelled() {
                return None;
            }

            let pause = match fetched {
                Ok(shards) => {
                    let snapshot = ShardSnapshot::new(shards);
                    let acceptable = snapshot.acceptable_count();
                    let total = snapshot.len();

                    metrics::record_snapshot(&self.topic, acceptable, total);
                    if let Some(ref status) = self.status {
                        status.record_poll(&self.topic, acceptable, total);
                    }
                    self.progress.send_replace(PollProgress {
                        polls,
                        last_error: None,
                    });

                    if snapshot.all_acceptable() {
                        return Some(polls);
                    }

                    debug!(
                        topic = %self.topic,
                        polls,
                        acceptable,
                        total,
                        unsettled = ?snapshot.unsettled().map(|s| (s.shard_id.as_str(), s.state.as_str())).collect::<Vec<_>>(),
                        "Shards not settled yet"
                    );
                    self.settings.poll_interval
                }
                Err(e) => {
                    debug!(topic = %self.topic, polls, error = %e, "Shard poll failed, retrying");

                    metrics::record_source_error(&self.topic, &e);
                    if let Some(ref status) = self.status {
                        status.record_source_error(&self.topic);
                    }
                    self.progress.send_replace(PollProgress {
                        polls,
                        last_error: Some(e.to_string()),
                    });
                    self.settings.error_retry_interval
                }
            };

            if !self.pause(pause).await {
                return None;
            }
        }
    }

    /// Sleep for `duration`; false if cancelled first
    async fn pause(&self, duration: Duration) -> bool {
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = sleep(duration) => true,
        }
    }
}

/// Wait with the default timeout
pub async fn wait_all_shards_ready<S>(source: Arc<S>, topic: &TopicRef) -> bool
where
    S: ShardSource + 'static,
{
    wait_all_shards_ready_with_time(source, topic, DEFAULT_WAIT_TIMEOUT_SECS).await
}

/// Wait up to `timeout_secs`; zero or negative waits indefinitely
pub async fn wait_all_shards_ready_with_time<S>(
    source: Arc<S>,
    topic: &TopicRef,
    timeout_secs: i64,
) -> bool
where
    S: ShardSource + 'static,
{
    ReadinessWaiter::new(source)
        .wait_until_ready(topic, timeout_secs)
        .await
}
