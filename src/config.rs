//! Waiter configuration module
//!
//! Handles loading configuration from environment variables (and `.env`).

use crate::datahub::TopicRef;
use crate::error::WaiterError;
use crate::shard::{timeout_from_secs, WaitSettings, DEFAULT_WAIT_TIMEOUT_SECS};
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Waiter configuration
#[derive(Debug, Clone)]
pub struct WaiterConfig {
    /// DataHub endpoint, e.g. `https://dh-cn-hangzhou.aliyuncs.com`
    pub endpoint: String,

    /// Project owning the topics
    pub project: String,

    /// Topics to wait for (comma-separated in `DATAHUB_TOPICS`)
    pub topics: Vec<String>,

    /// Pre-computed `Authorization` header value, if the endpoint needs one
    pub authorization: Option<String>,

    /// Wait timeout in seconds; zero or negative waits indefinitely
    pub wait_timeout_secs: i64,

    /// Pause after a poll that found unsettled shards
    pub poll_interval: Duration,

    /// Pause after a failed poll
    pub error_retry_interval: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,

    /// Health/metrics HTTP port
    pub http_port: u16,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Exit as soon as every topic is ready instead of serving until shutdown
    pub exit_on_ready: bool,
}

fn parse_var<T>(value: Option<String>, name: &str, default: &str) -> Result<T, WaiterError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse()
        .map_err(|e| WaiterError::Config(format!("{name} is invalid: {e}")))
}

fn parse_bool(value: Option<String>, name: &str, default: bool) -> Result<bool, WaiterError> {
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(default),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some("0") | Some("false") | Some("no") => Ok(false),
        Some(other) => Err(WaiterError::Config(format!(
            "{name} must be true or false, got '{other}'"
        ))),
    }
}

impl WaiterConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, WaiterError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, WaiterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = lookup("DATAHUB_ENDPOINT")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| WaiterError::Config("DATAHUB_ENDPOINT must be set".to_string()))?
            .trim()
            .trim_end_matches('/')
            .to_string();

        let project = lookup("DATAHUB_PROJECT")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| WaiterError::Config("DATAHUB_PROJECT must be set".to_string()))?
            .trim()
            .to_string();

        let topics: Vec<String> = lookup("DATAHUB_TOPICS")
            .or_else(|| lookup("DATAHUB_TOPIC"))
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        if topics.is_empty() {
            return Err(WaiterError::Config(
                "DATAHUB_TOPICS must list at least one topic".to_string(),
            ));
        }

        let authorization = lookup("DATAHUB_AUTHORIZATION").filter(|v| !v.trim().is_empty());

        let wait_timeout_secs = parse_var(
            lookup("WAIT_TIMEOUT_SECS"),
            "WAIT_TIMEOUT_SECS",
            &DEFAULT_WAIT_TIMEOUT_SECS.to_string(),
        )?;

        let poll_interval_ms: u64 = parse_var(lookup("POLL_INTERVAL_MS"), "POLL_INTERVAL_MS", "1000")?;
        let error_retry_interval_ms: u64 = parse_var(
            lookup("ERROR_RETRY_INTERVAL_MS"),
            "ERROR_RETRY_INTERVAL_MS",
            "500",
        )?;
        if poll_interval_ms == 0 || error_retry_interval_ms == 0 {
            return Err(WaiterError::Config(
                "POLL_INTERVAL_MS and ERROR_RETRY_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let request_timeout_secs: u64 =
            parse_var(lookup("REQUEST_TIMEOUT_SECS"), "REQUEST_TIMEOUT_SECS", "10")?;

        let http_port = parse_var(
            lookup("HTTP_PORT").or_else(|| lookup("METRICS_PORT")),
            "HTTP_PORT",
            "9090",
        )?;

        let log_level = lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let exit_on_ready = parse_bool(lookup("EXIT_ON_READY"), "EXIT_ON_READY", true)?;

        Ok(Self {
            endpoint,
            project,
            topics,
            authorization,
            wait_timeout_secs,
            poll_interval: Duration::from_millis(poll_interval_ms),
            error_retry_interval: Duration::from_millis(error_retry_interval_ms),
            request_timeout: Duration::from_secs(request_timeout_secs),
            http_port,
            log_level,
            exit_on_ready,
        })
    }

    /// Validated topic references for every configured topic
    pub fn topic_refs(&self) -> Result<Vec<TopicRef>, WaiterError> {
        self.topics
            .iter()
            .map(|topic| TopicRef::new(self.project.clone(), topic.clone()))
            .collect()
    }

    pub fn wait_settings(&self) -> WaitSettings {
        WaitSettings {
            poll_interval: self.poll_interval,
            error_retry_interval: self.error_retry_interval,
        }
    }

    /// Deadline for each wait, `None` when waiting indefinitely
    pub fn wait_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.wait_timeout_secs)
    }
}
