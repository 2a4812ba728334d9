//! DataHub ListShard over REST
//!
//! `GET {endpoint}/projects/{project}/topics/{topic}/shards`

use crate::config::WaiterConfig;
use crate::datahub::TopicRef;
use crate::error::WaiterError;
use crate::shard::{Shard, ShardSource};

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CLIENT_VERSION_HEADER: &str = "x-datahub-client-version";
const CLIENT_VERSION: &str = "1.1";
const REQUEST_ID_HEADER: &str = "x-datahub-request-id";

/// Decoded ListShard response
#[derive(Debug, Clone)]
pub struct ListShardResult {
    pub shards: Vec<Shard>,
    pub request_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListShardBody {
    #[serde(default)]
    shards: Vec<Shard>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ErrorBody {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Shard source backed by the DataHub REST API
#[derive(Debug, Clone)]
pub struct RestShardSource {
    client: Client,
    endpoint: String,
}

impl RestShardSource {
    /// Create a source for `endpoint`
    ///
    /// `authorization` is sent verbatim as the `Authorization` header.
    pub fn new(
        endpoint: impl Into<String>,
        request_timeout: Duration,
        authorization: Option<&str>,
    ) -> Result<Self, WaiterError> {
        let endpoint = endpoint.into().trim_end_matches('/').to_string();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(WaiterError::Config(format!(
                "endpoint must start with http:// or https://, got '{endpoint}'"
            )));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(CLIENT_VERSION_HEADER, HeaderValue::from_static(CLIENT_VERSION));
        if let Some(auth) = authorization {
            let mut value = HeaderValue::from_str(auth)
                .map_err(|e| WaiterError::Config(format!("authorization header is invalid: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| WaiterError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &WaiterConfig) -> Result<Self, WaiterError> {
        Self::new(
            config.endpoint.clone(),
            config.request_timeout,
            config.authorization.as_deref(),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn shards_url(&self, topic: &TopicRef) -> String {
        format!(
            "{}/projects/{}/topics/{}/shards",
            self.endpoint,
            topic.project(),
            topic.topic()
        )
    }

    /// List the shards of `topic`
    pub async fn list_shard(&self, topic: &TopicRef) -> Result<ListShardResult, WaiterError> {
        let url = self.shards_url(topic);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| WaiterError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes()
            .await
            .map_err(|source| WaiterError::Request {
                url: url.clone(),
                source,
            })?;

        if !status.is_success() {
            return Err(api_error(status, &body, request_id));
        }

        let decoded: ListShardBody = serde_json::from_slice(&body).map_err(|source| {
            WaiterError::Decode {
                what: "ListShard",
                source,
            }
        })?;

        debug!(
            topic = %topic,
            shards = decoded.shards.len(),
            request_id = request_id.as_deref().unwrap_or("-"),
            "Listed shards"
        );

        Ok(ListShardResult {
            shards: decoded.shards,
            request_id,
        })
    }
}

/// Build an API error, falling back to the status text when the body is not DataHub JSON
fn api_error(status: StatusCode, body: &[u8], request_id: Option<String>) -> WaiterError {
    let (code, message) = match serde_json::from_slice::<ErrorBody>(body) {
        Ok(err) if !err.error_code.is_empty() => (err.error_code, err.error_message),
        _ => (
            status
                .canonical_reason()
                .unwrap_or("Unknown")
                .replace(' ', ""),
            String::from_utf8_lossy(body).trim().to_string(),
        ),
    };

    WaiterError::Api {
        status: status.as_u16(),
        code,
        message,
        request_id,
    }
}

impl ShardSource for RestShardSource {
    async fn list_shards(&self, topic: &TopicRef) -> Result<Vec<Shard>, WaiterError> {
        Ok(self.list_shard(topic).await?.shards)
    }
}
