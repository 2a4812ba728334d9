//! Domain error types for the shard waiter
//!
//! main.rs is the ONLY module allowed to use anyhow::Result (process boundary).
//! All library code returns Result<T, WaiterError>.

use thiserror::Error;

/// Shard waiter domain errors
///
/// Every variant carries structured context fields for diagnostics.
/// On-call engineers can pattern-match on the variant to understand
/// the failure mode without parsing error message strings.
///
/// Example log output:
/// ```text
/// WaiterError::Api { status: 404, code: "NoSuchTopic", .. }
/// → "DataHub returned 404 NoSuchTopic: topic does not exist (request id: 2023...)"
/// ```
#[derive(Error, Debug)]
pub enum WaiterError {
    /// A project or topic name failed validation
    #[error("invalid {field}: '{value}'")]
    InvalidParameter { field: &'static str, value: String },

    /// The HTTP request to DataHub could not be completed
    #[error("request to '{url}' failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// DataHub answered with a non-success status
    #[error("DataHub returned {status} {code}: {message} (request id: {})", .request_id.as_deref().unwrap_or("-"))]
    Api {
        status: u16,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// Response body did not match the expected shape
    #[error("failed to decode {what} response")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Opaque failure from a custom shard source
    #[error("shard source failed: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Configuration error (environment variable missing or invalid)
    #[error("configuration error: {0}")]
    Config(String),
}

impl WaiterError {
    /// Returns a static label string suitable for Prometheus metrics.
    ///
    /// Used as the `error_type` label on `shard_waiter_source_errors_total`.
    pub fn error_type_label(&self) -> &'static str {
        match self {
            Self::InvalidParameter { .. } => "invalid_parameter",
            Self::Request { .. } => "request",
            Self::Api { .. } => "api",
            Self::Decode { .. } => "decode",
            Self::Source(_) => "source",
            Self::Config(_) => "config",
        }
    }

    /// Wrap any error as an opaque source failure
    pub fn opaque<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Source(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_error() -> Box<dyn std::error::Error + Send + Sync> {
        Box::new(std::io::Error::new(std::io::ErrorKind::Other, "test"))
    }

    #[test]
    fn every_variant_has_distinct_error_type_label() {
        // Request needs a live reqwest::Error, so its label is checked by name below
        let labels = [
            WaiterError::InvalidParameter {
                field: "project name",
                value: "x".to_string(),
            }
            .error_type_label(),
            WaiterError::Api {
                status: 500,
                code: "InternalServerError".to_string(),
                message: "boom".to_string(),
                request_id: None,
            }
            .error_type_label(),
            WaiterError::Decode {
                what: "ListShard",
                source: serde_json::from_str::<()>("invalid").unwrap_err(),
            }
            .error_type_label(),
            WaiterError::Source(test_error()).error_type_label(),
            WaiterError::Config("test".to_string()).error_type_label(),
            "request",
        ];

        let mut unique = labels.to_vec();
        unique.sort();
        unique.dedup();
        assert_eq!(labels.len(), unique.len(), "Duplicate error_type_label found");
    }

    #[test]
    fn api_error_message_contains_context() {
        let err = WaiterError::Api {
            status: 404,
            code: "NoSuchTopic".to_string(),
            message: "topic does not exist".to_string(),
            request_id: Some("20231019abc".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("404"));
        assert!(msg.contains("NoSuchTopic"));
        assert!(msg.contains("20231019abc"));

        let err = WaiterError::Api {
            status: 503,
            code: "ServiceUnavailable".to_string(),
            message: "busy".to_string(),
            request_id: None,
        };
        assert!(err.to_string().ends_with("(request id: -)"));
    }

    #[test]
    fn invalid_parameter_names_field_and_value() {
        let err = WaiterError::InvalidParameter {
            field: "topic name",
            value: "9lives".to_string(),
        };
        assert_eq!(err.to_string(), "invalid topic name: '9lives'");
    }

    #[test]
    fn config_error_preserves_message() {
        let err = WaiterError::Config("DATAHUB_ENDPOINT must be set".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: DATAHUB_ENDPOINT must be set"
        );
    }

    #[test]
    fn source_helper_wraps_strings() {
        let err = WaiterError::opaque("connection reset");
        assert_eq!(err.error_type_label(), "source");
        assert_eq!(err.to_string(), "shard source failed: connection reset");
    }
}
