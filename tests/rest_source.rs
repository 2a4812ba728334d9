//! RestShardSource against a local stand-in for the DataHub ListShard API

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use datahub_shard_waiter::shard::{ReadinessWaiter, ShardState, WaitSettings};
use datahub_shard_waiter::{RestShardSource, TopicRef, WaiterError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Serve `router` on an ephemeral port and return its base URL
async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Topic `t1` settles after two polls, `garbled` answers 200 with a broken
/// body; any other topic does not exist
async fn list_shards(
    State(calls): State<Arc<AtomicUsize>>,
    Path((project, topic)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    let n = calls.fetch_add(1, Ordering::SeqCst);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    let client_version = headers
        .get("x-datahub-client-version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    if project == "analytics" && topic == "garbled" {
        return (StatusCode::OK, "{\"Shards\": [").into_response();
    }

    if project != "analytics" || topic != "t1" {
        return (
            StatusCode::NOT_FOUND,
            [("x-datahub-request-id", "req-missing".to_string())],
            Json(json!({
                "ErrorCode": "NoSuchTopic",
                "ErrorMessage": "The specified topic name does not exist."
            })),
        )
            .into_response();
    }

    let first = if n < 2 { "OPENING" } else { "ACTIVE" };
    (
        StatusCode::OK,
        [("x-datahub-request-id", format!("req-{n}"))],
        Json(json!({
            "Shards": [
                {"ShardId": "0", "State": first, "BeginHashKey": "00000000000000000000000000000000"},
                {"ShardId": "1", "State": "CLOSED", "ClosedTime": 1697700000,
                 "Address": format!("{auth}|{client_version}")}
            ]
        })),
    )
        .into_response()
}

fn datahub_router(calls: Arc<AtomicUsize>) -> Router {
    Router::new()
        .route("/projects/{project}/topics/{topic}/shards", get(list_shards))
        .with_state(calls)
}

#[tokio::test]
async fn list_shard_decodes_response_and_request_id() {
    let calls = Arc::new(AtomicUsize::new(0));
    let endpoint = spawn_server(datahub_router(Arc::clone(&calls))).await;
    let source = RestShardSource::new(endpoint, Duration::from_secs(5), Some("DATAHUB id:sig")).unwrap();

    let topic = TopicRef::new("analytics", "t1").unwrap();
    let result = source.list_shard(&topic).await.unwrap();

    assert_eq!(result.request_id.as_deref(), Some("req-0"));
    assert_eq!(result.shards.len(), 2);
    assert_eq!(result.shards[0].state, ShardState::Opening);
    assert_eq!(result.shards[1].state, ShardState::Closed);
    assert_eq!(result.shards[1].closed_time, Some(1697700000));
    assert_eq!(result.shards[1].address.as_deref(), Some("DATAHUB id:sig|1.1"));
}

#[tokio::test]
async fn api_errors_carry_datahub_code() {
    let endpoint = spawn_server(datahub_router(Arc::new(AtomicUsize::new(0)))).await;
    let source = RestShardSource::new(endpoint, Duration::from_secs(5), None).unwrap();

    let topic = TopicRef::new("analytics", "missing").unwrap();
    match source.list_shard(&topic).await.unwrap_err() {
        WaiterError::Api {
            status,
            code,
            request_id,
            ..
        } => {
            assert_eq!(status, 404);
            assert_eq!(code, "NoSuchTopic");
            assert_eq!(request_id.as_deref(), Some("req-missing"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_is_decode_error() {
    let endpoint = spawn_server(datahub_router(Arc::new(AtomicUsize::new(0)))).await;
    let source = RestShardSource::new(endpoint, Duration::from_secs(5), None).unwrap();

    let topic = TopicRef::new("analytics", "garbled").unwrap();
    let err = source.list_shard(&topic).await.unwrap_err();
    assert_eq!(err.error_type_label(), "decode");
    assert!(matches!(err, WaiterError::Decode { what: "ListShard", .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_request_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let source = RestShardSource::new(format!("http://{addr}"), Duration::from_secs(2), None).unwrap();
    let topic = TopicRef::new("analytics", "t1").unwrap();

    let err = source.list_shard(&topic).await.unwrap_err();
    assert_eq!(err.error_type_label(), "request");
}

#[tokio::test]
async fn waiter_polls_rest_source_until_ready() {
    let calls = Arc::new(AtomicUsize::new(0));
    let endpoint = spawn_server(datahub_router(Arc::clone(&calls))).await;
    let source = Arc::new(RestShardSource::new(endpoint, Duration::from_secs(5), None).unwrap());

    let waiter = ReadinessWaiter::new(source).with_settings(WaitSettings {
        poll_interval: Duration::from_millis(20),
        error_retry_interval: Duration::from_millis(5),
    });
    let topic = TopicRef::new("analytics", "t1").unwrap();

    assert!(waiter.wait_until_ready(&topic, 10).await);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn waiter_times_out_on_missing_topic() {
    let endpoint = spawn_server(datahub_router(Arc::new(AtomicUsize::new(0)))).await;
    let source = Arc::new(RestShardSource::new(endpoint, Duration::from_secs(5), None).unwrap());

    let waiter = ReadinessWaiter::new(source).with_settings(WaitSettings {
        poll_interval: Duration::from_millis(20),
        error_retry_interval: Duration::from_millis(20),
    });
    let topic = TopicRef::new("analytics", "missing").unwrap();

    assert!(!waiter.wait_until_ready(&topic, 1).await);
}
