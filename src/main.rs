//! DataHub Shard Waiter - readiness gate for DataHub topics
//!
//! Polls ListShard for each configured topic until every shard is ACTIVE
//! or CLOSED, exposing health/ready endpoints for Kubernetes and
//! Prometheus metrics while it waits.
//!
//! Exit code is 0 when every topic became ready, 1 otherwise.

use anyhow::Result;
use datahub_shard_waiter::config::WaiterConfig;
use datahub_shard_waiter::health::{self, AppState};
use datahub_shard_waiter::metrics::WaiterMetrics;
use datahub_shard_waiter::shard::{ReadinessWaiter, TopicStatusBoard};
use datahub_shard_waiter::RestShardSource;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load configuration first to get log level
    let config = WaiterConfig::from_env()?;

    // Initialize tracing with configured log level
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("datahub_shard_waiter={}", config.log_level).parse()?)
                .add_directive("reqwest=warn".parse()?)
                .add_directive("hyper=warn".parse()?),
        )
        .json()
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        endpoint = %config.endpoint,
        project = %config.project,
        topics = ?config.topics,
        timeout_secs = config.wait_timeout_secs,
        "Starting DataHub shard waiter"
    );

    let topics = config.topic_refs()?;

    let metrics = match WaiterMetrics::install() {
        Ok(metrics) => {
            info!("Prometheus metrics initialized");
            Some(metrics)
        }
        Err(e) => {
            warn!(error = %e, "Metrics disabled");
            None
        }
    };

    let status = TopicStatusBoard::new(topics.iter().cloned());
    let source = Arc::new(RestShardSource::from_config(&config)?);
    let waiter = Arc::new(
        ReadinessWaiter::new(source)
            .with_settings(config.wait_settings())
            .with_status(status.clone()),
    );

    let cancel = CancellationToken::new();

    // Start health server
    let app_state = AppState {
        status: status.clone(),
        metrics,
    };
    let addr: SocketAddr = ([0, 0, 0, 0], config.http_port).into();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(port = config.http_port, "Starting HTTP server");

    let server_cancel = cancel.clone();
    let http_server = tokio::spawn(async move {
        axum::serve(listener, health::router(app_state))
            .with_graceful_shutdown(async move { server_cancel.cancelled().await })
            .await
    });

    let all_ready = tokio::select! {
        ready = waiter.wait_all(topics, config.wait_timeout(), &cancel) => ready,
        _ = shutdown_signal() => {
            info!("Shutdown signal received while waiting");
            false
        }
    };

    if all_ready && !config.exit_on_ready {
        info!("All topics ready, serving until shutdown");
        shutdown_signal().await;
        info!("Shutdown signal received");
    }

    // Graceful shutdown
    cancel.cancel();
    match http_server.await {
        Ok(Err(e)) => error!(error = %e, "HTTP server error"),
        Err(e) => error!(error = %e, "HTTP server task failed"),
        Ok(Ok(())) => {}
    }

    info!(all_ready, "Shard waiter shutdown complete");
    Ok(if all_ready {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
