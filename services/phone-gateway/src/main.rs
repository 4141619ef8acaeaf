//! Zalo Phone Gateway
//!
//! Single-binary Rust service that:
//! 1. Resolves Zalo credentials once at startup (config, then environment)
//! 2. Accepts `{token, access_token}` from the mini-app
//! 3. Exchanges them with the Zalo Open API for a verified phone number
//! 4. Maps every outcome to `{number}` or a `{detail}` error

mod config;
mod error;
mod metrics;
mod phone;

use anyhow::{Context, Result};
use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use zalo_auth::{CredentialResolver, ExchangeClient, HttpTransport};

use metrics_exporter_prometheus::PrometheusHandle;

use crate::config::Config;
use crate::phone::{PhoneRequest, PhoneState};

/// How long in-flight exchanges may run after a shutdown signal.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    phone: PhoneState,
    started_at: Instant,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// The phone routes are mounted under `route_prefix`; a concurrency limit
/// layer enforces `max_connections`.
fn build_router(state: AppState, route_prefix: &str, max_connections: usize) -> Router {
    let prefix = route_prefix.trim_end_matches('/');
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route(&format!("{prefix}/phone"), post(phone_handler))
        .route(&format!("{prefix}/test"), get(ping_handler))
        .layer(tower::limit::ConcurrencyLimitLayer::new(max_connections))
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("starting zalo-phone-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus_handle = metrics::install_recorder().context("failed to install metrics")?;

    // CLI: simple --config flag parsing
    let args: Vec<String> = std::env::args().collect();
    let cli_config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str());

    let config_path = Config::resolve_path(cli_config_path);
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        listen_addr = %config.server.listen_addr,
        route_prefix = %config.server.route_prefix,
        endpoint = %config.upstream.endpoint,
        encoding = config.upstream.encoding.as_str(),
        timeout_secs = config.upstream.timeout_secs,
        "configuration loaded"
    );

    // Resolve once up front so a missing secret is visible at startup.
    // Requests keep being served and answer 500 until the config is fixed.
    let resolver = Arc::new(CredentialResolver::new(config.credential_source()));
    if let Err(fault) = resolver.resolve() {
        error!(fault = fault.as_str(), "Zalo credentials unavailable: {fault}");
    }

    let timeout = config.upstream.timeout();
    let http = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("failed to build HTTP client")?;
    let transport = HttpTransport::new(
        http,
        config.upstream.endpoint.clone(),
        config.upstream.encoding,
        timeout,
    );

    let phone_state = PhoneState {
        client: ExchangeClient::new(Arc::new(transport), timeout),
        resolver,
        requests_total: Arc::new(AtomicU64::new(0)),
        errors_total: Arc::new(AtomicU64::new(0)),
        in_flight: Arc::new(AtomicU64::new(0)),
    };
    let in_flight = phone_state.in_flight.clone();

    let app_state = AppState {
        phone: phone_state,
        started_at: Instant::now(),
        prometheus: prometheus_handle,
    };

    let app = build_router(
        app_state,
        &config.server.route_prefix,
        config.server.max_connections,
    );

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;
    info!(addr = %listen_addr, "accepting requests");

    // The drain timeout starts when the shutdown signal fires, not when the
    // server starts: notify the server to drain, then race it against the timer.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await?;
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(DRAIN_TIMEOUT, server_handle).await {
        Ok(Ok(Ok(()))) => {
            info!("all in-flight requests drained");
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
        }
        Err(_) => {
            let remaining = in_flight.load(Ordering::Relaxed);
            warn!(
                remaining,
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!("shutdown complete");
    Ok(())
}

/// Health endpoint: 200 when credentials resolved, 503 when degraded.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.started_at.elapsed().as_secs();
    let requests = state.phone.requests_total.load(Ordering::Relaxed);
    let errors = state.phone.errors_total.load(Ordering::Relaxed);
    let ready = state.phone.resolver.is_ready();

    let (status_code, status, credentials) = if ready {
        (axum::http::StatusCode::OK, "healthy", "resolved")
    } else {
        (
            axum::http::StatusCode::SERVICE_UNAVAILABLE,
            "degraded",
            "missing",
        )
    };
    let body = serde_json::json!({
        "status": status,
        "credentials": credentials,
        "uptime_seconds": uptime,
        "requests_served": requests,
        "errors_total": errors,
    });

    (status_code, Json(body))
}

/// Prometheus metrics endpoint — returns metrics in text exposition format.
async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        axum::http::StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        state.prometheus.render(),
    )
}

/// Liveness probe for the mini-app integration.
async fn ping_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Zalo router is working!",
        "status": "success",
    }))
}

/// Exchange `{token, access_token}` for `{number}`.
async fn phone_handler(
    State(state): State<AppState>,
    body: Result<Json<PhoneRequest>, JsonRejection>,
) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    phone::resolve_phone(&state.phone, body, request_id)
        .await
        .into_response()
}

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .context("failed to install SIGTERM handler")?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                res.context("failed to install Ctrl+C handler")?;
                info!("received SIGINT, shutting down");
            }
            _ = terminate.recv() => info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .context("failed to install Ctrl+C handler")?;
        info!("received SIGINT, shutting down");
    }

    Ok(())
}
