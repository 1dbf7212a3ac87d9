//! LinkedIn Gateway
//!
//! Single-binary Rust service that:
//! 1. Runs the LinkedIn OAuth authorization-code flow and stores the token
//! 2. Publishes text, link, image and video posts as the authorized member
//! 3. Relays connection invitation calls to the LinkedIn API

mod config;
mod error;
mod handlers;
mod metrics;
mod middleware;
mod oauth;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use common::Secret;
use linkedin_auth::{FileTokenStore, OAuthSettings, TokenStore, TokenValidator};
use linkedin_client::LinkedInClient;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::metrics::ServiceMetrics;

/// How long in-flight requests may run after a shutdown signal
const DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Shared application state accessible from all handlers
#[derive(Clone)]
struct AppState {
    store: Arc<dyn TokenStore>,
    validator: TokenValidator,
    oauth: Arc<OAuthSettings>,
    http: reqwest::Client,
    linkedin: LinkedInClient,
    /// When set, protected routes require `Authorization: Bearer <key>`
    api_key: Option<Arc<Secret<String>>>,
    metrics: ServiceMetrics,
    prometheus: PrometheusHandle,
}

/// Build the axum router with all routes and shared state.
///
/// The OAuth flow endpoints, invitation `resolve`, `/health` and `/metrics`
/// are open; everything else sits behind the optional API key.
fn build_router(state: AppState, max_connections: usize) -> Router {
    let protected = Router::new()
        .route("/linkedin/auth", get(handlers::auth))
        .route("/linkedin/post", post(handlers::post))
        .route("/linkedin/invitation/create", post(handlers::create_invitation))
        .route("/linkedin/invitation/retrieve", get(handlers::retrieve_invitations))
        .route("/linkedin/invitation/action", post(handlers::invitation_action))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ));

    Router::new()
        .route("/linkedin/generate_token", post(handlers::generate_token))
        .route("/linkedin/callback", get(handlers::callback))
        .route("/linkedin/invitation/resolve", post(handlers::resolve_invitation))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            metrics::track_requests,
        ))
        .layer(axum::middleware::from_fn(middleware::request_id))
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

    info!("starting linkedin-gateway");

    // Install Prometheus metrics recorder before any metrics are emitted
    let prometheus = metrics::install_recorder().context("failed to install Prometheus recorder")?;

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
        client_id = %config.linkedin.client_id,
        redirect_uri = %config.linkedin.redirect_uri,
        api_base_url = %config.linkedin.api_base_url,
        token_file = %config.storage.access_token_file.display(),
        api_key_gate = config.server.api_key.is_some(),
        "configuration loaded"
    );

    let oauth = Arc::new(config.oauth_settings()?);
    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(
        config.storage.access_token_file.clone(),
        config.storage.profile_urn_file.clone(),
    ));
    let validator = TokenValidator::new(store.clone(), oauth.clone());
    if validator.validate().await.is_err() {
        warn!("no usable access token stored; authorize via /linkedin/auth");
    }

    let http = reqwest::Client::new();
    let linkedin = LinkedInClient::new(http.clone(), config.linkedin.api_base_url.clone())
        .with_metadata_timeout(config.metadata_timeout());

    let metrics = ServiceMetrics::new();
    let requests_total = metrics.requests_total.clone();

    let app_state = AppState {
        store,
        validator,
        oauth,
        http,
        linkedin,
        api_key: config.server.api_key.map(Arc::new),
        metrics,
        prometheus,
    };

    let app = build_router(app_state, config.server.max_connections);

    let listen_addr = config.server.listen_addr;
    let listener = TcpListener::bind(listen_addr)
        .await
        .with_context(|| format!("failed to bind to {listen_addr}"))?;

    info!(addr = %listen_addr, "accepting requests");

    // The drain timer starts when the signal arrives, not when the server
    // starts: notify the server to drain, then race it against the timeout.
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    let server_handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    shutdown_signal().await;
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
            warn!(
                drain_timeout_secs = DRAIN_TIMEOUT.as_secs(),
                "drain timeout exceeded, forcing shutdown"
            );
        }
    }

    info!(
        requests_served = requests_total.load(Ordering::Relaxed),
        "shutdown complete"
    );
    Ok(())
}

/// Liveness plus whether a usable LinkedIn token is stored.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let authorized = state.validator.validate().await.is_ok();
    axum::Json(serde_json::json!({
        "status": "healthy",
        "authorized": authorized,
        "uptime_seconds": state.metrics.started_at.elapsed().as_secs(),
        "requests_served": state.metrics.requests_total.load(Ordering::Relaxed),
    }))
}

/// Prometheus metrics endpoint, text exposition format.
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

/// Wait for SIGTERM or SIGINT for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
