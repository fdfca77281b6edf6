//! HTTP query service for mlog.
//!
//! Serves range reports and per-application detail over JSON. The service is
//! read-only; recording happens in a separate process that appends to the same
//! store.

mod routes;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{Router, routing::get};
use chrono::{DateTime, Local};
use mlog_core::BucketStore;
use tower_http::cors::{Any, CorsLayer};

/// Store shared between request handlers.
pub type SharedStore = Arc<Mutex<dyn BucketStore + Send>>;

/// Source of the current local time, used to resolve query ranges.
pub type Clock = fn() -> DateTime<Local>;

/// State shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    store: SharedStore,
    default_threshold: u64,
    clock: Clock,
}

impl AppState {
    pub fn new(store: SharedStore, default_threshold: u64) -> Self {
        Self {
            store,
            default_threshold,
            clock: Local::now,
        }
    }

    /// Replaces the wall clock, for deterministic ranges.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

/// Builds the router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(|| async { "mlog" }))
        .route("/health", get(routes::health))
        .route("/api/records", get(routes::records))
        .route("/api/records/{application}", get(routes::record_detail))
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down HTTP server");
}
