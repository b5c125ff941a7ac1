//! Axum server: shared state, router and listener.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use wasender_channels::Session;
use wasender_core::config::{DispatchConfig, GatewayConfig, SenderConfig};
use wasender_core::error::{Result, SenderError};
use wasender_scheduler::BulkDispatchScheduler;

use crate::{api, routes};

/// Shared state accessible from handlers.
pub struct AppState {
    pub config: GatewayConfig,
    pub dispatch: DispatchConfig,
    pub start_time: Instant,
    pub session: Arc<Session>,
    pub scheduler: BulkDispatchScheduler,
}

impl AppState {
    pub fn new(config: &SenderConfig, session: Arc<Session>) -> Self {
        let scheduler = BulkDispatchScheduler::new(session.clone(), &config.dispatch, &config.media);
        Self {
            config: config.gateway.clone(),
            dispatch: config.dispatch.clone(),
            start_time: Instant::now(),
            session,
            scheduler,
        }
    }
}

/// Build the router with every route and layer.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health_check))
        .route("/api/status", get(api::status))
        .route("/api/send-message", post(api::send_message))
        .route("/api/send-bulk", post(api::send_bulk))
        .route("/api/restart", post(api::restart))
        .route("/api/jobs", get(api::list_jobs))
        .route("/api/jobs/{id}", get(api::get_job))
        .route("/api/jobs/{id}/cancel", post(api::cancel_job))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until `shutdown` resolves.
pub async fn start_server(
    state: Arc<AppState>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SenderError::Gateway(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("🌐 Gateway listening on http://{addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SenderError::Gateway(format!("Server error: {e}")))?;
    tracing::info!("Gateway stopped");
    Ok(())
}
