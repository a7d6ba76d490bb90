//! `wt-bridge` — the axum-based bridge between browser WebSocket clients and
//! [`wt_session::registry::SessionRegistry`], plus the HTTP collaborator
//! endpoints (theme listing, session enumeration) and the TLS
//! certificate provisioning for the CLI's `--generate-certs` flag.

pub mod api_error;
pub mod connection;
pub mod motd;
pub mod routes;
pub mod serve;
pub mod tls;

use std::sync::Arc;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use wt_telemetry::middleware::metrics_middleware;

use wt_core::config::Config;
use wt_session::registry::SessionRegistry;

/// Shared state reachable from every route handler: the resolved
/// configuration and the process-wide session registry.
pub struct AppState {
    pub config: Config,
    pub registry: Arc<SessionRegistry>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let log_dir = config
            .session_log
            .enabled
            .then(|| config.session_log.dir.clone())
            .flatten()
            .map(std::path::PathBuf::from);
        let registry = SessionRegistry::new(config.history.capacity_bytes, log_dir);
        Arc::new(Self { config, registry })
    }
}

/// Build the full router: the WebSocket bridge endpoints under the
/// configured prefix plus the HTTP collaborator surface.
pub fn router(state: Arc<AppState>) -> Router {
    let prefix = state.config.server.prefix.trim_matches('/');
    let attach_root = format!("/{prefix}");
    let attach_existing = format!("/{prefix}/{{id}}");

    Router::new()
        .route(&attach_root, get(connection::attach_new))
        .route(&attach_existing, get(connection::attach_existing))
        .route("/api/themes", get(routes::list_themes))
        .route("/api/themes/{name}", get(routes::get_theme))
        .route("/api/sessions", get(routes::list_sessions))
        .route("/api/metrics", get(routes::get_metrics))
        .layer(from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
