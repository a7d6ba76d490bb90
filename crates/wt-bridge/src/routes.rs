//! HTTP collaborator endpoints: theme listing and session
//! enumeration, served alongside the WebSocket bridge.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::api_error::ApiError;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub background: &'static str,
    pub foreground: &'static str,
    pub cursor: &'static str,
    #[serde(rename = "selectionBackground")]
    pub selection_background: &'static str,
}

fn builtin_themes() -> BTreeMap<&'static str, Theme> {
    let mut themes = BTreeMap::new();
    themes.insert(
        "default",
        Theme {
            background: "#000000",
            foreground: "#ffffff",
            cursor: "#ffffff",
            selection_background: "#4d4d4d",
        },
    );
    themes.insert(
        "dark",
        Theme {
            background: "#1e1e1e",
            foreground: "#d4d4d4",
            cursor: "#d4d4d4",
            selection_background: "#264f78",
        },
    );
    themes.insert(
        "solarized-dark",
        Theme {
            background: "#002b36",
            foreground: "#839496",
            cursor: "#93a1a1",
            selection_background: "#073642",
        },
    );
    themes.insert(
        "solarized-light",
        Theme {
            background: "#fdf6e3",
            foreground: "#657b83",
            cursor: "#586e75",
            selection_background: "#eee8d5",
        },
    );
    themes
}

/// `GET /api/themes` → `{"themes": ["default", ...]}`.
pub async fn list_themes() -> impl IntoResponse {
    let names: Vec<&'static str> = builtin_themes().into_keys().collect();
    Json(serde_json::json!({ "themes": names }))
}

/// `GET /api/themes/<name>` → color fields, or a non-2xx response for an
/// unknown name.
pub async fn get_theme(Path(name): Path<String>) -> Result<impl IntoResponse, ApiError> {
    builtin_themes()
        .get(name.as_str())
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("unknown theme: {name}")))
}

#[derive(Debug, Serialize)]
pub struct SessionListEntry {
    pub id: String,
    pub created: String,
    pub clients: usize,
    pub alive: bool,
}

/// `GET /api/sessions` → `[{id, created, clients, alive}, ...]`,
/// ordered by creation time ascending per `SessionRegistry::list`.
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rows: Vec<SessionListEntry> = state
        .registry
        .list()
        .into_iter()
        .map(|s| SessionListEntry {
            id: s.id.as_str().to_string(),
            created: humantime_rfc3339(s.created_at),
            clients: s.client_count,
            alive: s.alive,
        })
        .collect();
    (StatusCode::OK, Json(rows))
}

/// Render a `SystemTime` as ISO-8601.
fn humantime_rfc3339(time: std::time::SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time).to_rfc3339()
}

/// `GET /api/metrics` → Prometheus text exposition of request counters and
/// histograms recorded by `wt_telemetry::middleware::metrics_middleware`.
pub async fn get_metrics() -> impl IntoResponse {
    wt_telemetry::metrics::global_metrics().export_prometheus()
}
