// HTTP ingress for the platform bridge, plus health and metrics.

use axum::{
    extract::{Json, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::engine::event::{Action, InboundEvent};
use crate::engine::server::SqueakServer;
use crate::metrics;

// ── Response types ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub actions: Vec<Action>,
}

// ── Shared application state ─────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub server: Arc<SqueakServer>,
}

pub fn router(server: Arc<SqueakServer>) -> Router {
    let state = AppState { server };

    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/events", post(handle_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "squeakbot" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Deliver one inbound chat event; the body lists what the bridge should do.
async fn handle_event(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> Json<EventResponse> {
    let actions = state.server.handle_event(event).await;
    Json(EventResponse { actions })
}
