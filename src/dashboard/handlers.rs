//! HTTP handlers for the status endpoints.

use axum::extract::State;
use axum::response::Html;
use axum::Json;

use super::api::StatusResponse;
use super::render::render_panel;
use crate::state::SharedState;

/// GET / - HTML status panel.
pub async fn get_panel(State(state): State<SharedState>) -> Html<String> {
    Html(render_panel(&state.snapshot()))
}

/// GET /status - Plain-text status table.
pub async fn get_status_text(State(state): State<SharedState>) -> String {
    state.snapshot().render_text()
}

/// GET /api/status - JSON status snapshot.
pub async fn get_status_json(State(state): State<SharedState>) -> Json<StatusResponse> {
    Json(StatusResponse::new(state.snapshot()))
}
