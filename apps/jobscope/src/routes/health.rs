use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the size of the index currently served.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let index = state.current_index().await;
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "jobscope",
        "index_rows": index.len(),
    }))
}
