use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::recommender::Recommendation;
use crate::state::AppState;

pub const MAX_TOP_K: usize = 100;

#[derive(Debug, Deserialize)]
pub struct RecommendRequest {
    pub profile: String,
    pub top_k: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub rows: usize,
    pub vocabulary_size: usize,
}

/// POST /api/v1/recommendations
pub async fn handle_recommend(
    State(state): State<AppState>,
    Json(req): Json<RecommendRequest>,
) -> Result<Json<Vec<Recommendation>>, AppError> {
    let top_k = req.top_k.unwrap_or(state.config.top_k).clamp(1, MAX_TOP_K);
    let index = state.current_index().await;
    let recs = tokio::task::spawn_blocking(move || index.recommend(&req.profile, top_k))
        .await
        .map_err(anyhow::Error::from)?;
    Ok(Json(recs))
}

/// POST /api/v1/index/reload
pub async fn handle_reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let index = state.reload().await?;
    Ok(Json(ReloadResponse {
        rows: index.len(),
        vocabulary_size: index.vectorizer.vocabulary_size(),
    }))
}
