pub mod health;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::recommender::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/recommendations", post(handlers::handle_recommend))
        .route("/api/v1/index/reload", post(handlers::handle_reload))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::config::Config;
    use crate::recommender::index::tests::fixture_jobs;
    use crate::recommender::RecommenderIndex;

    fn test_config(artifacts_dir: PathBuf) -> Config {
        Config {
            data_dir: PathBuf::from("data"),
            artifacts_dir,
            seed: 42,
            port: 0,
            rust_log: "info".to_string(),
            min_edge_weight: 5,
            top_k: 2,
            max_features: 1_000,
            skill_aliases_path: None,
        }
    }

    fn state_with(model_dir: PathBuf) -> AppState {
        let index = RecommenderIndex::build(&fixture_jobs(), 1_000).unwrap();
        let config = test_config(model_dir.clone());
        AppState::new(Arc::new(config), index, model_dir)
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let resp = app
            .oneshot(
                Request::post(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(state_with(PathBuf::from("unused")));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["index_rows"], 3);
    }

    #[tokio::test]
    async fn test_recommendations_use_default_top_k() {
        let app = build_router(state_with(PathBuf::from("unused")));
        let (status, body) =
            post_json(app, "/api/v1/recommendations", json!({ "profile": "data engineer" })).await;
        assert_eq!(status, StatusCode::OK);
        let recs = body.as_array().unwrap();
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[0]["title"], "Data Engineer");
        assert_eq!(recs[0]["source"], "remotive");
        assert!(recs[0]["reasons"].as_array().unwrap().len() <= 5);
    }

    #[tokio::test]
    async fn test_top_k_is_clamped() {
        let app = build_router(state_with(PathBuf::from("unused")));
        let (_, body) = post_json(
            app.clone(),
            "/api/v1/recommendations",
            json!({ "profile": "analyst", "top_k": 0 }),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = post_json(
            app,
            "/api/v1/recommendations",
            json!({ "profile": "analyst", "top_k": 1000 }),
        )
        .await;
        assert_eq!(body.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_reload_swaps_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut jobs = fixture_jobs();
        jobs.truncate(1);
        RecommenderIndex::build(&jobs, 1_000)
            .unwrap()
            .save(dir.path())
            .unwrap();

        let state = state_with(dir.path().to_path_buf());
        let app = build_router(state.clone());
        let (status, body) = post_json(app, "/api/v1/index/reload", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rows"], 1);
        assert_eq!(state.current_index().await.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reload_keeps_serving_old_index() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(dir.path().join("missing"));
        let app = build_router(state.clone());
        let (status, body) = post_json(app, "/api/v1/index/reload", json!({})).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"]["code"], "ARTIFACT_ERROR");
        assert_eq!(state.current_index().await.len(), 3);
    }
}
