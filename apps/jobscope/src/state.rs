use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::errors::PipelineError;
use crate::recommender::RecommenderIndex;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Current index snapshot. Handlers clone the inner `Arc` and release the
    /// lock before querying, so a reload never waits on a running query.
    pub index: Arc<RwLock<Arc<RecommenderIndex>>>,
    pub model_dir: PathBuf,
}

impl AppState {
    pub fn new(config: Arc<Config>, index: RecommenderIndex, model_dir: PathBuf) -> Self {
        AppState {
            config,
            index: Arc::new(RwLock::new(Arc::new(index))),
            model_dir,
        }
    }

    pub async fn current_index(&self) -> Arc<RecommenderIndex> {
        self.index.read().await.clone()
    }

    /// Loads the artifact set from `model_dir` and swaps it in. On failure the
    /// previous snapshot keeps serving.
    pub async fn reload(&self) -> Result<Arc<RecommenderIndex>, PipelineError> {
        let dir = self.model_dir.clone();
        let loaded = tokio::task::spawn_blocking(move || RecommenderIndex::load(&dir))
            .await
            .map_err(|e| PipelineError::corrupt(&self.model_dir, format!("load task failed: {e}")))??;
        let loaded = Arc::new(loaded);
        *self.index.write().await = loaded.clone();
        info!("Recommender index reloaded ({} rows)", loaded.len());
        Ok(loaded)
    }
}
