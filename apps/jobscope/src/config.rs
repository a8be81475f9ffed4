use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::recommender::DEFAULT_MAX_FEATURES;
use crate::skills::DEFAULT_MIN_EDGE_WEIGHT;

/// Pipeline configuration loaded from environment variables.
/// Every value has a default; malformed numbers fail at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub artifacts_dir: PathBuf,
    pub seed: u64,
    pub port: u16,
    pub rust_log: String,
    pub min_edge_weight: usize,
    pub top_k: usize,
    pub max_features: usize,
    pub skill_aliases_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            data_dir: env_path("DATA_DIR", "data"),
            artifacts_dir: env_path("ARTIFACTS_DIR", "artifacts"),
            seed: env_parse("JOBSCOPE_SEED", 42)?,
            port: env_parse("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            min_edge_weight: env_parse("MIN_EDGE_WEIGHT", DEFAULT_MIN_EDGE_WEIGHT)?,
            top_k: env_parse("TOP_K", 10)?,
            max_features: env_parse("MAX_FEATURES", DEFAULT_MAX_FEATURES)?,
            skill_aliases_path: std::env::var("SKILL_ALIASES_PATH").ok().map(PathBuf::from),
        })
    }

    pub fn raw_kaggle_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("kaggle")
    }

    pub fn raw_remotive_dir(&self) -> PathBuf {
        self.data_dir.join("raw").join("remotive")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    pub fn canonical_path(&self) -> PathBuf {
        self.processed_dir().join("jobs_canonical.parquet")
    }

    pub fn skill_graph_path(&self) -> PathBuf {
        self.artifacts_dir.join("graphs").join("skill_graph.json")
    }

    pub fn recommender_dir(&self) -> PathBuf {
        self.artifacts_dir.join("recommender")
    }

    pub fn skill_aliases_export_path(&self) -> PathBuf {
        self.artifacts_dir.join("skill_aliases.json")
    }
}

fn env_path(key: &str, default: &str) -> PathBuf {
    std::env::var(key)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> Config {
        Config {
            data_dir: PathBuf::from("data"),
            artifacts_dir: PathBuf::from("artifacts"),
            seed: 42,
            port: 8080,
            rust_log: "info".to_string(),
            min_edge_weight: 5,
            top_k: 10,
            max_features: 50_000,
            skill_aliases_path: None,
        }
    }

    #[test]
    fn test_derived_paths() {
        let config = sample_config();
        assert_eq!(config.raw_kaggle_dir(), PathBuf::from("data/raw/kaggle"));
        assert_eq!(
            config.canonical_path(),
            PathBuf::from("data/processed/jobs_canonical.parquet")
        );
        assert_eq!(
            config.skill_graph_path(),
            PathBuf::from("artifacts/graphs/skill_graph.json")
        );
        assert_eq!(config.recommender_dir(), PathBuf::from("artifacts/recommender"));
    }

    #[test]
    fn test_env_parse_falls_back_to_default_when_unset() {
        let value: usize = env_parse("JOBSCOPE_TEST_SURELY_UNSET_VAR", 7).unwrap();
        assert_eq!(value, 7);
    }
}
