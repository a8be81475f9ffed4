//! Training stage: canonical snapshot in, recommender artifacts out.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::canonical::read_snapshot;
use crate::errors::PipelineError;
use crate::recommender::index::{Manifest, RecommenderIndex};
use crate::recommender::query::Recommendation;
use crate::storage::write_json_atomic;

pub const DEMO_PROFILES_FILE: &str = "demo_profiles.json";
pub const DEMO_RECS_FILE: &str = "demo_recs.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoProfile {
    pub name: String,
    pub profile: String,
}

const DEMO_PROFILES: [(&str, &str); 3] = [
    (
        "Data Engineer",
        "data engineer cloud pipelines spark airflow snowflake kafka aws python sql",
    ),
    (
        "Data Analyst",
        "data analyst dashboards sql excel tableau business intelligence reporting",
    ),
    (
        "Data Scientist",
        "data scientist machine learning python pandas sklearn nlp deep learning",
    ),
];

pub fn demo_profiles() -> Vec<DemoProfile> {
    DEMO_PROFILES
        .iter()
        .map(|(name, profile)| DemoProfile {
            name: name.to_string(),
            profile: profile.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct TrainReport {
    pub manifest: Manifest,
    pub demo_profiles_path: PathBuf,
    pub demo_recs_path: PathBuf,
}

/// Fits the index over the canonical snapshot at `input`, saves it to
/// `model_dir` and precomputes the demo recommendations into `artifacts_dir`.
pub fn run_train_stage(
    input: &Path,
    model_dir: &Path,
    artifacts_dir: &Path,
    top_k: usize,
    max_features: usize,
) -> Result<TrainReport, PipelineError> {
    let jobs = read_snapshot(input)?;
    info!("Training recommender on {} jobs from {}", jobs.len(), input.display());
    let index = RecommenderIndex::build(&jobs, max_features)?;
    let manifest = index.save(model_dir)?;

    let profiles = demo_profiles();
    let recs: BTreeMap<&str, Vec<Recommendation>> = profiles
        .iter()
        .map(|p| (p.name.as_str(), index.recommend(&p.profile, top_k)))
        .collect();

    let demo_profiles_path = artifacts_dir.join(DEMO_PROFILES_FILE);
    let demo_recs_path = artifacts_dir.join(DEMO_RECS_FILE);
    write_json_atomic(&demo_profiles_path, &profiles)?;
    write_json_atomic(&demo_recs_path, &recs)?;
    info!(
        "Saved demo recommendations for {} profiles to {}",
        profiles.len(),
        demo_recs_path.display()
    );

    Ok(TrainReport {
        manifest,
        demo_profiles_path,
        demo_recs_path,
    })
}
