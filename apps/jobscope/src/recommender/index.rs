//! The recommender index and its on-disk artifact set.
//!
//! Artifacts live together in one directory: `vectorizer.json`, `matrix.json`,
//! `jobs_index.json`, and `manifest.json` written last with a checksum per file.
//! A directory is only loadable as a whole.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::PipelineError;
use crate::models::{CanonicalJob, Source};
use crate::recommender::sparse::CsrMatrix;
use crate::recommender::vectorizer::TfidfVectorizer;
use crate::storage::{read_bytes, read_json, sha256_hex, write_json_atomic};

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const MATRIX_FILE: &str = "matrix.json";
pub const JOBS_INDEX_FILE: &str = "jobs_index.json";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const FORMAT_VERSION: u32 = 1;

/// Characters of description fed into each document.
pub const DESCRIPTION_PREFIX_CHARS: usize = 800;

/// Row metadata, aligned by position with the matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobMeta {
    pub job_id: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub source: Source,
    pub source_url: Option<String>,
    pub skills_text: String,
    pub description_text: Option<String>,
}

impl From<&CanonicalJob> for JobMeta {
    fn from(job: &CanonicalJob) -> Self {
        JobMeta {
            job_id: job.job_id.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            source: job.source,
            source_url: job.source_url.clone(),
            skills_text: job.skills_text.clone(),
            description_text: job.description_text.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactEntry {
    pub file: String,
    pub sha256: String,
    pub bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub built_at: DateTime<Utc>,
    pub rows: usize,
    pub vocabulary_size: usize,
    pub files: Vec<ArtifactEntry>,
}

/// Immutable snapshot queried by the recommender.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderIndex {
    pub vectorizer: TfidfVectorizer,
    pub matrix: CsrMatrix,
    pub jobs: Vec<JobMeta>,
}

/// `title skills_text description[..800 chars]`, nulls as empty.
pub fn document_text(job: &CanonicalJob) -> String {
    let description: String = job
        .description_text
        .as_deref()
        .unwrap_or("")
        .chars()
        .take(DESCRIPTION_PREFIX_CHARS)
        .collect();
    [job.title.as_deref().unwrap_or(""), job.skills_text.as_str(), description.as_str()].join(" ")
}

impl RecommenderIndex {
    /// Fits the index over `jobs`. An empty job list is an error.
    pub fn build(jobs: &[CanonicalJob], max_features: usize) -> Result<Self, PipelineError> {
        if jobs.is_empty() {
            return Err(PipelineError::EmptyCorpus);
        }
        let docs: Vec<String> = jobs.iter().map(document_text).collect();
        let (vectorizer, matrix) = TfidfVectorizer::fit_transform(&docs, max_features)?;
        info!(
            "Built recommender index: rows={} vocabulary={}",
            matrix.n_rows(),
            vectorizer.vocabulary_size()
        );
        Ok(RecommenderIndex {
            vectorizer,
            matrix,
            jobs: jobs.iter().map(JobMeta::from).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn save(&self, dir: &Path) -> Result<Manifest, PipelineError> {
        let mut files = Vec::new();
        for (name, value) in [
            (VECTORIZER_FILE, serde_json::to_vec(&self.vectorizer)?),
            (MATRIX_FILE, serde_json::to_vec(&self.matrix)?),
            (JOBS_INDEX_FILE, serde_json::to_vec(&self.jobs)?),
        ] {
            let path = dir.join(name);
            crate::storage::write_atomic(&path, |file| {
                use std::io::Write;
                file.write_all(&value).map_err(|e| PipelineError::io(&path, e))
            })?;
            files.push(ArtifactEntry {
                file: name.to_string(),
                sha256: sha256_hex(&value),
                bytes: value.len(),
            });
        }

        let manifest = Manifest {
            format_version: FORMAT_VERSION,
            built_at: Utc::now(),
            rows: self.len(),
            vocabulary_size: self.vectorizer.vocabulary_size(),
            files,
        };
        write_json_atomic(&dir.join(MANIFEST_FILE), &manifest)?;
        info!("Saved recommender artifacts to {}", dir.display());
        Ok(manifest)
    }

    /// Loads and cross-checks a saved artifact set.
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let manifest_path = dir.join(MANIFEST_FILE);
        let manifest: Manifest = read_json(&manifest_path)?;
        if manifest.format_version != FORMAT_VERSION {
            return Err(PipelineError::corrupt(
                &manifest_path,
                format!("unsupported format version {}", manifest.format_version),
            ));
        }

        let load = |name: &str| -> Result<Vec<u8>, PipelineError> {
            let path = dir.join(name);
            let entry = manifest
                .files
                .iter()
                .find(|e| e.file == name)
                .ok_or_else(|| PipelineError::corrupt(&manifest_path, format!("no entry for {name}")))?;
            let bytes = read_bytes(&path)?;
            if sha256_hex(&bytes) != entry.sha256 {
                return Err(PipelineError::corrupt(&path, "checksum mismatch"));
            }
            Ok(bytes)
        };
        let parse = |name: &str, e: serde_json::Error| PipelineError::corrupt(dir.join(name), e.to_string());

        let vectorizer: TfidfVectorizer =
            serde_json::from_slice(&load(VECTORIZER_FILE)?).map_err(|e| parse(VECTORIZER_FILE, e))?;
        let matrix: CsrMatrix =
            serde_json::from_slice(&load(MATRIX_FILE)?).map_err(|e| parse(MATRIX_FILE, e))?;
        let jobs: Vec<JobMeta> =
            serde_json::from_slice(&load(JOBS_INDEX_FILE)?).map_err(|e| parse(JOBS_INDEX_FILE, e))?;

        vectorizer
            .validate()
            .map_err(|reason| PipelineError::corrupt(dir.join(VECTORIZER_FILE), reason))?;
        matrix
            .validate()
            .map_err(|reason| PipelineError::corrupt(dir.join(MATRIX_FILE), reason))?;
        if matrix.n_rows() != jobs.len() || jobs.len() != manifest.rows {
            return Err(PipelineError::corrupt(
                dir,
                format!(
                    "row mismatch: matrix={} jobs={} manifest={}",
                    matrix.n_rows(),
                    jobs.len(),
                    manifest.rows
                ),
            ));
        }
        if matrix.n_cols != vectorizer.vocabulary_size() {
            return Err(PipelineError::corrupt(dir, "matrix width differs from vocabulary size"));
        }

        info!(
            "Loaded recommender index from {} (rows={} vocabulary={})",
            dir.display(),
            jobs.len(),
            vectorizer.vocabulary_size()
        );
        Ok(RecommenderIndex {
            vectorizer,
            matrix,
            jobs,
        })
    }
}
