use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Column order of every persisted job table. Fixed; readers rely on the names.
pub const CANONICAL_COLUMNS: [&str; 16] = [
    "job_id",
    "source",
    "source_job_id",
    "source_url",
    "title",
    "company",
    "location_text",
    "country",
    "description_text",
    "skills",
    "skills_text",
    "salary_text",
    "salary_min",
    "salary_max",
    "published_at",
    "ingested_at",
];

/// Separator between the fields fed into the identity hash.
const IDENTITY_SEPARATOR: char = '|';

/// Origin feed of a canonical row. Add a variant per new feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Kaggle,
    Remotive,
    KaggleSecondary,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Kaggle => "kaggle",
            Source::Remotive => "remotive",
            Source::KaggleSecondary => "kaggle_secondary",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Source {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "kaggle" => Ok(Source::Kaggle),
            "remotive" => Ok(Source::Remotive),
            "kaggle_secondary" => Ok(Source::KaggleSecondary),
            other => Err(format!("unknown source '{other}'")),
        }
    }
}

/// Everything a cleaner knows about one posting before identity is assigned.
#[derive(Debug, Clone, Default)]
pub struct JobDraft {
    pub source_job_id: Option<String>,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location_text: Option<String>,
    pub description_text: Option<String>,
    pub skills: Vec<String>,
    pub salary_text: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub published_at: Option<DateTime<Utc>>,
}

/// The unified, deduplicated job posting every downstream stage reads.
///
/// Built only through [`CanonicalJob::from_draft`] (or decoded from a snapshot),
/// so `job_id`, `country` and `skills_text` always agree with the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalJob {
    pub job_id: String,
    pub source: Source,
    pub source_job_id: Option<String>,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location_text: Option<String>,
    pub country: Option<String>,
    pub description_text: Option<String>,
    pub skills: Vec<String>,
    pub skills_text: String,
    pub salary_text: Option<String>,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub published_at: Option<DateTime<Utc>>,
    pub ingested_at: DateTime<Utc>,
}

impl CanonicalJob {
    pub fn from_draft(source: Source, draft: JobDraft, ingested_at: DateTime<Utc>) -> Self {
        let country = derive_country(draft.location_text.as_deref());
        let skills_text = draft.skills.join(", ");
        let job_id = compute_job_id(
            source,
            draft.source_job_id.as_deref(),
            draft.source_url.as_deref(),
            draft.title.as_deref(),
            draft.company.as_deref(),
            draft.location_text.as_deref(),
        );
        CanonicalJob {
            job_id,
            source,
            source_job_id: draft.source_job_id,
            source_url: draft.source_url,
            title: draft.title,
            company: draft.company,
            location_text: draft.location_text,
            country,
            description_text: draft.description_text,
            skills: draft.skills,
            skills_text,
            salary_text: draft.salary_text,
            salary_min: draft.salary_min,
            salary_max: draft.salary_max,
            published_at: draft.published_at,
            ingested_at,
        }
    }

    /// Identity hash recomputed from this row's own fields.
    pub fn identity(&self) -> String {
        compute_job_id(
            self.source,
            self.source_job_id.as_deref(),
            self.source_url.as_deref(),
            self.title.as_deref(),
            self.company.as_deref(),
            self.location_text.as_deref(),
        )
    }

    /// Returns the row with `job_id` reassigned from its content.
    pub fn with_identity(self) -> Self {
        let job_id = self.identity();
        CanonicalJob { job_id, ..self }
    }

    pub fn has_url(&self) -> bool {
        self.source_url.as_deref().is_some_and(|u| !u.is_empty())
    }
}

/// Stable content hash of a posting's identifying fields.
///
/// Fields are joined in a fixed order with `|`, nulls become empty strings, and
/// the result is hashed with SHA-256 (hex). Same bytes in, same id out.
pub fn compute_job_id(
    source: Source,
    source_job_id: Option<&str>,
    source_url: Option<&str>,
    title: Option<&str>,
    company: Option<&str>,
    location_text: Option<&str>,
) -> String {
    let parts = [
        source.as_str(),
        source_job_id.unwrap_or(""),
        source_url.unwrap_or(""),
        title.unwrap_or(""),
        company.unwrap_or(""),
        location_text.unwrap_or(""),
    ];
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            let mut buf = [0u8; 4];
            hasher.update(IDENTITY_SEPARATOR.encode_utf8(&mut buf).as_bytes());
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Last non-empty comma-separated segment of the location, trimmed.
pub fn derive_country(location_text: Option<&str>) -> Option<String> {
    location_text?
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .last()
        .map(String::from)
}
