//! Union of the per-source tables with first-wins deduplication.
//!
//! Rows carrying a URL are keyed on it verbatim; the rest fall back to a
//! lower-cased, trimmed `title|company|location` key. The URL partition is
//! emitted before the composite one. Distinct postings that share a composite
//! key are merged; that false-merge risk is accepted for URL-less feeds.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::canonical::quality::inspect_and_log;
use crate::canonical::snapshot::{csv_sibling, read_snapshot, write_snapshot};
use crate::errors::PipelineError;
use crate::models::{CanonicalJob, Source};
use crate::skills::SkillAliases;

const COMPOSITE_SEPARATOR: &str = "|";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyKind {
    Url,
    Composite,
}

/// Emission order of the deduped partitions.
pub const PARTITION_ORDER: [KeyKind; 2] = [KeyKind::Url, KeyKind::Composite];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupeKey {
    Url(String),
    Composite(String),
}

impl DedupeKey {
    pub fn for_job(job: &CanonicalJob) -> Self {
        if job.has_url() {
            DedupeKey::Url(job.source_url.clone().unwrap_or_default())
        } else {
            DedupeKey::Composite(composite_key(
                job.title.as_deref(),
                job.company.as_deref(),
                job.location_text.as_deref(),
            ))
        }
    }

    pub fn kind(&self) -> KeyKind {
        match self {
            DedupeKey::Url(_) => KeyKind::Url,
            DedupeKey::Composite(_) => KeyKind::Composite,
        }
    }
}

pub fn composite_key(title: Option<&str>, company: Option<&str>, location: Option<&str>) -> String {
    [title, company, location]
        .into_iter()
        .map(|part| part.unwrap_or("").trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(COMPOSITE_SEPARATOR)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub url_duplicates: usize,
    pub composite_duplicates: usize,
    pub per_source: BTreeMap<Source, usize>,
}

impl MergeReport {
    pub fn log(&self) {
        info!(
            "Canonical merge: rows_in={} rows_out={} dropped_by_url={} dropped_by_composite={}",
            self.rows_in, self.rows_out, self.url_duplicates, self.composite_duplicates
        );
        for (source, count) in &self.per_source {
            info!("  {source}: {count} rows");
        }
    }
}

/// Deduplicates `jobs` (already concatenated in input order) and reassigns
/// every `job_id` from content.
pub fn merge_jobs(jobs: Vec<CanonicalJob>) -> (Vec<CanonicalJob>, MergeReport) {
    let mut report = MergeReport {
        rows_in: jobs.len(),
        ..Default::default()
    };

    let keyed: Vec<(DedupeKey, CanonicalJob)> =
        jobs.into_iter().map(|job| (DedupeKey::for_job(&job), job)).collect();

    let mut merged = Vec::with_capacity(keyed.len());
    let mut seen: HashSet<DedupeKey> = HashSet::new();
    for kind in PARTITION_ORDER {
        for (key, job) in keyed.iter().filter(|(key, _)| key.kind() == kind) {
            if seen.insert(key.clone()) {
                merged.push(job.clone().with_identity());
            } else {
                match kind {
                    KeyKind::Url => report.url_duplicates += 1,
                    KeyKind::Composite => report.composite_duplicates += 1,
                }
            }
        }
    }

    for job in &merged {
        *report.per_source.entry(job.source).or_default() += 1;
    }
    report.rows_out = merged.len();
    (merged, report)
}

/// Reads every existing input in order. Absent inputs are skipped; if none
/// exist the first path is reported as missing.
pub fn load_inputs(inputs: &[PathBuf]) -> Result<Vec<CanonicalJob>, PipelineError> {
    let mut jobs = Vec::new();
    let mut found = 0;
    for input in inputs {
        if !input.exists() && !csv_sibling(input).exists() {
            warn!("Skipping missing input {}", input.display());
            continue;
        }
        found += 1;
        jobs.extend(read_snapshot(input)?);
    }
    if found == 0 {
        let first = inputs.first().cloned().unwrap_or_default();
        return Err(PipelineError::MissingInput(first));
    }
    Ok(jobs)
}

/// Builds the canonical snapshot and exports the alias table used to produce it.
pub fn run_merge_stage(
    inputs: &[PathBuf],
    output: &Path,
    aliases: &SkillAliases,
    alias_export: &Path,
) -> Result<MergeReport, PipelineError> {
    let jobs = load_inputs(inputs)?;
    let (merged, report) = merge_jobs(jobs);
    report.log();
    inspect_and_log("jobs_canonical", &merged);
    write_snapshot(output, &merged)?;
    aliases.export_json(alias_export)?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobDraft;
    use chrono::Utc;

    fn job(source: Source, url: Option<&str>, title: &str, company: &str, loc: &str) -> CanonicalJob {
        CanonicalJob::from_draft(
            source,
            JobDraft {
                source_url: url.map(String::from),
                title: Some(title.to_string()),
                company: Some(company.to_string()),
                location_text: Some(loc.to_string()),
                ..Default::default()
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_same_url_keeps_first_row() {
        let a = job(Source::Kaggle, Some("https://x/1"), "Data Engineer", "Acme", "NY");
        let b = job(Source::Remotive, Some("https://x/1"), "Other Title", "Other", "LA");
        let (merged, report) = merge_jobs(vec![a.clone(), b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, a.title);
        assert_eq!(merged[0].source, Source::Kaggle);
        assert_eq!(report.url_duplicates, 1);
    }

    #[test]
    fn test_composite_key_ignores_case_and_whitespace() {
        let a = job(Source::KaggleSecondary, None, "Data Engineer", "Acme", "NY");
        let b = job(Source::KaggleSecondary, None, "  data engineer ", "ACME", "ny ");
        let (merged, report) = merge_jobs(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title.as_deref(), Some("Data Engineer"));
        assert_eq!(report.composite_duplicates, 1);
    }

    #[test]
    fn test_url_partition_emitted_first() {
        let no_url = job(Source::KaggleSecondary, None, "A", "B", "C");
        let with_url = job(Source::Remotive, Some("https://x/2"), "A", "B", "C");
        let (merged, _) = merge_jobs(vec![no_url, with_url]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].source_url.as_deref(), Some("https://x/2"));
        assert_eq!(PARTITION_ORDER, [KeyKind::Url, KeyKind::Composite]);
    }

    #[test]
    fn test_empty_url_falls_back_to_composite() {
        let a = job(Source::Kaggle, Some(""), "A", "B", "C");
        assert_eq!(DedupeKey::for_job(&a), DedupeKey::Composite("a|b|c".to_string()));
    }

    #[test]
    fn test_job_ids_recomputed() {
        let mut a = job(Source::Kaggle, Some("https://x/3"), "A", "B", "C");
        let expected = a.job_id.clone();
        a.job_id = "stale".into();
        let (merged, _) = merge_jobs(vec![a]);
        assert_eq!(merged[0].job_id, expected);
    }

    #[test]
    fn test_missing_inputs_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("jobs_remotive_clean.parquet");
        write_snapshot(&present, &[job(Source::Remotive, Some("https://r/1"), "A", "B", "C")]).unwrap();

        let inputs = vec![dir.path().join("jobs_kaggle_clean.parquet"), present];
        let output = dir.path().join("processed").join("jobs_canonical.parquet");
        let aliases_out = dir.path().join("skill_aliases.json");
        let report = run_merge_stage(&inputs, &output, &SkillAliases::builtin(), &aliases_out).unwrap();

        assert_eq!(report.rows_out, 1);
        assert_eq!(report.per_source.get(&Source::Remotive), Some(&1));
        assert_eq!(read_snapshot(&output).unwrap().len(), 1);
        assert!(aliases_out.exists());
    }

    #[test]
    fn test_no_inputs_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a.parquet");
        let err = load_inputs(&[first.clone(), dir.path().join("b.parquet")]).unwrap_err();
        match err {
            PipelineError::MissingInput(p) => assert_eq!(p, first),
            other => panic!("unexpected error: {other}"),
        }
    }
}
