//! Source cleaners: one per feed, each mapping its raw schema onto
//! [`CanonicalJob`] rows. No cross-record dedup happens here.

pub mod columns;
pub mod kaggle;
pub mod parse;
pub mod raw;
pub mod remotive;
pub mod secondary;

use std::path::Path;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::canonical::snapshot::write_snapshot;
use crate::errors::PipelineError;
use crate::ingest::columns::{ColumnResolver, LogicalField, RawJob};
use crate::ingest::parse::{
    coerce_number, extract_salary_range, normalize_native_id, parse_date_column, split_skill_field,
    SalaryRange,
};
use crate::ingest::raw::{read_raw_table, sample_records, RawTable};
use crate::models::{CanonicalJob, JobDraft, Source};
use crate::skills::SkillNormalizer;

pub use kaggle::KaggleCleaner;
pub use remotive::RemotiveCleaner;
pub use secondary::SecondaryCleaner;

// ────────────────────────────────────────────────────────────
// Cleaner seam
// ────────────────────────────────────────────────────────────

/// Per-feed behaviour. Everything else about cleaning is shared.
pub trait SourceCleaner {
    fn source(&self) -> Source;

    /// Candidate column names per logical field for this feed.
    fn resolver(&self) -> ColumnResolver;

    /// Canonical skills of one row. Default: split the free-text skills field.
    fn skills(&self, raw: &RawJob<'_>, normalizer: &SkillNormalizer) -> Vec<String> {
        raw.skills
            .map(|v| normalizer.normalize(split_skill_field(v)))
            .unwrap_or_default()
    }

    fn description(&self, text: Option<String>) -> Option<String> {
        text
    }
}

/// Run-wide inputs shared by every cleaner.
#[derive(Debug, Clone)]
pub struct CleanContext<'a> {
    pub normalizer: &'a SkillNormalizer,
    pub ingested_at: DateTime<Utc>,
    /// Keep at most this many raw rows.
    pub sample: Option<usize>,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CleanStats {
    pub source: Source,
    pub rows_in: usize,
    pub rows_out: usize,
    pub schema_gaps: Vec<LogicalField>,
    pub date_failures: usize,
    pub number_failures: usize,
}

impl CleanStats {
    pub fn log(&self) {
        info!(
            "Cleaned {}: rows_in={} rows_out={}",
            self.source, self.rows_in, self.rows_out
        );
        if !self.schema_gaps.is_empty() {
            let gaps: Vec<&str> = self.schema_gaps.iter().map(LogicalField::as_str).collect();
            warn!("{}: no column found for {} (filled with nulls)", self.source, gaps.join(", "));
        }
        if self.date_failures > 0 {
            warn!("{}: {} unparseable dates set to null", self.source, self.date_failures);
        }
        if self.number_failures > 0 {
            warn!("{}: {} non-numeric salary values set to null", self.source, self.number_failures);
        }
    }
}

#[derive(Debug, Clone)]
pub struct CleanOutput {
    pub jobs: Vec<CanonicalJob>,
    pub stats: CleanStats,
}

// ────────────────────────────────────────────────────────────
// Shared cleaning
// ────────────────────────────────────────────────────────────

/// Maps an already-read raw table onto canonical rows.
pub fn clean_table<C: SourceCleaner + ?Sized>(
    cleaner: &C,
    table: RawTable,
    ctx: &CleanContext<'_>,
) -> CleanOutput {
    let rows_in = table.len();
    let records = match ctx.sample {
        Some(limit) => sample_records(table.records, limit, ctx.seed),
        None => table.records,
    };

    let resolved = cleaner.resolver().resolve(&table.columns);
    let raws: Vec<RawJob<'_>> = records.iter().map(|r| resolved.extract(r)).collect();

    let dates = parse_date_column(&raws.iter().map(|r| r.published_at).collect::<Vec<_>>());
    let explicit_salary =
        resolved.has(LogicalField::SalaryMin) || resolved.has(LogicalField::SalaryMax);
    let mut number_failures = 0;

    let jobs: Vec<CanonicalJob> = raws
        .iter()
        .zip(dates.values)
        .map(|(raw, published_at)| {
            let salary = if explicit_salary {
                let mut coerce = |v| {
                    coerce_number(v).unwrap_or_else(|()| {
                        number_failures += 1;
                        None
                    })
                };
                SalaryRange {
                    min: coerce(raw.salary_min),
                    max: coerce(raw.salary_max),
                }
            } else {
                raw.salary_text
                    .as_deref()
                    .map(extract_salary_range)
                    .unwrap_or_default()
            };
            let salary = salary.ordered();

            let draft = JobDraft {
                source_job_id: raw.source_job_id.as_deref().map(normalize_native_id),
                source_url: raw.source_url.clone(),
                title: raw.title.clone(),
                company: raw.company.clone(),
                location_text: raw.location_text.clone(),
                description_text: cleaner.description(raw.description_text.clone()),
                skills: cleaner.skills(raw, ctx.normalizer),
                salary_text: raw.salary_text.clone(),
                salary_min: salary.min,
                salary_max: salary.max,
                published_at,
            };
            CanonicalJob::from_draft(cleaner.source(), draft, ctx.ingested_at)
        })
        .collect();

    let stats = CleanStats {
        source: cleaner.source(),
        rows_in,
        rows_out: jobs.len(),
        schema_gaps: resolved.gaps().to_vec(),
        date_failures: dates.failures,
        number_failures,
    };
    CleanOutput { jobs, stats }
}

/// Reads one raw feed, cleans it and writes the per-source snapshot. A missing
/// input is fatal; nothing is written in that case.
pub fn run_clean_stage<C: SourceCleaner + ?Sized>(
    cleaner: &C,
    input: &Path,
    output: &Path,
    ctx: &CleanContext<'_>,
) -> Result<CleanStats, PipelineError> {
    let table = read_raw_table(input)?;
    let CleanOutput { jobs, stats } = clean_table(cleaner, table, ctx);
    stats.log();
    write_snapshot(output, &jobs)?;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    use crate::ingest::columns::MatchMode;
    use crate::ingest::raw::RawRecord;

    struct PlainFeed;

    impl SourceCleaner for PlainFeed {
        fn source(&self) -> Source {
            Source::Remotive
        }

        fn resolver(&self) -> ColumnResolver {
            ColumnResolver::standard().field(LogicalField::SourceJobId, &["id"])
        }
    }

    struct ExplicitSalaryFeed;

    impl SourceCleaner for ExplicitSalaryFeed {
        fn source(&self) -> Source {
            Source::Kaggle
        }

        fn resolver(&self) -> ColumnResolver {
            ColumnResolver::new(MatchMode::Exact)
                .field(LogicalField::Title, &["title"])
                .field(LogicalField::SalaryMin, &["min_salary"])
                .field(LogicalField::SalaryMax, &["max_salary"])
        }
    }

    fn table(rows: serde_json::Value) -> RawTable {
        let records: Vec<RawRecord> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        let mut columns: Vec<String> = Vec::new();
        for r in &records {
            for k in r.keys() {
                if !columns.contains(k) {
                    columns.push(k.clone());
                }
            }
        }
        RawTable { columns, records }
    }

    fn ctx(normalizer: &SkillNormalizer) -> CleanContext<'_> {
        CleanContext {
            normalizer,
            ingested_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            sample: None,
            seed: 42,
        }
    }

    #[test]
    fn test_clean_twice_yields_identical_rows() {
        let normalizer = SkillNormalizer::default();
        let rows = json!([
            {"id": 1, "title": "Data Engineer", "company_name": "Acme", "url": "https://a/1",
             "skills": "python, SQL", "salary": "$90,000 - $120,000", "location": "Austin, US"},
            {"id": "2", "title": "Analyst", "publication_date": "2024-05-01T00:00:00"}
        ]);
        let a = clean_table(&PlainFeed, table(rows.clone()), &ctx(&normalizer));
        let b = clean_table(&PlainFeed, table(rows), &ctx(&normalizer));
        assert_eq!(a.jobs, b.jobs);

        let first = &a.jobs[0];
        assert_eq!(first.source_job_id.as_deref(), Some("1"));
        assert_eq!(first.skills, vec!["Python", "SQL"]);
        assert_eq!(first.salary_min, Some(90000.0));
        assert_eq!(first.salary_max, Some(120000.0));
        assert_eq!(first.country.as_deref(), Some("US"));
    }

    #[test]
    fn test_schema_gaps_degrade_to_nulls() {
        let normalizer = SkillNormalizer::default();
        let out = clean_table(&PlainFeed, table(json!([{"title": "Dev"}])), &ctx(&normalizer));
        assert_eq!(out.stats.rows_out, 1);
        assert!(out.stats.schema_gaps.contains(&LogicalField::Company));
        let job = &out.jobs[0];
        assert_eq!(job.company, None);
        assert!(job.skills.is_empty());
        assert_eq!(job.skills_text, "");
        assert_eq!((job.salary_min, job.salary_max), (None, None));
    }

    #[test]
    fn test_explicit_salary_columns_are_coerced_and_ordered() {
        let normalizer = SkillNormalizer::default();
        let rows = json!([
            {"title": "A", "min_salary": "120000", "max_salary": "90000"},
            {"title": "B", "min_salary": "DOE", "max_salary": 50}
        ]);
        let out = clean_table(&ExplicitSalaryFeed, table(rows), &ctx(&normalizer));
        assert_eq!(out.jobs[0].salary_min, Some(90000.0));
        assert_eq!(out.jobs[0].salary_max, Some(120000.0));
        assert_eq!(out.jobs[1].salary_min, None);
        assert_eq!(out.jobs[1].salary_max, Some(50.0));
        assert_eq!(out.stats.number_failures, 1);
    }

    #[test]
    fn test_bad_dates_counted_not_fatal() {
        let normalizer = SkillNormalizer::default();
        let rows = json!([
            {"title": "A", "publication_date": "yesterday"},
            {"title": "B", "publication_date": "2024-01-02"}
        ]);
        let out = clean_table(&PlainFeed, table(rows), &ctx(&normalizer));
        assert_eq!(out.stats.date_failures, 1);
        assert!(out.jobs[0].published_at.is_none());
        assert!(out.jobs[1].published_at.is_some());
    }

    #[test]
    fn test_sampling_caps_rows() {
        let normalizer = SkillNormalizer::default();
        let rows: Vec<serde_json::Value> = (0..20).map(|i| json!({"title": format!("T{i}")})).collect();
        let mut c = ctx(&normalizer);
        c.sample = Some(5);
        let out = clean_table(&PlainFeed, table(json!(rows)), &c);
        assert_eq!(out.stats.rows_in, 20);
        assert_eq!(out.stats.rows_out, 5);
    }

    #[test]
    fn test_missing_input_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let normalizer = SkillNormalizer::default();
        let output = dir.path().join("out.parquet");
        let err = run_clean_stage(&PlainFeed, &dir.path().join("absent.json"), &output, &ctx(&normalizer))
            .unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
        assert!(!output.exists());
    }
}
