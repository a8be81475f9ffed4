//! Post-merge data-quality inspection. Findings are logged, never fatal.

use tracing::{info, warn};

use crate::models::CanonicalJob;

/// Key columns whose nulls are worth a warning.
pub const CHECKED_COLUMNS: [&str; 4] = ["title", "company", "description_text", "source_url"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityReport {
    pub rows: usize,
    /// `(column, null count)` for every column in [`CHECKED_COLUMNS`].
    pub nulls: Vec<(&'static str, usize)>,
}

impl QualityReport {
    pub fn is_clean(&self) -> bool {
        self.rows > 0 && self.nulls.iter().all(|(_, n)| *n == 0)
    }
}

fn is_null(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

pub fn inspect(jobs: &[CanonicalJob]) -> QualityReport {
    let nulls = CHECKED_COLUMNS
        .iter()
        .map(|&column| {
            let count = jobs
                .iter()
                .filter(|job| {
                    let value = match column {
                        "title" => &job.title,
                        "company" => &job.company,
                        "description_text" => &job.description_text,
                        _ => &job.source_url,
                    };
                    is_null(value)
                })
                .count();
            (column, count)
        })
        .collect();
    QualityReport {
        rows: jobs.len(),
        nulls,
    }
}

/// Runs [`inspect`] and logs each finding under `label`.
pub fn inspect_and_log(label: &str, jobs: &[CanonicalJob]) -> QualityReport {
    let report = inspect(jobs);
    if report.rows == 0 {
        warn!("DQ {label}: table is empty");
    } else {
        info!("DQ {label}: {} rows", report.rows);
    }
    for (column, count) in &report.nulls {
        if *count > 0 {
            warn!("DQ {label}: {column} has {count} nulls");
        }
    }
    if report.is_clean() {
        info!("DQ {label}: no nulls in {}", CHECKED_COLUMNS.join(", "));
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobDraft, Source};
    use chrono::Utc;

    #[test]
    fn test_counts_nulls_per_column() {
        let at = Utc::now();
        let full = CanonicalJob::from_draft(
            Source::Kaggle,
            JobDraft {
                title: Some("A".into()),
                company: Some("B".into()),
                description_text: Some("C".into()),
                source_url: Some("https://x".into()),
                ..Default::default()
            },
            at,
        );
        let mut blank = CanonicalJob::from_draft(Source::Remotive, JobDraft::default(), at);
        blank.title = Some("   ".into());

        let report = inspect(&[full.clone(), blank]);
        assert_eq!(report.rows, 2);
        assert!(report.nulls.iter().all(|(_, n)| *n == 1));
        assert!(!report.is_clean());
        assert!(inspect(&[full]).is_clean());
    }

    #[test]
    fn test_empty_table_is_not_clean() {
        let report = inspect_and_log("empty", &[]);
        assert_eq!(report.rows, 0);
        assert!(!report.is_clean());
    }
}
