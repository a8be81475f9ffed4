//! Remotive API dumps: HTML descriptions, `tags` arrays, free-text salaries.

use crate::ingest::columns::{ColumnResolver, LogicalField};
use crate::ingest::parse::strip_html;
use crate::ingest::SourceCleaner;
use crate::models::Source;

#[derive(Debug, Clone, Copy, Default)]
pub struct RemotiveCleaner;

impl SourceCleaner for RemotiveCleaner {
    fn source(&self) -> Source {
        Source::Remotive
    }

    fn resolver(&self) -> ColumnResolver {
        ColumnResolver::standard()
            .field(LogicalField::SourceJobId, &["id"])
            .field(LogicalField::Skills, &["tags", "skills"])
    }

    fn description(&self, text: Option<String>) -> Option<String> {
        text.map(|t| strip_html(&t)).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::raw::read_raw_table;
    use crate::ingest::{clean_table, CleanContext};
    use crate::skills::SkillNormalizer;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_remotive_payload_is_cleaned() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("remotive_raw.json");
        let payload = json!({"jobs": [
            {
                "id": 1905007,
                "url": "https://remotive.com/remote-jobs/data/1905007",
                "title": "Senior Data Engineer",
                "company_name": "Acme",
                "tags": ["python", "AWS", "spark"],
                "publication_date": "2024-04-18T10:00:00",
                "candidate_required_location": "USA",
                "salary": "$90,000 - $120,000",
                "description": "<p>Own our <b>pipelines</b> &amp; warehouse</p>"
            },
            {
                "id": 1905008,
                "title": "Analyst",
                "company_name": "Beta",
                "tags": "sql; excel",
                "salary": "",
                "description": "<br/>"
            }
        ]});
        std::fs::write(&path, payload.to_string()).unwrap();

        let normalizer = SkillNormalizer::default();
        let ctx = CleanContext {
            normalizer: &normalizer,
            ingested_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            sample: None,
            seed: 42,
        };
        let out = clean_table(&RemotiveCleaner, read_raw_table(&path).unwrap(), &ctx);

        let first = &out.jobs[0];
        assert_eq!(first.source, Source::Remotive);
        assert_eq!(first.source_job_id.as_deref(), Some("1905007"));
        assert_eq!(first.skills, vec!["Python", "AWS", "spark"]);
        assert_eq!(first.skills_text, "Python, AWS, spark");
        assert_eq!(first.description_text.as_deref(), Some("Own our pipelines & warehouse"));
        assert_eq!(first.salary_min, Some(90000.0));
        assert_eq!(first.country.as_deref(), Some("USA"));
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 4, 18, 10, 0, 0).unwrap())
        );

        let second = &out.jobs[1];
        assert_eq!(second.skills, vec!["SQL", "Excel"]);
        assert_eq!(second.description_text, None);
        assert_eq!(second.salary_text, None);
        assert_eq!((second.salary_min, second.salary_max), (None, None));
    }
}
