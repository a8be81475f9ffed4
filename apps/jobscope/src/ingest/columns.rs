//! Column resolver — ranked candidate names per logical field, resolved once per
//! feed into a typed intermediate record.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::Value;

use crate::ingest::raw::RawRecord;

pub const TITLE_ALIASES: &[&str] = &["title", "job_title", "position"];
pub const COMPANY_ALIASES: &[&str] = &["company_name", "company", "employer"];
pub const LOCATION_ALIASES: &[&str] = &[
    "location",
    "candidate_required_location",
    "formatted_location",
    "city_state",
    "city",
];
pub const DESCRIPTION_ALIASES: &[&str] = &["description", "job_description", "details"];
pub const URL_ALIASES: &[&str] = &["job_posting_url", "url", "application_url", "job_url"];
pub const DATE_ALIASES: &[&str] = &[
    "listed_time",
    "original_listed_time",
    "publication_date",
    "posted_at",
    "date",
];
pub const SALARY_ALIASES: &[&str] = &["salary", "compensation", "salary_text", "pay", "pay_range"];
pub const SKILL_ALIASES: &[&str] = &["skills", "tags"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogicalField {
    SourceJobId,
    Title,
    Company,
    Location,
    Description,
    Url,
    PublishedAt,
    SalaryText,
    SalaryMin,
    SalaryMax,
    Skills,
}

impl LogicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalField::SourceJobId => "source_job_id",
            LogicalField::Title => "title",
            LogicalField::Company => "company",
            LogicalField::Location => "location_text",
            LogicalField::Description => "description_text",
            LogicalField::Url => "source_url",
            LogicalField::PublishedAt => "published_at",
            LogicalField::SalaryText => "salary_text",
            LogicalField::SalaryMin => "salary_min",
            LogicalField::SalaryMax => "salary_max",
            LogicalField::Skills => "skills",
        }
    }
}

impl fmt::Display for LogicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How candidate names are compared with a feed's headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Header equals the candidate.
    Exact,
    /// Header contains the candidate, case-insensitively.
    Contains,
}

#[derive(Debug, Clone)]
pub struct ColumnResolver {
    mode: MatchMode,
    candidates: Vec<(LogicalField, &'static [&'static str])>,
}

impl ColumnResolver {
    pub fn new(mode: MatchMode) -> Self {
        ColumnResolver {
            mode,
            candidates: Vec::new(),
        }
    }

    /// The alias lists shared by the structured feeds.
    pub fn standard() -> Self {
        Self::new(MatchMode::Exact)
            .field(LogicalField::Title, TITLE_ALIASES)
            .field(LogicalField::Company, COMPANY_ALIASES)
            .field(LogicalField::Location, LOCATION_ALIASES)
            .field(LogicalField::Description, DESCRIPTION_ALIASES)
            .field(LogicalField::Url, URL_ALIASES)
            .field(LogicalField::PublishedAt, DATE_ALIASES)
            .field(LogicalField::SalaryText, SALARY_ALIASES)
            .field(LogicalField::Skills, SKILL_ALIASES)
    }

    pub fn field(mut self, field: LogicalField, names: &'static [&'static str]) -> Self {
        self.candidates.retain(|(f, _)| *f != field);
        self.candidates.push((field, names));
        self
    }

    /// First candidate present in `columns` wins; unresolved fields are gaps.
    pub fn resolve(&self, columns: &[String]) -> ResolvedColumns {
        let mut resolved = BTreeMap::new();
        let mut gaps = Vec::new();
        for (field, names) in &self.candidates {
            match self.find(columns, names) {
                Some(column) => {
                    resolved.insert(*field, column.to_string());
                }
                None => gaps.push(*field),
            }
        }
        ResolvedColumns {
            columns: resolved,
            gaps,
        }
    }

    fn find<'c>(&self, columns: &'c [String], names: &[&str]) -> Option<&'c str> {
        names
            .iter()
            .find_map(|name| match self.mode {
                MatchMode::Exact => columns.iter().find(|c| c.as_str() == *name),
                MatchMode::Contains => {
                    let needle = name.to_lowercase();
                    columns.iter().find(|c| c.to_lowercase().contains(&needle))
                }
            })
            .map(String::as_str)
    }
}

/// A typed view of one raw row, after column resolution.
#[derive(Debug, Clone, Default)]
pub struct RawJob<'r> {
    pub source_job_id: Option<String>,
    pub source_url: Option<String>,
    pub title: Option<String>,
    pub company: Option<String>,
    pub location_text: Option<String>,
    pub description_text: Option<String>,
    pub salary_text: Option<String>,
    pub skills: Option<&'r Value>,
    pub salary_min: Option<&'r Value>,
    pub salary_max: Option<&'r Value>,
    pub published_at: Option<&'r Value>,
}

#[derive(Debug, Clone)]
pub struct ResolvedColumns {
    columns: BTreeMap<LogicalField, String>,
    gaps: Vec<LogicalField>,
}

impl ResolvedColumns {
    pub fn column(&self, field: LogicalField) -> Option<&str> {
        self.columns.get(&field).map(String::as_str)
    }

    pub fn has(&self, field: LogicalField) -> bool {
        self.columns.contains_key(&field)
    }

    pub fn gaps(&self) -> &[LogicalField] {
        &self.gaps
    }

    pub fn value<'r>(&self, field: LogicalField, record: &'r RawRecord) -> Option<&'r Value> {
        let column = self.column(field)?;
        record.get(column).filter(|v| !v.is_null())
    }

    pub fn text(&self, field: LogicalField, record: &RawRecord) -> Option<String> {
        self.value(field, record).and_then(value_text)
    }

    pub fn extract<'r>(&self, record: &'r RawRecord) -> RawJob<'r> {
        RawJob {
            source_job_id: self.text(LogicalField::SourceJobId, record),
            source_url: self.text(LogicalField::Url, record),
            title: self.text(LogicalField::Title, record),
            company: self.text(LogicalField::Company, record),
            location_text: self.text(LogicalField::Location, record),
            description_text: self.text(LogicalField::Description, record),
            salary_text: self.text(LogicalField::SalaryText, record),
            skills: self.value(LogicalField::Skills, record),
            salary_min: self.value(LogicalField::SalaryMin, record),
            salary_max: self.value(LogicalField::SalaryMax, record),
            published_at: self.value(LogicalField::PublishedAt, record),
        }
    }
}

/// Scalar JSON value as text. Blank strings, nulls and containers yield `None`;
/// integral numbers render without a fractional part.
pub fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_first_present_alias_wins() {
        let resolved = ColumnResolver::standard().resolve(&cols(&["company", "company_name", "job_title"]));
        assert_eq!(resolved.column(LogicalField::Company), Some("company_name"));
        assert_eq!(resolved.column(LogicalField::Title), Some("job_title"));
    }

    #[test]
    fn test_missing_fields_reported_as_gaps() {
        let resolved = ColumnResolver::standard().resolve(&cols(&["title"]));
        assert!(resolved.has(LogicalField::Title));
        assert!(resolved.gaps().contains(&LogicalField::Company));
        assert!(resolved.gaps().contains(&LogicalField::Url));
        assert!(!resolved.gaps().contains(&LogicalField::Title));
    }

    #[test]
    fn test_contains_mode_is_case_insensitive() {
        let resolver = ColumnResolver::new(MatchMode::Contains)
            .field(LogicalField::Title, &["Job Title", "title"])
            .field(LogicalField::Company, &["Company Name", "company"]);
        let resolved = resolver.resolve(&cols(&["JOB TITLE (EN)", "hiring_company"]));
        assert_eq!(resolved.column(LogicalField::Title), Some("JOB TITLE (EN)"));
        assert_eq!(resolved.column(LogicalField::Company), Some("hiring_company"));
    }

    #[test]
    fn test_field_override_replaces_candidates() {
        let resolver = ColumnResolver::standard().field(LogicalField::Title, &["role"]);
        let resolved = resolver.resolve(&cols(&["title", "role"]));
        assert_eq!(resolved.column(LogicalField::Title), Some("role"));
    }

    #[test]
    fn test_extract_absent_and_null_values() {
        let resolved = ColumnResolver::standard().resolve(&cols(&["title", "company_name", "url"]));
        let record = json!({"title": "Engineer", "company_name": null})
            .as_object()
            .unwrap()
            .clone();
        let raw = resolved.extract(&record);
        assert_eq!(raw.title.as_deref(), Some("Engineer"));
        assert_eq!(raw.company, None);
        assert_eq!(raw.source_url, None);
        assert!(raw.skills.is_none());
    }

    #[test]
    fn test_value_text_formats() {
        assert_eq!(value_text(&json!(3884428798u64)), Some("3884428798".to_string()));
        assert_eq!(value_text(&json!(12.0)), Some("12".to_string()));
        assert_eq!(value_text(&json!(12.5)), Some("12.5".to_string()));
        assert_eq!(value_text(&json!("  ")), None);
        assert_eq!(value_text(&json!(["a"])), None);
    }
}
