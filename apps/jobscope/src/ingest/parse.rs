//! Per-value parsers. None of these fail: bad input degrades to `None` and is
//! counted so the cleaner can report it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Html;
use serde_json::Value;

use crate::ingest::columns::value_text;

/// Numeric dates whose median magnitude exceeds this are millisecond epochs.
const MILLIS_EPOCH_THRESHOLD: f64 = 1e12;

static SALARY_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("valid salary regex"));

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];
const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d %B %Y", "%B %d, %Y"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedDates {
    pub values: Vec<Option<DateTime<Utc>>>,
    /// Non-null inputs that could not be parsed.
    pub failures: usize,
}

/// Parses a whole date column at once, since the epoch unit is a column-level
/// decision: if the median absolute numeric value exceeds 10^12 every value is
/// read as epoch milliseconds, otherwise each value goes through date-string
/// parsing.
pub fn parse_date_column(values: &[Option<&Value>]) -> ParsedDates {
    let mut magnitudes: Vec<f64> = values
        .iter()
        .flatten()
        .filter_map(|v| numeric_value(v))
        .map(f64::abs)
        .collect();
    let millis = median(&mut magnitudes).is_some_and(|m| m > MILLIS_EPOCH_THRESHOLD);

    let mut failures = 0;
    let values = values
        .iter()
        .map(|value| {
            let value = (*value)?;
            let parsed = if millis {
                numeric_value(value).and_then(|ms| DateTime::from_timestamp_millis(ms as i64))
            } else {
                value.as_str().and_then(parse_date_str)
            };
            if parsed.is_none() {
                failures += 1;
            }
            parsed
        })
        .collect();

    ParsedDates { values, failures }
}

/// General date-string parsing: RFC 3339, RFC 2822, then common naive layouts
/// (taken as UTC).
pub fn parse_date_str(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|n| n.and_utc());
        }
    }
    None
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SalaryRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl SalaryRange {
    /// Swaps reversed bounds so `min <= max` whenever both are present.
    pub fn ordered(self) -> Self {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo > hi => SalaryRange {
                min: Some(hi),
                max: Some(lo),
            },
            _ => self,
        }
    }
}

/// Extracts every numeric substring (thousands separators removed) and takes
/// the min and max. One number gives `min == max`; none gives nulls.
///
/// Suffixes are not interpreted: "$100k" yields 100, not 100000.
pub fn extract_salary_range(text: &str) -> SalaryRange {
    let cleaned = text.replace(',', "");
    let numbers: Vec<f64> = SALARY_NUMBER_RE
        .find_iter(&cleaned)
        .filter_map(|m| m.as_str().parse::<f64>().ok())
        .collect();
    match numbers.as_slice() {
        [] => SalaryRange::default(),
        [only] => SalaryRange {
            min: Some(*only),
            max: Some(*only),
        },
        many => SalaryRange {
            min: many.iter().copied().reduce(f64::min),
            max: many.iter().copied().reduce(f64::max),
        },
    }
}

/// Coerces an explicit numeric cell. Returns `Err(())` for a non-null value that
/// is not a finite number so callers can count the failure.
pub fn coerce_number(value: Option<&Value>) -> Result<Option<f64>, ()> {
    match value {
        None => Ok(None),
        Some(v) => numeric_value(v).map(Some).ok_or(()),
    }
}

fn numeric_value(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    n.is_finite().then_some(n)
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Text content of an HTML fragment with entities decoded. Element
/// boundaries become spaces and whitespace runs collapse to one space.
pub fn strip_html(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let joined = fragment.root_element().text().collect::<Vec<_>>().join(" ");
    joined.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Tokens of a free-text skills/tags cell: arrays yield their scalar items,
/// strings split on comma or semicolon.
pub fn split_skill_field(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(value_text).collect(),
        Value::String(s) => s.replace(';', ",").split(',').map(String::from).collect(),
        other => value_text(other).into_iter().collect(),
    }
}

/// Native ids read from CSV as "123.0" collapse to "123".
pub fn normalize_native_id(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
                return format!("{}", f as i64);
            }
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_salary_range_from_text() {
        let r = extract_salary_range("$90,000 - $120,000");
        assert_eq!(r.min, Some(90000.0));
        assert_eq!(r.max, Some(120000.0));
    }

    #[test]
    fn test_salary_k_suffix_is_literal() {
        let r = extract_salary_range("$100k");
        assert_eq!(r.min, Some(100.0));
        assert_eq!(r.max, Some(100.0));
    }

    #[test]
    fn test_salary_without_numbers_is_null() {
        assert_eq!(extract_salary_range("Competitive"), SalaryRange::default());
    }

    #[test]
    fn test_salary_decimals_and_many_numbers() {
        let r = extract_salary_range("45.50/hr, up to 60 or 52.25");
        assert_eq!(r.min, Some(45.5));
        assert_eq!(r.max, Some(60.0));
    }

    #[test]
    fn test_salary_range_ordered_swaps() {
        let r = SalaryRange {
            min: Some(10.0),
            max: Some(5.0),
        }
        .ordered();
        assert_eq!((r.min, r.max), (Some(5.0), Some(10.0)));
    }

    #[test]
    fn test_coerce_number() {
        assert_eq!(coerce_number(None), Ok(None));
        assert_eq!(coerce_number(Some(&json!("85000"))), Ok(Some(85000.0)));
        assert_eq!(coerce_number(Some(&json!(1.5))), Ok(Some(1.5)));
        assert_eq!(coerce_number(Some(&json!("DOE"))), Err(()));
    }

    #[test]
    fn test_millisecond_epoch_column() {
        let a = json!("1713398400000");
        let b = json!(1713484800000i64);
        let c = json!("garbage");
        let parsed = parse_date_column(&[Some(&a), Some(&b), None, Some(&c)]);
        assert_eq!(
            parsed.values[0],
            Some(Utc.with_ymd_and_hms(2024, 4, 18, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parsed.values[1],
            Some(Utc.with_ymd_and_hms(2024, 4, 19, 0, 0, 0).unwrap())
        );
        assert_eq!(parsed.values[2], None);
        assert_eq!(parsed.values[3], None);
        assert_eq!(parsed.failures, 1);
    }

    #[test]
    fn test_string_date_column() {
        let a = json!("2024-05-01T10:11:12");
        let b = json!("2024-05-02T08:00:00+02:00");
        let c = json!("2024-05-03");
        let d = json!("not a date");
        let parsed = parse_date_column(&[Some(&a), Some(&b), Some(&c), Some(&d)]);
        assert_eq!(
            parsed.values[0],
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 11, 12).unwrap())
        );
        assert_eq!(
            parsed.values[1],
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 6, 0, 0).unwrap())
        );
        assert_eq!(
            parsed.values[2],
            Some(Utc.with_ymd_and_hms(2024, 5, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(parsed.values[3], None);
        assert_eq!(parsed.failures, 1);
    }

    #[test]
    fn test_strip_html() {
        assert_eq!(
            strip_html("<p>Build&nbsp;data <b>pipelines</b></p>\n<ul><li>Spark &amp; SQL</li></ul>"),
            "Build data pipelines Spark & SQL"
        );
        assert_eq!(strip_html("caf&#233; &#x41; &bogus;"), "café A &bogus;");
    }

    #[test]
    fn test_strip_html_decodes_named_entities() {
        assert_eq!(
            strip_html("<p>We&rsquo;re hiring &mdash; caf&eacute; team&hellip;</p>"),
            "We\u{2019}re hiring \u{2014} caf\u{e9} team\u{2026}"
        );
        assert_eq!(strip_html("<div>Remote</div><div>EU&nbsp;only</div>"), "Remote EU only");
    }

    #[test]
    fn test_split_skill_field() {
        assert_eq!(split_skill_field(&json!("python; sql,aws")), vec!["python", " sql", "aws"]);
        assert_eq!(split_skill_field(&json!(["react", 3, null])), vec!["react", "3"]);
    }

    #[test]
    fn test_normalize_native_id() {
        assert_eq!(normalize_native_id("3884428798.0"), "3884428798");
        assert_eq!(normalize_native_id(" abc-1 "), "abc-1");
        assert_eq!(normalize_native_id("12.5"), "12.5");
    }
}
