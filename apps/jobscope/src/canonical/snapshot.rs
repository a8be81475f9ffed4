//! Job table persistence: Parquet plus a CSV sibling with the same stem.
//!
//! Both files carry [`CANONICAL_COLUMNS`] in order. In Parquet, `skills` is a
//! list of strings and timestamps are UTC milliseconds; in CSV, `skills` is a
//! JSON array and timestamps are RFC 3339.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::builder::{ListBuilder, StringBuilder};
use arrow_array::{
    Array, ArrayRef, Float64Array, ListArray, RecordBatch, StringArray, TimestampMillisecondArray,
};
use arrow_schema::{DataType, Field, Schema, TimeUnit};
use chrono::{DateTime, SecondsFormat, Utc};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use tracing::{info, warn};

use crate::errors::PipelineError;
use crate::models::{CanonicalJob, Source, CANONICAL_COLUMNS};
use crate::storage::write_atomic;

const UTC: &str = "UTC";

/// The CSV file written next to `path`.
pub fn csv_sibling(path: &Path) -> PathBuf {
    path.with_extension("csv")
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Writes `jobs` to `path` (Parquet) and its CSV sibling, each atomically.
/// A `.csv` path writes only the CSV file.
pub fn write_snapshot(path: &Path, jobs: &[CanonicalJob]) -> Result<(), PipelineError> {
    if !is_csv(path) {
        let batch = to_record_batch(jobs)?;
        write_atomic(path, |file| {
            let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
            writer.write(&batch)?;
            writer.close()?;
            Ok(())
        })?;
    }
    let csv_path = csv_sibling(path);
    write_atomic(&csv_path, |file| write_csv(file, jobs, &csv_path))?;
    info!("Wrote {} rows to {}", jobs.len(), path.display());
    Ok(())
}

/// Reads a snapshot, preferring Parquet and falling back to the CSV sibling.
pub fn read_snapshot(path: &Path) -> Result<Vec<CanonicalJob>, PipelineError> {
    if is_csv(path) {
        return read_csv(path);
    }
    let csv_path = csv_sibling(path);
    let primary = if path.exists() {
        read_parquet(path)
    } else {
        Err(PipelineError::MissingInput(path.to_path_buf()))
    };
    match primary {
        Ok(jobs) => Ok(jobs),
        Err(err) if csv_path.exists() => {
            warn!(
                "Could not read {} ({err}); falling back to {}",
                path.display(),
                csv_path.display()
            );
            read_csv(&csv_path)
        }
        Err(err) => Err(err),
    }
}

// ────────────────────────────────────────────────────────────
// Parquet
// ────────────────────────────────────────────────────────────

fn skills_item_field() -> Arc<Field> {
    Arc::new(Field::new("item", DataType::Utf8, true))
}

fn snapshot_schema() -> Schema {
    let ts = DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()));
    Schema::new(vec![
        Field::new("job_id", DataType::Utf8, false),
        Field::new("source", DataType::Utf8, false),
        Field::new("source_job_id", DataType::Utf8, true),
        Field::new("source_url", DataType::Utf8, true),
        Field::new("title", DataType::Utf8, true),
        Field::new("company", DataType::Utf8, true),
        Field::new("location_text", DataType::Utf8, true),
        Field::new("country", DataType::Utf8, true),
        Field::new("description_text", DataType::Utf8, true),
        Field::new("skills", DataType::List(skills_item_field()), false),
        Field::new("skills_text", DataType::Utf8, false),
        Field::new("salary_text", DataType::Utf8, true),
        Field::new("salary_min", DataType::Float64, true),
        Field::new("salary_max", DataType::Float64, true),
        Field::new("published_at", ts.clone(), true),
        Field::new("ingested_at", ts, false),
    ])
}

fn strings<'a>(jobs: &'a [CanonicalJob], f: impl Fn(&'a CanonicalJob) -> Option<&'a str>) -> ArrayRef {
    Arc::new(StringArray::from(jobs.iter().map(f).collect::<Vec<_>>()))
}

fn to_record_batch(jobs: &[CanonicalJob]) -> Result<RecordBatch, PipelineError> {
    let mut skills = ListBuilder::new(StringBuilder::new()).with_field(skills_item_field());
    for job in jobs {
        for skill in &job.skills {
            skills.values().append_value(skill);
        }
        skills.append(true);
    }

    let timestamps = |f: fn(&CanonicalJob) -> Option<DateTime<Utc>>| -> ArrayRef {
        Arc::new(
            TimestampMillisecondArray::from(
                jobs.iter()
                    .map(|j| f(j).map(|t| t.timestamp_millis()))
                    .collect::<Vec<_>>(),
            )
            .with_timezone(UTC),
        )
    };

    let columns: Vec<ArrayRef> = vec![
        strings(jobs, |j| Some(j.job_id.as_str())),
        strings(jobs, |j| Some(j.source.as_str())),
        strings(jobs, |j| j.source_job_id.as_deref()),
        strings(jobs, |j| j.source_url.as_deref()),
        strings(jobs, |j| j.title.as_deref()),
        strings(jobs, |j| j.company.as_deref()),
        strings(jobs, |j| j.location_text.as_deref()),
        strings(jobs, |j| j.country.as_deref()),
        strings(jobs, |j| j.description_text.as_deref()),
        Arc::new(skills.finish()),
        strings(jobs, |j| Some(j.skills_text.as_str())),
        strings(jobs, |j| j.salary_text.as_deref()),
        Arc::new(Float64Array::from(jobs.iter().map(|j| j.salary_min).collect::<Vec<_>>())),
        Arc::new(Float64Array::from(jobs.iter().map(|j| j.salary_max).collect::<Vec<_>>())),
        timestamps(|j| j.published_at),
        timestamps(|j| Some(j.ingested_at)),
    ];

    Ok(RecordBatch::try_new(Arc::new(snapshot_schema()), columns)?)
}

fn typed_column<'b, T: 'static>(
    batch: &'b RecordBatch,
    name: &str,
    path: &Path,
) -> Result<&'b T, PipelineError> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| PipelineError::corrupt(path, format!("column `{name}` is missing or mistyped")))
}

fn opt_string(array: &StringArray, i: usize) -> Option<String> {
    array.is_valid(i).then(|| array.value(i).to_string())
}

fn opt_f64(array: &Float64Array, i: usize) -> Option<f64> {
    array.is_valid(i).then(|| array.value(i))
}

fn opt_timestamp(array: &TimestampMillisecondArray, i: usize) -> Option<DateTime<Utc>> {
    if array.is_valid(i) {
        DateTime::from_timestamp_millis(array.value(i))
    } else {
        None
    }
}

fn read_parquet(path: &Path) -> Result<Vec<CanonicalJob>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;

    let mut jobs = Vec::new();
    for batch in reader {
        let batch = batch?;
        let text = |name: &str| typed_column::<StringArray>(&batch, name, path);
        let (job_id, source, source_job_id, source_url) =
            (text("job_id")?, text("source")?, text("source_job_id")?, text("source_url")?);
        let (title, company, location_text, country) =
            (text("title")?, text("company")?, text("location_text")?, text("country")?);
        let (description_text, skills_text, salary_text) =
            (text("description_text")?, text("skills_text")?, text("salary_text")?);
        let skills = typed_column::<ListArray>(&batch, "skills", path)?;
        let salary_min = typed_column::<Float64Array>(&batch, "salary_min", path)?;
        let salary_max = typed_column::<Float64Array>(&batch, "salary_max", path)?;
        let published_at = typed_column::<TimestampMillisecondArray>(&batch, "published_at", path)?;
        let ingested_at = typed_column::<TimestampMillisecondArray>(&batch, "ingested_at", path)?;

        for i in 0..batch.num_rows() {
            let row_skills = if skills.is_valid(i) {
                let values = skills.value(i);
                let values = values
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .ok_or_else(|| PipelineError::corrupt(path, "`skills` items are not strings"))?;
                values.iter().flatten().map(String::from).collect()
            } else {
                Vec::new()
            };
            let source: Source = source
                .value(i)
                .parse()
                .map_err(|e: String| PipelineError::corrupt(path, e))?;
            let ingested_at = opt_timestamp(ingested_at, i)
                .ok_or_else(|| PipelineError::corrupt(path, format!("row {i} has no ingested_at")))?;

            jobs.push(CanonicalJob {
                job_id: job_id.value(i).to_string(),
                source,
                source_job_id: opt_string(source_job_id, i),
                source_url: opt_string(source_url, i),
                title: opt_string(title, i),
                company: opt_string(company, i),
                location_text: opt_string(location_text, i),
                country: opt_string(country, i),
                description_text: opt_string(description_text, i),
                skills: row_skills,
                skills_text: opt_string(skills_text, i).unwrap_or_default(),
                salary_text: opt_string(salary_text, i),
                salary_min: opt_f64(salary_min, i),
                salary_max: opt_f64(salary_max, i),
                published_at: opt_timestamp(published_at, i),
                ingested_at,
            });
        }
    }
    info!("Read {} rows from {}", jobs.len(), path.display());
    Ok(jobs)
}

// ────────────────────────────────────────────────────────────
// CSV
// ────────────────────────────────────────────────────────────

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_csv(file: &mut File, jobs: &[CanonicalJob], path: &Path) -> Result<(), PipelineError> {
    let mut writer = csv::Writer::from_writer(file);
    writer.write_record(CANONICAL_COLUMNS)?;
    for job in jobs {
        let opt = |v: &Option<String>| v.clone().unwrap_or_default();
        let num = |v: Option<f64>| v.map(|n| n.to_string()).unwrap_or_default();
        writer.write_record([
            job.job_id.clone(),
            job.source.as_str().to_string(),
            opt(&job.source_job_id),
            opt(&job.source_url),
            opt(&job.title),
            opt(&job.company),
            opt(&job.location_text),
            opt(&job.country),
            opt(&job.description_text),
            serde_json::to_string(&job.skills)?,
            job.skills_text.clone(),
            opt(&job.salary_text),
            num(job.salary_min),
            num(job.salary_max),
            job.published_at.map(rfc3339).unwrap_or_default(),
            rfc3339(job.ingested_at),
        ])?;
    }
    writer.flush().map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

fn read_csv(path: &Path) -> Result<Vec<CanonicalJob>, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);
    let index: HashMap<String, usize> = reader
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.to_string(), i))
        .collect();
    if let Some(missing) = CANONICAL_COLUMNS.iter().find(|c| !index.contains_key(**c)) {
        return Err(PipelineError::corrupt(path, format!("column `{missing}` is missing")));
    }

    let mut jobs = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let cell = |name: &str| record.get(index[name]).unwrap_or("");
        let opt = |name: &str| Some(cell(name)).filter(|s| !s.is_empty()).map(String::from);
        let num = |name: &str| cell(name).parse::<f64>().ok();
        let ts = |name: &str| {
            DateTime::parse_from_rfc3339(cell(name))
                .ok()
                .map(|t| t.with_timezone(&Utc))
        };

        let skills: Vec<String> = match cell("skills") {
            "" => Vec::new(),
            raw => serde_json::from_str(raw)
                .map_err(|e| PipelineError::corrupt(path, format!("row {row}: bad skills array: {e}")))?,
        };
        let source: Source = cell("source")
            .parse()
            .map_err(|e: String| PipelineError::corrupt(path, format!("row {row}: {e}")))?;
        let ingested_at = ts("ingested_at")
            .ok_or_else(|| PipelineError::corrupt(path, format!("row {row} has no ingested_at")))?;

        jobs.push(CanonicalJob {
            job_id: cell("job_id").to_string(),
            source,
            source_job_id: opt("source_job_id"),
            source_url: opt("source_url"),
            title: opt("title"),
            company: opt("company"),
            location_text: opt("location_text"),
            country: opt("country"),
            description_text: opt("description_text"),
            skills,
            skills_text: cell("skills_text").to_string(),
            salary_text: opt("salary_text"),
            salary_min: num("salary_min"),
            salary_max: num("salary_max"),
            published_at: ts("published_at"),
            ingested_at,
        });
    }
    info!("Read {} rows from {}", jobs.len(), path.display());
    Ok(jobs)
}
