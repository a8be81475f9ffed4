//! Raw feed readers. Rows come back as loose field-name → JSON value maps; no
//! schema is imposed until a cleaner resolves its columns.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{Map, Value};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::errors::PipelineError;

pub type RawRecord = Map<String, Value>;

const DATA_EXTENSIONS: &[&str] = &["csv", "json", "jsonl"];

#[derive(Debug, Clone, Default)]
pub struct RawTable {
    /// Column names in first-seen order.
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    fn from_records(records: Vec<RawRecord>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for record in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        RawTable { columns, records }
    }
}

/// Reads a raw feed file. If it is absent or unreadable and a `.csv` sibling
/// exists, the sibling is read instead.
pub fn read_raw_table(path: &Path) -> Result<RawTable, PipelineError> {
    let primary = if path.exists() {
        read_by_extension(path)
    } else {
        Err(PipelineError::MissingInput(path.to_path_buf()))
    };

    let err = match primary {
        Ok(table) => {
            info!(
                "Read {} raw rows ({} columns) from {}",
                table.len(),
                table.columns.len(),
                path.display()
            );
            return Ok(table);
        }
        Err(err) => err,
    };

    let fallback = path.with_extension("csv");
    if fallback != path && fallback.exists() {
        warn!(
            "Failed to read {} ({err}); falling back to {}",
            path.display(),
            fallback.display()
        );
        let table = read_by_extension(&fallback)?;
        info!("Read {} raw rows from {}", table.len(), fallback.display());
        return Ok(table);
    }
    Err(err)
}

/// Returns `path` itself for files; for directories, the first data file in
/// sorted recursive order.
pub fn resolve_data_file(path: &Path) -> Result<PathBuf, PipelineError> {
    if !path.is_dir() {
        return Ok(path.to_path_buf());
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .find(|p| extension_of(p).is_some_and(|ext| DATA_EXTENSIONS.contains(&ext.as_str())))
        .ok_or_else(|| PipelineError::MissingInput(path.to_path_buf()))
}

/// Keeps at most `limit` records, chosen with a seeded RNG, in original order.
pub fn sample_records(records: Vec<RawRecord>, limit: usize, seed: u64) -> Vec<RawRecord> {
    if records.len() <= limit {
        return records;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keep = rand::seq::index::sample(&mut rng, records.len(), limit).into_vec();
    keep.sort_unstable();

    let mut keep = keep.into_iter().peekable();
    records
        .into_iter()
        .enumerate()
        .filter_map(|(i, record)| {
            if keep.peek() == Some(&i) {
                keep.next();
                Some(record)
            } else {
                None
            }
        })
        .collect()
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn read_by_extension(path: &Path) -> Result<RawTable, PipelineError> {
    match extension_of(path).as_deref() {
        Some("csv") => read_csv(path),
        Some("json") => read_json_array(path),
        Some("jsonl") => read_jsonl(path),
        _ => Err(PipelineError::UnsupportedFormat(path.to_path_buf())),
    }
}

fn read_csv(path: &Path) -> Result<RawTable, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(file);
    let columns: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim().to_string())
        .collect();

    let mut records = Vec::new();
    for (line, row) in reader.byte_records().enumerate() {
        let mut record = RawRecord::new();
        match row {
            Ok(row) => {
                for (name, cell) in columns.iter().zip(row.iter()) {
                    let cell = String::from_utf8_lossy(cell);
                    if !cell.trim().is_empty() {
                        record.insert(name.clone(), Value::String(cell.into_owned()));
                    }
                }
            }
            Err(e) => warn!("{}: row {} unreadable ({e}); keeping it as nulls", path.display(), line + 1),
        }
        records.push(record);
    }
    Ok(RawTable { columns, records })
}

fn read_json_array(path: &Path) -> Result<RawTable, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let payload: Value = serde_json::from_reader(BufReader::new(file))?;

    let jobs = match payload {
        Value::Array(items) => items,
        Value::Object(mut obj) => {
            let nested = obj
                .get_mut("payload")
                .and_then(|p| p.get_mut("jobs"))
                .map(Value::take);
            match nested.or_else(|| obj.remove("jobs")) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(PipelineError::corrupt(
                        path,
                        "expected an array of jobs, or an object with `jobs` / `payload.jobs`",
                    ))
                }
            }
        }
        _ => return Err(PipelineError::corrupt(path, "expected a JSON array or object")),
    };

    let records = jobs
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => map,
            _ => {
                warn!("{}: item {i} is not an object; keeping it as nulls", path.display());
                RawRecord::new()
            }
        })
        .collect();
    Ok(RawTable::from_records(records))
}

fn read_jsonl(path: &Path) -> Result<RawTable, PipelineError> {
    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut records = Vec::new();
    for (i, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| PipelineError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line) {
            Ok(Value::Object(map)) => records.push(map),
            Ok(_) | Err(_) => {
                warn!("{}: line {} is not a JSON object; keeping it as nulls", path.display(), i + 1);
                records.push(RawRecord::new());
            }
        }
    }
    Ok(RawTable::from_records(records))
}
