//! Atomic artifact writes: fill a temp file beside the target, then rename it over.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::errors::PipelineError;

/// Creates the parent directory of `path` if needed.
pub fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Runs `fill` against a temp file in the destination directory and persists it
/// to `path` only if `fill` succeeds. A failed write leaves the old file intact.
pub fn write_atomic<F>(path: &Path, fill: F) -> Result<(), PipelineError>
where
    F: FnOnce(&mut File) -> Result<(), PipelineError>,
{
    ensure_parent(path)?;
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipelineError::io(dir, e))?;
    fill(tmp.as_file_mut())?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| PipelineError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| PipelineError::io(path, e.error))?;
    Ok(())
}

/// Serializes `value` as pretty JSON and writes it atomically.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), PipelineError> {
    write_atomic(path, |file| {
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush().map_err(|e| PipelineError::io(path, e))?;
        Ok(())
    })
}

/// Reads and deserializes a JSON file. A missing file is `MissingInput`.
pub fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::corrupt(path, e.to_string()))
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, PipelineError> {
    if !path.exists() {
        return Err(PipelineError::MissingInput(path.to_path_buf()));
    }
    std::fs::read(path).map_err(|e| PipelineError::io(path, e))
}

/// Hex SHA-256 of a byte slice.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_write_json_atomic_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        let mut value = BTreeMap::new();
        value.insert("py", "Python");

        write_json_atomic(&path, &value).unwrap();

        let back: BTreeMap<String, String> = read_json(&path).unwrap();
        assert_eq!(back.get("py").map(String::as_str), Some("Python"));
    }

    #[test]
    fn test_failed_fill_keeps_previous_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();

        let result = write_atomic(&path, |_| Err(PipelineError::EmptyCorpus));

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_read_json_missing_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<serde_json::Value>(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput(_)));
    }

    #[test]
    fn test_sha256_hex_is_stable() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
