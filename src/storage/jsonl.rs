//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one row. Whole-file writes
//! go through a temporary file and a rename so a batch lands all at once.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::StorageError;

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Write rows, replacing the entire file atomically.
    pub fn write_all(&self, rows: &[T]) -> Result<usize, StorageError> {
        ensure_parent(&self.path)?;

        let tmp = tmp_path(&self.path);
        let mut count = 0;
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            for row in rows {
                let json = serde_json::to_string(row)?;
                writeln!(writer, "{}", json)?;
                count += 1;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        info!("Wrote {} rows to {:?}", count, self.path);
        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all rows, skipping lines that fail to parse.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", i + 1, self.path, e);
                }
            }
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }

    /// Read all rows where line position matters: any bad line is an error.
    pub fn read_all_strict(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Err(StorageError::PathNotFound(self.path.clone()));
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut rows = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let row = serde_json::from_str(&line).map_err(|source| StorageError::BadLine {
                path: self.path.clone(),
                line: i + 1,
                source,
            })?;
            rows.push(row);
        }

        debug!("Read {} rows from {:?}", rows.len(), self.path);
        Ok(rows)
    }
}

/// Write a single pretty-printed JSON document atomically.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(&tmp, path)?;
    debug!("Wrote {:?}", path);
    Ok(())
}

/// Read a single JSON document.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    if !path.exists() {
        return Err(StorageError::PathNotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestRow {
        id: String,
        value: u32,
    }

    fn row(id: &str, value: u32) -> TestRow {
        TestRow {
            id: id.to_string(),
            value,
        }
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("rows.jsonl");

        let rows = vec![row("1", 100), row("2", 200)];

        let writer: JsonlWriter<TestRow> = JsonlWriter::new(path.clone());
        assert_eq!(writer.write_all(&rows).unwrap(), 2);

        let reader: JsonlReader<TestRow> = JsonlReader::new(path.clone());
        assert_eq!(reader.read_all().unwrap(), rows);
        assert_eq!(reader.read_all_strict().unwrap(), rows);
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn test_write_all_replaces_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/dir/rows.jsonl");

        let writer: JsonlWriter<TestRow> = JsonlWriter::new(path.clone());
        writer.write_all(&[row("1", 1), row("2", 2)]).unwrap();
        writer.write_all(&[row("3", 3)]).unwrap();

        let reader: JsonlReader<TestRow> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap(), vec![row("3", 3)]);
    }

    #[test]
    fn test_jsonl_read_missing() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<TestRow> =
            JsonlReader::new(temp_dir.path().join("nonexistent.jsonl"));

        assert!(!reader.exists());
        assert!(reader.read_all().unwrap().is_empty());
        assert!(matches!(
            reader.read_all_strict(),
            Err(StorageError::PathNotFound(_))
        ));
    }

    #[test]
    fn test_lenient_and_strict_reads_on_bad_line() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad.jsonl");
        fs::write(&path, "{\"id\":\"1\",\"value\":1}\nnot json\n{\"id\":\"2\",\"value\":2}\n").unwrap();

        let reader: JsonlReader<TestRow> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap().len(), 2);
        assert!(matches!(
            reader.read_all_strict(),
            Err(StorageError::BadLine { line: 2, .. })
        ));
    }

    #[test]
    fn test_json_document_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("doc.json");

        write_json(&path, &row("x", 7)).unwrap();
        let parsed: TestRow = read_json(&path).unwrap();
        assert_eq!(parsed, row("x", 7));

        let missing: Result<TestRow, _> = read_json(&temp_dir.path().join("nope.json"));
        assert!(matches!(missing, Err(StorageError::PathNotFound(_))));
    }
}
