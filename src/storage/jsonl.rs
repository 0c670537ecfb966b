//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one record.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::StorageError;

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Write records, replacing the entire file.
    pub fn write_all(&self, records: &[T]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        let mut count = 0;

        for record in records {
            let json = serde_json::to_string(record)?;
            writeln!(writer, "{}", json)?;
            count += 1;
        }

        writer.flush()?;
        info!("Wrote {} records to {:?}", count, self.path);

        Ok(count)
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Read all records from the file. A missing file reads as empty;
    /// unparseable lines are logged and skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                }
            }
        }

        debug!("Read {} records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Read records matching a predicate.
    pub fn read_where<F>(&self, predicate: F) -> Result<Vec<T>, StorageError>
    where
        F: Fn(&T) -> bool,
    {
        let all = self.read_all()?;
        Ok(all.into_iter().filter(predicate).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Row {
        name: String,
        rating: f64,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "Fox".to_string(),
                rating: 1.21,
            },
            Row {
                name: "Owl".to_string(),
                rating: 0.94,
            },
        ]
    }

    #[test]
    fn test_jsonl_write_and_read() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("rows.jsonl");

        let writer: JsonlWriter<Row> = JsonlWriter::new(path.clone());
        assert_eq!(writer.write_all(&rows()).unwrap(), 2);

        let reader: JsonlReader<Row> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap(), rows());
    }

    #[test]
    fn test_jsonl_read_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let reader: JsonlReader<Row> = JsonlReader::new(temp_dir.path().join("missing.jsonl"));

        assert!(reader.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_write_all_overwrites_existing() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("overwrite.jsonl");

        let writer: JsonlWriter<Row> = JsonlWriter::new(path.clone());
        writer.write_all(&rows()).unwrap();
        writer.write_all(&rows()[..1]).unwrap();

        let reader: JsonlReader<Row> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap().len(), 1);
    }

    #[test]
    fn test_read_all_skips_bad_lines() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bad_lines.jsonl");

        std::fs::write(
            &path,
            r#"{"name":"Fox","rating":1.21}
not-valid-json

{"name":"Owl","rating":0.94}
"#,
        )
        .unwrap();

        let reader: JsonlReader<Row> = JsonlReader::new(path);
        assert_eq!(reader.read_all().unwrap(), rows());
    }

    #[test]
    fn test_read_where() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("filter.jsonl");
        JsonlWriter::new(path.clone()).write_all(&rows()).unwrap();

        let reader: JsonlReader<Row> = JsonlReader::new(path);
        let found = reader.read_where(|r| r.rating > 1.0).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Fox");
    }
}
