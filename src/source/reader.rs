//! Lazy, restartable streaming of CSV rows.
//!
//! [`CsvSource::open`] validates the file up front so that a bad path is a
//! configuration error raised before any broker work starts. Each call to
//! [`CsvSource::pass`] re-opens the file and yields one complete traversal
//! in source order, so passes are independent and a static file replays
//! identically every time.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{Error, Result};

use super::Record;

#[derive(Debug)]
pub struct CsvSource {
    path: PathBuf,
    header: Vec<String>,
}

impl CsvSource {
    /// Opens the source and reads its header row.
    ///
    /// Fails with [`Error::Config`] if the file is absent, unreadable, or
    /// has no header row.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut reader = Self::reader(&path)?;
        let header: Vec<String> = reader
            .headers()
            .map_err(|e| {
                Error::Config(format!(
                    "failed to read CSV header from {}: {}",
                    path.display(),
                    e
                ))
            })?
            .iter()
            .map(|name| name.to_string())
            .collect();

        if header.is_empty() {
            return Err(Error::Config(format!(
                "CSV file {} has no header row",
                path.display()
            )));
        }

        debug!(path = %path.display(), columns = header.len(), "opened CSV source");
        Ok(Self { path, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Starts a fresh pass over the source.
    ///
    /// The returned iterator reads rows lazily; the file is re-opened so
    /// every pass sees an independent snapshot.
    pub fn pass(&self) -> Result<RecordIter> {
        let reader = Self::reader(&self.path)?;
        Ok(RecordIter {
            rows: reader.into_records(),
            header: self.header.clone(),
        })
    }

    fn reader(path: &Path) -> Result<csv::Reader<File>> {
        // flexible: short and long rows are padded/truncated by Record
        // rather than rejected
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| Error::Config(format!("cannot open CSV file {}: {}", path.display(), e)))
    }
}

/// Lazy iterator over one pass of the source, yielding [`Record`]s in file
/// order.
pub struct RecordIter {
    rows: csv::StringRecordsIntoIter<File>,
    header: Vec<String>,
}

impl Iterator for RecordIter {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.rows.next().map(|row| {
            row.map(|row| Record::from_row(&self.header, &row))
                .map_err(Error::from)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sampledata.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    fn collect(source: &CsvSource) -> Vec<Record> {
        source
            .pass()
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_rows_in_source_order() {
        let (_dir, path) = write_csv("id,value\n1,10\n2,20\n3,30\n");
        let source = CsvSource::open(&path).unwrap();

        assert_eq!(source.header(), ["id", "value"]);
        let records = collect(&source);
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get("id"), Some("1"));
        assert_eq!(records[2].get("value"), Some("30"));
    }

    #[test]
    fn test_passes_are_independent_and_identical() {
        let (_dir, path) = write_csv("id,value\n1,10\n2,20\n");
        let source = CsvSource::open(&path).unwrap();

        let first = collect(&source);
        let second = collect(&source);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = CsvSource::open("/nonexistent/sampledata.csv").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("sampledata.csv"));
    }

    #[test]
    fn test_empty_file_is_config_error() {
        let (_dir, path) = write_csv("");
        let err = CsvSource::open(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_header_only_file_yields_no_records() {
        let (_dir, path) = write_csv("id,value\n");
        let source = CsvSource::open(&path).unwrap();
        assert!(collect(&source).is_empty());
    }

    #[test]
    fn test_malformed_rows_are_padded_not_rejected() {
        let (_dir, path) = write_csv("id,value,unit\n1,10\n2,20,celsius,extra\n");
        let source = CsvSource::open(&path).unwrap();

        let records = collect(&source);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("unit"), Some(""));
        assert_eq!(records[1].get("unit"), Some("celsius"));
        assert_eq!(records[1].len(), 3);
    }
}
