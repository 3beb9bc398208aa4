//! CSV input boundary.
//!
//! The tabular-parsing collaborator is the `csv` crate; this module only
//! adapts its header-driven rows into [`Record`]s. One record per row, field
//! values as strings, missing cells as empty strings. Encoding and format
//! detection stay the parser's problem.

use std::fs::File;
use std::path::PathBuf;

use common::Record;

/// A CSV file acting as the record source for one upload.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Point a source at a CSV file on disk.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cheap pre-pass: count data rows without decoding anything.
    ///
    /// # Errors
    ///
    /// Returns the underlying parser error if the file cannot be opened or a
    /// row is malformed.
    pub fn count_rows(&self) -> Result<usize, csv::Error> {
        let mut reader = self.open()?;
        let mut count = 0usize;
        for row in reader.records() {
            row?;
            count += 1;
        }
        Ok(count)
    }

    /// Iterate records in file order.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or the header row cannot
    /// be read.
    pub fn records(&self) -> Result<RecordIter, csv::Error> {
        let mut reader = self.open()?;
        let headers = reader.headers()?.clone();
        Ok(RecordIter { reader, headers })
    }

    fn open(&self) -> Result<csv::Reader<File>, csv::Error> {
        // `flexible` so a short row yields empty trailing cells instead of
        // aborting the whole upload.
        csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
    }
}

/// Iterator over a source's rows, zipping each against the header.
pub struct RecordIter {
    reader: csv::Reader<File>,
    headers: csv::StringRecord,
}

impl Iterator for RecordIter {
    type Item = Result<Record, csv::Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut row = csv::StringRecord::new();
        match self.reader.read_record(&mut row) {
            Ok(true) => {
                let record: Record = self
                    .headers
                    .iter()
                    .enumerate()
                    .map(|(i, header)| {
                        (header.to_string(), row.get(i).unwrap_or("").to_string())
                    })
                    .collect();
                Some(Ok(record))
            }
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }
}
