//! Ordered tabular records and their decoded augmentation.

use indexmap::IndexMap;

/// Output column holding the rendered decode outcome.
pub const DECRYPTED_COLUMN: &str = "Decrypted";

/// Output column preserving the original raw token value.
pub const ENCRYPTED_COLUMN: &str = "Encrypted";

/// One input row: an ordered mapping of column name to cell value.
///
/// Column order matches the source header. Names are not guaranteed to be
/// unique-cased, so consumers must resolve columns case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record(IndexMap<String, String>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Cell value for `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&str> {
        self.0.get(column).map(String::as_str)
    }

    /// Column names in header order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `true` when the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Insert a cell, appending the column if it is new.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A [`Record`] augmented with its decode result.
///
/// Rendered with two columns prepended, `Decrypted` then `Encrypted`,
/// followed by the original columns in their original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AugmentedRecord {
    /// Sentinel or plaintext rendering of the decode outcome.
    pub decrypted: String,
    /// The raw token value exactly as it appeared in the source row.
    pub encrypted: String,
    /// The original row, untouched.
    pub record: Record,
}

impl AugmentedRecord {
    /// Full output column set: the two prepended columns, then the original
    /// header.
    pub fn columns(&self) -> Vec<String> {
        let mut cols = Vec::with_capacity(2 + self.record.len());
        cols.push(DECRYPTED_COLUMN.to_string());
        cols.push(ENCRYPTED_COLUMN.to_string());
        cols.extend(self.record.columns().map(str::to_string));
        cols
    }

    /// Cell value for an output column. Absent cells render as the empty
    /// string, matching how the record source fills missing cells.
    pub fn value(&self, column: &str) -> &str {
        match column {
            DECRYPTED_COLUMN => &self.decrypted,
            ENCRYPTED_COLUMN => &self.encrypted,
            other => self.record.get(other).unwrap_or(""),
        }
    }
}
