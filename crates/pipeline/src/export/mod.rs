//! Streaming export of augmented records into bounded-memory artifacts.
//!
//! Two paths: chunked CSV (always available) and a binary spreadsheet
//! workbook gated on total row count. Both serialise a fixed number of rows
//! per chunk and yield control between chunks so the host stays responsive
//! on large batches.

pub mod csv;
pub mod xlsx;

pub use self::csv::CsvExporter;
pub use self::xlsx::XlsxExporter;

use bytes::Bytes;

/// A finished export artifact, ready for delivery (file write or download).
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    /// Suggested filename, `Decrypted_Vouchers_<date>.<ext>`.
    pub filename: String,
    /// The serialised artifact.
    pub bytes: Bytes,
}

/// `Decrypted_Vouchers_<ISO-date>.<ext>`, dated in local time.
fn dated_filename(extension: &str) -> String {
    format!(
        "Decrypted_Vouchers_{}.{extension}",
        chrono::Local::now().format("%Y-%m-%d")
    )
}

/// Strip private-use code points and collapse every CR/LF run to a single
/// space.
///
/// Runs before quoting, so no raw line break ever reaches a serialised field;
/// spreadsheet cells get the same treatment for consistency across the two
/// paths.
fn sanitise_field(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\r' | '\n' => {
                out.push(' ');
                while matches!(chars.peek(), Some('\r') | Some('\n')) {
                    chars.next();
                }
            }
            c if is_private_use(c) => {}
            c => out.push(c),
        }
    }
    out
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}
