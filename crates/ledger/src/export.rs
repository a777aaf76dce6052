//! Accounting-import CSV output.
//!
//! # Layout
//!
//! | Column        | Format                        | Example               |
//! |---------------|-------------------------------|-----------------------|
//! | `*Date`       | `DD/MM/YY`                    | `15/01/26`            |
//! | `*Amount`     | signed, exactly two decimals  | `-0.30`               |
//! | `Payee`       | free text, may be empty       | `Alice`               |
//! | `Description` | free text                     | `Stripe processing fees` |
//! | `Reference`   | Stripe id                     | `ch_1`                |
//! | `Timestamp`   | ISO 8601 local date-time      | `2026-01-15T10:30:00` |
//!
//! The starred columns are the ones the importer requires. A header row is
//! always written, even for an empty ledger.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::builder::Ledger;
use crate::error::LedgerError;
use crate::model::LedgerRow;

pub const HEADER: [&str; 6] = [
    "*Date",
    "*Amount",
    "Payee",
    "Description",
    "Reference",
    "Timestamp",
];

const DATE_FORMAT: &str = "%d/%m/%y";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// One output line. Field names are the importer's column headers.
#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "*Date")]
    date: String,
    #[serde(rename = "*Amount")]
    amount: String,
    #[serde(rename = "Payee")]
    payee: &'a str,
    #[serde(rename = "Description")]
    description: &'a str,
    #[serde(rename = "Reference")]
    reference: &'a str,
    #[serde(rename = "Timestamp")]
    timestamp: String,
}

impl<'a> From<&'a LedgerRow> for CsvRow<'a> {
    fn from(row: &'a LedgerRow) -> Self {
        Self {
            date: row.date.format(DATE_FORMAT).to_string(),
            amount: row.amount.to_string(),
            payee: &row.payee,
            description: &row.description,
            reference: &row.reference,
            timestamp: row.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        }
    }
}

/// Write header + rows in ledger order with CRLF line endings. Returns the
/// number of data rows.
pub fn write_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<usize, LedgerError> {
    let mut csv_writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::CRLF)
        .from_writer(writer);

    // serialize() emits the header with the first row; an empty ledger
    // still gets one
    if ledger.is_empty() {
        csv_writer.write_record(HEADER)?;
    }
    for row in ledger.rows() {
        csv_writer.serialize(CsvRow::from(row))?;
    }
    csv_writer
        .flush()
        .map_err(|e| LedgerError::Csv(format!("flush failed: {e}")))?;

    Ok(ledger.len())
}

/// Fail if `path` is already taken. Called before any data is fetched so
/// a doomed run costs no API calls.
pub fn ensure_output_available(path: &Path) -> Result<(), LedgerError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Err(LedgerError::OutputExists(path.to_path_buf())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LedgerError::Io(format!("cannot stat {}: {}", path.display(), e))),
    }
}

/// Write the ledger to a new file at `path`.
///
/// Missing parent directories are created. Rows go to a temporary file in
/// the destination directory which is linked into place only after a
/// complete, synced write; on any failure the temporary file is removed and
/// `path` is left absent. An existing file at `path` is never replaced.
pub fn write_csv_file(ledger: &Ledger, path: &Path) -> Result<usize, LedgerError> {
    ensure_output_available(path)?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| LedgerError::Io(format!("cannot create {}: {}", dir.display(), e)))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".stripe-csv-")
        .suffix(".partial")
        .tempfile_in(dir)
        .map_err(|e| {
            LedgerError::Io(format!("cannot create temp file in {}: {}", dir.display(), e))
        })?;

    let count = {
        let mut buffered = BufWriter::new(tmp.as_file_mut());
        let count = write_csv(ledger, &mut buffered)?;
        buffered
            .flush()
            .map_err(|e| LedgerError::Io(format!("write failed: {e}")))?;
        count
    };
    tmp.as_file()
        .sync_all()
        .map_err(|e| LedgerError::Io(format!("sync failed: {e}")))?;

    tmp.persist_noclobber(path).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            LedgerError::OutputExists(path.to_path_buf())
        } else {
            LedgerError::Io(format!("cannot write {}: {}", path.display(), e.error))
        }
    })?;

    log::debug!("wrote {} rows to {}", count, path.display());
    Ok(count)
}
