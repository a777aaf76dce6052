use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum LedgerError {
    /// Destination path is already taken. Never overwritten.
    OutputExists(PathBuf),
    /// A record's `created` value cannot be represented as a local date-time.
    Timestamp { id: String, created: i64 },
    /// CSV serialization error.
    Csv(String),
    /// IO error (directory creation, temp file, persist).
    Io(String),
}

impl fmt::Display for LedgerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutputExists(path) => {
                write!(f, "file already exists: {}", path.display())
            }
            Self::Timestamp { id, created } => {
                write!(f, "record '{id}': timestamp {created} is out of range")
            }
            Self::Csv(msg) => write!(f, "CSV write error: {msg}"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

impl From<csv::Error> for LedgerError {
    fn from(e: csv::Error) -> Self {
        Self::Csv(e.to_string())
    }
}
