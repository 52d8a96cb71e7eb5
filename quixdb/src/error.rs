use std::fmt::{self, Display};

/// The error taxonomy for the storage engine (see spec §7).
///
/// Every fallible operation in this crate returns one of these variants; the
/// engine never retries I/O itself and never papers over a parse failure.
#[derive(Debug)]
pub enum Error {
    /// A row is missing a declared column, has the wrong value type for one,
    /// or a `where`/`changes` map names a column the schema does not have.
    SchemaViolation(String),
    /// `insert`/`update` would create a second live frame for a unique key.
    DuplicateKey(String),
    /// `update`/`delete` found no row matching `where`.
    NotFound,
    /// `create_table` was called on an existing table with incompatible
    /// columns or unique set.
    SchemaConflict(String),
    /// A single frame failed to parse (bad length prefix, truncated payload).
    CorruptFrame(String),
    /// The log as a whole cannot be trusted past a certain point; fatal to
    /// open, not recoverable by discarding a tail.
    CorruptLog(String),
    /// A filesystem-level failure: permission, disk full, fsync failure, a
    /// lock already held, etc.
    Io(std::io::Error),
}

pub type CResult<T> = Result<T, Error>;

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SchemaViolation(msg) => write!(f, "schema violation: {msg}"),
            Error::DuplicateKey(msg) => write!(f, "duplicate key: {msg}"),
            Error::NotFound => write!(f, "not found"),
            Error::SchemaConflict(msg) => write!(f, "schema conflict: {msg}"),
            Error::CorruptFrame(msg) => write!(f, "corrupt frame: {msg}"),
            Error::CorruptLog(msg) => write!(f, "corrupt log: {msg}"),
            Error::Io(err) => write!(f, "io error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error::CorruptFrame(err.to_string())
    }
}
