use arbor_params::{CapsuleError, ParamError};
use thiserror::Error;

/// Failure while encoding, decoding or persisting parameter records.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unexpected end of data at byte {0}")]
    UnexpectedEof(usize),
    #[error("invalid header {0:?}")]
    BadHeader(String),
    #[error("unsupported format version {0}")]
    UnsupportedVersion(i64),
    #[error("expected {expected:?} tag, got {found:?}")]
    UnexpectedTag { expected: &'static str, found: String },
    #[error("unknown field kind {0:?}")]
    UnknownKind(String),
    #[error("value for '{0}' is out of range")]
    OutOfRange(String),
    #[error("invalid UTF-8 string at byte {0}")]
    InvalidUtf8(usize),
    #[error("records nested deeper than {0}")]
    TooDeep(usize),
    #[error("{0} trailing bytes after the root record")]
    TrailingBytes(usize),
    #[error("'{key}' is {value}, which JSON cannot represent")]
    NonFinite { key: String, value: f64 },
    #[error(transparent)]
    Capsule(#[from] CapsuleError),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
