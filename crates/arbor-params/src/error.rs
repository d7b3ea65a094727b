use thiserror::Error;

use crate::parameters::ParamId;

/// Failure while reading or writing a tagged capsule.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapsuleError {
    #[error("tag '{tag}' holds a {found}, expected a {expected}")]
    TypeMismatch {
        tag: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("tag '{tag}' holds unknown enum name '{value}'")]
    UnknownVariant { tag: String, value: String },
    #[error("expected a '{expected}' record, found '{found}'")]
    ClassMismatch { expected: String, found: String },
}

/// Failure while editing or converting parameter records.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
    #[error("{record} has no field named '{key}'")]
    UnknownField { record: &'static str, key: String },
    #[error("field '{key}' expects a {expected} value, got {found}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("field '{key}' has unknown enum name '{value}'")]
    UnknownVariant { key: String, value: String },
    #[error("field '{key}' value {value} does not fit in a 32-bit integer")]
    OutOfRange { key: String, value: i64 },
    #[error("index {index} is out of range for a sequence of length {len}")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("no element at index {index} (sequence length {len})")]
    NotFound { index: usize, len: usize },
    #[error("no parameters record with id {0:?}")]
    UnknownId(ParamId),
    #[error("making {parent:?} the parent of {child:?} would create a cycle")]
    ParentCycle { child: ParamId, parent: ParamId },
    #[error(transparent)]
    Capsule(#[from] CapsuleError),
}
