use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ParamError;
use crate::lod::ReductionType;

/// Key holding the format version in every exported map.
pub const VERSION_KEY: &str = "formatVersion";

/// Ordered key-value form of a parameters record, as used by editors and scripts.
pub type ParamMap = BTreeMap<String, MapValue>;

/// A single value in a [`ParamMap`].
///
/// Untagged so that a map serializes as a plain JSON object. Variant order
/// matters for deserialization: integers are tried before floats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MapValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<ParamMap>),
}

impl MapValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            MapValue::Bool(_) => "bool",
            MapValue::Int(_) => "int",
            MapValue::Float(_) => "float",
            MapValue::Text(_) => "text",
            MapValue::List(_) => "list",
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MapValue::Int(v) => Some(*v),
            MapValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }
}

impl From<bool> for MapValue {
    fn from(v: bool) -> Self {
        MapValue::Bool(v)
    }
}

impl From<i32> for MapValue {
    fn from(v: i32) -> Self {
        MapValue::Int(v as i64)
    }
}

impl From<i64> for MapValue {
    fn from(v: i64) -> Self {
        MapValue::Int(v)
    }
}

impl From<f32> for MapValue {
    fn from(v: f32) -> Self {
        MapValue::Float(v as f64)
    }
}

impl From<&str> for MapValue {
    fn from(v: &str) -> Self {
        MapValue::Text(v.to_string())
    }
}

/// Semantic type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Bool,
    Int,
    Float,
    Reduction,
}

impl FieldKind {
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "bool",
            FieldKind::Int => "int",
            FieldKind::Float => "float",
            FieldKind::Reduction => "reduction type",
        }
    }
}

/// A typed field value, as read from or written to a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Reduction(ReductionType),
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Bool(_) => FieldKind::Bool,
            FieldValue::Int(_) => FieldKind::Int,
            FieldValue::Float(_) => FieldKind::Float,
            FieldValue::Reduction(_) => FieldKind::Reduction,
        }
    }

    pub fn as_bool(self) -> bool {
        match self {
            FieldValue::Bool(v) => v,
            FieldValue::Int(v) => v != 0,
            FieldValue::Float(v) => v != 0.0,
            FieldValue::Reduction(_) => false,
        }
    }

    pub fn as_int(self) -> i32 {
        match self {
            FieldValue::Int(v) => v,
            FieldValue::Float(v) => v as i32,
            FieldValue::Bool(v) => v as i32,
            FieldValue::Reduction(r) => r as i32,
        }
    }

    pub fn as_float(self) -> f32 {
        match self {
            FieldValue::Float(v) => v,
            FieldValue::Int(v) => v as f32,
            FieldValue::Bool(v) => v as i32 as f32,
            FieldValue::Reduction(r) => r as i32 as f32,
        }
    }

    pub fn as_reduction(self) -> ReductionType {
        match self {
            FieldValue::Reduction(r) => r,
            _ => ReductionType::default(),
        }
    }

    /// Same-kind comparison on the stored bits, so `-0.0` and `0.0` differ
    /// and a NaN equals itself.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::Float(a), FieldValue::Float(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }

    /// Coerce a map value to `kind`, widening numbers and looking enums up by name.
    ///
    /// Float to int conversion truncates toward zero and saturates at the
    /// `i32` bounds. An integer outside the `i32` range is rejected.
    pub fn coerce(key: &str, kind: FieldKind, value: &MapValue) -> Result<FieldValue, ParamError> {
        let mismatch = || ParamError::TypeMismatch {
            key: key.to_string(),
            expected: kind.name(),
            found: value.type_name(),
        };
        match (kind, value) {
            (FieldKind::Bool, MapValue::Bool(v)) => Ok(FieldValue::Bool(*v)),
            (FieldKind::Int, MapValue::Int(v)) => i32::try_from(*v)
                .map(FieldValue::Int)
                .map_err(|_| ParamError::OutOfRange {
                    key: key.to_string(),
                    value: *v,
                }),
            (FieldKind::Int, MapValue::Float(v)) => Ok(FieldValue::Int(*v as i32)),
            (FieldKind::Float, MapValue::Int(v)) => Ok(FieldValue::Float(*v as f32)),
            (FieldKind::Float, MapValue::Float(v)) => Ok(FieldValue::Float(*v as f32)),
            (FieldKind::Reduction, MapValue::Text(name)) => ReductionType::from_name(name)
                .map(FieldValue::Reduction)
                .ok_or_else(|| ParamError::UnknownVariant {
                    key: key.to_string(),
                    value: name.clone(),
                }),
            _ => Err(mismatch()),
        }
    }
}

impl From<FieldValue> for MapValue {
    fn from(v: FieldValue) -> Self {
        match v {
            FieldValue::Bool(b) => MapValue::Bool(b),
            FieldValue::Int(i) => MapValue::Int(i as i64),
            FieldValue::Float(f) => MapValue::Float(f as f64),
            FieldValue::Reduction(r) => MapValue::Text(r.name().to_string()),
        }
    }
}
