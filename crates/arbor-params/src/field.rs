//! Static field-descriptor tables.
//!
//! Every parameters record lists its persisted fields once, in a table of
//! [`FieldDescriptor`]s. The generic map conversion and the capsule
//! read/write in this module walk that table, so adding a field to a record
//! means adding one row.

use crate::error::{CapsuleError, ParamError};
use crate::lod::ReductionType;
use crate::savable::{InputCapsule, OutputCapsule};
use crate::value::{FieldKind, FieldValue, MapValue, ParamMap, VERSION_KEY};

/// One persisted field of a record of type `T`.
pub struct FieldDescriptor<T> {
    /// Name in the key-value map form.
    pub key: &'static str,
    /// Tag in the binary capsule form.
    pub tag: &'static str,
    /// Default used for binary elision; also fixes the field kind.
    pub default: FieldValue,
    pub get: fn(&T) -> FieldValue,
    /// Receives a value already coerced to the field kind.
    pub set: fn(&mut T, FieldValue),
}

impl<T> FieldDescriptor<T> {
    pub fn kind(&self) -> FieldKind {
        self.default.kind()
    }
}

/// Build a [`FieldDescriptor`] row for a plain struct field.
macro_rules! field {
    ($key:literal, $tag:literal, $field:ident: bool = $default:expr) => {
        $crate::field::FieldDescriptor {
            key: $key,
            tag: $tag,
            default: $crate::value::FieldValue::Bool($default),
            get: |p| $crate::value::FieldValue::Bool(p.$field),
            set: |p, v| p.$field = v.as_bool(),
        }
    };
    ($key:literal, $tag:literal, $field:ident: i32 = $default:expr) => {
        $crate::field::FieldDescriptor {
            key: $key,
            tag: $tag,
            default: $crate::value::FieldValue::Int($default),
            get: |p| $crate::value::FieldValue::Int(p.$field),
            set: |p, v| p.$field = v.as_int(),
        }
    };
    ($key:literal, $tag:literal, $field:ident: f32 = $default:expr) => {
        $crate::field::FieldDescriptor {
            key: $key,
            tag: $tag,
            default: $crate::value::FieldValue::Float($default),
            get: |p| $crate::value::FieldValue::Float(p.$field),
            set: |p, v| p.$field = v.as_float(),
        }
    };
    ($key:literal, $tag:literal, $field:ident: ReductionType = $default:expr) => {
        $crate::field::FieldDescriptor {
            key: $key,
            tag: $tag,
            default: $crate::value::FieldValue::Reduction($default),
            get: |p| $crate::value::FieldValue::Reduction(p.$field),
            set: |p, v| p.$field = v.as_reduction(),
        }
    };
}

pub(crate) use field;

pub fn find_field<'a, T>(fields: &'a [FieldDescriptor<T>], key: &str) -> Option<&'a FieldDescriptor<T>> {
    fields.iter().find(|f| f.key == key)
}

/// Export every field plus the format version.
pub fn fields_to_map<T>(record: &T, fields: &[FieldDescriptor<T>], version: i64) -> ParamMap {
    let mut map = ParamMap::new();
    map.insert(VERSION_KEY.to_string(), MapValue::Int(version));
    for f in fields {
        map.insert(f.key.to_string(), (f.get)(record).into());
    }
    map
}

/// Assign one map entry to the field named by `key`.
pub fn apply_map_entry<T>(
    record: &mut T,
    fields: &[FieldDescriptor<T>],
    record_name: &'static str,
    key: &str,
    value: &MapValue,
) -> Result<(), ParamError> {
    let field = find_field(fields, key).ok_or_else(|| ParamError::UnknownField {
        record: record_name,
        key: key.to_string(),
    })?;
    let value = FieldValue::coerce(key, field.kind(), value)?;
    (field.set)(record, value);
    Ok(())
}

/// Write every field under its tag together with its default.
pub fn write_fields<T>(record: &T, fields: &[FieldDescriptor<T>], out: &mut dyn OutputCapsule) {
    for f in fields {
        let value = (f.get)(record);
        match f.default {
            FieldValue::Bool(d) => out.write_bool(f.tag, value.as_bool(), d),
            FieldValue::Int(d) => out.write_int(f.tag, value.as_int(), d),
            FieldValue::Float(d) => out.write_float(f.tag, value.as_float(), d),
            FieldValue::Reduction(d) => out.write_enum(f.tag, value.as_reduction().name(), d.name()),
        }
    }
}

/// Read every field, falling back to the descriptor default for absent tags.
pub fn read_fields<T>(
    record: &mut T,
    fields: &[FieldDescriptor<T>],
    input: &dyn InputCapsule,
) -> Result<(), CapsuleError> {
    for f in fields {
        let value = match f.default {
            FieldValue::Bool(d) => FieldValue::Bool(input.read_bool(f.tag, d)?),
            FieldValue::Int(d) => FieldValue::Int(input.read_int(f.tag, d)?),
            FieldValue::Float(d) => FieldValue::Float(input.read_float(f.tag, d)?),
            FieldValue::Reduction(d) => {
                let name = input.read_enum(f.tag, d.name())?;
                let reduction = ReductionType::from_name(&name).ok_or(CapsuleError::UnknownVariant {
                    tag: f.tag.to_string(),
                    value: name.clone(),
                })?;
                FieldValue::Reduction(reduction)
            }
        };
        (f.set)(record, value);
    }
    Ok(())
}
