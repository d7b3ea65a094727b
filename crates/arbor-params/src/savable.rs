//! Tag-keyed binary persistence seam.
//!
//! Records describe themselves to an [`OutputCapsule`] and restore themselves
//! from an [`InputCapsule`]; the byte layout behind the capsules belongs to
//! whoever implements them (see the `arbor-export` crate). Every scalar is
//! written together with its default so a capsule may elide values equal to
//! the default, and every read supplies the default to reconstruct an absent
//! tag.

use crate::error::CapsuleError;

/// A record that can be written to and read from a tagged capsule.
pub trait Savable {
    /// Name identifying the record type inside a capsule.
    fn class_tag(&self) -> &'static str;

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), CapsuleError>;

    fn read(&mut self, input: &dyn InputCapsule) -> Result<(), CapsuleError>;
}

/// Write side of a tagged capsule.
pub trait OutputCapsule {
    fn write_bool(&mut self, tag: &str, value: bool, default: bool);
    fn write_int(&mut self, tag: &str, value: i32, default: i32);
    fn write_float(&mut self, tag: &str, value: f32, default: f32);
    /// Enums are stored by symbolic name.
    fn write_enum(&mut self, tag: &str, name: &str, default: &str);

    /// Open a nested record under `tag`, replacing any record already there.
    fn savable_child(&mut self, tag: &str, class: &str) -> &mut dyn OutputCapsule;

    /// Append a nested record to the array stored under `tag`.
    fn array_child(&mut self, tag: &str, class: &str) -> &mut dyn OutputCapsule;

    /// `None` is the default and leaves the tag absent.
    fn write_savable(&mut self, tag: &str, value: Option<&dyn Savable>) -> Result<(), CapsuleError> {
        match value {
            Some(v) => v.write(self.savable_child(tag, v.class_tag())),
            None => Ok(()),
        }
    }
}

/// Read side of a tagged capsule.
pub trait InputCapsule {
    fn class_tag(&self) -> &str;

    fn read_bool(&self, tag: &str, default: bool) -> Result<bool, CapsuleError>;
    fn read_int(&self, tag: &str, default: i32) -> Result<i32, CapsuleError>;
    fn read_float(&self, tag: &str, default: f32) -> Result<f32, CapsuleError>;
    fn read_enum(&self, tag: &str, default: &str) -> Result<String, CapsuleError>;

    fn read_savable(&self, tag: &str) -> Result<Option<&dyn InputCapsule>, CapsuleError>;
    fn read_savable_array(&self, tag: &str) -> Result<Option<Vec<&dyn InputCapsule>>, CapsuleError>;
}

/// Write `records` as a savable array. An empty slice leaves the tag absent.
pub fn write_records<T: Savable>(
    out: &mut dyn OutputCapsule,
    tag: &str,
    records: &[T],
) -> Result<(), CapsuleError> {
    for record in records {
        record.write(out.array_child(tag, record.class_tag()))?;
    }
    Ok(())
}

/// Restore a single record, checking that the capsule holds the right type.
pub fn read_record<T: Savable + Default>(input: &dyn InputCapsule) -> Result<T, CapsuleError> {
    let mut record = T::default();
    if input.class_tag() != record.class_tag() {
        return Err(CapsuleError::ClassMismatch {
            expected: record.class_tag().to_string(),
            found: input.class_tag().to_string(),
        });
    }
    record.read(input)?;
    Ok(record)
}

/// Restore a savable array; an absent tag reads as empty.
pub fn read_records<T: Savable + Default>(
    input: &dyn InputCapsule,
    tag: &str,
) -> Result<Vec<T>, CapsuleError> {
    match input.read_savable_array(tag)? {
        Some(children) => children.into_iter().map(|child| read_record(child)).collect(),
        None => Ok(Vec::new()),
    }
}
