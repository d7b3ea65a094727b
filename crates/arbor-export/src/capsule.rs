//! In-memory tagged capsule: the tree of records a binary file encodes.

use arbor_params::{CapsuleError, InputCapsule, OutputCapsule};

/// One tagged value inside a [`Capsule`].
#[derive(Debug, Clone, PartialEq)]
pub enum Tagged {
    Bool(bool),
    Int(i32),
    Float(f32),
    Enum(String),
    Savable(Capsule),
    Savables(Vec<Capsule>),
}

impl Tagged {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Tagged::Bool(_) => "bool",
            Tagged::Int(_) => "int",
            Tagged::Float(_) => "float",
            Tagged::Enum(_) => "enum",
            Tagged::Savable(_) => "savable",
            Tagged::Savables(_) => "savable array",
        }
    }
}

/// A record's class name plus its tagged values, in write order.
///
/// Writing a tag that is already present replaces the old value in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Capsule {
    class: String,
    elide_defaults: bool,
    fields: Vec<(String, Tagged)>,
}

impl Capsule {
    pub fn new(class: impl Into<String>) -> Self {
        Self::with_elision(class, true)
    }

    pub fn with_elision(class: impl Into<String>, elide_defaults: bool) -> Self {
        Self {
            class: class.into(),
            elide_defaults,
            fields: Vec::new(),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &[(String, Tagged)] {
        &self.fields
    }

    pub fn get(&self, tag: &str) -> Option<&Tagged> {
        self.fields.iter().find(|(t, _)| t == tag).map(|(_, v)| v)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Store `value` under `tag`, returning its slot index.
    pub fn put(&mut self, tag: &str, value: Tagged) -> usize {
        match self.position(tag) {
            Some(pos) => {
                self.fields[pos].1 = value;
                pos
            }
            None => {
                self.fields.push((tag.to_string(), value));
                self.fields.len() - 1
            }
        }
    }

    pub fn remove(&mut self, tag: &str) -> Option<Tagged> {
        self.position(tag).map(|pos| self.fields.remove(pos).1)
    }

    fn position(&self, tag: &str) -> Option<usize> {
        self.fields.iter().position(|(t, _)| t == tag)
    }

    fn put_scalar(&mut self, tag: &str, value: Tagged, is_default: bool) {
        if self.elide_defaults && is_default {
            self.remove(tag);
        } else {
            self.put(tag, value);
        }
    }

    fn child(&self, class: &str) -> Capsule {
        Capsule::with_elision(class, self.elide_defaults)
    }

    fn mismatch(tag: &str, expected: &'static str, found: &Tagged) -> CapsuleError {
        CapsuleError::TypeMismatch {
            tag: tag.to_string(),
            expected,
            found: found.kind_name(),
        }
    }
}

impl OutputCapsule for Capsule {
    fn write_bool(&mut self, tag: &str, value: bool, default: bool) {
        self.put_scalar(tag, Tagged::Bool(value), value == default);
    }

    fn write_int(&mut self, tag: &str, value: i32, default: i32) {
        self.put_scalar(tag, Tagged::Int(value), value == default);
    }

    fn write_float(&mut self, tag: &str, value: f32, default: f32) {
        self.put_scalar(tag, Tagged::Float(value), value.to_bits() == default.to_bits());
    }

    fn write_enum(&mut self, tag: &str, name: &str, default: &str) {
        self.put_scalar(tag, Tagged::Enum(name.to_string()), name == default);
    }

    fn savable_child(&mut self, tag: &str, class: &str) -> &mut dyn OutputCapsule {
        let child = self.child(class);
        let pos = self.put(tag, Tagged::Savable(child));
        match &mut self.fields[pos].1 {
            Tagged::Savable(child) => child,
            _ => unreachable!("slot {pos} was just filled with a savable"),
        }
    }

    fn array_child(&mut self, tag: &str, class: &str) -> &mut dyn OutputCapsule {
        let child = self.child(class);
        let pos = match self.position(tag) {
            Some(pos) if matches!(self.fields[pos].1, Tagged::Savables(_)) => pos,
            _ => self.put(tag, Tagged::Savables(Vec::new())),
        };
        match &mut self.fields[pos].1 {
            Tagged::Savables(items) => {
                items.push(child);
                let last = items.len() - 1;
                &mut items[last]
            }
            _ => unreachable!("slot {pos} holds a savable array"),
        }
    }
}

impl InputCapsule for Capsule {
    fn class_tag(&self) -> &str {
        &self.class
    }

    fn read_bool(&self, tag: &str, default: bool) -> Result<bool, CapsuleError> {
        match self.get(tag) {
            None => Ok(default),
            Some(Tagged::Bool(v)) => Ok(*v),
            Some(other) => Err(Self::mismatch(tag, "bool", other)),
        }
    }

    fn read_int(&self, tag: &str, default: i32) -> Result<i32, CapsuleError> {
        match self.get(tag) {
            None => Ok(default),
            Some(Tagged::Int(v)) => Ok(*v),
            Some(other) => Err(Self::mismatch(tag, "int", other)),
        }
    }

    fn read_float(&self, tag: &str, default: f32) -> Result<f32, CapsuleError> {
        match self.get(tag) {
            None => Ok(default),
            Some(Tagged::Float(v)) => Ok(*v),
            Some(other) => Err(Self::mismatch(tag, "float", other)),
        }
    }

    fn read_enum(&self, tag: &str, default: &str) -> Result<String, CapsuleError> {
        match self.get(tag) {
            None => Ok(default.to_string()),
            Some(Tagged::Enum(name)) => Ok(name.clone()),
            Some(other) => Err(Self::mismatch(tag, "enum", other)),
        }
    }

    fn read_savable(&self, tag: &str) -> Result<Option<&dyn InputCapsule>, CapsuleError> {
        match self.get(tag) {
            None => Ok(None),
            Some(Tagged::Savable(child)) => Ok(Some(child as &dyn InputCapsule)),
            Some(other) => Err(Self::mismatch(tag, "savable", other)),
        }
    }

    fn read_savable_array(&self, tag: &str) -> Result<Option<Vec<&dyn InputCapsule>>, CapsuleError> {
        match self.get(tag) {
            None => Ok(None),
            Some(Tagged::Savables(items)) => {
                Ok(Some(items.iter().map(|c| c as &dyn InputCapsule).collect()))
            }
            Some(other) => Err(Self::mismatch(tag, "savable array", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_elided() {
        let mut capsule = Capsule::new("Probe");
        capsule.write_int("count", 4, 4);
        capsule.write_float("scale", 0.5, 0.5);
        capsule.write_bool("flag", true, false);
        assert_eq!(capsule.len(), 1);
        assert_eq!(capsule.get("flag"), Some(&Tagged::Bool(true)));
    }

    #[test]
    fn test_elision_can_be_disabled() {
        let mut capsule = Capsule::with_elision("Probe", false);
        capsule.write_int("count", 4, 4);
        capsule.write_enum("mode", "NORMAL", "NORMAL");
        assert_eq!(capsule.len(), 2);
    }

    #[test]
    fn test_negative_zero_is_not_default() {
        let mut capsule = Capsule::new("Probe");
        capsule.write_float("angle", -0.0, 0.0);
        assert!(capsule.contains("angle"));
    }

    #[test]
    fn test_rewrite_replaces_in_place() {
        let mut capsule = Capsule::new("Probe");
        capsule.write_int("a", 1, 0);
        capsule.write_int("b", 2, 0);
        capsule.write_int("a", 3, 0);
        assert_eq!(capsule.fields()[0], ("a".to_string(), Tagged::Int(3)));
        // writing the default again drops the stale value
        capsule.write_int("b", 0, 0);
        assert!(!capsule.contains("b"));
    }

    #[test]
    fn test_absent_tags_read_as_default() {
        let capsule = Capsule::new("Probe");
        assert_eq!(capsule.read_int("count", 9).unwrap(), 9);
        assert_eq!(capsule.read_enum("mode", "NORMAL").unwrap(), "NORMAL");
        assert!(capsule.read_savable("parent").unwrap().is_none());
        assert!(capsule.read_savable_array("items").unwrap().is_none());
    }

    #[test]
    fn test_wrong_kind_is_reported() {
        let mut capsule = Capsule::new("Probe");
        capsule.write_int("count", 4, 0);
        let err = capsule.read_float("count", 0.0).unwrap_err();
        assert_eq!(
            err,
            CapsuleError::TypeMismatch {
                tag: "count".to_string(),
                expected: "float",
                found: "int",
            }
        );
    }

    #[test]
    fn test_nested_children() {
        let mut capsule = Capsule::new("Outer");
        capsule.savable_child("parent", "Outer").write_int("depth", 1, 0);
        capsule.array_child("items", "Inner").write_bool("on", true, false);
        capsule.array_child("items", "Inner").write_bool("on", false, true);

        let parent = capsule.read_savable("parent").unwrap().unwrap();
        assert_eq!(parent.read_int("depth", 0).unwrap(), 1);

        let items = capsule.read_savable_array("items").unwrap().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].class_tag(), "Inner");
        assert!(!items[1].read_bool("on", true).unwrap());
    }
}
