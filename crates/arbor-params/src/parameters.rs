//! The shared parameters base: descriptor-driven map conversion and
//! single-parent settings inheritance.

use crate::error::{CapsuleError, ParamError};
use crate::field::{apply_map_entry, fields_to_map, FieldDescriptor};
use crate::savable::{InputCapsule, OutputCapsule, Savable};
use crate::value::{MapValue, ParamMap, VERSION_KEY};

/// Capsule tag holding the parent record.
pub const PARENT_TAG: &str = "parent";

/// Behaviour shared by every parameters record.
pub trait Parameters: Default + Clone + Savable + 'static {
    /// Record name, used as the capsule class tag and in error messages.
    const NAME: &'static str;
    const FORMAT_VERSION: i64 = 1;

    /// The persisted fields of this record.
    fn fields() -> &'static [FieldDescriptor<Self>];

    fn to_map(&self) -> ParamMap {
        fields_to_map(self, Self::fields(), Self::FORMAT_VERSION)
    }

    /// Assign every entry of `map`. On error `self` is left unchanged.
    fn from_map(&mut self, map: &ParamMap) -> Result<(), ParamError> {
        check_version(Self::NAME, Self::FORMAT_VERSION, map);
        let mut next = self.clone();
        for (key, value) in map {
            if key == VERSION_KEY {
                continue;
            }
            apply_map_entry(&mut next, Self::fields(), Self::NAME, key, value)?;
        }
        *self = next;
        Ok(())
    }
}

/// The version key is informational; a newer one is only reported.
pub(crate) fn check_version(record: &str, supported: i64, map: &ParamMap) {
    if let Some(version) = map.get(VERSION_KEY).and_then(MapValue::as_i64) {
        if version > supported {
            log::warn!(
                "{} map has format version {}, newer than supported {}; reading anyway",
                record,
                version,
                supported
            );
        }
    }
}

/// Handle to a record stored in a [`ParamArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(usize);

impl ParamId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node<T> {
    params: T,
    parent: Option<ParamId>,
}

/// Owns a set of records of one type and the parent links between them.
///
/// Parent chains are always acyclic: [`ParamArena::set_parent`] refuses a
/// link that would close a loop.
#[derive(Debug, Clone)]
pub struct ParamArena<T> {
    nodes: Vec<Node<T>>,
}

impl<T> Default for ParamArena<T> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<T: Parameters> ParamArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn insert(&mut self, params: T, parent: Option<ParamId>) -> Result<ParamId, ParamError> {
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        let id = ParamId(self.nodes.len());
        self.nodes.push(Node { params, parent });
        Ok(id)
    }

    pub fn get(&self, id: ParamId) -> Option<&T> {
        self.nodes.get(id.0).map(|n| &n.params)
    }

    pub fn get_mut(&mut self, id: ParamId) -> Option<&mut T> {
        self.nodes.get_mut(id.0).map(|n| &mut n.params)
    }

    pub fn parent(&self, id: ParamId) -> Option<ParamId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }

    pub fn set_parent(&mut self, child: ParamId, parent: Option<ParamId>) -> Result<(), ParamError> {
        self.node(child)?;
        if let Some(parent) = parent {
            self.node(parent)?;
            let mut cursor = Some(parent);
            while let Some(id) = cursor {
                if id == child {
                    return Err(ParamError::ParentCycle { child, parent });
                }
                cursor = self.parent(id);
            }
        }
        self.nodes[child.0].parent = parent;
        Ok(())
    }

    /// Parent, grandparent, ... of `id`, nearest first.
    pub fn ancestors(&self, id: ParamId) -> Ancestors<'_, T> {
        Ancestors {
            arena: self,
            next: self.parent(id),
        }
    }

    /// The record with inherited settings applied: every field still at its
    /// construction default takes the first non-default value found up the
    /// parent chain.
    pub fn resolve(&self, id: ParamId) -> Result<T, ParamError> {
        let mut resolved = self.node(id)?.params.clone();
        let defaults = T::default();
        for field in T::fields() {
            let default = (field.get)(&defaults);
            if !(field.get)(&resolved).same_as(&default) {
                continue;
            }
            let inherited = self
                .ancestors(id)
                .map(|(_, params)| (field.get)(params))
                .find(|value| !value.same_as(&default));
            if let Some(value) = inherited {
                (field.set)(&mut resolved, value);
            }
        }
        Ok(resolved)
    }

    /// Copy `id` and its whole parent chain into fresh records.
    pub fn deep_clone(&mut self, id: ParamId) -> Result<ParamId, ParamError> {
        self.node(id)?;
        let mut chain = vec![id];
        chain.extend(self.ancestors(id).map(|(ancestor, _)| ancestor));

        let mut parent = None;
        for original in chain.into_iter().rev() {
            let params = self.nodes[original.0].params.clone();
            parent = Some(self.insert(params, parent)?);
        }
        parent.ok_or(ParamError::UnknownId(id))
    }

    /// Write the parent link first, then the record's own fields.
    pub fn write_node(&self, id: ParamId, out: &mut dyn OutputCapsule) -> Result<(), ParamError> {
        let node = self.node(id)?;
        if let Some(parent) = node.parent {
            self.write_node(parent, out.savable_child(PARENT_TAG, T::NAME))?;
        }
        node.params.write(out)?;
        Ok(())
    }

    /// Read a record and its parent chain, inserting every link.
    pub fn read_node(&mut self, input: &dyn InputCapsule) -> Result<ParamId, ParamError> {
        if input.class_tag() != T::NAME {
            return Err(CapsuleError::ClassMismatch {
                expected: T::NAME.to_string(),
                found: input.class_tag().to_string(),
            }
            .into());
        }
        let parent = match input.read_savable(PARENT_TAG)? {
            Some(parent) => Some(self.read_node(parent)?),
            None => None,
        };
        let mut params = T::default();
        params.read(input)?;
        self.insert(params, parent)
    }

    fn node(&self, id: ParamId) -> Result<&Node<T>, ParamError> {
        self.nodes.get(id.0).ok_or(ParamError::UnknownId(id))
    }
}

/// Iterator returned by [`ParamArena::ancestors`].
pub struct Ancestors<'a, T> {
    arena: &'a ParamArena<T>,
    next: Option<ParamId>,
}

impl<'a, T> Iterator for Ancestors<'a, T> {
    type Item = (ParamId, &'a T);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let node = self.arena.nodes.get(id.0)?;
        self.next = node.parent;
        Some((id, &node.params))
    }
}
