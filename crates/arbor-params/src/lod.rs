use std::fmt;

use crate::error::CapsuleError;
use crate::field::{field, read_fields, write_fields, FieldDescriptor};
use crate::parameters::Parameters;
use crate::savable::{InputCapsule, OutputCapsule, Savable};

pub const DEFAULT_DISTANCE: f32 = 0.0;
pub const DEFAULT_REDUCTION: ReductionType = ReductionType::Normal;
pub const DEFAULT_BRANCH_DEPTH: i32 = i32::MAX;
pub const DEFAULT_ROOT_DEPTH: i32 = i32::MAX;
pub const DEFAULT_MAX_RADIAL_SEGMENTS: i32 = 6;

/// Mesh simplification strategy used by a level of detail band.
///
/// Persisted by [`ReductionType::name`]; those names must not change.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReductionType {
    #[default]
    Normal,
    FlatPoly,
    Impostor,
}

impl ReductionType {
    pub const ALL: [ReductionType; 3] = [ReductionType::Normal, ReductionType::FlatPoly, ReductionType::Impostor];

    /// Symbolic name used in maps and capsules.
    pub fn name(&self) -> &'static str {
        match self {
            ReductionType::Normal => "Normal",
            ReductionType::FlatPoly => "FlatPoly",
            ReductionType::Impostor => "Impostor",
        }
    }

    /// Human readable label for editors.
    pub fn label(&self) -> &'static str {
        match self {
            ReductionType::Normal => "Normal",
            ReductionType::FlatPoly => "Flat-poly",
            ReductionType::Impostor => "Impostor",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.name() == name)
    }
}

impl fmt::Display for ReductionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Level of detail settings for one distance band of a tree model.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelOfDetailParameters {
    /// Distance from the tree at which this level takes effect.
    pub distance: f32,
    /// Mesh reduction used at this level.
    pub reduction: ReductionType,
    /// Number of branch levels rendered at this level.
    pub branch_depth: i32,
    /// Number of root levels rendered at this level.
    pub root_depth: i32,
    /// Cap on the cross-section polygon sides.
    pub max_radial_segments: i32,
}

static LOD_FIELDS: [FieldDescriptor<LevelOfDetailParameters>; 5] = [
    field!("distance", "distance", distance: f32 = DEFAULT_DISTANCE),
    field!("reduction", "reduction", reduction: ReductionType = DEFAULT_REDUCTION),
    field!("branchDepth", "branchDepth", branch_depth: i32 = DEFAULT_BRANCH_DEPTH),
    field!("rootDepth", "rootDepth", root_depth: i32 = DEFAULT_ROOT_DEPTH),
    field!("maxRadialSegments", "maxRadialSegments", max_radial_segments: i32 = DEFAULT_MAX_RADIAL_SEGMENTS),
];

impl LevelOfDetailParameters {
    pub fn new(
        distance: f32,
        reduction: ReductionType,
        branch_depth: i32,
        root_depth: i32,
        max_radial_segments: i32,
    ) -> Self {
        Self {
            distance,
            reduction,
            branch_depth,
            root_depth,
            max_radial_segments,
        }
    }
}

impl Default for LevelOfDetailParameters {
    fn default() -> Self {
        Self::new(
            DEFAULT_DISTANCE,
            DEFAULT_REDUCTION,
            DEFAULT_BRANCH_DEPTH,
            DEFAULT_ROOT_DEPTH,
            DEFAULT_MAX_RADIAL_SEGMENTS,
        )
    }
}

impl fmt::Display for LevelOfDetailParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LOD[distance={}, reduction={}, branchDepth={}, rootDepth={}]",
            self.distance, self.reduction, self.branch_depth, self.root_depth
        )
    }
}

impl Parameters for LevelOfDetailParameters {
    const NAME: &'static str = "LevelOfDetailParameters";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        &LOD_FIELDS
    }
}

impl Savable for LevelOfDetailParameters {
    fn class_tag(&self) -> &'static str {
        Self::NAME
    }

    fn write(&self, out: &mut dyn OutputCapsule) -> Result<(), CapsuleError> {
        write_fields(self, Self::fields(), out);
        Ok(())
    }

    fn read(&mut self, input: &dyn InputCapsule) -> Result<(), CapsuleError> {
        read_fields(self, Self::fields(), input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParamError;
    use crate::value::{MapValue, VERSION_KEY};

    #[test]
    fn test_reduction_names_roundtrip() {
        for r in ReductionType::ALL {
            assert_eq!(ReductionType::from_name(r.name()), Some(r));
        }
        assert_eq!(ReductionType::from_name("Flat-poly"), None);
        assert_eq!(ReductionType::FlatPoly.to_string(), "Flat-poly");
    }

    #[test]
    fn test_defaults() {
        let lod = LevelOfDetailParameters::default();
        assert_eq!(lod.distance, 0.0);
        assert_eq!(lod.reduction, ReductionType::Normal);
        assert_eq!(lod.branch_depth, i32::MAX);
        assert_eq!(lod.root_depth, i32::MAX);
        assert_eq!(lod.max_radial_segments, 6);
    }

    #[test]
    fn test_map_roundtrip() {
        let lod = LevelOfDetailParameters::new(100.0, ReductionType::Impostor, 20, 5, 10);
        let map = lod.to_map();
        assert_eq!(map[VERSION_KEY], MapValue::Int(1));
        assert_eq!(map["reduction"], MapValue::from("Impostor"));

        let mut loaded = LevelOfDetailParameters::default();
        loaded.from_map(&map).unwrap();
        assert_eq!(loaded, lod);
    }

    #[test]
    fn test_unknown_reduction_name_fails() {
        let mut map = LevelOfDetailParameters::default().to_map();
        map.insert("reduction".to_string(), MapValue::from("Billboard"));
        let err = LevelOfDetailParameters::default().from_map(&map).unwrap_err();
        assert!(matches!(err, ParamError::UnknownVariant { ref value, .. } if value == "Billboard"));
    }

    #[test]
    fn test_display() {
        let lod = LevelOfDetailParameters::new(20.0, ReductionType::FlatPoly, 2, 2, 3);
        assert_eq!(lod.to_string(), "LOD[distance=20, reduction=Flat-poly, branchDepth=2, rootDepth=2]");
    }
}
