use crate::error::CapsuleError;
use crate::field::{field, read_fields, write_fields, FieldDescriptor};
use crate::parameters::Parameters;
use crate::savable::{InputCapsule, OutputCapsule, Savable};

pub const DEFAULT_RADIUS_SCALE: f32 = 1.0;
pub const DEFAULT_LENGTH_SCALE: f32 = 0.6;
pub const DEFAULT_TAPER: f32 = 0.7;
pub const DEFAULT_SEGMENT_VARIATION: f32 = 0.4;
pub const DEFAULT_GRAVITY: f32 = 0.1;
pub const DEFAULT_INCLINATION: f32 = 0.872;
pub const DEFAULT_TIP_ROTATION: f32 = 0.0;
pub const DEFAULT_SIDE_JOINT_START_ANGLE: f32 = 0.0;
pub const DEFAULT_TWIST: f32 = 0.0;
pub const DEFAULT_RADIAL_SEGMENTS: i32 = 6;
pub const DEFAULT_LENGTH_SEGMENTS: i32 = 4;
pub const DEFAULT_SIDE_JOINT_COUNT: i32 = 4;
pub const DEFAULT_INHERIT: bool = true;
pub const DEFAULT_HAS_END_JOINT: bool = false;

/// Geometry settings for one branch (or root) depth level.
#[derive(Debug, Clone, PartialEq)]
pub struct BranchParameters {
    pub enabled: bool,
    /// Reuse the nearest preceding non-inheriting level instead of this one.
    pub inherit: bool,
    pub radius_scale: f32,
    pub length_scale: f32,
    pub radial_segments: i32,
    pub length_segments: i32,
    pub taper: f32,
    pub inclination: f32,
    pub twist: f32,
    pub tip_rotation: f32,
    pub segment_variation: f32,
    pub gravity: f32,
    pub has_end_joint: bool,
    pub side_joint_count: i32,
    pub side_joint_start_angle: f32,
}

impl Default for BranchParameters {
    fn default() -> Self {
        Self {
            enabled: true,
            inherit: DEFAULT_INHERIT,
            radius_scale: DEFAULT_RADIUS_SCALE,
            length_scale: DEFAULT_LENGTH_SCALE,
            radial_segments: DEFAULT_RADIAL_SEGMENTS,
            length_segments: DEFAULT_LENGTH_SEGMENTS,
            taper: DEFAULT_TAPER,
            inclination: DEFAULT_INCLINATION,
            twist: DEFAULT_TWIST,
            tip_rotation: DEFAULT_TIP_ROTATION,
            segment_variation: DEFAULT_SEGMENT_VARIATION,
            gravity: DEFAULT_GRAVITY,
            has_end_joint: DEFAULT_HAS_END_JOINT,
            side_joint_count: DEFAULT_SIDE_JOINT_COUNT,
            side_joint_start_angle: DEFAULT_SIDE_JOINT_START_ANGLE,
        }
    }
}

// `enabled` is constructed true but persisted against a false default,
// matching assets already on disk.
static BRANCH_FIELDS: [FieldDescriptor<BranchParameters>; 15] = [
    field!("enabled", "enabled", enabled: bool = false),
    field!("inherit", "inherit", inherit: bool = DEFAULT_INHERIT),
    field!("radiusScale", "radiusScale", radius_scale: f32 = DEFAULT_RADIUS_SCALE),
    field!("lengthScale", "lengthScale", length_scale: f32 = DEFAULT_LENGTH_SCALE),
    field!("radialSegments", "radialSegments", radial_segments: i32 = DEFAULT_RADIAL_SEGMENTS),
    field!("lengthSegments", "lengthSegments", length_segments: i32 = DEFAULT_LENGTH_SEGMENTS),
    field!("taper", "taper", taper: f32 = DEFAULT_TAPER),
    field!("inclination", "inclination", inclination: f32 = DEFAULT_INCLINATION),
    field!("tipRotation", "tipRotation", tip_rotation: f32 = DEFAULT_TIP_ROTATION),
    field!("segmentVariation", "segmentVariation", segment_variation: f32 = DEFAULT_SEGMENT_VARIATION),
    field!("twist", "twist", twist: f32 = DEFAULT_TWIST),
    field!("gravity", "gravity", gravity: f32 = DEFAULT_GRAVITY),
    field!("hasEndJoint", "hasEndJoint", has_end_joint: bool = DEFAULT_HAS_END_JOINT),
    field!("sideJointCount", "sideJointCount", side_joint_count: i32 = DEFAULT_SIDE_JOINT_COUNT),
    field!("sideJointStartAngle", "sideJointStartAngle", side_joint_start_angle: f32 = DEFAULT_SIDE_JOINT_START_ANGLE),
];

impl BranchParameters {
    /// A non-inheriting level, the usual anchor at index 0.
    pub fn anchor() -> Self {
        Self {
            inherit: false,
            ..Self::default()
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Parameters for BranchParameters {
    const NAME: &'static str = "BranchParameters";

    fn fields() -> &'static [FieldDescriptor<Self>] {
        &BRANCH_FIELDS
    }
}

impl Savable for BranchParameters {
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
    use crate::value::{MapValue, ParamMap, VERSION_KEY};

    fn custom() -> BranchParameters {
        BranchParameters {
            enabled: false,
            inherit: false,
            radius_scale: 2.5,
            length_scale: 4.0,
            radial_segments: 6,
            length_segments: 5,
            taper: 3.3,
            inclination: 2.0,
            twist: 6.5,
            tip_rotation: 7.1,
            segment_variation: 5.5,
            gravity: 3.0,
            has_end_joint: true,
            side_joint_count: 7,
            side_joint_start_angle: 1.5,
        }
    }

    #[test]
    fn test_map_has_every_field() {
        let map = BranchParameters::default().to_map();
        assert_eq!(map.len(), 16);
        assert_eq!(map[VERSION_KEY], MapValue::Int(1));
        assert_eq!(map["sideJointStartAngle"], MapValue::Float(0.0));
        assert_eq!(map["radialSegments"], MapValue::Int(6));
        assert_eq!(map["hasEndJoint"], MapValue::Bool(false));
    }

    #[test]
    fn test_map_roundtrip() {
        let original = custom();
        let mut loaded = BranchParameters::default();
        loaded.from_map(&original.to_map()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_from_map_widens_numbers() {
        let mut map = ParamMap::new();
        map.insert("radialSegments".to_string(), MapValue::Float(8.0));
        map.insert("gravity".to_string(), MapValue::Int(2));
        let mut branch = BranchParameters::default();
        branch.from_map(&map).unwrap();
        assert_eq!(branch.radial_segments, 8);
        assert_eq!(branch.gravity, 2.0);
    }

    #[test]
    fn test_unknown_key_fails() {
        let mut map = ParamMap::new();
        map.insert("leafColor".to_string(), MapValue::Int(1));
        let err = BranchParameters::default().from_map(&map).unwrap_err();
        assert_eq!(
            err,
            ParamError::UnknownField {
                record: "BranchParameters",
                key: "leafColor".to_string()
            }
        );
    }

    #[test]
    fn test_helpers() {
        assert!(!BranchParameters::anchor().inherit);
        assert!(!BranchParameters::disabled().enabled);
    }
}
