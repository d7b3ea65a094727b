pub mod error;
pub mod value;
pub mod field;
pub mod savable;
pub mod parameters;
pub mod branch;
pub mod lod;
pub mod tree;

pub use error::{CapsuleError, ParamError};
pub use value::{FieldKind, FieldValue, MapValue, ParamMap, VERSION_KEY};
pub use field::FieldDescriptor;
pub use savable::{InputCapsule, OutputCapsule, Savable};
pub use parameters::{ParamArena, ParamId, Parameters, PARENT_TAG};
pub use branch::BranchParameters;
pub use lod::{LevelOfDetailParameters, ReductionType};
pub use tree::{Effective, TreeParameters, BRANCHES_KEY, LODS_KEY, ROOTS_KEY};
