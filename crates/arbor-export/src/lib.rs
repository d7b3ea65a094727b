pub mod binary;
pub mod capsule;
pub mod config;
pub mod error;
pub mod json;

pub use binary::{BinaryExporter, BinaryImporter, FORMAT_VERSION};
pub use capsule::{Capsule, Tagged};
pub use config::{ExportConfig, ImportConfig};
pub use error::ExportError;
pub use json::{from_json, load_params, save_params, to_json};
