//! JSON persistence of parameter records via their map form.

use std::path::Path;

use arbor_params::{MapValue, ParamMap, Parameters};

use crate::error::ExportError;

/// JSON has no spelling for infinity or NaN, so such a record is refused
/// rather than written as `null`.
pub fn to_json<P: Parameters>(params: &P) -> Result<String, ExportError> {
    let map = params.to_map();
    check_finite(&map, P::NAME)?;
    Ok(serde_json::to_string_pretty(&map)?)
}

fn check_finite(map: &ParamMap, path: &str) -> Result<(), ExportError> {
    for (key, value) in map {
        match value {
            MapValue::Float(v) if !v.is_finite() => {
                return Err(ExportError::NonFinite {
                    key: format!("{path}.{key}"),
                    value: *v,
                });
            }
            MapValue::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    check_finite(item, &format!("{path}.{key}[{i}]"))?;
                }
            }
            _ => {}
        }
    }
    Ok(())
}

pub fn from_json<P: Parameters>(json: &str) -> Result<P, ExportError> {
    let map: ParamMap = serde_json::from_str(json)?;
    let mut params = P::default();
    params.from_map(&map)?;
    Ok(params)
}

/// Save a record to disk as JSON.
pub fn save_params<P: Parameters>(path: &Path, params: &P) -> Result<(), ExportError> {
    let json = to_json(params)?;
    std::fs::write(path, json)?;
    log::info!("saved {} to {}", P::NAME, path.display());
    Ok(())
}

/// Load a record from disk. Keys missing from the file keep their defaults.
pub fn load_params<P: Parameters>(path: &Path) -> Result<P, ExportError> {
    let json = std::fs::read_to_string(path)?;
    from_json(&json)
}
