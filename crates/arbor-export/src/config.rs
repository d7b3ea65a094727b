/// Binary writer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportConfig {
    /// Leave out scalars equal to their declared default.
    pub elide_defaults: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            elide_defaults: true,
        }
    }
}

/// Binary reader configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportConfig {
    /// Deepest record nesting accepted, counting parent links and arrays.
    pub max_depth: usize,
    /// Largest string or array length accepted from a length prefix.
    pub max_length: usize,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_depth: 256,
            max_length: 1 << 20,
        }
    }
}
