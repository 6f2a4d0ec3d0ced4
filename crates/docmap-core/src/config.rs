//! Configuration for document mapping.

use serde::{Deserialize, Serialize};

/// Options for a [`Mapper`](crate::Mapper).
///
/// ## Serialization Format
///
/// Fields are serialized in `kebab-case` (e.g., `fail-on-undefined-field`).
/// This naming convention is part of the public API contract for config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MapperOptions {
    /// Fail with `UndefinedProperty` when a document key has no matching
    /// field. Default: false - unknown keys are sunk or skipped with a log
    /// notice instead.
    pub fail_on_undefined_field: bool,
    /// Fail with `MissingRequiredProperty` when a field marked required has
    /// no corresponding document key. Default: false.
    pub fail_on_missing_required_field: bool,
    /// Reject non-object top-level input when mapping a single instance.
    /// Default: true. When disabled, a non-object document maps nothing.
    pub enforce_input_is_object: bool,
    /// Maximum nesting depth for recursive object/collection mapping
    /// (stack overflow guard). Default: 64.
    pub max_depth: usize,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            fail_on_undefined_field: false,
            fail_on_missing_required_field: false,
            enforce_input_is_object: true,
            max_depth: 64,
        }
    }
}
