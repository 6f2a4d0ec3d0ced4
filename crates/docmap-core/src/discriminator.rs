//! Polymorphic subtype resolution.
//!
//! A type may declare a discriminator: one document field name plus an
//! expected string literal (defaulting to the type's own name). Resolution is
//! depth-first over the registered subtype set, first match wins; multi-level
//! families resolve by recursion, never by composite keys. No match leaves
//! the caller to fall back to a plain instance of the requested type.

use serde_json::Value;

use crate::registry::TypeRegistry;

/// Resolve the concrete type name `document` should be mapped into, starting
/// from `candidate`. `None` when neither the candidate nor any registered
/// subtype matches.
pub(crate) fn resolve(
    registry: &TypeRegistry,
    document: &Value,
    candidate: &str,
) -> Option<String> {
    let ty = registry.get(candidate)?;
    let spec = ty.discriminator.as_ref()?;
    let expected = spec.value.as_deref().unwrap_or(candidate);

    if document.get(&spec.field).and_then(Value::as_str) == Some(expected) {
        return Some(candidate.to_string());
    }

    if !registry.is_polymorphic_base(candidate) {
        return None;
    }

    registry
        .subtypes_of(candidate)
        .iter()
        .find_map(|subtype| resolve(registry, document, subtype))
}

// ===========================================================================
// Tests
// ===========================================================================
