//! Error types for document mapping.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable, machine-readable error codes for structured consumers.
///
/// Variant names and their serialized `snake_case` strings are a stable
/// contract - downstream tooling matches on them, so they must never change
/// across versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorCode {
    /// Input is not the expected document or type shape.
    InvalidArgument,
    /// A document key has no matching field and strict mode is enabled.
    UndefinedProperty,
    /// A field marked required was absent from the document.
    MissingRequiredProperty,
    /// A declared type name cannot be resolved against the registry.
    UnknownType,
    /// A field's declared type string is empty but needed for disambiguation.
    EmptyDeclaredType,
    /// A referenced factory name has no registered factory function.
    FactoryNotCallable,
    /// The subtype graph declares a type as its own (transitive) subtype.
    CyclicRegistration,
    /// Two type descriptors were registered under the same name.
    DuplicateType,
    /// Nested mapping exceeded the configured depth bound.
    RecursionDepthExceeded,
}

/// Errors produced by registry construction and document mapping.
///
/// Mapping is fail-fast: the first structural error aborts the whole
/// top-level call and propagates unchanged, with no partial object returned.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum MapError {
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("document key \"{key}\" does not exist in type {type_name}")]
    UndefinedProperty { key: String, type_name: String },

    #[error("required field \"{field}\" of type {type_name} is missing in the document")]
    MissingRequiredProperty { field: String, type_name: String },

    #[error("type \"{name}\" referenced by {referrer} is not registered")]
    UnknownType { name: String, referrer: String },

    #[error("empty declared type at {type_name}.{field}")]
    EmptyDeclaredType { type_name: String, field: String },

    #[error("factory \"{name}\" referenced by type {type_name} is not callable")]
    FactoryNotCallable { name: String, type_name: String },

    #[error("type \"{type_name}\" is registered as its own (transitive) subtype")]
    CyclicRegistration { type_name: String },

    #[error("type \"{name}\" is registered more than once")]
    DuplicateType { name: String },

    #[error("recursion depth exceeded while mapping {type_name} (max: {max_depth})")]
    RecursionDepthExceeded { type_name: String, max_depth: usize },
}

impl MapError {
    /// Returns the stable error code for this error variant.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            MapError::InvalidArgument { .. } => ErrorCode::InvalidArgument,
            MapError::UndefinedProperty { .. } => ErrorCode::UndefinedProperty,
            MapError::MissingRequiredProperty { .. } => ErrorCode::MissingRequiredProperty,
            MapError::UnknownType { .. } => ErrorCode::UnknownType,
            MapError::EmptyDeclaredType { .. } => ErrorCode::EmptyDeclaredType,
            MapError::FactoryNotCallable { .. } => ErrorCode::FactoryNotCallable,
            MapError::CyclicRegistration { .. } => ErrorCode::CyclicRegistration,
            MapError::DuplicateType { .. } => ErrorCode::DuplicateType,
            MapError::RecursionDepthExceeded { .. } => ErrorCode::RecursionDepthExceeded,
        }
    }

    /// Returns the offending field or document key, if this error names one.
    pub fn field(&self) -> Option<&str> {
        match self {
            MapError::UndefinedProperty { key, .. } => Some(key),
            MapError::MissingRequiredProperty { field, .. } => Some(field),
            MapError::EmptyDeclaredType { field, .. } => Some(field),
            _ => None,
        }
    }

    /// Returns the target type context, if available.
    pub fn type_name(&self) -> Option<&str> {
        match self {
            MapError::InvalidArgument { .. } => None,
            MapError::UndefinedProperty { type_name, .. } => Some(type_name),
            MapError::MissingRequiredProperty { type_name, .. } => Some(type_name),
            MapError::UnknownType { name, .. } => Some(name),
            MapError::EmptyDeclaredType { type_name, .. } => Some(type_name),
            MapError::FactoryNotCallable { type_name, .. } => Some(type_name),
            MapError::CyclicRegistration { type_name } => Some(type_name),
            MapError::DuplicateType { name } => Some(name),
            MapError::RecursionDepthExceeded { type_name, .. } => Some(type_name),
        }
    }

    /// Produces a structured JSON error for non-Rust consumers.
    ///
    /// Format: `{"code": "...", "message": "...", "field": "..." | null,
    /// "type": "..." | null}`
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "code": self.error_code(),
            "message": self.to_string(),
            "field": self.field(),
            "type": self.type_name(),
        })
    }
}

// ===========================================================================
// Tests
// ===========================================================================
