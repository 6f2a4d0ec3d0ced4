//! Declared-type expression parsing.
//!
//! Field metadata declares types as strings (`"string"`, `"integer[]"`,
//! `"PhoneList<PhoneNumber>"`, `"Carrier|null"`). Expressions are parsed once
//! at registry build time into [`DeclaredType`] values so the coercion engine
//! never re-parses per call.

use std::fmt;

use crate::error::MapError;

/// Primitive type names the coercion engine converts to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Bool,
    Int,
    Float,
    /// Generic ordered sequence with untyped elements.
    Array,
    /// Generic mapping kept as an opaque document value.
    Object,
}

/// A parsed type expression, without the nullable marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// The `any`/`mixed` sentinel - raw document values pass through.
    Any,
    /// Declared as the empty string. An error if ever needed for
    /// disambiguation.
    Empty,
    Primitive(Primitive),
    /// `T[]` - ordered sequence of `T`.
    Sequence(Box<TypeExpr>),
    /// `Name<T>` - a named collection type with `T` elements.
    Collection { name: String, element: Box<TypeExpr> },
    /// A composite type resolved against the registry.
    Named(String),
}

/// A field's declared type: the expression plus the `|null` union marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredType {
    pub expr: TypeExpr,
    pub nullable: bool,
}

/// Parse a declared-type string.
///
/// The `null` union member may appear in any position and any case
/// (`"Carrier|null"`, `"NULL|string"`); it sets the nullable marker and is
/// removed from the expression. Unions of two or more non-null members are
/// not supported.
pub fn parse(input: &str) -> Result<DeclaredType, MapError> {
    let mut nullable = false;
    let mut parts: Vec<&str> = Vec::new();
    for part in input.split('|') {
        let part = part.trim();
        if part.eq_ignore_ascii_case("null") {
            nullable = true;
        } else {
            parts.push(part);
        }
    }

    let expr = match parts.as_slice() {
        [] => TypeExpr::Empty,
        [single] => parse_single(single)?,
        _ => {
            return Err(MapError::InvalidArgument {
                message: format!(
                    "union type \"{input}\" is not supported; only a single type with an optional |null member is allowed"
                ),
            })
        }
    };

    Ok(DeclaredType { expr, nullable })
}

fn parse_single(input: &str) -> Result<TypeExpr, MapError> {
    if input.is_empty() {
        return Ok(TypeExpr::Empty);
    }

    if let Some(element) = input.strip_suffix("[]") {
        return Ok(TypeExpr::Sequence(Box::new(parse_single(element)?)));
    }

    if let Some(rest) = input.strip_suffix('>') {
        let (name, element) = rest.split_once('<').ok_or_else(|| MapError::InvalidArgument {
            message: format!("malformed collection type \"{input}\""),
        })?;
        if name.is_empty() {
            return Err(MapError::InvalidArgument {
                message: format!("collection type \"{input}\" is missing a name"),
            });
        }
        return Ok(TypeExpr::Collection {
            name: name.to_string(),
            element: Box::new(parse_single(element.trim())?),
        });
    }

    Ok(match input {
        "any" | "mixed" => TypeExpr::Any,
        "string" => TypeExpr::Primitive(Primitive::String),
        "bool" | "boolean" => TypeExpr::Primitive(Primitive::Bool),
        "int" | "integer" => TypeExpr::Primitive(Primitive::Int),
        "float" | "double" | "number" => TypeExpr::Primitive(Primitive::Float),
        "array" => TypeExpr::Primitive(Primitive::Array),
        "object" => TypeExpr::Primitive(Primitive::Object),
        name => TypeExpr::Named(name.to_string()),
    })
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Any => write!(f, "any"),
            TypeExpr::Empty => write!(f, "(empty)"),
            TypeExpr::Primitive(p) => write!(f, "{p}"),
            TypeExpr::Sequence(element) => write!(f, "{element}[]"),
            TypeExpr::Collection { name, element } => write!(f, "{name}<{element}>"),
            TypeExpr::Named(name) => write!(f, "{name}"),
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Primitive::String => "string",
            Primitive::Bool => "bool",
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::Array => "array",
            Primitive::Object => "object",
        };
        write!(f, "{name}")
    }
}
