//! The type coercion engine.
//!
//! Given a resolved field and a raw document value, decides how to produce a
//! value of the declared type: factory invocation, passthrough, primitive
//! conversion, sequence/collection mapping, or (possibly polymorphic)
//! recursive object mapping. Element and nested-field errors are never
//! swallowed - the first failure aborts the whole top-level mapping call.

use serde_json::Value;

use crate::error::MapError;
use crate::instance::{Instance, List, Mapped};
use crate::mapper::Mapper;
use crate::registry::CompiledField;
use crate::typeexpr::{DeclaredType, Primitive, TypeExpr};

/// Coerce a raw document value through a resolved field descriptor.
///
/// Order of decisions, each short-circuiting the rest:
/// 1. a factory reference produces the value directly;
/// 2. a nullable declared type passes `null` through;
/// 3. no declared type (or `any`) passes the raw value through;
/// 4. primitives convert by the primitive rules;
/// 5. sequences and collections map element-wise;
/// 6. composite types map recursively, via the discriminator for registered
///    polymorphic families, seeded through the single-argument constructor
///    when the raw value is a flat scalar.
pub(crate) fn coerce_field(
    mapper: &Mapper,
    owner: &str,
    field: &CompiledField,
    raw: &Value,
    depth: usize,
) -> Result<Mapped, MapError> {
    match (&field.factory, &field.factory_name) {
        (Some(factory), _) => return factory(raw),
        // A named factory that never resolved cannot be invoked. Registry
        // construction rejects this; guarded here for registries assembled
        // by hand.
        (None, Some(name)) => {
            return Err(MapError::FactoryNotCallable {
                name: name.clone(),
                type_name: owner.to_string(),
            })
        }
        (None, None) => {}
    }

    match &field.ty {
        Some(dt) => coerce_value(mapper, owner, &field.name, dt, raw, depth),
        None => Ok(Mapped::Value(raw.clone())),
    }
}

/// Coerce a raw value against a parsed declared type.
pub(crate) fn coerce_value(
    mapper: &Mapper,
    owner: &str,
    field_name: &str,
    dt: &DeclaredType,
    raw: &Value,
    depth: usize,
) -> Result<Mapped, MapError> {
    if depth > mapper.options().max_depth {
        return Err(MapError::RecursionDepthExceeded {
            type_name: owner.to_string(),
            max_depth: mapper.options().max_depth,
        });
    }

    if dt.nullable && raw.is_null() {
        return Ok(Mapped::Value(Value::Null));
    }

    match &dt.expr {
        TypeExpr::Any => Ok(Mapped::Value(raw.clone())),
        TypeExpr::Empty => Err(MapError::EmptyDeclaredType {
            type_name: owner.to_string(),
            field: field_name.to_string(),
        }),
        TypeExpr::Primitive(p) => coerce_primitive(raw, *p, owner, field_name),
        TypeExpr::Sequence(element) => {
            coerce_sequence(mapper, owner, field_name, None, element, raw, depth)
        }
        TypeExpr::Collection { name, element } => {
            coerce_sequence(mapper, owner, field_name, Some(name), element, raw, depth)
        }
        TypeExpr::Named(name) => coerce_named(mapper, owner, field_name, name, raw, depth),
    }
}

/// Composite target: flat scalars seed a wrapper instance, objects map
/// recursively (through the discriminator for polymorphic families).
fn coerce_named(
    mapper: &Mapper,
    owner: &str,
    field_name: &str,
    name: &str,
    raw: &Value,
    depth: usize,
) -> Result<Mapped, MapError> {
    match raw {
        Value::Null => Ok(Mapped::Value(Value::Null)),
        Value::Bool(_) | Value::Number(_) | Value::String(_) => {
            if !mapper.registry().contains(name) {
                return Err(unknown_type(name, owner, field_name));
            }
            Ok(Mapped::Object(Box::new(Instance::from_seed(
                name,
                raw.clone(),
            ))))
        }
        Value::Object(_) => {
            if mapper.registry().is_polymorphic_base(name) {
                // Object input never yields None from class mapping.
                match mapper.map_class_at(raw, name, depth + 1)? {
                    Some(instance) => Ok(Mapped::Object(Box::new(instance))),
                    None => Ok(Mapped::Value(Value::Null)),
                }
            } else {
                let instance = mapper
                    .registry()
                    .instantiate(name)
                    .map_err(|_| unknown_type(name, owner, field_name))?;
                mapper
                    .map_into(raw, instance, depth + 1)
                    .map(|instance| Mapped::Object(Box::new(instance)))
            }
        }
        Value::Array(_) => Err(MapError::InvalidArgument {
            message: format!(
                "cannot map a sequence onto {owner}.{field_name} declared as {name}"
            ),
        }),
    }
}

fn coerce_sequence(
    mapper: &Mapper,
    owner: &str,
    field_name: &str,
    collection: Option<&str>,
    element: &TypeExpr,
    raw: &Value,
    depth: usize,
) -> Result<Mapped, MapError> {
    let items = match raw {
        Value::Null => return Ok(Mapped::Value(Value::Null)),
        Value::Array(items) => items,
        other => {
            return Err(MapError::InvalidArgument {
                message: format!(
                    "expected a sequence for {owner}.{field_name}, {} given",
                    json_type_name(other)
                ),
            })
        }
    };

    let mut out = Vec::with_capacity(items.len());
    match element {
        // Registered polymorphic element types resolve a concrete subtype
        // per element.
        TypeExpr::Named(name) if mapper.registry().is_polymorphic_base(name) => {
            for item in items {
                match mapper.map_class_at(item, name, depth + 1)? {
                    Some(instance) => out.push(Mapped::Object(Box::new(instance))),
                    None => out.push(Mapped::Value(Value::Null)),
                }
            }
        }
        _ => {
            let dt = DeclaredType {
                expr: element.clone(),
                nullable: false,
            };
            for item in items {
                if item.is_null() {
                    out.push(Mapped::Value(Value::Null));
                    continue;
                }
                out.push(coerce_value(mapper, owner, field_name, &dt, item, depth + 1)?);
            }
        }
    }

    Ok(Mapped::List(List {
        collection: collection.map(str::to_string),
        items: out,
    }))
}

/// Primitive conversion rules. Matching types pass through (an integer
/// satisfies `float`); conversions are value-preserving - numeric strings
/// must round-trip, booleans only from the literals `"true"`/`"false"`.
/// Anything else is an explicit mismatch error.
fn coerce_primitive(
    raw: &Value,
    primitive: Primitive,
    owner: &str,
    field_name: &str,
) -> Result<Mapped, MapError> {
    let coerced = match primitive {
        Primitive::String => match raw {
            Value::String(_) => Some(raw.clone()),
            Value::Number(n) => Some(Value::String(n.to_string())),
            Value::Bool(b) => Some(Value::String(b.to_string())),
            _ => None,
        },
        Primitive::Bool => match raw {
            Value::Bool(_) => Some(raw.clone()),
            Value::String(s) if s == "true" => Some(Value::Bool(true)),
            Value::String(s) if s == "false" => Some(Value::Bool(false)),
            _ => None,
        },
        Primitive::Int => match raw {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(raw.clone()),
            Value::String(s) => s
                .parse::<i64>()
                .ok()
                .filter(|n| n.to_string() == *s)
                .map(|n| Value::Number(n.into())),
            _ => None,
        },
        Primitive::Float => match raw {
            Value::Number(_) => Some(raw.clone()),
            Value::String(s) => s
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        Primitive::Array => match raw {
            Value::Array(_) => Some(raw.clone()),
            _ => None,
        },
        Primitive::Object => match raw {
            Value::Object(_) => Some(raw.clone()),
            _ => None,
        },
    };

    coerced.map(Mapped::Value).ok_or_else(|| MapError::InvalidArgument {
        message: format!(
            "cannot coerce {} value to {primitive} at {owner}.{field_name}",
            json_type_name(raw)
        ),
    })
}

fn unknown_type(name: &str, owner: &str, field_name: &str) -> MapError {
    MapError::UnknownType {
        name: name.to_string(),
        referrer: format!("{owner}.{field_name}"),
    }
}

/// Return the JSON type name for a value.
pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                "integer"
            } else {
                "number"
            }
        }
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn coerced(raw: Value, primitive: Primitive) -> Result<Value, MapError> {
        coerce_primitive(&raw, primitive, "T", "f").map(|m| m.to_value())
    }

    #[test]
    fn test_coerce_number_to_string() {
        assert_eq!(coerced(json!(123), Primitive::String).unwrap(), json!("123"));
    }

    #[test]
    fn test_coerce_boolean_to_string() {
        assert_eq!(coerced(json!(true), Primitive::String).unwrap(), json!("true"));
    }

    #[test]
    fn test_coerce_string_to_integer() {
        assert_eq!(coerced(json!("42"), Primitive::Int).unwrap(), json!(42));
    }

    #[test]
    fn test_coerce_rejects_non_round_trip_integer() {
        // "042" parses but does not round-trip; the value would change shape.
        assert!(coerced(json!("042"), Primitive::Int).is_err());
        assert!(coerced(json!("1.5"), Primitive::Int).is_err());
        assert!(coerced(json!("hello"), Primitive::Int).is_err());
    }

    #[test]
    fn test_coerce_string_to_float() {
        let got = coerced(json!("2.78"), Primitive::Float).unwrap();
        assert!((got.as_f64().unwrap() - 2.78).abs() < f64::EPSILON);
    }

    #[test]
    fn test_integer_satisfies_float() {
        assert_eq!(coerced(json!(42), Primitive::Float).unwrap(), json!(42));
    }

    #[test]
    fn test_coerce_string_to_boolean_literals_only() {
        assert_eq!(coerced(json!("false"), Primitive::Bool).unwrap(), json!(false));
        assert_eq!(coerced(json!("true"), Primitive::Bool).unwrap(), json!(true));
        assert!(coerced(json!("1"), Primitive::Bool).is_err());
        assert!(coerced(json!("True"), Primitive::Bool).is_err());
    }

    #[test]
    fn test_generic_array_and_object_pass_through_by_shape() {
        assert_eq!(
            coerced(json!([1, "a"]), Primitive::Array).unwrap(),
            json!([1, "a"])
        );
        assert_eq!(
            coerced(json!({"name": "Telstra"}), Primitive::Object).unwrap(),
            json!({"name": "Telstra"})
        );
        assert!(coerced(json!("x"), Primitive::Array).is_err());
        assert!(coerced(json!([1]), Primitive::Object).is_err());
    }

    #[test]
    fn test_mismatch_error_names_the_field() {
        let err = coerce_primitive(&json!({}), Primitive::Int, "Widget", "count").unwrap_err();
        match err {
            MapError::InvalidArgument { message } => {
                assert!(message.contains("Widget.count"), "got: {message}");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_json_type_name() {
        assert_eq!(json_type_name(&json!(null)), "null");
        assert_eq!(json_type_name(&json!(1)), "integer");
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!([])), "array");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
