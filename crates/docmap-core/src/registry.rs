//! The type-descriptor registry.
//!
//! The mapper never inspects Rust types at runtime. Instead, each target type
//! contributes a fixed table of field descriptors - declared type expression,
//! alternate source key, required flag, factory reference, accessor kind -
//! registered once through [`RegistryBuilder`] and immutable afterwards.
//! Registration is where configuration errors surface: duplicate names,
//! subtype references to unregistered types, cycles in the subtype graph,
//! malformed type expressions, and factory names with no registered function.
//!
//! The data-only portion ([`RegistrySpec`]) is serde-compatible so registries
//! can be loaded from JSON files.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::MapError;
use crate::instance::{Instance, Mapped};
use crate::typeexpr::{self, DeclaredType};

/// A single-argument constructor hook: receives the raw document value and
/// produces the field value directly, bypassing coercion.
pub type FactoryFn = Arc<dyn Fn(&Value) -> Result<Mapped, MapError> + Send + Sync>;

/// How a field slot is assigned.
///
/// Both kinds are observably equivalent ("assign a value to this named
/// slot"); the kind only drives resolution precedence - setter-style
/// accessors are matched first, by camel-casing the document key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessorKind {
    #[default]
    Field,
    Setter,
}

/// A type's discriminator declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscriminatorSpec {
    /// Document key inspected during polymorphic resolution.
    pub field: String,
    /// Expected string literal. Defaults to the declaring type's own name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Per-field metadata, as declared.
///
/// The serialized names follow the source annotations they descend from:
/// `maps` (alias), `type` (declared type expression), `required`, `factory`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "maps", default, skip_serializing_if = "Option::is_none")]
    pub source_key: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub declared_type: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<String>,
    #[serde(default)]
    pub accessor: AccessorKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_key: None,
            declared_type: None,
            required: false,
            factory: None,
            accessor: AccessorKind::Field,
        }
    }

    /// Declare an alias: the document key this field maps from.
    pub fn maps(mut self, source_key: impl Into<String>) -> Self {
        self.source_key = Some(source_key.into());
        self
    }

    /// Declare the type expression (`"string"`, `"integer[]"`,
    /// `"Carrier|null"`, ...).
    pub fn typed(mut self, declared_type: impl Into<String>) -> Self {
        self.declared_type = Some(declared_type.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Reference a factory by name; resolved at registry build time.
    pub fn factory(mut self, name: impl Into<String>) -> Self {
        self.factory = Some(name.into());
        self
    }

    /// Mark this slot as a setter-style accessor.
    pub fn setter(mut self) -> Self {
        self.accessor = AccessorKind::Setter;
        self
    }
}

/// A registered target type, as declared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeDescriptor {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discriminator: Option<DiscriminatorSpec>,
}

impl TypeDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            discriminator: None,
        }
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Declare the discriminator field and, optionally, the expected value
    /// (defaults to the type's own name when `None`).
    pub fn discriminator(mut self, field: impl Into<String>, value: Option<&str>) -> Self {
        self.discriminator = Some(DiscriminatorSpec {
            field: field.into(),
            value: value.map(str::to_string),
        });
        self
    }
}

/// The serde-compatible registry declaration: type descriptors plus the
/// polymorphic child-type table (base type name → subtype names, searched in
/// list order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    pub types: Vec<TypeDescriptor>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub subtypes: HashMap<String, Vec<String>>,
}

/// A field descriptor compiled at build time: type expression parsed, factory
/// name resolved to a function reference.
pub struct CompiledField {
    pub name: String,
    pub source_key: Option<String>,
    pub ty: Option<DeclaredType>,
    pub required: bool,
    pub accessor: AccessorKind,
    pub factory_name: Option<String>,
    pub factory: Option<FactoryFn>,
}

impl fmt::Debug for CompiledField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledField")
            .field("name", &self.name)
            .field("source_key", &self.source_key)
            .field("ty", &self.ty)
            .field("required", &self.required)
            .field("accessor", &self.accessor)
            .field("factory", &self.factory_name)
            .finish()
    }
}

/// A registered type after compilation.
#[derive(Debug)]
pub struct RegisteredType {
    pub name: String,
    pub fields: Vec<Arc<CompiledField>>,
    pub discriminator: Option<DiscriminatorSpec>,
}

/// Builder for a [`TypeRegistry`]. All configuration errors surface from
/// [`build`](RegistryBuilder::build), never later during mapping.
#[derive(Default)]
pub struct RegistryBuilder {
    types: Vec<TypeDescriptor>,
    subtypes: HashMap<String, Vec<String>>,
    factories: HashMap<String, FactoryFn>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the builder from a deserialized [`RegistrySpec`]. Factories still
    /// have to be registered programmatically before `build`.
    pub fn from_spec(spec: RegistrySpec) -> Self {
        Self {
            types: spec.types,
            subtypes: spec.subtypes,
            factories: HashMap::new(),
        }
    }

    pub fn register(mut self, descriptor: TypeDescriptor) -> Self {
        self.types.push(descriptor);
        self
    }

    /// Register the polymorphic subtypes of `base`, searched in the given
    /// order during discriminator resolution.
    pub fn register_subtypes<I, S>(mut self, base: impl Into<String>, subtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subtypes
            .entry(base.into())
            .or_default()
            .extend(subtypes.into_iter().map(Into::into));
        self
    }

    /// Register a factory function under a name that field descriptors can
    /// reference.
    pub fn register_factory<F>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Mapped, MapError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn build(self) -> Result<TypeRegistry, MapError> {
        let mut types: HashMap<String, RegisteredType> = HashMap::new();

        for descriptor in self.types {
            if types.contains_key(&descriptor.name) {
                return Err(MapError::DuplicateType {
                    name: descriptor.name,
                });
            }
            let compiled = compile_type(descriptor, &self.factories)?;
            types.insert(compiled.name.clone(), compiled);
        }

        for (base, subtypes) in &self.subtypes {
            if !types.contains_key(base) {
                return Err(MapError::UnknownType {
                    name: base.clone(),
                    referrer: "the subtype table".to_string(),
                });
            }
            for subtype in subtypes {
                if !types.contains_key(subtype) {
                    return Err(MapError::UnknownType {
                        name: subtype.clone(),
                        referrer: format!("the subtype table of {base}"),
                    });
                }
            }
        }

        reject_subtype_cycles(&self.subtypes)?;

        Ok(TypeRegistry {
            types,
            subtypes: self.subtypes,
        })
    }
}

fn compile_type(
    descriptor: TypeDescriptor,
    factories: &HashMap<String, FactoryFn>,
) -> Result<RegisteredType, MapError> {
    let type_name = descriptor.name;
    let mut fields = Vec::with_capacity(descriptor.fields.len());

    for field in descriptor.fields {
        let ty = match &field.declared_type {
            Some(expr) => Some(typeexpr::parse(expr).map_err(|err| MapError::InvalidArgument {
                message: format!("{type_name}.{}: {err}", field.name),
            })?),
            None => None,
        };

        let factory = match &field.factory {
            Some(name) => Some(factories.get(name).cloned().ok_or_else(|| {
                MapError::FactoryNotCallable {
                    name: name.clone(),
                    type_name: type_name.clone(),
                }
            })?),
            None => None,
        };

        fields.push(Arc::new(CompiledField {
            name: field.name,
            source_key: field.source_key,
            ty,
            required: field.required,
            accessor: field.accessor,
            factory_name: field.factory,
            factory,
        }));
    }

    Ok(RegisteredType {
        name: type_name,
        fields,
        discriminator: descriptor.discriminator,
    })
}

/// Depth-first search over the subtype graph. A type reachable from itself is
/// a configuration error, rejected here rather than bounded at runtime.
fn reject_subtype_cycles(subtypes: &HashMap<String, Vec<String>>) -> Result<(), MapError> {
    fn visit<'a>(
        name: &'a str,
        subtypes: &'a HashMap<String, Vec<String>>,
        visiting: &mut Vec<&'a str>,
        done: &mut HashSet<&'a str>,
    ) -> Result<(), MapError> {
        if done.contains(name) {
            return Ok(());
        }
        if visiting.contains(&name) {
            return Err(MapError::CyclicRegistration {
                type_name: name.to_string(),
            });
        }
        visiting.push(name);
        if let Some(children) = subtypes.get(name) {
            for child in children {
                visit(child, subtypes, visiting, done)?;
            }
        }
        visiting.pop();
        done.insert(name);
        Ok(())
    }

    let mut done = HashSet::new();
    for base in subtypes.keys() {
        visit(base, subtypes, &mut Vec::new(), &mut done)?;
    }
    Ok(())
}

/// The immutable registry consulted by every mapping operation.
#[derive(Debug)]
pub struct TypeRegistry {
    types: HashMap<String, RegisteredType>,
    subtypes: HashMap<String, Vec<String>>,
}

impl TypeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredType> {
        self.types.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    /// Whether `name` is registered as the base of a polymorphic family.
    pub fn is_polymorphic_base(&self, name: &str) -> bool {
        self.subtypes.contains_key(name)
    }

    /// Registered subtypes of `base`, in registration order.
    pub fn subtypes_of(&self, base: &str) -> &[String] {
        self.subtypes.get(base).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Construct a fresh default instance of a registered type.
    pub fn instantiate(&self, name: &str) -> Result<Instance, MapError> {
        if !self.contains(name) {
            return Err(MapError::UnknownType {
                name: name.to_string(),
                referrer: "instantiate".to_string(),
            });
        }
        Ok(Instance::new(name))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeexpr::{Primitive, TypeExpr};
    use serde_json::json;

    fn animal_registry() -> RegistryBuilder {
        TypeRegistry::builder()
            .register(
                TypeDescriptor::new("Animal")
                    .discriminator("species", None)
                    .field(FieldDescriptor::new("name").typed("string")),
            )
            .register(TypeDescriptor::new("Dog").discriminator("species", Some("dog")))
            .register(TypeDescriptor::new("Cat").discriminator("species", Some("cat")))
            .register_subtypes("Animal", ["Dog", "Cat"])
    }

    #[test]
    fn test_build_compiles_field_types() {
        let registry = animal_registry().build().unwrap();
        let animal = registry.get("Animal").unwrap();
        let name = &animal.fields[0];
        assert_eq!(name.name, "name");
        assert_eq!(
            name.ty.as_ref().unwrap().expr,
            TypeExpr::Primitive(Primitive::String)
        );
        assert!(!name.ty.as_ref().unwrap().nullable);
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = TypeRegistry::builder()
            .register(TypeDescriptor::new("Widget"))
            .register(TypeDescriptor::new("Widget"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MapError::DuplicateType {
                name: "Widget".to_string()
            }
        );
    }

    #[test]
    fn test_unregistered_subtype_rejected() {
        let err = TypeRegistry::builder()
            .register(TypeDescriptor::new("Animal"))
            .register_subtypes("Animal", ["Dog"])
            .build()
            .unwrap_err();
        assert!(matches!(err, MapError::UnknownType { name, .. } if name == "Dog"));
    }

    #[test]
    fn test_subtype_cycle_rejected() {
        // A declares itself as a (transitive) subtype: A -> B -> A
        let err = TypeRegistry::builder()
            .register(TypeDescriptor::new("A"))
            .register(TypeDescriptor::new("B"))
            .register_subtypes("A", ["B"])
            .register_subtypes("B", ["A"])
            .build()
            .unwrap_err();
        assert!(matches!(err, MapError::CyclicRegistration { .. }));
    }

    #[test]
    fn test_self_cycle_rejected() {
        let err = TypeRegistry::builder()
            .register(TypeDescriptor::new("A"))
            .register_subtypes("A", ["A"])
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MapError::CyclicRegistration {
                type_name: "A".to_string()
            }
        );
    }

    #[test]
    fn test_diamond_subtype_graph_is_not_a_cycle() {
        // A -> B, A -> C, B -> D, C -> D: D reachable twice, no cycle.
        let registry = TypeRegistry::builder()
            .register(TypeDescriptor::new("A"))
            .register(TypeDescriptor::new("B"))
            .register(TypeDescriptor::new("C"))
            .register(TypeDescriptor::new("D"))
            .register_subtypes("A", ["B", "C"])
            .register_subtypes("B", ["D"])
            .register_subtypes("C", ["D"])
            .build();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_unresolved_factory_rejected() {
        let err = TypeRegistry::builder()
            .register(
                TypeDescriptor::new("Widget")
                    .field(FieldDescriptor::new("created").factory("parse_timestamp")),
            )
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            MapError::FactoryNotCallable {
                name: "parse_timestamp".to_string(),
                type_name: "Widget".to_string(),
            }
        );
    }

    #[test]
    fn test_registered_factory_resolves() {
        let registry = TypeRegistry::builder()
            .register(
                TypeDescriptor::new("Widget")
                    .field(FieldDescriptor::new("created").factory("parse_timestamp")),
            )
            .register_factory("parse_timestamp", |raw: &Value| {
                Ok(Mapped::Value(raw.clone()))
            })
            .build()
            .unwrap();
        let widget = registry.get("Widget").unwrap();
        assert!(widget.fields[0].factory.is_some());
    }

    #[test]
    fn test_malformed_type_expression_names_the_field() {
        let err = TypeRegistry::builder()
            .register(TypeDescriptor::new("Widget").field(FieldDescriptor::new("xs").typed("a|b")))
            .build()
            .unwrap_err();
        match err {
            MapError::InvalidArgument { message } => {
                assert!(message.contains("Widget.xs"), "got: {message}");
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn test_instantiate_unknown_type() {
        let registry = TypeRegistry::builder().build().unwrap();
        let err = registry.instantiate("Ghost").unwrap_err();
        assert!(matches!(err, MapError::UnknownType { name, .. } if name == "Ghost"));
    }

    #[test]
    fn test_registry_spec_round_trip() {
        let spec = RegistrySpec {
            types: vec![TypeDescriptor::new("LookupResult")
                .field(
                    FieldDescriptor::new("countryCode")
                        .maps("country_code")
                        .typed("string")
                        .required(),
                )
                .field(FieldDescriptor::new("carrier").typed("object").required())],
            subtypes: HashMap::new(),
        };

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["types"][0]["fields"][0]["maps"], json!("country_code"));
        assert_eq!(json["types"][0]["fields"][0]["type"], json!("string"));
        assert_eq!(json["types"][0]["fields"][0]["required"], json!(true));

        let parsed: RegistrySpec = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, spec);
    }

    #[test]
    fn test_spec_accepts_minimal_field_declaration() {
        let spec: RegistrySpec = serde_json::from_value(json!({
            "types": [{"name": "Carrier", "fields": [{"name": "name"}]}]
        }))
        .unwrap();
        let field = &spec.types[0].fields[0];
        assert_eq!(field.name, "name");
        assert_eq!(field.source_key, None);
        assert_eq!(field.declared_type, None);
        assert!(!field.required);
        assert_eq!(field.accessor, AccessorKind::Field);
    }
}
