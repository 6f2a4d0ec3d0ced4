//! The produced-object model.
//!
//! Mapped output is dynamic: an [`Instance`] carries the concrete type name
//! it was constructed as (which, under discriminator resolution, may be a
//! subtype of the requested type) plus an insertion-ordered field map. Field
//! values are [`Mapped`] - raw document values, nested instances, or typed
//! collections.

use indexmap::IndexMap;
use serde_json::Value;

/// A coerced field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Mapped {
    /// A raw document value: scalars, untyped passthrough, generic
    /// arrays/objects.
    Value(Value),
    /// A nested mapped instance.
    Object(Box<Instance>),
    /// An ordered, typed collection.
    List(List),
}

/// An ordered collection produced by sequence or collection coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    /// Declared concrete collection type name (`PhoneList` for
    /// `PhoneList<PhoneNumber>`), if the declaration named one.
    pub collection: Option<String>,
    pub items: Vec<Mapped>,
}

/// A populated (or in-progress) instance of a registered type.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    type_name: String,
    fields: IndexMap<String, Mapped>,
    seed: Option<Value>,
}

impl Instance {
    /// A fresh, default-constructed instance with no fields populated.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            seed: None,
        }
    }

    /// The wrapper-around-primitive pattern: an instance constructed through
    /// its single-argument constructor, seeded with a flat scalar.
    pub fn from_seed(type_name: impl Into<String>, seed: Value) -> Self {
        Self {
            type_name: type_name.into(),
            fields: IndexMap::new(),
            seed: Some(seed),
        }
    }

    /// The concrete type this instance was constructed as.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Assign a value to a named field slot. Later assignments to the same
    /// slot overwrite, keeping the slot's original position.
    pub fn set(&mut self, field: impl Into<String>, value: Mapped) {
        self.fields.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&Mapped> {
        self.fields.get(field)
    }

    /// Populated fields in assignment order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Mapped)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The constructor seed, for wrapper instances.
    pub fn seed(&self) -> Option<&Value> {
        self.seed.as_ref()
    }

    /// Encode back to a plain JSON value, preserving field order.
    ///
    /// A seeded wrapper with no populated fields encodes as its seed.
    pub fn to_value(&self) -> Value {
        if self.fields.is_empty() {
            if let Some(seed) = &self.seed {
                return seed.clone();
            }
        }
        let mut map = serde_json::Map::new();
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_value());
        }
        Value::Object(map)
    }
}

impl Mapped {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Mapped::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Instance> {
        match self {
            Mapped::Object(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Mapped::List(l) => Some(l),
            _ => None,
        }
    }

    /// Encode back to a plain JSON value.
    pub fn to_value(&self) -> Value {
        match self {
            Mapped::Value(v) => v.clone(),
            Mapped::Object(i) => i.to_value(),
            Mapped::List(l) => Value::Array(l.items.iter().map(Mapped::to_value).collect()),
        }
    }
}

impl From<Value> for Mapped {
    fn from(value: Value) -> Self {
        Mapped::Value(value)
    }
}
