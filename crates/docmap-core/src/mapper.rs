//! The document mapper façade.
//!
//! One [`Mapper`] pairs an immutable [`TypeRegistry`] with [`MapperOptions`]
//! and the shared inspection cache. It is `Send + Sync`; parallel callers
//! mapping independent documents share only the cache, which tolerates
//! concurrent population (see [`inspector`](crate::inspector)-module docs).

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::coerce::{self, json_type_name};
use crate::config::MapperOptions;
use crate::discriminator;
use crate::error::MapError;
use crate::inspector::InspectionCache;
use crate::instance::{Instance, Mapped};
use crate::registry::TypeRegistry;
use crate::typeexpr;

/// Caller-supplied callback receiving otherwise-unmapped key/value pairs
/// instead of having them skipped (or, in strict mode, causing an error).
pub type AdditionalPropertiesSink = Box<dyn Fn(&str, &Value) + Send + Sync>;

/// Maps parsed documents onto instances of registered types.
pub struct Mapper {
    registry: Arc<TypeRegistry>,
    options: MapperOptions,
    cache: InspectionCache,
    sink: Option<AdditionalPropertiesSink>,
}

impl Mapper {
    pub fn new(registry: impl Into<Arc<TypeRegistry>>) -> Self {
        Self::with_options(registry, MapperOptions::default())
    }

    pub fn with_options(registry: impl Into<Arc<TypeRegistry>>, options: MapperOptions) -> Self {
        Self {
            registry: registry.into(),
            options,
            cache: InspectionCache::new(),
            sink: None,
        }
    }

    /// Install the additional-properties sink. Only consulted while
    /// `fail_on_undefined_field` is disabled.
    pub fn with_additional_properties_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn options(&self) -> &MapperOptions {
        &self.options
    }

    /// Map every key/value pair of `document` into `instance`.
    ///
    /// The fresh instance is taken by value and returned populated, so no
    /// partially populated object escapes on error. Top-level non-object
    /// input is rejected while `enforce_input_is_object` is enabled;
    /// otherwise it maps nothing.
    pub fn map(&self, document: &Value, instance: Instance) -> Result<Instance, MapError> {
        if !document.is_object() {
            if self.options.enforce_input_is_object {
                return Err(MapError::InvalidArgument {
                    message: format!(
                        "map() requires an object document, {} given",
                        json_type_name(document)
                    ),
                });
            }
            tracing::info!(
                type_name = %instance.type_name(),
                actual = json_type_name(document),
                "non-object document maps nothing"
            );
            return Ok(instance);
        }
        self.map_into(document, instance, 0)
    }

    /// Map a document into a new instance of `type_name`, resolving the
    /// discriminator first when the type heads a polymorphic family. A
    /// `Null` document maps to `None`.
    pub fn map_class(&self, document: &Value, type_name: &str) -> Result<Option<Instance>, MapError> {
        self.map_class_at(document, type_name, 0)
    }

    /// Element-wise mapping over an ordered sequence, preserving order.
    /// `element_type: None` passes elements through unconverted.
    pub fn map_array(
        &self,
        document: &Value,
        element_type: Option<&str>,
    ) -> Result<Vec<Mapped>, MapError> {
        let Some(items) = document.as_array() else {
            return Err(MapError::InvalidArgument {
                message: format!(
                    "map_array() requires a sequence document, {} given",
                    json_type_name(document)
                ),
            });
        };

        let Some(element_type) = element_type else {
            return Ok(items.iter().cloned().map(Mapped::Value).collect());
        };

        let dt = typeexpr::parse(element_type)?;
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if item.is_null() {
                out.push(Mapped::Value(Value::Null));
                continue;
            }
            out.push(coerce::coerce_value(self, "map_array", "element", &dt, item, 0)?);
        }
        Ok(out)
    }

    /// Element-wise [`map_class`](Self::map_class) over an ordered sequence,
    /// failing fast on the first element error. A `Null` document maps to
    /// `None`; `Null` elements stay null.
    pub fn map_class_array(
        &self,
        document: &Value,
        type_name: &str,
    ) -> Result<Option<Vec<Mapped>>, MapError> {
        if document.is_null() {
            return Ok(None);
        }
        let Some(items) = document.as_array() else {
            return Err(MapError::InvalidArgument {
                message: format!(
                    "map_class_array() requires a sequence document, {} given",
                    json_type_name(document)
                ),
            });
        };

        let mut out = Vec::with_capacity(items.len());
        for item in items {
            match self.map_class_at(item, type_name, 0)? {
                Some(instance) => out.push(Mapped::Object(Box::new(instance))),
                None => out.push(Mapped::Value(Value::Null)),
            }
        }
        Ok(Some(out))
    }

    pub(crate) fn map_class_at(
        &self,
        document: &Value,
        type_name: &str,
        depth: usize,
    ) -> Result<Option<Instance>, MapError> {
        if document.is_null() {
            return Ok(None);
        }
        if !document.is_object() {
            return Err(MapError::InvalidArgument {
                message: format!(
                    "map_class() requires an object document, {} given",
                    json_type_name(document)
                ),
            });
        }
        if !self.registry.contains(type_name) {
            return Err(MapError::UnknownType {
                name: type_name.to_string(),
                referrer: "map_class".to_string(),
            });
        }

        let concrete = discriminator::resolve(&self.registry, document, type_name)
            .unwrap_or_else(|| type_name.to_string());
        if concrete != type_name {
            tracing::debug!(
                requested = %type_name,
                resolved = %concrete,
                "discriminator picked concrete subtype"
            );
        }

        self.map_into(document, Instance::new(concrete), depth)
            .map(Some)
    }

    pub(crate) fn map_into(
        &self,
        document: &Value,
        mut instance: Instance,
        depth: usize,
    ) -> Result<Instance, MapError> {
        let type_name = instance.type_name().to_string();
        let ty = self
            .registry
            .get(&type_name)
            .ok_or_else(|| MapError::UnknownType {
                name: type_name.clone(),
                referrer: "map".to_string(),
            })?;

        let Some(entries) = document.as_object() else {
            return Ok(instance);
        };

        let mut provided: HashSet<String> = HashSet::new();
        for (key, raw) in entries {
            let Some(field) = self.cache.resolve(ty, key) else {
                if self.options.fail_on_undefined_field {
                    return Err(MapError::UndefinedProperty {
                        key: key.clone(),
                        type_name,
                    });
                }
                if let Some(sink) = &self.sink {
                    tracing::debug!(
                        key = %key,
                        type_name = %type_name,
                        "routing unmapped key to the additional-properties sink"
                    );
                    sink(key, raw);
                } else {
                    tracing::info!(
                        key = %key,
                        type_name = %type_name,
                        "document key has no matching field; skipped"
                    );
                }
                continue;
            };

            let value = coerce::coerce_field(self, &type_name, &field, raw, depth)?;
            provided.insert(field.name.clone());
            instance.set(field.name.clone(), value);
        }

        if self.options.fail_on_missing_required_field {
            for field in &ty.fields {
                if field.required && !provided.contains(&field.name) {
                    return Err(MapError::MissingRequiredProperty {
                        field: field.name.clone(),
                        type_name,
                    });
                }
            }
        }

        Ok(instance)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FieldDescriptor, TypeDescriptor};
    use serde_json::json;
    use std::sync::Mutex;

    fn person_registry() -> TypeRegistry {
        TypeRegistry::builder()
            .register(
                TypeDescriptor::new("Person")
                    .field(FieldDescriptor::new("name").typed("string").required()),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_non_object_input_rejected_by_default() {
        let mapper = Mapper::new(person_registry());
        let err = mapper.map(&json!([1, 2]), Instance::new("Person")).unwrap_err();
        assert!(matches!(err, MapError::InvalidArgument { .. }));
    }

    #[test]
    fn test_non_object_input_maps_nothing_when_not_enforced() {
        let options = MapperOptions {
            enforce_input_is_object: false,
            ..MapperOptions::default()
        };
        let mapper = Mapper::with_options(person_registry(), options);
        let instance = mapper.map(&json!("scalar"), Instance::new("Person")).unwrap();
        assert!(instance.is_empty());
    }

    #[test]
    fn test_strict_mode_fails_on_unknown_key() {
        let options = MapperOptions {
            fail_on_undefined_field: true,
            ..MapperOptions::default()
        };
        let mapper = Mapper::with_options(person_registry(), options);
        let err = mapper
            .map(&json!({"ghost": 1}), Instance::new("Person"))
            .unwrap_err();
        assert_eq!(
            err,
            MapError::UndefinedProperty {
                key: "ghost".to_string(),
                type_name: "Person".to_string(),
            }
        );
    }

    #[test]
    fn test_sink_receives_unmapped_pairs_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = Arc::clone(&seen);
        let mapper = Mapper::new(person_registry()).with_additional_properties_sink(
            move |key, value| {
                record.lock().unwrap().push((key.to_string(), value.clone()));
            },
        );

        let instance = mapper
            .map(
                &json!({"b": 2, "name": "Jo", "a": 1}),
                Instance::new("Person"),
            )
            .unwrap();

        assert_eq!(instance.get("name").unwrap().to_value(), json!("Jo"));
        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![("b".to_string(), json!(2)), ("a".to_string(), json!(1))]
        );
    }

    #[test]
    fn test_map_class_null_document() {
        let mapper = Mapper::new(person_registry());
        assert_eq!(mapper.map_class(&Value::Null, "Person").unwrap(), None);
    }

    #[test]
    fn test_map_class_unknown_type() {
        let mapper = Mapper::new(person_registry());
        let err = mapper.map_class(&json!({}), "Ghost").unwrap_err();
        assert!(matches!(err, MapError::UnknownType { name, .. } if name == "Ghost"));
    }

    #[test]
    fn test_map_array_untyped_passthrough() {
        let mapper = Mapper::new(person_registry());
        let out = mapper.map_array(&json!([1, "a", null]), None).unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].to_value(), json!("a"));
    }

    #[test]
    fn test_map_class_array_keeps_null_elements() {
        let mapper = Mapper::new(person_registry());
        let out = mapper
            .map_class_array(&json!([{"name": "Jo"}, null]), "Person")
            .unwrap()
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_object().unwrap().type_name(), "Person");
        assert_eq!(out[1].to_value(), json!(null));
    }

    #[test]
    fn test_mapper_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Mapper>();
    }
}
