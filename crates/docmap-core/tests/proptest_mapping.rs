//! Property tests: the mapper never panics on arbitrary scalar input, and
//! mapping is deterministic.

use docmap_core::{FieldDescriptor, Mapper, TypeDescriptor, TypeRegistry};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn person_mapper() -> Mapper {
    let registry = TypeRegistry::builder()
        .register(
            TypeDescriptor::new("Person")
                .field(FieldDescriptor::new("name").typed("string"))
                .field(FieldDescriptor::new("age").typed("integer"))
                .field(FieldDescriptor::new("note")),
        )
        .build()
        .unwrap();
    Mapper::new(registry)
}

proptest! {
    #[test]
    fn arbitrary_string_values_never_panic(name in any::<String>(), key in "[a-z_]{1,12}") {
        let mapper = person_mapper();
        let mut doc = Map::new();
        doc.insert(key, json!(name));
        // Whatever the key resolves to (a field, or nothing), mapping must
        // return a Result, never unwind.
        let _ = mapper.map_class(&Value::Object(doc), "Person");
    }

    #[test]
    fn untyped_fields_pass_any_value_through(age in any::<i64>(), flag in any::<bool>()) {
        let mapper = person_mapper();
        let doc = json!({"note": {"age": age, "flag": flag}});
        let person = mapper.map_class(&doc, "Person").unwrap().unwrap();
        prop_assert_eq!(
            person.get("note").unwrap().to_value(),
            json!({"age": age, "flag": flag})
        );
    }

    #[test]
    fn mapping_is_deterministic(name in any::<String>(), age in any::<i64>()) {
        let mapper = person_mapper();
        let doc = json!({"name": name, "age": age});
        let first = mapper.map_class(&doc, "Person").unwrap();
        let second = mapper.map_class(&doc, "Person").unwrap();
        prop_assert_eq!(first, second);
    }
}
