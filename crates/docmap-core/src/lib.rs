//! Map parsed JSON documents onto registered record types.
//!
//! `docmap-core` converts a dynamically-typed document tree (a parsed
//! [`serde_json::Value`]) into instances of declared record types, driven
//! entirely by per-field metadata - declared type expression, alternate
//! source key, required flag, factory hook - instead of hand-written
//! conversion code. Types are described once in a [`TypeRegistry`]; the
//! [`Mapper`] resolves document keys against field tables (with a shared
//! inspection cache), coerces values recursively, picks concrete subtypes
//! through discriminators, and enforces the configured unknown-field and
//! required-field policies.
//!
//! The mapper performs no I/O and no JSON parsing: the document is assumed
//! already decoded, and the caller owns it.
//!
//! ```
//! use docmap_core::{FieldDescriptor, Mapper, TypeDescriptor, TypeRegistry};
//! use serde_json::json;
//!
//! # fn main() -> Result<(), docmap_core::MapError> {
//! let registry = TypeRegistry::builder()
//!     .register(
//!         TypeDescriptor::new("Carrier")
//!             .field(FieldDescriptor::new("name").typed("string").required()),
//!     )
//!     .build()?;
//!
//! let mapper = Mapper::new(registry);
//! let carrier = mapper
//!     .map_class(&json!({"name": "Telstra"}), "Carrier")?
//!     .expect("document is not null");
//!
//! assert_eq!(carrier.type_name(), "Carrier");
//! assert_eq!(carrier.get("name").unwrap().to_value(), json!("Telstra"));
//! # Ok(())
//! # }
//! ```

mod coerce;
pub mod config;
mod discriminator;
pub mod error;
mod inspector;
pub mod instance;
pub mod mapper;
pub mod registry;
pub mod typeexpr;

pub use config::MapperOptions;
pub use error::{ErrorCode, MapError};
pub use instance::{Instance, List, Mapped};
pub use mapper::{AdditionalPropertiesSink, Mapper};
pub use registry::{
    AccessorKind, DiscriminatorSpec, FieldDescriptor, RegistryBuilder, RegistrySpec,
    TypeDescriptor, TypeRegistry,
};
pub use typeexpr::{DeclaredType, Primitive, TypeExpr};
