//! `schemapack`
//!
//! Schema-driven binary serialization with versioned types and in-place
//! schema migration.
//!
//! Applications declare named logical types, each with one or more
//! numbered versions described by a concrete Rust type. Records encode to
//! a compact binary form prefixed with their schema version; decoding
//! either materializes a typed value or, for older versions, walks the
//! record through registered upgrade functions up to the newest shape.
//!
//! # Example
//!
//! ```
//! use schemapack::{packable, upgrader, TypeSet, Value};
//!
//! packable! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct PersonV0 {
//!         pub name: String,
//!     }
//! }
//!
//! packable! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct PersonV1 {
//!         pub name: String,
//!         pub age: u16,
//!     }
//! }
//!
//! # fn main() -> Result<(), schemapack::RegistryError> {
//! let mut set = TypeSet::new();
//! set.register_type("person").add_version::<PersonV0>(0, None)?;
//!
//! let encoded = set.type_named("person").encode_obj(&PersonV0 {
//!     name: "Brend".to_owned(),
//! })?;
//!
//! // A later deployment knows a richer shape and how to reach it.
//! set.get_mut("person").unwrap().add_version::<PersonV1>(
//!     1,
//!     Some(upgrader(|mut person| {
//!         person.insert("age".to_owned(), Value::Uint(32));
//!         Ok(person)
//!     })),
//! )?;
//!
//! let (decoded, upgraded) = set.type_named("person").decode_obj_map(&encoded)?;
//! assert!(upgraded);
//! assert_eq!(decoded.get("age").and_then(Value::as_uint), Some(32));
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod keys;
pub mod registry;
pub mod versioned;

// Re-export core types
pub use schemapack_core::{
    packable, AttrMap, FieldKind, FieldNode, Pack, PackError, Reader, SpecBuilder, TypeSpec, Value,
};

pub use error::{BoxError, RegistryError};
pub use registry::{TypeSet, RESERVED_TYPE_NAME, RESERVED_TYPE_TAG};
pub use versioned::{upgrader, Decoded, Upgrader, Version, VersionedType, VERSION_KEY};
