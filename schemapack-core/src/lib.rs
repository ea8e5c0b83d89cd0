//! `schemapack` core
//!
//! This crate provides the schema model and the binary codec that the
//! versioned-type registry in the `schemapack` crate builds on.
//!
//! # Modules
//!
//! - [`types`] - Schema nodes, type specs, and the neutral value model
//! - [`encoding`] - The binary codec, the [`Pack`] trait, and varints
//! - [`error`] - Error types
//!
//! # Overview
//!
//! A [`TypeSpec`] is derived from a type that implements [`Pack`]:
//!
//! ```
//! use schemapack_core::{packable, TypeSpec};
//!
//! packable! {
//!     #[derive(Debug, Default, PartialEq)]
//!     pub struct Person {
//!         pub name: String,
//!         pub age: u32,
//!     }
//! }
//!
//! let spec = TypeSpec::of::<Person>();
//! assert_eq!(spec.structs.len(), 1);
//! ```
//!
//! Values are encoded against a spec either through their `Pack` impl or
//! through the neutral [`Value`] representation used by schema upgraders.

pub mod encoding;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use encoding::{Pack, Reader};
pub use error::PackError;
pub use types::{AttrMap, FieldKind, FieldNode, SpecBuilder, TypeSpec, Value};
