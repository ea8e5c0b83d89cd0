//! Core schema and value types.

mod node;
mod spec;
mod value;

pub use node::{FieldKind, FieldNode};
pub use spec::{SpecBuilder, TypeSpec};
pub use value::{AttrMap, Value};
