//! Type specs and the spec builder.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::encoding::Pack;
use crate::error::PackError;
use crate::types::{FieldKind, FieldNode};

/// A self-contained schema: a struct table plus the root node.
///
/// Struct bodies are interned in `structs` under a key derived from the
/// declaring module path and type name, so two fields of the same struct
/// type share one body and recursive types stay finite. The top node may
/// itself be a struct reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSpec {
    /// Struct identity key to struct body (a [`FieldKind::Struct`] node).
    pub structs: BTreeMap<String, FieldNode>,
    /// The root node describing the outermost value.
    pub top: FieldNode,
}

impl TypeSpec {
    pub(crate) const KEY: &'static str = concat!(module_path!(), "::TypeSpec");

    /// Derive the spec of a packable type.
    #[must_use]
    pub fn of<T: Pack>() -> Self {
        let mut builder = SpecBuilder::new();
        let top = T::schema(&mut builder);
        Self {
            structs: builder.finish(),
            top,
        }
    }

    /// A spec with an empty struct table over the given root node.
    #[must_use]
    pub fn from_node(top: FieldNode) -> Self {
        Self {
            structs: BTreeMap::new(),
            top,
        }
    }

    /// Look up a struct body by its identity key.
    pub fn struct_body(&self, name: &str) -> Result<&FieldNode, PackError> {
        self.structs
            .get(name)
            .ok_or_else(|| PackError::UnknownStruct(name.to_owned()))
    }

    /// Resolve a node for traversal: struct references are replaced by
    /// their bodies, every other node is returned as-is.
    pub fn resolve<'a>(&'a self, node: &'a FieldNode) -> Result<&'a FieldNode, PackError> {
        if node.kind == FieldKind::StructRef {
            self.struct_body(&node.struct_name)
        } else {
            Ok(node)
        }
    }

    /// Resolve a struct-reference node on behalf of a concrete struct type
    /// and fail when the node's identity disagrees with the type's.
    pub fn struct_body_for(&self, node: &FieldNode, key: &str) -> Result<&FieldNode, PackError> {
        if node.kind != FieldKind::StructRef {
            return Err(PackError::mismatch("structref", node.kind.name()));
        }
        if node.struct_name != key {
            return Err(PackError::mismatch(node.struct_name.clone(), key));
        }
        self.struct_body(&node.struct_name)
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "top: {}", self.top)?;
        for (name, body) in &self.structs {
            writeln!(f, "{name}: {body}")?;
        }
        Ok(())
    }
}

/// Accumulates struct bodies while a schema is being derived.
///
/// The builder installs a sentinel under a struct's key before walking its
/// fields, so a recursive or mutually recursive type sees the key already
/// taken and emits a reference instead of recursing forever.
#[derive(Debug, Default)]
pub struct SpecBuilder {
    structs: BTreeMap<String, Option<FieldNode>>,
}

impl SpecBuilder {
    /// An empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern the struct identified by `key`, building its field nodes with
    /// `fields` on first sight, and return a reference node either way.
    pub fn struct_node(
        &mut self,
        key: &str,
        fields: impl FnOnce(&mut Self) -> Vec<FieldNode>,
    ) -> FieldNode {
        if self.structs.contains_key(key) {
            return FieldNode::struct_ref(key);
        }
        // Sentinel first: the cycle break must happen before any field of
        // this struct is walked.
        self.structs.insert(key.to_owned(), None);
        let body = FieldNode::struct_body(fields(self));
        self.structs.insert(key.to_owned(), Some(body));
        FieldNode::struct_ref(key)
    }

    /// Finish the walk and hand back the completed struct table.
    #[must_use]
    pub fn finish(self) -> BTreeMap<String, FieldNode> {
        self.structs
            .into_iter()
            .filter_map(|(key, body)| body.map(|body| (key, body)))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::packable;

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Plain {
            name: String,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Recursive {
            inner: Option<Box<Recursive>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct Wrapper {
            rec: Option<Box<Recursive>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct MutualA {
            name_a: String,
            b: Option<Box<MutualB>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct MutualB {
            name_b: String,
            a: Option<Box<MutualA>>,
        }
    }

    packable! {
        #[derive(Debug, Default, PartialEq)]
        struct TwoOfAKind {
            left: Plain,
            right: Plain,
        }
    }

    #[test]
    fn primitive_specs_are_leaves() {
        assert_eq!(TypeSpec::of::<u8>().top.kind, FieldKind::Uint8);
        assert_eq!(TypeSpec::of::<String>().top.kind, FieldKind::String);
        assert_eq!(TypeSpec::of::<bool>().top.kind, FieldKind::Bool);
        assert!(TypeSpec::of::<u8>().structs.is_empty());
    }

    #[test]
    fn seq_spec_has_one_child() {
        let spec = TypeSpec::of::<Vec<u8>>();
        assert_eq!(spec.top.kind, FieldKind::Seq);
        assert_eq!(spec.top.children.len(), 1);
        assert_eq!(spec.top.children[0].kind, FieldKind::Uint8);
    }

    #[test]
    fn struct_spec_interns_one_body() {
        let spec = TypeSpec::of::<Plain>();
        assert_eq!(spec.structs.len(), 1);
        assert_eq!(spec.top.kind, FieldKind::StructRef);
        let body = spec.struct_body(&spec.top.struct_name).unwrap();
        assert_eq!(body.kind, FieldKind::Struct);
        assert_eq!(body.children.len(), 1);
        assert_eq!(body.children[0].label, "name");
    }

    #[test]
    fn direct_recursion_terminates_with_one_body() {
        let spec = TypeSpec::of::<Recursive>();
        assert_eq!(spec.structs.len(), 1);
        assert_eq!(spec.top.kind, FieldKind::StructRef);
    }

    #[test]
    fn wrapped_recursion_interns_two_bodies() {
        let spec = TypeSpec::of::<Wrapper>();
        assert_eq!(spec.structs.len(), 2);
    }

    #[test]
    fn mutual_recursion_interns_two_bodies_from_either_root() {
        assert_eq!(TypeSpec::of::<MutualA>().structs.len(), 2);
        assert_eq!(TypeSpec::of::<MutualB>().structs.len(), 2);
    }

    #[test]
    fn repeated_struct_fields_share_one_body() {
        let spec = TypeSpec::of::<TwoOfAKind>();
        assert_eq!(spec.structs.len(), 2);
        let body = spec.struct_body(&spec.top.struct_name).unwrap();
        assert_eq!(
            body.children[0].struct_name, body.children[1].struct_name,
            "both fields must reference the same interned body"
        );
    }

    #[test]
    fn struct_identity_mismatch_is_detected() {
        let spec = TypeSpec::of::<Plain>();
        let err = spec
            .struct_body_for(&spec.top, "somewhere::else::Other")
            .unwrap_err();
        assert!(matches!(err, PackError::TypeMismatch { .. }));
    }

    #[test]
    fn unknown_struct_reference_fails() {
        let spec = TypeSpec::of::<Plain>();
        let node = FieldNode::struct_ref("no::such::Struct");
        assert!(matches!(
            spec.resolve(&node),
            Err(PackError::UnknownStruct(_))
        ));
    }
}
