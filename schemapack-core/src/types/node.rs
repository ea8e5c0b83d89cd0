//! Schema nodes.
//!
//! A schema is a tree of [`FieldNode`]s. Each node carries a [`FieldKind`]
//! and zero or more children whose meaning depends on the kind: a sequence
//! has one child, a map has two (key then value), a pointer has one, and a
//! struct body has one child per declared field. Struct-reference nodes have
//! no children; they name a body in the spec's struct table.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of a schema node.
///
/// Discriminants are part of the wire form of self-described schemas and
/// must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FieldKind {
    /// 8-bit signed integer
    Int8 = 1,
    /// 16-bit signed integer
    Int16 = 2,
    /// 32-bit signed integer
    Int32 = 3,
    /// 64-bit signed integer
    Int64 = 4,
    /// 8-bit unsigned integer
    Uint8 = 5,
    /// 16-bit unsigned integer
    Uint16 = 6,
    /// 32-bit unsigned integer
    Uint32 = 7,
    /// 64-bit unsigned integer
    Uint64 = 8,
    /// IEEE-754 single precision
    Float32 = 9,
    /// IEEE-754 double precision
    Float64 = 10,
    /// Complex number of two f32 parts
    Complex64 = 11,
    /// Complex number of two f64 parts
    Complex128 = 12,
    /// Boolean
    Bool = 13,
    /// UTF-8 string
    String = 14,
    /// Ordered sequence, one child
    Seq = 15,
    /// Key/value mapping, two children
    Map = 16,
    /// Nullable pointer, one child
    Pointer = 17,
    /// Struct body, one child per declared field
    Struct = 18,
    /// Reference into the struct table, no children
    StructRef = 19,
    /// Declared field excluded from the payload
    Ignored = 20,
}

impl FieldKind {
    /// Decode a kind from its wire discriminant.
    #[must_use]
    pub const fn from_u8(byte: u8) -> Option<Self> {
        Some(match byte {
            1 => Self::Int8,
            2 => Self::Int16,
            3 => Self::Int32,
            4 => Self::Int64,
            5 => Self::Uint8,
            6 => Self::Uint16,
            7 => Self::Uint32,
            8 => Self::Uint64,
            9 => Self::Float32,
            10 => Self::Float64,
            11 => Self::Complex64,
            12 => Self::Complex128,
            13 => Self::Bool,
            14 => Self::String,
            15 => Self::Seq,
            16 => Self::Map,
            17 => Self::Pointer,
            18 => Self::Struct,
            19 => Self::StructRef,
            20 => Self::Ignored,
            _ => return None,
        })
    }

    /// The wire discriminant of this kind.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Short lowercase name, used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Complex64 => "complex64",
            Self::Complex128 => "complex128",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Seq => "seq",
            Self::Map => "map",
            Self::Pointer => "pointer",
            Self::Struct => "struct",
            Self::StructRef => "structref",
            Self::Ignored => "ignored",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node in a schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldNode {
    /// What this node describes.
    pub kind: FieldKind,
    /// Sub-nodes; meaning depends on `kind`.
    pub children: Vec<FieldNode>,
    /// Field name when this node is a struct member, empty otherwise.
    pub label: String,
    /// Struct table key when `kind` is [`FieldKind::StructRef`], empty otherwise.
    pub struct_name: String,
}

impl FieldNode {
    pub(crate) const KEY: &'static str = concat!(module_path!(), "::FieldNode");

    /// A childless node of the given kind.
    #[must_use]
    pub fn leaf(kind: FieldKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            label: String::new(),
            struct_name: String::new(),
        }
    }

    /// A sequence node over one element schema.
    #[must_use]
    pub fn seq(elem: FieldNode) -> Self {
        Self {
            kind: FieldKind::Seq,
            children: vec![elem],
            label: String::new(),
            struct_name: String::new(),
        }
    }

    /// A map node over key and value schemas.
    #[must_use]
    pub fn map(key: FieldNode, value: FieldNode) -> Self {
        Self {
            kind: FieldKind::Map,
            children: vec![key, value],
            label: String::new(),
            struct_name: String::new(),
        }
    }

    /// A nullable pointer node over one payload schema.
    #[must_use]
    pub fn pointer(elem: FieldNode) -> Self {
        Self {
            kind: FieldKind::Pointer,
            children: vec![elem],
            label: String::new(),
            struct_name: String::new(),
        }
    }

    /// A reference to a struct body in the spec's table.
    #[must_use]
    pub fn struct_ref(name: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::StructRef,
            children: Vec::new(),
            label: String::new(),
            struct_name: name.into(),
        }
    }

    /// A struct body node whose children are its fields in declaration order.
    #[must_use]
    pub fn struct_body(fields: Vec<FieldNode>) -> Self {
        Self {
            kind: FieldKind::Struct,
            children: fields,
            label: String::new(),
            struct_name: String::new(),
        }
    }

    /// A placeholder for a declared field that contributes no bytes.
    #[must_use]
    pub fn ignored(label: impl Into<String>) -> Self {
        Self {
            kind: FieldKind::Ignored,
            children: Vec::new(),
            label: label.into(),
            struct_name: String::new(),
        }
    }

    /// Attach a field name to this node.
    #[must_use]
    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl fmt::Display for FieldNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {}", self.kind)?;
        if !self.label.is_empty() {
            write!(f, " {:?}", self.label)?;
        }
        if !self.struct_name.is_empty() {
            write!(f, " -> {}", self.struct_name)?;
        }
        if !self.children.is_empty() {
            f.write_str(" [ ")?;
            for (i, child) in self.children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{child}")?;
            }
            f.write_str(" ]")?;
        }
        f.write_str(" }")
    }
}
