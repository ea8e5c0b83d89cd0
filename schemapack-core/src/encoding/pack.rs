//! The [`Pack`] trait: typed introspection and codec access.
//!
//! `Pack` is implemented for every shape the schema model knows: fixed
//! width numerics, bool, strings, complex numbers, sequences, nullable
//! pointers, maps, and (through [`crate::packable!`]) structs. Each impl
//! checks the node kind it is handed, so a value encoded or decoded
//! against the wrong spec fails instead of producing garbage.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use num_complex::{Complex32, Complex64};

use crate::error::PackError;
use crate::types::{FieldKind, FieldNode, SpecBuilder, TypeSpec};

use super::varint::write_uvarint;
use super::Reader;

/// Bound on speculative preallocation from untrusted counts.
const MAX_PREALLOC: usize = 4096;

/// A type that can describe itself as a schema node and move through the
/// codec against a spec.
pub trait Pack {
    /// Append this type's schema node, interning struct bodies in the
    /// builder along the way.
    fn schema(builder: &mut SpecBuilder) -> FieldNode
    where
        Self: Sized;

    /// Encode `self` against `node`, appending to `buf`.
    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError>;

    /// Decode a value of this type against `node`.
    fn unpack(node: &FieldNode, spec: &TypeSpec, reader: &mut Reader<'_>) -> Result<Self, PackError>
    where
        Self: Sized;
}

/// Fail unless the node describes the kind the caller handles.
pub(crate) fn expect_kind(node: &FieldNode, actual: FieldKind) -> Result<(), PackError> {
    if node.kind == actual {
        Ok(())
    } else {
        Err(PackError::mismatch(node.kind.name(), actual.name()))
    }
}

/// Fetch a child node, failing on malformed schemas.
pub(crate) fn child(node: &FieldNode, index: usize) -> Result<&FieldNode, PackError> {
    node.children.get(index).ok_or_else(|| {
        PackError::Encoding(format!(
            "missing child {index} on {} node",
            node.kind.name()
        ))
    })
}

macro_rules! impl_pack_fixed {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl Pack for $ty {
            fn schema(_builder: &mut SpecBuilder) -> FieldNode {
                FieldNode::leaf(FieldKind::$kind)
            }

            fn pack(
                &self,
                node: &FieldNode,
                _spec: &TypeSpec,
                buf: &mut Vec<u8>,
            ) -> Result<(), PackError> {
                expect_kind(node, FieldKind::$kind)?;
                buf.extend_from_slice(&self.to_be_bytes());
                Ok(())
            }

            fn unpack(
                node: &FieldNode,
                _spec: &TypeSpec,
                reader: &mut Reader<'_>,
            ) -> Result<Self, PackError> {
                expect_kind(node, FieldKind::$kind)?;
                Ok(<$ty>::from_be_bytes(reader.read_array()?))
            }
        }
    )*};
}

impl_pack_fixed! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
}

impl Pack for Complex32 {
    fn schema(_builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::leaf(FieldKind::Complex64)
    }

    fn pack(&self, node: &FieldNode, _spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Complex64)?;
        buf.extend_from_slice(&self.re.to_be_bytes());
        buf.extend_from_slice(&self.im.to_be_bytes());
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        _spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Complex64)?;
        let re = f32::from_be_bytes(reader.read_array()?);
        let im = f32::from_be_bytes(reader.read_array()?);
        Ok(Self::new(re, im))
    }
}

impl Pack for Complex64 {
    fn schema(_builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::leaf(FieldKind::Complex128)
    }

    fn pack(&self, node: &FieldNode, _spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Complex128)?;
        buf.extend_from_slice(&self.re.to_be_bytes());
        buf.extend_from_slice(&self.im.to_be_bytes());
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        _spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Complex128)?;
        let re = f64::from_be_bytes(reader.read_array()?);
        let im = f64::from_be_bytes(reader.read_array()?);
        Ok(Self::new(re, im))
    }
}

impl Pack for bool {
    fn schema(_builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::leaf(FieldKind::Bool)
    }

    fn pack(&self, node: &FieldNode, _spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Bool)?;
        buf.push(u8::from(*self));
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        _spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Bool)?;
        match reader.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(PackError::InvalidBool(other)),
        }
    }
}

impl Pack for String {
    fn schema(_builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::leaf(FieldKind::String)
    }

    fn pack(&self, node: &FieldNode, _spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::String)?;
        write_uvarint(buf, self.len() as u64);
        buf.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        _spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::String)?;
        let len = reader.read_len()?;
        let bytes = reader.read_bytes(len)?;
        Self::from_utf8(bytes.to_vec())
            .map_err(|e| PackError::Encoding(format!("invalid UTF-8: {e}")))
    }
}

impl<T: Pack> Pack for Vec<T> {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::seq(T::schema(builder))
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Seq)?;
        let elem = child(node, 0)?;
        write_uvarint(buf, self.len() as u64);
        for item in self {
            item.pack(elem, spec, buf)?;
        }
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Seq)?;
        let elem = child(node, 0)?;
        let count = reader.read_len()?;
        let mut items = Self::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            items.push(T::unpack(elem, spec, reader)?);
        }
        Ok(items)
    }
}

/// Nullable pointer: one presence byte, then the payload when present.
impl<T: Pack> Pack for Option<T> {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        FieldNode::pointer(T::schema(builder))
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Pointer)?;
        match self {
            None => {
                buf.push(0);
                Ok(())
            }
            Some(value) => {
                buf.push(1);
                value.pack(child(node, 0)?, spec, buf)
            }
        }
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Pointer)?;
        match reader.read_u8()? {
            0 => Ok(None),
            1 => Ok(Some(T::unpack(child(node, 0)?, spec, reader)?)),
            other => Err(PackError::InvalidPointerTag(other)),
        }
    }
}

/// Boxes are plain indirection and contribute no bytes of their own.
impl<T: Pack> Pack for Box<T> {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        T::schema(builder)
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        self.as_ref().pack(node, spec, buf)
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        Ok(Self::new(T::unpack(node, spec, reader)?))
    }
}

/// Entries encode in iteration order, which for a `HashMap` is unstable
/// across runs; decoded bytes re-encode identically only for ordered maps.
impl<K, V> Pack for HashMap<K, V>
where
    K: Pack + Eq + Hash,
    V: Pack,
{
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        let key = K::schema(builder);
        let value = V::schema(builder);
        FieldNode::map(key, value)
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Map)?;
        let key_node = child(node, 0)?;
        let value_node = child(node, 1)?;
        write_uvarint(buf, self.len() as u64);
        for (key, value) in self {
            key.pack(key_node, spec, buf)?;
            value.pack(value_node, spec, buf)?;
        }
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Map)?;
        let key_node = child(node, 0)?;
        let value_node = child(node, 1)?;
        let count = reader.read_len()?;
        let mut map = Self::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let key = K::unpack(key_node, spec, reader)?;
            let value = V::unpack(value_node, spec, reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<K, V> Pack for BTreeMap<K, V>
where
    K: Pack + Ord,
    V: Pack,
{
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        let key = K::schema(builder);
        let value = V::schema(builder);
        FieldNode::map(key, value)
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        expect_kind(node, FieldKind::Map)?;
        let key_node = child(node, 0)?;
        let value_node = child(node, 1)?;
        write_uvarint(buf, self.len() as u64);
        for (key, value) in self {
            key.pack(key_node, spec, buf)?;
            value.pack(value_node, spec, buf)?;
        }
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        expect_kind(node, FieldKind::Map)?;
        let key_node = child(node, 0)?;
        let value_node = child(node, 1)?;
        let count = reader.read_len()?;
        let mut map = Self::new();
        for _ in 0..count {
            let key = K::unpack(key_node, spec, reader)?;
            let value = V::unpack(value_node, spec, reader)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}
