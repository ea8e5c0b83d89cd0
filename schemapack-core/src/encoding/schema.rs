//! Schemas as values: [`Pack`] impls for [`FieldNode`] and [`TypeSpec`].
//!
//! These impls let a spec be encoded against a spec derived from itself,
//! which is what makes registered type schemas persistable.

use std::collections::BTreeMap;

use crate::error::PackError;
use crate::types::{FieldKind, FieldNode, SpecBuilder, TypeSpec};

use super::pack::{child, Pack};
use super::Reader;

impl Pack for FieldNode {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        builder.struct_node(Self::KEY, |builder| {
            vec![
                <u8 as Pack>::schema(builder).labeled("kind"),
                <Vec<FieldNode> as Pack>::schema(builder).labeled("children"),
                <String as Pack>::schema(builder).labeled("label"),
                <String as Pack>::schema(builder).labeled("struct_name"),
            ]
        })
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        self.kind.as_u8().pack(child(body, 0)?, spec, buf)?;
        self.children.pack(child(body, 1)?, spec, buf)?;
        self.label.pack(child(body, 2)?, spec, buf)?;
        self.struct_name.pack(child(body, 3)?, spec, buf)?;
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        let kind_byte = u8::unpack(child(body, 0)?, spec, reader)?;
        let kind = FieldKind::from_u8(kind_byte).ok_or(PackError::UnsupportedKind(kind_byte))?;
        let children = Vec::unpack(child(body, 1)?, spec, reader)?;
        let label = String::unpack(child(body, 2)?, spec, reader)?;
        let struct_name = String::unpack(child(body, 3)?, spec, reader)?;
        Ok(Self {
            kind,
            children,
            label,
            struct_name,
        })
    }
}

impl Pack for TypeSpec {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        builder.struct_node(Self::KEY, |builder| {
            vec![
                <BTreeMap<String, FieldNode> as Pack>::schema(builder).labeled("structs"),
                <FieldNode as Pack>::schema(builder).labeled("top"),
            ]
        })
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        self.structs.pack(child(body, 0)?, spec, buf)?;
        self.top.pack(child(body, 1)?, spec, buf)?;
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        let structs = BTreeMap::unpack(child(body, 0)?, spec, reader)?;
        let top = FieldNode::unpack(child(body, 1)?, spec, reader)?;
        Ok(Self { structs, top })
    }
}
