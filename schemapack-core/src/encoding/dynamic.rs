//! Codec between [`Value`] and any spec.
//!
//! This is the neutral path used when no concrete type is at hand: schema
//! upgraders, attribute-map decoding, and re-encoding of upgraded objects
//! all move through it. Numbers arriving from untyped sources (a JSON
//! layer, an upgrader) are narrowed to the declared width by truncation;
//! floats are truncated toward zero first. No range checks are performed.

use crate::error::PackError;
use crate::types::{AttrMap, FieldKind, FieldNode, TypeSpec, Value};

use super::pack::child;
use super::varint::write_uvarint;
use super::Reader;

/// Bound on speculative preallocation from untrusted counts.
const MAX_PREALLOC: usize = 4096;

fn narrow_i64(value: &Value, node: &FieldNode) -> Result<i64, PackError> {
    match value {
        Value::Int(i) => Ok(*i),
        Value::Uint(u) => Ok(*u as i64),
        Value::Float(f) => Ok(f.trunc() as i64),
        other => Err(PackError::mismatch(node.kind.name(), other.kind_name())),
    }
}

fn narrow_u64(value: &Value, node: &FieldNode) -> Result<u64, PackError> {
    match value {
        Value::Uint(u) => Ok(*u),
        Value::Int(i) => Ok(*i as u64),
        Value::Float(f) => Ok(f.trunc() as i64 as u64),
        other => Err(PackError::mismatch(node.kind.name(), other.kind_name())),
    }
}

fn widen_f64(value: &Value, node: &FieldNode) -> Result<f64, PackError> {
    match value {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(*i as f64),
        Value::Uint(u) => Ok(*u as f64),
        other => Err(PackError::mismatch(node.kind.name(), other.kind_name())),
    }
}

/// Encode a neutral value against a schema node.
pub fn encode_value(
    value: &Value,
    node: &FieldNode,
    spec: &TypeSpec,
    buf: &mut Vec<u8>,
) -> Result<(), PackError> {
    match node.kind {
        FieldKind::Int8 => buf.extend_from_slice(&(narrow_i64(value, node)? as i8).to_be_bytes()),
        FieldKind::Int16 => buf.extend_from_slice(&(narrow_i64(value, node)? as i16).to_be_bytes()),
        FieldKind::Int32 => buf.extend_from_slice(&(narrow_i64(value, node)? as i32).to_be_bytes()),
        FieldKind::Int64 => buf.extend_from_slice(&narrow_i64(value, node)?.to_be_bytes()),
        FieldKind::Uint8 => buf.extend_from_slice(&(narrow_u64(value, node)? as u8).to_be_bytes()),
        FieldKind::Uint16 => {
            buf.extend_from_slice(&(narrow_u64(value, node)? as u16).to_be_bytes());
        }
        FieldKind::Uint32 => {
            buf.extend_from_slice(&(narrow_u64(value, node)? as u32).to_be_bytes());
        }
        FieldKind::Uint64 => buf.extend_from_slice(&narrow_u64(value, node)?.to_be_bytes()),
        FieldKind::Float32 => {
            buf.extend_from_slice(&(widen_f64(value, node)? as f32).to_be_bytes());
        }
        FieldKind::Float64 => buf.extend_from_slice(&widen_f64(value, node)?.to_be_bytes()),
        FieldKind::Complex64 => match value {
            Value::Complex(re, im) => {
                buf.extend_from_slice(&(*re as f32).to_be_bytes());
                buf.extend_from_slice(&(*im as f32).to_be_bytes());
            }
            other => return Err(PackError::mismatch("complex64", other.kind_name())),
        },
        FieldKind::Complex128 => match value {
            Value::Complex(re, im) => {
                buf.extend_from_slice(&re.to_be_bytes());
                buf.extend_from_slice(&im.to_be_bytes());
            }
            other => return Err(PackError::mismatch("complex128", other.kind_name())),
        },
        FieldKind::Bool => match value {
            Value::Bool(b) => buf.push(u8::from(*b)),
            other => return Err(PackError::mismatch("bool", other.kind_name())),
        },
        FieldKind::String => match value {
            Value::String(s) => {
                write_uvarint(buf, s.len() as u64);
                buf.extend_from_slice(s.as_bytes());
            }
            other => return Err(PackError::mismatch("string", other.kind_name())),
        },
        FieldKind::Seq => match value {
            Value::Seq(items) => {
                let elem = child(node, 0)?;
                write_uvarint(buf, items.len() as u64);
                for item in items {
                    encode_value(item, elem, spec, buf)?;
                }
            }
            other => return Err(PackError::mismatch("seq", other.kind_name())),
        },
        FieldKind::Map => {
            let key_node = child(node, 0)?;
            let value_node = child(node, 1)?;
            match value {
                Value::Map(pairs) => {
                    write_uvarint(buf, pairs.len() as u64);
                    for (key, val) in pairs {
                        encode_value(key, key_node, spec, buf)?;
                        encode_value(val, value_node, spec, buf)?;
                    }
                }
                // Attribute maps double as string-keyed maps.
                Value::Struct(map) => {
                    write_uvarint(buf, map.len() as u64);
                    for (key, val) in map {
                        encode_value(&Value::String(key.clone()), key_node, spec, buf)?;
                        encode_value(val, value_node, spec, buf)?;
                    }
                }
                other => return Err(PackError::mismatch("map", other.kind_name())),
            }
        }
        FieldKind::Pointer => {
            if value.is_null() {
                buf.push(0);
            } else {
                buf.push(1);
                encode_value(value, child(node, 0)?, spec, buf)?;
            }
        }
        FieldKind::Struct | FieldKind::StructRef => {
            let body = spec.resolve(node)?;
            let map = value
                .as_struct()
                .ok_or_else(|| PackError::mismatch("struct", value.kind_name()))?;
            encode_struct(map, body, spec, buf)?;
        }
        FieldKind::Ignored => {}
    }
    Ok(())
}

/// Encode an attribute map against a struct-shaped node.
pub fn encode_attrs(
    map: &AttrMap,
    node: &FieldNode,
    spec: &TypeSpec,
    buf: &mut Vec<u8>,
) -> Result<(), PackError> {
    let body = spec.resolve(node)?;
    if body.kind != FieldKind::Struct {
        return Err(PackError::mismatch("struct", body.kind.name()));
    }
    encode_struct(map, body, spec, buf)
}

fn encode_struct(
    map: &AttrMap,
    body: &FieldNode,
    spec: &TypeSpec,
    buf: &mut Vec<u8>,
) -> Result<(), PackError> {
    for field in &body.children {
        if field.kind == FieldKind::Ignored {
            continue;
        }
        let value = map
            .get(&field.label)
            .ok_or_else(|| PackError::Encoding(format!("missing field {}", field.label)))?;
        encode_value(value, field, spec, buf)?;
    }
    Ok(())
}

/// Decode a neutral value against a schema node, allocating an
/// element-shaped container per element.
pub fn decode_value(
    node: &FieldNode,
    spec: &TypeSpec,
    reader: &mut Reader<'_>,
) -> Result<Value, PackError> {
    Ok(match node.kind {
        FieldKind::Int8 => Value::Int(i64::from(i8::from_be_bytes(reader.read_array()?))),
        FieldKind::Int16 => Value::Int(i64::from(i16::from_be_bytes(reader.read_array()?))),
        FieldKind::Int32 => Value::Int(i64::from(i32::from_be_bytes(reader.read_array()?))),
        FieldKind::Int64 => Value::Int(i64::from_be_bytes(reader.read_array()?)),
        FieldKind::Uint8 => Value::Uint(u64::from(u8::from_be_bytes(reader.read_array()?))),
        FieldKind::Uint16 => Value::Uint(u64::from(u16::from_be_bytes(reader.read_array()?))),
        FieldKind::Uint32 => Value::Uint(u64::from(u32::from_be_bytes(reader.read_array()?))),
        FieldKind::Uint64 => Value::Uint(u64::from_be_bytes(reader.read_array()?)),
        FieldKind::Float32 => Value::Float(f64::from(f32::from_be_bytes(reader.read_array()?))),
        FieldKind::Float64 => Value::Float(f64::from_be_bytes(reader.read_array()?)),
        FieldKind::Complex64 => {
            let re = f32::from_be_bytes(reader.read_array()?);
            let im = f32::from_be_bytes(reader.read_array()?);
            Value::Complex(f64::from(re), f64::from(im))
        }
        FieldKind::Complex128 => {
            let re = f64::from_be_bytes(reader.read_array()?);
            let im = f64::from_be_bytes(reader.read_array()?);
            Value::Complex(re, im)
        }
        FieldKind::Bool => match reader.read_u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(PackError::InvalidBool(other)),
        },
        FieldKind::String => {
            let len = reader.read_len()?;
            let bytes = reader.read_bytes(len)?;
            Value::String(
                String::from_utf8(bytes.to_vec())
                    .map_err(|e| PackError::Encoding(format!("invalid UTF-8: {e}")))?,
            )
        }
        FieldKind::Seq => {
            let elem = child(node, 0)?;
            let count = reader.read_len()?;
            let mut items = Vec::with_capacity(count.min(MAX_PREALLOC));
            for _ in 0..count {
                items.push(decode_value(elem, spec, reader)?);
            }
            Value::Seq(items)
        }
        FieldKind::Map => {
            let key_node = child(node, 0)?;
            let value_node = child(node, 1)?;
            let count = reader.read_len()?;
            let mut pairs = Vec::with_capacity(count.min(MAX_PREALLOC));
            for _ in 0..count {
                let key = decode_value(key_node, spec, reader)?;
                let value = decode_value(value_node, spec, reader)?;
                pairs.push((key, value));
            }
            Value::Map(pairs)
        }
        FieldKind::Pointer => match reader.read_u8()? {
            0 => Value::Null,
            1 => decode_value(child(node, 0)?, spec, reader)?,
            other => return Err(PackError::InvalidPointerTag(other)),
        },
        FieldKind::Struct | FieldKind::StructRef => {
            let body = spec.resolve(node)?;
            let mut map = AttrMap::new();
            for field in &body.children {
                if field.kind == FieldKind::Ignored {
                    continue;
                }
                let value = decode_value(field, spec, reader)?;
                map.insert(field.label.clone(), value);
            }
            Value::Struct(map)
        }
        FieldKind::Ignored => Value::Null,
    })
}
