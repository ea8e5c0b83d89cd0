//! Property-based tests for codec round-trips.

#![allow(clippy::expect_used, clippy::float_cmp)]

use proptest::prelude::*;

use crate::encoding::dynamic::{decode_value, encode_value};
use crate::encoding::varint::{read_uvarint, write_uvarint};
use crate::encoding::{Pack, Reader};
use crate::packable;
use crate::types::{TypeSpec, Value};

packable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    struct Record {
        id: u64,
        label: String,
        weight: f64,
        flags: Vec<bool>,
        parent: Option<Box<Record>>,
    }
}

fn arb_record() -> impl Strategy<Value = Record> {
    let leaf = (
        any::<u64>(),
        ".*",
        any::<f64>().prop_filter("not NaN", |f| !f.is_nan()),
        prop::collection::vec(any::<bool>(), 0..8),
    )
        .prop_map(|(id, label, weight, flags)| Record {
            id,
            label,
            weight,
            flags,
            parent: None,
        });

    leaf.prop_recursive(3, 8, 1, |inner| {
        (
            any::<u64>(),
            ".*",
            any::<f64>().prop_filter("not NaN", |f| !f.is_nan()),
            prop::collection::vec(any::<bool>(), 0..8),
            inner,
        )
            .prop_map(|(id, label, weight, flags, parent)| Record {
                id,
                label,
                weight,
                flags,
                parent: Some(Box::new(parent)),
            })
    })
}

fn typed_roundtrip<T: Pack + PartialEq + std::fmt::Debug>(value: &T) {
    let spec = TypeSpec::of::<T>();
    let mut buf = Vec::new();
    value
        .pack(&spec.top, &spec, &mut buf)
        .expect("encoding should succeed");
    let mut reader = Reader::new(&buf);
    let decoded = T::unpack(&spec.top, &spec, &mut reader).expect("decoding should succeed");
    assert_eq!(&decoded, value);
    assert!(reader.is_empty());
}

proptest! {
    #[test]
    fn varint_roundtrip(value in any::<u64>()) {
        let mut buf = Vec::new();
        write_uvarint(&mut buf, value);
        prop_assert!(buf.len() <= 10);
        let (decoded, consumed) = read_uvarint(&buf).expect("roundtrip decode");
        prop_assert_eq!(decoded, value);
        prop_assert_eq!(consumed, buf.len());
    }

    #[test]
    fn signed_integers_roundtrip(value in any::<i64>()) {
        typed_roundtrip(&value);
        typed_roundtrip(&(value as i32));
        typed_roundtrip(&(value as i16));
        typed_roundtrip(&(value as i8));
    }

    #[test]
    fn unsigned_integers_roundtrip(value in any::<u64>()) {
        typed_roundtrip(&value);
        typed_roundtrip(&(value as u32));
        typed_roundtrip(&(value as u16));
        typed_roundtrip(&(value as u8));
    }

    #[test]
    fn floats_preserve_bits(value in any::<f64>().prop_filter("not NaN", |f| !f.is_nan())) {
        typed_roundtrip(&value);
    }

    #[test]
    fn strings_roundtrip(value in ".*") {
        typed_roundtrip(&value.to_owned());
    }

    #[test]
    fn string_sequences_roundtrip(values in prop::collection::vec(".*", 0..10)) {
        typed_roundtrip(&values);
    }

    #[test]
    fn records_roundtrip(record in arb_record()) {
        typed_roundtrip(&record);
    }

    #[test]
    fn dynamic_decode_reencodes_identically(record in arb_record()) {
        let spec = TypeSpec::of::<Record>();
        let mut original = Vec::new();
        record
            .pack(&spec.top, &spec, &mut original)
            .expect("encoding should succeed");

        let mut reader = Reader::new(&original);
        let value = decode_value(&spec.top, &spec, &mut reader)
            .expect("dynamic decoding should succeed");
        prop_assert!(reader.is_empty());

        let mut reencoded = Vec::new();
        encode_value(&value, &spec.top, &spec, &mut reencoded)
            .expect("dynamic encoding should succeed");
        prop_assert_eq!(original, reencoded);
    }

    #[test]
    fn truncated_typed_input_never_panics(record in arb_record(), cut in 0usize..64) {
        let spec = TypeSpec::of::<Record>();
        let mut buf = Vec::new();
        record
            .pack(&spec.top, &spec, &mut buf)
            .expect("encoding should succeed");
        if cut < buf.len() {
            let truncated = &buf[..buf.len() - cut - 1];
            let mut reader = Reader::new(truncated);
            let _ = Record::unpack(&spec.top, &spec, &mut reader);
        }
    }

    #[test]
    fn dynamic_primitives_roundtrip(value in prop_oneof![
        any::<i64>().prop_map(Value::Int),
        any::<u64>().prop_map(Value::Uint),
        any::<f64>().prop_filter("not NaN", |f| !f.is_nan()).prop_map(Value::Float),
        ".*".prop_map(Value::String),
        any::<bool>().prop_map(Value::Bool),
    ]) {
        let node = match &value {
            Value::Int(_) => crate::types::FieldNode::leaf(crate::types::FieldKind::Int64),
            Value::Uint(_) => crate::types::FieldNode::leaf(crate::types::FieldKind::Uint64),
            Value::Float(_) => crate::types::FieldNode::leaf(crate::types::FieldKind::Float64),
            Value::String(_) => crate::types::FieldNode::leaf(crate::types::FieldKind::String),
            Value::Bool(_) => crate::types::FieldNode::leaf(crate::types::FieldKind::Bool),
            _ => unreachable!(),
        };
        let spec = TypeSpec::from_node(node);
        let mut buf = Vec::new();
        encode_value(&value, &spec.top, &spec, &mut buf).expect("encode");
        let mut reader = Reader::new(&buf);
        let decoded = decode_value(&spec.top, &spec, &mut reader).expect("decode");
        prop_assert_eq!(decoded, value);
    }
}
