//! Tests for persisting and reloading type schemas through `_type`.

#![allow(clippy::unwrap_used)]

use schemapack::{packable, TypeSet, Value, VersionedType, RESERVED_TYPE_NAME};

packable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Reading {
        pub sensor: String,
        pub value: f64,
        pub flags: Vec<bool>,
    }
}

packable! {
    #[derive(Debug, Clone, Default, PartialEq)]
    pub struct Config {
        pub name: String,
        pub retries: u8,
    }
}

fn populated_set() -> TypeSet {
    let mut set = TypeSet::new();
    set.register_type("reading")
        .add_version::<Reading>(0, None)
        .unwrap();
    set.register_type("config")
        .add_version::<Config>(0, None)
        .unwrap();
    set
}

#[test]
fn any_registered_type_encodes_through_the_reserved_codec() {
    let set = populated_set();
    let encoded = set.encode_type("reading").unwrap();
    assert_eq!(&encoded[..2], &[0, 0], "the reserved type has one version, 0");
    assert!(!encoded.is_empty());
}

#[test]
fn schema_encoding_is_reproducible_across_identical_registrations() {
    let first = populated_set().encode_type("reading").unwrap();
    let second = populated_set().encode_type("reading").unwrap();
    assert_eq!(first, second);

    let reserved_first = populated_set().encode_type(RESERVED_TYPE_NAME).unwrap();
    let reserved_second = populated_set().encode_type(RESERVED_TYPE_NAME).unwrap();
    assert_eq!(reserved_first, reserved_second);
}

#[test]
fn schemas_survive_a_persistence_roundtrip() {
    let original = populated_set();
    let encoded = original.encode_type("reading").unwrap();

    let mut restored = TypeSet::new();
    restored.load_encoded_type(&encoded).unwrap();

    let loaded = restored.get("reading").unwrap();
    let source = original.get("reading").unwrap();
    assert_eq!(loaded.tag(), source.tag());
    assert_eq!(loaded.versions().len(), 1);
    assert_eq!(loaded.versions()[0].spec(), source.versions()[0].spec());
    assert!(
        !loaded.versions()[0].has_exemplar(),
        "loaded versions are holes until a concrete type arrives"
    );
}

#[test]
fn loaded_schemas_decode_old_objects_as_maps() {
    let original = populated_set();
    let object = original
        .type_named("reading")
        .encode_obj(&Reading {
            sensor: "thermo-1".to_owned(),
            value: 21.5,
            flags: vec![true],
        })
        .unwrap();
    let schema = original.encode_type("reading").unwrap();

    // A process that has the persisted schema but not the Rust type can
    // still read the object into attributes.
    let mut restored = TypeSet::new();
    restored.load_encoded_type(&schema).unwrap();
    let (attrs, upgraded) = restored
        .type_named("reading")
        .decode_obj_map(&object)
        .unwrap();
    assert!(!upgraded);
    assert_eq!(attrs.get("sensor").and_then(Value::as_str), Some("thermo-1"));
    assert_eq!(attrs.get("value").and_then(Value::as_float), Some(21.5));
}

#[test]
fn filling_a_loaded_hole_restores_typed_decoding() {
    let original = populated_set();
    let object = original
        .type_named("reading")
        .encode_obj(&Reading {
            sensor: "thermo-1".to_owned(),
            value: 21.5,
            flags: Vec::new(),
        })
        .unwrap();
    let schema = original.encode_type("reading").unwrap();

    let mut restored = TypeSet::new();
    restored.load_encoded_type(&schema).unwrap();
    restored
        .get_mut("reading")
        .unwrap()
        .add_version::<Reading>(0, None)
        .unwrap();

    let (decoded, upgraded) = restored.type_named("reading").decode_obj(&object).unwrap();
    assert!(!upgraded);
    let typed = decoded.into_typed::<Reading>().unwrap();
    assert_eq!(typed.sensor, "thermo-1");
}

#[test]
fn load_type_collisions_are_reported() {
    let mut set = populated_set();
    let encoded = set.encode_type("reading").unwrap();

    // Same name and tag are both already present.
    assert!(set.load_encoded_type(&encoded).is_err());
}

#[test]
fn the_reserved_type_can_describe_itself() {
    let set = TypeSet::new();
    let reserved = set.type_named(RESERVED_TYPE_NAME);
    let encoded = set.encode_type(RESERVED_TYPE_NAME).unwrap();

    let (decoded, upgraded) = reserved.decode_obj(&encoded).unwrap();
    assert!(!upgraded);
    let vt = decoded.into_typed::<VersionedType>().unwrap();
    assert_eq!(vt.name(), RESERVED_TYPE_NAME);
    assert_eq!(vt.tag(), 1);
    assert_eq!(vt.versions().len(), 1);
    assert_eq!(
        vt.versions()[0].spec(),
        reserved.versions()[0].spec(),
        "the reserved schema describes itself faithfully"
    );
}
