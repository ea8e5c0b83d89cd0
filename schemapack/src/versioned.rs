//! Versioned types and the upgrade machinery.
//!
//! A [`VersionedType`] pairs a stable 16-bit tag with a list of
//! [`Version`] records sorted so the newest sits at index 0. Objects
//! encode against the newest version behind a 2-byte big-endian version
//! prefix; decoding an older version routes the object through the chain
//! of registered upgraders until it reaches the newest shape.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tracing::debug;

use schemapack_core::encoding::dynamic::{decode_value, encode_attrs, encode_value};
use schemapack_core::{
    AttrMap, FieldNode, Pack, PackError, Reader, SpecBuilder, TypeSpec, Value,
};

use crate::error::{BoxError, RegistryError};
use crate::keys;

/// Attribute-map key injected by [`VersionedType::decode_into`]; never use
/// it as a field name.
pub const VERSION_KEY: &str = "_version";

/// Starting capacity for encode buffers.
const ENCODE_BUFFER_CAPACITY: usize = 256;

/// Transforms a decoded attribute map of one version into the shape of
/// the next-higher version.
pub type Upgrader = Arc<dyn Fn(AttrMap) -> Result<AttrMap, BoxError> + Send + Sync>;

/// Wrap a closure as an [`Upgrader`].
pub fn upgrader<F>(f: F) -> Upgrader
where
    F: Fn(AttrMap) -> Result<AttrMap, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Allocates and decodes typed values for one registered shape.
trait Exemplar: Send + Sync {
    fn unpack_any(
        &self,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Box<dyn Any + Send>, PackError>;
}

struct TypedExemplar<T>(PhantomData<fn() -> T>);

impl<T> TypedExemplar<T> {
    const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T: Pack + Any + Send> Exemplar for TypedExemplar<T> {
    fn unpack_any(
        &self,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Box<dyn Any + Send>, PackError> {
        Ok(Box::new(T::unpack(&spec.top, spec, reader)?))
    }
}

/// One registered version of a logical type.
#[derive(Clone)]
pub struct Version {
    version: u16,
    spec: TypeSpec,
    exemplar: Option<Arc<dyn Exemplar>>,
    upgrader: Option<Upgrader>,
}

impl Version {
    const KEY: &'static str = concat!(module_path!(), "::Version");

    /// A version backed by a concrete type: the spec is derived from it
    /// and decodes can produce typed values.
    #[must_use]
    pub fn typed<T: Pack + Any + Send>(version: u16, upgrader: Option<Upgrader>) -> Self {
        Self {
            version,
            spec: TypeSpec::of::<T>(),
            exemplar: Some(Arc::new(TypedExemplar::<T>::new())),
            upgrader,
        }
    }

    /// A version reconstructed from a persisted schema. It has no typed
    /// shape and no upgrader until `add_version` fills the hole.
    #[must_use]
    pub const fn loaded(version: u16, spec: TypeSpec) -> Self {
        Self {
            version,
            spec,
            exemplar: None,
            upgrader: None,
        }
    }

    /// The version number.
    #[inline]
    #[must_use]
    pub const fn version(&self) -> u16 {
        self.version
    }

    /// The schema of this version.
    #[inline]
    #[must_use]
    pub const fn spec(&self) -> &TypeSpec {
        &self.spec
    }

    /// Whether a typed shape is attached.
    #[must_use]
    pub const fn has_exemplar(&self) -> bool {
        self.exemplar.is_some()
    }

    /// A hole left by loading a persisted schema: nothing runtime-side is
    /// attached yet.
    const fn is_hole(&self) -> bool {
        self.exemplar.is_none() && self.upgrader.is_none()
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("version", &self.version)
            .field("exemplar", &self.exemplar.is_some())
            .field("upgrader", &self.upgrader.is_some())
            .finish_non_exhaustive()
    }
}

/// The result of [`VersionedType::decode_obj`].
pub enum Decoded {
    /// A typed value produced from the newest version's shape.
    Typed(Box<dyn Any + Send>),
    /// An attribute map, either requested or produced by an upgrade.
    Map(AttrMap),
}

impl Decoded {
    /// Take the typed value out, if it is one of type `T`.
    #[must_use]
    pub fn into_typed<T: Any>(self) -> Option<T> {
        match self {
            Self::Typed(boxed) => boxed.downcast::<T>().ok().map(|boxed| *boxed),
            Self::Map(_) => None,
        }
    }

    /// Take the attribute map out, if the decode produced one.
    #[must_use]
    pub fn into_map(self) -> Option<AttrMap> {
        match self {
            Self::Typed(_) => None,
            Self::Map(map) => Some(map),
        }
    }
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Typed(_) => f.write_str("Decoded::Typed(..)"),
            Self::Map(map) => f.debug_tuple("Decoded::Map").field(map).finish(),
        }
    }
}

/// A logical type: a name, a stable tag, and its versions newest-first.
#[derive(Debug, Clone)]
pub struct VersionedType {
    name: String,
    tag: u16,
    versions: Vec<Version>,
    dirty: bool,
}

impl VersionedType {
    const KEY: &'static str = concat!(module_path!(), "::VersionedType");

    /// A fresh type with no versions.
    #[must_use]
    pub fn new(name: impl Into<String>, tag: u16) -> Self {
        Self {
            name: name.into(),
            tag,
            versions: Vec::with_capacity(1),
            dirty: true,
        }
    }

    /// The logical type name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stable tag.
    #[inline]
    #[must_use]
    pub const fn tag(&self) -> u16 {
        self.tag
    }

    /// All versions, newest first.
    #[inline]
    #[must_use]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// Whether the schema changed since the last [`Self::mark_clean`].
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Acknowledge that the current schema has been persisted.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Register version `version` with the shape of `T`.
    ///
    /// If the version exists only as a hole left by a loaded schema, the
    /// typed shape and upgrader are filled in place and the persisted
    /// spec is kept. A fully registered duplicate is rejected.
    pub fn add_version<T: Pack + Any + Send>(
        &mut self,
        version: u16,
        upgrader: Option<Upgrader>,
    ) -> Result<(), RegistryError> {
        if let Some(existing) = self.find_mut(version) {
            if existing.is_hole() {
                existing.exemplar = Some(Arc::new(TypedExemplar::<T>::new()));
                existing.upgrader = upgrader;
                return Ok(());
            }
            return Err(RegistryError::VersionExists(version));
        }

        self.push_version(Version::typed::<T>(version, upgrader));
        self.dirty = true;
        Ok(())
    }

    /// Insert a prebuilt version record, keeping the list sorted
    /// newest-first.
    pub fn push_version(&mut self, version: Version) {
        self.versions.push(version);
        self.versions
            .sort_by(|a, b| b.version.cmp(&a.version));
    }

    /// Look up a version by number.
    #[must_use]
    pub fn get_version(&self, version: u16) -> Option<&Version> {
        self.find_index(version).map(|idx| &self.versions[idx])
    }

    fn find_index(&self, version: u16) -> Option<usize> {
        self.versions
            .binary_search_by(|probe| probe.version.cmp(&version).reverse())
            .ok()
    }

    fn find_mut(&mut self, version: u16) -> Option<&mut Version> {
        self.find_index(version)
            .map(move |idx| &mut self.versions[idx])
    }

    fn latest(&self) -> Result<&Version, RegistryError> {
        self.versions
            .first()
            .ok_or_else(|| RegistryError::NoVersions(self.name.clone()))
    }

    /// Encode a storage key under this type's tag.
    #[must_use]
    pub fn encode_key(&self, key: &str) -> Vec<u8> {
        keys::encode_key(self.tag, key)
    }

    /// The 2-byte big-endian tag, usable as a scan prefix.
    #[must_use]
    pub fn encode_tag(&self) -> [u8; 2] {
        keys::encode_tag(self.tag)
    }

    /// Recover the key from an encoded tagged key.
    pub fn decode_key<'a>(&self, encoded: &'a [u8]) -> Result<&'a str, RegistryError> {
        Ok(keys::decode_key(encoded)?)
    }

    /// Encode a typed object against the newest version, prefixed with
    /// that version number.
    pub fn encode_obj<T: Pack>(&self, obj: &T) -> Result<Vec<u8>, RegistryError> {
        let latest = self.latest()?;
        let mut buf = Vec::with_capacity(ENCODE_BUFFER_CAPACITY);
        buf.extend_from_slice(&latest.version.to_be_bytes());
        obj.pack(&latest.spec.top, &latest.spec, &mut buf)?;
        Ok(buf)
    }

    /// Encode a neutral value against the newest version.
    pub fn encode_obj_value(&self, value: &Value) -> Result<Vec<u8>, RegistryError> {
        let latest = self.latest()?;
        let mut buf = Vec::with_capacity(ENCODE_BUFFER_CAPACITY);
        buf.extend_from_slice(&latest.version.to_be_bytes());
        encode_value(value, &latest.spec.top, &latest.spec, &mut buf)?;
        Ok(buf)
    }

    /// Encode an attribute map against the newest version.
    pub fn encode_obj_map(&self, map: &AttrMap) -> Result<Vec<u8>, RegistryError> {
        let latest = self.latest()?;
        let mut buf = Vec::with_capacity(ENCODE_BUFFER_CAPACITY);
        buf.extend_from_slice(&latest.version.to_be_bytes());
        encode_attrs(map, &latest.spec.top, &latest.spec, &mut buf)?;
        Ok(buf)
    }

    /// Decode an encoded object.
    ///
    /// An object at the newest version decodes into a typed value when a
    /// shape is registered, or an attribute map otherwise, with
    /// `upgraded = false`. An older object decodes at its own version and
    /// walks the upgrade chain, returning the final map and
    /// `upgraded = true`.
    pub fn decode_obj(&self, encoded: &[u8]) -> Result<(Decoded, bool), RegistryError> {
        let latest = self.latest()?;
        let mut reader = Reader::new(encoded);
        let version = read_version(&mut reader)?;

        if version != latest.version {
            let (map, upgraded) = self.upgrade_obj(version, &mut reader)?;
            return Ok((Decoded::Map(map), upgraded));
        }

        match &latest.exemplar {
            Some(exemplar) => {
                let value = exemplar.unpack_any(&latest.spec, &mut reader)?;
                Ok((Decoded::Typed(value), false))
            }
            None => {
                let map = decode_attrs(&latest.spec, &mut reader)?;
                Ok((Decoded::Map(map), false))
            }
        }
    }

    /// As [`Self::decode_obj`], but always produce an attribute map.
    pub fn decode_obj_map(&self, encoded: &[u8]) -> Result<(AttrMap, bool), RegistryError> {
        let latest = self.latest()?;
        let mut reader = Reader::new(encoded);
        let version = read_version(&mut reader)?;

        if version != latest.version {
            return self.upgrade_obj(version, &mut reader);
        }

        Ok((decode_attrs(&latest.spec, &mut reader)?, false))
    }

    /// Decode into a caller-supplied attribute map at the object's own
    /// version, without running upgraders. The observed version number is
    /// stored under [`VERSION_KEY`].
    pub fn decode_into(&self, encoded: &[u8], map: &mut AttrMap) -> Result<(), RegistryError> {
        self.latest()?;
        let mut reader = Reader::new(encoded);
        let version = read_version(&mut reader)?;
        let found = self
            .get_version(version)
            .ok_or(RegistryError::VersionNotRegistered(version))?;

        let decoded = decode_attrs(&found.spec, &mut reader)?;
        map.extend(decoded);
        map.insert(VERSION_KEY.to_owned(), Value::Uint(u64::from(version)));
        Ok(())
    }

    fn upgrade_obj(
        &self,
        version: u16,
        reader: &mut Reader<'_>,
    ) -> Result<(AttrMap, bool), RegistryError> {
        let start = self
            .find_index(version)
            .ok_or(RegistryError::VersionNotRegistered(version))?;

        let mut obj = decode_attrs(&self.versions[start].spec, reader)
            .map_err(|source| RegistryError::InitialDecode { version, source })?;

        // The list is newest-first, so upgrading walks toward index 0.
        let mut current = start;
        while current > 0 {
            let next = &self.versions[current - 1];
            let from = self.versions[current].version;
            let Some(upgrade) = next.upgrader.as_ref() else {
                return Err(RegistryError::NoUpgrader {
                    from,
                    to: next.version,
                    object: version,
                });
            };
            debug!(from, to = next.version, "upgrading object");
            obj = upgrade(obj).map_err(RegistryError::Upgrade)?;
            current -= 1;
        }

        Ok((obj, true))
    }
}

fn read_version(reader: &mut Reader<'_>) -> Result<u16, RegistryError> {
    let bytes = reader.read_array::<2>()?;
    Ok(u16::from_be_bytes(bytes))
}

fn decode_attrs(spec: &TypeSpec, reader: &mut Reader<'_>) -> Result<AttrMap, PackError> {
    let value = decode_value(&spec.top, spec, reader)?;
    let kind = value.kind_name();
    value
        .into_struct()
        .ok_or_else(|| PackError::mismatch("struct", kind))
}

fn field(body: &FieldNode, index: usize) -> Result<&FieldNode, PackError> {
    body.children.get(index).ok_or_else(|| {
        PackError::Encoding(format!("struct body too short at child {index}"))
    })
}

impl Pack for Version {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        builder.struct_node(Self::KEY, |builder| {
            vec![
                <u16 as Pack>::schema(builder).labeled("version"),
                <TypeSpec as Pack>::schema(builder).labeled("spec"),
                FieldNode::ignored("exemplar"),
                FieldNode::ignored("upgrader"),
            ]
        })
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        self.version.pack(field(body, 0)?, spec, buf)?;
        self.spec.pack(field(body, 1)?, spec, buf)?;
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        let version = u16::unpack(field(body, 0)?, spec, reader)?;
        let loaded_spec = TypeSpec::unpack(field(body, 1)?, spec, reader)?;
        Ok(Self::loaded(version, loaded_spec))
    }
}

impl Pack for VersionedType {
    fn schema(builder: &mut SpecBuilder) -> FieldNode {
        builder.struct_node(Self::KEY, |builder| {
            vec![
                <String as Pack>::schema(builder).labeled("name"),
                <u16 as Pack>::schema(builder).labeled("tag"),
                <Vec<Version> as Pack>::schema(builder).labeled("versions"),
                FieldNode::ignored("dirty"),
            ]
        })
    }

    fn pack(&self, node: &FieldNode, spec: &TypeSpec, buf: &mut Vec<u8>) -> Result<(), PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        self.name.pack(field(body, 0)?, spec, buf)?;
        self.tag.pack(field(body, 1)?, spec, buf)?;
        self.versions.pack(field(body, 2)?, spec, buf)?;
        Ok(())
    }

    fn unpack(
        node: &FieldNode,
        spec: &TypeSpec,
        reader: &mut Reader<'_>,
    ) -> Result<Self, PackError> {
        let body = spec.struct_body_for(node, Self::KEY)?;
        let name = String::unpack(field(body, 0)?, spec, reader)?;
        let tag = u16::unpack(field(body, 1)?, spec, reader)?;
        let versions = Vec::<Version>::unpack(field(body, 2)?, spec, reader)?;
        let mut vt = Self::new(name, tag);
        for version in versions {
            vt.push_version(version);
        }
        vt.dirty = false;
        Ok(vt)
    }
}
