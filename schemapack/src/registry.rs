//! The type set: name and tag allocation over versioned types.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::trace;

use crate::error::RegistryError;
use crate::versioned::{Version, VersionedType};

/// Name reserved for the type that describes types themselves.
pub const RESERVED_TYPE_NAME: &str = "_type";

/// The tag the reserved type always receives in a fresh set.
pub const RESERVED_TYPE_TAG: u16 = 1;

/// A registry of logical types, each with a stable 16-bit tag.
///
/// A fresh set preregisters [`RESERVED_TYPE_NAME`] with tag 1, bound to a
/// single version of the [`VersionedType`] schema itself, so the schema of
/// any registered type can be persisted through [`Self::encode_type`].
///
/// Mutation (`register_type`, `load_type`, `add_version`) is not
/// synchronized; share a fully populated set freely for encode and decode
/// but serialize writers externally.
#[derive(Debug)]
pub struct TypeSet {
    types: HashMap<String, VersionedType>,
    last_tag: u16,
}

impl TypeSet {
    /// A fresh set holding only the reserved `_type` entry.
    #[must_use]
    pub fn new() -> Self {
        let mut set = Self {
            types: HashMap::new(),
            last_tag: 0,
        };
        let reserved = set.register_type(RESERVED_TYPE_NAME);
        reserved.push_version(Version::typed::<VersionedType>(0, None));
        set
    }

    /// Register a name, allocating the next tag, or return the existing
    /// entry unchanged. Idempotent by name.
    pub fn register_type(&mut self, name: &str) -> &mut VersionedType {
        match self.types.entry(name.to_owned()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.last_tag += 1;
                trace!(name, tag = self.last_tag, "registered type");
                entry.insert(VersionedType::new(name, self.last_tag))
            }
        }
    }

    /// Install an externally built type, failing on any tag or name
    /// collision. The tag counter advances past the loaded tag.
    pub fn load_type(&mut self, vt: VersionedType) -> Result<(), RegistryError> {
        if self.has_tag(vt.tag()) {
            return Err(RegistryError::TagExists(vt.tag()));
        }
        if self.types.contains_key(vt.name()) {
            return Err(RegistryError::NameExists(vt.name().to_owned()));
        }

        self.last_tag = self.last_tag.max(vt.tag());
        trace!(name = vt.name(), tag = vt.tag(), "loaded type");
        self.types.insert(vt.name().to_owned(), vt);
        Ok(())
    }

    /// Look up a type by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&VersionedType> {
        self.types.get(name)
    }

    /// Look up a type by name for mutation.
    #[must_use]
    pub fn get_mut(&mut self, name: &str) -> Option<&mut VersionedType> {
        self.types.get_mut(name)
    }

    /// Look up a type that is known to be registered.
    ///
    /// # Panics
    ///
    /// Panics if the name is absent; asking for an unregistered type is a
    /// programming error. Use [`Self::get`] for a fallible lookup.
    #[must_use]
    #[track_caller]
    pub fn type_named(&self, name: &str) -> &VersionedType {
        self.types
            .get(name)
            .unwrap_or_else(|| panic!("no such type: {name}"))
    }

    /// Whether any registered type carries this tag.
    #[must_use]
    pub fn has_tag(&self, tag: u16) -> bool {
        self.types.values().any(|vt| vt.tag() == tag)
    }

    /// Iterate all registered types in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &VersionedType> {
        self.types.values()
    }

    /// Iterate types whose schemas changed since they were last persisted.
    pub fn dirty_types(&self) -> impl Iterator<Item = &VersionedType> {
        self.types.values().filter(|vt| vt.is_dirty())
    }

    /// Encode the schema of a registered type through the reserved
    /// `_type` codec.
    pub fn encode_type(&self, name: &str) -> Result<Vec<u8>, RegistryError> {
        let vt = self
            .get(name)
            .ok_or_else(|| RegistryError::NoSuchType(name.to_owned()))?;
        self.type_named(RESERVED_TYPE_NAME).encode_obj(vt)
    }

    /// Decode a schema persisted by [`Self::encode_type`] and install it.
    ///
    /// Loaded versions carry specs but no typed shapes; a later
    /// `add_version` with the concrete type fills each hole.
    pub fn load_encoded_type(&mut self, encoded: &[u8]) -> Result<(), RegistryError> {
        let (decoded, _) = self.type_named(RESERVED_TYPE_NAME).decode_obj(encoded)?;
        let vt = decoded.into_typed::<VersionedType>().ok_or_else(|| {
            RegistryError::Codec(schemapack_core::PackError::Encoding(
                "decoded value is not a versioned type".to_owned(),
            ))
        })?;
        self.load_type(vt)
    }
}

impl Default for TypeSet {
    fn default() -> Self {
        Self::new()
    }
}
