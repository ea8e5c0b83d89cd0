//! Error types for the registry crate.

use thiserror::Error;

use schemapack_core::PackError;

/// The error shape upgrade callbacks may return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while registering types or moving objects
/// through a [`crate::TypeSet`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A loaded type carried a tag that is already in use.
    #[error("tag already exists: {0}")]
    TagExists(u16),

    /// A loaded type carried a name that is already in use.
    #[error("name already exists: {0}")]
    NameExists(String),

    /// The version being added is already fully registered.
    #[error("version already exists: {0}")]
    VersionExists(u16),

    /// The type has no versions yet.
    #[error("no versions registered for {0}")]
    NoVersions(String),

    /// No type with this name is registered.
    #[error("no such type: {0}")]
    NoSuchType(String),

    /// An encoded object carried a version this type does not know.
    #[error("version not registered: {0}")]
    VersionNotRegistered(u16),

    /// The oldest registered version of the object failed to decode.
    #[error("decoding initial version {version}: {source}")]
    InitialDecode {
        /// The version that was being decoded.
        version: u16,
        /// The codec failure.
        source: PackError,
    },

    /// A step of the upgrade chain has no upgrader registered.
    #[error("no upgrader for {from} -> {to} (object version {object})")]
    NoUpgrader {
        /// The version being upgraded from.
        from: u16,
        /// The version being upgraded to.
        to: u16,
        /// The version the encoded object carried.
        object: u16,
    },

    /// An upgrader refused the object.
    #[error("upgrader error: {0}")]
    Upgrade(#[source] BoxError),

    /// A codec failure below the registry layer.
    #[error(transparent)]
    Codec(#[from] PackError),
}
