//! The neutral value model.
//!
//! [`Value`] is the interchange shape between the codec and schema
//! upgraders: anything a spec can describe decodes into it, and it encodes
//! back against the same spec. Struct-shaped values are attribute maps
//! ([`AttrMap`]) keyed by field name.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A decoded struct as a map from field name to value.
pub type AttrMap = BTreeMap<String, Value>;

/// A value of any schema shape.
///
/// Numbers are held at full width; the codec narrows them to the declared
/// fixed width when encoding, by truncation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing pointer payload
    Null,
    /// Boolean value
    Bool(bool),
    /// Signed integer, widened to 64 bits
    Int(i64),
    /// Unsigned integer, widened to 64 bits
    Uint(u64),
    /// Floating point number, widened to f64
    Float(f64),
    /// Complex number, parts widened to f64
    Complex(f64, f64),
    /// UTF-8 string
    String(String),
    /// Ordered sequence of values
    Seq(Vec<Value>),
    /// Map entries in decode order
    Map(Vec<(Value, Value)>),
    /// Struct as an attribute map
    Struct(AttrMap),
}

impl Value {
    /// Returns `true` if the value is null.
    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the value as a boolean if it is one.
    #[inline]
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the value as a signed integer if it is one.
    #[inline]
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as an unsigned integer if it is one.
    #[inline]
    #[must_use]
    pub const fn as_uint(&self) -> Option<u64> {
        match self {
            Self::Uint(u) => Some(*u),
            _ => None,
        }
    }

    /// Returns the value as a float if it is one.
    #[inline]
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the value as a string slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the value as a sequence slice if it is one.
    #[inline]
    #[must_use]
    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Returns the value as an attribute map if it is struct-shaped.
    #[inline]
    #[must_use]
    pub const fn as_struct(&self) -> Option<&AttrMap> {
        match self {
            Self::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Consume the value into an attribute map if it is struct-shaped.
    #[must_use]
    pub fn into_struct(self) -> Option<AttrMap> {
        match self {
            Self::Struct(map) => Some(map),
            _ => None,
        }
    }

    /// Look up a field of a struct-shaped value.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.as_struct().and_then(|map| map.get(field))
    }

    /// Short name of the variant, used in error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Uint(_) => "uint",
            Self::Float(_) => "float",
            Self::Complex(..) => "complex",
            Self::String(_) => "string",
            Self::Seq(_) => "seq",
            Self::Map(_) => "map",
            Self::Struct(_) => "struct",
        }
    }
}

impl From<bool> for Value {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<u64> for Value {
    #[inline]
    fn from(u: u64) -> Self {
        Self::Uint(u)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<String> for Value {
    #[inline]
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<AttrMap> for Value {
    #[inline]
    fn from(map: AttrMap) -> Self {
        Self::Struct(map)
    }
}
