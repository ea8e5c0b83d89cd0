//! The binary codec.
//!
//! Encoders append to a `Vec<u8>`; decoders consume a [`Reader`] over the
//! encoded bytes. Both walk a [`crate::TypeSpec`] node-by-node, either
//! through a type's [`Pack`] impl or through the neutral
//! [`crate::Value`] representation in [`dynamic`].
//!
//! # Wire format
//!
//! Big-endian throughout:
//!
//! - fixed-width integers and floats: raw big-endian bytes
//! - complex numbers: real part then imaginary part
//! - bool: one byte, `0x00` or `0x01`; anything else fails decode
//! - string: ULEB128 byte length, then UTF-8 bytes
//! - sequence: ULEB128 element count, then the elements
//! - map: ULEB128 pair count, then key/value pairs
//! - pointer: one presence byte, `0x00` for null or `0x01` then the payload
//! - struct reference: the body's fields in declaration order
//! - ignored field: no bytes

pub mod dynamic;
mod macros;
mod pack;
mod schema;
pub mod varint;

#[cfg(test)]
mod proptest_tests;

pub use pack::Pack;

use crate::error::PackError;

/// A positioned reader over encoded bytes.
///
/// Every primitive checks the remaining length and fails with
/// [`PackError::UnexpectedEof`] instead of slicing out of bounds.
#[derive(Debug)]
pub struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    /// A reader over the whole buffer.
    #[must_use]
    pub const fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Returns `true` when every byte has been consumed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, PackError> {
        let byte = *self.buf.get(self.pos).ok_or(PackError::UnexpectedEof)?;
        self.pos += 1;
        Ok(byte)
    }

    /// Read `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], PackError> {
        if self.remaining() < n {
            return Err(PackError::UnexpectedEof);
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a fixed-size array, for `from_be_bytes` conversions.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], PackError> {
        let bytes = self.read_bytes(N)?;
        bytes
            .try_into()
            .map_err(|_| PackError::UnexpectedEof)
    }

    /// Read a ULEB128 varint.
    pub fn read_uvarint(&mut self) -> Result<u64, PackError> {
        let (value, consumed) = varint::read_uvarint(&self.buf[self.pos..])?;
        self.pos += consumed;
        Ok(value)
    }

    /// Read a varint and convert it to a usize length.
    pub fn read_len(&mut self) -> Result<usize, PackError> {
        let value = self.read_uvarint()?;
        usize::try_from(value).map_err(|_| PackError::Encoding(format!("length too large: {value}")))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn reader_tracks_position() {
        let mut reader = Reader::new(&[1, 2, 3, 4]);
        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_bytes(2).unwrap(), &[2, 3]);
        assert_eq!(reader.remaining(), 1);
        assert_eq!(reader.read_array::<1>().unwrap(), [4]);
        assert!(reader.is_empty());
    }

    #[test]
    fn reader_fails_past_the_end() {
        let mut reader = Reader::new(&[1]);
        reader.read_u8().unwrap();
        assert!(matches!(reader.read_u8(), Err(PackError::UnexpectedEof)));
        assert!(matches!(
            reader.read_bytes(1),
            Err(PackError::UnexpectedEof)
        ));
    }

    #[test]
    fn reader_decodes_varints_in_place() {
        let mut buf = Vec::new();
        varint::write_uvarint(&mut buf, 300);
        buf.push(0x7);
        let mut reader = Reader::new(&buf);
        assert_eq!(reader.read_uvarint().unwrap(), 300);
        assert_eq!(reader.read_u8().unwrap(), 0x7);
    }
}
