//! Little-endian cursor over a borrowed byte slice.

use zerocopy::FromBytes;

use crate::{Error, Result};

/// Sentinel stored in relative offset fields that point nowhere.
pub const NULL_OFFSET: i32 = i32::MIN;

/// Reads fixed-width little-endian values from a borrowed slice.
///
/// Forward references are resolved with [`BinaryReader::with_position`],
/// which restores the cursor once the callback returns.
///
/// # Example
///
/// ```
/// use sulani_common::BinaryReader;
///
/// let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
/// let mut reader = BinaryReader::new(&data);
///
/// assert_eq!(reader.read_u32().unwrap(), 0x04030201);
/// assert_eq!(reader.read_u32().unwrap(), 0x08070605);
/// assert!(reader.is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    position: usize,
}

/// Generates little-endian reads for fixed-width primitives.
macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[doc = concat!("Read a little-endian `", stringify!($ty), "`.")]
            #[inline]
            pub fn $name(&mut self) -> Result<$ty> {
                self.take::<{ std::mem::size_of::<$ty>() }>().map(<$ty>::from_le_bytes)
            }
        )*
    };
}

impl<'a> BinaryReader<'a> {
    #[inline]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// A reader whose cursor starts at `position`.
    #[inline]
    pub const fn new_at(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    #[inline]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Length of the whole buffer, not of what is left.
    #[inline]
    pub const fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub const fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    #[inline]
    pub fn seek(&mut self, position: usize) {
        self.position = position;
    }

    /// Run `f` with the cursor moved to `position`, then put the cursor back,
    /// also when `f` fails.
    pub fn with_position<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = std::mem::replace(&mut self.position, position);
        let result = f(self);
        self.position = saved;
        result
    }

    /// Borrow the next `count` bytes and step past them.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if available < count {
            return Err(Error::UnexpectedEof {
                position: self.position,
                needed: count,
                available,
            });
        }
        let start = self.position;
        self.position += count;
        Ok(&self.data[start..self.position])
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    read_le! {
        read_u8 => u8,
        read_i8 => i8,
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_i64 => i64,
        read_f32 => f32,
    }

    /// Any non-zero byte is `true`.
    #[inline]
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    /// Read a relative offset field and resolve it to an absolute position.
    ///
    /// The stored value is relative to the start of the field itself.
    /// Returns `None` for [`NULL_OFFSET`].
    pub fn read_relative_offset(&mut self) -> Result<Option<usize>> {
        let field = self.position;
        let value = self.read_i32()?;
        if value == NULL_OFFSET {
            return Ok(None);
        }

        let target = field as i64 + i64::from(value);
        match usize::try_from(target) {
            Ok(position) if position <= self.data.len() => Ok(Some(position)),
            _ => Err(Error::OffsetOutOfBounds {
                position: field,
                target,
                len: self.data.len(),
            }),
        }
    }

    /// Read a NUL-terminated UTF-8 string, consuming the terminator.
    pub fn read_cstring(&mut self) -> Result<&'a str> {
        let start = self.position;
        let rest = self.data.get(start..).unwrap_or_default();
        let end = memchr::memchr(0, rest).ok_or(Error::MissingNullTerminator(start))?;
        self.position = start + end + 1;
        std::str::from_utf8(&rest[..end]).map_err(Error::Utf8)
    }

    /// Read `length` bytes of UTF-8.
    pub fn read_string(&mut self, length: usize) -> Result<&'a str> {
        std::str::from_utf8(self.read_bytes(length)?).map_err(Error::Utf8)
    }

    /// Copy a zerocopy struct out of the buffer.
    pub fn read_struct<T: FromBytes>(&mut self) -> Result<T> {
        let position = self.position;
        let size = std::mem::size_of::<T>();
        let bytes = self.read_bytes(size)?;
        T::read_from_bytes(bytes).map_err(|_| Error::UnexpectedEof {
            position,
            needed: size,
            available: bytes.len(),
        })
    }

    /// Consume `expected.len()` bytes and fail unless they equal `expected`.
    pub fn expect_magic(&mut self, expected: &[u8]) -> Result<()> {
        let position = self.position;
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::InvalidMagic {
                position,
                expected: expected.to_vec(),
                actual: actual.to_vec(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_primitives() {
        let data = [
            0x01u8, 0x02, 0x03, 0x04, // u32: 0x04030201
            0xFF, 0xFF, 0xFF, 0xFF, // u32: 0xFFFFFFFF
        ];
        let mut reader = BinaryReader::new(&data);

        assert_eq!(reader.read_u32().unwrap(), 0x04030201);
        assert_eq!(reader.read_u32().unwrap(), 0xFFFFFFFF);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_read_cstring() {
        let data = b"hello\0world\0";
        let mut reader = BinaryReader::new(data);

        assert_eq!(reader.read_cstring().unwrap(), "hello");
        assert_eq!(reader.read_cstring().unwrap(), "world");
        assert!(matches!(
            reader.read_cstring(),
            Err(Error::MissingNullTerminator(12))
        ));
    }

    #[test]
    fn test_magic_mismatch() {
        let mut reader = BinaryReader::new(b"STBL\x05\x00");
        assert!(reader.expect_magic(b"STBL").is_ok());
        assert_eq!(reader.read_u16().unwrap(), 5);

        let mut reader = BinaryReader::new(b"DATA");
        assert!(matches!(
            reader.expect_magic(b"STBL"),
            Err(Error::InvalidMagic { position: 0, .. })
        ));
    }

    #[test]
    fn test_eof_error() {
        let data = [0x01, 0x02];
        let mut reader = BinaryReader::new(&data);

        let err = reader.read_u32().unwrap_err();
        assert!(matches!(
            err,
            Error::UnexpectedEof {
                position: 0,
                needed: 4,
                available: 2
            }
        ));
    }

    #[test]
    fn test_relative_offset_from_field_start() {
        // Field at 4 holding 8 points at 12.
        let mut data = vec![0u8; 16];
        data[4..8].copy_from_slice(&8i32.to_le_bytes());
        data[8..12].copy_from_slice(&NULL_OFFSET.to_le_bytes());
        let mut reader = BinaryReader::new_at(&data, 4);

        assert_eq!(reader.read_relative_offset().unwrap(), Some(12));
        assert_eq!(reader.read_relative_offset().unwrap(), None);
    }

    #[test]
    fn test_relative_offset_out_of_bounds() {
        let data = (-8i32).to_le_bytes();
        let mut reader = BinaryReader::new(&data);

        assert!(matches!(
            reader.read_relative_offset(),
            Err(Error::OffsetOutOfBounds { target: -8, .. })
        ));
    }

    #[test]
    fn test_with_position_restores_cursor() {
        let data = [1u8, 2, 3, 4];
        let mut reader = BinaryReader::new_at(&data, 1);

        let value = reader.with_position(3, |r| r.read_u8()).unwrap();
        assert_eq!(value, 4);
        assert_eq!(reader.position(), 1);

        assert!(reader.with_position(8, |r| r.read_u8()).is_err());
        assert_eq!(reader.position(), 1);
    }
}
