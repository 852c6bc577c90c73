//! Binary writer for building little-endian buffers.
//!
//! [`BinaryWriter`] is the write-side counterpart of [`crate::BinaryReader`]:
//! a seekable cursor over a growable buffer. Seeking past the end and writing
//! zero-fills the gap, which the layout code relies on for padding.

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use zerocopy::{Immutable, IntoBytes};

use crate::reader::NULL_OFFSET;
use crate::{Error, Result};

/// A seekable little-endian writer over an owned buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    cursor: Cursor<Vec<u8>>,
}

impl BinaryWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with a capacity hint.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cursor: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    /// Current write position.
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    /// Number of bytes written so far (the high-water mark).
    #[inline]
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// Whether nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }

    /// Move the cursor to an absolute position.
    pub fn seek(&mut self, position: usize) -> Result<()> {
        self.cursor.seek(SeekFrom::Start(position as u64))?;
        Ok(())
    }

    /// Write zero bytes until the position is a multiple of `alignment`.
    pub fn pad_to(&mut self, alignment: usize) -> Result<()> {
        let padding = padding_for(self.position(), alignment);
        for _ in 0..padding {
            self.cursor.write_u8(0)?;
        }
        Ok(())
    }

    /// Write raw bytes.
    #[inline]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.cursor.write_all(bytes)?;
        Ok(())
    }

    /// Write a string followed by a null terminator.
    pub fn write_cstring(&mut self, value: &str) -> Result<()> {
        self.write_bytes(value.as_bytes())?;
        self.write_u8(0)
    }

    /// Write a zerocopy struct verbatim.
    #[inline]
    pub fn write_struct<T: IntoBytes + Immutable>(&mut self, value: &T) -> Result<()> {
        self.write_bytes(value.as_bytes())
    }

    /// Write a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.cursor.write_u8(value)?;
        Ok(())
    }

    /// Write a signed byte.
    #[inline]
    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.cursor.write_i8(value)?;
        Ok(())
    }

    /// Write a little-endian u16.
    #[inline]
    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.cursor.write_u16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian i16.
    #[inline]
    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.cursor.write_i16::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian u32.
    #[inline]
    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.cursor.write_u32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian i32.
    #[inline]
    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.cursor.write_i32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian u64.
    #[inline]
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.cursor.write_u64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian i64.
    #[inline]
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.cursor.write_i64::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a little-endian f32.
    #[inline]
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.cursor.write_f32::<LittleEndian>(value)?;
        Ok(())
    }

    /// Write a relative offset pointing at `target`.
    ///
    /// The value is `target - field_start`, which is negative when the target
    /// precedes the field. `None` writes [`NULL_OFFSET`].
    pub fn write_relative_offset(&mut self, target: Option<usize>) -> Result<()> {
        let value = match target {
            Some(target) => {
                let relative = target as i64 - self.position() as i64;
                i32::try_from(relative)
                    .ok()
                    .filter(|v| *v != NULL_OFFSET)
                    .ok_or_else(|| Error::ValueOutOfRange {
                        field: "relative offset",
                        value: relative.to_string(),
                    })?
            }
            None => NULL_OFFSET,
        };
        self.write_i32(value)
    }

    /// Consume the writer and return the buffer.
    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

/// Number of bytes needed to bring `position` up to a multiple of `alignment`.
#[inline]
pub fn padding_for(position: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        return 0;
    }
    (alignment - position % alignment) % alignment
}

/// Convert a wide integer into a fixed-width field type, failing instead of truncating.
pub fn fit_int<T: TryFrom<i128>>(field: &'static str, value: i128) -> Result<T> {
    T::try_from(value).map_err(|_| Error::ValueOutOfRange {
        field,
        value: value.to_string(),
    })
}
