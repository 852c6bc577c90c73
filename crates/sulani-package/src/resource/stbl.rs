//! String table (`STBL` version 5) resources.
//!
//! Layout: `"STBL"`, version u16, compressed u8, entry count u64, two
//! reserved bytes and the total string data length u32 (each string plus
//! one). Entries follow as key u32, flags u8, length u16 and UTF-8 bytes.

use std::sync::Arc;

use rustc_hash::FxHashSet;
use sulani_common::{BinaryReader, BinaryWriter, CacheNode, Model, Tracked};
use tracing::debug;

use crate::{Error, Result};

/// String table magic.
pub const MAGIC: &[u8; 4] = b"STBL";

/// The only supported version.
pub const VERSION: u16 = 5;

/// One localized string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEntry {
    pub key: u32,
    pub flags: u8,
    pub value: String,
}

/// A localized string table.
#[derive(Debug, PartialEq)]
pub struct StringTableResource {
    node: CacheNode,
    compressed: u8,
    reserved: [u8; 2],
    entries: Vec<StringEntry>,
}

impl StringTableResource {
    /// Create an empty table.
    pub fn create() -> Self {
        Self {
            node: CacheNode::new(),
            compressed: 0,
            reserved: [0; 2],
            entries: Vec::new(),
        }
    }

    /// Decode a string table, keeping `data` as the cached buffer.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        reader.expect_magic(MAGIC)?;
        let version = reader.read_u16()?;
        if version != VERSION {
            return Err(Error::UnsupportedStringTableVersion(version));
        }
        let compressed = reader.read_u8()?;
        let count = reader.read_u64()?;
        let reserved = reader.read_bytes(2)?;
        let reserved = [reserved[0], reserved[1]];
        let _string_length = reader.read_u32()?;

        // Each entry needs at least seven bytes.
        let capacity = usize::try_from(count).unwrap_or(usize::MAX).min(reader.remaining() / 7);
        let mut entries = Vec::with_capacity(capacity);
        for _ in 0..count {
            let key = reader.read_u32()?;
            let flags = reader.read_u8()?;
            let length = reader.read_u16()?;
            let value = reader.read_string(length as usize)?.to_string();
            entries.push(StringEntry { key, flags, value });
        }

        debug!(entries = entries.len(), "decoded string table");
        let table = Self {
            node: CacheNode::with_cached(Arc::from(data)),
            compressed,
            reserved,
            entries,
        };
        Ok(table)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn entries(&self) -> &[StringEntry] {
        &self.entries
    }

    /// First string with `key`.
    pub fn get(&self, key: u32) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.value.as_str())
    }

    /// Append a string. Keys wider than 32 bits are rejected here rather
    /// than when the table is written.
    pub fn add(&mut self, key: u64, value: impl Into<String>) -> Result<()> {
        let key = u32::try_from(key).map_err(|_| Error::InvalidStringKey(key))?;
        self.entries.push(StringEntry {
            key,
            flags: 0,
            value: value.into(),
        });
        self.node.invalidate();
        Ok(())
    }

    /// Replace the text of entry `index`.
    pub fn set_value(&mut self, index: usize, value: impl Into<String>) -> Result<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(Error::EntryOutOfRange { index, len })?;
        entry.value = value.into();
        self.node.invalidate();
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<StringEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        self.node.invalidate();
        Some(entry)
    }

    /// Reject duplicate keys, empty strings and over-long strings.
    pub fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for entry in &self.entries {
            if !seen.insert(entry.key) {
                return Err(Error::DuplicateStringKey(entry.key));
            }
            if entry.value.is_empty() {
                return Err(Error::EmptyString(entry.key));
            }
            if entry.value.len() > u16::MAX as usize {
                return Err(Error::StringTooLong {
                    key: entry.key,
                    len: entry.value.len(),
                });
            }
        }
        Ok(())
    }
}

impl Default for StringTableResource {
    fn default() -> Self {
        Self::create()
    }
}

impl Clone for StringTableResource {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            compressed: self.compressed,
            reserved: self.reserved,
            entries: self.entries.clone(),
        }
    }
}

impl Tracked for StringTableResource {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for StringTableResource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        let string_length: usize = self.entries.iter().map(|e| e.value.len() + 1).sum();
        let string_length = u32::try_from(string_length).map_err(|_| {
            sulani_common::Error::ValueOutOfRange {
                field: "string data length",
                value: string_length.to_string(),
            }
        })?;

        let mut writer = BinaryWriter::with_capacity(21 + string_length as usize + self.len() * 7);
        writer.write_bytes(MAGIC)?;
        writer.write_u16(VERSION)?;
        writer.write_u8(self.compressed)?;
        writer.write_u64(self.entries.len() as u64)?;
        writer.write_bytes(&self.reserved)?;
        writer.write_u32(string_length)?;

        for entry in &self.entries {
            let length = u16::try_from(entry.value.len()).map_err(|_| Error::StringTooLong {
                key: entry.key,
                len: entry.value.len(),
            })?;
            writer.write_u32(entry.key)?;
            writer.write_u8(entry.flags)?;
            writer.write_u16(length)?;
            writer.write_bytes(entry.value.as_bytes())?;
        }
        Ok(writer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StringTableResource {
        let mut table = StringTableResource::create();
        table.add(0x0000_0001, "Hello").unwrap();
        table.add(0xFFFF_FFFF, "Wörld").unwrap();
        table
    }

    #[test]
    fn test_roundtrip() {
        let table = sample();
        let bytes = table.buffer().unwrap();
        assert_eq!(&bytes[..4], b"STBL");
        // string data length: 6 + 7
        assert_eq!(&bytes[17..21], &13u32.to_le_bytes());

        let decoded = StringTableResource::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded.get(0xFFFF_FFFF), Some("Wörld"));
        assert_eq!(&*decoded.buffer().unwrap(), &*bytes);
    }

    #[test]
    fn test_key_range_checked_on_add() {
        let mut table = StringTableResource::create();
        assert!(table.add(0xFFFF_FFFF, "max").is_ok());
        assert!(matches!(
            table.add(0x1_0000_0000, "too wide"),
            Err(Error::InvalidStringKey(0x1_0000_0000))
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_validate() {
        let mut table = sample();
        assert!(table.validate().is_ok());

        table.add(1, "again").unwrap();
        assert!(matches!(table.validate(), Err(Error::DuplicateStringKey(1))));

        table.remove(2);
        table.set_value(0, "").unwrap();
        assert!(matches!(table.validate(), Err(Error::EmptyString(1))));
    }

    #[test]
    fn test_edit_invalidates() {
        let mut table = sample();
        table.buffer().unwrap();
        table.set_value(1, "World").unwrap();
        assert!(!table.node().is_cached());
        assert!(table.set_value(5, "x").is_err());
    }

    #[test]
    fn test_rejects_other_versions() {
        let mut bytes = sample().serialize().unwrap();
        bytes[4] = 4;
        assert!(matches!(
            StringTableResource::from_bytes(&bytes),
            Err(Error::UnsupportedStringTableVersion(4))
        ));
    }
}
