//! The package index: one record per entry.
//!
//! The index starts with a flags word whose low three bits mark the type,
//! group and instance-high fields as constant across all entries. Constant
//! fields are stored once after the flags; the remaining fields follow per
//! entry.

use sulani_common::{BinaryReader, BinaryWriter, ResourceKey};

use crate::compression::Compression;
use crate::{Error, Result};

const CONSTANT_TYPE: u32 = 1 << 0;
const CONSTANT_GROUP: u32 = 1 << 1;
const CONSTANT_INSTANCE_HIGH: u32 = 1 << 2;
const FLAG_MASK: u32 = 0x7;

/// Bit 31 of the size field: compression fields follow.
const EXTENDED_FLAG: u32 = 0x8000_0000;

/// One decoded index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexEntry {
    pub key: ResourceKey,
    /// Absolute record position.
    pub position: u32,
    /// Stored (possibly compressed) record size.
    pub size: u32,
    pub decompressed_size: u32,
    pub compression: Compression,
    pub committed: u16,
}

impl IndexEntry {
    /// Byte range of the record.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = self.position as usize;
        start..start + self.size as usize
    }
}

/// Read `count` index records starting at `position`.
pub(crate) fn read_index(data: &[u8], position: u64, count: u32) -> Result<Vec<IndexEntry>> {
    let out_of_bounds = || Error::IndexOutOfBounds {
        position,
        count,
        len: data.len(),
    };
    let start = usize::try_from(position).map_err(|_| out_of_bounds())?;
    if start > data.len() || (count > 0 && start + 4 > data.len()) {
        return Err(out_of_bounds());
    }
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut reader = BinaryReader::new_at(data, start);
    let flags = reader.read_u32()? & FLAG_MASK;
    let constant_type = read_constant(&mut reader, flags, CONSTANT_TYPE)?;
    let constant_group = read_constant(&mut reader, flags, CONSTANT_GROUP)?;
    let constant_high = read_constant(&mut reader, flags, CONSTANT_INSTANCE_HIGH)?;

    let mut entries = Vec::with_capacity((count as usize).min(reader.remaining() / 16));
    for _ in 0..count {
        let type_id = match constant_type {
            Some(value) => value,
            None => reader.read_u32()?,
        };
        let group = match constant_group {
            Some(value) => value,
            None => reader.read_u32()?,
        };
        let instance_high = match constant_high {
            Some(value) => value,
            None => reader.read_u32()?,
        };
        let instance_low = reader.read_u32()?;
        let position = reader.read_u32()?;
        let size_field = reader.read_u32()?;
        let decompressed_size = reader.read_u32()?;

        let (compression, committed) = if size_field & EXTENDED_FLAG != 0 {
            let compression = Compression::from_u16(reader.read_u16()?);
            (compression, reader.read_u16()?)
        } else {
            (Compression::None, 1)
        };

        entries.push(IndexEntry {
            key: ResourceKey::new(
                type_id,
                group,
                (u64::from(instance_high) << 32) | u64::from(instance_low),
            ),
            position,
            size: size_field & !EXTENDED_FLAG,
            decompressed_size,
            compression,
            committed,
        });
    }
    Ok(entries)
}

fn read_constant(reader: &mut BinaryReader<'_>, flags: u32, bit: u32) -> Result<Option<u32>> {
    if flags & bit == 0 {
        return Ok(None);
    }
    Ok(Some(reader.read_u32()?))
}

/// Write index records with no constant fields.
pub(crate) fn write_index(writer: &mut BinaryWriter, entries: &[IndexEntry]) -> Result<()> {
    writer.write_u32(0)?;
    for entry in entries {
        let size = entry.size;
        if size & EXTENDED_FLAG != 0 {
            return Err(sulani_common::Error::ValueOutOfRange {
                field: "index record size",
                value: size.to_string(),
            }
            .into());
        }

        writer.write_u32(entry.key.type_id)?;
        writer.write_u32(entry.key.group)?;
        writer.write_u32(entry.key.instance_high())?;
        writer.write_u32(entry.key.instance_low())?;
        writer.write_u32(entry.position)?;
        if entry.compression.is_compressed() {
            writer.write_u32(size | EXTENDED_FLAG)?;
            writer.write_u32(entry.decompressed_size)?;
            writer.write_u16(entry.compression.to_u16())?;
            writer.write_u16(entry.committed)?;
        } else {
            writer.write_u32(size)?;
            writer.write_u32(entry.decompressed_size)?;
        }
    }
    Ok(())
}
