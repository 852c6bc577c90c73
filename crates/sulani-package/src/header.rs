//! The fixed 96-byte DBPF header.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// DBPF file header.
///
/// All fields are little-endian. Reserved areas are preserved on read and
/// zeroed on write.
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C, packed)]
pub struct DbpfHeader {
    /// `"DBPF"`
    pub magic: [u8; 4],
    /// File format major version (2)
    pub major_version: u32,
    /// File format minor version (1)
    pub minor_version: u32,
    pub reserved0: [u8; 24],
    /// Number of index entries
    pub index_count: u32,
    /// Legacy 32-bit index position
    pub index_position_low: u32,
    /// Index size in bytes
    pub index_size: u32,
    pub reserved1: [u8; 12],
    /// Index format version (3)
    pub index_version: u32,
    /// 64-bit index position, preferred when non-zero
    pub index_position: u64,
    pub reserved2: [u8; 24],
}

impl DbpfHeader {
    /// Header size in bytes.
    pub const SIZE: usize = 96;
    /// Header magic.
    pub const MAGIC: [u8; 4] = *b"DBPF";
    /// Supported major version.
    pub const MAJOR_VERSION: u32 = 2;
    /// Supported minor version.
    pub const MINOR_VERSION: u32 = 1;
    /// The constant index version field.
    pub const INDEX_VERSION: u32 = 3;

    /// A header for a freshly written package.
    pub fn new(index_count: u32, index_position: u64, index_size: u32) -> Self {
        Self {
            magic: Self::MAGIC,
            major_version: Self::MAJOR_VERSION,
            minor_version: Self::MINOR_VERSION,
            reserved0: [0; 24],
            index_count,
            index_position_low: u32::try_from(index_position).unwrap_or(0),
            index_size,
            reserved1: [0; 12],
            index_version: Self::INDEX_VERSION,
            index_position,
            reserved2: [0; 24],
        }
    }

    /// Where the index starts: the 64-bit field if set, else the legacy one.
    #[inline]
    pub fn index_offset(&self) -> u64 {
        match self.index_position {
            0 => u64::from(self.index_position_low),
            position => position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_size() {
        assert_eq!(std::mem::size_of::<DbpfHeader>(), DbpfHeader::SIZE);
    }

    #[test]
    fn test_index_offset_prefers_wide_field() {
        let mut header = DbpfHeader::new(0, 0, 0);
        header.index_position_low = 200;
        assert_eq!(header.index_offset(), 200);
        header.index_position = 300;
        assert_eq!(header.index_offset(), 300);
    }

    #[test]
    fn test_new_header_bytes() {
        let header = DbpfHeader::new(2, 0x60, 64);
        let bytes = header.as_bytes();
        assert_eq!(&bytes[..4], b"DBPF");
        assert_eq!(&bytes[4..8], &2u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
        assert_eq!(&bytes[36..40], &2u32.to_le_bytes());
        assert_eq!(&bytes[40..44], &0x60u32.to_le_bytes());
        assert_eq!(&bytes[44..48], &64u32.to_le_bytes());
        assert_eq!(&bytes[60..64], &3u32.to_le_bytes());
        assert_eq!(&bytes[64..72], &0x60u64.to_le_bytes());
    }
}
