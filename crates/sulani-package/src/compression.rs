//! Record compression.

use std::io::{self, Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

/// How an entry's record is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Compression {
    /// Stored as-is.
    None,
    /// zlib stream (type `0x5A42`).
    #[default]
    Zlib,
    /// Any other type; the record is preserved without decoding.
    Other(u16),
}

impl Compression {
    /// Index value for zlib records.
    pub const ZLIB: u16 = 0x5A42;

    /// Map an index compression type.
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => Self::None,
            Self::ZLIB => Self::Zlib,
            other => Self::Other(other),
        }
    }

    /// The index compression type.
    pub fn to_u16(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Zlib => Self::ZLIB,
            Self::Other(value) => value,
        }
    }

    pub fn is_compressed(self) -> bool {
        self != Self::None
    }

    /// Short label for listings.
    pub fn label(self) -> String {
        match self {
            Self::None => "none".to_string(),
            Self::Zlib => "zlib".to_string(),
            Self::Other(value) => format!("{value:#06x}"),
        }
    }
}

/// Upper bound on the zlib expansion ratio, used to cap the initial buffer.
const MAX_EXPANSION: usize = 1032;

/// Inflate a zlib record of known size.
///
/// Inflation stops one byte past `expected_size`, so a stream that expands
/// further than recorded fails without being inflated in full.
pub(crate) fn inflate(data: &[u8], expected_size: usize) -> io::Result<Vec<u8>> {
    let capacity = expected_size.min(data.len().saturating_mul(MAX_EXPANSION));
    let mut output = Vec::with_capacity(capacity);
    let limit = u64::try_from(expected_size).map_or(u64::MAX, |size| size.saturating_add(1));
    ZlibDecoder::new(data).take(limit).read_to_end(&mut output)?;
    if output.len() > expected_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("stream inflates past the recorded {expected_size} bytes"),
        ));
    }
    Ok(output)
}

/// Deflate `data` into a zlib stream.
pub(crate) fn deflate(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zlib_roundtrip() {
        let original = b"SimData SimData SimData SimData SimData".repeat(4);
        let compressed = deflate(&original).unwrap();
        assert!(compressed.len() < original.len());
        assert_eq!(&compressed[..1], &[0x78]);
        assert_eq!(inflate(&compressed, original.len()).unwrap(), original);
    }

    #[test]
    fn test_inflate_stops_at_recorded_size() {
        let original = vec![0u8; 64 * 1024];
        let compressed = deflate(&original).unwrap();

        let err = inflate(&compressed, 10).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);

        // A short stream is left for the caller to compare against the index.
        assert_eq!(inflate(&compressed, original.len() + 5).unwrap().len(), original.len());
    }

    #[test]
    fn test_inflate_garbage_fails() {
        assert!(inflate(b"not zlib at all", 16).is_err());
    }

    #[test]
    fn test_type_mapping() {
        assert_eq!(Compression::from_u16(0x5A42), Compression::Zlib);
        assert_eq!(Compression::from_u16(0), Compression::None);
        assert_eq!(Compression::from_u16(0xFFFF), Compression::Other(0xFFFF));
        assert_eq!(Compression::Other(0xFFFE).to_u16(), 0xFFFE);
        assert_eq!(Compression::Other(0xFFFF).label(), "0xffff");
    }
}
