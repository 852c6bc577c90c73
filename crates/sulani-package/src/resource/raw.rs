//! Opaque resources kept as original bytes.

use std::sync::Arc;

use sulani_common::{CacheNode, Model, Tracked};

use crate::compression::Compression;
use crate::{Error, Result};

/// Uncompressed bytes of a resource that was not decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct RawResource {
    node: CacheNode,
    data: Arc<[u8]>,
    reason: String,
}

impl RawResource {
    pub fn new(data: impl Into<Arc<[u8]>>, reason: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            node: CacheNode::with_cached(Arc::clone(&data)),
            data,
            reason: reason.into(),
        }
    }

    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Why the bytes were not decoded.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Tracked for RawResource {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for RawResource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        Ok(self.data.to_vec())
    }
}

/// A record whose compression is not handled.
///
/// Only the stored record is kept; the owning entry writes it back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct UnsupportedResource {
    node: CacheNode,
    record: Arc<[u8]>,
    compression: Compression,
    decompressed_size: u32,
    reason: String,
}

impl UnsupportedResource {
    pub fn new(
        record: impl Into<Arc<[u8]>>,
        compression: Compression,
        decompressed_size: u32,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            node: CacheNode::new(),
            record: record.into(),
            compression,
            decompressed_size,
            reason: reason.into(),
        }
    }

    /// The stored, still compressed record.
    #[inline]
    pub fn record(&self) -> &[u8] {
        &self.record
    }

    #[inline]
    pub(crate) fn record_arc(&self) -> Arc<[u8]> {
        Arc::clone(&self.record)
    }

    #[inline]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline]
    pub fn decompressed_size(&self) -> u32 {
        self.decompressed_size
    }

    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Tracked for UnsupportedResource {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for UnsupportedResource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        Err(Error::NotSerializable {
            reason: self.reason.clone(),
        })
    }

    fn caches(&self) -> bool {
        false
    }
}
