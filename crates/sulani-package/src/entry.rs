//! Package entries.

use std::sync::Arc;

use sulani_common::{CacheNode, Model, ResourceKey, Tracked};

use crate::compression::{self, Compression};
use crate::resource::Resource;
use crate::{Error, Result};

/// One keyed resource inside a package.
///
/// The entry's cached buffer is the stored record: the resource bytes after
/// compression. Entries read from a package start with the original record
/// cached, so untouched entries are written back unchanged.
#[derive(Debug, PartialEq)]
pub struct ContainerEntry {
    node: CacheNode,
    key: ResourceKey,
    resource: Resource,
    compression: Compression,
    committed: u16,
}

impl ContainerEntry {
    /// Create an entry. New entries are zlib-compressed, except unsupported
    /// resources, which keep their own compression.
    pub fn new(key: ResourceKey, resource: Resource) -> Self {
        let compression = match &resource {
            Resource::Unsupported(unsupported) => unsupported.compression(),
            _ => Compression::Zlib,
        };
        let entry = Self {
            node: CacheNode::new(),
            key,
            resource,
            compression,
            committed: 1,
        };
        entry.adopt(&entry.resource);
        entry
    }

    /// An entry read from a package, with its stored record cached.
    pub(crate) fn from_record(
        key: ResourceKey,
        resource: Resource,
        compression: Compression,
        committed: u16,
        record: Arc<[u8]>,
    ) -> Self {
        let entry = Self {
            node: CacheNode::with_cached(record),
            key,
            resource,
            compression,
            committed,
        };
        entry.adopt(&entry.resource);
        entry
    }

    #[inline]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    /// Re-key the entry.
    ///
    /// Prefer [`crate::Container::set_key`] for entries inside a package; it
    /// also keeps the package's key lookup current.
    pub fn set_key(&mut self, key: ResourceKey) {
        self.key = key;
        self.node.invalidate();
    }

    /// Change the key without touching the cached record.
    pub(crate) fn replace_key(&mut self, key: ResourceKey) {
        self.key = key;
    }

    #[inline]
    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    /// Mutable access to the resource.
    ///
    /// Fails for raw and unsupported resources. The entry is invalidated up
    /// front, so replacing the resource through the reference is also safe.
    pub fn resource_mut(&mut self) -> Result<&mut Resource> {
        self.resource.ensure_mutable()?;
        self.resource.node().set_owner(&self.node);
        self.node.invalidate();
        Ok(&mut self.resource)
    }

    /// Swap in a new resource, returning the old one detached.
    pub fn set_resource(&mut self, resource: impl Into<Resource>) -> Resource {
        let resource = resource.into();
        self.adopt(&resource);
        match &resource {
            Resource::Unsupported(unsupported) => self.compression = unsupported.compression(),
            _ if matches!(self.compression, Compression::Other(_)) => {
                self.compression = Compression::Zlib
            }
            _ => {}
        }
        let old = std::mem::replace(&mut self.resource, resource);
        old.node().clear_owner();
        self.node.invalidate();
        old
    }

    #[inline]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Choose how the record is stored. Only `None` and `Zlib` can be
    /// written, and unsupported records keep their original storage.
    pub fn set_compression(&mut self, compression: Compression) -> Result<()> {
        if let Compression::Other(value) = compression {
            return Err(Error::UnsupportedCompression(value));
        }
        if let Resource::Unsupported(_) = self.resource {
            return Err(Error::ReadOnly {
                variant: self.resource.variant_name(),
            });
        }
        if self.compression != compression {
            self.compression = compression;
            self.node.invalidate();
        }
        Ok(())
    }

    /// The index's committed flag.
    #[inline]
    pub fn committed(&self) -> u16 {
        self.committed
    }

    /// Whether the stored record is cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.node.is_cached()
    }

    /// Size of the resource before compression.
    pub fn decompressed_size(&self) -> Result<u32> {
        self.resource.decompressed_size()
    }
}

impl Clone for ContainerEntry {
    fn clone(&self) -> Self {
        let entry = Self {
            node: self.node.clone(),
            key: self.key,
            resource: self.resource.clone(),
            compression: self.compression,
            committed: self.committed,
        };
        entry.adopt(&entry.resource);
        entry
    }
}

impl Tracked for ContainerEntry {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for ContainerEntry {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        if let Resource::Unsupported(unsupported) = &self.resource {
            return Ok(unsupported.record().to_vec());
        }
        let bytes = self.resource.buffer()?;
        match self.compression {
            Compression::None => Ok(bytes.to_vec()),
            Compression::Zlib => Ok(compression::deflate(&bytes)?),
            Compression::Other(value) => Err(Error::UnsupportedCompression(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{RawResource, StringTableResource, UnsupportedResource};

    fn table() -> StringTableResource {
        let mut table = StringTableResource::create();
        table.add(1, "one").unwrap();
        table
    }

    #[test]
    fn test_record_is_compressed_resource() {
        let entry = ContainerEntry::new(ResourceKey::new(1, 2, 3), table().into());
        let record = entry.buffer().unwrap();
        let plain = entry.resource().buffer().unwrap();
        assert_eq!(compression::inflate(&record, plain.len()).unwrap(), plain.to_vec());
        assert_eq!(entry.decompressed_size().unwrap() as usize, plain.len());
    }

    #[test]
    fn test_resource_edit_invalidates_entry() {
        let mut entry = ContainerEntry::new(ResourceKey::new(1, 2, 3), table().into());
        entry.buffer().unwrap();
        assert!(entry.is_cached());

        let resource = entry.resource().as_string_table().unwrap();
        resource.invalidate();
        assert!(!entry.is_cached());

        entry.buffer().unwrap();
        entry
            .resource_mut()
            .unwrap()
            .as_string_table_mut()
            .unwrap()
            .add(2, "two")
            .unwrap();
        assert!(!entry.is_cached());
    }

    #[test]
    fn test_read_only_resources() {
        let mut entry = ContainerEntry::new(
            ResourceKey::default(),
            RawResource::new(&b"abc"[..], "test").into(),
        );
        assert!(matches!(entry.resource_mut(), Err(Error::ReadOnly { .. })));
        assert!(entry.set_compression(Compression::None).is_ok());
        assert_eq!(&*entry.buffer().unwrap(), b"abc");

        let unsupported = UnsupportedResource::new(&b"zz"[..], Compression::Other(0xFFFF), 10, "refpack");
        let mut entry = ContainerEntry::new(ResourceKey::default(), Resource::Unsupported(unsupported));
        assert_eq!(entry.compression(), Compression::Other(0xFFFF));
        assert!(entry.set_compression(Compression::Zlib).is_err());
        assert_eq!(&*entry.buffer().unwrap(), b"zz");
        assert_eq!(entry.decompressed_size().unwrap(), 10);
    }

    #[test]
    fn test_set_resource_detaches_old() {
        let mut entry = ContainerEntry::new(ResourceKey::default(), table().into());
        let old = entry.set_resource(StringTableResource::create());
        assert!(!old.node().has_owner());
        assert!(entry.resource().node().is_owned_by(entry.node()));
    }

    #[test]
    fn test_clone_readopts() {
        let entry = ContainerEntry::new(ResourceKey::default(), table().into());
        let copy = entry.clone();
        assert!(copy.resource().node().is_owned_by(copy.node()));
        assert_eq!(copy, entry);
    }
}
