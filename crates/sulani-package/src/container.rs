//! DBPF package reading and writing.

use std::fs::File;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use hashbrown::HashMap;
use memmap2::Mmap;
use rustc_hash::FxBuildHasher;
use sulani_common::{fit_int, BinaryReader, BinaryWriter, CacheNode, Model, ResourceKey, Tracked};
use tracing::{debug, warn};

use crate::compression::{self, Compression};
use crate::entry::ContainerEntry;
use crate::header::DbpfHeader;
use crate::index::{self, IndexEntry};
use crate::resource::{RawResource, Resource, UnsupportedResource};
use crate::{Error, ReadOptions, Result};

type KeyIndex = HashMap<ResourceKey, Vec<usize>, FxBuildHasher>;

/// A DBPF package: an ordered list of keyed resources.
///
/// Keys are not unique. Entries keep the order they were read or added in,
/// which is also the order of the written index.
///
/// # Example
///
/// ```no_run
/// use sulani_package::{Container, ReadOptions};
///
/// let package = Container::open("ClientFullBuild0.package", &ReadOptions::default())?;
/// for entry in package.entries() {
///     println!("{} {}", entry.key(), entry.resource().variant_name());
/// }
/// # Ok::<(), sulani_package::Error>(())
/// ```
#[derive(Debug)]
pub struct Container {
    node: CacheNode,
    entries: Vec<ContainerEntry>,
    key_index: OnceLock<KeyIndex>,
}

impl Container {
    /// Create an empty package.
    pub fn create() -> Self {
        Self::from_entries(Vec::new())
    }

    fn from_entries(entries: Vec<ContainerEntry>) -> Self {
        let container = Self {
            node: CacheNode::new(),
            entries,
            key_index: OnceLock::new(),
        };
        for entry in &container.entries {
            container.adopt(entry);
        }
        container
    }

    /// Open a package file through a memory map.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        // SAFETY: the map is only read while decoding and is dropped before
        // returning; decoded resources own copies of their bytes.
        let mmap = unsafe { Mmap::map(&file)? };
        Self::from_bytes(&mmap, options)
    }

    /// Decode a package buffer.
    pub fn from_bytes(data: &[u8], options: &ReadOptions) -> Result<Self> {
        let header = read_header(data, options)?;
        let index = index::read_index(data, header.index_offset(), header.index_count)?;
        let entries = decode_entries(data, &index, options)?;

        debug!(
            entries = entries.len(),
            size = data.len(),
            index = header.index_offset(),
            "read package"
        );

        let container = Self::from_entries(entries);
        container.node.store(Arc::from(data));
        Ok(container)
    }

    /// Serialize and write the package to `path`.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.buffer()?;
        std::fs::write(path, &bytes)?;
        Ok(())
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
    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContainerEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&ContainerEntry> {
        self.entries.get(index)
    }

    /// Mutable access to an entry. The package is invalidated up front and
    /// its key lookup is rebuilt on next use.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut ContainerEntry> {
        let entry = self.entries.get_mut(index)?;
        entry.node().set_owner(&self.node);
        self.node.invalidate();
        self.key_index.take();
        Some(entry)
    }

    /// The first entry with `key`.
    pub fn get_by_key(&self, key: &ResourceKey) -> Option<&ContainerEntry> {
        self.position_of(key).map(|index| &self.entries[index])
    }

    /// Index of the first entry with `key`.
    pub fn position_of(&self, key: &ResourceKey) -> Option<usize> {
        self.key_index().get(key).and_then(|found| found.first().copied())
    }

    /// Every entry with `key`, in package order.
    pub fn find_all_by_key(&self, key: &ResourceKey) -> Vec<&ContainerEntry> {
        self.key_index()
            .get(key)
            .map(|found| found.iter().map(|&index| &self.entries[index]).collect())
            .unwrap_or_default()
    }

    /// Append an entry and return its index.
    pub fn add(&mut self, key: ResourceKey, resource: impl Into<Resource>) -> usize {
        let entry = ContainerEntry::new(key, resource.into());
        self.adopt(&entry);
        self.entries.push(entry);
        self.changed();
        self.entries.len() - 1
    }

    /// Insert an entry at `index`, shifting later entries.
    pub fn insert(
        &mut self,
        index: usize,
        key: ResourceKey,
        resource: impl Into<Resource>,
    ) -> Result<()> {
        if index > self.entries.len() {
            return Err(Error::EntryOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        let entry = ContainerEntry::new(key, resource.into());
        self.adopt(&entry);
        self.entries.insert(index, entry);
        self.changed();
        Ok(())
    }

    /// Remove the entry at `index`, returning it detached.
    pub fn remove(&mut self, index: usize) -> Option<ContainerEntry> {
        if index >= self.entries.len() {
            return None;
        }
        let entry = self.entries.remove(index);
        entry.node().clear_owner();
        self.changed();
        Some(entry)
    }

    /// Remove the first entry with `key`.
    pub fn remove_by_key(&mut self, key: &ResourceKey) -> Option<ContainerEntry> {
        let index = self.position_of(key)?;
        self.remove(index)
    }

    /// Re-key the entry at `index`. The entry's stored record is kept.
    pub fn set_key(&mut self, index: usize, key: ResourceKey) -> Result<()> {
        let len = self.entries.len();
        let entry = self
            .entries
            .get_mut(index)
            .ok_or(Error::EntryOutOfRange { index, len })?;
        entry.replace_key(key);
        self.changed();
        Ok(())
    }

    /// Validate every resource.
    pub fn validate(&self) -> Result<()> {
        for entry in &self.entries {
            entry
                .resource()
                .validate()
                .map_err(|e| e.in_resource(entry.key()))?;
        }
        Ok(())
    }

    fn changed(&mut self) {
        self.key_index.take();
        self.node.invalidate();
    }

    fn key_index(&self) -> &KeyIndex {
        self.key_index.get_or_init(|| {
            let mut map = KeyIndex::default();
            for (index, entry) in self.entries.iter().enumerate() {
                map.entry(entry.key()).or_default().push(index);
            }
            map
        })
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::create()
    }
}

impl Clone for Container {
    fn clone(&self) -> Self {
        let container = Self::from_entries(self.entries.clone());
        if let Some(bytes) = self.node.cached() {
            container.node.store(bytes);
        }
        container
    }
}

impl PartialEq for Container {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl<'a> IntoIterator for &'a Container {
    type Item = &'a ContainerEntry;
    type IntoIter = std::slice::Iter<'a, ContainerEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl Tracked for Container {
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

impl Model for Container {
    type Error = Error;

    /// Lay out the header, every stored record in entry order, then the index.
    fn serialize(&self) -> Result<Vec<u8>> {
        let mut records = Vec::with_capacity(self.entries.len());
        for entry in &self.entries {
            let key = entry.key();
            let record = entry.buffer().map_err(|e| e.in_resource(key))?;
            let decompressed_size = entry
                .decompressed_size()
                .map_err(|e| e.in_resource(key))?;
            records.push((record, decompressed_size));
        }

        let data_size: usize = records.iter().map(|(record, _)| record.len()).sum();
        let mut writer =
            BinaryWriter::with_capacity(DbpfHeader::SIZE + data_size + 4 + 32 * records.len());
        writer.seek(DbpfHeader::SIZE)?;

        let mut table = Vec::with_capacity(records.len());
        for (entry, (record, decompressed_size)) in self.entries.iter().zip(&records) {
            table.push(IndexEntry {
                key: entry.key(),
                position: fit_int("record position", writer.position() as i128)?,
                size: fit_int("record size", record.len() as i128)?,
                decompressed_size: *decompressed_size,
                compression: entry.compression(),
                committed: entry.committed(),
            });
            writer.write_bytes(record)?;
        }

        let index_position = writer.position();
        index::write_index(&mut writer, &table)?;
        let index_size = fit_int("index size", (writer.position() - index_position) as i128)?;
        let header = DbpfHeader::new(
            fit_int("index count", table.len() as i128)?,
            index_position as u64,
            index_size,
        );
        writer.seek(0)?;
        writer.write_struct(&header)?;

        debug!(entries = table.len(), size = writer.len(), "wrote package");
        Ok(writer.into_inner())
    }
}

/// Parse the header, tolerating bad field values when asked to.
fn read_header(data: &[u8], options: &ReadOptions) -> Result<DbpfHeader> {
    let header: DbpfHeader = BinaryReader::new(data).read_struct()?;

    let magic = header.magic;
    let major_version = header.major_version;
    let minor_version = header.minor_version;
    let index_version = header.index_version;

    let checks = [
        (
            "magic",
            magic == DbpfHeader::MAGIC,
            String::from_utf8_lossy(&DbpfHeader::MAGIC).into_owned(),
            String::from_utf8_lossy(&magic).into_owned(),
        ),
        (
            "version",
            major_version == DbpfHeader::MAJOR_VERSION && minor_version == DbpfHeader::MINOR_VERSION,
            format!("{}.{}", DbpfHeader::MAJOR_VERSION, DbpfHeader::MINOR_VERSION),
            format!("{major_version}.{minor_version}"),
        ),
        (
            "index version",
            index_version == DbpfHeader::INDEX_VERSION,
            DbpfHeader::INDEX_VERSION.to_string(),
            index_version.to_string(),
        ),
    ];

    for (field, ok, expected, actual) in checks {
        if ok {
            continue;
        }
        if !options.ignore_header_errors {
            return Err(Error::InvalidHeader {
                field,
                expected,
                actual,
            });
        }
        warn!(field, %expected, %actual, "ignoring package header error");
    }
    Ok(header)
}

fn decode_entries(
    data: &[u8],
    index: &[IndexEntry],
    options: &ReadOptions,
) -> Result<Vec<ContainerEntry>> {
    #[cfg(feature = "parallel")]
    let decoded: Vec<Result<ContainerEntry>> = {
        use rayon::prelude::*;
        index
            .par_iter()
            .enumerate()
            .map(|(i, entry)| decode_entry(data, i, entry, options))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let decoded: Vec<Result<ContainerEntry>> = index
        .iter()
        .enumerate()
        .map(|(i, entry)| decode_entry(data, i, entry, options))
        .collect();

    decoded.into_iter().collect()
}

fn decode_entry(
    data: &[u8],
    ordinal: usize,
    entry: &IndexEntry,
    options: &ReadOptions,
) -> Result<ContainerEntry> {
    let key = entry.key;
    let range = entry.range();
    let record = data
        .get(range)
        .ok_or_else(|| Error::RecordOutOfBounds {
            index: ordinal,
            key,
            position: entry.position,
            size: entry.size,
            len: data.len(),
        })?;

    let resource = match entry.compression {
        Compression::Other(value) => {
            let reason = format!("unsupported compression type {value:#06x}");
            debug!(%key, %reason, "keeping record unparsed");
            Resource::Unsupported(UnsupportedResource::new(
                record,
                entry.compression,
                entry.decompressed_size,
                reason,
            ))
        }
        Compression::Zlib => {
            let inflated = compression::inflate(record, entry.decompressed_size as usize)
                .map_err(|e| Error::Decompression {
                    key,
                    message: e.to_string(),
                })?;
            if inflated.len() != entry.decompressed_size as usize {
                return Err(Error::SizeMismatch {
                    key,
                    expected: entry.decompressed_size,
                    actual: inflated.len(),
                });
            }
            dispatch(&key, &inflated, options)?
        }
        Compression::None => dispatch(&key, record, options)?,
    };

    Ok(ContainerEntry::from_record(
        key,
        resource,
        entry.compression,
        entry.committed,
        Arc::from(record),
    ))
}

fn dispatch(key: &ResourceKey, data: &[u8], options: &ReadOptions) -> Result<Resource> {
    if options.load_all_as_raw {
        return Ok(Resource::Raw(RawResource::new(data, "loaded as raw")));
    }
    Resource::from_bytes(key, data)
}
