//! Package resources.
//!
//! [`Resource`] is a closed set of models. Entries are dispatched by magic
//! first and by type id second; anything unrecognised is kept as a
//! [`RawResource`], and records with an unknown compression become an
//! [`UnsupportedResource`].

mod raw;
mod stbl;
mod xml;

pub use raw::{RawResource, UnsupportedResource};
pub use stbl::{StringEntry, StringTableResource};
pub use xml::{TuningAttributes, XmlResource};

use std::sync::Arc;

use sulani_common::{types, CacheNode, ErrorKind, Model, ResourceKey, Tracked};
use sulani_simdata::SimDataResource;
use tracing::debug;

use crate::{Error, Result};

/// A decoded package resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
    SimData(SimDataResource),
    StringTable(StringTableResource),
    Xml(XmlResource),
    Raw(RawResource),
    Unsupported(UnsupportedResource),
}

impl Resource {
    /// Decode uncompressed entry bytes.
    ///
    /// Bytes that look like a known format but use an unsupported version or
    /// encoding degrade to [`Resource::Raw`]. Corrupt content is an error.
    pub fn from_bytes(key: &ResourceKey, data: &[u8]) -> Result<Self> {
        let decoded = if data.starts_with(sulani_simdata::MAGIC) {
            SimDataResource::from_bytes(data)
                .map(Self::SimData)
                .map_err(Error::from)
        } else if data.starts_with(stbl::MAGIC) {
            StringTableResource::from_bytes(data).map(Self::StringTable)
        } else if types::is_tuning(key.type_id) || xml::looks_like_xml(data) {
            XmlResource::from_bytes(data).map(Self::Xml)
        } else {
            return Ok(Self::Raw(RawResource::new(data, "unrecognized resource type")));
        };

        match decoded {
            Ok(resource) => Ok(resource),
            Err(e) if matches!(e.kind(), ErrorKind::Header | ErrorKind::UnsupportedFormat) => {
                debug!(%key, reason = %e, "keeping resource as raw bytes");
                Ok(Self::Raw(RawResource::new(data, e.to_string())))
            }
            Err(e) => Err(e.in_resource(*key)),
        }
    }

    /// Short name of the variant.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Self::SimData(_) => "SimData",
            Self::StringTable(_) => "StringTable",
            Self::Xml(_) => "Xml",
            Self::Raw(_) => "Raw",
            Self::Unsupported(_) => "Unsupported",
        }
    }

    /// Whether the resource can be edited.
    pub fn is_mutable(&self) -> bool {
        !matches!(self, Self::Raw(_) | Self::Unsupported(_))
    }

    /// Fail with [`Error::ReadOnly`] for raw and unsupported resources.
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.is_mutable() {
            Ok(())
        } else {
            Err(Error::ReadOnly {
                variant: self.variant_name(),
            })
        }
    }

    /// Run the variant's own consistency checks.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::SimData(resource) => Ok(resource.validate()?),
            Self::StringTable(resource) => resource.validate(),
            Self::Xml(resource) => resource.validate(),
            Self::Raw(_) | Self::Unsupported(_) => Ok(()),
        }
    }

    /// Uncompressed size, serializing if needed. Unsupported resources report
    /// the size recorded in the index.
    pub fn decompressed_size(&self) -> Result<u32> {
        match self {
            Self::Unsupported(resource) => Ok(resource.decompressed_size()),
            _ => {
                let len = self.buffer()?.len();
                Ok(sulani_common::fit_int("decompressed size", len as i128)?)
            }
        }
    }

    pub fn as_simdata(&self) -> Option<&SimDataResource> {
        match self {
            Self::SimData(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_simdata_mut(&mut self) -> Option<&mut SimDataResource> {
        match self {
            Self::SimData(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_string_table(&self) -> Option<&StringTableResource> {
        match self {
            Self::StringTable(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_string_table_mut(&mut self) -> Option<&mut StringTableResource> {
        match self {
            Self::StringTable(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_xml(&self) -> Option<&XmlResource> {
        match self {
            Self::Xml(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn as_xml_mut(&mut self) -> Option<&mut XmlResource> {
        match self {
            Self::Xml(resource) => Some(resource),
            _ => None,
        }
    }

    /// Uncompressed bytes for extraction; `None` for unsupported resources.
    pub fn uncompressed_bytes(&self) -> Result<Option<Arc<[u8]>>> {
        match self {
            Self::Unsupported(_) => Ok(None),
            other => other.buffer().map(Some),
        }
    }

    /// File extension used when extracting.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::SimData(_) => "simdata",
            Self::StringTable(_) => "stbl",
            Self::Xml(_) => "xml",
            Self::Raw(_) | Self::Unsupported(_) => "bin",
        }
    }
}

impl From<SimDataResource> for Resource {
    fn from(resource: SimDataResource) -> Self {
        Self::SimData(resource)
    }
}

impl From<StringTableResource> for Resource {
    fn from(resource: StringTableResource) -> Self {
        Self::StringTable(resource)
    }
}

impl From<XmlResource> for Resource {
    fn from(resource: XmlResource) -> Self {
        Self::Xml(resource)
    }
}

impl From<RawResource> for Resource {
    fn from(resource: RawResource) -> Self {
        Self::Raw(resource)
    }
}

impl Tracked for Resource {
    fn node(&self) -> &CacheNode {
        match self {
            Self::SimData(resource) => resource.node(),
            Self::StringTable(resource) => resource.node(),
            Self::Xml(resource) => resource.node(),
            Self::Raw(resource) => resource.node(),
            Self::Unsupported(resource) => resource.node(),
        }
    }
}

impl Model for Resource {
    type Error = Error;

    fn serialize(&self) -> Result<Vec<u8>> {
        match self {
            Self::SimData(resource) => Ok(resource.serialize()?),
            Self::StringTable(resource) => resource.serialize(),
            Self::Xml(resource) => resource.serialize(),
            Self::Raw(resource) => resource.serialize(),
            Self::Unsupported(resource) => resource.serialize(),
        }
    }

    fn caches(&self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }
}
