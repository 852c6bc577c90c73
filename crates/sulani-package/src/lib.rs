//! DBPF package reader and writer for Sims 4 game files.
//!
//! A package is a 96-byte header, a run of stored resource records and an
//! index describing each record's key, position, size and compression.
//!
//! - zlib records (`0x5A42`) are inflated and decoded
//! - other compression types are kept as opaque [`UnsupportedResource`]s
//! - SimData, string tables and XML tuning decode to typed [`Resource`]s
//! - anything else is kept as a [`RawResource`]
//!
//! Reading keeps the original bytes cached on the package and on every entry,
//! so writing an untouched package reproduces it exactly. Editing a resource
//! invalidates only that entry and the package.
//!
//! # Example
//!
//! ```no_run
//! use sulani_common::{types, Model};
//! use sulani_package::{Container, ReadOptions};
//!
//! let mut package = Container::open("Mod.package", &ReadOptions::default())?;
//! let index = package
//!     .iter()
//!     .position(|entry| entry.key().type_id == types::STRING_TABLE);
//! if let Some(entry) = index.and_then(|i| package.get_mut(i)) {
//!     if let Some(table) = entry.resource_mut()?.as_string_table_mut() {
//!         table.add(0x1234_5678, "Hello")?;
//!     }
//! }
//! package.write_to_file("Mod.edited.package")?;
//! # Ok::<(), sulani_package::Error>(())
//! ```

mod compression;
mod container;
mod entry;
mod error;
mod header;
mod index;
mod options;
pub mod resource;

pub use compression::Compression;
pub use container::Container;
pub use entry::ContainerEntry;
pub use error::{Error, Result};
pub use header::DbpfHeader;
pub use index::IndexEntry;
pub use options::ReadOptions;
pub use resource::{
    RawResource, Resource, StringEntry, StringTableResource, TuningAttributes,
    UnsupportedResource, XmlResource,
};
