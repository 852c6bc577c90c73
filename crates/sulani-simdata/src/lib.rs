//! SimData binary table reader and writer.
//!
//! SimData resources (type `0x545AC67A`) hold typed, schema-described data
//! tables: a header, table and schema records, row data, a char table of
//! NUL-terminated strings and a trailing name pool. This crate decodes them
//! into an editable tree of [`Cell`]s and encodes the tree back.
//!
//! # Quick Start
//!
//! ```no_run
//! use sulani_common::Model;
//! use sulani_simdata::{Cell, SimDataResource};
//!
//! # fn demo(bytes: &[u8]) -> sulani_simdata::Result<()> {
//! let mut resource = SimDataResource::from_bytes(bytes)?;
//! for instance in resource.instances() {
//!     println!("{} -> {:#010x}", instance.name(), instance.schema_hash());
//! }
//!
//! if let Some(cell) = resource.instance_mut(0).and_then(|i| i.get_mut("value")) {
//!     *cell = Cell::uint32(7);
//! }
//! let bytes = resource.buffer()?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```
//!
//! # Caching
//!
//! A decoded resource keeps its input bytes. Writing an unmodified resource
//! returns them unchanged; any edit in the tree drops the cache and the next
//! write re-encodes.

/// Implement [`sulani_common::Tracked`] for types with a `node` field.
macro_rules! impl_tracked {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Tracked for $ty {
                #[inline]
                fn node(&self) -> &CacheNode {
                    &self.node
                }
            }
        )*
    };
}

pub mod cells;
mod error;
mod export;
mod read;
mod resource;
mod schema;
mod types;
mod write;

pub use cells::{
    BigIntCell, BigIntKind, BooleanCell, Cell, FloatVectorCell, NumberCell, NumberKind,
    ObjectCell, ResourceKeyCell, Row, TextCell, TextKind, VariantCell, VectorCell,
};
pub use error::{Error, Result};
#[cfg(feature = "xml-export")]
pub use export::XmlExporter;
pub use read::{MAGIC, MAX_DEPTH};
pub use resource::{SimDataInstance, SimDataResource, VERSION_BASE, VERSION_WITH_UNUSED};
pub use schema::{SchemaLayout, SimDataSchema, SimDataSchemaColumn};
pub use types::DataType;
