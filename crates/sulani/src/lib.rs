//! Sulani - Sims 4 package and SimData library.
//!
//! This crate re-exports the Sulani library crates under one roof.
//!
//! # Crates
//!
//! - [`sulani_common`] - Binary cursors, FNV hashing, resource keys, cache invalidation
//! - [`sulani_simdata`] - SimData binary tables
//! - [`sulani_package`] - DBPF packages and their resources
//!
//! # Example
//!
//! ```no_run
//! use sulani::prelude::*;
//!
//! let package = Container::open("Mod.package", &ReadOptions::default())?;
//! for entry in &package {
//!     if let Some(simdata) = entry.resource().as_simdata() {
//!         for instance in simdata.instances() {
//!             println!("{}: {}", entry.key(), instance.name());
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub use sulani_common as common;
pub use sulani_package as package;
pub use sulani_simdata as simdata;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use sulani_common::{fnv, types, Model, ResourceKey, Tracked};
    pub use sulani_package::{
        Compression, Container, ContainerEntry, ReadOptions, Resource, StringTableResource,
        XmlResource,
    };
    pub use sulani_simdata::{
        Cell, DataType, ObjectCell, SimDataInstance, SimDataResource, SimDataSchema,
        SimDataSchemaColumn,
    };
}

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
