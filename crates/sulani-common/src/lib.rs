//! Common utilities for Sulani.
//!
//! This crate provides foundational types used across all Sulani crates:
//!
//! - [`BinaryReader`] / [`BinaryWriter`] - little-endian byte cursors
//! - [`fnv`] - FNV-1 32/64-bit name hashing
//! - [`ResourceKey`] - type/group/instance resource identifiers
//! - [`CacheNode`], [`Tracked`], [`Model`] - serialized-buffer caching with
//!   owner-chain invalidation

mod error;
mod key;
mod node;
mod reader;
mod writer;

pub mod fnv;

pub use error::{Error, ErrorKind, Result};
pub use key::{types, ResourceKey};
pub use node::{CacheNode, Model, Tracked};
pub use reader::{BinaryReader, NULL_OFFSET};
pub use writer::{fit_int, padding_for, BinaryWriter};

/// Re-export zerocopy traits for convenience
pub use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Re-export memchr for byte searching
pub use memchr;
