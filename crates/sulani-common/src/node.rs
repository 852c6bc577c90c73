//! Ownership-aware serialization caches.
//!
//! Every stateful model (a SimData cell, a schema, a resource, a package
//! entry, the package itself) embeds a [`CacheNode`]. A node memoizes the
//! model's serialized bytes and holds a weak link to the node of whatever
//! owns the model. Parents own their children outright; the weak link exists
//! only so that a child can tell its owner chain that cached bytes are stale.
//!
//! Invalidation is a single upward walk: the node drops its own bytes, then
//! its owner's, and so on to the root. Siblings and children are never
//! touched.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

#[derive(Default)]
struct NodeInner {
    cached: Mutex<Option<Arc<[u8]>>>,
    owner: Mutex<Weak<NodeInner>>,
}

/// Cached bytes plus a non-owning link to the owner's node.
pub struct CacheNode {
    inner: Arc<NodeInner>,
}

impl CacheNode {
    /// Create a detached node with nothing cached.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(NodeInner::default()),
        }
    }

    /// Create a detached node pre-populated with `bytes`.
    pub fn with_cached(bytes: Arc<[u8]>) -> Self {
        let node = Self::new();
        node.store(bytes);
        node
    }

    /// The cached bytes, if still valid.
    #[inline]
    pub fn cached(&self) -> Option<Arc<[u8]>> {
        self.inner.cached.lock().clone()
    }

    /// Whether bytes are cached.
    #[inline]
    pub fn is_cached(&self) -> bool {
        self.inner.cached.lock().is_some()
    }

    /// Memoize freshly serialized bytes.
    #[inline]
    pub fn store(&self, bytes: Arc<[u8]>) {
        *self.inner.cached.lock() = Some(bytes);
    }

    /// Drop the cached bytes of this node and of every owner above it.
    pub fn invalidate(&self) {
        let mut current = Arc::clone(&self.inner);
        loop {
            *current.cached.lock() = None;
            let owner = current.owner.lock().upgrade();
            match owner {
                Some(owner) => current = owner,
                None => break,
            }
        }
    }

    /// Attach this node to `owner`.
    ///
    /// Returns `true` when the owner actually changed (a re-parent or a first
    /// adoption), `false` when `owner` already owned this node.
    pub fn set_owner(&self, owner: &CacheNode) -> bool {
        let mut slot = self.inner.owner.lock();
        if std::ptr::eq(slot.as_ptr(), Arc::as_ptr(&owner.inner)) {
            return false;
        }
        *slot = Arc::downgrade(&owner.inner);
        true
    }

    /// Detach this node from its owner.
    pub fn clear_owner(&self) {
        *self.inner.owner.lock() = Weak::new();
    }

    /// Whether this node currently has a live owner.
    pub fn has_owner(&self) -> bool {
        self.inner.owner.lock().strong_count() > 0
    }

    /// Whether `owner` is this node's owner.
    pub fn is_owned_by(&self, owner: &CacheNode) -> bool {
        std::ptr::eq(self.inner.owner.lock().as_ptr(), Arc::as_ptr(&owner.inner))
    }
}

impl Default for CacheNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CacheNode {
    /// Clones keep the cached bytes but never the owner.
    fn clone(&self) -> Self {
        match self.cached() {
            Some(bytes) => Self::with_cached(bytes),
            None => Self::new(),
        }
    }
}

/// Nodes hold only derived state, so they never make two models unequal.
impl PartialEq for CacheNode {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl fmt::Debug for CacheNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheNode")
            .field("cached", &self.inner.cached.lock().as_ref().map(|b| b.len()))
            .field("owned", &self.has_owner())
            .finish()
    }
}

/// A model that participates in the invalidation protocol.
pub trait Tracked {
    /// The model's cache node.
    fn node(&self) -> &CacheNode;

    /// Drop this model's cached bytes and those of its owner chain.
    fn invalidate(&self) {
        self.node().invalidate();
    }

    /// Make `self` the owner of `child`.
    fn adopt<C: Tracked + ?Sized>(&self, child: &C) -> bool {
        child.node().set_owner(self.node())
    }
}

/// A model that can produce its own serialized buffer.
pub trait Model: Tracked {
    /// Error produced while serializing.
    type Error: From<crate::Error>;

    /// Serialize the model from scratch, ignoring any cache.
    fn serialize(&self) -> Result<Vec<u8>, Self::Error>;

    /// Whether `buffer()` memoizes its result.
    fn caches(&self) -> bool {
        true
    }

    /// The serialized bytes, reusing the cache when it is still valid.
    fn buffer(&self) -> Result<Arc<[u8]>, Self::Error> {
        if let Some(bytes) = self.node().cached() {
            return Ok(bytes);
        }
        let bytes: Arc<[u8]> = self.serialize()?.into();
        if self.caches() {
            self.node().store(Arc::clone(&bytes));
        }
        Ok(bytes)
    }
}
