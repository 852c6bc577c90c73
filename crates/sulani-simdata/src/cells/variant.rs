//! Variant cells: an optional value tagged with a type hash.

use sulani_common::{CacheNode, Tracked};

use super::Cell;

/// A type-hash discriminant plus an optional child.
#[derive(Debug, PartialEq)]
pub struct VariantCell {
    node: CacheNode,
    type_hash: u32,
    child: Option<Box<Cell>>,
}

impl VariantCell {
    pub fn new(type_hash: u32, child: Option<Cell>) -> Self {
        let variant = Self {
            node: CacheNode::new(),
            type_hash,
            child: child.map(Box::new),
        };
        if let Some(child) = &variant.child {
            variant.adopt(child.as_ref());
        }
        variant
    }

    #[inline]
    pub fn type_hash(&self) -> u32 {
        self.type_hash
    }

    pub fn set_type_hash(&mut self, type_hash: u32) {
        self.type_hash = type_hash;
        self.node.invalidate();
    }

    pub fn child(&self) -> Option<&Cell> {
        self.child.as_deref()
    }

    /// Mutable access to the child. Invalidates the owner chain up front.
    pub fn child_mut(&mut self) -> Option<&mut Cell> {
        let child = self.child.as_deref_mut()?;
        child.node().set_owner(&self.node);
        self.node.invalidate();
        Some(child)
    }

    /// Replace the child, returning the previous one.
    pub fn set_child(&mut self, child: Option<Cell>) -> Option<Cell> {
        if let Some(child) = &child {
            self.adopt(child);
        }
        let previous = std::mem::replace(&mut self.child, child.map(Box::new));
        self.node.invalidate();
        previous.map(|previous| {
            previous.node().clear_owner();
            *previous
        })
    }

    pub fn take_child(&mut self) -> Option<Cell> {
        self.set_child(None)
    }
}

impl Clone for VariantCell {
    fn clone(&self) -> Self {
        Self::new(self.type_hash, self.child.as_deref().cloned())
    }
}

impl_tracked!(VariantCell);
