//! Vector cells: an ordered run of cells of one type.

use sulani_common::{CacheNode, Tracked};

use super::Cell;
use crate::{DataType, Error, Result};

/// An ordered list of cells that all share one data type.
#[derive(Debug, PartialEq, Default)]
pub struct VectorCell {
    node: CacheNode,
    children: Vec<Cell>,
}

impl VectorCell {
    /// Create a vector owning `children`.
    pub fn new(children: Vec<Cell>) -> Self {
        let vector = Self {
            node: CacheNode::new(),
            children,
        };
        for child in &vector.children {
            vector.adopt(child);
        }
        vector
    }

    #[inline]
    pub fn children(&self) -> &[Cell] {
        &self.children
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Cell> {
        self.children.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Cell> {
        self.children.get(index)
    }

    /// Mutable access to one child. Invalidates the owner chain up front.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Cell> {
        let child = self.children.get_mut(index)?;
        child.node().set_owner(&self.node);
        self.node.invalidate();
        Some(child)
    }

    pub fn push(&mut self, child: Cell) {
        self.adopt(&child);
        self.children.push(child);
        self.node.invalidate();
    }

    /// Insert `child` at `index`, shifting later children.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert(&mut self, index: usize, child: Cell) {
        self.adopt(&child);
        self.children.insert(index, child);
        self.node.invalidate();
    }

    /// Remove the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Cell> {
        if index >= self.children.len() {
            return None;
        }
        let child = self.children.remove(index);
        child.node().clear_owner();
        self.node.invalidate();
        Some(child)
    }

    /// Replace every child, invalidating once.
    pub fn set_children(&mut self, children: Vec<Cell>) -> Vec<Cell> {
        for child in &children {
            self.adopt(child);
        }
        let previous = std::mem::replace(&mut self.children, children);
        for child in &previous {
            child.node().clear_owner();
        }
        self.node.invalidate();
        previous
    }

    pub fn clear(&mut self) {
        self.set_children(Vec::new());
    }

    /// Data type of the first child, `None` when empty.
    pub fn child_type(&self) -> Option<DataType> {
        self.children.first().map(Cell::data_type)
    }

    /// Fails iff two children have different data types.
    pub fn validate(&self) -> Result<()> {
        let Some(expected) = self.child_type() else {
            return Ok(());
        };
        for (index, child) in self.children.iter().enumerate().skip(1) {
            let actual = child.data_type();
            if actual != expected {
                return Err(Error::MixedVector {
                    index,
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

impl Clone for VectorCell {
    fn clone(&self) -> Self {
        Self::new(self.children.clone())
    }
}

impl_tracked!(VectorCell);

impl<'a> IntoIterator for &'a VectorCell {
    type Item = &'a Cell;
    type IntoIter = std::slice::Iter<'a, Cell>;

    fn into_iter(self) -> Self::IntoIter {
        self.children.iter()
    }
}
