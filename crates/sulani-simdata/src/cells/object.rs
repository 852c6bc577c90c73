//! Object cells: one row of a schema.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;
use sulani_common::{CacheNode, Tracked};

use super::Cell;
use crate::{Error, Result, SimDataSchema};

/// Column name to cell map.
pub type Row = HashMap<String, Cell, FxBuildHasher>;

/// A row following a schema, referenced by the schema's hash.
///
/// The schema itself is owned by the resource; an object only records which
/// schema it follows. Cells in the row are owned by the object.
#[derive(Debug, PartialEq)]
pub struct ObjectCell {
    node: CacheNode,
    schema_hash: u32,
    row: Row,
}

impl ObjectCell {
    /// Create an empty object following the schema with `schema_hash`.
    pub fn new(schema_hash: u32) -> Self {
        Self {
            node: CacheNode::new(),
            schema_hash,
            row: Row::default(),
        }
    }

    /// Create an object from `(column, cell)` pairs.
    pub fn with_values<S, I>(schema_hash: u32, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (S, Cell)>,
    {
        let mut object = Self::new(schema_hash);
        for (name, cell) in values {
            object.adopt(&cell);
            object.row.insert(name.into(), cell);
        }
        object
    }

    /// Hash of the schema this row follows.
    #[inline]
    pub fn schema_hash(&self) -> u32 {
        self.schema_hash
    }

    pub fn set_schema_hash(&mut self, schema_hash: u32) {
        self.schema_hash = schema_hash;
        self.node.invalidate();
    }

    /// The cell stored for `column`.
    pub fn get(&self, column: &str) -> Option<&Cell> {
        self.row.get(column)
    }

    /// Mutable access to the cell stored for `column`.
    ///
    /// The returned cell may be edited in place or replaced outright, so the
    /// object's owner chain is invalidated up front.
    pub fn get_mut(&mut self, column: &str) -> Option<&mut Cell> {
        let cell = self.row.get_mut(column)?;
        cell.node().set_owner(&self.node);
        self.node.invalidate();
        Some(cell)
    }

    /// Store `cell` under `column`, returning the previous cell.
    pub fn set(&mut self, column: impl Into<String>, cell: Cell) -> Option<Cell> {
        self.adopt(&cell);
        let previous = self.row.insert(column.into(), cell);
        if let Some(previous) = &previous {
            previous.node().clear_owner();
        }
        self.node.invalidate();
        previous
    }

    /// Remove the cell stored for `column`.
    pub fn remove(&mut self, column: &str) -> Option<Cell> {
        let previous = self.row.remove(column)?;
        previous.node().clear_owner();
        self.node.invalidate();
        Some(previous)
    }

    /// Number of stored cells.
    #[inline]
    pub fn len(&self) -> usize {
        self.row.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.row.is_empty()
    }

    /// Names of the stored columns, in no particular order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.row.keys().map(String::as_str)
    }

    /// Stored `(column, cell)` pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.row.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Check the row against `schema`.
    ///
    /// Fails when the row does not hold exactly one cell per column or when a
    /// cell's type differs from its column's declared type. Nested cells are
    /// not visited.
    pub fn validate(&self, schema: &SimDataSchema) -> Result<()> {
        if self.row.len() != schema.columns().len() {
            return Err(Error::RowMismatch {
                schema: schema.name().to_string(),
                problem: format!(
                    "has {} cells for {} columns",
                    self.row.len(),
                    schema.columns().len()
                ),
            });
        }
        for column in schema.columns() {
            let cell = self.row.get(column.name()).ok_or_else(|| Error::RowMismatch {
                schema: schema.name().to_string(),
                problem: format!("is missing column {:?}", column.name()),
            })?;
            if cell.data_type() != column.data_type() {
                return Err(Error::ColumnTypeMismatch {
                    column: column.name().to_string(),
                    expected: column.data_type(),
                    actual: cell.data_type(),
                });
            }
        }
        Ok(())
    }

    /// The stored row.
    pub(crate) fn row(&self) -> &Row {
        &self.row
    }
}

impl Clone for ObjectCell {
    fn clone(&self) -> Self {
        Self::with_values(
            self.schema_hash,
            self.row.iter().map(|(k, v)| (k.clone(), v.clone())),
        )
    }
}

impl_tracked!(ObjectCell);
