//! Schemas: named, hashed column lists describing object rows.

use rustc_hash::FxHashSet;
use sulani_common::{fnv, padding_for, CacheNode, Tracked};

use crate::{DataType, Error, Result};

/// One typed column of a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SimDataSchemaColumn {
    node: CacheNode,
    name: String,
    data_type: DataType,
    flags: u16,
}

impl SimDataSchemaColumn {
    pub fn new(name: impl Into<String>, data_type: DataType, flags: u16) -> Self {
        Self {
            node: CacheNode::new(),
            name: name.into(),
            data_type,
            flags,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.node.invalidate();
    }

    #[inline]
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn set_data_type(&mut self, data_type: DataType) {
        self.data_type = data_type;
        self.node.invalidate();
    }

    #[inline]
    pub fn flags(&self) -> u16 {
        self.flags
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.flags = flags;
        self.node.invalidate();
    }
}

/// Byte layout of one schema row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaLayout {
    /// Row size, padded to `alignment`.
    pub size: usize,
    /// Largest column alignment (at least 1).
    pub alignment: usize,
    /// In-row offset of each column, indexed in declaration order.
    pub offsets: Vec<usize>,
}

/// A named list of typed columns.
///
/// The hash identifies the schema and is never derived from the name.
#[derive(Debug, PartialEq)]
pub struct SimDataSchema {
    node: CacheNode,
    name: String,
    hash: u32,
    columns: Vec<SimDataSchemaColumn>,
}

impl SimDataSchema {
    pub fn new(name: impl Into<String>, hash: u32, columns: Vec<SimDataSchemaColumn>) -> Self {
        let schema = Self {
            node: CacheNode::new(),
            name: name.into(),
            hash,
            columns,
        };
        for column in &schema.columns {
            schema.adopt(column);
        }
        schema
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.node.invalidate();
    }

    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn set_hash(&mut self, hash: u32) {
        self.hash = hash;
        self.node.invalidate();
    }

    #[inline]
    pub fn columns(&self) -> &[SimDataSchemaColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&SimDataSchemaColumn> {
        self.columns.iter().find(|column| column.name == name)
    }

    /// Mutable access to a column. Invalidates the owner chain up front.
    pub fn column_mut(&mut self, index: usize) -> Option<&mut SimDataSchemaColumn> {
        let column = self.columns.get_mut(index)?;
        column.node.set_owner(&self.node);
        self.node.invalidate();
        Some(column)
    }

    pub fn add_column(&mut self, column: SimDataSchemaColumn) {
        self.adopt(&column);
        self.columns.push(column);
        self.node.invalidate();
    }

    pub fn remove_column(&mut self, index: usize) -> Option<SimDataSchemaColumn> {
        if index >= self.columns.len() {
            return None;
        }
        let column = self.columns.remove(index);
        column.node.clear_owner();
        self.node.invalidate();
        Some(column)
    }

    /// Reorder columns by the FNV-32 hash of their names.
    pub fn sort_columns(&mut self) {
        self.columns.sort_by_key(|column| fnv::fnv32(&column.name));
        self.node.invalidate();
    }

    /// Compute the row layout.
    ///
    /// Columns are packed in order of their name hash: each one is padded
    /// to its alignment, placed, and the cursor advanced by its size. The
    /// total is padded to the largest alignment.
    pub fn layout(&self) -> SchemaLayout {
        let mut order: Vec<usize> = (0..self.columns.len()).collect();
        order.sort_by_key(|&index| fnv::fnv32(&self.columns[index].name));

        let mut offsets = vec![0; self.columns.len()];
        let mut size = 0usize;
        let mut alignment = 1usize;
        for index in order {
            let data_type = self.columns[index].data_type;
            size += padding_for(size, data_type.alignment());
            offsets[index] = size;
            size += data_type.size();
            alignment = alignment.max(data_type.alignment());
        }
        size += padding_for(size, alignment);

        SchemaLayout {
            size,
            alignment,
            offsets,
        }
    }

    /// Row size in bytes.
    pub fn size(&self) -> usize {
        self.layout().size
    }

    /// Row alignment in bytes.
    pub fn alignment(&self) -> usize {
        self.layout().alignment
    }

    /// Column names must be non-empty and unique, and no column may be
    /// `Undefined`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |problem: String| Error::InvalidSchema {
            schema: self.name.clone(),
            problem,
        };

        let mut seen = FxHashSet::default();
        for (index, column) in self.columns.iter().enumerate() {
            if column.name.is_empty() {
                return Err(invalid(format!("column {index} has no name")));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(invalid(format!("duplicate column {:?}", column.name)));
            }
            if column.data_type == DataType::Undefined {
                return Err(invalid(format!("column {:?} is Undefined", column.name)));
            }
        }
        Ok(())
    }
}

impl Clone for SimDataSchema {
    fn clone(&self) -> Self {
        Self::new(self.name.clone(), self.hash, self.columns.clone())
    }
}

impl_tracked!(SimDataSchemaColumn, SimDataSchema);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_layout_packs_by_name_hash() {
        // fnv32("a") = 0x050C5D7E, fnv32("b") = 0x050C5D7D
        let schema = SimDataSchema::new(
            "S",
            1,
            vec![
                SimDataSchemaColumn::new("a", DataType::Boolean, 0),
                SimDataSchemaColumn::new("b", DataType::Int64, 0),
            ],
        );
        let layout = schema.layout();
        assert_eq!(layout.offsets, vec![8, 0]);
        assert_eq!(layout.alignment, 8);
        assert_eq!(layout.size, 16);
    }

    #[test]
    fn test_layout_pads_before_placing() {
        let schema = SimDataSchema::new(
            "S",
            1,
            vec![
                SimDataSchemaColumn::new("b", DataType::UInt8, 0),
                SimDataSchemaColumn::new("a", DataType::Float3, 0),
            ],
        );
        let layout = schema.layout();
        assert_eq!(layout.offsets, vec![0, 4]);
        assert_eq!(layout.size, 16);
        assert_eq!(SimDataSchema::new("E", 2, Vec::new()).size(), 0);
    }

    #[test]
    fn test_validate() {
        let mut schema = SimDataSchema::new(
            "S",
            1,
            vec![SimDataSchemaColumn::new("a", DataType::Int32, 0)],
        );
        assert!(schema.validate().is_ok());

        schema.add_column(SimDataSchemaColumn::new("a", DataType::Int32, 0));
        assert!(schema.validate().is_err());

        schema.column_mut(1).unwrap().set_name("");
        assert!(schema.validate().is_err());

        schema.column_mut(1).unwrap().set_name("b");
        schema.column_mut(1).unwrap().set_data_type(DataType::Undefined);
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_column_edit_invalidates_schema_only() {
        let mut schema = SimDataSchema::new(
            "S",
            1,
            vec![SimDataSchemaColumn::new("a", DataType::Int32, 0)],
        );
        let other = schema.clone();
        schema.node().store(Arc::from(&b"s"[..]));
        other.node().store(Arc::from(&b"o"[..]));

        if let Some(column) = schema.columns.first_mut() {
            column.set_flags(1);
        }
        assert!(!schema.node().is_cached());
        assert!(other.node().is_cached());
    }

    #[test]
    fn test_sort_columns() {
        let mut schema = SimDataSchema::new(
            "S",
            1,
            vec![
                SimDataSchemaColumn::new("a", DataType::Int32, 0),
                SimDataSchemaColumn::new("b", DataType::Int32, 0),
            ],
        );
        schema.sort_columns();
        let names: Vec<_> = schema.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, ["b", "a"]);
    }
}
