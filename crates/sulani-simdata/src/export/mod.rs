//! SimData export to human-readable formats.
//!
//! Both exporters walk instances in order and emit each object's cells in
//! its schema's column order.

#[cfg(feature = "json-export")]
mod json;
#[cfg(feature = "xml-export")]
mod xml;

#[cfg(feature = "xml-export")]
pub use xml::XmlExporter;

use crate::cells::{find_schema, Cell, ObjectCell};
use crate::SimDataSchema;

/// `(column, cell)` pairs of `object` in schema order, falling back to the
/// row's own order when the schema is unknown.
pub(crate) fn ordered_cells<'a>(
    object: &'a ObjectCell,
    schemas: &'a [SimDataSchema],
) -> Vec<(&'a str, &'a Cell)> {
    match find_schema(schemas, object.schema_hash()) {
        Some(schema) => schema
            .columns()
            .iter()
            .filter_map(|column| Some((column.name(), object.get(column.name())?)))
            .collect(),
        None => {
            let mut cells: Vec<_> = object.iter().collect();
            cells.sort_by(|a, b| a.0.cmp(b.0));
            cells
        }
    }
}

/// Name of the schema with `hash`, or the hash in hex.
pub(crate) fn schema_label(schemas: &[SimDataSchema], hash: u32) -> String {
    match find_schema(schemas, hash) {
        Some(schema) => schema.name().to_string(),
        None => format!("{hash:#010x}"),
    }
}
