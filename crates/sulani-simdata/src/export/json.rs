//! JSON export.

use serde_json::{json, Map, Value};

use super::{ordered_cells, schema_label};
use crate::cells::{BigIntKind, Cell, NumberKind, ObjectCell};
use crate::{Error, Result, SimDataResource, SimDataSchema};

impl SimDataResource {
    /// Render the resource as a JSON value.
    pub fn to_json(&self) -> Result<Value> {
        let schemas = self
            .schemas()
            .iter()
            .map(schema_json)
            .collect::<Result<Vec<_>>>()?;

        let instances = self
            .instances()
            .iter()
            .map(|instance| {
                Ok(json!({
                    "name": instance.name(),
                    "schema": schema_label(self.schemas(), instance.schema_hash()),
                    "values": object_json(instance.object(), self.schemas())?,
                }))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(json!({
            "version": format!("{:#x}", self.version()),
            "unused": self.unused(),
            "schemas": schemas,
            "instances": instances,
        }))
    }

    /// Render the resource as pretty-printed JSON text.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.to_json()?).map_err(|e| Error::Export(e.to_string()))
    }
}

fn schema_json(schema: &SimDataSchema) -> Result<Value> {
    let columns = schema
        .columns()
        .iter()
        .map(|column| {
            Ok(json!({
                "name": column.name(),
                "type": to_value(column.data_type())?,
                "flags": column.flags(),
            }))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(json!({
        "name": schema.name(),
        "hash": format!("{:#010x}", schema.hash()),
        "columns": columns,
    }))
}

fn object_json(object: &ObjectCell, schemas: &[SimDataSchema]) -> Result<Value> {
    let mut map = Map::new();
    for (name, cell) in ordered_cells(object, schemas) {
        map.insert(name.to_string(), cell_json(cell, schemas)?);
    }
    Ok(Value::Object(map))
}

fn cell_json(cell: &Cell, schemas: &[SimDataSchema]) -> Result<Value> {
    Ok(match cell {
        Cell::Boolean(cell) => Value::Bool(cell.value()),
        Cell::Text(cell) => Value::String(cell.value().to_string()),
        Cell::Number(cell) => match cell.kind() {
            NumberKind::Float => json!(cell.value()),
            _ => json!(cell.value() as i64),
        },
        Cell::BigInt(cell) => {
            let value = cell.value();
            match cell.kind() {
                BigIntKind::Int64 => i64::try_from(value).map_or_else(|_| json!(value.to_string()), |v| json!(v)),
                BigIntKind::UInt64 | BigIntKind::TableSetReference => {
                    u64::try_from(value).map_or_else(|_| json!(value.to_string()), |v| json!(v))
                }
            }
        }
        Cell::ResourceKey(cell) => to_value(cell.key())?,
        Cell::Float2(cell) => json!(cell.values()),
        Cell::Float3(cell) => json!(cell.values()),
        Cell::Float4(cell) => json!(cell.values()),
        Cell::Object(object) => object_json(object, schemas)?,
        Cell::Vector(vector) => Value::Array(
            vector
                .iter()
                .map(|child| cell_json(child, schemas))
                .collect::<Result<_>>()?,
        ),
        Cell::Variant(variant) => json!({
            "type": format!("{:#010x}", variant.type_hash()),
            "value": match variant.child() {
                Some(child) => cell_json(child, schemas)?,
                None => Value::Null,
            },
        }),
    })
}

fn to_value<T: serde::Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Export(e.to_string()))
}
