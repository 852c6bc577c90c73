//! SimData binary encoder.
//!
//! Encoding runs in three passes over the resource:
//!
//! 1. **Bucketing** walks every instance depth-first. Each instance gets its
//!    own named table; nested objects go to one shared table per schema
//!    hash; every other pointed-at value goes to one shared table per data
//!    type; string values are appended to the char table in first-occurrence
//!    order. A vector reserves a contiguous run for all of its elements
//!    before any element's own children are visited.
//! 2. **Layout** assigns an absolute position to every table, the char
//!    table, the schema and column records and the name region.
//! 3. **Emission** writes the header, table records, rows, strings, schemas,
//!    columns and names, resolving every pointer to a relative offset.

use rustc_hash::FxHashMap;
use sulani_common::{fit_int, fnv, padding_for, BinaryWriter, NULL_OFFSET};
use tracing::debug;

use crate::cells::{BigIntKind, Cell, NumberKind, ObjectCell, TextCell, TextKind, VectorCell};
use crate::read::MAGIC;
use crate::resource::VERSION_WITH_UNUSED;
use crate::schema::SchemaLayout;
use crate::{DataType, Error, Result, SimDataResource};

/// Size of the header without the trailing `unused` word.
pub(crate) const HEADER_SIZE: usize = 24;
pub(crate) const TABLE_RECORD_SIZE: usize = 28;
pub(crate) const SCHEMA_RECORD_SIZE: usize = 24;
pub(crate) const COLUMN_RECORD_SIZE: usize = 20;

/// Name hash written for unnamed tables.
const NULL_NAME_HASH: u32 = 0x7FFF_FFFF;

/// Minimum alignment of object tables.
const OBJECT_TABLE_ALIGNMENT: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableId {
    Object(usize),
    Primitive(usize),
}

enum Rows<'a> {
    Objects {
        schema: usize,
        rows: Vec<&'a ObjectCell>,
    },
    Cells(Vec<&'a Cell>),
}

impl Rows<'_> {
    fn len(&self) -> usize {
        match self {
            Self::Objects { rows, .. } => rows.len(),
            Self::Cells(rows) => rows.len(),
        }
    }

    fn schema(&self) -> Option<usize> {
        match self {
            Self::Objects { schema, .. } => Some(*schema),
            Self::Cells(_) => None,
        }
    }
}

struct Table<'a> {
    name: Option<&'a str>,
    data_type: DataType,
    row_size: usize,
    alignment: usize,
    rows: Rows<'a>,
    position: usize,
}

impl Table<'_> {
    fn size(&self) -> usize {
        self.row_size * self.rows.len()
    }
}

/// Identity of a cell for slot and string lookups.
fn cell_key(cell: &Cell) -> *const () {
    match cell {
        Cell::Object(object) => object as *const ObjectCell as *const (),
        other => other as *const Cell as *const (),
    }
}

fn text_key(text: &TextCell) -> *const () {
    text as *const TextCell as *const ()
}

struct Encoder<'a> {
    resource: &'a SimDataResource,
    layouts: Vec<SchemaLayout>,
    schema_by_hash: FxHashMap<u32, usize>,

    instance_tables: Vec<Table<'a>>,
    object_tables: Vec<Table<'a>>,
    primitive_tables: Vec<Table<'a>>,
    object_table_by_schema: FxHashMap<usize, usize>,
    primitive_table_by_type: FxHashMap<DataType, usize>,
    slots: FxHashMap<*const (), (TableId, usize)>,

    strings: Vec<&'a str>,
    string_offsets: FxHashMap<*const (), usize>,
    chars_len: usize,

    /// First nested object schema seen per `(schema, column)`.
    column_schemas: FxHashMap<(usize, usize), u32>,

    chars_position: usize,
    schema_position: usize,
    column_position: usize,
    names_position: usize,
    names: Vec<&'a str>,
    name_offsets: FxHashMap<&'a str, usize>,
}

/// Encode a resource to bytes.
pub(crate) fn encode(resource: &SimDataResource) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(resource);
    encoder.bucket()?;
    let total = encoder.assign_positions();
    let data = encoder.emit(total)?;

    debug!(
        tables = encoder.table_count(),
        schemas = resource.schemas().len(),
        instances = resource.instances().len(),
        strings = encoder.strings.len(),
        bytes = data.len(),
        "encoded SimData"
    );
    Ok(data)
}

impl<'a> Encoder<'a> {
    fn new(resource: &'a SimDataResource) -> Self {
        let layouts = resource.schemas().iter().map(|s| s.layout()).collect();
        let mut schema_by_hash = FxHashMap::default();
        for (index, schema) in resource.schemas().iter().enumerate() {
            schema_by_hash.entry(schema.hash()).or_insert(index);
        }

        Self {
            resource,
            layouts,
            schema_by_hash,
            instance_tables: Vec::new(),
            object_tables: Vec::new(),
            primitive_tables: Vec::new(),
            object_table_by_schema: FxHashMap::default(),
            primitive_table_by_type: FxHashMap::default(),
            slots: FxHashMap::default(),
            strings: Vec::new(),
            string_offsets: FxHashMap::default(),
            chars_len: 0,
            column_schemas: FxHashMap::default(),
            chars_position: 0,
            schema_position: 0,
            column_position: 0,
            names_position: 0,
            names: Vec::new(),
            name_offsets: FxHashMap::default(),
        }
    }

    fn has_chars(&self) -> bool {
        !self.strings.is_empty()
    }

    fn table_count(&self) -> usize {
        self.instance_tables.len()
            + self.object_tables.len()
            + self.primitive_tables.len()
            + usize::from(self.has_chars())
    }

    fn schema_for(&self, hash: u32, context: impl FnOnce() -> String) -> Result<usize> {
        self.schema_by_hash
            .get(&hash)
            .copied()
            .ok_or_else(|| Error::UnknownSchema {
                hash,
                context: context(),
            })
    }

    fn table(&self, id: TableId) -> &Table<'a> {
        match id {
            TableId::Object(i) => &self.object_tables[i],
            TableId::Primitive(i) => &self.primitive_tables[i],
        }
    }

    // Pass 1

    fn bucket(&mut self) -> Result<()> {
        let resource = self.resource;
        let mut instance_schemas = Vec::with_capacity(resource.instances().len());
        for instance in resource.instances() {
            let schema = self.schema_for(instance.schema_hash(), || {
                format!("instance {:?}", instance.name())
            })?;
            let layout = &self.layouts[schema];
            self.instance_tables.push(Table {
                name: Some(instance.name()),
                data_type: DataType::Object,
                row_size: layout.size,
                alignment: layout.alignment.max(OBJECT_TABLE_ALIGNMENT),
                rows: Rows::Objects {
                    schema,
                    rows: vec![instance.object()],
                },
                position: 0,
            });
            instance_schemas.push(schema);
        }

        for (instance, schema) in resource.instances().iter().zip(instance_schemas) {
            self.visit_row(instance.object(), schema)?;
        }
        Ok(())
    }

    fn visit_row(&mut self, object: &'a ObjectCell, schema: usize) -> Result<()> {
        let resource = self.resource;
        let definition = &resource.schemas()[schema];
        object.validate(definition)?;

        for (index, column) in definition.columns().iter().enumerate() {
            let Some(cell) = object.get(column.name()) else {
                continue;
            };
            if let Cell::Object(child) = cell {
                self.column_schemas
                    .entry((schema, index))
                    .or_insert(child.schema_hash());
                self.place(cell)?;
            }
            self.visit(cell)?;
        }
        Ok(())
    }

    /// Handle whatever a stored cell points at.
    fn visit(&mut self, cell: &'a Cell) -> Result<()> {
        match cell {
            Cell::Text(text) if text.kind() != TextKind::Character => self.intern(text),
            Cell::Object(object) => {
                let schema = self.schema_for(object.schema_hash(), || "nested object".into())?;
                self.visit_row(object, schema)
            }
            Cell::Vector(vector) => {
                check_vector(vector)?;
                for child in vector {
                    self.place(child)?;
                }
                for child in vector {
                    self.visit(child)?;
                }
                Ok(())
            }
            Cell::Variant(variant) => match variant.child() {
                Some(child) => {
                    self.place(child)?;
                    self.visit(child)
                }
                None => Ok(()),
            },
            _ => Ok(()),
        }
    }

    /// Append a cell as a row of its table.
    fn place(&mut self, cell: &'a Cell) -> Result<()> {
        let slot = match cell {
            Cell::Object(object) => {
                let schema = self.schema_for(object.schema_hash(), || "nested object".into())?;
                let existing = self.object_table_by_schema.get(&schema).copied();
                let index = match existing {
                    Some(index) => index,
                    None => {
                        let layout = &self.layouts[schema];
                        self.object_tables.push(Table {
                            name: None,
                            data_type: DataType::Object,
                            row_size: layout.size,
                            alignment: layout.alignment.max(OBJECT_TABLE_ALIGNMENT),
                            rows: Rows::Objects {
                                schema,
                                rows: Vec::new(),
                            },
                            position: 0,
                        });
                        self.object_table_by_schema
                            .insert(schema, self.object_tables.len() - 1);
                        self.object_tables.len() - 1
                    }
                };
                let table = &mut self.object_tables[index];
                if let Rows::Objects { rows, .. } = &mut table.rows {
                    rows.push(object);
                }
                (TableId::Object(index), table.rows.len() - 1)
            }
            other => {
                let data_type = other.data_type();
                let index = *self
                    .primitive_table_by_type
                    .entry(data_type)
                    .or_insert_with(|| {
                        self.primitive_tables.push(Table {
                            name: None,
                            data_type,
                            row_size: data_type.size(),
                            alignment: data_type.alignment(),
                            rows: Rows::Cells(Vec::new()),
                            position: 0,
                        });
                        self.primitive_tables.len() - 1
                    });
                let table = &mut self.primitive_tables[index];
                if let Rows::Cells(rows) = &mut table.rows {
                    rows.push(other);
                }
                (TableId::Primitive(index), table.rows.len() - 1)
            }
        };
        self.slots.insert(cell_key(cell), slot);
        Ok(())
    }

    fn intern(&mut self, text: &'a TextCell) -> Result<()> {
        let value = text.value();
        if value.contains('\0') {
            return Err(Error::InvalidValue {
                data_type: text.kind().data_type(),
                value: format!("{value:?}"),
            });
        }
        self.string_offsets.insert(text_key(text), self.chars_len);
        self.strings.push(value);
        self.chars_len += value.len() + 1;
        Ok(())
    }

    // Pass 2

    fn assign_positions(&mut self) -> usize {
        let resource = self.resource;
        let header_size = if resource.version() >= VERSION_WITH_UNUSED {
            HEADER_SIZE + 4
        } else {
            HEADER_SIZE
        };

        let mut position = header_size + self.table_count() * TABLE_RECORD_SIZE;
        position += padding_for(position, OBJECT_TABLE_ALIGNMENT);

        for table in self
            .instance_tables
            .iter_mut()
            .chain(self.object_tables.iter_mut())
            .chain(self.primitive_tables.iter_mut())
        {
            position += padding_for(position, table.alignment);
            table.position = position;
            position += table.size();
            // Rows of column-less schemas take no space, but the table still
            // needs a start of its own for pointers to resolve to it.
            if table.size() == 0 {
                position += table.alignment;
            }
        }

        self.chars_position = position;
        position += self.chars_len;

        position += padding_for(position, 4);
        self.schema_position = position;
        position += resource.schemas().len() * SCHEMA_RECORD_SIZE;

        self.column_position = position;
        let column_count: usize = resource.schemas().iter().map(|s| s.columns().len()).sum();
        position += column_count * COLUMN_RECORD_SIZE;

        self.names_position = position;
        let names = self
            .instance_tables
            .iter()
            .filter_map(|table| table.name)
            .chain(resource.schemas().iter().flat_map(|schema| {
                std::iter::once(schema.name())
                    .chain(schema.columns().iter().map(|column| column.name()))
            }));
        let mut names_len = 0;
        for name in names {
            if !self.name_offsets.contains_key(name) {
                self.name_offsets.insert(name, names_len);
                self.names.push(name);
                names_len += name.len() + 1;
            }
        }

        position + names_len
    }

    fn name_position(&self, name: &str) -> Option<usize> {
        self.name_offsets
            .get(name)
            .map(|offset| self.names_position + offset)
    }

    fn slot_position(&self, cell: &Cell, writer: &BinaryWriter) -> Result<usize> {
        let (table, row) = self
            .slots
            .get(&cell_key(cell))
            .copied()
            .ok_or(Error::DanglingPointer {
                position: writer.position(),
                target: 0,
            })?;
        let table = self.table(table);
        Ok(table.position + row * table.row_size)
    }

    fn string_position(&self, text: &TextCell, writer: &BinaryWriter) -> Result<usize> {
        let offset = self
            .string_offsets
            .get(&text_key(text))
            .copied()
            .ok_or(Error::DanglingPointer {
                position: writer.position(),
                target: 0,
            })?;
        Ok(self.chars_position + offset)
    }

    // Pass 3

    fn emit(&self, total: usize) -> Result<Vec<u8>> {
        let resource = self.resource;
        let mut w = BinaryWriter::with_capacity(total);

        w.write_bytes(MAGIC)?;
        w.write_u32(resource.version())?;
        let table_records = HEADER_SIZE
            + if resource.version() >= VERSION_WITH_UNUSED {
                4
            } else {
                0
            };
        w.write_relative_offset(Some(table_records))?;
        w.write_i32(fit_int("table count", self.table_count() as i128)?)?;
        w.write_relative_offset(Some(self.schema_position))?;
        w.write_i32(fit_int("schema count", resource.schemas().len() as i128)?)?;
        if resource.version() >= VERSION_WITH_UNUSED {
            w.write_u32(resource.unused())?;
        }

        let tables = || {
            self.instance_tables
                .iter()
                .chain(&self.object_tables)
                .chain(&self.primitive_tables)
        };

        for table in tables() {
            match table.name {
                Some(name) => {
                    w.write_relative_offset(self.name_position(name))?;
                    w.write_u32(fnv::fnv32(name))?;
                }
                None => {
                    w.write_i32(NULL_OFFSET)?;
                    w.write_u32(NULL_NAME_HASH)?;
                }
            }
            w.write_relative_offset(table.rows.schema().map(|s| self.schema_record(s)))?;
            w.write_u32(table.data_type as u32)?;
            w.write_u32(fit_int("row size", table.row_size as i128)?)?;
            w.write_relative_offset(Some(table.position))?;
            w.write_u32(fit_int("row count", table.rows.len() as i128)?)?;
        }
        if self.has_chars() {
            w.write_i32(NULL_OFFSET)?;
            w.write_u32(NULL_NAME_HASH)?;
            w.write_i32(NULL_OFFSET)?;
            w.write_u32(DataType::Character as u32)?;
            w.write_u32(1)?;
            w.write_relative_offset(Some(self.chars_position))?;
            w.write_u32(fit_int("char table size", self.chars_len as i128)?)?;
        }

        for table in tables() {
            for row in 0..table.rows.len() {
                let start = table.position + row * table.row_size;
                w.seek(start)?;
                match &table.rows {
                    Rows::Objects { schema, rows } => {
                        self.write_object(&mut w, rows[row], *schema, start)?;
                    }
                    Rows::Cells(cells) => self.write_value(&mut w, cells[row])?,
                }
            }
        }

        w.seek(self.chars_position)?;
        for value in &self.strings {
            w.write_cstring(value)?;
        }

        w.seek(self.schema_position)?;
        let mut first_column = 0;
        for schema_index in 0..resource.schemas().len() {
            let schema = &resource.schemas()[schema_index];
            let layout = &self.layouts[schema_index];
            w.write_relative_offset(self.name_position(schema.name()))?;
            w.write_u32(fnv::fnv32(schema.name()))?;
            w.write_u32(schema.hash())?;
            w.write_u32(fit_int("schema size", layout.size as i128)?)?;
            let columns = (!schema.columns().is_empty())
                .then(|| self.column_position + first_column * COLUMN_RECORD_SIZE);
            w.write_relative_offset(columns)?;
            w.write_u32(fit_int("column count", schema.columns().len() as i128)?)?;
            first_column += schema.columns().len();
        }

        w.seek(self.column_position)?;
        for (schema_index, schema) in resource.schemas().iter().enumerate() {
            let layout = &self.layouts[schema_index];
            for (index, column) in schema.columns().iter().enumerate() {
                w.write_relative_offset(self.name_position(column.name()))?;
                w.write_u32(fnv::fnv32(column.name()))?;
                w.write_u16(column.data_type() as u16)?;
                w.write_u16(column.flags())?;
                w.write_u32(fit_int("column offset", layout.offsets[index] as i128)?)?;
                let nested = self
                    .column_schemas
                    .get(&(schema_index, index))
                    .and_then(|hash| self.schema_by_hash.get(hash))
                    .map(|&schema| self.schema_record(schema));
                w.write_relative_offset(nested)?;
            }
        }

        w.seek(self.names_position)?;
        for name in &self.names {
            w.write_cstring(name)?;
        }

        Ok(w.into_inner())
    }

    fn schema_record(&self, schema: usize) -> usize {
        self.schema_position + schema * SCHEMA_RECORD_SIZE
    }

    fn write_object(
        &self,
        w: &mut BinaryWriter,
        object: &ObjectCell,
        schema: usize,
        start: usize,
    ) -> Result<()> {
        let definition = &self.resource.schemas()[schema];
        let layout = &self.layouts[schema];
        for (index, column) in definition.columns().iter().enumerate() {
            let Some(cell) = object.get(column.name()) else {
                continue;
            };
            w.seek(start + layout.offsets[index])?;
            self.write_value(w, cell)?;
        }
        w.seek(start + layout.size)?;
        Ok(())
    }

    /// Write the inline form of `cell` at the cursor.
    fn write_value(&self, w: &mut BinaryWriter, cell: &Cell) -> Result<()> {
        match cell {
            Cell::Boolean(cell) => w.write_u8(u8::from(cell.value()))?,
            Cell::Text(text) => match text.kind() {
                TextKind::Character => {
                    text.validate()?;
                    let byte = text.value().chars().next().map_or(0, |c| c as u32 as u8);
                    w.write_u8(byte)?;
                }
                TextKind::String => {
                    let target = self.string_position(text, w)?;
                    w.write_relative_offset(Some(target))?;
                }
                TextKind::HashedString => {
                    let target = self.string_position(text, w)?;
                    w.write_relative_offset(Some(target))?;
                    w.write_u32(fnv::fnv32(text.value()))?;
                }
            },
            Cell::Number(number) => {
                number.validate()?;
                let value = number.value();
                match number.kind() {
                    NumberKind::Int8 => w.write_i8(value as i8)?,
                    NumberKind::UInt8 => w.write_u8(value as u8)?,
                    NumberKind::Int16 => w.write_i16(value as i16)?,
                    NumberKind::UInt16 => w.write_u16(value as u16)?,
                    NumberKind::Int32 => w.write_i32(value as i32)?,
                    NumberKind::UInt32 | NumberKind::LocalizationKey => w.write_u32(value as u32)?,
                    NumberKind::Float => w.write_f32(value as f32)?,
                }
            }
            Cell::BigInt(number) => match number.kind() {
                BigIntKind::Int64 => w.write_i64(fit_int("int64", number.value())?)?,
                BigIntKind::UInt64 | BigIntKind::TableSetReference => {
                    w.write_u64(fit_int("uint64", number.value())?)?
                }
            },
            Cell::ResourceKey(key) => {
                let key = key.key();
                w.write_u64(key.instance)?;
                w.write_u32(key.type_id)?;
                w.write_u32(key.group)?;
            }
            Cell::Float2(cell) => cell.values().iter().try_for_each(|v| w.write_f32(*v))?,
            Cell::Float3(cell) => cell.values().iter().try_for_each(|v| w.write_f32(*v))?,
            Cell::Float4(cell) => cell.values().iter().try_for_each(|v| w.write_f32(*v))?,
            Cell::Object(_) => {
                let target = self.slot_position(cell, w)?;
                w.write_relative_offset(Some(target))?;
            }
            Cell::Vector(vector) => match vector.get(0) {
                Some(first) => {
                    let target = self.slot_position(first, w)?;
                    w.write_relative_offset(Some(target))?;
                    w.write_u32(fit_int("vector length", vector.len() as i128)?)?;
                }
                None => {
                    w.write_i32(NULL_OFFSET)?;
                    w.write_u32(0)?;
                }
            },
            Cell::Variant(variant) => {
                match variant.child() {
                    Some(child) => {
                        let target = self.slot_position(child, w)?;
                        w.write_relative_offset(Some(target))?;
                    }
                    None => w.write_i32(NULL_OFFSET)?,
                }
                w.write_u32(variant.type_hash())?;
            }
        }
        Ok(())
    }
}

/// Vector children must share a type, and object children a schema.
fn check_vector(vector: &VectorCell) -> Result<()> {
    vector.validate()?;
    let mut hashes = vector.iter().filter_map(Cell::as_object).map(ObjectCell::schema_hash);
    if let Some(expected) = hashes.next() {
        if let Some((index, actual)) = hashes
            .enumerate()
            .find(|(_, actual)| *actual != expected)
        {
            return Err(Error::MixedVectorSchemas {
                index: index + 1,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SimDataInstance, SimDataSchema, SimDataSchemaColumn};
    use sulani_common::{BinaryReader, Model, ResourceKey};

    const POINT: u32 = 0x0000_0010;
    const THING: u32 = 0x0000_0020;

    fn schemas() -> Vec<SimDataSchema> {
        vec![
            SimDataSchema::new(
                "Point",
                POINT,
                vec![
                    SimDataSchemaColumn::new("x", DataType::Float, 0),
                    SimDataSchemaColumn::new("y", DataType::Float, 0),
                ],
            ),
            SimDataSchema::new(
                "Thing",
                THING,
                vec![
                    SimDataSchemaColumn::new("flag", DataType::Boolean, 0),
                    SimDataSchemaColumn::new("letter", DataType::Character, 0),
                    SimDataSchemaColumn::new("small", DataType::Int8, 0),
                    SimDataSchemaColumn::new("count", DataType::UInt32, 0),
                    SimDataSchemaColumn::new("big", DataType::Int64, 0),
                    SimDataSchemaColumn::new("set", DataType::TableSetReference, 0),
                    SimDataSchemaColumn::new("text", DataType::String, 0),
                    SimDataSchemaColumn::new("tag", DataType::HashedString, 0),
                    SimDataSchemaColumn::new("loc", DataType::LocalizationKey, 0),
                    SimDataSchemaColumn::new("key", DataType::ResourceKey, 0),
                    SimDataSchemaColumn::new("uv", DataType::Float2, 0),
                    SimDataSchemaColumn::new("color", DataType::Float4, 0),
                    SimDataSchemaColumn::new("origin", DataType::Object, 0),
                    SimDataSchemaColumn::new("path", DataType::Vector, 0),
                    SimDataSchemaColumn::new("names", DataType::Vector, 0),
                    SimDataSchemaColumn::new("empty", DataType::Vector, 0),
                    SimDataSchemaColumn::new("choice", DataType::Variant, 0),
                    SimDataSchemaColumn::new("nothing", DataType::Variant, 0),
                    SimDataSchemaColumn::new("anchor", DataType::Variant, 0),
                    SimDataSchemaColumn::new("grid", DataType::Vector, 0),
                    SimDataSchemaColumn::new("options", DataType::Vector, 0),
                ],
            ),
        ]
    }

    fn point(x: f32, y: f32) -> Cell {
        Cell::object(ObjectCell::with_values(
            POINT,
            [("x", Cell::float(x)), ("y", Cell::float(y))],
        ))
    }

    fn thing() -> ObjectCell {
        ObjectCell::with_values(
            THING,
            [
                ("flag", Cell::boolean(true)),
                ("letter", Cell::character('q')),
                ("small", Cell::int8(-5)),
                ("count", Cell::uint32(u32::MAX)),
                ("big", Cell::int64(-1 << 40)),
                ("set", Cell::table_set_reference(0xDEAD_BEEF_0000_0001)),
                ("text", Cell::string("hello")),
                ("tag", Cell::hashed_string("Tag_Value")),
                ("loc", Cell::localization_key(0x1234_5678)),
                (
                    "key",
                    Cell::resource_key(ResourceKey::new(0x545A_C67A, 7, 0x0102_0304_0506_0708)),
                ),
                ("uv", Cell::float2([0.5, 0.25])),
                ("color", Cell::float4([1.0, 0.5, 0.0, 1.0])),
                ("origin", point(1.0, 2.0)),
                ("path", Cell::vector(vec![point(3.0, 4.0), point(5.0, 6.0)])),
                (
                    "names",
                    Cell::vector(vec![Cell::string("a"), Cell::string(""), Cell::string("a")]),
                ),
                ("empty", Cell::vector(Vec::new())),
                ("choice", Cell::variant(0xCAFE, Some(Cell::uint32(9)))),
                ("nothing", Cell::variant(0xBEEF, None)),
                ("anchor", Cell::variant(0xF00D, Some(point(7.0, 8.0)))),
                (
                    "grid",
                    Cell::vector(vec![
                        Cell::vector(vec![Cell::uint32(1), Cell::uint32(2)]),
                        Cell::vector(Vec::new()),
                        Cell::vector(vec![Cell::uint32(3)]),
                    ]),
                ),
                (
                    "options",
                    Cell::vector(vec![
                        Cell::variant(0x0A, Some(Cell::uint32(10))),
                        Cell::variant(0x0B, None),
                        Cell::variant(0x0C, Some(Cell::uint32(12))),
                    ]),
                ),
            ],
        )
    }

    fn sample(version: u32) -> SimDataResource {
        SimDataResource::from_parts(
            version,
            if version == VERSION_WITH_UNUSED { 3 } else { 0 },
            schemas(),
            vec![
                SimDataInstance::new("first", thing()),
                SimDataInstance::new("second", thing()),
            ],
        )
    }

    #[test]
    fn test_roundtrip() {
        for version in [0x100, 0x101] {
            let resource = sample(version);
            let bytes = resource.serialize().unwrap();
            let decoded = SimDataResource::from_bytes(&bytes).unwrap();
            assert_eq!(decoded, resource);
            assert_eq!(decoded.unused(), resource.unused());
        }
    }

    #[test]
    fn test_reencode_is_stable() {
        let bytes = sample(0x101).serialize().unwrap();
        let decoded = SimDataResource::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.serialize().unwrap(), bytes);
    }

    #[test]
    fn test_header_layout() {
        let bytes = sample(0x101).serialize().unwrap();
        let mut reader = BinaryReader::new(&bytes);
        reader.expect_magic(b"DATA").unwrap();
        assert_eq!(reader.read_u32().unwrap(), 0x101);
        assert_eq!(reader.read_relative_offset().unwrap(), Some(28));
        // 2 instances, 1 shared Point table, UInt32, String, Vector and
        // Variant tables, char table
        assert_eq!(reader.read_i32().unwrap(), 8);
        reader.read_relative_offset().unwrap();
        assert_eq!(reader.read_i32().unwrap(), 2);
        assert_eq!(reader.read_u32().unwrap(), 3);
    }

    #[test]
    fn test_empty_vector_and_null_variant() {
        let bytes = sample(0x101).serialize().unwrap();
        let decoded = SimDataResource::from_bytes(&bytes).unwrap();
        let first = decoded.instance("first").unwrap();

        assert!(first.get("empty").unwrap().as_vector().unwrap().is_empty());
        let nothing = first.get("nothing").unwrap().as_variant().unwrap();
        assert!(nothing.child().is_none());
        assert_eq!(nothing.type_hash(), 0xBEEF);
    }

    #[test]
    fn test_nested_pointers_roundtrip() {
        let bytes = sample(0x101).serialize().unwrap();
        let decoded = SimDataResource::from_bytes(&bytes).unwrap();
        let first = decoded.instance("first").unwrap();

        let anchor = first.get("anchor").unwrap().as_variant().unwrap();
        let child = anchor.child().unwrap().as_object().unwrap();
        assert_eq!(child.schema_hash(), POINT);
        assert_eq!(child.get("y").unwrap().as_number(), Some(8.0));

        let grid = first.get("grid").unwrap().as_vector().unwrap();
        let lengths: Vec<usize> = grid
            .iter()
            .map(|row| row.as_vector().unwrap().len())
            .collect();
        assert_eq!(lengths, [2, 0, 1]);

        let options = first.get("options").unwrap().as_vector().unwrap();
        let children: Vec<Option<f64>> = options
            .iter()
            .map(|option| option.as_variant().unwrap().child().and_then(Cell::as_number))
            .collect();
        assert_eq!(children, [Some(10.0), None, Some(12.0)]);
    }

    #[test]
    fn test_column_less_schema_roundtrip() {
        const EMPTY: u32 = 0x0000_0030;
        const TOP: u32 = 0x0000_0040;
        let resource = SimDataResource::from_parts(
            0x101,
            0,
            vec![
                SimDataSchema::new("Empty", EMPTY, Vec::new()),
                SimDataSchema::new(
                    "Top",
                    TOP,
                    vec![
                        SimDataSchemaColumn::new("nested", DataType::Object, 0),
                        SimDataSchemaColumn::new("values", DataType::Vector, 0),
                    ],
                ),
            ],
            vec![SimDataInstance::new(
                "top",
                ObjectCell::with_values(
                    TOP,
                    [
                        ("nested", Cell::object(ObjectCell::new(EMPTY))),
                        (
                            "values",
                            Cell::vector(vec![Cell::uint32(7), Cell::uint32(8)]),
                        ),
                    ],
                ),
            )],
        );
        assert!(resource.validate().is_ok());

        let mut encoder = Encoder::new(&resource);
        encoder.bucket().unwrap();
        encoder.assign_positions();
        let starts: Vec<usize> = encoder
            .instance_tables
            .iter()
            .chain(&encoder.object_tables)
            .chain(&encoder.primitive_tables)
            .map(|table| table.position)
            .collect();
        let mut unique = starts.clone();
        unique.dedup();
        assert_eq!(unique, starts);

        let bytes = resource.serialize().unwrap();
        let decoded = SimDataResource::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, resource);
        let values = decoded.instances()[0].get("values").unwrap().as_vector().unwrap();
        assert_eq!(values.get(1).and_then(Cell::as_number), Some(8.0));
    }

    #[test]
    fn test_strings_are_not_deduplicated() {
        let resource = sample(0x100);
        let mut encoder = Encoder::new(&resource);
        encoder.bucket().unwrap();
        assert_eq!(
            encoder.strings,
            ["hello", "Tag_Value", "a", "", "a", "hello", "Tag_Value", "a", "", "a"]
        );
    }

    #[test]
    fn test_vector_elements_are_contiguous() {
        let resource = sample(0x100);
        let mut encoder = Encoder::new(&resource);
        encoder.bucket().unwrap();
        // origin, path[0], path[1], then the anchor for each instance
        let Rows::Objects { rows: points, .. } = &encoder.object_tables[0].rows else {
            panic!("expected object rows");
        };
        let xs: Vec<f64> = points
            .iter()
            .map(|p| p.get("x").unwrap().as_number().unwrap())
            .collect();
        assert_eq!(xs, [1.0, 3.0, 5.0, 7.0, 1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_tables_are_aligned() {
        let resource = sample(0x101);
        let mut encoder = Encoder::new(&resource);
        encoder.bucket().unwrap();
        encoder.assign_positions();
        for table in encoder.instance_tables.iter().chain(&encoder.object_tables) {
            assert_eq!(table.position % 16, 0);
        }
        for table in &encoder.primitive_tables {
            assert_eq!(table.position % table.alignment, 0);
        }
        assert_eq!(encoder.schema_position % 4, 0);
    }

    #[test]
    fn test_rejects_mixed_vector_schemas() {
        let mut resource = sample(0x101);
        resource
            .instance_mut(0)
            .unwrap()
            .get_mut("path")
            .unwrap()
            .as_vector_mut()
            .unwrap()
            .push(Cell::object(ObjectCell::new(THING)));
        assert!(matches!(
            resource.serialize(),
            Err(Error::MixedVectorSchemas { index: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_range_values() {
        let mut resource = sample(0x101);
        resource
            .instance_mut(0)
            .unwrap()
            .get_mut("count")
            .unwrap()
            .as_number_mut()
            .unwrap()
            .set_value(4294967296.0);
        let err = resource.serialize().unwrap_err();
        assert_eq!(err.kind(), sulani_common::ErrorKind::Validation);
    }

    #[test]
    fn test_rejects_unknown_instance_schema() {
        let resource = SimDataResource::from_parts(
            0x101,
            0,
            Vec::new(),
            vec![SimDataInstance::new("lost", ObjectCell::new(1))],
        );
        assert!(matches!(
            resource.serialize(),
            Err(Error::UnknownSchema { hash: 1, .. })
        ));
    }

    #[test]
    fn test_empty_resource() {
        let resource = SimDataResource::create();
        let bytes = resource.serialize().unwrap();
        let decoded = SimDataResource::from_bytes(&bytes).unwrap();
        assert!(decoded.instances().is_empty());
        assert!(decoded.schemas().is_empty());
    }
}
