//! SimData binary decoder.

use rustc_hash::FxHashMap;
use sulani_common::{BinaryReader, ResourceKey};
use tracing::debug;

use crate::cells::{Cell, ObjectCell};
use crate::resource::{VERSION_BASE, VERSION_WITH_UNUSED};
use crate::write::{COLUMN_RECORD_SIZE, SCHEMA_RECORD_SIZE, TABLE_RECORD_SIZE};
use crate::{
    DataType, Error, Result, SimDataInstance, SimDataResource, SimDataSchema, SimDataSchemaColumn,
};

/// Magic bytes at the start of every SimData buffer.
pub const MAGIC: &[u8; 4] = b"DATA";

/// Maximum nesting of objects, vectors and variants.
pub const MAX_DEPTH: usize = 256;

/// A table-info record.
#[derive(Debug)]
struct TableInfo {
    name: Option<String>,
    schema: Option<usize>,
    data_type: DataType,
    row_size: usize,
    start: usize,
    count: usize,
}

impl TableInfo {
    fn end(&self) -> usize {
        self.start + self.row_size * self.count
    }

    fn contains(&self, target: usize) -> bool {
        if self.count == 0 {
            return false;
        }
        if self.row_size == 0 {
            return target == self.start;
        }
        target >= self.start && target < self.end()
    }
}

/// A schema plus the column offsets stored in the file.
struct RawSchema {
    schema: SimDataSchema,
    offsets: Vec<usize>,
}

struct Decoder<'a> {
    data: &'a [u8],
    schemas: Vec<RawSchema>,
    tables: Vec<TableInfo>,
}

/// Decode a SimData buffer.
pub(crate) fn decode(data: &[u8]) -> Result<SimDataResource> {
    let mut reader = BinaryReader::new(data);
    reader.expect_magic(MAGIC)?;

    let version = reader.read_u32()?;
    if version != VERSION_BASE && version != VERSION_WITH_UNUSED {
        return Err(Error::UnsupportedVersion(version));
    }

    let table_position = reader.read_relative_offset()?;
    let table_count = read_count(&mut reader, "table")?;
    let schema_position = reader.read_relative_offset()?;
    let schema_count = read_count(&mut reader, "schema")?;
    let unused = if version >= VERSION_WITH_UNUSED {
        reader.read_u32()?
    } else {
        0
    };

    let mut schema_index = FxHashMap::default();
    let mut schemas = Vec::with_capacity(schema_count.min(data.len() / SCHEMA_RECORD_SIZE));
    if let Some(base) = schema_position {
        for i in 0..schema_count {
            let position = base + i * SCHEMA_RECORD_SIZE;
            reader.seek(position);
            schemas.push(read_schema(&mut reader)?);
            schema_index.insert(position, i);
        }
    }

    let mut tables = Vec::with_capacity(table_count.min(data.len() / TABLE_RECORD_SIZE));
    if let Some(base) = table_position {
        for i in 0..table_count {
            reader.seek(base + i * TABLE_RECORD_SIZE);
            tables.push(read_table(&mut reader, i, &schema_index)?);
        }
    }

    let decoder = Decoder {
        data,
        schemas,
        tables,
    };

    let mut instances = Vec::new();
    for table in decoder.tables.iter().filter(|t| t.name.is_some()) {
        let name = table.name.clone().unwrap_or_default();
        let Some(schema) = table.schema else {
            return Err(Error::InvalidInstanceTable {
                name,
                missing: "schema",
            });
        };
        if table.count == 0 {
            return Err(Error::InvalidInstanceTable {
                name,
                missing: "rows",
            });
        }
        let object = decoder.read_object(table.start, schema, 0)?;
        instances.push(SimDataInstance::new(name, object));
    }

    debug!(
        version,
        tables = decoder.tables.len(),
        schemas = decoder.schemas.len(),
        instances = instances.len(),
        "decoded SimData"
    );

    let schemas = decoder.schemas.into_iter().map(|raw| raw.schema).collect();
    Ok(SimDataResource::from_parts(version, unused, schemas, instances))
}

fn read_count(reader: &mut BinaryReader<'_>, what: &'static str) -> Result<usize> {
    let count = reader.read_i32()?;
    usize::try_from(count).map_err(|_| Error::InvalidCount { what, count })
}

/// Read the name at a relative offset field; null means empty.
fn read_name(reader: &mut BinaryReader<'_>) -> Result<Option<String>> {
    match reader.read_relative_offset()? {
        Some(target) => {
            let name = reader.with_position(target, |r| r.read_cstring().map(str::to_string))?;
            Ok(Some(name))
        }
        None => Ok(None),
    }
}

fn read_data_type(position: usize, value: u32) -> Result<DataType> {
    DataType::from_u32(value).ok_or(Error::UnknownDataType { position, value })
}

fn read_schema(reader: &mut BinaryReader<'_>) -> Result<RawSchema> {
    let name = read_name(reader)?.unwrap_or_default();
    let _name_hash = reader.read_u32()?;
    let hash = reader.read_u32()?;
    let _size = reader.read_u32()?;
    let column_position = reader.read_relative_offset()?;
    let column_count = reader.read_u32()? as usize;

    let capacity = column_count.min(reader.len() / COLUMN_RECORD_SIZE);
    let mut columns = Vec::with_capacity(capacity);
    let mut offsets = Vec::with_capacity(capacity);
    if let Some(base) = column_position {
        for i in 0..column_count {
            let position = base + i * COLUMN_RECORD_SIZE;
            reader.seek(position);
            let column_name = read_name(reader)?.unwrap_or_default();
            let _name_hash = reader.read_u32()?;
            let data_type = read_data_type(position + 8, reader.read_u16()?.into())?;
            let flags = reader.read_u16()?;
            let offset = reader.read_u32()? as usize;
            let _schema = reader.read_relative_offset()?;
            columns.push(SimDataSchemaColumn::new(column_name, data_type, flags));
            offsets.push(offset);
        }
    }

    Ok(RawSchema {
        schema: SimDataSchema::new(name, hash, columns),
        offsets,
    })
}

fn read_table(
    reader: &mut BinaryReader<'_>,
    index: usize,
    schema_index: &FxHashMap<usize, usize>,
) -> Result<TableInfo> {
    let record = reader.position();
    let name = read_name(reader)?;
    let _name_hash = reader.read_u32()?;

    let schema_field = reader.position();
    let schema = match reader.read_relative_offset()? {
        Some(target) => Some(*schema_index.get(&target).ok_or(Error::SchemaNotFound {
            position: schema_field,
            target,
        })?),
        None => None,
    };

    let type_field = reader.position();
    let data_type = read_data_type(type_field, reader.read_u32()?)?;
    let row_size = reader.read_u32()? as usize;
    let start = reader.read_relative_offset()?.unwrap_or(record);
    let count = reader.read_u32()? as usize;

    let table = TableInfo {
        name,
        schema,
        data_type,
        row_size,
        start,
        count,
    };
    let end = row_size
        .checked_mul(count)
        .and_then(|size| size.checked_add(start));
    match end {
        Some(end) if end <= reader.len() => Ok(table),
        _ => Err(Error::TableOutOfBounds {
            index,
            offset: start,
            end: end.unwrap_or(usize::MAX),
            len: reader.len(),
        }),
    }
}

impl Decoder<'_> {
    fn reader_at(&self, position: usize) -> BinaryReader<'_> {
        BinaryReader::new_at(self.data, position)
    }

    /// The table holding `target`.
    ///
    /// A zero-size table can share its start with the next table. Such ties
    /// go to a table of the `expected` type, or to a sized table otherwise.
    fn table_at(
        &self,
        position: usize,
        target: usize,
        expected: Option<DataType>,
    ) -> Result<&TableInfo> {
        let preferred = |table: &TableInfo| match expected {
            Some(data_type) => table.data_type == data_type,
            None => table.row_size > 0,
        };
        let mut candidates = self.tables.iter().filter(|table| table.contains(target));
        let first = candidates
            .next()
            .ok_or(Error::DanglingPointer { position, target })?;
        if preferred(first) {
            return Ok(first);
        }
        Ok(candidates.find(|table| preferred(table)).unwrap_or(first))
    }

    fn read_object(&self, start: usize, schema: usize, depth: usize) -> Result<ObjectCell> {
        if depth > MAX_DEPTH {
            return Err(Error::NestingTooDeep(MAX_DEPTH));
        }
        let raw = &self.schemas[schema];
        let mut object = ObjectCell::new(raw.schema.hash());
        for (column, offset) in raw.schema.columns().iter().zip(&raw.offsets) {
            let cell = self.read_cell(start + offset, column.data_type(), None, depth)?;
            object.set(column.name(), cell);
        }
        Ok(object)
    }

    /// Decode one value at `position`. `schema` is set for object table rows.
    fn read_cell(
        &self,
        position: usize,
        data_type: DataType,
        schema: Option<usize>,
        depth: usize,
    ) -> Result<Cell> {
        if depth > MAX_DEPTH {
            return Err(Error::NestingTooDeep(MAX_DEPTH));
        }
        let mut r = self.reader_at(position);
        let cell = match data_type {
            DataType::Boolean => Cell::boolean(r.read_bool()?),
            DataType::Character => Cell::character(char::from(r.read_u8()?)),
            DataType::Int8 => Cell::int8(r.read_i8()?),
            DataType::UInt8 => Cell::uint8(r.read_u8()?),
            DataType::Int16 => Cell::int16(r.read_i16()?),
            DataType::UInt16 => Cell::uint16(r.read_u16()?),
            DataType::Int32 => Cell::int32(r.read_i32()?),
            DataType::UInt32 => Cell::uint32(r.read_u32()?),
            DataType::Int64 => Cell::int64(r.read_i64()?),
            DataType::UInt64 => Cell::uint64(r.read_u64()?),
            DataType::Float => Cell::float(r.read_f32()?),
            DataType::LocalizationKey => Cell::localization_key(r.read_u32()?),
            DataType::TableSetReference => Cell::table_set_reference(r.read_u64()?),
            DataType::String => Cell::string(self.read_text(&mut r)?),
            DataType::HashedString => {
                let value = self.read_text(&mut r)?;
                let _hash = r.read_u32()?;
                Cell::hashed_string(value)
            }
            DataType::Float2 => Cell::float2([r.read_f32()?, r.read_f32()?]),
            DataType::Float3 => Cell::float3([r.read_f32()?, r.read_f32()?, r.read_f32()?]),
            DataType::Float4 => Cell::float4([
                r.read_f32()?,
                r.read_f32()?,
                r.read_f32()?,
                r.read_f32()?,
            ]),
            DataType::ResourceKey => {
                let instance = r.read_u64()?;
                let type_id = r.read_u32()?;
                let group = r.read_u32()?;
                Cell::resource_key(ResourceKey::new(type_id, group, instance))
            }
            DataType::Object => match schema {
                // A row of an object table: the data is here.
                Some(schema) => Cell::object(self.read_object(position, schema, depth + 1)?),
                // A column value: the data is behind a pointer.
                None => {
                    let target = r.read_relative_offset()?.ok_or(Error::NullObject(position))?;
                    let table = self.table_at(position, target, Some(DataType::Object))?;
                    let schema = table.schema.ok_or(Error::PointerTypeMismatch {
                        position,
                        expected: "object",
                        actual: table.data_type,
                    })?;
                    Cell::object(self.read_object(target, schema, depth + 1)?)
                }
            },
            DataType::Vector => {
                let target = r.read_relative_offset()?;
                let count = r.read_u32()?;
                match target {
                    Some(target) if count > 0 => {
                        Cell::vector(self.read_elements(position, target, count, depth + 1)?)
                    }
                    _ => Cell::vector(Vec::new()),
                }
            }
            DataType::Variant => {
                let target = r.read_relative_offset()?;
                let type_hash = r.read_u32()?;
                let child = match target {
                    Some(target) => {
                        let table = self.table_at(position, target, None)?;
                        let (data_type, schema) = (table.data_type, table.schema);
                        Some(self.read_cell(target, data_type, schema, depth + 1)?)
                    }
                    None => None,
                };
                Cell::variant(type_hash, child)
            }
            DataType::Undefined => {
                return Err(Error::UnknownDataType {
                    position,
                    value: DataType::Undefined as u32,
                })
            }
        };
        Ok(cell)
    }

    fn read_text(&self, r: &mut BinaryReader<'_>) -> Result<String> {
        match r.read_relative_offset()? {
            Some(target) => Ok(self.reader_at(target).read_cstring()?.to_string()),
            None => Ok(String::new()),
        }
    }

    fn read_elements(
        &self,
        position: usize,
        target: usize,
        count: u32,
        depth: usize,
    ) -> Result<Vec<Cell>> {
        let table = self.table_at(position, target, None)?;
        let stride = table.row_size;
        let last = (count as usize)
            .checked_mul(stride)
            .and_then(|size| size.checked_add(target));
        match last {
            Some(last) if last <= table.end() => {}
            _ => return Err(Error::VectorOverrun { position, count }),
        }
        (0..count as usize)
            .map(|i| self.read_cell(target + i * stride, table.data_type, table.schema, depth))
            .collect()
    }
}
