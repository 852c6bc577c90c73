//! The SimData value tree.
//!
//! A [`Cell`] is one value: a primitive stored inline, or an object, vector or
//! variant that owns further cells. Every cell carries a [`CacheNode`] linked
//! to its container, so a setter anywhere in the tree invalidates the cached
//! bytes of every ancestor up to the resource (and beyond, to the package).
//!
//! Cells never cache bytes of their own; only the resource does.

mod leaf;
mod object;
mod variant;
mod vector;

pub use leaf::{
    BigIntCell, BigIntKind, BooleanCell, FloatVectorCell, NumberCell, NumberKind,
    ResourceKeyCell, TextCell, TextKind,
};
pub use object::{ObjectCell, Row};
pub use variant::VariantCell;
pub use vector::VectorCell;

use sulani_common::{CacheNode, ResourceKey, Tracked};

use crate::{DataType, Error, Result, SimDataSchema};

/// One SimData value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Boolean(BooleanCell),
    Text(TextCell),
    Number(NumberCell),
    BigInt(BigIntCell),
    ResourceKey(ResourceKeyCell),
    Float2(FloatVectorCell<2>),
    Float3(FloatVectorCell<3>),
    Float4(FloatVectorCell<4>),
    Object(ObjectCell),
    Vector(VectorCell),
    Variant(VariantCell),
}

impl Cell {
    pub fn boolean(value: bool) -> Self {
        Self::Boolean(BooleanCell::new(value))
    }

    pub fn character(value: char) -> Self {
        Self::Text(TextCell::new(TextKind::Character, value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::Text(TextCell::new(TextKind::String, value))
    }

    pub fn hashed_string(value: impl Into<String>) -> Self {
        Self::Text(TextCell::new(TextKind::HashedString, value))
    }

    pub fn int8(value: i8) -> Self {
        Self::number(NumberKind::Int8, value.into())
    }

    pub fn uint8(value: u8) -> Self {
        Self::number(NumberKind::UInt8, value.into())
    }

    pub fn int16(value: i16) -> Self {
        Self::number(NumberKind::Int16, value.into())
    }

    pub fn uint16(value: u16) -> Self {
        Self::number(NumberKind::UInt16, value.into())
    }

    pub fn int32(value: i32) -> Self {
        Self::number(NumberKind::Int32, value.into())
    }

    pub fn uint32(value: u32) -> Self {
        Self::number(NumberKind::UInt32, value.into())
    }

    pub fn float(value: f32) -> Self {
        Self::number(NumberKind::Float, value.into())
    }

    pub fn localization_key(value: u32) -> Self {
        Self::number(NumberKind::LocalizationKey, value.into())
    }

    /// A number cell holding an arbitrary (possibly out of range) value.
    pub fn number(kind: NumberKind, value: f64) -> Self {
        Self::Number(NumberCell::new(kind, value))
    }

    pub fn int64(value: i64) -> Self {
        Self::BigInt(BigIntCell::new(BigIntKind::Int64, value.into()))
    }

    pub fn uint64(value: u64) -> Self {
        Self::BigInt(BigIntCell::new(BigIntKind::UInt64, value.into()))
    }

    pub fn table_set_reference(value: u64) -> Self {
        Self::BigInt(BigIntCell::new(BigIntKind::TableSetReference, value.into()))
    }

    pub fn resource_key(key: ResourceKey) -> Self {
        Self::ResourceKey(ResourceKeyCell::new(key))
    }

    pub fn float2(values: [f32; 2]) -> Self {
        Self::Float2(FloatVectorCell::new(values))
    }

    pub fn float3(values: [f32; 3]) -> Self {
        Self::Float3(FloatVectorCell::new(values))
    }

    pub fn float4(values: [f32; 4]) -> Self {
        Self::Float4(FloatVectorCell::new(values))
    }

    pub fn object(object: ObjectCell) -> Self {
        Self::Object(object)
    }

    pub fn vector(children: Vec<Cell>) -> Self {
        Self::Vector(VectorCell::new(children))
    }

    pub fn variant(type_hash: u32, child: Option<Cell>) -> Self {
        Self::Variant(VariantCell::new(type_hash, child))
    }

    /// The SimData type this cell encodes as.
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Boolean(_) => DataType::Boolean,
            Self::Text(cell) => cell.kind().data_type(),
            Self::Number(cell) => cell.kind().data_type(),
            Self::BigInt(cell) => cell.kind().data_type(),
            Self::ResourceKey(_) => DataType::ResourceKey,
            Self::Float2(_) => DataType::Float2,
            Self::Float3(_) => DataType::Float3,
            Self::Float4(_) => DataType::Float4,
            Self::Object(_) => DataType::Object,
            Self::Vector(_) => DataType::Vector,
            Self::Variant(_) => DataType::Variant,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(cell) => Some(cell.value()),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(cell) => Some(cell.value()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(cell) => Some(cell.value()),
            _ => None,
        }
    }

    pub fn as_big_int(&self) -> Option<i128> {
        match self {
            Self::BigInt(cell) => Some(cell.value()),
            _ => None,
        }
    }

    pub fn as_resource_key(&self) -> Option<ResourceKey> {
        match self {
            Self::ResourceKey(cell) => Some(cell.key()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectCell> {
        match self {
            Self::Object(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&VectorCell> {
        match self {
            Self::Vector(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_variant(&self) -> Option<&VariantCell> {
        match self {
            Self::Variant(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut TextCell> {
        match self {
            Self::Text(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_number_mut(&mut self) -> Option<&mut NumberCell> {
        match self {
            Self::Number(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_big_int_mut(&mut self) -> Option<&mut BigIntCell> {
        match self {
            Self::BigInt(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectCell> {
        match self {
            Self::Object(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorCell> {
        match self {
            Self::Vector(cell) => Some(cell),
            _ => None,
        }
    }

    pub fn as_variant_mut(&mut self) -> Option<&mut VariantCell> {
        match self {
            Self::Variant(cell) => Some(cell),
            _ => None,
        }
    }

    /// Validate this cell and everything below it.
    ///
    /// Objects are checked against the schema in `schemas` whose hash they
    /// reference.
    pub fn validate(&self, schemas: &[SimDataSchema]) -> Result<()> {
        match self {
            Self::Text(cell) => cell.validate(),
            Self::Number(cell) => cell.validate(),
            Self::BigInt(cell) => cell.validate(),
            Self::Object(object) => {
                let schema = find_schema(schemas, object.schema_hash()).ok_or_else(|| {
                    Error::UnknownSchema {
                        hash: object.schema_hash(),
                        context: "object cell".to_string(),
                    }
                })?;
                object.validate(schema)?;
                object.iter().try_for_each(|(_, cell)| cell.validate(schemas))
            }
            Self::Vector(vector) => {
                vector.validate()?;
                vector.iter().try_for_each(|cell| cell.validate(schemas))
            }
            Self::Variant(variant) => match variant.child() {
                Some(child) => child.validate(schemas),
                None => Ok(()),
            },
            Self::Boolean(_)
            | Self::ResourceKey(_)
            | Self::Float2(_)
            | Self::Float3(_)
            | Self::Float4(_) => Ok(()),
        }
    }
}

impl Tracked for Cell {
    fn node(&self) -> &CacheNode {
        match self {
            Self::Boolean(cell) => cell.node(),
            Self::Text(cell) => cell.node(),
            Self::Number(cell) => cell.node(),
            Self::BigInt(cell) => cell.node(),
            Self::ResourceKey(cell) => cell.node(),
            Self::Float2(cell) => cell.node(),
            Self::Float3(cell) => cell.node(),
            Self::Float4(cell) => cell.node(),
            Self::Object(cell) => cell.node(),
            Self::Vector(cell) => cell.node(),
            Self::Variant(cell) => cell.node(),
        }
    }
}

/// First schema in `schemas` with `hash`.
pub(crate) fn find_schema(schemas: &[SimDataSchema], hash: u32) -> Option<&SimDataSchema> {
    schemas.iter().find(|schema| schema.hash() == hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SimDataSchemaColumn;
    use std::sync::Arc;

    #[test]
    fn test_data_types() {
        assert_eq!(Cell::character('x').data_type(), DataType::Character);
        assert_eq!(Cell::hashed_string("x").data_type(), DataType::HashedString);
        assert_eq!(Cell::localization_key(1).data_type(), DataType::LocalizationKey);
        assert_eq!(Cell::table_set_reference(1).data_type(), DataType::TableSetReference);
        assert_eq!(Cell::float4([0.0; 4]).data_type(), DataType::Float4);
        assert_eq!(Cell::variant(0, None).data_type(), DataType::Variant);
    }

    #[test]
    fn test_deep_validate() {
        let schemas = vec![SimDataSchema::new(
            "Inner",
            7,
            vec![SimDataSchemaColumn::new("v", DataType::UInt8, 0)],
        )];

        let good = Cell::vector(vec![Cell::object(ObjectCell::with_values(
            7,
            [("v", Cell::uint8(1))],
        ))]);
        assert!(good.validate(&schemas).is_ok());

        let out_of_range = Cell::vector(vec![Cell::object(ObjectCell::with_values(
            7,
            [("v", Cell::number(NumberKind::UInt8, 256.0))],
        ))]);
        assert!(matches!(
            out_of_range.validate(&schemas),
            Err(Error::InvalidValue { .. })
        ));

        let unknown = Cell::object(ObjectCell::new(8));
        assert!(matches!(
            unknown.validate(&schemas),
            Err(Error::UnknownSchema { hash: 8, .. })
        ));
    }

    #[test]
    fn test_grandchild_edit_reaches_root() {
        let mut root = Cell::vector(vec![Cell::variant(1, Some(Cell::int32(1)))]);
        root.node().store(Arc::from(&b"cached"[..]));

        let sibling = Cell::int32(0);
        sibling.node().store(Arc::from(&b"cached"[..]));

        let vector = root.as_vector_mut().unwrap();
        vector.node().store(Arc::from(&b"cached"[..]));
        let variant = vector.get_mut(0).unwrap().as_variant_mut().unwrap();
        variant
            .child_mut()
            .unwrap()
            .as_number_mut()
            .unwrap()
            .set_value(2.0);

        assert!(!root.node().is_cached());
        assert!(sibling.node().is_cached());
    }
}
