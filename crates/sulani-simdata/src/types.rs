//! SimData column and cell data types.

/// Data types used in SimData columns and tables.
///
/// The values are the actual binary values from the SimData file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "json-export", derive(serde::Serialize))]
#[repr(u16)]
pub enum DataType {
    /// Boolean value (one byte).
    Boolean = 0,
    /// Single character (one byte).
    Character = 1,
    /// Signed 8-bit integer.
    Int8 = 2,
    /// Unsigned 8-bit integer.
    UInt8 = 3,
    /// Signed 16-bit integer.
    Int16 = 4,
    /// Unsigned 16-bit integer.
    UInt16 = 5,
    /// Signed 32-bit integer.
    Int32 = 6,
    /// Unsigned 32-bit integer.
    UInt32 = 7,
    /// Signed 64-bit integer.
    Int64 = 8,
    /// Unsigned 64-bit integer.
    UInt64 = 9,
    /// 32-bit floating point.
    Float = 10,
    /// Offset into the char table.
    String = 11,
    /// Offset into the char table followed by the FNV-32 of the string.
    HashedString = 12,
    /// Offset to a row in an object table.
    Object = 13,
    /// Offset to the first element plus an element count.
    Vector = 14,
    /// Two floats.
    Float2 = 15,
    /// Three floats.
    Float3 = 16,
    /// Four floats.
    Float4 = 17,
    /// 64-bit table set reference.
    TableSetReference = 18,
    /// Instance, type and group of a resource.
    ResourceKey = 19,
    /// String table key.
    LocalizationKey = 20,
    /// Offset to a single value plus a 32-bit type hash.
    Variant = 21,
    /// Placeholder type with no storage.
    Undefined = 22,
}

impl DataType {
    /// Parse from a u16 value.
    pub fn from_u16(value: u16) -> Option<Self> {
        Some(match value {
            0 => Self::Boolean,
            1 => Self::Character,
            2 => Self::Int8,
            3 => Self::UInt8,
            4 => Self::Int16,
            5 => Self::UInt16,
            6 => Self::Int32,
            7 => Self::UInt32,
            8 => Self::Int64,
            9 => Self::UInt64,
            10 => Self::Float,
            11 => Self::String,
            12 => Self::HashedString,
            13 => Self::Object,
            14 => Self::Vector,
            15 => Self::Float2,
            16 => Self::Float3,
            17 => Self::Float4,
            18 => Self::TableSetReference,
            19 => Self::ResourceKey,
            20 => Self::LocalizationKey,
            21 => Self::Variant,
            22 => Self::Undefined,
            _ => return None,
        })
    }

    /// Parse from the 32-bit form stored in table records.
    pub fn from_u32(value: u32) -> Option<Self> {
        u16::try_from(value).ok().and_then(Self::from_u16)
    }

    /// Size in bytes of one value of this type.
    pub fn size(&self) -> usize {
        match self {
            Self::Boolean | Self::Character | Self::Int8 | Self::UInt8 => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32
            | Self::UInt32
            | Self::Float
            | Self::String
            | Self::Object
            | Self::LocalizationKey => 4,
            Self::Int64
            | Self::UInt64
            | Self::HashedString
            | Self::Vector
            | Self::Float2
            | Self::TableSetReference
            | Self::Variant => 8,
            Self::Float3 => 12,
            Self::Float4 | Self::ResourceKey => 16,
            Self::Undefined => 0,
        }
    }

    /// Required alignment of a value of this type.
    pub fn alignment(&self) -> usize {
        match self {
            Self::Boolean | Self::Character | Self::Int8 | Self::UInt8 | Self::Undefined => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int64 | Self::UInt64 | Self::TableSetReference | Self::ResourceKey => 8,
            _ => 4,
        }
    }

    /// Get the string name for this data type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Character => "Character",
            Self::Int8 => "Int8",
            Self::UInt8 => "UInt8",
            Self::Int16 => "Int16",
            Self::UInt16 => "UInt16",
            Self::Int32 => "Int32",
            Self::UInt32 => "UInt32",
            Self::Int64 => "Int64",
            Self::UInt64 => "UInt64",
            Self::Float => "Float",
            Self::String => "String",
            Self::HashedString => "HashedString",
            Self::Object => "Object",
            Self::Vector => "Vector",
            Self::Float2 => "Float2",
            Self::Float3 => "Float3",
            Self::Float4 => "Float4",
            Self::TableSetReference => "TableSetReference",
            Self::ResourceKey => "ResourceKey",
            Self::LocalizationKey => "LocalizationKey",
            Self::Variant => "Variant",
            Self::Undefined => "Undefined",
        }
    }

    /// Parse a name produced by [`DataType::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        (0..=22u16)
            .filter_map(Self::from_u16)
            .find(|t| t.as_str().eq_ignore_ascii_case(name))
    }

    /// Whether values of this type point at data in another table.
    pub fn is_pointer(&self) -> bool {
        matches!(self, Self::Object | Self::Vector | Self::Variant)
    }

    /// Whether values of this type reference the char table.
    pub fn is_text(&self) -> bool {
        matches!(self, Self::String | Self::HashedString)
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
