//! Cells that store their value inline.

use sulani_common::{CacheNode, ResourceKey, Tracked};

use crate::{DataType, Error, Result};

/// A boolean cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BooleanCell {
    node: CacheNode,
    value: bool,
}

impl BooleanCell {
    /// Create a boolean cell.
    pub fn new(value: bool) -> Self {
        Self {
            node: CacheNode::new(),
            value,
        }
    }

    /// The stored value.
    #[inline]
    pub fn value(&self) -> bool {
        self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: bool) {
        self.value = value;
        self.node.invalidate();
    }
}

/// How a [`TextCell`] is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// A single byte stored inline.
    Character,
    /// An offset into the char table.
    String,
    /// An offset into the char table plus the FNV-32 of the value.
    HashedString,
}

impl TextKind {
    /// The SimData type for this kind.
    pub fn data_type(self) -> DataType {
        match self {
            Self::Character => DataType::Character,
            Self::String => DataType::String,
            Self::HashedString => DataType::HashedString,
        }
    }
}

/// A character, string or hashed string cell.
#[derive(Debug, Clone, PartialEq)]
pub struct TextCell {
    node: CacheNode,
    kind: TextKind,
    value: String,
}

impl TextCell {
    /// Create a text cell.
    pub fn new(kind: TextKind, value: impl Into<String>) -> Self {
        Self {
            node: CacheNode::new(),
            kind,
            value: value.into(),
        }
    }

    /// The encoding kind.
    #[inline]
    pub fn kind(&self) -> TextKind {
        self.kind
    }

    /// The stored text.
    #[inline]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the stored text.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
        self.node.invalidate();
    }

    /// A character cell must hold exactly one character in `U+0000..=U+00FF`.
    pub fn validate(&self) -> Result<()> {
        let mut chars = self.value.chars();
        let single_byte = matches!(
            (chars.next(), chars.next()),
            (Some(c), None) if u32::from(c) <= 0xFF
        );
        if self.kind == TextKind::Character && !single_byte {
            return Err(Error::InvalidValue {
                data_type: DataType::Character,
                value: format!("{:?}", self.value),
            });
        }
        Ok(())
    }
}

/// Numeric kinds that fit in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberKind {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float,
    LocalizationKey,
}

impl NumberKind {
    /// The SimData type for this kind.
    pub fn data_type(self) -> DataType {
        match self {
            Self::Int8 => DataType::Int8,
            Self::UInt8 => DataType::UInt8,
            Self::Int16 => DataType::Int16,
            Self::UInt16 => DataType::UInt16,
            Self::Int32 => DataType::Int32,
            Self::UInt32 => DataType::UInt32,
            Self::Float => DataType::Float,
            Self::LocalizationKey => DataType::LocalizationKey,
        }
    }

    /// Inclusive integer range, `None` for floats.
    fn range(self) -> Option<(f64, f64)> {
        Some(match self {
            Self::Int8 => (i8::MIN as f64, i8::MAX as f64),
            Self::UInt8 => (0.0, u8::MAX as f64),
            Self::Int16 => (i16::MIN as f64, i16::MAX as f64),
            Self::UInt16 => (0.0, u16::MAX as f64),
            Self::Int32 => (i32::MIN as f64, i32::MAX as f64),
            Self::UInt32 | Self::LocalizationKey => (0.0, u32::MAX as f64),
            Self::Float => return None,
        })
    }
}

/// A number of at most 32 bits.
///
/// The value is held as `f64` so that any in-memory edit is representable;
/// [`NumberCell::validate`] reports values the column cannot store.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberCell {
    node: CacheNode,
    kind: NumberKind,
    value: f64,
}

impl NumberCell {
    /// Create a number cell.
    pub fn new(kind: NumberKind, value: f64) -> Self {
        Self {
            node: CacheNode::new(),
            kind,
            value,
        }
    }

    /// The numeric kind.
    #[inline]
    pub fn kind(&self) -> NumberKind {
        self.kind
    }

    /// The stored value.
    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.node.invalidate();
    }

    /// Integer kinds must hold a whole number inside their range.
    pub fn validate(&self) -> Result<()> {
        let Some((min, max)) = self.kind.range() else {
            return Ok(());
        };
        let value = self.value;
        if !value.is_finite() || value.fract() != 0.0 || value < min || value > max {
            return Err(Error::InvalidValue {
                data_type: self.kind.data_type(),
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

/// 64-bit integer kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BigIntKind {
    Int64,
    UInt64,
    TableSetReference,
}

impl BigIntKind {
    /// The SimData type for this kind.
    pub fn data_type(self) -> DataType {
        match self {
            Self::Int64 => DataType::Int64,
            Self::UInt64 => DataType::UInt64,
            Self::TableSetReference => DataType::TableSetReference,
        }
    }
}

/// A 64-bit integer cell.
#[derive(Debug, Clone, PartialEq)]
pub struct BigIntCell {
    node: CacheNode,
    kind: BigIntKind,
    value: i128,
}

impl BigIntCell {
    /// Create a 64-bit integer cell.
    pub fn new(kind: BigIntKind, value: i128) -> Self {
        Self {
            node: CacheNode::new(),
            kind,
            value,
        }
    }

    /// The integer kind.
    #[inline]
    pub fn kind(&self) -> BigIntKind {
        self.kind
    }

    /// The stored value.
    #[inline]
    pub fn value(&self) -> i128 {
        self.value
    }

    /// Replace the stored value.
    pub fn set_value(&mut self, value: i128) {
        self.value = value;
        self.node.invalidate();
    }

    pub fn validate(&self) -> Result<()> {
        let fits = match self.kind {
            BigIntKind::Int64 => i64::try_from(self.value).is_ok(),
            BigIntKind::UInt64 | BigIntKind::TableSetReference => {
                u64::try_from(self.value).is_ok()
            }
        };
        if !fits {
            return Err(Error::InvalidValue {
                data_type: self.kind.data_type(),
                value: self.value.to_string(),
            });
        }
        Ok(())
    }
}

/// A resource key cell.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResourceKeyCell {
    node: CacheNode,
    key: ResourceKey,
}

impl ResourceKeyCell {
    pub fn new(key: ResourceKey) -> Self {
        Self {
            node: CacheNode::new(),
            key,
        }
    }

    #[inline]
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn set_key(&mut self, key: ResourceKey) {
        self.key = key;
        self.node.invalidate();
    }
}

/// Two, three or four packed floats.
#[derive(Debug, Clone, PartialEq)]
pub struct FloatVectorCell<const N: usize> {
    node: CacheNode,
    values: [f32; N],
}

impl<const N: usize> FloatVectorCell<N> {
    pub fn new(values: [f32; N]) -> Self {
        Self {
            node: CacheNode::new(),
            values,
        }
    }

    #[inline]
    pub fn values(&self) -> [f32; N] {
        self.values
    }

    pub fn set_values(&mut self, values: [f32; N]) {
        self.values = values;
        self.node.invalidate();
    }

    /// Replace one component. Returns `false` if `index` is out of range.
    pub fn set_component(&mut self, index: usize, value: f32) -> bool {
        let Some(slot) = self.values.get_mut(index) else {
            return false;
        };
        *slot = value;
        self.node.invalidate();
        true
    }

    /// The SimData type for this width.
    pub fn data_type(&self) -> DataType {
        match N {
            2 => DataType::Float2,
            3 => DataType::Float3,
            _ => DataType::Float4,
        }
    }
}

impl_tracked!(BooleanCell, TextCell, NumberCell, BigIntCell, ResourceKeyCell);

impl<const N: usize> Tracked for FloatVectorCell<N> {
    #[inline]
    fn node(&self) -> &CacheNode {
        &self.node
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_ranges() {
        assert!(NumberCell::new(NumberKind::UInt32, 4294967295.0).validate().is_ok());
        assert!(NumberCell::new(NumberKind::UInt32, 4294967296.0).validate().is_err());
        assert!(NumberCell::new(NumberKind::Int8, -128.0).validate().is_ok());
        assert!(NumberCell::new(NumberKind::Int8, 128.0).validate().is_err());
        assert!(NumberCell::new(NumberKind::Int32, 1.5).validate().is_err());
        assert!(NumberCell::new(NumberKind::Float, 1.5).validate().is_ok());
    }

    #[test]
    fn test_big_int_ranges() {
        let max = BigIntCell::new(BigIntKind::UInt64, u64::MAX as i128);
        assert!(max.validate().is_ok());
        let over = BigIntCell::new(BigIntKind::UInt64, u64::MAX as i128 + 1);
        assert!(over.validate().is_err());
        let negative = BigIntCell::new(BigIntKind::TableSetReference, -1);
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_character_is_one_byte() {
        assert!(TextCell::new(TextKind::Character, "a").validate().is_ok());
        assert!(TextCell::new(TextKind::Character, "ab").validate().is_err());
        assert!(TextCell::new(TextKind::Character, "é").validate().is_ok());
        assert!(TextCell::new(TextKind::Character, "ā").validate().is_err());
        assert!(TextCell::new(TextKind::String, "").validate().is_ok());
    }

    #[test]
    fn test_setter_invalidates_owner() {
        let owner = CacheNode::with_cached(std::sync::Arc::from(&b"x"[..]));
        let mut cell = BooleanCell::new(false);
        cell.node().set_owner(&owner);

        cell.set_value(true);
        assert!(!owner.is_cached());
    }

    #[test]
    fn test_set_component() {
        let mut cell = FloatVectorCell::new([0.0f32, 1.0, 2.0]);
        assert!(cell.set_component(1, 5.0));
        assert!(!cell.set_component(3, 5.0));
        assert_eq!(cell.values(), [0.0, 5.0, 2.0]);
        assert_eq!(cell.data_type(), DataType::Float3);
    }
}
