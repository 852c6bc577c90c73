//! Resource keys and well-known resource type ids.

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Type/group/instance triple identifying a resource.
///
/// Keys are not unique within a package; two entries may carry the same key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceKey {
    /// Resource type id.
    pub type_id: u32,
    /// Resource group.
    pub group: u32,
    /// Resource instance.
    pub instance: u64,
}

impl ResourceKey {
    /// Create a key.
    #[inline]
    pub const fn new(type_id: u32, group: u32, instance: u64) -> Self {
        Self {
            type_id,
            group,
            instance,
        }
    }

    /// High 32 bits of the instance, as stored in a package index.
    #[inline]
    pub const fn instance_high(&self) -> u32 {
        (self.instance >> 32) as u32
    }

    /// Low 32 bits of the instance, as stored in a package index.
    #[inline]
    pub const fn instance_low(&self) -> u32 {
        self.instance as u32
    }

    /// File-system friendly form, `TTTTTTTT!GGGGGGGG!IIIIIIIIIIIIIIII`.
    pub fn file_stem(&self) -> String {
        format!(
            "{:08X}!{:08X}!{:016X}",
            self.type_id, self.group, self.instance
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}:{:08X}:{:016X}",
            self.type_id, self.group, self.instance
        )
    }
}

impl FromStr for ResourceKey {
    type Err = Error;

    /// Parse `T:G:I`, `T!G!I` or `T-G-I` with hexadecimal components.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split([':', '!', '-']).collect();
        let [type_id, group, instance] = parts.as_slice() else {
            return Err(Error::InvalidKey(s.to_string()));
        };

        let hex = |part: &str| part.trim_start_matches("0x").trim_start_matches("0X").to_string();
        let parse_err = |_| Error::InvalidKey(s.to_string());

        Ok(Self {
            type_id: u32::from_str_radix(&hex(type_id), 16).map_err(parse_err)?,
            group: u32::from_str_radix(&hex(group), 16).map_err(parse_err)?,
            instance: u64::from_str_radix(&hex(instance), 16).map_err(parse_err)?,
        })
    }
}

/// Well-known resource type ids.
pub mod types {
    /// Binary SimData tables.
    pub const SIMDATA: u32 = 0x545A_C67A;
    /// Localized string table.
    pub const STRING_TABLE: u32 = 0x2205_57DA;
    /// Generic tuning.
    pub const TUNING: u32 = 0x03B3_3DDF;
    /// Combined (merged) tuning.
    pub const COMBINED_TUNING: u32 = 0x62E9_4D38;
    /// Buff tuning.
    pub const BUFF: u32 = 0x6017_E896;
    /// Trait tuning.
    pub const TRAIT: u32 = 0xCB5F_DDC7;
    /// Interaction tuning.
    pub const INTERACTION: u32 = 0xE882_D22F;
    /// Snippet tuning.
    pub const SNIPPET: u32 = 0x7DF2_169C;
    /// Object tuning.
    pub const OBJECT: u32 = 0xB61D_E6B4;
    /// Loot action tuning.
    pub const ACTION: u32 = 0x0C77_2E27;
    /// Module tuning.
    pub const MODULE: u32 = 0x0333_406C;

    /// Tuning type ids recognised without sniffing the content.
    pub const TUNING_TYPES: &[u32] = &[
        TUNING,
        COMBINED_TUNING,
        BUFF,
        TRAIT,
        INTERACTION,
        SNIPPET,
        OBJECT,
        ACTION,
        MODULE,
    ];

    /// Whether `type_id` is a tuning type.
    pub fn is_tuning(type_id: u32) -> bool {
        TUNING_TYPES.contains(&type_id)
    }
}
