//! # Fixed-Width Headers
//!
//! The packed record store prefixes every entity record and every component
//! block with little-endian integers whose widths are chosen once, at
//! configuration time. A value that does not fit its field is an error,
//! never a silent truncation.

use serde::Deserialize;

use crate::ecs::ComponentId;
use crate::error::{EcsError, EcsResult, HeaderField};

/// Width of a header integer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Width {
    /// One byte.
    U8,
    /// Two bytes.
    U16,
    /// Four bytes.
    U32,
    /// Eight bytes.
    U64,
}

impl Width {
    /// Number of bytes the field occupies.
    #[inline]
    #[must_use]
    pub const fn bytes(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::U32 => 4,
            Self::U64 => 8,
        }
    }

    /// Largest value an unsigned field of this width holds.
    #[inline]
    #[must_use]
    pub const fn max_unsigned(self) -> u64 {
        match self {
            Self::U8 => u8::MAX as u64,
            Self::U16 => u16::MAX as u64,
            Self::U32 => u32::MAX as u64,
            Self::U64 => u64::MAX,
        }
    }

    /// Largest magnitude a signed field of this width holds.
    #[inline]
    #[must_use]
    pub const fn max_signed(self) -> u64 {
        match self {
            Self::U8 => i8::MAX as u64,
            Self::U16 => i16::MAX as u64,
            Self::U32 => i32::MAX as u64,
            Self::U64 => i64::MAX as u64,
        }
    }

    /// Reads an unsigned little-endian value from the front of `src`.
    #[inline]
    #[must_use]
    pub fn read_unsigned(self, src: &[u8]) -> u64 {
        match self {
            Self::U8 => u64::from(src[0]),
            Self::U16 => u64::from(u16::from_le_bytes([src[0], src[1]])),
            Self::U32 => u64::from(u32::from_le_bytes([src[0], src[1], src[2], src[3]])),
            Self::U64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&src[..8]);
                u64::from_le_bytes(raw)
            }
        }
    }

    /// Reads a signed little-endian value from the front of `src`.
    #[inline]
    #[must_use]
    pub fn read_signed(self, src: &[u8]) -> i64 {
        match self {
            Self::U8 => i64::from(i8::from_le_bytes([src[0]])),
            Self::U16 => i64::from(i16::from_le_bytes([src[0], src[1]])),
            Self::U32 => i64::from(i32::from_le_bytes([src[0], src[1], src[2], src[3]])),
            Self::U64 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(&src[..8]);
                i64::from_le_bytes(raw)
            }
        }
    }

    /// Writes an unsigned value. The caller has range-checked it.
    #[inline]
    pub fn write_unsigned(self, dst: &mut [u8], value: u64) {
        debug_assert!(value <= self.max_unsigned());
        let n = self.bytes();
        dst[..n].copy_from_slice(&value.to_le_bytes()[..n]);
    }

    /// Writes a signed value. The caller has range-checked it.
    #[inline]
    pub fn write_signed(self, dst: &mut [u8], value: i64) {
        debug_assert!(value.unsigned_abs() <= self.max_signed());
        let n = self.bytes();
        dst[..n].copy_from_slice(&value.to_le_bytes()[..n]);
    }
}

/// Header field widths of the packed record layout.
///
/// ```text
/// record    = [entity_length][component]*
/// component = [component_length][type_id][payload bytes]
/// ```
///
/// `entity_length` is signed and counts its own header, so an empty record
/// still has a positive length and negating it always marks a tombstone.
/// The largest `type_id` value is reserved for tombstoned component blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeaderLayout {
    /// Width of the signed entity record length.
    pub entity_length: Width,
    /// Width of the component block length.
    pub component_length: Width,
    /// Width of the component type id.
    pub type_id: Width,
}

impl Default for HeaderLayout {
    fn default() -> Self {
        Self {
            entity_length: Width::U32,
            component_length: Width::U32,
            type_id: Width::U16,
        }
    }
}

impl HeaderLayout {
    /// Bytes taken by an entity record header.
    #[inline]
    #[must_use]
    pub const fn entity_header(&self) -> usize {
        self.entity_length.bytes()
    }

    /// Bytes taken by a component block header.
    #[inline]
    #[must_use]
    pub const fn component_header(&self) -> usize {
        self.component_length.bytes() + self.type_id.bytes()
    }

    /// Type id written into tombstoned component blocks.
    #[inline]
    #[must_use]
    pub const fn tombstone_id(&self) -> u64 {
        self.type_id.max_unsigned()
    }

    /// Fails unless `value` fits in `field`.
    pub fn check(&self, field: HeaderField, value: u64) -> EcsResult<()> {
        let max = match field {
            HeaderField::EntityLength => self.entity_length.max_signed(),
            HeaderField::ComponentLength => self.component_length.max_unsigned(),
            HeaderField::TypeId => self.tombstone_id() - 1,
        };
        if value > max {
            return Err(EcsError::HeaderOverflow { field, value, max });
        }
        Ok(())
    }

    /// Validates the layout against the largest registered component.
    ///
    /// # Arguments
    ///
    /// * `max_payload` - Size in bytes of the largest component type
    /// * `max_type_id` - Largest component id in use
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidLayout`] when a record holding the largest
    /// component, or the largest id, cannot be represented.
    pub fn validate(&self, max_payload: usize, max_type_id: ComponentId) -> EcsResult<()> {
        if u64::from(max_type_id) >= self.tombstone_id() {
            return Err(EcsError::InvalidLayout(format!(
                "type id width {:?} cannot hold id {max_type_id} ({} is reserved)",
                self.type_id,
                self.tombstone_id()
            )));
        }

        let block = (self.component_header() + max_payload) as u64;
        if block > self.component_length.max_unsigned() {
            return Err(EcsError::InvalidLayout(format!(
                "component length width {:?} cannot hold a {block}-byte block",
                self.component_length
            )));
        }

        let record = self.entity_header() as u64 + block;
        if record > self.entity_length.max_signed() {
            return Err(EcsError::InvalidLayout(format!(
                "entity length width {:?} cannot hold a {record}-byte record",
                self.entity_length
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_roundtrip_per_width() {
        let mut buf = [0u8; 8];
        for width in [Width::U8, Width::U16, Width::U32, Width::U64] {
            width.write_signed(&mut buf, -5);
            assert_eq!(width.read_signed(&buf), -5);
            width.write_signed(&mut buf, 100);
            assert_eq!(width.read_signed(&buf), 100);
        }
    }

    #[test]
    fn test_little_endian_bytes() {
        let mut buf = [0u8; 4];
        Width::U16.write_unsigned(&mut buf, 0x0102);
        assert_eq!(buf[..2], [0x02, 0x01]);
        assert_eq!(Width::U16.read_unsigned(&buf), 0x0102);
    }

    #[test]
    fn test_check_rejects_overflow() {
        let layout = HeaderLayout {
            entity_length: Width::U8,
            component_length: Width::U8,
            type_id: Width::U8,
        };
        assert!(layout.check(HeaderField::EntityLength, 127).is_ok());
        assert_eq!(
            layout.check(HeaderField::EntityLength, 128),
            Err(EcsError::HeaderOverflow {
                field: HeaderField::EntityLength,
                value: 128,
                max: 127
            })
        );
        // 255 is the tombstone id
        assert!(layout.check(HeaderField::TypeId, 254).is_ok());
        assert!(layout.check(HeaderField::TypeId, 255).is_err());
    }

    #[test]
    fn test_validate_layout() {
        let layout = HeaderLayout {
            entity_length: Width::U8,
            component_length: Width::U8,
            type_id: Width::U8,
        };
        // 1 (record) + 2 (block header) + 124 = 127
        assert!(layout.validate(124, 10).is_ok());
        assert!(matches!(layout.validate(125, 10), Err(EcsError::InvalidLayout(_))));
        assert!(matches!(layout.validate(4, 255), Err(EcsError::InvalidLayout(_))));
        assert!(HeaderLayout::default().validate(4096, 1000).is_ok());
    }
}
