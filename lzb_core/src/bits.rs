//! Control bitmap and packed-field helpers shared by the encoder and decoder.

use crate::config::CodecConfig;

/// Bytes needed to hold one control bit per operation.
#[inline]
pub fn bitmap_len(operation_count: usize) -> usize {
    (operation_count + 7) / 8
}

/// Read control bit `index` (LSB-first within each byte).
///
/// Returns `None` when the bitmap is too short to hold that bit.
#[inline]
pub fn control_bit(bitmap: &[u8], index: usize) -> Option<bool> {
    bitmap
        .get(index / 8)
        .map(|byte| (byte >> (index % 8)) & 1 == 1)
}

/// Append-only control bitmap. Unused high bits of the last byte stay zero.
#[derive(Debug, Default)]
pub struct ControlBitsWriter {
    bytes: Vec<u8>,
    len: usize,
}

impl ControlBitsWriter {
    pub fn with_capacity(operations: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bitmap_len(operations)),
            len: 0,
        }
    }

    /// Record one operation: `true` for a back-reference, `false` for a literal.
    pub fn push(&mut self, back_reference: bool) {
        let bit = self.len % 8;
        if bit == 0 {
            self.bytes.push(0);
        }
        if back_reference {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << bit;
            }
        }
        self.len += 1;
    }

    /// Number of bits pushed so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Pack a back-reference into its 16-bit field. Both parts are stored minus one.
///
/// Callers guarantee `1 <= offset <= 2^offset_bits` and
/// `1 <= length <= 2^length_bits`.
#[inline]
pub fn pack_field(offset: usize, length: usize, config: &CodecConfig) -> u16 {
    debug_assert!(offset >= 1 && offset <= 1 << config.offset_bits());
    debug_assert!(length >= 1 && length <= config.max_match_length());
    (((offset - 1) as u16) << config.length_bits()) | ((length - 1) as u16 & config.length_mask())
}

/// Split a packed field into `(offset, length)`.
#[inline]
pub fn unpack_field(field: u16, config: &CodecConfig) -> (usize, usize) {
    let offset = (field >> config.length_bits()) as usize + 1;
    let length = (field & config.length_mask()) as usize + 1;
    (offset, length)
}
