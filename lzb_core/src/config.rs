use serde::{Deserialize, Serialize};

use crate::error::{CodecError, Result};

/// Width of a packed back-reference field in bits.
pub const FIELD_BITS: u8 = 16;

/// Shortest run worth a back-reference: two bytes of field beat three literals.
pub const DEFAULT_MIN_MATCH_LENGTH: usize = 3;

/// Bit split and search limits for one codec variant.
///
/// A back-reference is packed as `((offset - 1) << length_bits) | (length - 1)`
/// into a little-endian `u16`, so `offset_bits + length_bits` must be 16.
/// Construction validates this; a `CodecConfig` that exists is always usable
/// by both the encoder and the decoder.
///
/// Serializes as `{ "offset_bits", "length_bits", "window_size",
/// "min_match_length" }`; deserialization runs the same validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "CodecConfigSpec", into = "CodecConfigSpec")]
pub struct CodecConfig {
    offset_bits: u8,
    length_bits: u8,
    window_size: usize,
    min_match_length: usize,
}

impl CodecConfig {
    /// 11-bit offset / 5-bit length: 2 KB window, runs up to 32 bytes.
    /// Used by script blocks, font sheets, and GR2 images.
    pub const OFFSET11_LENGTH5: CodecConfig = CodecConfig {
        offset_bits: 11,
        length_bits: 5,
        window_size: 1 << 11,
        min_match_length: DEFAULT_MIN_MATCH_LENGTH,
    };

    /// 13-bit offset / 3-bit length: 8 KB window, runs up to 8 bytes.
    /// Used by GR3 images.
    pub const OFFSET13_LENGTH3: CodecConfig = CodecConfig {
        offset_bits: 13,
        length_bits: 3,
        window_size: 1 << 13,
        min_match_length: DEFAULT_MIN_MATCH_LENGTH,
    };

    /// Build a config with the full window the offset field can address.
    pub fn new(offset_bits: u8, length_bits: u8) -> Result<Self> {
        if offset_bits as u16 + length_bits as u16 != FIELD_BITS as u16 {
            return Err(CodecError::ConfigMismatch(format!(
                "offset_bits ({offset_bits}) + length_bits ({length_bits}) must equal {FIELD_BITS}"
            )));
        }
        if offset_bits == 0 || length_bits == 0 {
            return Err(CodecError::ConfigMismatch(format!(
                "offset_bits ({offset_bits}) and length_bits ({length_bits}) must both be non-zero"
            )));
        }
        let config = Self {
            offset_bits,
            length_bits,
            window_size: 1usize << offset_bits,
            min_match_length: DEFAULT_MIN_MATCH_LENGTH,
        };
        config.validate()?;
        Ok(config)
    }

    /// Narrow the look-back window. Must stay within `1 ..= 2^offset_bits`.
    pub fn with_window_size(mut self, window_size: usize) -> Result<Self> {
        self.window_size = window_size;
        self.validate()?;
        Ok(self)
    }

    /// Change the shortest run emitted as a back-reference.
    pub fn with_min_match_length(mut self, min_match_length: usize) -> Result<Self> {
        self.min_match_length = min_match_length;
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        let max_window = 1usize << self.offset_bits;
        if self.window_size == 0 || self.window_size > max_window {
            return Err(CodecError::ConfigMismatch(format!(
                "window_size {} outside 1..={} for {} offset bits",
                self.window_size, max_window, self.offset_bits
            )));
        }
        let max_match = self.max_match_length();
        if self.min_match_length == 0 || self.min_match_length > max_match {
            return Err(CodecError::ConfigMismatch(format!(
                "min_match_length {} outside 1..={} for {} length bits",
                self.min_match_length, max_match, self.length_bits
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn offset_bits(&self) -> u8 {
        self.offset_bits
    }

    #[inline]
    pub fn length_bits(&self) -> u8 {
        self.length_bits
    }

    /// Maximum look-back distance of a back-reference.
    #[inline]
    pub fn window_size(&self) -> usize {
        self.window_size
    }

    #[inline]
    pub fn min_match_length(&self) -> usize {
        self.min_match_length
    }

    /// Longest run a single back-reference can carry: `2^length_bits`.
    #[inline]
    pub fn max_match_length(&self) -> usize {
        1usize << self.length_bits
    }

    /// Mask selecting the length part of a packed field.
    #[inline]
    pub fn length_mask(&self) -> u16 {
        ((1u32 << self.length_bits) - 1) as u16
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::OFFSET11_LENGTH5
    }
}

/// Unvalidated, serializable shape of a [`CodecConfig`].
///
/// Missing `window_size` / `min_match_length` fall back to the full window
/// and [`DEFAULT_MIN_MATCH_LENGTH`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfigSpec {
    pub offset_bits: u8,
    pub length_bits: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_match_length: Option<usize>,
}

impl TryFrom<CodecConfigSpec> for CodecConfig {
    type Error = CodecError;

    fn try_from(spec: CodecConfigSpec) -> Result<Self> {
        let mut config = CodecConfig::new(spec.offset_bits, spec.length_bits)?;
        if let Some(window_size) = spec.window_size {
            config = config.with_window_size(window_size)?;
        }
        if let Some(min_match_length) = spec.min_match_length {
            config = config.with_min_match_length(min_match_length)?;
        }
        Ok(config)
    }
}

impl From<CodecConfig> for CodecConfigSpec {
    fn from(config: CodecConfig) -> Self {
        Self {
            offset_bits: config.offset_bits,
            length_bits: config.length_bits,
            window_size: Some(config.window_size),
            min_match_length: Some(config.min_match_length),
        }
    }
}
