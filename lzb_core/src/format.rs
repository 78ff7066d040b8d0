//! Serialized block layout and block statistics.

use serde::{Deserialize, Serialize};

use crate::bits::{bitmap_len, control_bit};
use crate::error::Result;
use crate::reader::SectionReader;
use crate::writer::SectionWriter;

/// Size of each u32 header field of a serialized block.
pub const SIZE_FIELD_LEN: usize = 4;

/// Bytes a literal contributes to the field stream.
pub const LITERAL_LEN: usize = 1;

/// Bytes a back-reference contributes to the field stream.
pub const BACK_REFERENCE_LEN: usize = 2;

// ── Framing ────────────────────────────────────────────────────────────────

/// How a block section is laid out inside a container.
///
/// ```text
/// Prefixed:  uncompressed_size:u32 | operation_count:u32 | bitmap | field_stream_size:u32 | field_stream
/// Remainder: uncompressed_size:u32 | operation_count:u32 | bitmap | field_stream (rest of section)
/// ```
///
/// All integers are little-endian; the bitmap is `ceil(operation_count / 8)` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Framing {
    /// The field stream carries its own u32 length (script and font containers).
    #[default]
    Prefixed,
    /// The field stream runs to the end of the section.
    Remainder,
}

// ── Block ──────────────────────────────────────────────────────────────────

/// One compressed block: header counts, control bitmap, and field stream.
///
/// Built once by the encoder or parsed from a container, then only read.
/// Nothing here is validated against the bitmap or stream lengths; the
/// decoder reports any inconsistency when it reaches it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompressedBlock {
    uncompressed_size: usize,
    operation_count: usize,
    control_bitmap: Vec<u8>,
    field_stream: Vec<u8>,
}

impl CompressedBlock {
    /// Assemble a block from its four sections.
    pub fn from_parts(
        uncompressed_size: usize,
        operation_count: usize,
        control_bitmap: Vec<u8>,
        field_stream: Vec<u8>,
    ) -> Self {
        Self {
            uncompressed_size,
            operation_count,
            control_bitmap,
            field_stream,
        }
    }

    /// Exact byte length of the original buffer.
    #[inline]
    pub fn uncompressed_size(&self) -> usize {
        self.uncompressed_size
    }

    /// Number of decode operations (literals plus back-references).
    #[inline]
    pub fn operation_count(&self) -> usize {
        self.operation_count
    }

    #[inline]
    pub fn control_bitmap(&self) -> &[u8] {
        &self.control_bitmap
    }

    #[inline]
    pub fn field_stream(&self) -> &[u8] {
        &self.field_stream
    }

    /// Bytes this block occupies once serialized with `framing`.
    pub fn serialized_len(&self, framing: Framing) -> usize {
        let prefix = match framing {
            Framing::Prefixed => SIZE_FIELD_LEN,
            Framing::Remainder => 0,
        };
        2 * SIZE_FIELD_LEN + self.control_bitmap.len() + prefix + self.field_stream.len()
    }

    /// Serialize as a standalone section.
    pub fn to_bytes(&self, framing: Framing) -> Result<Vec<u8>> {
        let mut writer = SectionWriter::with_capacity(self.serialized_len(framing));
        writer.write_block(self, framing)?;
        Ok(writer.into_bytes())
    }

    /// Parse one section from the start of `bytes`.
    ///
    /// Returns the block and the number of bytes consumed. With
    /// [`Framing::Remainder`] that is always `bytes.len()`.
    pub fn parse(bytes: &[u8], framing: Framing) -> Result<(Self, usize)> {
        let mut reader = SectionReader::new(bytes);
        let block = reader.read_block(framing)?;
        Ok((block, reader.position()))
    }

    /// Literal / back-reference counts, taken from the bitmap alone.
    pub fn stats(&self) -> BlockStats {
        let back_references = (0..self.operation_count)
            .map_while(|i| control_bit(&self.control_bitmap, i))
            .filter(|&is_ref| is_ref)
            .count();
        BlockStats {
            uncompressed_size: self.uncompressed_size,
            operation_count: self.operation_count,
            back_references,
            literals: self.operation_count - back_references,
            bitmap_len: self.control_bitmap.len(),
            expected_bitmap_len: bitmap_len(self.operation_count),
            field_stream_len: self.field_stream.len(),
        }
    }
}

// ── Statistics ─────────────────────────────────────────────────────────────

/// Summary of a block, for inspection output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStats {
    pub uncompressed_size: usize,
    pub operation_count: usize,
    pub back_references: usize,
    /// Operations not flagged as back-references, including any the bitmap
    /// is too short to describe.
    pub literals: usize,
    pub bitmap_len: usize,
    /// Bitmap length implied by `operation_count`.
    pub expected_bitmap_len: usize,
    pub field_stream_len: usize,
}

impl BlockStats {
    /// Field stream length the operation mix implies.
    pub fn expected_field_stream_len(&self) -> usize {
        self.literals * LITERAL_LEN + self.back_references * BACK_REFERENCE_LEN
    }

    /// Bitmap plus field stream, without the header fields.
    pub fn payload_len(&self) -> usize {
        self.bitmap_len + self.field_stream_len
    }

    /// Compression ratio (raw / payload).
    pub fn ratio(&self) -> f64 {
        let payload = self.payload_len();
        if payload == 0 {
            return 1.0;
        }
        self.uncompressed_size as f64 / payload as f64
    }
}
