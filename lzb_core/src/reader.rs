use tracing::trace;

use crate::bits::bitmap_len;
use crate::error::{CodecError, Result};
use crate::format::{CompressedBlock, Framing};

/// Forward-only cursor over a container buffer.
///
/// Containers are a fixed header followed by one or more block sections.
/// `SectionReader` reads the little-endian header fields and the block
/// sections in order, and turns every short read into
/// [`CodecError::TruncatedInput`] carrying the byte offset of the read.
///
/// # Access pattern
/// [`read_block`] parses one section per call. With [`Framing::Prefixed`] the
/// cursor stops exactly at the end of the section, so the next section or
/// trailing container data can be read straight after it.
///
/// [`read_block`]: SectionReader::read_block
#[derive(Debug, Clone)]
pub struct SectionReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> SectionReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Byte offset of the next read, from the start of the buffer.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(CodecError::TruncatedInput {
                offset: self.pos,
                needed: len,
                available,
            });
        }
        let slice = &self.bytes[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Everything after the cursor. The reader is empty afterwards.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        slice
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Read a u32 header field as a length.
    pub fn read_len(&mut self) -> Result<usize> {
        Ok(self.read_u32()? as usize)
    }

    /// Read the control bitmap for `operation_count` operations.
    pub fn read_bitmap(&mut self, operation_count: usize) -> Result<&'a [u8]> {
        self.read_bytes(bitmap_len(operation_count))
    }

    /// Parse one block section laid out per `framing`.
    pub fn read_block(&mut self, framing: Framing) -> Result<CompressedBlock> {
        let start = self.pos;
        let uncompressed_size = self.read_len()?;
        let operation_count = self.read_len()?;
        let bitmap = self.read_bitmap(operation_count)?;
        let field_stream = match framing {
            Framing::Prefixed => {
                let len = self.read_len()?;
                self.read_bytes(len)?
            }
            Framing::Remainder => self.rest(),
        };
        trace!(
            offset = start,
            uncompressed_size,
            operation_count,
            field_stream_len = field_stream.len(),
            ?framing,
            "read block section"
        );
        Ok(CompressedBlock::from_parts(
            uncompressed_size,
            operation_count,
            bitmap.to_vec(),
            field_stream.to_vec(),
        ))
    }
}
