use crate::error::{CodecError, Result};
use crate::format::{CompressedBlock, Framing};

/// Append-only builder for container buffers.
///
/// # Write contract
/// Header fields and block sections are appended in call order. Lengths go
/// through [`write_len`], which refuses values that do not fit the u32
/// fields of the on-disk layout instead of truncating them.
///
/// [`write_len`]: SectionWriter::write_len
#[derive(Debug, Default)]
pub struct SectionWriter {
    buf: Vec<u8>,
}

impl SectionWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write `value` as a u32 length field named `field`.
    pub fn write_len(&mut self, field: &'static str, value: usize) -> Result<()> {
        let value32 = u32::try_from(value).map_err(|_| CodecError::BlockTooLarge { field, value })?;
        self.write_u32(value32);
        Ok(())
    }

    /// Append one block section laid out per `framing`.
    pub fn write_block(&mut self, block: &CompressedBlock, framing: Framing) -> Result<()> {
        self.write_len("uncompressed_size", block.uncompressed_size())?;
        self.write_len("operation_count", block.operation_count())?;
        self.write_bytes(block.control_bitmap());
        if framing == Framing::Prefixed {
            self.write_len("field_stream_size", block.field_stream().len())?;
        }
        self.write_bytes(block.field_stream());
        Ok(())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
