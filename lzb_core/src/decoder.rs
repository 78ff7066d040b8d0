//! Operation-stream decoder.

use tracing::{debug, warn};

use crate::bits::{control_bit, unpack_field};
use crate::config::CodecConfig;
use crate::error::{CodecError, Result, StreamSection};
use crate::format::{CompressedBlock, BACK_REFERENCE_LEN};

/// What to do when the operations end before `uncompressed_size` bytes exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecodeMode {
    /// Return the buffer anyway; the unwritten tail stays zero.
    #[default]
    Lenient,
    /// Fail with [`CodecError::SizeMismatch`].
    Strict,
}

/// Decode `block` leniently.
pub fn decompress(block: &CompressedBlock, config: CodecConfig) -> Result<Vec<u8>> {
    decompress_with_mode(block, config, DecodeMode::Lenient)
}

/// Replay the operations of `block` into a fresh buffer of exactly
/// `uncompressed_size` bytes.
///
/// Decoding stops as soon as the buffer is full, even if operations remain.
/// Back-references are copied one byte at a time in increasing order, so a
/// source range that overlaps the destination (`offset < length`) repeats the
/// bytes just written.
pub fn decompress_with_mode(
    block: &CompressedBlock,
    config: CodecConfig,
    mode: DecodeMode,
) -> Result<Vec<u8>> {
    let size = block.uncompressed_size();
    let operation_count = block.operation_count();
    let bitmap = block.control_bitmap();
    let stream = block.field_stream();

    if mode == DecodeMode::Strict {
        let reachable = operation_count.saturating_mul(config.max_match_length());
        if reachable < size {
            return Err(CodecError::SizeMismatch {
                expected: size,
                actual: reachable,
            });
        }
    }

    let mut output = Vec::new();
    output
        .try_reserve_exact(size)
        .map_err(|_| CodecError::OutputAllocation { size })?;
    output.resize(size, 0);
    let mut out_pos = 0usize;
    let mut stream_pos = 0usize;

    let truncated = |section, op_index, stream_offset| CodecError::TruncatedStream {
        section,
        op_index,
        operation_count,
        stream_offset,
    };

    for op_index in 0..operation_count {
        if out_pos >= size {
            break;
        }
        let is_back_reference = control_bit(bitmap, op_index)
            .ok_or_else(|| truncated(StreamSection::Bitmap, op_index, stream_pos))?;

        if is_back_reference {
            let field = stream
                .get(stream_pos..stream_pos + BACK_REFERENCE_LEN)
                .map(|b| u16::from_le_bytes([b[0], b[1]]))
                .ok_or_else(|| truncated(StreamSection::FieldStream, op_index, stream_pos))?;
            let (offset, length) = unpack_field(field, &config);

            if offset > out_pos || length > size - out_pos {
                return Err(CodecError::InvalidBackReference {
                    op_index,
                    stream_offset: stream_pos,
                    offset,
                    length,
                    output_pos: out_pos,
                    uncompressed_size: size,
                });
            }
            for _ in 0..length {
                output[out_pos] = output[out_pos - offset];
                out_pos += 1;
            }
            stream_pos += BACK_REFERENCE_LEN;
        } else {
            let byte = *stream
                .get(stream_pos)
                .ok_or_else(|| truncated(StreamSection::FieldStream, op_index, stream_pos))?;
            output[out_pos] = byte;
            out_pos += 1;
            stream_pos += 1;
        }
    }

    if out_pos < size {
        match mode {
            DecodeMode::Strict => {
                return Err(CodecError::SizeMismatch {
                    expected: size,
                    actual: out_pos,
                })
            }
            DecodeMode::Lenient => warn!(
                expected = size,
                actual = out_pos,
                "block under-filled; returning zero-padded output"
            ),
        }
    }

    debug!(
        uncompressed_size = size,
        operation_count,
        field_stream_consumed = stream_pos,
        "decoded block"
    );
    Ok(output)
}
