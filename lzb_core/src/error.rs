//! Error types for the LZB codec.

use thiserror::Error;

/// Every failure the codec can report.
///
/// Decode-time variants carry the position at which the problem was found so
/// that callers can point at the offending byte of a container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The container is smaller than its header says it is.
    #[error("truncated input at byte {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    /// A back-reference points before the start of the output, or its copy
    /// would run past the declared uncompressed size.
    #[error(
        "invalid back-reference in operation {op_index} (field stream byte {stream_offset}): \
         offset {offset}, length {length} at output position {output_pos} of {uncompressed_size}"
    )]
    InvalidBackReference {
        op_index: usize,
        stream_offset: usize,
        offset: usize,
        length: usize,
        output_pos: usize,
        uncompressed_size: usize,
    },

    /// The control bitmap or the field stream ran out before
    /// `operation_count` operations were decoded.
    #[error(
        "truncated {section} in operation {op_index} of {operation_count} (field stream byte {stream_offset})"
    )]
    TruncatedStream {
        section: StreamSection,
        op_index: usize,
        operation_count: usize,
        stream_offset: usize,
    },

    /// The bit widths or window size do not describe a valid 16-bit field.
    #[error("codec config mismatch: {0}")]
    ConfigMismatch(String),

    /// Strict decoding finished all operations short of the declared size.
    ///
    /// When the operations cannot reach the declared size even as maximal
    /// back-references, this is reported before decoding with `actual` set to
    /// that upper bound.
    #[error("decoded {actual} bytes but block declares {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The output buffer for the declared size could not be allocated.
    #[error("cannot allocate {size} bytes for decoded output")]
    OutputAllocation { size: usize },

    /// A size does not fit into the u32 header fields of a serialized block.
    #[error("block too large to serialize: {field} = {value} exceeds u32")]
    BlockTooLarge { field: &'static str, value: usize },
}

/// Which part of a block ran dry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamSection {
    Bitmap,
    FieldStream,
}

impl std::fmt::Display for StreamSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamSection::Bitmap => f.write_str("control bitmap"),
            StreamSection::FieldStream => f.write_str("field stream"),
        }
    }
}

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
