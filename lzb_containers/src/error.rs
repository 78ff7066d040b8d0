use lzb_core::CodecError;
use thiserror::Error;

/// Failures reading or writing a container.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// A block section or header field could not be read, or a block failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// The leading signature does not belong to the expected container.
    #[error("not a {container} container: expected magic {expected:02x?}, found {found:02x?}")]
    BadMagic {
        container: &'static str,
        expected: &'static [u8],
        found: Vec<u8>,
    },

    /// No known container starts with these bytes.
    #[error("unrecognized container signature {0:02x?}")]
    Unrecognized(Vec<u8>),

    #[error("unsupported {container} version {version}")]
    UnsupportedVersion { container: &'static str, version: u8 },

    #[error("unsupported bit depth {0} (expected 8, 16, 24, or 32)")]
    UnsupportedDepth(u16),

    /// The payload length disagrees with what the header dimensions imply.
    #[error("{container} payload is {actual} bytes but the header implies {expected}")]
    PayloadSize {
        container: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A table name is longer than its fixed field or contains NUL.
    #[error("table name {0:?} does not fit a 32-byte NUL-padded field")]
    InvalidName(String),

    /// Header dimensions overflow the payload size computation.
    #[error("{container} dimensions {width}x{height} at {bpp} bpp overflow")]
    DimensionsOverflow {
        container: &'static str,
        width: u32,
        height: u32,
        bpp: u16,
    },
}

pub type Result<T> = std::result::Result<T, ContainerError>;
