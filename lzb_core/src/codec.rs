use crate::config::CodecConfig;
use crate::decoder::{decompress_with_mode, DecodeMode};
use crate::encoder::compress;
use crate::error::Result;
use crate::format::{CompressedBlock, Framing};

/// A codec variant plus the decode policy callers want.
///
/// Each `Codec`:
/// - Compresses and decompresses blocks independently, with no state carried
///   between calls, so one value can be shared across threads.
/// - Uses the same [`CodecConfig`] for both directions; a block decoded with a
///   different bit split than it was encoded with yields garbage or an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Codec {
    config: CodecConfig,
    mode: DecodeMode,
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self {
            config,
            mode: DecodeMode::Lenient,
        }
    }

    /// Treat an under-filled decode as an error.
    pub fn strict(self) -> Self {
        self.with_mode(DecodeMode::Strict)
    }

    pub fn with_mode(mut self, mode: DecodeMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> DecodeMode {
        self.mode
    }

    /// Compress a single independent block.
    pub fn compress(&self, raw: &[u8]) -> CompressedBlock {
        compress(raw, self.config)
    }

    /// Decompress a single independent block.
    pub fn decompress(&self, block: &CompressedBlock) -> Result<Vec<u8>> {
        decompress_with_mode(block, self.config, self.mode)
    }

    /// Compress and serialize as one section.
    pub fn compress_to_bytes(&self, raw: &[u8], framing: Framing) -> Result<Vec<u8>> {
        self.compress(raw).to_bytes(framing)
    }

    /// Parse one section from the start of `bytes` and decompress it.
    pub fn decompress_bytes(&self, bytes: &[u8], framing: Framing) -> Result<Vec<u8>> {
        let (block, _) = CompressedBlock::parse(bytes, framing)?;
        self.decompress(&block)
    }
}
