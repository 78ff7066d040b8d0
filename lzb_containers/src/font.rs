use lzb_core::{Codec, CodecConfig, Framing, SectionReader, SectionWriter};
use tracing::debug;

use crate::error::Result;
use crate::{expect_magic, Container};

/// Magic bytes of a bitmap font container.
pub const FONT_MAGIC: &[u8; 3] = b"FN2";

/// Look-back window used when writing font sheets.
pub const FONT_WINDOW_SIZE: usize = 1024;

/// Glyph sheet for one cell size.
///
/// # Layout
/// ```text
/// "FN2" | width:u16 | height:u16 | block(glyphs)
/// ```
/// The block uses [`Framing::Prefixed`] and the 11/5 split. `glyphs` is the
/// packed sheet exactly as stored; its pixel layout is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Font {
    /// Glyph cell width in pixels.
    pub width: u16,
    /// Glyph cell height in pixels.
    pub height: u16,
    pub glyphs: Vec<u8>,
}

impl Container for Font {
    const NAME: &'static str = "font";
    const MAGIC: &'static [u8] = FONT_MAGIC;

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = SectionReader::new(bytes);
        expect_magic::<Self>(&mut reader)?;
        let width = reader.read_u16()?;
        let height = reader.read_u16()?;
        let block = reader.read_block(Framing::Prefixed)?;
        let glyphs = Codec::new(CodecConfig::OFFSET11_LENGTH5).decompress(&block)?;
        debug!(width, height, len = glyphs.len(), "decoded font sheet");
        Ok(Self {
            width,
            height,
            glyphs,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let config = CodecConfig::OFFSET11_LENGTH5.with_window_size(FONT_WINDOW_SIZE)?;
        let block = Codec::new(config).compress(&self.glyphs);
        let mut writer = SectionWriter::with_capacity(7 + block.serialized_len(Framing::Prefixed));
        writer.write_bytes(FONT_MAGIC);
        writer.write_u16(self.width);
        writer.write_u16(self.height);
        writer.write_block(&block, Framing::Prefixed)?;
        Ok(writer.into_bytes())
    }

    fn sections(&self) -> Vec<(&'static str, &[u8])> {
        vec![("glyphs", self.glyphs.as_slice())]
    }
}
