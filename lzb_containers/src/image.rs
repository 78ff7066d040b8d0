use lzb_core::{Codec, CodecConfig, CompressedBlock, SectionReader, SectionWriter};
use tracing::debug;

use crate::error::{ContainerError, Result};
use crate::{expect_magic, Container};

/// Magic bytes of an image container; an ASCII version digit follows.
pub const IMAGE_MAGIC: &[u8; 2] = b"GR";

/// Trailing RGB palette of 8 bpp images: 256 entries of 3 bytes.
pub const PALETTE_LEN: usize = 0x300;

/// Image container revision, stored as the ASCII digit after the magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrVersion {
    /// Uncompressed pixels.
    Gr1,
    /// 11-bit offset / 5-bit length blocks.
    Gr2,
    /// 13-bit offset / 3-bit length blocks.
    Gr3,
}

impl GrVersion {
    pub fn from_digit(digit: u8) -> Result<Self> {
        match digit {
            b'1' => Ok(GrVersion::Gr1),
            b'2' => Ok(GrVersion::Gr2),
            b'3' => Ok(GrVersion::Gr3),
            _ => Err(ContainerError::UnsupportedVersion {
                container: Image::NAME,
                version: digit,
            }),
        }
    }

    pub fn digit(&self) -> u8 {
        match self {
            GrVersion::Gr1 => b'1',
            GrVersion::Gr2 => b'2',
            GrVersion::Gr3 => b'3',
        }
    }

    /// Codec variant of compressed revisions; `None` for raw GR1.
    pub fn config(&self) -> Option<CodecConfig> {
        match self {
            GrVersion::Gr1 => None,
            GrVersion::Gr2 => Some(CodecConfig::OFFSET11_LENGTH5),
            GrVersion::Gr3 => Some(CodecConfig::OFFSET13_LENGTH3),
        }
    }
}

/// Indexed-color or direct-color image blob.
///
/// # Layout
/// ```text
/// GR1: "GR1" | bpp:u16 | width:u32 | height:u32 | pixels
/// GR2/GR3: "GR" digit | bpp:u16 | width:u32 | height:u32 | unpacked_size:u32
///          | operation_count:u32 | bitmap | reserved:u32 | field_stream (rest)
/// ```
/// The uncompressed size sits in the header rather than in the block section,
/// and the word where a stream length would go is reserved (written as zero,
/// ignored on read). `pixels` is kept as stored, palette included for 8 bpp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub version: GrVersion,
    pub bpp: u16,
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Image {
    /// Uncompressed payload length implied by the dimensions.
    pub fn raw_len(bpp: u16, width: u32, height: u32) -> Result<usize> {
        if !matches!(bpp, 8 | 16 | 24 | 32) {
            return Err(ContainerError::UnsupportedDepth(bpp));
        }
        let overflow = || ContainerError::DimensionsOverflow {
            container: Self::NAME,
            width,
            height,
            bpp,
        };
        let palette = if bpp == 8 { PALETTE_LEN as u64 } else { 0 };
        let len = (width as u64)
            .checked_mul(height as u64)
            .and_then(|px| px.checked_mul(bpp as u64 / 8))
            .and_then(|n| n.checked_add(palette))
            .ok_or_else(overflow)?;
        usize::try_from(len).map_err(|_| overflow())
    }
}

impl Container for Image {
    const NAME: &'static str = "image";
    const MAGIC: &'static [u8] = IMAGE_MAGIC;

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = SectionReader::new(bytes);
        expect_magic::<Self>(&mut reader)?;
        let version = GrVersion::from_digit(reader.read_u8()?)?;
        let bpp = reader.read_u16()?;
        let width = reader.read_u32()?;
        let height = reader.read_u32()?;

        let pixels = match version.config() {
            None => {
                let len = Self::raw_len(bpp, width, height)?;
                reader.read_bytes(len)?.to_vec()
            }
            Some(config) => {
                let unpacked_size = reader.read_len()?;
                let operation_count = reader.read_len()?;
                let bitmap = reader.read_bitmap(operation_count)?.to_vec();
                let _reserved = reader.read_u32()?;
                let field_stream = reader.rest().to_vec();
                let block =
                    CompressedBlock::from_parts(unpacked_size, operation_count, bitmap, field_stream);
                Codec::new(config).decompress(&block)?
            }
        };
        debug!(?version, bpp, width, height, len = pixels.len(), "decoded image");

        Ok(Self {
            version,
            bpp,
            width,
            height,
            pixels,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let expected = Self::raw_len(self.bpp, self.width, self.height)?;
        if self.pixels.len() != expected {
            return Err(ContainerError::PayloadSize {
                container: Self::NAME,
                expected,
                actual: self.pixels.len(),
            });
        }

        let mut writer = SectionWriter::new();
        writer.write_bytes(IMAGE_MAGIC);
        writer.write_u8(self.version.digit());
        writer.write_u16(self.bpp);
        writer.write_u32(self.width);
        writer.write_u32(self.height);

        match self.version.config() {
            None => writer.write_bytes(&self.pixels),
            Some(config) => {
                let block = Codec::new(config).compress(&self.pixels);
                writer.write_len("unpacked_size", block.uncompressed_size())?;
                writer.write_len("operation_count", block.operation_count())?;
                writer.write_bytes(block.control_bitmap());
                writer.write_u32(0);
                writer.write_bytes(block.field_stream());
            }
        }
        Ok(writer.into_bytes())
    }

    fn sections(&self) -> Vec<(&'static str, &[u8])> {
        vec![("pixels", self.pixels.as_slice())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lzb_core::CodecError;
    use test_case::test_case;

    /// RGB565 gradient with flat rows, 2 bytes per pixel.
    fn rgb565(width: u32, height: u32) -> Vec<u8> {
        (0..width * height)
            .flat_map(|i| {
                let px = ((i / width) as u16 & 0x1F) << 11 | 0x07E0;
                px.to_le_bytes()
            })
            .collect()
    }

    #[test_case(GrVersion::Gr1; "raw")]
    #[test_case(GrVersion::Gr2; "offset 11 length 5")]
    #[test_case(GrVersion::Gr3; "offset 13 length 3")]
    fn round_trip(version: GrVersion) {
        let image = Image {
            version,
            bpp: 16,
            width: 24,
            height: 10,
            pixels: rgb565(24, 10),
        };
        let bytes = image.encode().unwrap();
        assert_eq!(&bytes[..3], &[b'G', b'R', version.digit()]);
        assert_eq!(Image::decode(&bytes).unwrap(), image);
    }

    #[test]
    fn compressed_header_layout() {
        let image = Image {
            version: GrVersion::Gr2,
            bpp: 16,
            width: 2,
            height: 1,
            pixels: vec![1, 2, 3, 4],
        };
        let bytes = image.encode().unwrap();
        assert_eq!(
            bytes,
            vec![
                b'G', b'R', b'2', 16, 0, // magic, version, bpp
                2, 0, 0, 0, 1, 0, 0, 0, // width, height
                4, 0, 0, 0, // unpacked_size
                4, 0, 0, 0, // operation_count
                0, // bitmap
                0, 0, 0, 0, // reserved
                1, 2, 3, 4, // field stream
            ]
        );
    }

    #[test]
    fn gr3_fields_use_three_length_bits() {
        // "abcde" then field 0x0023: offset 5, length 4 under 13/3.
        let mut bytes = b"GR3".to_vec();
        bytes.extend([32, 0, 3, 0, 0, 0, 1, 0, 0, 0]);
        bytes.extend([12, 0, 0, 0, 6, 0, 0, 0, 0b10_0000, 0, 0, 0, 0]);
        bytes.extend(b"abcde\x23\x00");
        let image = Image::decode(&bytes).unwrap();
        assert_eq!(image.pixels, b"abcdeabcd\0\0\0");
    }

    #[test]
    fn indexed_color_includes_palette() {
        assert_eq!(Image::raw_len(8, 4, 4).unwrap(), 16 + PALETTE_LEN);
        assert_eq!(Image::raw_len(24, 4, 4).unwrap(), 48);
        assert!(matches!(
            Image::raw_len(12, 4, 4),
            Err(ContainerError::UnsupportedDepth(12))
        ));
    }

    #[test]
    fn payload_size_must_match_dimensions() {
        let image = Image {
            version: GrVersion::Gr3,
            bpp: 32,
            width: 2,
            height: 2,
            pixels: vec![0; 15],
        };
        assert!(matches!(
            image.encode(),
            Err(ContainerError::PayloadSize { expected: 16, actual: 15, .. })
        ));
    }

    #[test]
    fn unknown_version_digit_is_rejected() {
        assert!(matches!(
            Image::decode(b"GR9\x10\x00").unwrap_err(),
            ContainerError::UnsupportedVersion { version: b'9', .. }
        ));
    }

    #[test]
    fn short_raw_payload_is_truncated_input() {
        let mut bytes = b"GR1".to_vec();
        bytes.extend([16, 0, 2, 0, 0, 0, 2, 0, 0, 0]);
        bytes.extend([0; 5]);
        assert!(matches!(
            Image::decode(&bytes).unwrap_err(),
            ContainerError::Codec(CodecError::TruncatedInput {
                offset: 13,
                needed: 8,
                available: 5
            })
        ));
    }
}
