mod error;
mod font;
mod image;
mod script;
mod table;
mod transform;

pub use error::{ContainerError, Result};
pub use font::{Font, FONT_MAGIC, FONT_WINDOW_SIZE};
pub use image::{GrVersion, Image, IMAGE_MAGIC, PALETTE_LEN};
pub use script::{Script, SCRIPT_MAGIC};
pub use table::{
    parse_table, table_listing, table_to_bytes, FunctionEntry, ResourceEntry, TableRecord,
    VariableEntry, NAME_LEN,
};
pub use transform::{invert_bytes, inverted};

use lzb_core::SectionReader;

/// A file format that embeds LZB block sections behind a fixed header.
///
/// Implementations only frame and unframe: the decoded sections are handed
/// back as bytes without interpreting pixels, glyphs, or tables.
pub trait Container: Sized {
    /// Stable short name for CLI display and error messages.
    const NAME: &'static str;

    /// Leading signature bytes.
    const MAGIC: &'static [u8];

    /// Parse and decompress a whole container.
    fn decode(bytes: &[u8]) -> Result<Self>;

    /// Compress and serialize a whole container.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decoded sections with file-name-friendly labels, in container order.
    fn sections(&self) -> Vec<(&'static str, &[u8])>;

    /// Human-readable listings of structured sections, labelled like
    /// [`Container::sections`]. Most containers have none.
    fn listings(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(Vec::new())
    }
}

/// Everything `unpack` extracts from one container.
#[derive(Debug, Clone, Default)]
pub struct Unpacked {
    pub sections: Vec<(&'static str, Vec<u8>)>,
    pub listings: Vec<(&'static str, String)>,
}

/// Container families recognized by [`ContainerKind::detect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Script,
    Font,
    Image,
}

impl ContainerKind {
    /// Resolve a container family from its leading signature.
    ///
    /// Called by the CLI when unpacking an arbitrary file, so the right
    /// decoder can be picked without the user naming it.
    pub fn detect(bytes: &[u8]) -> Result<Self> {
        if bytes.starts_with(Script::MAGIC) {
            Ok(ContainerKind::Script)
        } else if bytes.starts_with(Font::MAGIC) {
            Ok(ContainerKind::Font)
        } else if bytes.starts_with(Image::MAGIC) {
            Ok(ContainerKind::Image)
        } else {
            Err(ContainerError::Unrecognized(
                bytes[..bytes.len().min(4)].to_vec(),
            ))
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Script => Script::NAME,
            ContainerKind::Font => Font::NAME,
            ContainerKind::Image => Image::NAME,
        }
    }

    /// Decode `bytes` as this family and return its labelled sections and
    /// listings.
    pub fn unpack(&self, bytes: &[u8]) -> Result<Unpacked> {
        fn owned<C: Container>(c: &C) -> Result<Unpacked> {
            Ok(Unpacked {
                sections: c
                    .sections()
                    .into_iter()
                    .map(|(label, data)| (label, data.to_vec()))
                    .collect(),
                listings: c.listings()?,
            })
        }
        match self {
            ContainerKind::Script => owned(&Script::decode(bytes)?),
            ContainerKind::Font => owned(&Font::decode(bytes)?),
            ContainerKind::Image => owned(&Image::decode(bytes)?),
        }
    }
}

/// Consume `C::MAGIC` from the front of `reader`.
pub(crate) fn expect_magic<C: Container>(reader: &mut SectionReader<'_>) -> Result<()> {
    let found = reader.read_bytes(C::MAGIC.len())?;
    if found != C::MAGIC {
        return Err(ContainerError::BadMagic {
            container: C::NAME,
            expected: C::MAGIC,
            found: found.to_vec(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(b"COD\x00\x00", ContainerKind::Script; "script")]
    #[test_case(b"FN2\x10\x00", ContainerKind::Font; "font")]
    #[test_case(b"GR2\x10\x00", ContainerKind::Image; "image")]
    fn detect_by_magic(bytes: &[u8], kind: ContainerKind) {
        assert_eq!(ContainerKind::detect(bytes).unwrap(), kind);
    }

    #[test]
    fn unknown_signature_is_reported() {
        let err = ContainerKind::detect(b"PK\x03\x04rest").unwrap_err();
        assert!(matches!(err, ContainerError::Unrecognized(ref sig) if sig == b"PK\x03\x04"));
        assert!(ContainerKind::detect(b"").is_err());
    }
}
