use lzb_core::{Codec, CodecConfig, Framing, SectionReader, SectionWriter};
use tracing::trace;

use crate::error::Result;
use crate::table::{parse_table, table_listing, FunctionEntry, ResourceEntry, VariableEntry};
use crate::transform::{invert_bytes, inverted};
use crate::{expect_magic, Container};

/// Magic bytes of a compiled script container.
pub const SCRIPT_MAGIC: &[u8; 3] = b"COD";

/// Labels of the four sections, in file order.
const SECTION_LABELS: [&str; 4] = ["code", "functions", "variables", "resources"];

/// Compiled script: bytecode plus three symbol tables.
///
/// # Layout
/// ```text
/// "COD" | block(code) | block(functions) | block(variables) | block(resources)
/// ```
/// Every block uses [`Framing::Prefixed`] and the 11/5 split. Section bytes
/// are stored bitwise-inverted; the fields here hold them already restored.
/// The three tables are kept as bytes and parsed on demand with
/// [`Script::functions`], [`Script::variables`], and [`Script::resources`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Script {
    pub code: Vec<u8>,
    pub functions: Vec<u8>,
    pub variables: Vec<u8>,
    pub resources: Vec<u8>,
}

impl Script {
    fn codec() -> Codec {
        Codec::new(CodecConfig::OFFSET11_LENGTH5)
    }

    pub fn functions(&self) -> Result<Vec<FunctionEntry>> {
        parse_table(&self.functions)
    }

    pub fn variables(&self) -> Result<Vec<VariableEntry>> {
        parse_table(&self.variables)
    }

    pub fn resources(&self) -> Result<Vec<ResourceEntry>> {
        parse_table(&self.resources)
    }
}

impl Container for Script {
    const NAME: &'static str = "script";
    const MAGIC: &'static [u8] = SCRIPT_MAGIC;

    fn decode(bytes: &[u8]) -> Result<Self> {
        let mut reader = SectionReader::new(bytes);
        expect_magic::<Self>(&mut reader)?;

        let codec = Self::codec();
        let mut sections: [Vec<u8>; 4] = Default::default();
        for (label, section) in SECTION_LABELS.iter().zip(sections.iter_mut()) {
            let offset = reader.position();
            let block = reader.read_block(Framing::Prefixed)?;
            *section = codec.decompress(&block)?;
            invert_bytes(section);
            trace!(section = label, offset, len = section.len(), "decoded script section");
        }

        let [code, functions, variables, resources] = sections;
        Ok(Self {
            code,
            functions,
            variables,
            resources,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let codec = Self::codec();
        let mut writer = SectionWriter::new();
        writer.write_bytes(SCRIPT_MAGIC);
        for (_, section) in self.sections() {
            let block = codec.compress(&inverted(section));
            writer.write_block(&block, Framing::Prefixed)?;
        }
        Ok(writer.into_bytes())
    }

    fn sections(&self) -> Vec<(&'static str, &[u8])> {
        let data = [&self.code, &self.functions, &self.variables, &self.resources];
        SECTION_LABELS
            .iter()
            .zip(data)
            .map(|(label, bytes)| (*label, bytes.as_slice()))
            .collect()
    }

    fn listings(&self) -> Result<Vec<(&'static str, String)>> {
        Ok(vec![
            ("functions", table_listing(&self.functions()?)),
            ("variables", table_listing(&self.variables()?)),
            ("resources", table_listing(&self.resources()?)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ContainerError;
    use crate::table::table_to_bytes;
    use lzb_core::{CodecError, CompressedBlock};

    fn sample() -> Script {
        Script {
            code: b"\x01\x02\x03push push push call call call ret".to_vec(),
            functions: b"main\0\0\0\0".repeat(3),
            variables: Vec::new(),
            resources: b"bg01.grp\0".to_vec(),
        }
    }

    #[test]
    fn round_trip() {
        let script = sample();
        let bytes = script.encode().unwrap();
        assert!(bytes.starts_with(b"COD"));
        assert_eq!(Script::decode(&bytes).unwrap(), script);
    }

    #[test]
    fn sections_are_stored_inverted() {
        let script = Script {
            code: vec![0x00, 0x0F],
            ..Default::default()
        };
        let bytes = script.encode().unwrap();
        let (block, _) = CompressedBlock::parse(&bytes[3..], Framing::Prefixed).unwrap();
        assert_eq!(block.field_stream(), &[0xFF, 0xF0]);
    }

    #[test]
    fn hand_built_container_decodes() {
        // One literal 0xBE (inverted 'A'), then three empty sections.
        let mut bytes = b"COD".to_vec();
        bytes.extend([1, 0, 0, 0, 1, 0, 0, 0, 0b0, 1, 0, 0, 0, 0xBE]);
        for _ in 0..3 {
            bytes.extend([0u8; 12]);
        }
        let script = Script::decode(&bytes).unwrap();
        assert_eq!(script.code, b"A");
        assert!(script.functions.is_empty());
    }

    #[test]
    fn missing_section_is_truncated_input() {
        let bytes = sample().encode().unwrap();
        let cut = &bytes[..bytes.len() - 5];
        assert!(matches!(
            Script::decode(cut).unwrap_err(),
            ContainerError::Codec(CodecError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn tables_parse_after_inversion() {
        let functions = vec![
            FunctionEntry {
                name: "main".into(),
                data: 0,
            },
            FunctionEntry {
                name: "on_click".into(),
                data: 0x1A4,
            },
        ];
        let variables = vec![VariableEntry {
            name: "flag_ending".into(),
            type_value: 1,
        }];
        let script = Script {
            code: b"\x10\x20\x30".to_vec(),
            functions: table_to_bytes(&functions).unwrap(),
            variables: table_to_bytes(&variables).unwrap(),
            resources: Vec::new(),
        };

        let decoded = Script::decode(&script.encode().unwrap()).unwrap();
        assert_eq!(decoded.functions().unwrap(), functions);
        assert_eq!(decoded.variables().unwrap(), variables);
        assert!(decoded.resources().unwrap().is_empty());

        let listings = decoded.listings().unwrap();
        assert_eq!(listings[0].0, "functions");
        assert!(listings[0].1.ends_with("[1] name: on_click, data: 420\n"));
        assert_eq!(listings[2].1, "count: 0\n\n");
    }

    #[test]
    fn short_table_is_truncated_input() {
        let script = Script {
            functions: vec![5, 0, 0, 0, b'm', b'a'],
            ..Default::default()
        };
        assert!(matches!(
            script.functions().unwrap_err(),
            ContainerError::Codec(CodecError::TruncatedInput { offset: 4, .. })
        ));
        assert!(script.listings().is_err());
    }

    #[test]
    fn wrong_magic_is_rejected() {
        assert!(matches!(
            Script::decode(b"FN2\0\0\0\0").unwrap_err(),
            ContainerError::BadMagic { container: "script", .. }
        ));
    }
}
