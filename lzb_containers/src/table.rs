//! Symbol tables carried by script containers.
//!
//! Each table is `count:u32` followed by `count` fixed-size records. Every
//! record starts with a 32-byte name, NUL-padded (a name filling all 32 bytes
//! has no terminator), followed by a little-endian value.

use std::fmt;

use lzb_core::{SectionReader, SectionWriter};

use crate::error::{ContainerError, Result};

/// Width of the name field of every record.
pub const NAME_LEN: usize = 32;

/// One fixed-size record of a script table.
pub trait TableRecord: Sized + fmt::Display {
    /// Record size in bytes, name included.
    const LEN: usize;

    fn read(reader: &mut SectionReader<'_>) -> Result<Self>;

    fn write(&self, writer: &mut SectionWriter) -> Result<()>;
}

/// Script function: name and entry point into the code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    pub name: String,
    pub data: u32,
}

/// Script variable: name and its type/initial value word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableEntry {
    pub name: String,
    pub type_value: u16,
}

/// Resource referenced by a script: file name and its data word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEntry {
    pub name: String,
    pub data: u32,
}

fn read_name(reader: &mut SectionReader<'_>) -> Result<String> {
    let raw = reader.read_bytes(NAME_LEN)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

fn write_name(writer: &mut SectionWriter, name: &str) -> Result<()> {
    let bytes = name.as_bytes();
    if bytes.len() > NAME_LEN || bytes.contains(&0) {
        return Err(ContainerError::InvalidName(name.to_owned()));
    }
    writer.write_bytes(bytes);
    writer.write_bytes(&[0; NAME_LEN][bytes.len()..]);
    Ok(())
}

impl TableRecord for FunctionEntry {
    const LEN: usize = NAME_LEN + 4;

    fn read(reader: &mut SectionReader<'_>) -> Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            data: reader.read_u32()?,
        })
    }

    fn write(&self, writer: &mut SectionWriter) -> Result<()> {
        write_name(writer, &self.name)?;
        writer.write_u32(self.data);
        Ok(())
    }
}

impl TableRecord for VariableEntry {
    const LEN: usize = NAME_LEN + 2;

    fn read(reader: &mut SectionReader<'_>) -> Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            type_value: reader.read_u16()?,
        })
    }

    fn write(&self, writer: &mut SectionWriter) -> Result<()> {
        write_name(writer, &self.name)?;
        writer.write_u16(self.type_value);
        Ok(())
    }
}

impl TableRecord for ResourceEntry {
    const LEN: usize = NAME_LEN + 4;

    fn read(reader: &mut SectionReader<'_>) -> Result<Self> {
        Ok(Self {
            name: read_name(reader)?,
            data: reader.read_u32()?,
        })
    }

    fn write(&self, writer: &mut SectionWriter) -> Result<()> {
        write_name(writer, &self.name)?;
        writer.write_u32(self.data);
        Ok(())
    }
}

impl fmt::Display for FunctionEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name: {}, data: {}", self.name, self.data)
    }
}

impl fmt::Display for VariableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name: {}, type/value: {}", self.name, self.type_value)
    }
}

impl fmt::Display for ResourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name: {}, data: {}", self.name, self.data)
    }
}

/// Parse a whole table. An empty section is an empty table.
///
/// A record count larger than the section holds fails with
/// `TruncatedInput` at the first missing record.
pub fn parse_table<T: TableRecord>(bytes: &[u8]) -> Result<Vec<T>> {
    if bytes.is_empty() {
        return Ok(Vec::new());
    }
    let mut reader = SectionReader::new(bytes);
    let count = reader.read_len()?;
    let mut entries = Vec::with_capacity(count.min(reader.remaining() / T::LEN));
    for _ in 0..count {
        entries.push(T::read(&mut reader)?);
    }
    Ok(entries)
}

/// Serialize `entries` as a table section.
pub fn table_to_bytes<T: TableRecord>(entries: &[T]) -> Result<Vec<u8>> {
    let mut writer = SectionWriter::with_capacity(4 + entries.len() * T::LEN);
    writer.write_len("table_count", entries.len())?;
    for entry in entries {
        entry.write(&mut writer)?;
    }
    Ok(writer.into_bytes())
}

/// Text listing: a count line, a blank line, then `[index] record` per entry.
pub fn table_listing<T: TableRecord>(entries: &[T]) -> String {
    let mut out = format!("count: {}\n\n", entries.len());
    for (i, entry) in entries.iter().enumerate() {
        out.push_str(&format!("[{i}] {entry}\n"));
    }
    out
}
