pub mod bits;
pub mod codec;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod format;
pub mod reader;
pub mod writer;

pub use codec::Codec;
pub use config::{CodecConfig, CodecConfigSpec};
pub use decoder::{decompress, decompress_with_mode, DecodeMode};
pub use encoder::compress;
pub use error::{CodecError, StreamSection};
pub use format::{BlockStats, CompressedBlock, Framing};
pub use reader::SectionReader;
pub use writer::SectionWriter;
