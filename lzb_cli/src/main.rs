mod batch;
mod logging;

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use xxhash_rust::xxh3::xxh3_64;

use lzb_containers::ContainerKind;
use lzb_core::{Codec, CodecConfig, CompressedBlock, DecodeMode, Framing};

use crate::batch::{digest_hex, run_batch, Checkpoint, CHECKPOINT_FILE, DEFAULT_CHUNK_SIZE};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "lzb",
    about = "Windowed back-reference codec: compress, decompress, inspect, and unpack LZB blocks",
    version
)]
struct Cli {
    /// Log more (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a raw file into one framed block
    Compress {
        /// Source file ("-" reads stdin)
        input: PathBuf,
        /// Destination block file ("-" writes stdout)
        output: PathBuf,
        #[command(flatten)]
        codec: CodecArgs,
    },
    /// Decompress one framed block back to raw bytes
    Decompress {
        /// Source block file ("-" reads stdin)
        input: PathBuf,
        /// Destination file ("-" writes stdout)
        output: PathBuf,
        #[command(flatten)]
        codec: CodecArgs,
        /// Fail if the operations produce fewer bytes than the header declares
        #[arg(long)]
        strict: bool,
    },
    /// Print block statistics and the digest of the decoded payload
    Inspect {
        /// Block file to inspect
        file: PathBuf,
        #[command(flatten)]
        codec: CodecArgs,
        #[arg(long)]
        strict: bool,
        /// Emit a JSON report on stdout
        #[arg(long)]
        json: bool,
    },
    /// Decode a script, font, or image container into its payload sections
    Unpack {
        /// Container file (type detected from its magic; "-" reads stdin)
        file: PathBuf,
        /// Directory for `<stem>.<section>.bin` files and script table listings
        out_dir: PathBuf,
    },
    /// Compress every file in a directory, resuming from a checkpoint
    Batch {
        input_dir: PathBuf,
        output_dir: PathBuf,
        #[command(flatten)]
        codec: CodecArgs,
        /// Files compressed between checkpoint saves
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Ignore any existing checkpoint and recompress everything
        #[arg(long)]
        fresh: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Preset {
    /// 11-bit offset, 5-bit length (2 KB window, 32-byte runs)
    #[value(name = "11-5")]
    Offset11Length5,
    /// 13-bit offset, 3-bit length (8 KB window, 8-byte runs)
    #[value(name = "13-3")]
    Offset13Length3,
}

#[derive(Clone, Copy, ValueEnum)]
enum FramingArg {
    /// Field stream preceded by its own u32 length
    Prefixed,
    /// Field stream runs to the end of the input
    Remainder,
}

impl From<FramingArg> for Framing {
    fn from(arg: FramingArg) -> Self {
        match arg {
            FramingArg::Prefixed => Framing::Prefixed,
            FramingArg::Remainder => Framing::Remainder,
        }
    }
}

#[derive(Args)]
struct CodecArgs {
    /// Bit split preset
    #[arg(long, value_enum, default_value_t = Preset::Offset11Length5, env = "LZB_PRESET")]
    preset: Preset,
    /// Offset bits of a custom split (with --length-bits)
    #[arg(long, requires = "length_bits")]
    offset_bits: Option<u8>,
    /// Length bits of a custom split (with --offset-bits)
    #[arg(long, requires = "offset_bits")]
    length_bits: Option<u8>,
    /// Look-back window in bytes (encoder only)
    #[arg(long)]
    window_size: Option<usize>,
    /// Shortest run emitted as a back-reference (encoder only)
    #[arg(long)]
    min_match: Option<usize>,
    /// JSON codec config file; replaces --preset and the bit flags
    #[arg(long, env = "LZB_CONFIG", conflicts_with_all = ["offset_bits", "length_bits"])]
    config: Option<PathBuf>,
    /// Block section layout
    #[arg(long, value_enum, default_value_t = FramingArg::Prefixed)]
    framing: FramingArg,
}

impl CodecArgs {
    fn resolve(&self) -> anyhow::Result<CodecConfig> {
        let mut config = if let Some(path) = &self.config {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading codec config {:?}", path))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing codec config {:?}", path))?
        } else if let (Some(offset_bits), Some(length_bits)) = (self.offset_bits, self.length_bits)
        {
            CodecConfig::new(offset_bits, length_bits)?
        } else {
            match self.preset {
                Preset::Offset11Length5 => CodecConfig::OFFSET11_LENGTH5,
                Preset::Offset13Length3 => CodecConfig::OFFSET13_LENGTH3,
            }
        };
        if let Some(window_size) = self.window_size {
            config = config.with_window_size(window_size)?;
        }
        if let Some(min_match) = self.min_match {
            config = config.with_min_match_length(min_match)?;
        }
        Ok(config)
    }

    fn codec(&self, strict: bool) -> anyhow::Result<Codec> {
        let mode = if strict {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        };
        Ok(Codec::new(self.resolve()?).with_mode(mode))
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_str() == Some("-")
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if is_stdio(path) {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf).context("reading stdin")?;
        Ok(buf)
    } else {
        fs::read(path).with_context(|| format!("reading input file {:?}", path))
    }
}

/// Write the whole result at once; nothing is written unless it is complete.
fn write_output(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if is_stdio(path) {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()?;
        Ok(())
    } else {
        fs::write(path, bytes).with_context(|| format!("writing output file {:?}", path))
    }
}

fn throughput(bytes: usize, started: Instant) -> String {
    let secs = started.elapsed().as_secs_f64().max(1e-9);
    format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_compress(input: PathBuf, output: PathBuf, args: CodecArgs) -> anyhow::Result<()> {
    let codec = args.codec(false)?;
    let framing = Framing::from(args.framing);
    let raw = read_input(&input)?;

    let t0 = Instant::now();
    let block = codec.compress(&raw);
    let bytes = block.to_bytes(framing)?;
    let stats = block.stats();
    write_output(&output, &bytes)?;

    let config = codec.config();
    eprintln!(
        "  split       : {}/{} (window {}, min match {})",
        config.offset_bits(),
        config.length_bits(),
        config.window_size(),
        config.min_match_length()
    );
    eprintln!("  operations  : {} ({} back-references)", stats.operation_count, stats.back_references);
    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!("  compressed  : {}", human_bytes(bytes.len() as u64));
    eprintln!("  ratio       : {:.2}x", stats.ratio());
    eprintln!("  throughput  : {}", throughput(raw.len(), t0));
    eprintln!("  elapsed     : {:.3}s", t0.elapsed().as_secs_f64());
    Ok(())
}

fn run_decompress(
    input: PathBuf,
    output: PathBuf,
    args: CodecArgs,
    strict: bool,
) -> anyhow::Result<()> {
    let codec = args.codec(strict)?;
    let bytes = read_input(&input)?;

    let t0 = Instant::now();
    let raw = codec
        .decompress_bytes(&bytes, args.framing.into())
        .with_context(|| format!("decoding {:?}", input))?;
    write_output(&output, &raw)?;

    eprintln!("  raw size    : {}", human_bytes(raw.len() as u64));
    eprintln!("  throughput  : {}", throughput(raw.len(), t0));
    eprintln!("  elapsed     : {:.3}s", t0.elapsed().as_secs_f64());
    Ok(())
}

#[derive(Serialize)]
struct InspectReport {
    file: String,
    config: CodecConfig,
    framing: Framing,
    section_len: usize,
    trailing_bytes: usize,
    uncompressed_size: usize,
    operation_count: usize,
    literals: usize,
    back_references: usize,
    bitmap_len: usize,
    field_stream_len: usize,
    ratio: f64,
    decoded_len: usize,
    xxh3: String,
}

fn inspect_block(file: &Path, args: &CodecArgs, strict: bool) -> anyhow::Result<InspectReport> {
    let codec = args.codec(strict)?;
    let framing = Framing::from(args.framing);
    let bytes = read_input(file)?;

    let (block, consumed) = CompressedBlock::parse(&bytes, framing)
        .with_context(|| format!("parsing block {:?}", file))?;
    let stats = block.stats();
    let decoded = codec
        .decompress(&block)
        .with_context(|| format!("decoding {:?}", file))?;

    let report = InspectReport {
        file: file.display().to_string(),
        config: *codec.config(),
        framing,
        section_len: consumed,
        trailing_bytes: bytes.len() - consumed,
        uncompressed_size: stats.uncompressed_size,
        operation_count: stats.operation_count,
        literals: stats.literals,
        back_references: stats.back_references,
        bitmap_len: stats.bitmap_len,
        field_stream_len: stats.field_stream_len,
        ratio: stats.ratio(),
        decoded_len: decoded.len(),
        xxh3: digest_hex(xxh3_64(&decoded)),
    };
    Ok(report)
}

fn run_inspect(file: PathBuf, args: CodecArgs, strict: bool, json: bool) -> anyhow::Result<()> {
    let report = inspect_block(&file, &args, strict)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("=== LZB block: {} ===", report.file);
    println!();
    println!(
        "  split          : {}/{}",
        report.config.offset_bits(),
        report.config.length_bits()
    );
    println!("  framing        : {:?}", report.framing);
    println!("  section        : {}", human_bytes(report.section_len as u64));
    if report.trailing_bytes > 0 {
        println!("  trailing bytes : {}", report.trailing_bytes);
    }
    println!("  raw size       : {}", human_bytes(report.uncompressed_size as u64));
    println!("  operations     : {}", report.operation_count);
    println!("    literals     : {}", report.literals);
    println!("    back-refs    : {}", report.back_references);
    println!("  bitmap         : {}", human_bytes(report.bitmap_len as u64));
    println!("  field stream   : {}", human_bytes(report.field_stream_len as u64));
    println!("  ratio          : {:.2}x", report.ratio);
    println!("  xxh3           : {}", report.xxh3);
    Ok(())
}

/// File name prefix for unpacked sections; stdin has no stem of its own.
fn output_stem(file: &Path) -> String {
    if is_stdio(file) {
        return "stdin".to_owned();
    }
    file.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("stdin")
        .to_owned()
}

fn run_unpack(file: PathBuf, out_dir: PathBuf) -> anyhow::Result<()> {
    let bytes = read_input(&file)?;
    let kind = ContainerKind::detect(&bytes).with_context(|| format!("detecting {:?}", file))?;
    let unpacked = kind
        .unpack(&bytes)
        .with_context(|| format!("decoding {} container {:?}", kind.name(), file))?;

    let stem = output_stem(&file);
    fs::create_dir_all(&out_dir).with_context(|| format!("creating {:?}", out_dir))?;

    eprintln!("  container   : {}", kind.name());
    for (label, data) in unpacked.sections {
        let path = out_dir.join(format!("{stem}.{label}.bin"));
        fs::write(&path, &data).with_context(|| format!("writing {:?}", path))?;
        eprintln!("  {:<11} : {} -> {:?}", label, human_bytes(data.len() as u64), path);
    }
    for (label, text) in unpacked.listings {
        let path = out_dir.join(format!("{stem}.{label}.txt"));
        fs::write(&path, text).with_context(|| format!("writing {:?}", path))?;
        eprintln!("  {:<11} : listing -> {:?}", label, path);
    }
    Ok(())
}

fn run_batch_command(
    input_dir: PathBuf,
    output_dir: PathBuf,
    args: CodecArgs,
    chunk_size: usize,
    fresh: bool,
) -> anyhow::Result<()> {
    let codec = args.codec(false)?;
    let checkpoint_path = output_dir.join(CHECKPOINT_FILE);
    let mut checkpoint = if fresh {
        Checkpoint::default()
    } else {
        Checkpoint::load(&checkpoint_path)?
    };

    let t0 = Instant::now();
    let summary = run_batch(
        &input_dir,
        &output_dir,
        codec,
        args.framing.into(),
        chunk_size,
        &mut checkpoint,
        |checkpoint| checkpoint.save(&checkpoint_path),
    )?;

    eprintln!("  compressed  : {} files", summary.compressed);
    eprintln!("  skipped     : {} files (unchanged)", summary.skipped);
    eprintln!("  raw size    : {}", human_bytes(summary.raw_bytes));
    eprintln!("  written     : {}", human_bytes(summary.output_bytes));
    eprintln!("  elapsed     : {:.3}s", t0.elapsed().as_secs_f64());

    if !summary.failed.is_empty() {
        for (name, error) in &summary.failed {
            eprintln!("  failed      : {}: {}", name, error);
        }
        anyhow::bail!("{} of the batch inputs failed", summary.failed.len());
    }
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.verbose);
    match cli.command {
        Commands::Compress {
            input,
            output,
            codec,
        } => run_compress(input, output, codec),
        Commands::Decompress {
            input,
            output,
            codec,
            strict,
        } => run_decompress(input, output, codec, strict),
        Commands::Inspect {
            file,
            codec,
            strict,
            json,
        } => run_inspect(file, codec, strict, json),
        Commands::Unpack { file, out_dir } => run_unpack(file, out_dir),
        Commands::Batch {
            input_dir,
            output_dir,
            codec,
            chunk_size,
            fresh,
        } => run_batch_command(input_dir, output_dir, codec, chunk_size, fresh),
    }
}
