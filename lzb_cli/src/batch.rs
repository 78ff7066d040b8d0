//! Directory-at-a-time compression with a resumable checkpoint.
//!
//! Every regular file in the input directory becomes one framed block in the
//! output directory (`<name>.lzb`). Files are compressed in parallel, one
//! chunk at a time; the checkpoint is updated and persisted from the calling
//! thread between chunks.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use xxhash_rust::xxh3::xxh3_64;

use lzb_core::{Codec, CodecConfig, Framing};

/// Checkpoint file name inside the output directory.
pub const CHECKPOINT_FILE: &str = ".lzb-checkpoint.json";

/// Extension appended to each compressed output.
pub const OUTPUT_EXTENSION: &str = "lzb";

/// Progress of a batch run, persisted between runs.
///
/// Maps input file names to the xxh3 digest of the contents that were
/// compressed. Recorded entries are only trusted while the codec settings
/// stay the same.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub config: Option<CodecConfig>,
    pub framing: Option<Framing>,
    pub completed: BTreeMap<String, String>,
}

impl Checkpoint {
    /// Load from `path`, or start empty if the file does not exist yet.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading checkpoint {:?}", path))?;
        serde_json::from_str(&text).with_context(|| format!("parsing checkpoint {:?}", path))
    }

    /// Write to `path` via a temporary sibling so a crash never leaves half a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let tmp = path.with_extension("json.tmp");
        let text = serde_json::to_string_pretty(self)?;
        fs::write(&tmp, text).with_context(|| format!("writing checkpoint {:?}", tmp))?;
        fs::rename(&tmp, path).with_context(|| format!("replacing checkpoint {:?}", path))?;
        Ok(())
    }

    /// Drop recorded entries if they were produced with different settings.
    pub fn rebind(&mut self, config: CodecConfig, framing: Framing) {
        if self.config != Some(config) || self.framing != Some(framing) {
            if !self.completed.is_empty() {
                info!(entries = self.completed.len(), "codec settings changed, discarding checkpoint");
            }
            self.completed.clear();
            self.config = Some(config);
            self.framing = Some(framing);
        }
    }

    pub fn is_current(&self, name: &str, digest: u64) -> bool {
        self.completed.get(name).map(String::as_str) == Some(digest_hex(digest).as_str())
    }

    pub fn record(&mut self, name: String, digest: u64) {
        self.completed.insert(name, digest_hex(digest));
    }
}

pub fn digest_hex(digest: u64) -> String {
    format!("{:016x}", digest)
}

/// Totals of one batch run.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub compressed: usize,
    pub skipped: usize,
    pub raw_bytes: u64,
    pub output_bytes: u64,
    /// `(file name, error)` for every input that could not be processed.
    pub failed: Vec<(String, String)>,
}

enum Outcome {
    Compressed {
        name: String,
        digest: u64,
        raw: u64,
        written: u64,
    },
    Skipped,
    Failed {
        name: String,
        error: anyhow::Error,
    },
}

/// Regular files directly inside `dir`, sorted by name.
fn list_inputs(dir: &Path) -> anyhow::Result<Vec<(String, PathBuf)>> {
    let mut inputs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("listing {:?}", dir))? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            warn!(path = ?entry.path(), "skipping non-UTF-8 file name");
            continue;
        };
        inputs.push((name, entry.path()));
    }
    inputs.sort();
    Ok(inputs)
}

fn compress_one(
    name: &str,
    path: &Path,
    output_dir: &Path,
    codec: Codec,
    framing: Framing,
    checkpoint: &Checkpoint,
) -> anyhow::Result<Outcome> {
    let raw = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    let digest = xxh3_64(&raw);
    let output = output_dir.join(format!("{name}.{OUTPUT_EXTENSION}"));
    if checkpoint.is_current(name, digest) && output.exists() {
        debug!(name, "unchanged since last run");
        return Ok(Outcome::Skipped);
    }

    let bytes = codec.compress_to_bytes(&raw, framing)?;
    fs::write(&output, &bytes).with_context(|| format!("writing {:?}", output))?;
    debug!(name, raw = raw.len(), written = bytes.len(), "compressed");
    Ok(Outcome::Compressed {
        name: name.to_owned(),
        digest,
        raw: raw.len() as u64,
        written: bytes.len() as u64,
    })
}

/// Files compressed between checkpoint saves when no chunk size is given.
pub const DEFAULT_CHUNK_SIZE: usize = 64;

/// Compress every regular file of `input_dir` into `output_dir`.
///
/// Inputs are processed in chunks of `chunk_size` files, each chunk in
/// parallel. After every chunk the successful files are recorded in
/// `checkpoint` and `persist` is called with it, so an interrupted run keeps
/// the work of every finished chunk. An error from `persist` stops the run.
///
/// Files whose digest matches `checkpoint` and whose output still exists are
/// skipped. Failures are reported in the summary and left unrecorded so the
/// next run retries them.
pub fn run_batch(
    input_dir: &Path,
    output_dir: &Path,
    codec: Codec,
    framing: Framing,
    chunk_size: usize,
    checkpoint: &mut Checkpoint,
    mut persist: impl FnMut(&Checkpoint) -> anyhow::Result<()>,
) -> anyhow::Result<BatchSummary> {
    fs::create_dir_all(output_dir).with_context(|| format!("creating {:?}", output_dir))?;
    checkpoint.rebind(*codec.config(), framing);

    let inputs = list_inputs(input_dir)?;
    let mut summary = BatchSummary::default();
    for (chunk_index, chunk) in inputs.chunks(chunk_size.max(1)).enumerate() {
        let outcomes: Vec<Outcome> = {
            let checkpoint = &*checkpoint;
            chunk
                .par_iter()
                .map(|(name, path)| {
                    compress_one(name, path, output_dir, codec, framing, checkpoint)
                        .unwrap_or_else(|error| Outcome::Failed {
                            name: name.clone(),
                            error,
                        })
                })
                .collect()
        };

        for outcome in outcomes {
            match outcome {
                Outcome::Compressed {
                    name,
                    digest,
                    raw,
                    written,
                } => {
                    checkpoint.record(name, digest);
                    summary.compressed += 1;
                    summary.raw_bytes += raw;
                    summary.output_bytes += written;
                }
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed { name, error } => {
                    let message = format!("{error:#}");
                    warn!(%name, %message, "batch entry failed");
                    summary.failed.push((name, message));
                }
            }
        }

        persist(checkpoint)?;
        debug!(
            chunk = chunk_index,
            done = summary.compressed + summary.skipped + summary.failed.len(),
            total = inputs.len(),
            "checkpoint saved"
        );
    }
    Ok(summary)
}
