//! Greedy longest-match encoder.
//!
//! Each step either emits the longest run found in the look-back window as a
//! back-reference, or a single literal byte when no run reaches
//! `min_match_length`. Ties between equally long runs go to the nearest
//! source so offsets stay small.

use tracing::debug;

use crate::bits::{pack_field, ControlBitsWriter};
use crate::config::CodecConfig;
use crate::format::CompressedBlock;

/// Bytes hashed to index a position in the chain.
const HASH_LEN: usize = 3;
const HASH_BITS: u32 = 15;
const HASH_SIZE: usize = 1 << HASH_BITS;
const NIL: usize = usize::MAX;

/// A run found in the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Match {
    offset: usize,
    length: usize,
}

/// Compress `input` into a single block. Never fails.
pub fn compress(input: &[u8], config: CodecConfig) -> CompressedBlock {
    let finder = if config.min_match_length() >= HASH_LEN {
        MatchFinder::HashChain(HashChain::new(input))
    } else {
        MatchFinder::Scan
    };
    encode(input, &config, finder)
}

fn encode(input: &[u8], config: &CodecConfig, mut finder: MatchFinder) -> CompressedBlock {
    let mut bits = ControlBitsWriter::with_capacity(input.len());
    let mut fields = Vec::with_capacity(input.len() + input.len() / 8);
    let mut back_references = 0usize;
    let mut pos = 0;

    while pos < input.len() {
        let step = match finder.longest_match(input, pos, config) {
            Some(m) if m.length >= config.min_match_length() => {
                bits.push(true);
                fields.extend_from_slice(&pack_field(m.offset, m.length, config).to_le_bytes());
                back_references += 1;
                m.length
            }
            _ => {
                bits.push(false);
                fields.push(input[pos]);
                1
            }
        };
        finder.insert(input, pos, pos + step);
        pos += step;
    }

    let operation_count = bits.len();
    debug!(
        input_len = input.len(),
        operation_count,
        back_references,
        field_stream_len = fields.len(),
        offset_bits = config.offset_bits(),
        length_bits = config.length_bits(),
        "encoded block"
    );
    CompressedBlock::from_parts(input.len(), operation_count, bits.into_bytes(), fields)
}

/// Number of equal bytes at `src` and `pos`, up to `cap`.
///
/// `src < pos`, so the source may run into the bytes being matched; that is
/// the self-overlapping copy the decoder replays byte by byte.
#[inline]
fn run_length(input: &[u8], src: usize, pos: usize, cap: usize) -> usize {
    input[src..]
        .iter()
        .zip(&input[pos..pos + cap])
        .take_while(|(a, b)| a == b)
        .count()
}

enum MatchFinder {
    /// Candidates come from a hash of the next three bytes.
    HashChain(HashChain),
    /// Every offset in the window is tried, nearest first.
    Scan,
}

impl MatchFinder {
    fn longest_match(&self, input: &[u8], pos: usize, config: &CodecConfig) -> Option<Match> {
        let cap = config.max_match_length().min(input.len() - pos);
        match self {
            MatchFinder::HashChain(chain) => chain.longest_match(input, pos, cap, config.window_size()),
            MatchFinder::Scan => scan(input, pos, cap, config.window_size()),
        }
    }

    fn insert(&mut self, input: &[u8], from: usize, to: usize) {
        if let MatchFinder::HashChain(chain) = self {
            for p in from..to {
                chain.insert(input, p);
            }
        }
    }
}

fn scan(input: &[u8], pos: usize, cap: usize, window_size: usize) -> Option<Match> {
    let mut best: Option<Match> = None;
    for offset in 1..=window_size.min(pos) {
        let length = run_length(input, pos - offset, pos, cap);
        if length > best.map_or(0, |m| m.length) {
            best = Some(Match { offset, length });
            if length == cap {
                break;
            }
        }
    }
    best
}

/// Hash-chain index over positions already passed by the encoder.
///
/// `head[h]` holds the most recent position whose next three bytes hash to
/// `h`; `prev[p]` links to the previous position with the same hash. Walking
/// a chain therefore visits candidates nearest first.
struct HashChain {
    head: Vec<usize>,
    prev: Vec<usize>,
}

impl HashChain {
    fn new(input: &[u8]) -> Self {
        Self {
            head: vec![NIL; HASH_SIZE],
            prev: vec![NIL; input.len()],
        }
    }

    #[inline]
    fn hash(bytes: &[u8]) -> usize {
        let v = (bytes[0] as u32) << 16 | (bytes[1] as u32) << 8 | bytes[2] as u32;
        (v.wrapping_mul(0x9E37_79B1) >> (32 - HASH_BITS)) as usize
    }

    fn insert(&mut self, input: &[u8], pos: usize) {
        if pos + HASH_LEN > input.len() {
            return;
        }
        let h = Self::hash(&input[pos..]);
        self.prev[pos] = self.head[h];
        self.head[h] = pos;
    }

    fn longest_match(&self, input: &[u8], pos: usize, cap: usize, window_size: usize) -> Option<Match> {
        if cap < HASH_LEN {
            return None;
        }
        let mut best: Option<Match> = None;
        let mut candidate = self.head[Self::hash(&input[pos..])];
        while candidate != NIL && pos - candidate <= window_size {
            let length = run_length(input, candidate, pos, cap);
            if length > best.map_or(0, |m| m.length) {
                best = Some(Match {
                    offset: pos - candidate,
                    length,
                });
                if length == cap {
                    break;
                }
            }
            candidate = self.prev[candidate];
        }
        best
    }
}
