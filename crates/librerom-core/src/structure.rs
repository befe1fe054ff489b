//! Structural discovery heuristics
//!
//! Three independent passes that look for format-level landmarks in a ROM:
//! self-referencing pointers (a stored word whose value equals its own
//! offset, a common anchor in this firmware family), runs of plausible
//! pointers, and cheap map-header signatures. All three emit candidates, not
//! certainties; the caller decides what to promote.
//!
//! Every threshold lives in [`StructureConfig`]. The defaults are tuned for
//! the legacy 32/64 KiB images but carry no deeper derivation.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::codec::{read_int, Endianness};
use crate::map::MapDescriptor;

/// Tuning knobs for the structural passes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureConfig {
    /// Keep only this many blocks per pass, longest first
    pub max_results: usize,

    /// Minimum qualifying words for a pointer-list run
    pub min_pointer_run: usize,

    /// Consecutive non-pointer words tolerated inside a run before it closes
    pub pointer_miss_budget: usize,

    /// Word values at or below this are too small to be real addresses
    pub address_guard: u16,

    /// Signature byte opening a heuristic map header
    pub header_tag: u8,

    /// Plausible axis point counts for a heuristic map header
    pub header_sizes: Vec<u8>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            max_results: 10,
            min_pointer_run: 4,
            pointer_miss_budget: 2,
            address_guard: 0x0010,
            header_tag: 0x10,
            header_sizes: vec![4, 6, 8, 10, 12, 16],
        }
    }
}

/// A run of consecutive 16-bit words flagged by a structural pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerBlock {
    /// Byte address of the first word in the run
    pub offset: usize,

    /// Number of words in the run
    pub length: usize,

    /// Byte order under which the words qualified
    pub endian: Endianness,
}

impl PointerBlock {
    /// Byte addresses of every word in the run
    pub fn word_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.length).map(move |i| self.offset + i * 2)
    }
}

/// Rank longest-first (ties by address) and cap to the configured volume
fn rank_and_cap(mut blocks: Vec<PointerBlock>, max_results: usize) -> Vec<PointerBlock> {
    blocks.sort_by(|a, b| b.length.cmp(&a.length).then(a.offset.cmp(&b.offset)));
    blocks.truncate(max_results);
    blocks
}

/// Scan for self-referencing pointers: 16-bit words at even offsets whose
/// value equals their own address, under either byte order. Consecutive
/// hits are grouped into one block. Addresses at or below the guard are
/// skipped: a zero word at offset 0 "self-references" in any image.
pub fn find_self_referencing(buf: &[u8], cfg: &StructureConfig) -> Vec<PointerBlock> {
    let mut blocks = Vec::new();

    for endian in [Endianness::Big, Endianness::Little] {
        let mut run_start: Option<usize> = None;
        let mut run_len = 0usize;
        let mut offset = 0usize;

        while offset + 2 <= buf.len() {
            let value = read_int(buf, offset, 16, endian);
            let hit = value as usize == offset && value > cfg.address_guard;

            if hit {
                if run_start.is_none() {
                    run_start = Some(offset);
                }
                run_len += 1;
            } else if let Some(start) = run_start.take() {
                blocks.push(PointerBlock {
                    offset: start,
                    length: run_len,
                    endian,
                });
                run_len = 0;
            }
            offset += 2;
        }
        if let Some(start) = run_start {
            blocks.push(PointerBlock {
                offset: start,
                length: run_len,
                endian,
            });
        }
    }

    rank_and_cap(blocks, cfg.max_results)
}

/// Collect every word address covered by a set of blocks, for use as the
/// anchor set of [`find_pointer_lists`]
pub fn anchor_addresses(blocks: &[PointerBlock]) -> HashSet<usize> {
    blocks.iter().flat_map(|b| b.word_offsets()).collect()
}

/// Scan for runs of words that look like a pointer table: each value is
/// either a plausible in-image address (above the guard, inside the buffer,
/// word-aligned) or one of the known anchors. Up to `pointer_miss_budget`
/// consecutive misses are absorbed so interleaved non-pointer words do not
/// split a real table; runs shorter than `min_pointer_run` are dropped.
pub fn find_pointer_lists(
    buf: &[u8],
    anchors: &HashSet<usize>,
    cfg: &StructureConfig,
) -> Vec<PointerBlock> {
    let mut blocks = Vec::new();

    for endian in [Endianness::Big, Endianness::Little] {
        let mut run_start: Option<usize> = None;
        let mut hits = 0usize;
        let mut misses = 0usize;
        let mut offset = 0usize;

        let mut close = |run_start: &mut Option<usize>, hits: &mut usize| {
            if let Some(start) = run_start.take() {
                if *hits >= cfg.min_pointer_run {
                    blocks.push(PointerBlock {
                        offset: start,
                        length: *hits,
                        endian,
                    });
                }
            }
            *hits = 0;
        };

        while offset + 2 <= buf.len() {
            let value = read_int(buf, offset, 16, endian);
            let address = value as usize;
            let plausible = value > cfg.address_guard && address < buf.len() && address % 2 == 0;
            let hit = plausible || anchors.contains(&address);

            if hit {
                if run_start.is_none() {
                    run_start = Some(offset);
                }
                hits += 1;
                misses = 0;
            } else if run_start.is_some() {
                misses += 1;
                if misses > cfg.pointer_miss_budget {
                    close(&mut run_start, &mut hits);
                    misses = 0;
                }
            }
            offset += 2;
        }
        close(&mut run_start, &mut hits);
    }

    rank_and_cap(blocks, cfg.max_results)
}

/// Last-resort map discovery: a tag byte followed by one (curve) or two
/// (table) allow-listed size bytes. Produces generic 8-bit candidates with
/// the identity formula; callers must tag these as low confidence.
pub fn find_map_headers(buf: &[u8], cfg: &StructureConfig) -> Vec<MapDescriptor> {
    let mut candidates = Vec::new();
    let mut offset = 0usize;

    while offset + 2 <= buf.len() && candidates.len() < cfg.max_results {
        if buf[offset] != cfg.header_tag || !cfg.header_sizes.contains(&buf[offset + 1]) {
            offset += 1;
            continue;
        }

        let first = buf[offset + 1] as usize;
        let second = buf
            .get(offset + 2)
            .filter(|b| cfg.header_sizes.contains(b))
            .map(|&b| b as usize);

        let map = match second {
            Some(cols) => {
                MapDescriptor::table(format!("candidate_{:04x}", offset), offset + 3, first, cols, 8)
            }
            None => MapDescriptor::curve(format!("candidate_{:04x}", offset), offset + 2, first, 8),
        };

        // Skip past the assumed data block so one signature does not spawn
        // a pile of overlapping candidates.
        offset = map.offset + map.byte_len();
        candidates.push(map);
    }

    candidates
}
