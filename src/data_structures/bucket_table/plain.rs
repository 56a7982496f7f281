// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Plain bucket table: four literal tags per bucket.

use std::fmt::Write as _;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::{load_le, low_mask, store_le, BucketTable, Insertion, TableLayout, TAGS_PER_BUCKET};
use crate::error::{CuckooFilterError, Result};

pub(super) const SUPPORTED_WIDTHS: &[u32] = &[2, 4, 8, 12, 16, 32];

/// A bit-packed array of buckets where slot `j` of a bucket occupies bits
/// `[j * w, (j + 1) * w)` of the bucket's little-endian word.
#[derive(Debug, Clone)]
pub struct PlainTable {
    bits_per_tag: u32,
    bytes_per_bucket: usize,
    num_buckets: usize,
    tag_mask: u32,
    buckets: Vec<u8>,
    rng: ChaCha8Rng,
}

impl PlainTable {
    /// Creates a zeroed table.
    pub fn new(bits_per_tag: u32, num_buckets: usize, seed: u64) -> Result<Self> {
        if !SUPPORTED_WIDTHS.contains(&bits_per_tag) {
            return Err(CuckooFilterError::UnsupportedTagWidth {
                layout: TableLayout::Plain,
                bits: bits_per_tag,
            });
        }
        let bytes_per_bucket = (bits_per_tag as usize * TAGS_PER_BUCKET + 7) >> 3;

        Ok(Self {
            bits_per_tag,
            bytes_per_bucket,
            num_buckets,
            tag_mask: low_mask(bits_per_tag) as u32,
            buckets: vec![0u8; bytes_per_bucket * num_buckets],
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Reads the tag in slot `slot` of bucket `index`.
    pub fn read_tag(&self, index: usize, slot: usize) -> u32 {
        let word = self.read_word(index);
        (word >> (slot as u32 * self.bits_per_tag)) as u32 & self.tag_mask
    }

    /// Writes `tag` into slot `slot` of bucket `index`.
    pub fn write_tag(&mut self, index: usize, slot: usize, tag: u32) {
        let shift = slot as u32 * self.bits_per_tag;
        let mask = (self.tag_mask as u128) << shift;
        let word = (self.read_word(index) & !mask) | (((tag & self.tag_mask) as u128) << shift);
        store_le(&mut self.buckets, index * self.bytes_per_bucket, self.bytes_per_bucket, word);
    }

    /// Number of occupied slots in bucket `index`.
    pub fn num_tags_in_bucket(&self, index: usize) -> usize {
        (0..TAGS_PER_BUCKET)
            .filter(|&slot| self.read_tag(index, slot) != 0)
            .count()
    }

    fn read_word(&self, index: usize) -> u128 {
        load_le(&self.buckets, index * self.bytes_per_bucket, self.bytes_per_bucket)
    }

    /// First eight bytes of a bucket, for the lane-parallel search.
    fn read_lanes(&self, index: usize) -> u64 {
        load_le(&self.buckets, index * self.bytes_per_bucket, 8) as u64
    }

    fn find_in_bucket(&self, index: usize, tag: u32) -> bool {
        match lane_pattern(self.bits_per_tag) {
            Some((lows, highs)) => has_value(self.read_lanes(index), tag, lows, highs),
            None => (0..TAGS_PER_BUCKET).any(|slot| self.read_tag(index, slot) == tag),
        }
    }
}

/// Per-width constants for the "does any lane equal the target" trick: the
/// lowest bit and the highest bit of each of the four lanes.
fn lane_pattern(bits_per_tag: u32) -> Option<(u64, u64)> {
    match bits_per_tag {
        4 => Some((0x1111, 0x8888)),
        8 => Some((0x0101_0101, 0x8080_8080)),
        12 => Some((0x0010_0100_1001, 0x8008_0080_0800)),
        16 => Some((0x0001_0001_0001_0001, 0x8000_8000_8000_8000)),
        _ => None,
    }
}

/// Returns `true` if any lane of `word` equals `tag`.
///
/// XOR with the target tiled across all lanes turns matching lanes into zero
/// lanes, which `(x - lows) & !x & highs` detects.
#[inline]
fn has_value(word: u64, tag: u32, lows: u64, highs: u64) -> bool {
    let x = word ^ lows.wrapping_mul(tag as u64);
    (x.wrapping_sub(lows) & !x & highs) != 0
}

impl BucketTable for PlainTable {
    fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    fn bits_per_tag(&self) -> u32 {
        self.bits_per_tag
    }

    fn size_in_bytes(&self) -> usize {
        self.buckets.len()
    }

    fn insert_to_bucket(&mut self, index: usize, tag: u32, kick_out: bool) -> Insertion {
        for slot in 0..TAGS_PER_BUCKET {
            if self.read_tag(index, slot) == 0 {
                self.write_tag(index, slot, tag);
                return Insertion::Placed;
            }
        }
        if !kick_out {
            return Insertion::Rejected;
        }

        let slot = self.rng.gen_range(0..TAGS_PER_BUCKET);
        let old_tag = self.read_tag(index, slot);
        self.write_tag(index, slot, tag);
        Insertion::Evicted(old_tag)
    }

    fn find_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.find_in_bucket(i1, tag) || self.find_in_bucket(i2, tag)
    }

    fn delete_from_bucket(&mut self, index: usize, tag: u32) -> bool {
        for slot in 0..TAGS_PER_BUCKET {
            if self.read_tag(index, slot) == tag {
                self.write_tag(index, slot, 0);
                return true;
            }
        }
        false
    }

    fn info(&self) -> String {
        let mut info = String::new();
        let _ = writeln!(info, "PlainTable with tag size: {} bits", self.bits_per_tag);
        let _ = writeln!(info, "\t\tAssociativity: {TAGS_PER_BUCKET}");
        let _ = writeln!(info, "\t\tTotal # of rows: {}", self.num_buckets);
        let _ = writeln!(info, "\t\tTotal # slots: {}", self.size_in_tags());
        info
    }
}
