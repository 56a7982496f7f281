// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Semi-sorted packed bucket table.
//!
//! A tag of `w` bits is split into its low nibble and `w - 4` direct bits.
//! A bucket stores the sorted multiset of the four low nibbles as a 12-bit
//! codeword (see [`permutation`](super::permutation)) followed by the four
//! direct-bit fields:
//!
//! ```text
//! bit 0            12                                   bucket_bits
//!     | codeword   | direct(0) | direct(1) | direct(2) | direct(3) |
//! ```
//!
//! Buckets are laid out back to back at bit offset `index * bucket_bits`, so
//! with 20 and 28 bit buckets every odd bucket starts half way into a byte and
//! shares that byte with its neighbour. Writes only touch the bucket's own bits.

use std::fmt::Write as _;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::permutation::{self, CODEWORD_MASK};
use super::{load_le, low_mask, store_le, BucketTable, Insertion, TableLayout, TAGS_PER_BUCKET};
use crate::error::{CuckooFilterError, Result};

pub(super) const SUPPORTED_WIDTHS: &[u32] = &[5, 6, 7, 8, 9, 13, 17];

/// Bit layout of one bucket for a given tag width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct PackedLayout {
    pub bits_per_tag: u32,
    pub bucket_bits: u32,
    /// Shift applied to `tag & !0xf` to place each slot's direct bits.
    pub dir_shifts: [u32; 4],
}

const LAYOUTS: [PackedLayout; 7] = [
    PackedLayout { bits_per_tag: 5, bucket_bits: 16, dir_shifts: [8, 9, 10, 11] },
    PackedLayout { bits_per_tag: 6, bucket_bits: 20, dir_shifts: [8, 10, 12, 14] },
    PackedLayout { bits_per_tag: 7, bucket_bits: 24, dir_shifts: [8, 11, 14, 17] },
    PackedLayout { bits_per_tag: 8, bucket_bits: 28, dir_shifts: [8, 12, 16, 20] },
    PackedLayout { bits_per_tag: 9, bucket_bits: 32, dir_shifts: [8, 13, 18, 23] },
    PackedLayout { bits_per_tag: 13, bucket_bits: 48, dir_shifts: [8, 17, 26, 35] },
    PackedLayout { bits_per_tag: 17, bucket_bits: 64, dir_shifts: [8, 21, 34, 47] },
];

impl PackedLayout {
    fn for_width(bits_per_tag: u32) -> Option<Self> {
        LAYOUTS.iter().copied().find(|l| l.bits_per_tag == bits_per_tag)
    }

    fn dir_bits(&self) -> u32 {
        self.bits_per_tag - 4
    }
}

/// Sorts four tags by their low nibble with a five comparator network.
pub(super) fn sort_tags(tags: &mut [u32; 4]) {
    for (a, b) in [(0, 2), (1, 3), (0, 1), (2, 3), (1, 2)] {
        if tags[a] & 0x0f > tags[b] & 0x0f {
            tags.swap(a, b);
        }
    }
}

/// Puts `tag` into the first empty slot of `tags`, or over a random slot when
/// `kick_out` is set and no slot is empty.
pub(super) fn place_tag(tags: &mut [u32; 4], tag: u32, kick_out: bool, rng: &mut ChaCha8Rng) -> Insertion {
    if let Some(slot) = tags.iter().position(|&t| t == 0) {
        tags[slot] = tag;
        return Insertion::Placed;
    }
    if !kick_out {
        return Insertion::Rejected;
    }
    let slot = rng.gen_range(0..TAGS_PER_BUCKET);
    let old_tag = tags[slot];
    tags[slot] = tag;
    Insertion::Evicted(old_tag)
}

/// A semi-sorted bucket table supporting tag widths 5, 6, 7, 8, 9, 13 and 17.
#[derive(Debug, Clone)]
pub struct PackedTable {
    layout: PackedLayout,
    num_buckets: usize,
    dir_mask: u64,
    buckets: Vec<u8>,
    pub(super) rng: ChaCha8Rng,
}

impl PackedTable {
    /// Creates a zeroed table.
    pub fn new(bits_per_tag: u32, num_buckets: usize, seed: u64) -> Result<Self> {
        Self::with_layout(TableLayout::PackedSemiSorted, bits_per_tag, num_buckets, seed)
    }

    pub(super) fn with_layout(
        table_layout: TableLayout,
        bits_per_tag: u32,
        num_buckets: usize,
        seed: u64,
    ) -> Result<Self> {
        let layout = PackedLayout::for_width(bits_per_tag).ok_or(
            CuckooFilterError::UnsupportedTagWidth {
                layout: table_layout,
                bits: bits_per_tag,
            },
        )?;
        let total_bits = layout.bucket_bits as usize * num_buckets;

        Ok(Self {
            layout,
            num_buckets,
            dir_mask: (low_mask(layout.dir_bits()) as u64) << 4,
            buckets: vec![0u8; (total_bits + 7) >> 3],
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Bits occupied by one bucket.
    pub fn bits_per_bucket(&self) -> u32 {
        self.layout.bucket_bits
    }

    /// Direct (uncompressed) bits stored per tag.
    pub fn dir_bits_per_tag(&self) -> u32 {
        self.layout.dir_bits()
    }

    /// Decodes bucket `index` into its four tags. Empty slots read as 0 and
    /// slot order follows the sorted encoding, not insertion order.
    pub fn read_bucket(&self, index: usize) -> [u32; 4] {
        let word = self.read_word(index);
        self.decode_word(word, (word & CODEWORD_MASK) as u16)
    }

    /// Sorts and encodes `tags` into bucket `index`.
    pub fn write_bucket(&mut self, index: usize, tags: [u32; 4]) {
        let word = self.encode_tags(tags);
        self.write_word(index, word);
    }

    /// Raw bucket bits, codeword in the low 12 bits.
    pub(super) fn read_word(&self, index: usize) -> u64 {
        let (offset, shift, span) = self.locate(index);
        let region = load_le(&self.buckets, offset, span);
        ((region >> shift) & low_mask(self.layout.bucket_bits)) as u64
    }

    pub(super) fn write_word(&mut self, index: usize, word: u64) {
        let (offset, shift, span) = self.locate(index);
        let owned = low_mask(self.layout.bucket_bits) << shift;
        let region = load_le(&self.buckets, offset, span);
        let region = (region & !owned) | (((word as u128) << shift) & owned);
        store_le(&mut self.buckets, offset, span, region);
    }

    /// Rebuilds four tags from a bucket word, decoding the low nibbles from
    /// `codeword` instead of the word's own codeword field.
    pub(super) fn decode_word(&self, word: u64, codeword: u16) -> [u32; 4] {
        let nibbles = permutation::tables().decode(codeword);
        let mut tags = [0u32; 4];
        for (slot, tag) in tags.iter_mut().enumerate() {
            let dir = (word >> self.layout.dir_shifts[slot]) & self.dir_mask;
            *tag = dir as u32 | nibbles[slot] as u32;
        }
        tags
    }

    pub(super) fn encode_tags(&self, mut tags: [u32; 4]) -> u64 {
        sort_tags(&mut tags);
        let nibbles = tags.map(|t| (t & 0x0f) as u8);
        let mut word = permutation::tables().encode(nibbles) as u64;
        for (slot, &tag) in tags.iter().enumerate() {
            word |= ((tag & !0x0f) as u64) << self.layout.dir_shifts[slot];
        }
        word
    }

    /// Byte offset, bit shift and byte span of bucket `index`.
    fn locate(&self, index: usize) -> (usize, u32, usize) {
        let bit = index * self.layout.bucket_bits as usize;
        let shift = (bit & 7) as u32;
        let span = (shift + self.layout.bucket_bits + 7) as usize >> 3;
        (bit >> 3, shift, span)
    }

    pub(super) fn summary(&self, name: &str) -> String {
        let mut info = String::new();
        let _ = write!(info, "{name} with tag size: {} bits", self.layout.bits_per_tag);
        let _ = writeln!(
            info,
            "\t4 packed bits (3 bits after compression) and {} direct bits",
            self.layout.dir_bits()
        );
        let _ = writeln!(info, "\t\tAssociativity: {TAGS_PER_BUCKET}");
        let _ = writeln!(info, "\t\tTotal # of rows: {}", self.num_buckets);
        let _ = writeln!(info, "\t\tTotal # slots: {}", self.size_in_tags());
        info
    }
}

impl BucketTable for PackedTable {
    fn num_buckets(&self) -> usize {
        self.num_buckets
    }

    fn bits_per_tag(&self) -> u32 {
        self.layout.bits_per_tag
    }

    fn size_in_bytes(&self) -> usize {
        self.buckets.len()
    }

    fn insert_to_bucket(&mut self, index: usize, tag: u32, kick_out: bool) -> Insertion {
        let mut tags = self.read_bucket(index);
        let outcome = place_tag(&mut tags, tag, kick_out, &mut self.rng);
        if outcome != Insertion::Rejected {
            self.write_bucket(index, tags);
        }
        outcome
    }

    fn find_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.read_bucket(i1).contains(&tag) || self.read_bucket(i2).contains(&tag)
    }

    fn delete_from_bucket(&mut self, index: usize, tag: u32) -> bool {
        let mut tags = self.read_bucket(index);
        match tags.iter().position(|&t| t == tag) {
            Some(slot) => {
                tags[slot] = 0;
                self.write_bucket(index, tags);
                true
            }
            None => false,
        }
    }

    fn info(&self) -> String {
        self.summary("PackedTable")
    }
}
