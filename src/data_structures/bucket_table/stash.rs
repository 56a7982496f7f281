// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Packed bucket table with a shared overflow stash.
//!
//! Codewords only go up to 3875, which leaves 220 values of the 12-bit field
//! unused. A bucket whose codeword field holds `3876 + slot` is linked to
//! stash entry `slot`; the entry keeps the bucket's real codeword next to one
//! extra tag.

use std::fmt::Write as _;
use std::mem;

use super::packed::{place_tag, PackedTable};
use super::permutation::{CODEWORD_COUNT, CODEWORD_MASK};
use super::{BucketTable, Insertion, TableLayout};
use crate::error::Result;

/// Number of stash entries, one per unused codeword value.
pub const STASH_CAPACITY: usize = 4096 - CODEWORD_COUNT;

const STASH_BASE: u64 = CODEWORD_COUNT as u64;

#[derive(Debug, Clone, Copy, Default)]
struct StashEntry {
    codeword: u16,
    tag: u32,
    in_use: bool,
}

/// A [`PackedTable`] that can hold one overflow tag per bucket.
#[derive(Debug, Clone)]
pub struct PackedStashTable {
    table: PackedTable,
    stash: Vec<StashEntry>,
    cursor: usize,
    used: usize,
}

impl PackedStashTable {
    /// Creates a zeroed table with an empty stash.
    pub fn new(bits_per_tag: u32, num_buckets: usize, seed: u64) -> Result<Self> {
        Ok(Self {
            table: PackedTable::with_layout(TableLayout::PackedWithStash, bits_per_tag, num_buckets, seed)?,
            stash: vec![StashEntry::default(); STASH_CAPACITY],
            cursor: 0,
            used: 0,
        })
    }

    /// Number of stash entries in use.
    pub fn stash_len(&self) -> usize {
        self.used
    }

    /// The overflow tag linked to bucket `index`, if any.
    pub fn stash_tag(&self, index: usize) -> Option<u32> {
        self.linked_slot(index).map(|slot| self.stash[slot].tag)
    }

    /// Decodes the four resident tags of bucket `index`, excluding its stash tag.
    pub fn read_bucket(&self, index: usize) -> [u32; 4] {
        let word = self.table.read_word(index);
        let codeword = match self.slot_of(word) {
            Some(slot) => self.stash[slot].codeword,
            None => (word & CODEWORD_MASK) as u16,
        };
        self.table.decode_word(word, codeword)
    }

    fn write_bucket(&mut self, index: usize, tags: [u32; 4]) {
        let mut word = self.table.encode_tags(tags);
        if let Some(slot) = self.linked_slot(index) {
            self.stash[slot].codeword = (word & CODEWORD_MASK) as u16;
            word = (word & !CODEWORD_MASK) | (STASH_BASE + slot as u64);
        }
        self.table.write_word(index, word);
    }

    fn slot_of(&self, word: u64) -> Option<usize> {
        let field = word & CODEWORD_MASK;
        (field >= STASH_BASE).then(|| (field - STASH_BASE) as usize)
    }

    fn linked_slot(&self, index: usize) -> Option<usize> {
        self.slot_of(self.table.read_word(index))
    }

    fn find_in_bucket(&self, index: usize, tag: u32) -> bool {
        self.stash_tag(index) == Some(tag) || self.read_bucket(index).contains(&tag)
    }

    /// Unlinks bucket `index` from its stash entry and restores its codeword.
    fn release(&mut self, index: usize, slot: usize) {
        let word = self.table.read_word(index);
        let entry = &mut self.stash[slot];
        let restored = (word & !CODEWORD_MASK) | entry.codeword as u64;
        *entry = StashEntry::default();
        self.used -= 1;
        self.table.write_word(index, restored);
    }
}

impl BucketTable for PackedStashTable {
    fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    fn bits_per_tag(&self) -> u32 {
        self.table.bits_per_tag()
    }

    fn size_in_bytes(&self) -> usize {
        self.table.size_in_bytes() + STASH_CAPACITY * mem::size_of::<StashEntry>()
    }

    fn insert_to_bucket(&mut self, index: usize, tag: u32, kick_out: bool) -> Insertion {
        let mut tags = self.read_bucket(index);
        let outcome = place_tag(&mut tags, tag, kick_out, &mut self.table.rng);
        if outcome != Insertion::Rejected {
            self.write_bucket(index, tags);
        }
        outcome
    }

    fn find_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.find_in_bucket(i1, tag) || self.find_in_bucket(i2, tag)
    }

    fn delete_from_bucket(&mut self, index: usize, tag: u32) -> bool {
        let mut tags = self.read_bucket(index);
        if let Some(pos) = tags.iter().position(|&t| t == tag) {
            tags[pos] = 0;
            self.write_bucket(index, tags);
            return true;
        }
        match self.linked_slot(index) {
            Some(slot) if self.stash[slot].tag == tag => {
                self.release(index, slot);
                true
            }
            _ => false,
        }
    }

    fn insert_to_stash(&mut self, index: usize, tag: u32) -> Result<bool> {
        if self.used == STASH_CAPACITY {
            return Ok(false);
        }
        let word = self.table.read_word(index);
        if self.slot_of(word).is_some() {
            return Ok(false);
        }

        let free = (0..STASH_CAPACITY)
            .map(|step| (self.cursor + step) % STASH_CAPACITY)
            .find(|&slot| !self.stash[slot].in_use);
        let Some(slot) = free else {
            return Ok(false);
        };

        self.stash[slot] = StashEntry {
            codeword: (word & CODEWORD_MASK) as u16,
            tag,
            in_use: true,
        };
        self.used += 1;
        self.cursor = (slot + 1) % STASH_CAPACITY;
        self.table
            .write_word(index, (word & !CODEWORD_MASK) | (STASH_BASE + slot as u64));
        Ok(true)
    }

    fn info(&self) -> String {
        let mut info = self.table.summary("PackedStashTable");
        let _ = writeln!(info, "\t\tStash entries in use: {}/{STASH_CAPACITY}", self.used);
        info
    }
}
