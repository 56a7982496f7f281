// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Bucket storage for the cuckoo filter.
//!
//! Every layout stores four tag slots per bucket and uses `0` as the empty
//! sentinel. Three layouts are available:
//!
//! - [`PlainTable`]: tags stored literally at fixed bit offsets.
//! - [`PackedTable`]: semi-sorted buckets that store the four low nibbles as a
//!   12-bit codeword, saving one bit per tag.
//! - [`PackedStashTable`]: a packed table that can absorb one extra tag per
//!   bucket in a small shared stash.
//!
//! The set of layouts is closed, so [`BucketStore`] dispatches over them with
//! an enum rather than a trait object.
//!
//! # Example
//!
//! ```
//! use pueo_filter::data_structures::bucket_table::{
//!     BucketStore, BucketTable, Insertion, TableLayout,
//! };
//!
//! let mut store = BucketStore::new(TableLayout::PackedSemiSorted, 13, 64, 7).unwrap();
//! assert_eq!(store.insert_to_bucket(3, 0x1abc, false), Insertion::Placed);
//! assert!(store.find_in_buckets(3, 9, 0x1abc));
//! assert!(store.delete_from_bucket(3, 0x1abc));
//! assert!(!store.find_in_buckets(3, 9, 0x1abc));
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CuckooFilterError, Result};

mod packed;
pub mod permutation;
mod plain;
mod stash;

pub use packed::PackedTable;
pub use plain::PlainTable;
pub use stash::{PackedStashTable, STASH_CAPACITY};

/// Number of tag slots in every bucket.
pub const TAGS_PER_BUCKET: usize = 4;

/// Bucket layout selected when the filter is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableLayout {
    /// Tags stored literally; widths 2, 4, 8, 12, 16 and 32.
    #[default]
    Plain,
    /// Semi-sorted buckets; widths 5, 6, 7, 8, 9, 13 and 17.
    PackedSemiSorted,
    /// Semi-sorted buckets plus a shared overflow stash; same widths as
    /// [`TableLayout::PackedSemiSorted`].
    PackedWithStash,
}

impl TableLayout {
    /// Tag widths this layout can store.
    pub fn supported_widths(self) -> &'static [u32] {
        match self {
            Self::Plain => plain::SUPPORTED_WIDTHS,
            Self::PackedSemiSorted | Self::PackedWithStash => packed::SUPPORTED_WIDTHS,
        }
    }

    /// Returns `true` if `bits_per_tag` can be stored by this layout.
    pub fn supports(self, bits_per_tag: u32) -> bool {
        self.supported_widths().contains(&bits_per_tag)
    }

    /// Returns `true` if the layout has an overflow stash.
    pub fn has_stash(self) -> bool {
        matches!(self, Self::PackedWithStash)
    }
}

impl fmt::Display for TableLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Plain => "plain",
            Self::PackedSemiSorted => "packed_semi_sorted",
            Self::PackedWithStash => "packed_with_stash",
        };
        f.write_str(name)
    }
}

/// Outcome of [`BucketTable::insert_to_bucket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The tag went into an empty slot.
    Placed,
    /// The bucket was full; the tag replaced a random slot whose old tag is
    /// returned and must be relocated by the caller.
    Evicted(u32),
    /// The bucket was full and eviction was not allowed.
    Rejected,
}

/// Storage operations shared by all bucket layouts.
pub trait BucketTable {
    /// Number of buckets (always a power of two).
    fn num_buckets(&self) -> usize;

    /// Width of each stored tag in bits.
    fn bits_per_tag(&self) -> u32;

    /// Bytes used by the bucket array.
    fn size_in_bytes(&self) -> usize;

    /// Total number of tag slots.
    fn size_in_tags(&self) -> usize {
        self.num_buckets() * TAGS_PER_BUCKET
    }

    /// Places `tag` into bucket `index`, evicting a random slot if the bucket
    /// is full and `kick_out` is set.
    fn insert_to_bucket(&mut self, index: usize, tag: u32, kick_out: bool) -> Insertion;

    /// Returns `true` if `tag` is present in bucket `i1` or bucket `i2`.
    fn find_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool;

    /// Removes one copy of `tag` from bucket `index`.
    fn delete_from_bucket(&mut self, index: usize, tag: u32) -> bool;

    /// Stores `tag` as an overflow entry of bucket `index`.
    ///
    /// Returns `Ok(false)` when no overflow slot is available and
    /// [`CuckooFilterError::NotSupported`] for layouts without a stash.
    fn insert_to_stash(&mut self, _index: usize, _tag: u32) -> Result<bool> {
        Err(CuckooFilterError::NotSupported)
    }

    /// Human readable summary of the table.
    fn info(&self) -> String;
}

/// One of the three bucket layouts.
#[derive(Debug, Clone)]
pub enum BucketStore {
    /// See [`PlainTable`].
    Plain(PlainTable),
    /// See [`PackedTable`].
    Packed(PackedTable),
    /// See [`PackedStashTable`].
    PackedWithStash(PackedStashTable),
}

impl BucketStore {
    /// Allocates a zeroed store of `num_buckets` buckets for the given layout.
    ///
    /// `seed` initialises the generator used to pick eviction slots.
    pub fn new(layout: TableLayout, bits_per_tag: u32, num_buckets: usize, seed: u64) -> Result<Self> {
        Ok(match layout {
            TableLayout::Plain => Self::Plain(PlainTable::new(bits_per_tag, num_buckets, seed)?),
            TableLayout::PackedSemiSorted => {
                Self::Packed(PackedTable::new(bits_per_tag, num_buckets, seed)?)
            }
            TableLayout::PackedWithStash => {
                Self::PackedWithStash(PackedStashTable::new(bits_per_tag, num_buckets, seed)?)
            }
        })
    }

    /// The layout of this store.
    pub fn layout(&self) -> TableLayout {
        match self {
            Self::Plain(_) => TableLayout::Plain,
            Self::Packed(_) => TableLayout::PackedSemiSorted,
            Self::PackedWithStash(_) => TableLayout::PackedWithStash,
        }
    }

    fn table(&self) -> &dyn BucketTable {
        match self {
            Self::Plain(t) => t,
            Self::Packed(t) => t,
            Self::PackedWithStash(t) => t,
        }
    }

    fn table_mut(&mut self) -> &mut dyn BucketTable {
        match self {
            Self::Plain(t) => t,
            Self::Packed(t) => t,
            Self::PackedWithStash(t) => t,
        }
    }
}

impl BucketTable for BucketStore {
    fn num_buckets(&self) -> usize {
        self.table().num_buckets()
    }

    fn bits_per_tag(&self) -> u32 {
        self.table().bits_per_tag()
    }

    fn size_in_bytes(&self) -> usize {
        self.table().size_in_bytes()
    }

    fn size_in_tags(&self) -> usize {
        self.table().size_in_tags()
    }

    fn insert_to_bucket(&mut self, index: usize, tag: u32, kick_out: bool) -> Insertion {
        self.table_mut().insert_to_bucket(index, tag, kick_out)
    }

    fn find_in_buckets(&self, i1: usize, i2: usize, tag: u32) -> bool {
        self.table().find_in_buckets(i1, i2, tag)
    }

    fn delete_from_bucket(&mut self, index: usize, tag: u32) -> bool {
        self.table_mut().delete_from_bucket(index, tag)
    }

    fn insert_to_stash(&mut self, index: usize, tag: u32) -> Result<bool> {
        self.table_mut().insert_to_stash(index, tag)
    }

    fn info(&self) -> String {
        self.table().info()
    }
}

/// Mask covering the low `bits` bits of a `u128`.
#[inline]
pub(crate) fn low_mask(bits: u32) -> u128 {
    if bits >= 128 {
        u128::MAX
    } else {
        (1u128 << bits) - 1
    }
}

/// Reads up to 16 bytes starting at `offset` as a little-endian integer.
/// Bytes past the end of `bytes` read as zero.
#[inline]
pub(crate) fn load_le(bytes: &[u8], offset: usize, len: usize) -> u128 {
    let mut buf = [0u8; 16];
    let end = (offset + len).min(bytes.len());
    if offset < end {
        buf[..end - offset].copy_from_slice(&bytes[offset..end]);
    }
    u128::from_le_bytes(buf)
}

/// Writes the low `len` bytes of `value` at `offset`, little-endian.
#[inline]
pub(crate) fn store_le(bytes: &mut [u8], offset: usize, len: usize, value: u128) {
    let buf = value.to_le_bytes();
    let end = (offset + len).min(bytes.len());
    bytes[offset..end].copy_from_slice(&buf[..end - offset]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(TableLayout::Plain, 12 => true)]
    #[test_case(TableLayout::Plain, 13 => false)]
    #[test_case(TableLayout::Plain, 33 => false)]
    #[test_case(TableLayout::PackedSemiSorted, 13 => true)]
    #[test_case(TableLayout::PackedSemiSorted, 12 => false)]
    #[test_case(TableLayout::PackedWithStash, 17 => true)]
    #[test_case(TableLayout::PackedWithStash, 4 => false)]
    fn test_layout_supports(layout: TableLayout, bits: u32) -> bool {
        layout.supports(bits)
    }

    #[test_case(TableLayout::Plain)]
    #[test_case(TableLayout::PackedSemiSorted)]
    #[test_case(TableLayout::PackedWithStash)]
    fn test_store_reports_layout(layout: TableLayout) {
        let bits = layout.supported_widths()[0];
        let store = BucketStore::new(layout, bits, 16, 1).unwrap();
        assert_eq!(store.layout(), layout);
        assert_eq!(store.num_buckets(), 16);
        assert_eq!(store.size_in_tags(), 64);
        assert_eq!(store.bits_per_tag(), bits);
    }

    #[test]
    fn test_unsupported_width_rejected() {
        let err = BucketStore::new(TableLayout::PackedSemiSorted, 12, 16, 1).unwrap_err();
        assert_eq!(
            err,
            CuckooFilterError::UnsupportedTagWidth {
                layout: TableLayout::PackedSemiSorted,
                bits: 12,
            }
        );
    }

    #[test]
    fn test_stash_not_supported_on_plain() {
        let mut store = BucketStore::new(TableLayout::Plain, 8, 16, 1).unwrap();
        assert_eq!(store.insert_to_stash(0, 5), Err(CuckooFilterError::NotSupported));
    }

    #[test]
    fn test_load_store_le_clamps_to_buffer() {
        let mut bytes = vec![0u8; 3];
        store_le(&mut bytes, 1, 4, 0xaabb_ccdd);
        assert_eq!(bytes, vec![0x00, 0xdd, 0xcc]);
        assert_eq!(load_le(&bytes, 1, 8), 0xccdd);
        assert_eq!(load_le(&bytes, 3, 8), 0);
    }
}
