// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! The cuckoo filter engine.
//!
//! Items are reduced to a `(bucket, tag)` pair. A tag may live in its primary
//! bucket or in the alternate bucket derived from the tag alone, which lets
//! the engine move tags around without knowing the items they came from.

use std::fmt::Write as _;
use std::hash::{BuildHasher, Hash};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use super::config::CuckooFilterConfig;
use super::hash::{alt_index, index_and_tag, Sha256BuildHasher};
use crate::config::Validate;
use crate::data_structures::bucket_table::{
    BucketStore, BucketTable, Insertion, TableLayout, TAGS_PER_BUCKET,
};
use crate::error::{CuckooFilterError, Result};

/// Load above which the bucket count is doubled at construction.
const MAX_INITIAL_LOAD: f64 = 0.96;

/// A tag that could not be placed after the relocation bound was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Victim {
    index: usize,
    tag: u32,
}

/// A snapshot of filter occupancy and memory use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Bucket layout in use
    pub layout: TableLayout,
    /// Fingerprint width in bits
    pub bits_per_tag: u32,
    /// Number of buckets
    pub num_buckets: usize,
    /// Total tag slots
    pub slots: usize,
    /// Items stored in buckets and stash, excluding the victim
    pub len: usize,
    /// `len / slots`
    pub load_factor: f64,
    /// Bytes used by bucket storage
    pub size_in_bytes: usize,
    /// Storage bits per stored item, `None` when empty
    pub bits_per_item: Option<f64>,
    /// Whether the victim slot is occupied
    pub has_victim: bool,
}

/// An approximate membership filter supporting deletion.
///
/// # Type Parameters
///
/// * `S` - Builds the hasher that digests items. Defaults to
///   [`Sha256BuildHasher`].
#[derive(Debug, Clone)]
pub struct CuckooFilter<S = Sha256BuildHasher> {
    table: BucketStore,
    num_items: usize,
    victim: Option<Victim>,
    max_kicks: usize,
    hasher: S,
}

impl CuckooFilter<Sha256BuildHasher> {
    /// Creates a filter sized for `capacity` items with the default relocation
    /// bound and seed.
    ///
    /// # Errors
    ///
    /// Fails if `layout` cannot store `bits_per_tag`-bit tags or if
    /// `capacity` is 0 or above `u32::MAX`.
    pub fn new(capacity: usize, bits_per_tag: u32, layout: TableLayout) -> Result<Self> {
        Self::with_config(
            CuckooFilterConfig::new()
                .with_capacity(capacity)
                .with_bits_per_tag(bits_per_tag)
                .with_layout(layout),
        )
    }

    /// Creates a filter from a configuration.
    pub fn with_config(config: CuckooFilterConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, Sha256BuildHasher)
    }
}

impl<S: BuildHasher> CuckooFilter<S> {
    /// Creates a filter from a configuration, digesting items with `hasher`.
    pub fn with_config_and_hasher(config: CuckooFilterConfig, hasher: S) -> Result<Self> {
        if !config.layout.supports(config.bits_per_tag) {
            return Err(CuckooFilterError::UnsupportedTagWidth {
                layout: config.layout,
                bits: config.bits_per_tag,
            });
        }
        config.validate()?;

        let num_buckets = bucket_count(config.capacity);
        let table = BucketStore::new(config.layout, config.bits_per_tag, num_buckets, config.seed)?;
        debug!(
            layout = %config.layout,
            bits_per_tag = config.bits_per_tag,
            num_buckets,
            bytes = table.size_in_bytes(),
            "cuckoo filter created"
        );

        Ok(Self {
            table,
            num_items: 0,
            victim: None,
            max_kicks: config.max_kicks,
            hasher,
        })
    }

    /// Adds an item.
    ///
    /// Returns `Ok` even when the item's tag, or a tag it displaced, ends up in
    /// the victim slot.
    ///
    /// # Errors
    ///
    /// [`CuckooFilterError::NotEnoughSpace`] if the victim slot is already
    /// occupied. The filter accepts no more items until a delete frees it.
    pub fn add<K: Hash + ?Sized>(&mut self, item: &K) -> Result<()> {
        if self.victim.is_some() {
            return Err(CuckooFilterError::NotEnoughSpace);
        }
        let (index, tag) = self.index_and_tag(item);
        self.add_impl(index, tag);
        Ok(())
    }

    /// Returns `true` if the item may be in the filter.
    ///
    /// False positives are possible, false negatives are not.
    pub fn contains<K: Hash + ?Sized>(&self, item: &K) -> bool {
        let (i1, tag) = self.index_and_tag(item);
        let i2 = self.alt_index(i1, tag);
        debug_assert_eq!(i1, self.alt_index(i2, tag));

        let in_victim = self
            .victim
            .is_some_and(|v| v.tag == tag && (v.index == i1 || v.index == i2));
        in_victim || self.table.find_in_buckets(i1, i2, tag)
    }

    /// Removes one copy of the item's tag.
    ///
    /// Deleting an item that was never added can remove another item sharing
    /// its tag and buckets.
    ///
    /// # Errors
    ///
    /// [`CuckooFilterError::NotFound`] if neither candidate bucket nor the
    /// victim holds the tag.
    pub fn delete<K: Hash + ?Sized>(&mut self, item: &K) -> Result<()> {
        let (i1, tag) = self.index_and_tag(item);
        let i2 = self.alt_index(i1, tag);

        if self.table.delete_from_bucket(i1, tag) || self.table.delete_from_bucket(i2, tag) {
            self.num_items -= 1;
            if let Some(victim) = self.victim.take() {
                trace!(index = victim.index, tag = victim.tag, "re-admitting victim");
                self.add_impl(victim.index, victim.tag);
            }
            return Ok(());
        }

        match self.victim {
            Some(v) if v.tag == tag && (v.index == i1 || v.index == i2) => {
                self.victim = None;
                Ok(())
            }
            _ => Err(CuckooFilterError::NotFound),
        }
    }

    /// Number of items stored, excluding the victim.
    pub fn len(&self) -> usize {
        self.num_items
    }

    /// Returns `true` if no items are stored.
    pub fn is_empty(&self) -> bool {
        self.num_items == 0
    }

    /// Bytes used by bucket storage.
    pub fn size_in_bytes(&self) -> usize {
        self.table.size_in_bytes()
    }

    /// Fraction of tag slots in use.
    pub fn load_factor(&self) -> f64 {
        self.num_items as f64 / self.table.size_in_tags() as f64
    }

    /// Storage bits spent per stored item, `None` when empty.
    pub fn bits_per_item(&self) -> Option<f64> {
        (self.num_items > 0).then(|| 8.0 * self.size_in_bytes() as f64 / self.num_items as f64)
    }

    /// Returns `true` if an insert has overflowed into the victim slot.
    pub fn has_victim(&self) -> bool {
        self.victim.is_some()
    }

    /// The bucket layout in use.
    pub fn layout(&self) -> TableLayout {
        self.table.layout()
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.table.num_buckets()
    }

    /// Snapshot of occupancy and memory use.
    pub fn stats(&self) -> FilterStats {
        FilterStats {
            layout: self.table.layout(),
            bits_per_tag: self.table.bits_per_tag(),
            num_buckets: self.table.num_buckets(),
            slots: self.table.size_in_tags(),
            len: self.num_items,
            load_factor: self.load_factor(),
            size_in_bytes: self.size_in_bytes(),
            bits_per_item: self.bits_per_item(),
            has_victim: self.has_victim(),
        }
    }

    /// Human readable status report.
    pub fn info(&self) -> String {
        let mut info = String::from("CuckooFilter Status:\n");
        let _ = write!(info, "\t\t{}", self.table.info());
        let _ = writeln!(info, "\t\tKeys stored: {}", self.num_items);
        let _ = writeln!(info, "\t\tLoad factor: {:.4}", self.load_factor());
        let _ = writeln!(info, "\t\tHashtable size: {} KB", self.size_in_bytes() >> 10);
        match self.bits_per_item() {
            Some(bits) => {
                let _ = writeln!(info, "\t\tbit/key:   {bits:.4}");
            }
            None => info.push_str("\t\tbit/key:   N/A\n"),
        }
        if let Some(v) = self.victim {
            let _ = writeln!(info, "\t\tVictim: bucket {} tag {:#x}", v.index, v.tag);
        }
        info
    }

    fn index_and_tag<K: Hash + ?Sized>(&self, item: &K) -> (usize, u32) {
        let hv = self.hasher.hash_one(item);
        index_and_tag(hv, self.table.num_buckets(), self.table.bits_per_tag())
    }

    fn alt_index(&self, index: usize, tag: u32) -> usize {
        alt_index(index, tag, self.table.num_buckets())
    }

    /// Places `tag` starting at bucket `index`, relocating resident tags for up
    /// to `max_kicks` rounds. Whatever is still displaced afterwards goes to
    /// the stash when the layout has one, otherwise to the victim slot.
    fn add_impl(&mut self, index: usize, tag: u32) {
        let mut cur_index = index;
        let mut cur_tag = tag;

        for round in 0..self.max_kicks {
            match self.table.insert_to_bucket(cur_index, cur_tag, round > 0) {
                Insertion::Placed => {
                    self.num_items += 1;
                    return;
                }
                Insertion::Evicted(old_tag) => cur_tag = old_tag,
                Insertion::Rejected => {}
            }
            cur_index = self.alt_index(cur_index, cur_tag);
        }

        if self.table.layout().has_stash() && self.stash(cur_index, cur_tag) {
            return;
        }

        warn!(
            index = cur_index,
            tag = cur_tag,
            items = self.num_items,
            "relocation bound reached, tag parked in victim slot"
        );
        self.victim = Some(Victim {
            index: cur_index,
            tag: cur_tag,
        });
    }

    fn stash(&mut self, index: usize, tag: u32) -> bool {
        for candidate in [index, self.alt_index(index, tag)] {
            if let Ok(true) = self.table.insert_to_stash(candidate, tag) {
                self.num_items += 1;
                debug!(index = candidate, tag, "displaced tag stored in stash");
                return true;
            }
        }
        false
    }
}

/// Power-of-two bucket count for `capacity` items, doubled when the load at
/// full capacity would exceed 96%.
pub(crate) fn bucket_count(capacity: usize) -> usize {
    let mut num_buckets = (capacity / TAGS_PER_BUCKET).max(1).next_power_of_two();
    let load = capacity as f64 / (num_buckets * TAGS_PER_BUCKET) as f64;
    if load > MAX_INITIAL_LOAD {
        num_buckets <<= 1;
    }
    num_buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::IdentityBuildHasher;
    use test_case::test_case;

    /// A filter with a single bucket, so every tag competes for the same four slots.
    fn single_bucket(layout: TableLayout, bits: u32) -> CuckooFilter<IdentityBuildHasher> {
        let config = CuckooFilterConfig::new()
            .with_capacity(3)
            .with_bits_per_tag(bits)
            .with_layout(layout)
            .with_max_kicks(50);
        CuckooFilter::with_config_and_hasher(config, IdentityBuildHasher::default()).unwrap()
    }

    #[test_case(1 => 1)]
    #[test_case(3 => 1)]
    #[test_case(4 => 2 ; "exactly one full bucket doubles")]
    #[test_case(100 => 32)]
    #[test_case(1000 => 512)]
    #[test_case(1_000_000 => 262_144)]
    fn test_bucket_count(capacity: usize) -> usize {
        bucket_count(capacity)
    }

    #[test]
    fn test_add_contains_delete() {
        let mut filter = CuckooFilter::new(1000, 12, TableLayout::Plain).unwrap();
        assert!(filter.is_empty());
        filter.add("alpha").unwrap();
        filter.add("beta").unwrap();

        assert!(filter.contains("alpha"));
        assert!(filter.contains("beta"));
        assert_eq!(filter.len(), 2);

        filter.delete("alpha").unwrap();
        assert!(!filter.contains("alpha"));
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.delete("gamma"), Err(CuckooFilterError::NotFound));
    }

    #[test]
    fn test_unsupported_width_is_reported() {
        let err = CuckooFilter::new(1000, 12, TableLayout::PackedSemiSorted).unwrap_err();
        assert_eq!(
            err,
            CuckooFilterError::UnsupportedTagWidth {
                layout: TableLayout::PackedSemiSorted,
                bits: 12,
            }
        );
    }

    #[test]
    fn test_zero_capacity_is_rejected() {
        let err = CuckooFilter::new(0, 12, TableLayout::Plain).unwrap_err();
        assert!(matches!(err, CuckooFilterError::Config(_)));
    }

    #[test]
    fn test_victim_blocks_further_adds() {
        let mut filter = single_bucket(TableLayout::Plain, 8);
        for item in 1..=4u64 {
            filter.add(&item).unwrap();
        }
        assert!(!filter.has_victim());

        assert_eq!(filter.add(&5u64), Ok(()));
        assert!(filter.has_victim());
        assert_eq!(filter.len(), 4);
        assert_eq!(filter.add(&6u64), Err(CuckooFilterError::NotEnoughSpace));

        for item in 1..=5u64 {
            assert!(filter.contains(&item), "item {item}");
        }
        assert!(!filter.contains(&6u64));
    }

    #[test]
    fn test_delete_readmits_victim() {
        let mut filter = single_bucket(TableLayout::Plain, 8);
        for item in 1..=5u64 {
            filter.add(&item).unwrap();
        }
        let parked = filter.victim.unwrap().tag as u64;
        let other = (1..=5u64).find(|&i| i != parked).unwrap();

        filter.delete(&other).unwrap();
        assert!(!filter.has_victim());
        assert_eq!(filter.len(), 4);
        assert!(!filter.contains(&other));
        for item in (1..=5u64).filter(|&i| i != other) {
            assert!(filter.contains(&item), "item {item}");
        }
        filter.add(&other).unwrap();
        assert!(filter.has_victim());
    }

    #[test]
    fn test_readmitted_victim_can_park_again() {
        // Two buckets. Even tags map back to their own bucket, so bucket 0
        // stays full no matter how the relocation rounds shuffle it.
        let config = CuckooFilterConfig::new()
            .with_capacity(5)
            .with_bits_per_tag(8)
            .with_layout(TableLayout::Plain);
        let mut filter =
            CuckooFilter::with_config_and_hasher(config, IdentityBuildHasher::default()).unwrap();
        assert_eq!(filter.num_buckets(), 2);

        let second = 1u64 << 32;
        for tag in [2u64, 4, 6, 8] {
            filter.add(&tag).unwrap();
            filter.add(&(second | tag)).unwrap();
        }
        assert!(!filter.has_victim());
        filter.add(&10u64).unwrap();
        assert!(filter.has_victim());
        assert_eq!(filter.len(), 8);

        // Freeing a slot in bucket 1 does not help a tag confined to bucket 0.
        filter.delete(&(second | 2)).unwrap();
        assert!(filter.has_victim());
        assert_eq!(filter.victim.map(|v| v.index), Some(0));
        assert_eq!(filter.len(), 7);
        assert_eq!(filter.add(&12u64), Err(CuckooFilterError::NotEnoughSpace));

        for item in [2u64, 4, 6, 8, 10] {
            assert!(filter.contains(&item), "item {item}");
        }
        for tag in [4u64, 6, 8] {
            assert!(filter.contains(&(second | tag)), "item {tag} in bucket 1");
        }
        assert!(!filter.contains(&(second | 2)));
    }

    #[test]
    fn test_delete_victim_only() {
        let mut filter = single_bucket(TableLayout::PackedSemiSorted, 9);
        for item in 1..=5u64 {
            filter.add(&item).unwrap();
        }
        let parked = filter.victim.unwrap().tag as u64;

        filter.delete(&parked).unwrap();
        assert!(!filter.has_victim());
        assert_eq!(filter.len(), 4);
        assert!(!filter.contains(&parked));
        assert_eq!(filter.delete(&parked), Err(CuckooFilterError::NotFound));
    }

    #[test]
    fn test_stash_absorbs_overflow_before_victim() {
        let mut filter = single_bucket(TableLayout::PackedWithStash, 13);
        for item in 1..=5u64 {
            filter.add(&item).unwrap();
        }
        assert!(!filter.has_victim());
        assert_eq!(filter.len(), 5);
        for item in 1..=5u64 {
            assert!(filter.contains(&item), "item {item}");
        }

        // Only one stash entry per bucket, so the sixth overflows to the victim.
        filter.add(&6u64).unwrap();
        assert!(filter.has_victim());
        assert_eq!(filter.len(), 5);
        assert_eq!(filter.add(&7u64), Err(CuckooFilterError::NotEnoughSpace));
        for item in 1..=6u64 {
            assert!(filter.contains(&item), "item {item}");
        }

        filter.delete(&3u64).unwrap();
        assert!(!filter.has_victim());
        assert_eq!(filter.len(), 5);
        assert!(!filter.contains(&3u64));
        for item in [1u64, 2, 4, 5, 6] {
            assert!(filter.contains(&item), "item {item}");
        }
    }

    #[test]
    fn test_same_seed_same_state() {
        let build = || {
            let mut filter = single_bucket(TableLayout::Plain, 16);
            for item in 1..=5u64 {
                filter.add(&item).unwrap();
            }
            filter.victim
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_stats() {
        let mut filter = CuckooFilter::new(1000, 12, TableLayout::Plain).unwrap();
        let empty = filter.stats();
        assert_eq!(empty.num_buckets, 512);
        assert_eq!(empty.slots, 2048);
        assert_eq!(empty.size_in_bytes, 512 * 6);
        assert_eq!(empty.bits_per_item, None);

        for i in 0..100u32 {
            filter.add(&i).unwrap();
        }
        let stats = filter.stats();
        assert_eq!(stats.len, 100);
        assert!((stats.load_factor - 100.0 / 2048.0).abs() < 1e-9);
        assert_eq!(stats.bits_per_item, Some(8.0 * 3072.0 / 100.0));
        assert!(!stats.has_victim);
    }

    #[test]
    fn test_info_mentions_table_and_keys() {
        let mut filter = CuckooFilter::new(64, 13, TableLayout::PackedSemiSorted).unwrap();
        assert!(filter.info().contains("bit/key:   N/A"));
        filter.add("x").unwrap();
        let info = filter.info();
        assert!(info.starts_with("CuckooFilter Status:"));
        assert!(info.contains("PackedTable with tag size: 13 bits"));
        assert!(info.contains("Keys stored: 1"));
    }
}
