// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Hashing for the cuckoo filter.
//!
//! Any [`BuildHasher`] can drive the filter: the 64-bit value returned by
//! `finish()` is the item digest. The low 32 bits become the tag and the high
//! 32 bits select the primary bucket.

use std::fmt;
use std::hash::{BuildHasher, Hasher};

use sha2::{Digest, Sha256};

use crate::data_structures::bucket_table::low_mask;

pub use fnv::FnvBuildHasher;

/// MurmurHash2 multiplier used to derive the alternate bucket from a tag.
pub(crate) const ALT_INDEX_MULTIPLIER: u32 = 0x5bd1e995;

/// Builds [`Sha256Hasher`]s. The default hasher of the filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sha256BuildHasher;

impl BuildHasher for Sha256BuildHasher {
    type Hasher = Sha256Hasher;

    fn build_hasher(&self) -> Sha256Hasher {
        Sha256Hasher::default()
    }
}

/// A [`Hasher`] whose output is the first eight bytes of the SHA-256 digest of
/// everything written to it, read little-endian.
#[derive(Clone, Default)]
pub struct Sha256Hasher {
    digest: Sha256,
}

impl fmt::Debug for Sha256Hasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sha256Hasher").finish_non_exhaustive()
    }
}

impl Hasher for Sha256Hasher {
    fn write(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
    }

    fn finish(&self) -> u64 {
        let output = self.digest.clone().finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&output[..8]);
        u64::from_le_bytes(head)
    }
}

/// Splits a digest into `(primary bucket, tag)`.
///
/// The tag is the low 32 bits masked to `bits_per_tag`, with 0 remapped to 1
/// because 0 marks an empty slot.
#[inline]
pub(crate) fn index_and_tag(hv: u64, num_buckets: usize, bits_per_tag: u32) -> (usize, u32) {
    let index = (hv >> 32) as usize % num_buckets;
    let tag = (hv as u32) & low_mask(bits_per_tag) as u32;
    (index, tag.max(1))
}

/// The other candidate bucket of `tag` when it sits in bucket `index`.
///
/// With a power-of-two bucket count this is an involution:
/// `alt_index(alt_index(i, t), t) == i`.
#[inline]
pub(crate) fn alt_index(index: usize, tag: u32, num_buckets: usize) -> usize {
    ((index as u32) ^ tag.wrapping_mul(ALT_INDEX_MULTIPLIER)) as usize % num_buckets
}
