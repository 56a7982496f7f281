// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Cuckoo filter for approximate set membership with deletion.
//!
//! Each item is hashed into a short fingerprint (the tag) and two candidate
//! buckets. Inserts that find both buckets full relocate resident tags between
//! their own candidate buckets, up to a configurable number of rounds. A tag
//! still homeless after that is kept in a single victim slot; while the slot is
//! occupied the filter refuses new items.
//!
//! # Features
//!
//! - Three bucket layouts, including a semi-sorted packed layout that saves a
//!   bit per tag.
//! - Pluggable hashing through [`std::hash::BuildHasher`].
//! - Reproducible eviction choices from a seeded generator.
//!
//! # Example
//!
//! ```
//! use pueo_filter::data_structures::bucket_table::TableLayout;
//! use pueo_filter::data_structures::cuckoo_filter::{CuckooFilter, CuckooFilterConfig};
//!
//! let mut filter = CuckooFilter::new(1_000, 12, TableLayout::Plain).unwrap();
//! filter.add("hello").unwrap();
//! assert!(filter.contains("hello"));
//!
//! filter.delete("hello").unwrap();
//! assert!(!filter.contains("hello"));
//!
//! // Semi-sorted buckets with an overflow stash
//! let config = CuckooFilterConfig::new()
//!     .with_capacity(10_000)
//!     .with_bits_per_tag(13)
//!     .with_layout(TableLayout::PackedWithStash);
//! let mut packed = CuckooFilter::with_config(config).unwrap();
//! packed.add(&42u64).unwrap();
//! assert!(packed.contains(&42u64));
//! ```
//!
//! # Hashing
//!
//! The default [`Sha256BuildHasher`] gives the same digests on every platform
//! and run. [`FnvBuildHasher`] is a much faster alternative:
//!
//! ```
//! use pueo_filter::data_structures::cuckoo_filter::{
//!     CuckooFilter, CuckooFilterConfig, FnvBuildHasher,
//! };
//!
//! let config = CuckooFilterConfig::new().with_capacity(4_096);
//! let mut filter = CuckooFilter::with_config_and_hasher(config, FnvBuildHasher::default()).unwrap();
//! filter.add(&[1u8, 2, 3]).unwrap();
//! assert!(filter.contains(&[1u8, 2, 3]));
//! ```

mod config;
mod error;
mod filter;
mod hash;

pub use config::{CuckooFilterConfig, DEFAULT_MAX_KICKS, DEFAULT_SEED};
pub use error::{CuckooFilterError, Result};
pub use filter::{CuckooFilter, FilterStats};
pub use hash::{FnvBuildHasher, Sha256BuildHasher, Sha256Hasher};

#[cfg(test)]
pub(crate) use filter::bucket_count;
#[cfg(test)]
pub(crate) use hash::alt_index;
