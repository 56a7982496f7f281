// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Configuration options for the cuckoo filter.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigResult, Validate};
use crate::data_structures::bucket_table::TableLayout;
use crate::error::ConfigError;

/// Default bound on relocation rounds per insert.
pub const DEFAULT_MAX_KICKS: usize = 500;

/// Default seed of the eviction generator.
pub const DEFAULT_SEED: u64 = 0x2545_f491_4f6c_dd1d;

/// Configuration for a [`CuckooFilter`](super::CuckooFilter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuckooFilterConfig {
    /// Number of items the filter is sized for.
    pub capacity: usize,

    /// Fingerprint width in bits. Must be supported by `layout`.
    pub bits_per_tag: u32,

    /// Bucket storage layout.
    pub layout: TableLayout,

    /// Relocation rounds attempted before an insert parks its displaced tag
    /// in the victim slot.
    pub max_kicks: usize,

    /// Seed for the generator that picks which slot to evict.
    pub seed: u64,
}

impl CuckooFilterConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of items the filter is sized for.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the fingerprint width in bits.
    pub fn with_bits_per_tag(mut self, bits_per_tag: u32) -> Self {
        self.bits_per_tag = bits_per_tag;
        self
    }

    /// Sets the bucket storage layout.
    pub fn with_layout(mut self, layout: TableLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the relocation bound.
    pub fn with_max_kicks(mut self, max_kicks: usize) -> Self {
        self.max_kicks = max_kicks;
        self
    }

    /// Sets the eviction generator seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

impl Default for CuckooFilterConfig {
    fn default() -> Self {
        Self {
            capacity: 1_000_000,
            bits_per_tag: 12,
            layout: TableLayout::Plain,
            max_kicks: DEFAULT_MAX_KICKS,
            seed: DEFAULT_SEED,
        }
    }
}

impl Validate for CuckooFilterConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.capacity == 0 {
            return Err(ConfigError::ValidationError(
                "capacity must be greater than 0".to_string(),
            ));
        }

        if self.capacity > u32::MAX as usize {
            return Err(ConfigError::ValidationError(format!(
                "capacity {} exceeds the maximum of {}",
                self.capacity,
                u32::MAX
            )));
        }

        if !self.layout.supports(self.bits_per_tag) {
            return Err(ConfigError::ValidationError(format!(
                "bits_per_tag {} is not supported by the {} layout (supported: {:?})",
                self.bits_per_tag,
                self.layout,
                self.layout.supported_widths()
            )));
        }

        if self.max_kicks == 0 {
            return Err(ConfigError::ValidationError(
                "max_kicks must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
