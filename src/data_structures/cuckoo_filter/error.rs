// Copyright (c) 2025 Pueo Filter Authors
//
// Licensed under dual license:
// - MIT License (LICENSE-MIT or https://opensource.org/licenses/MIT)
// - Apache License, Version 2.0 (LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0)

//! Error types for the cuckoo filter and its bucket tables.

use crate::data_structures::bucket_table::TableLayout;
use crate::error::ConfigError;

/// Errors returned by filter and bucket table operations.
///
/// Callers can match on the specific status they care about, for example
/// treating `NotFound` as a normal miss.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum CuckooFilterError {
    /// The item is not present in the filter.
    #[error("Item not found in filter")]
    NotFound,

    /// The victim slot is occupied, so the filter refuses further inserts.
    #[error("Not enough space: victim slot is occupied")]
    NotEnoughSpace,

    /// The operation is not available for this bucket layout.
    #[error("Operation not supported by this bucket layout")]
    NotSupported,

    /// The tag width cannot be represented by the requested layout.
    #[error("Tag width of {bits} bits is not supported by the {layout} layout")]
    UnsupportedTagWidth {
        /// The requested bucket layout
        layout: TableLayout,
        /// The requested tag width in bits
        bits: u32,
    },

    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type for cuckoo filter operations
pub type Result<T> = std::result::Result<T, CuckooFilterError>;
