//! Pueo: a cuckoo filter library.
//!
//! A cuckoo filter answers "might this key be in the set" in constant time,
//! like a Bloom filter, but also supports deleting keys. This crate provides
//! the filter engine, three bucket layouts including a compressed semi-sorted
//! one, a configuration layer and optional logging setup.
//!
//! # Example
//!
//! ```
//! use pueo_filter::{CuckooFilter, TableLayout};
//!
//! let mut filter = CuckooFilter::new(10_000, 12, TableLayout::Plain).unwrap();
//! filter.add("user:42").unwrap();
//! assert!(filter.contains("user:42"));
//! ```

pub mod config;
pub mod data_structures;
pub mod error;
pub mod telemetry;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

pub use data_structures::{CuckooFilter, CuckooFilterConfig, FilterStats, TableLayout};
pub use error::{CuckooFilterError, Result};

/// Version information for Pueo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
