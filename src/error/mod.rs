//! Error module for the Pueo cuckoo filter.
//!
//! Configuration failures are described by [`ConfigError`]. Filter and bucket
//! table outcomes that are not `Ok` live with the filter itself and are
//! re-exported here so the whole crate shares one `Result` alias.

pub mod config;

pub use crate::data_structures::cuckoo_filter::{CuckooFilterError, Result};
pub use config::ConfigError;
