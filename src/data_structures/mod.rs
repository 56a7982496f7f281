//! Data structures for Pueo.
//!
//! The filter engine lives in [`cuckoo_filter`] and stores its tags in one of
//! the layouts provided by [`bucket_table`]. Neither uses unsafe code.

pub mod bucket_table;
pub mod cuckoo_filter;

// Re-export common data structures
pub use bucket_table::TableLayout;
pub use cuckoo_filter::{CuckooFilter, CuckooFilterConfig, FilterStats};
