//! Crate-internal tests that span several modules.
//!
//! Per-module unit tests live next to the code they cover. The tests here
//! exercise the filter engine against every bucket layout and the
//! configuration loader against real files and environment variables.

pub mod filter_tests;
pub mod test_utils;

pub use test_utils::{
    key_strategy, layout_and_width_strategy, IdentityBuildHasher, TestFixture,
};
