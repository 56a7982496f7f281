//! Test utilities and fixtures for Pueo.

use std::hash::{BuildHasherDefault, Hasher};

use proptest::prelude::*;
use proptest::strategy::{BoxedStrategy, Strategy};
use tempfile::TempDir;

use crate::data_structures::bucket_table::TableLayout;

/// Maximum length of generated keys.
const MAX_KEY_LENGTH: usize = 64;

/// Create a temporary directory for test files.
pub fn create_test_dir() -> std::io::Result<TempDir> {
    tempfile::tempdir()
}

/// Every `(layout, tag width)` pair the bucket store accepts.
pub fn layout_and_width_strategy() -> BoxedStrategy<(TableLayout, u32)> {
    let pairs: Vec<(TableLayout, u32)> = [
        TableLayout::Plain,
        TableLayout::PackedSemiSorted,
        TableLayout::PackedWithStash,
    ]
    .into_iter()
    .flat_map(|layout| {
        layout
            .supported_widths()
            .iter()
            .map(move |&bits| (layout, bits))
    })
    .collect();
    prop::sample::select(pairs).boxed()
}

/// Hasher whose digest is the hashed `u64` itself, so tests can choose the
/// tag (low 32 bits) and bucket (high 32 bits) of every key.
#[derive(Default)]
pub struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }

    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }

    fn finish(&self) -> u64 {
        self.0
    }
}

/// Builds [`IdentityHasher`]s.
pub type IdentityBuildHasher = BuildHasherDefault<IdentityHasher>;

/// Arbitrary byte-string keys.
pub fn key_strategy() -> BoxedStrategy<Vec<u8>> {
    proptest::collection::vec(any::<u8>(), 0..MAX_KEY_LENGTH).boxed()
}

/// Test fixture owning a temporary directory and any environment variables
/// set through it.
pub struct TestFixture {
    /// Temporary directory for test files
    pub temp_dir: TempDir,
    /// Environment variables to clean up after the test
    env_vars: Vec<String>,
}

impl TestFixture {
    /// Create a new test fixture.
    pub fn new() -> std::io::Result<Self> {
        Ok(Self {
            temp_dir: create_test_dir()?,
            env_vars: Vec::new(),
        })
    }

    /// Set an environment variable for this test.
    ///
    /// The variable is removed when the fixture is dropped.
    pub fn set_env<K: Into<String>, V: Into<String>>(&mut self, key: K, value: V) {
        let key = key.into();
        std::env::set_var(&key, value.into());
        self.env_vars.push(key);
    }

    /// Write `contents` to `name` inside the fixture directory.
    pub fn create_file<C: AsRef<[u8]>>(
        &self,
        name: &str,
        contents: C,
    ) -> std::io::Result<std::path::PathBuf> {
        let path = self.temp_dir.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }
}

impl Drop for TestFixture {
    fn drop(&mut self) {
        for key in &self.env_vars {
            std::env::remove_var(key);
        }
    }
}
