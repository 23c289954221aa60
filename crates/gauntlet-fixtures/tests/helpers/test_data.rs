//! Test data loader helper.
//!
//! Provides access to the fixture documents under `tests/fixtures/data` and
//! scratch directories for documents written by a test.

use std::path::{Path, PathBuf};

use gauntlet_fixtures::FixtureConfig;
use tempfile::TempDir;

/// Test data loader for fixture files.
pub struct TestDataLoader {
	base_path: PathBuf,
}

impl TestDataLoader {
	/// Create a new test data loader.
	///
	/// Uses the default test fixtures data directory.
	pub fn new() -> Self {
		Self {
			base_path: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/data"),
		}
	}

	/// Create a test data loader with a custom base path.
	pub fn with_base<P: AsRef<Path>>(base_path: P) -> Self {
		Self {
			base_path: base_path.as_ref().to_path_buf(),
		}
	}

	/// Get the full path to a test data file.
	pub fn path(&self, name: &str) -> PathBuf {
		self.base_path.join(name)
	}

	/// Check if a test data file exists.
	pub fn exists(&self, name: &str) -> bool {
		self.path(name).exists()
	}

	/// Loader configuration pointing at this directory.
	pub fn config(&self) -> FixtureConfig {
		FixtureConfig::new(&self.base_path)
	}
}

impl Default for TestDataLoader {
	fn default() -> Self {
		Self::new()
	}
}

/// Temporary fixture directory populated by the test.
pub struct ScratchFixtures {
	dir: TempDir,
}

impl ScratchFixtures {
	/// Creates an empty directory.
	pub fn new() -> Self {
		Self {
			dir: TempDir::new().expect("Failed to create temp dir"),
		}
	}

	/// Writes `content` to `name` and returns `self` for chaining.
	pub fn with(self, name: &str, content: &str) -> Self {
		std::fs::write(self.dir.path().join(name), content)
			.unwrap_or_else(|_| panic!("Failed to write fixture {}", name));
		self
	}

	/// Loader configuration pointing at this directory.
	pub fn config(&self) -> FixtureConfig {
		FixtureConfig::new(self.dir.path())
	}
}

impl Default for ScratchFixtures {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[rstest::rstest]
	fn test_test_data_loader_path() {
		let loader = TestDataLoader::new();
		let path = loader.path("users.yaml");
		assert!(path.ends_with("tests/fixtures/data/users.yaml"));
		assert!(loader.exists("users.yaml"));
	}

	#[rstest::rstest]
	fn test_test_data_loader_with_base() {
		let loader = TestDataLoader::with_base("/custom/path");
		assert_eq!(loader.base_path, PathBuf::from("/custom/path"));
	}

	#[rstest::rstest]
	fn test_scratch_fixtures_write() {
		let scratch = ScratchFixtures::new().with("a.yaml", "tables: {}\n");
		assert!(scratch.config().location.join("a.yaml").is_file());
	}
}
