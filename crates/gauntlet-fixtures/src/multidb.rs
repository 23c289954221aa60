//! Fixture loading across several databases.
//!
//! Each database is loaded in its own transaction, one after the other.
//! There is no coordination between them: when a later database fails,
//! earlier ones stay committed.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backends::FixtureConnection;
use crate::config::FixtureConfig;
use crate::error::{FixtureError, FixtureResult, ResultExt};
use crate::loader::{FixtureLoader, Loader};

/// Fixture sets to load into one named database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseFixtures {
	/// Database name as configured.
	#[serde(alias = "dbName")]
	pub database: String,

	/// Fixture names, in load order.
	pub files: Vec<String>,
}

impl DatabaseFixtures {
	/// Creates an entry.
	pub fn new<I, S>(database: impl Into<String>, files: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			database: database.into(),
			files: files.into_iter().map(Into::into).collect(),
		}
	}
}

/// Dispatches fixture loads to per-database loaders.
#[derive(Default)]
pub struct MultiDbLoader {
	loaders: HashMap<String, Arc<dyn Loader>>,
}

impl MultiDbLoader {
	/// Creates a dispatcher over the given loaders.
	pub fn new(loaders: HashMap<String, Arc<dyn Loader>>) -> Self {
		Self { loaders }
	}

	/// Builds one [`FixtureLoader`] per connection, sharing `config`.
	pub fn from_connections(
		connections: HashMap<String, Arc<dyn FixtureConnection>>,
		config: &FixtureConfig,
	) -> Self {
		let loaders = connections
			.into_iter()
			.map(|(name, connection)| {
				let loader: Arc<dyn Loader> =
					Arc::new(FixtureLoader::new(connection, config.clone()));
				(name, loader)
			})
			.collect();
		Self { loaders }
	}

	/// Adds or replaces the loader of a database.
	pub fn register(&mut self, database: impl Into<String>, loader: Arc<dyn Loader>) {
		self.loaders.insert(database.into(), loader);
	}

	/// Returns the loader of a database.
	pub fn get(&self, database: &str) -> Option<&Arc<dyn Loader>> {
		self.loaders.get(database)
	}

	/// Loads every entry in order, stopping at the first failure.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UnknownDatabase`] naming `test` when an entry
	/// has no loader; entries before it have already been committed.
	pub async fn load(&self, test: &str, fixtures: &[DatabaseFixtures]) -> FixtureResult<()> {
		for entry in fixtures {
			let loader = self
				.loaders
				.get(&entry.database)
				.ok_or_else(|| FixtureError::UnknownDatabase {
					database: entry.database.clone(),
					test: test.to_string(),
				})?;

			tracing::debug!(database = %entry.database, files = ?entry.files, "Loading fixtures");
			loader
				.load(&entry.files)
				.await
				.with_location(|| format!("database '{}'", entry.database))?;
		}
		Ok(())
	}
}
