//! Fixture loader configuration.
//!
//! Settings can be built in code or read from TOML:
//!
//! ```toml
//! [fixtures]
//! location = "tests/fixtures"
//! debug = true
//!
//! [[databases]]
//! name = "main"
//! engine = "postgres"
//! url = "${DATABASE_URL}"
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backends::{DatabaseType, FixtureConnection, MySqlConnection, PostgresConnection};
use crate::error::{FixtureError, FixtureResult};
use crate::multidb::MultiDbLoader;

/// Environment variable overriding the fixture directory.
pub const FIXTURES_DIR_ENV: &str = "GAUNTLET_FIXTURES_DIR";

/// Environment variable enabling debug output when non-empty.
pub const DEBUG_ENV: &str = "GAUNTLET_DEBUG";

/// Where fixtures live and how loudly they are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureConfig {
	/// Directory fixture names are resolved against.
	pub location: PathBuf,

	/// Log issued SQL and loaded files at info level instead of debug.
	pub debug: bool,
}

impl Default for FixtureConfig {
	fn default() -> Self {
		Self {
			location: PathBuf::from("fixtures"),
			debug: false,
		}
	}
}

impl FixtureConfig {
	/// Creates a configuration for fixtures under `location`.
	pub fn new(location: impl Into<PathBuf>) -> Self {
		Self {
			location: location.into(),
			debug: false,
		}
	}

	/// Sets the debug flag.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// Applies `GAUNTLET_FIXTURES_DIR` and `GAUNTLET_DEBUG` on top of
	/// the defaults.
	pub fn from_env() -> Self {
		let mut config = Self::default();
		if let Ok(location) = std::env::var(FIXTURES_DIR_ENV)
			&& !location.is_empty()
		{
			config.location = PathBuf::from(location);
		}
		config.debug = std::env::var(DEBUG_ENV).is_ok_and(|value| !value.is_empty());
		config
	}
}

/// Connection settings of one named database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
	/// Name tests use to address this database.
	pub name: String,

	/// Database engine.
	pub engine: DatabaseType,

	/// Connection URL
	///
	/// Can include environment variable reference: "${DATABASE_URL}"
	pub url: String,
}

impl DatabaseSettings {
	/// Resolve the connection URL, expanding environment variables.
	pub fn resolve_url(&self) -> FixtureResult<String> {
		if self.url.starts_with("${") && self.url.ends_with('}') {
			let var_name = &self.url[2..self.url.len() - 1];
			std::env::var(var_name).map_err(|_| {
				FixtureError::ConfigError(format!(
					"environment variable {} for database '{}' is not set",
					var_name, self.name
				))
			})
		} else if self.url.is_empty() {
			Err(FixtureError::ConfigError(format!(
				"database '{}' has no url",
				self.name
			)))
		} else {
			Ok(self.url.clone())
		}
	}

	/// Opens a connection pool for this database.
	pub async fn connect(&self) -> FixtureResult<Arc<dyn FixtureConnection>> {
		let url = self.resolve_url()?;
		let connection: Arc<dyn FixtureConnection> = match self.engine {
			DatabaseType::Postgres => Arc::new(PostgresConnection::connect(&url).await?),
			DatabaseType::Mysql => Arc::new(MySqlConnection::connect(&url).await?),
		};
		Ok(connection)
	}
}

/// Fixture settings plus the databases fixtures are loaded into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixtureSettings {
	/// Loader configuration.
	pub fixtures: FixtureConfig,

	/// Databases by name.
	pub databases: Vec<DatabaseSettings>,
}

impl FixtureSettings {
	/// Load settings from a TOML file.
	///
	/// # Errors
	///
	/// Returns error if file cannot be read or parsed.
	pub fn from_file(path: impl AsRef<Path>) -> FixtureResult<Self> {
		let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
			FixtureError::ConfigError(format!("{}: {}", path.as_ref().display(), e))
		})?;
		Self::from_toml_str(&content)
	}

	/// Parse settings from a TOML string.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::ConfigError`] for invalid TOML or a database
	/// name used twice.
	pub fn from_toml_str(content: &str) -> FixtureResult<Self> {
		let settings: Self = toml::from_str(content)?;
		settings.validate()?;
		Ok(settings)
	}

	fn validate(&self) -> FixtureResult<()> {
		let mut seen = HashSet::new();
		for database in &self.databases {
			if !seen.insert(database.name.as_str()) {
				return Err(FixtureError::ConfigError(format!(
					"database '{}' is configured twice",
					database.name
				)));
			}
		}
		Ok(())
	}

	/// Connects every database and builds a dispatcher over them.
	pub async fn connect(&self) -> FixtureResult<MultiDbLoader> {
		let mut connections = HashMap::with_capacity(self.databases.len());
		for database in &self.databases {
			tracing::debug!(database = %database.name, engine = %database.engine, "Connecting fixture database");
			connections.insert(database.name.clone(), database.connect().await?);
		}
		Ok(MultiDbLoader::from_connections(connections, &self.fixtures))
	}
}
