//! Error types for fixture loading.
//!
//! Every failure raised while resolving, rendering or executing fixtures is a
//! [`FixtureError`]. Errors are wrapped with [`FixtureError::Context`] on the
//! way up so the caller sees which fixture, file, table, row and field failed;
//! [`FixtureError::root_cause`] recovers the underlying kind.

use thiserror::Error;

/// Errors that can occur while loading fixtures.
#[derive(Debug, Error)]
pub enum FixtureError {
	/// None of the candidate paths for a fixture name exist.
	#[error("Fixture file not found: {name} (searched in {location})")]
	FileNotFound {
		/// Fixture name as requested.
		name: String,
		/// Directory that was searched.
		location: String,
	},

	/// The document has an unexpected shape.
	#[error("Parse error: {0}")]
	ParseError(String),

	/// The document is not valid YAML.
	#[error("YAML error: {0}")]
	Yaml(#[from] serde_yaml::Error),

	/// A `$name` was defined twice in one load.
	#[error("Duplicate reference name: {0}")]
	DuplicateName(String),

	/// An `$extend` target, `$refName` or referenced field does not exist.
	#[error("Undefined reference: {0}")]
	UndefinedReference(String),

	/// A `$` expression is neither `$eval(...)` nor `$refName.field`.
	#[error("Invalid reference {0}, correct form is $refName.field")]
	InvalidReference(String),

	/// A malformed `$eval(...)` expression.
	#[error("Invalid $eval() usage: {0}")]
	InvalidEvalExpression(String),

	/// A value that cannot be rendered as SQL.
	#[error("Unsupported value type: {0}")]
	UnsupportedValueType(String),

	/// A statement failed in the database.
	#[error("SQL execution error: {0}")]
	SqlExecution(String),

	/// The table read back after a MySQL insert has no `id` column.
	#[error("Missing primary key column: {0}")]
	MissingPrimaryKeyColumn(String),

	/// The multi-database dispatcher has no loader for a database.
	#[error("Loader for database '{database}' does not exist (test: {test})")]
	UnknownDatabase {
		/// Database name requested by the test.
		database: String,
		/// Name of the test that requested it.
		test: String,
	},

	/// Transaction lifecycle misuse.
	#[error("Transaction error: {0}")]
	TransactionError(String),

	/// Invalid settings.
	#[error("Configuration error: {0}")]
	ConfigError(String),

	/// I/O operation failed.
	#[error("IO error: {0}")]
	IoError(#[from] std::io::Error),

	/// JSON serialization/deserialization error.
	#[error("JSON error: {0}")]
	JsonError(#[from] serde_json::Error),

	/// An error annotated with where it happened.
	#[error("{location}: {source}")]
	Context {
		/// Human-readable location, e.g. `table "public"."users"`.
		location: String,
		/// The wrapped error.
		#[source]
		source: Box<FixtureError>,
	},
}

impl FixtureError {
	/// Wraps the error with a location description.
	pub fn context(self, location: impl Into<String>) -> Self {
		FixtureError::Context {
			location: location.into(),
			source: Box::new(self),
		}
	}

	/// Returns the innermost error, skipping all context layers.
	pub fn root_cause(&self) -> &FixtureError {
		let mut current = self;
		while let FixtureError::Context { source, .. } = current {
			current = source;
		}
		current
	}

	/// Returns false only for the soft MySQL "no id column" case.
	pub fn is_fatal(&self) -> bool {
		!matches!(self.root_cause(), FixtureError::MissingPrimaryKeyColumn(_))
	}
}

impl From<sqlx::Error> for FixtureError {
	fn from(err: sqlx::Error) -> Self {
		FixtureError::SqlExecution(err.to_string())
	}
}

impl From<toml::de::Error> for FixtureError {
	fn from(err: toml::de::Error) -> Self {
		FixtureError::ConfigError(err.to_string())
	}
}

/// Result type alias for fixture operations.
pub type FixtureResult<T> = Result<T, FixtureError>;

/// Adds [`FixtureError::context`] to results.
pub trait ResultExt<T> {
	/// Wraps the error, if any, with a lazily built location.
	fn with_location<F, S>(self, location: F) -> FixtureResult<T>
	where
		F: FnOnce() -> S,
		S: Into<String>;
}

impl<T> ResultExt<T> for FixtureResult<T> {
	fn with_location<F, S>(self, location: F) -> FixtureResult<T>
	where
		F: FnOnce() -> S,
		S: Into<String>,
	{
		self.map_err(|err| err.context(location()))
	}
}
