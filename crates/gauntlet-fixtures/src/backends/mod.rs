//! Database executors used by the loader.
//!
//! The loader only talks to [`FixtureConnection`] and
//! [`FixtureTransaction`]. The sqlx-backed implementations live in
//! [`postgres`] and [`mysql`].
//!
//! # Implementation Notes
//!
//! SQLx pools spread queries over several connections. A load must run on a
//! single connection, so every load acquires a dedicated `Transaction`
//! through `pool.begin()` and issues all statements on it.

pub mod mysql;
pub mod postgres;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{FixtureError, FixtureResult};

pub use mysql::MySqlConnection;
pub use postgres::PostgresConnection;

/// Supported database engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
	/// PostgreSQL.
	#[serde(alias = "postgresql")]
	Postgres,
	/// MySQL / MariaDB.
	Mysql,
}

impl DatabaseType {
	/// Canonical dialect name.
	///
	/// # Examples
	///
	/// ```
	/// use gauntlet_fixtures::backends::DatabaseType;
	///
	/// assert_eq!(DatabaseType::Postgres.as_str(), "postgresql");
	/// assert_eq!("MySQL".parse::<DatabaseType>().unwrap(), DatabaseType::Mysql);
	/// ```
	pub fn as_str(&self) -> &'static str {
		match self {
			DatabaseType::Postgres => "postgresql",
			DatabaseType::Mysql => "mysql",
		}
	}
}

impl fmt::Display for DatabaseType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for DatabaseType {
	type Err = FixtureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"postgres" | "postgresql" => Ok(DatabaseType::Postgres),
			"mysql" => Ok(DatabaseType::Mysql),
			other => Err(FixtureError::ConfigError(format!(
				"unsupported database engine '{}'",
				other
			))),
		}
	}
}

/// Bind parameter values
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
	/// SQL `NULL`.
	Null,
	/// Boolean.
	Bool(bool),
	/// Signed integer.
	Int(i64),
	/// Unsigned integer, e.g. a MySQL insert id.
	UInt(u64),
	/// Floating point number.
	Float(f64),
	/// Text.
	String(String),
}

impl From<&str> for QueryValue {
	fn from(s: &str) -> Self {
		QueryValue::String(s.to_string())
	}
}

impl From<i64> for QueryValue {
	fn from(i: i64) -> Self {
		QueryValue::Int(i)
	}
}

impl From<u64> for QueryValue {
	fn from(i: u64) -> Self {
		QueryValue::UInt(i)
	}
}

/// Outcome of a statement that returns no rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteResult {
	/// Rows changed by the statement.
	pub rows_affected: u64,
	/// Set by MySQL after an insert into an auto-increment table.
	pub last_insert_id: Option<u64>,
}

/// One result row, column name to JSON value.
pub type JsonRow = serde_json::Map<String, serde_json::Value>;

/// A database the loader can open transactions on.
#[async_trait]
pub trait FixtureConnection: Send + Sync {
	/// Engine behind this connection, used to pick the SQL dialect.
	fn database_type(&self) -> DatabaseType;

	/// Opens a transaction on a dedicated connection.
	async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>>;
}

/// Transaction executor
///
/// All statements run on the connection the transaction was opened on.
#[async_trait]
pub trait FixtureTransaction: Send + Sync {
	/// Runs a statement without parameters through the simple query
	/// protocol, so utility statements such as `DO` blocks work as written.
	async fn execute(&mut self, sql: &str) -> FixtureResult<ExecuteResult>;

	/// Runs a query and returns every row.
	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>)
	-> FixtureResult<Vec<JsonRow>>;

	/// Commit the transaction
	async fn commit(self: Box<Self>) -> FixtureResult<()>;

	/// Rollback the transaction
	async fn rollback(self: Box<Self>) -> FixtureResult<()>;
}

pub(crate) fn consumed() -> FixtureError {
	FixtureError::TransactionError("Transaction already consumed".to_string())
}

/// Renders a zone-less timestamp as an ISO 8601 string.
pub(crate) fn naive_timestamp(value: chrono::NaiveDateTime) -> serde_json::Value {
	serde_json::Value::String(value.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}
