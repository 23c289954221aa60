//! Storage interface for Gauntlet test runners.
//!
//! A runner seeds a database before a test with
//! [`Storage::load_fixtures`] and inspects it afterwards with
//! [`Storage::execute_query`]. [`SqlStorage`] implements both for
//! PostgreSQL and MySQL on top of `gauntlet-fixtures`.

#![warn(missing_docs)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use gauntlet_fixtures::backends::{
	DatabaseType, FixtureConnection, JsonRow, MySqlConnection, PostgresConnection,
};
use gauntlet_fixtures::{FixtureConfig, FixtureLoader, Loader};
use serde_json::Value;

pub use gauntlet_fixtures::{FixtureError, FixtureResult};

/// A database a test runner can seed and query.
#[async_trait]
pub trait Storage: Send + Sync {
	/// Dialect name, e.g. `"postgresql"`.
	fn storage_type(&self) -> &str;

	/// Loads the named fixture sets found under `location`.
	async fn load_fixtures(&self, location: &Path, names: &[String]) -> FixtureResult<()>;

	/// Runs a query and returns one JSON value per row.
	async fn execute_query(&self, query: &str) -> FixtureResult<Vec<Value>>;
}

/// [`Storage`] backed by a SQL connection.
pub struct SqlStorage {
	connection: Arc<dyn FixtureConnection>,
	debug: bool,
}

impl SqlStorage {
	/// Wraps an open connection.
	pub fn new(connection: Arc<dyn FixtureConnection>) -> Self {
		Self {
			connection,
			debug: false,
		}
	}

	/// Opens a pool for `engine` at `url`.
	pub async fn connect(engine: DatabaseType, url: &str) -> FixtureResult<Self> {
		let connection: Arc<dyn FixtureConnection> = match engine {
			DatabaseType::Postgres => Arc::new(PostgresConnection::connect(url).await?),
			DatabaseType::Mysql => Arc::new(MySqlConnection::connect(url).await?),
		};
		Ok(Self::new(connection))
	}

	/// Makes fixture loads log at info level.
	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	/// The underlying connection.
	pub fn connection(&self) -> &Arc<dyn FixtureConnection> {
		&self.connection
	}

	/// Text before the first `;`.
	fn first_statement(query: &str) -> &str {
		query
			.split_once(';')
			.map_or(query, |(head, _)| head)
			.trim()
	}

	fn wrap_query(&self, query: &str) -> String {
		let statement = Self::first_statement(query);
		match self.connection.database_type() {
			DatabaseType::Postgres => {
				format!("SELECT row_to_json(rows) FROM ({}) rows;", statement)
			}
			DatabaseType::Mysql => statement.to_string(),
		}
	}

	fn unwrap_row(&self, row: JsonRow) -> FixtureResult<Value> {
		match self.connection.database_type() {
			DatabaseType::Postgres => match row.into_iter().next() {
				Some((_, Value::String(text))) => Ok(serde_json::from_str(&text)?),
				Some((_, value)) => Ok(value),
				None => Err(FixtureError::SqlExecution(
					"row_to_json returned no column".to_string(),
				)),
			},
			DatabaseType::Mysql => Ok(Value::Object(row)),
		}
	}
}

#[async_trait]
impl Storage for SqlStorage {
	fn storage_type(&self) -> &str {
		self.connection.database_type().as_str()
	}

	async fn load_fixtures(&self, location: &Path, names: &[String]) -> FixtureResult<()> {
		let config = FixtureConfig::new(location).with_debug(self.debug);
		FixtureLoader::new(self.connection.clone(), config)
			.load(names)
			.await
	}

	async fn execute_query(&self, query: &str) -> FixtureResult<Vec<Value>> {
		let sql = self.wrap_query(query);
		tracing::debug!(sql = %sql, "Executing query");

		let mut tx = self.connection.begin().await?;
		let rows = match tx.fetch_all(&sql, Vec::new()).await {
			Ok(rows) => rows,
			Err(err) => {
				if let Err(rollback_err) = tx.rollback().await {
					tracing::warn!(error = %rollback_err, "Failed to roll back query transaction");
				}
				return Err(err);
			}
		};
		tx.commit().await?;

		rows.into_iter().map(|row| self.unwrap_row(row)).collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use gauntlet_fixtures::backends::{ExecuteResult, FixtureTransaction, QueryValue};
	use parking_lot::Mutex;
	use rstest::rstest;
	use serde_json::json;

	struct Recording {
		database_type: DatabaseType,
		log: Arc<Mutex<Vec<String>>>,
		rows: Vec<JsonRow>,
	}

	struct RecordingTransaction {
		log: Arc<Mutex<Vec<String>>>,
		rows: Vec<JsonRow>,
	}

	#[async_trait]
	impl FixtureConnection for Recording {
		fn database_type(&self) -> DatabaseType {
			self.database_type
		}

		async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>> {
			self.log.lock().push("BEGIN".to_string());
			Ok(Box::new(RecordingTransaction {
				log: self.log.clone(),
				rows: self.rows.clone(),
			}))
		}
	}

	#[async_trait]
	impl FixtureTransaction for RecordingTransaction {
		async fn execute(&mut self, sql: &str) -> FixtureResult<ExecuteResult> {
			self.log.lock().push(sql.to_string());
			Ok(ExecuteResult::default())
		}

		async fn fetch_all(
			&mut self,
			sql: &str,
			_params: Vec<QueryValue>,
		) -> FixtureResult<Vec<JsonRow>> {
			self.log.lock().push(sql.to_string());
			Ok(std::mem::take(&mut self.rows))
		}

		async fn commit(self: Box<Self>) -> FixtureResult<()> {
			self.log.lock().push("COMMIT".to_string());
			Ok(())
		}

		async fn rollback(self: Box<Self>) -> FixtureResult<()> {
			self.log.lock().push("ROLLBACK".to_string());
			Ok(())
		}
	}

	fn storage(database_type: DatabaseType, rows: Vec<Value>) -> (SqlStorage, Arc<Mutex<Vec<String>>>) {
		let log = Arc::new(Mutex::new(Vec::new()));
		let rows = rows
			.into_iter()
			.filter_map(|row| match row {
				Value::Object(map) => Some(map),
				_ => None,
			})
			.collect();
		let connection = Recording {
			database_type,
			log: log.clone(),
			rows,
		};
		(SqlStorage::new(Arc::new(connection)), log)
	}

	#[rstest]
	#[case("SELECT 1", "SELECT 1")]
	#[case("SELECT 1; DROP TABLE users;", "SELECT 1")]
	#[case("  SELECT id FROM t  ", "SELECT id FROM t")]
	fn test_first_statement(#[case] query: &str, #[case] expected: &str) {
		assert_eq!(SqlStorage::first_statement(query), expected);
	}

	#[rstest]
	#[case(DatabaseType::Postgres, "postgresql")]
	#[case(DatabaseType::Mysql, "mysql")]
	fn test_storage_type(#[case] database_type: DatabaseType, #[case] expected: &str) {
		let (storage, _) = storage(database_type, Vec::new());
		assert_eq!(storage.storage_type(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_postgres_query_is_wrapped_in_row_to_json() {
		let (storage, log) = storage(
			DatabaseType::Postgres,
			vec![
				json!({"row_to_json": {"id": 1, "name": "Alice"}}),
				json!({"row_to_json": "{\"id\": 2, \"name\": \"Bob\"}"}),
			],
		);

		let rows = storage
			.execute_query("SELECT id, name FROM users ORDER BY id; SELECT 2")
			.await
			.unwrap();

		assert_eq!(
			rows,
			vec![json!({"id": 1, "name": "Alice"}), json!({"id": 2, "name": "Bob"})]
		);
		assert_eq!(
			*log.lock(),
			vec![
				"BEGIN",
				"SELECT row_to_json(rows) FROM (SELECT id, name FROM users ORDER BY id) rows;",
				"COMMIT",
			]
		);
	}

	#[rstest]
	#[tokio::test]
	async fn test_mysql_rows_become_objects() {
		let (storage, log) = storage(DatabaseType::Mysql, vec![json!({"id": 1, "name": "Alice"})]);

		let rows = storage.execute_query("SELECT * FROM users;").await.unwrap();

		assert_eq!(rows, vec![json!({"id": 1, "name": "Alice"})]);
		assert_eq!(*log.lock(), vec!["BEGIN", "SELECT * FROM users", "COMMIT"]);
	}

	#[rstest]
	#[tokio::test]
	async fn test_load_fixtures_uses_location() {
		let dir = tempfile::TempDir::new().unwrap();
		std::fs::write(dir.path().join("users.yaml"), "tables:\n  users:\n    - name: a\n").unwrap();
		let (storage, log) = storage(DatabaseType::Mysql, Vec::new());

		storage
			.load_fixtures(dir.path(), &["users".to_string()])
			.await
			.unwrap();

		assert_eq!(
			*log.lock(),
			vec![
				"BEGIN",
				"TRUNCATE TABLE `users`",
				"COMMIT",
				"BEGIN",
				"INSERT INTO `users` (`name`) VALUES ('a')",
				"COMMIT",
			]
		);
	}
}
