//! Recording in-memory database.
//!
//! [`MockConnection`] records every statement issued through it, in order,
//! with `BEGIN`, `COMMIT` and `ROLLBACK` markers around each transaction.
//! Replies are scripted: insert ids for `execute` and row sets for
//! `fetch_all` are handed out first in, first out.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use gauntlet_fixtures::backends::{
	DatabaseType, ExecuteResult, FixtureConnection, FixtureTransaction, JsonRow, QueryValue,
};
use gauntlet_fixtures::{FixtureError, FixtureResult};
use parking_lot::Mutex;
use serde_json::Value;

#[derive(Default)]
struct Script {
	log: Vec<String>,
	params: Vec<Vec<QueryValue>>,
	insert_ids: VecDeque<Option<u64>>,
	replies: VecDeque<FixtureResult<Vec<JsonRow>>>,
	fail_on: Option<String>,
}

/// Scripted [`FixtureConnection`].
#[derive(Clone)]
pub struct MockConnection {
	database_type: DatabaseType,
	script: Arc<Mutex<Script>>,
}

impl MockConnection {
	/// Creates a PostgreSQL-flavoured mock.
	pub fn postgres() -> Self {
		Self::new(DatabaseType::Postgres)
	}

	/// Creates a MySQL-flavoured mock.
	pub fn mysql() -> Self {
		Self::new(DatabaseType::Mysql)
	}

	fn new(database_type: DatabaseType) -> Self {
		Self {
			database_type,
			script: Arc::new(Mutex::new(Script::default())),
		}
	}

	/// Fails the first statement containing `needle`.
	pub fn fail_on(self, needle: &str) -> Self {
		self.script.lock().fail_on = Some(needle.to_string());
		self
	}

	/// Queues the insert id of the next INSERT run through `execute`.
	pub fn push_insert_id(&self, id: Option<u64>) {
		self.script.lock().insert_ids.push_back(id);
	}

	/// Queues the rows of the next `fetch_all`.
	pub fn push_rows(&self, rows: Vec<Value>) {
		let rows = rows.into_iter().map(object).collect();
		self.script.lock().replies.push_back(Ok(rows));
	}

	/// Queues a PostgreSQL `RETURNING row_to_json(row)` reply.
	pub fn push_returning(&self, rows: Vec<Value>) {
		let rows = rows
			.into_iter()
			.map(|row| {
				let mut wrapped = JsonRow::new();
				wrapped.insert("row_to_json".to_string(), row);
				wrapped
			})
			.collect();
		self.script.lock().replies.push_back(Ok(rows));
	}

	/// Queues an error for the next `fetch_all`.
	pub fn push_error(&self, error: FixtureError) {
		self.script.lock().replies.push_back(Err(error));
	}

	/// Every statement issued so far.
	pub fn log(&self) -> Vec<String> {
		self.script.lock().log.clone()
	}

	/// Bind parameters of every `fetch_all`, in order.
	pub fn params(&self) -> Vec<Vec<QueryValue>> {
		self.script.lock().params.clone()
	}

	/// Statements other than the transaction markers.
	pub fn statements(&self) -> Vec<String> {
		self.log()
			.into_iter()
			.filter(|s| !matches!(s.as_str(), "BEGIN" | "COMMIT" | "ROLLBACK"))
			.collect()
	}
}

fn object(value: Value) -> JsonRow {
	match value {
		Value::Object(map) => map,
		other => panic!("scripted row must be an object, got {}", other),
	}
}

#[async_trait]
impl FixtureConnection for MockConnection {
	fn database_type(&self) -> DatabaseType {
		self.database_type
	}

	async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>> {
		self.script.lock().log.push("BEGIN".to_string());
		Ok(Box::new(MockTransaction {
			script: self.script.clone(),
		}))
	}
}

struct MockTransaction {
	script: Arc<Mutex<Script>>,
}

impl MockTransaction {
	fn record(&self, sql: &str) -> FixtureResult<()> {
		let mut script = self.script.lock();
		script.log.push(sql.to_string());
		if let Some(needle) = &script.fail_on
			&& sql.contains(needle.as_str())
		{
			script.fail_on = None;
			return Err(FixtureError::SqlExecution(format!("mock failure on '{}'", sql)));
		}
		Ok(())
	}
}

#[async_trait]
impl FixtureTransaction for MockTransaction {
	async fn execute(&mut self, sql: &str) -> FixtureResult<ExecuteResult> {
		self.record(sql)?;
		let last_insert_id = if sql.starts_with("INSERT") {
			self.script.lock().insert_ids.pop_front().flatten()
		} else {
			None
		};
		Ok(ExecuteResult {
			rows_affected: 1,
			last_insert_id,
		})
	}

	async fn fetch_all(&mut self, sql: &str, params: Vec<QueryValue>) -> FixtureResult<Vec<JsonRow>> {
		self.record(sql)?;
		let mut script = self.script.lock();
		script.params.push(params);
		script.replies.pop_front().unwrap_or_else(|| Ok(Vec::new()))
	}

	async fn commit(self: Box<Self>) -> FixtureResult<()> {
		self.script.lock().log.push("COMMIT".to_string());
		Ok(())
	}

	async fn rollback(self: Box<Self>) -> FixtureResult<()> {
		self.script.lock().log.push("ROLLBACK".to_string());
		Ok(())
	}
}
