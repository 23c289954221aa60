//! PostgreSQL executor

use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{Column, PgPool, Postgres, Row as SqlxRow, Transaction, ValueRef};
use uuid::Uuid;

use super::{
	DatabaseType, ExecuteResult, FixtureConnection, FixtureTransaction, JsonRow, QueryValue,
	consumed, naive_timestamp,
};
use crate::error::{FixtureError, FixtureResult};

/// PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PostgresConnection {
	pool: PgPool,
}

impl PostgresConnection {
	/// Connects a pool to `url`.
	pub async fn connect(url: &str) -> FixtureResult<Self> {
		let pool = PgPoolOptions::new().connect(url).await?;
		Ok(Self::from_pool(pool))
	}

	/// Wraps an existing pool.
	pub fn from_pool(pool: PgPool) -> Self {
		Self { pool }
	}

	/// The underlying pool.
	pub fn pool(&self) -> &PgPool {
		&self.pool
	}
}

#[async_trait]
impl FixtureConnection for PostgresConnection {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(PgFixtureTransaction::new(tx)))
	}
}

/// PostgreSQL transaction executor
///
/// Wraps a SQLx `Transaction` so every statement of a load runs on the same
/// physical connection.
pub struct PgFixtureTransaction {
	tx: Option<Transaction<'static, Postgres>>,
}

impl PgFixtureTransaction {
	/// Wraps an open transaction.
	pub fn new(tx: Transaction<'static, Postgres>) -> Self {
		Self { tx: Some(tx) }
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, Postgres, PgArguments>,
		value: &'q QueryValue,
	) -> FixtureResult<sqlx::query::Query<'q, Postgres, PgArguments>> {
		Ok(match value {
			QueryValue::Null => query.bind(None::<i32>),
			QueryValue::Bool(b) => query.bind(b),
			QueryValue::Int(i) => query.bind(i),
			QueryValue::UInt(u) => query.bind(bigint(*u)?),
			QueryValue::Float(f) => query.bind(f),
			QueryValue::String(s) => query.bind(s),
		})
	}
}

/// PostgreSQL has no unsigned integers, so `u64` binds as `bigint`.
fn bigint(value: u64) -> FixtureResult<i64> {
	i64::try_from(value).map_err(|_| {
		FixtureError::SqlExecution(format!(
			"parameter {} does not fit a PostgreSQL bigint",
			value
		))
	})
}

/// Converts a driver row to a JSON object, probing column types in turn.
///
/// Columns of types with no JSON mapping are left out.
pub(crate) fn convert_row(pg_row: &PgRow) -> JsonRow {
	let mut row = JsonRow::new();
	for column in pg_row.columns() {
		let name = column.name();

		let is_null = pg_row
			.try_get_raw(column.ordinal())
			.map(|raw| raw.is_null())
			.unwrap_or(false);

		let value = if is_null {
			Value::Null
		} else if let Ok(value) = pg_row.try_get::<Value, _>(name) {
			value
		} else if let Ok(value) = pg_row.try_get::<Uuid, _>(name) {
			Value::String(value.to_string())
		} else if let Ok(value) = pg_row.try_get::<bool, _>(name) {
			Value::Bool(value)
		} else if let Ok(value) = pg_row.try_get::<i64, _>(name) {
			Value::from(value)
		} else if let Ok(value) = pg_row.try_get::<i32, _>(name) {
			Value::from(value)
		} else if let Ok(value) = pg_row.try_get::<i16, _>(name) {
			Value::from(value)
		} else if let Ok(value) = pg_row.try_get::<f64, _>(name) {
			Value::from(value)
		} else if let Ok(value) = pg_row.try_get::<f32, _>(name) {
			Value::from(value)
		} else if let Ok(value) = pg_row.try_get::<String, _>(name) {
			Value::String(value)
		} else if let Ok(value) = pg_row.try_get::<Vec<u8>, _>(name) {
			Value::String(String::from_utf8_lossy(&value).into_owned())
		} else if let Ok(value) = pg_row.try_get::<chrono::NaiveDateTime, _>(name) {
			naive_timestamp(value)
		} else if let Ok(value) = pg_row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
			Value::String(value.to_rfc3339())
		} else if let Ok(value) = pg_row.try_get::<chrono::NaiveDate, _>(name) {
			Value::String(value.to_string())
		} else {
			tracing::debug!(column = %name, "Skipping column with unsupported type");
			continue;
		};
		row.insert(name.to_string(), value);
	}
	row
}

#[async_trait]
impl FixtureTransaction for PgFixtureTransaction {
	async fn execute(&mut self, sql: &str) -> FixtureResult<ExecuteResult> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;
		let result = sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(sql)).await?;
		Ok(ExecuteResult {
			rows_affected: result.rows_affected(),
			last_insert_id: None,
		})
	}

	async fn fetch_all(
		&mut self,
		sql: &str,
		params: Vec<QueryValue>,
	) -> FixtureResult<Vec<JsonRow>> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;

		let mut query = sqlx::query(sql).persistent(false);
		for param in &params {
			query = Self::bind_value(query, param)?;
		}
		let rows = query.fetch_all(&mut **tx).await?;
		Ok(rows.iter().map(convert_row).collect())
	}

	async fn commit(mut self: Box<Self>) -> FixtureResult<()> {
		let tx = self.tx.take().ok_or_else(consumed)?;
		tx.commit().await?;
		Ok(())
	}

	async fn rollback(mut self: Box<Self>) -> FixtureResult<()> {
		let tx = self.tx.take().ok_or_else(consumed)?;
		tx.rollback().await?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(0, 0)]
	#[case(i64::MAX as u64, i64::MAX)]
	fn test_bigint_in_range(#[case] value: u64, #[case] expected: i64) {
		assert_eq!(bigint(value).unwrap(), expected);
	}

	#[rstest]
	#[case(i64::MAX as u64 + 1)]
	#[case(u64::MAX)]
	fn test_bigint_overflow_is_error(#[case] value: u64) {
		let err = bigint(value).unwrap_err();
		assert!(matches!(err, FixtureError::SqlExecution(_)));
		assert!(err.to_string().contains(&value.to_string()));
	}
}
