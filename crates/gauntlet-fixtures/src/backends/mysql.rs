//! MySQL executor

use async_trait::async_trait;
use serde_json::Value;
use sqlx::mysql::{MySqlArguments, MySqlDatabaseError, MySqlPoolOptions, MySqlRow};
use sqlx::{Column, MySql, MySqlPool, Row as SqlxRow, Transaction, TypeInfo, ValueRef};

use super::{
	DatabaseType, ExecuteResult, FixtureConnection, FixtureTransaction, JsonRow, QueryValue,
	consumed, naive_timestamp,
};
use crate::error::{FixtureError, FixtureResult};

/// `ER_BAD_FIELD_ERROR`: unknown column in a statement.
const ER_BAD_FIELD_ERROR: u16 = 1054;

/// MySQL connection pool
#[derive(Debug, Clone)]
pub struct MySqlConnection {
	pool: MySqlPool,
}

impl MySqlConnection {
	/// Connects a pool to `url`.
	pub async fn connect(url: &str) -> FixtureResult<Self> {
		let pool = MySqlPoolOptions::new().connect(url).await?;
		Ok(Self::from_pool(pool))
	}

	/// Wraps an existing pool.
	pub fn from_pool(pool: MySqlPool) -> Self {
		Self { pool }
	}

	/// The underlying pool.
	pub fn pool(&self) -> &MySqlPool {
		&self.pool
	}
}

#[async_trait]
impl FixtureConnection for MySqlConnection {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
	}

	async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>> {
		let tx = self.pool.begin().await?;
		Ok(Box::new(MySqlFixtureTransaction::new(tx)))
	}
}

/// MySQL transaction executor
pub struct MySqlFixtureTransaction {
	tx: Option<Transaction<'static, MySql>>,
}

impl MySqlFixtureTransaction {
	/// Wraps an open transaction.
	pub fn new(tx: Transaction<'static, MySql>) -> Self {
		Self { tx: Some(tx) }
	}

	fn bind_value<'q>(
		query: sqlx::query::Query<'q, MySql, MySqlArguments>,
		value: &'q QueryValue,
	) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
		match value {
			QueryValue::Null => query.bind(None::<i32>),
			QueryValue::Bool(b) => query.bind(b),
			QueryValue::Int(i) => query.bind(i),
			QueryValue::UInt(u) => query.bind(u),
			QueryValue::Float(f) => query.bind(f),
			QueryValue::String(s) => query.bind(s),
		}
	}
}

/// Maps "unknown column" to [`FixtureError::MissingPrimaryKeyColumn`].
///
/// The loader only reads back rows by `id`, so this is the one unknown
/// column a fixture query can hit.
fn map_fetch_error(err: sqlx::Error) -> FixtureError {
	if let sqlx::Error::Database(db_err) = &err
		&& let Some(mysql_err) = db_err.try_downcast_ref::<MySqlDatabaseError>()
		&& mysql_err.number() == ER_BAD_FIELD_ERROR
	{
		return FixtureError::MissingPrimaryKeyColumn(mysql_err.message().to_string());
	}
	err.into()
}

/// Whether a column holds a JSON document.
///
/// The JSON decoder also accepts text and blob columns, so it is only used
/// when the column type says so.
fn is_json_column(type_name: &str) -> bool {
	type_name.eq_ignore_ascii_case("JSON")
}

/// Converts a driver row to a JSON object, probing column types in turn.
///
/// Columns of types with no JSON mapping are left out.
pub(crate) fn convert_row(mysql_row: &MySqlRow) -> JsonRow {
	let mut row = JsonRow::new();
	for column in mysql_row.columns() {
		let name = column.name();

		let is_null = mysql_row
			.try_get_raw(column.ordinal())
			.map(|raw| raw.is_null())
			.unwrap_or(false);

		let value = if is_null {
			Value::Null
		} else if is_json_column(column.type_info().name()) {
			match mysql_row.try_get::<Value, _>(name) {
				Ok(value) => value,
				Err(err) => {
					tracing::debug!(column = %name, error = %err, "Skipping undecodable JSON column");
					continue;
				}
			}
		} else if let Ok(value) = mysql_row.try_get::<bool, _>(name) {
			Value::Bool(value)
		} else if let Ok(value) = mysql_row.try_get::<i64, _>(name) {
			Value::from(value)
		} else if let Ok(value) = mysql_row.try_get::<u64, _>(name) {
			Value::from(value)
		} else if let Ok(value) = mysql_row.try_get::<i32, _>(name) {
			Value::from(value)
		} else if let Ok(value) = mysql_row.try_get::<f64, _>(name) {
			Value::from(value)
		} else if let Ok(value) = mysql_row.try_get::<f32, _>(name) {
			Value::from(value)
		} else if let Ok(value) = mysql_row.try_get::<String, _>(name) {
			Value::String(value)
		} else if let Ok(value) = mysql_row.try_get::<Vec<u8>, _>(name) {
			// MySQL often reports text columns as binary
			Value::String(String::from_utf8_lossy(&value).into_owned())
		} else if let Ok(value) = mysql_row.try_get::<chrono::NaiveDateTime, _>(name) {
			naive_timestamp(value)
		} else if let Ok(value) = mysql_row.try_get::<chrono::DateTime<chrono::Utc>, _>(name) {
			Value::String(value.to_rfc3339())
		} else if let Ok(value) = mysql_row.try_get::<chrono::NaiveDate, _>(name) {
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
impl FixtureTransaction for MySqlFixtureTransaction {
	async fn execute(&mut self, sql: &str) -> FixtureResult<ExecuteResult> {
		let tx = self.tx.as_mut().ok_or_else(consumed)?;
		let result = sqlx::Executor::execute(&mut **tx, sqlx::raw_sql(sql)).await?;
		let last_insert_id = result.last_insert_id();
		Ok(ExecuteResult {
			rows_affected: result.rows_affected(),
			last_insert_id: (last_insert_id != 0).then_some(last_insert_id),
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
			query = Self::bind_value(query, param);
		}
		let rows = query.fetch_all(&mut **tx).await.map_err(map_fetch_error)?;
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
