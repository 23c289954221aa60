//! MySQL dialect
//!
//! MySQL has no `RETURNING`, so rows are inserted one at a time and read
//! back by the generated id. Tables are truncated one by one without
//! disabling foreign key checks.
//!
//! `TRUNCATE` commits implicitly in MySQL, so the tables are truncated in a
//! transaction of their own and only the inserts are atomic. A failed load
//! rolls back its inserts but leaves the tables emptied.

use async_trait::async_trait;

use super::{Dialect, InsertBatch, escape_literal};
use crate::backends::{DatabaseType, FixtureTransaction, JsonRow, QueryValue};
use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::{LoadContext, TableName};

/// MySQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
	/// Creates the dialect.
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Dialect for MySqlDialect {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Mysql
	}

	fn table_name(&self, source: &str) -> TableName {
		TableName::bare(source)
	}

	fn quote_identifier(&self, name: &str) -> String {
		format!("`{}`", name.replace('`', "``"))
	}

	fn quote_literal(&self, value: &str) -> String {
		format!("'{}'", escape_literal(value))
	}

	fn rows_per_statement(&self) -> Option<usize> {
		Some(1)
	}

	fn build_truncate(&self, tables: &[TableName]) -> Vec<String> {
		tables
			.iter()
			.map(|table| format!("TRUNCATE TABLE {}", self.qualified_name(table)))
			.collect()
	}

	fn truncate_commits(&self) -> bool {
		true
	}

	/// Columns are the row's own, sorted.
	fn build_insert(&self, batch: &InsertBatch<'_>, ctx: &LoadContext) -> FixtureResult<String> {
		let [row] = batch.rows else {
			return Err(FixtureError::SqlExecution(format!(
				"MySQL inserts one row per statement, got {}",
				batch.rows.len()
			)));
		};

		let columns = row.sorted_columns();
		let values = self.render_row(batch, 0, &columns, "DEFAULT", ctx)?;
		let fields: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();

		Ok(format!(
			"INSERT INTO {} ({}) VALUES ({})",
			self.qualified_name(batch.table),
			fields.join(", "),
			values.join(", ")
		))
	}

	/// Inserts, then selects the row back by its generated `id`.
	///
	/// Tables without an `id` column yield no rows. A read back that finds
	/// nothing is an error.
	async fn execute_insert(
		&self,
		tx: &mut dyn FixtureTransaction,
		table: &TableName,
		statement: &str,
	) -> FixtureResult<Vec<JsonRow>> {
		let result = tx.execute(statement).await?;
		let Some(id) = result.last_insert_id else {
			tracing::debug!(table = %table, "No insert id returned, skipping read back");
			return Ok(Vec::new());
		};

		let select = format!(
			"SELECT * FROM {} WHERE {} = ?",
			self.qualified_name(table),
			self.quote_identifier("id")
		);
		match tx.fetch_all(&select, vec![QueryValue::UInt(id)]).await {
			Ok(rows) if rows.is_empty() => Err(FixtureError::SqlExecution(format!(
				"can't get inserted row with id {}",
				id
			))),
			Ok(rows) => Ok(rows),
			Err(err) if !err.is_fatal() => {
				tracing::debug!(table = %table, error = %err, "Table has no id column, skipping read back");
				Ok(Vec::new())
			}
			Err(err) => Err(err),
		}
	}
}
