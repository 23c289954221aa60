//! PostgreSQL dialect
//!
//! All rows of a table go into one multi-row INSERT whose `RETURNING` clause
//! yields every stored row as JSON, generated columns included. The returned
//! rows are taken to be in VALUES order; PostgreSQL does not promise this,
//! but it holds for plain inserts.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;

use super::{Dialect, InsertBatch, escape_literal};
use crate::backends::{DatabaseType, FixtureTransaction, JsonRow};
use crate::error::{FixtureError, FixtureResult};
use crate::fixtures::{LoadContext, TableName};

/// Sets every column-owned sequence to the column's current maximum.
pub const SEQUENCE_FIXUP: &str = "DO $$ DECLARE r record; BEGIN FOR r IN (\
SELECT 'SELECT SETVAL(' || quote_literal(quote_ident(seq_ns.nspname) || '.' || quote_ident(seq.relname)) || \
', COALESCE(MAX(' || quote_ident(col.attname) || '), 1) ) FROM ' || \
quote_ident(tbl_ns.nspname) || '.' || quote_ident(tbl.relname) AS q \
FROM pg_class seq \
JOIN pg_namespace seq_ns ON (seq.relnamespace = seq_ns.oid) \
JOIN pg_depend dep ON (dep.objid = seq.oid) \
JOIN pg_class tbl ON (dep.refobjid = tbl.oid) \
JOIN pg_namespace tbl_ns ON (tbl.relnamespace = tbl_ns.oid) \
JOIN pg_attribute col ON (col.attrelid = tbl.oid AND dep.refobjsubid = col.attnum) \
WHERE seq.relkind = 'S' ORDER BY seq.relname) LOOP EXECUTE r.q; END LOOP; END$$";

/// PostgreSQL dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
	/// Creates the dialect.
	pub fn new() -> Self {
		Self
	}
}

#[async_trait]
impl Dialect for PostgresDialect {
	fn database_type(&self) -> DatabaseType {
		DatabaseType::Postgres
	}

	fn table_name(&self, source: &str) -> TableName {
		TableName::qualified(source)
	}

	fn quote_identifier(&self, name: &str) -> String {
		format!("\"{}\"", name.replace('"', "\"\""))
	}

	/// Doubles `'` and `\`, adding the `E` prefix when a backslash is present.
	fn quote_literal(&self, value: &str) -> String {
		let prefix = if value.contains('\\') { "E" } else { "" };
		format!("{}'{}'", prefix, escape_literal(value))
	}

	fn rows_per_statement(&self) -> Option<usize> {
		None
	}

	/// One `TRUNCATE ... CASCADE` covering every table.
	fn build_truncate(&self, tables: &[TableName]) -> Vec<String> {
		if tables.is_empty() {
			return Vec::new();
		}
		let names: Vec<String> = tables.iter().map(|t| self.qualified_name(t)).collect();
		vec![format!("TRUNCATE TABLE {} CASCADE", names.join(","))]
	}

	/// The column list is the sorted union of all rows' columns; a row
	/// lacking a column gets `default` there.
	fn build_insert(&self, batch: &InsertBatch<'_>, ctx: &LoadContext) -> FixtureResult<String> {
		let columns: BTreeSet<&str> = batch
			.rows
			.iter()
			.flat_map(|row| row.columns().map(|(key, _)| key.as_str()))
			.collect();
		let columns: Vec<&str> = columns.into_iter().collect();
		let table = self.qualified_name(batch.table);

		if columns.is_empty() {
			return match batch.rows.len() {
				1 => Ok(format!(
					"INSERT INTO {} AS row DEFAULT VALUES RETURNING row_to_json(row)",
					table
				)),
				n => Err(FixtureError::ParseError(format!(
					"{} rows of {} have no columns",
					n, table
				))),
			};
		}

		let mut values = Vec::with_capacity(batch.rows.len());
		for offset in 0..batch.rows.len() {
			let rendered = self.render_row(batch, offset, &columns, "default", ctx)?;
			values.push(format!("({})", rendered.join(", ")));
		}

		let fields: Vec<String> = columns.iter().map(|c| self.quote_identifier(c)).collect();
		Ok(format!(
			"INSERT INTO {} AS row ({}) VALUES {} RETURNING row_to_json(row)",
			table,
			fields.join(","),
			values.join(", ")
		))
	}

	/// Reads back the `row_to_json` column of every returned row.
	async fn execute_insert(
		&self,
		tx: &mut dyn FixtureTransaction,
		_table: &TableName,
		statement: &str,
	) -> FixtureResult<Vec<JsonRow>> {
		let rows = tx.fetch_all(statement, Vec::new()).await?;
		rows.into_iter()
			.map(|row| match row.into_iter().next() {
				Some((_, Value::Object(inserted))) => Ok(inserted),
				Some((_, Value::String(text))) => Ok(serde_json::from_str(&text)?),
				other => Err(FixtureError::SqlExecution(format!(
					"unexpected RETURNING value {:?}",
					other.map(|(_, value)| value)
				))),
			})
			.collect()
	}

	fn sequence_fixup(&self) -> Option<&'static str> {
		Some(SEQUENCE_FIXUP)
	}
}
