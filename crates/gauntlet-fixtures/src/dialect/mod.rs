//! SQL dialects.
//!
//! A [`Dialect`] turns resolved fixture rows into statements for one engine
//! and knows how that engine hands inserted rows back. Value coercion is
//! shared by both dialects through the provided methods of the trait; only
//! quoting differs.

pub mod mysql;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::{DatabaseType, FixtureTransaction, JsonRow};
use crate::error::{FixtureError, FixtureResult, ResultExt};
use crate::fixtures::{Expression, FieldValue, LoadContext, Row, TableName};

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;

/// Rows of one table rendered into a single INSERT.
#[derive(Debug, Clone, Copy)]
pub struct InsertBatch<'a> {
	/// Target table.
	pub table: &'a TableName,

	/// Rows with `$extend` already applied.
	pub rows: &'a [Row],

	/// Index of `rows[0]` within its table section, for error locations.
	pub first_row: usize,
}

/// SQL generation and read-back strategy of one database engine.
#[async_trait]
pub trait Dialect: Send + Sync {
	/// Engine this dialect targets.
	fn database_type(&self) -> DatabaseType;

	/// Parses a table name as written in a fixture document.
	fn table_name(&self, source: &str) -> TableName;

	/// Quotes an identifier.
	fn quote_identifier(&self, name: &str) -> String;

	/// Quotes a string as an SQL literal.
	fn quote_literal(&self, value: &str) -> String;

	/// Maximum rows per INSERT, `None` for unbounded.
	fn rows_per_statement(&self) -> Option<usize>;

	/// Statements truncating the given distinct tables, in order.
	fn build_truncate(&self, tables: &[TableName]) -> Vec<String>;

	/// Whether `TRUNCATE` commits the surrounding transaction.
	///
	/// When it does, the loader truncates in a transaction of its own before
	/// opening the one for the inserts.
	fn truncate_commits(&self) -> bool {
		false
	}

	/// Renders one INSERT for a batch.
	fn build_insert(&self, batch: &InsertBatch<'_>, ctx: &LoadContext) -> FixtureResult<String>;

	/// Runs an INSERT built by [`Dialect::build_insert`] and returns the
	/// stored rows, positionally matching the batch where available.
	async fn execute_insert(
		&self,
		tx: &mut dyn FixtureTransaction,
		table: &TableName,
		statement: &str,
	) -> FixtureResult<Vec<JsonRow>>;

	/// Statement run after all inserts to resynchronize sequences.
	fn sequence_fixup(&self) -> Option<&'static str> {
		None
	}

	/// Quotes a possibly schema-qualified table name.
	fn qualified_name(&self, table: &TableName) -> String {
		match &table.schema {
			Some(schema) => format!(
				"{}.{}",
				self.quote_identifier(schema),
				self.quote_identifier(&table.name)
			),
			None => self.quote_identifier(&table.name),
		}
	}

	/// Renders a field value, resolving `$` expressions.
	///
	/// `$eval(expr)` is emitted as `(expr)` untouched. `$name.field` is
	/// looked up among rows inserted so far and the found value is rendered
	/// as a literal; it is never evaluated again.
	fn render_value(&self, value: &FieldValue, ctx: &LoadContext) -> FixtureResult<String> {
		if let FieldValue::String(s) = value
			&& s.starts_with('$')
		{
			return match Expression::parse(s)? {
				Expression::Eval(expr) => Ok(format!("({})", expr)),
				Expression::Reference { name, field } => {
					self.render_literal(ctx.inserted_field(name, field)?)
				}
			};
		}
		self.render_literal(value)
	}

	/// Renders a value as a literal without looking at `$` prefixes.
	fn render_literal(&self, value: &FieldValue) -> FixtureResult<String> {
		match value {
			FieldValue::Null => Ok("NULL".to_string()),
			FieldValue::String(s) => Ok(self.quote_literal(s)),
			FieldValue::Integer(i) => Ok(i.to_string()),
			FieldValue::Float(f) if f.is_finite() => Ok(f.to_string()),
			FieldValue::Float(f) => Err(FixtureError::UnsupportedValueType(format!(
				"non-finite float {}",
				f
			))),
			FieldValue::Boolean(b) => Ok(b.to_string()),
			FieldValue::Sequence(_) | FieldValue::Mapping(_) => {
				let json = serde_json::to_string(&value.to_json()?)?;
				Ok(self.quote_literal(&json))
			}
		}
	}

	/// Renders the values of one row of a batch in column order.
	///
	/// Columns the row lacks are rendered as `absent`. Errors are wrapped
	/// with the field and row.
	fn render_row(
		&self,
		batch: &InsertBatch<'_>,
		offset: usize,
		columns: &[&str],
		absent: &str,
		ctx: &LoadContext,
	) -> FixtureResult<Vec<String>> {
		let row = &batch.rows[offset];
		columns
			.iter()
			.map(|column| match row.get(column) {
				Some(value) => self.render_value(value, ctx).with_location(|| {
					format!(
						"field '{}' (row {} of {})",
						column,
						batch.first_row + offset,
						self.qualified_name(batch.table)
					)
				}),
				None => Ok(absent.to_string()),
			})
			.collect()
	}
}

/// Picks the dialect for a database engine.
pub fn for_database(database_type: DatabaseType) -> Arc<dyn Dialect> {
	match database_type {
		DatabaseType::Postgres => Arc::new(PostgresDialect::new()),
		DatabaseType::Mysql => Arc::new(MySqlDialect::new()),
	}
}

/// Doubles single quotes and backslashes.
pub(crate) fn escape_literal(value: &str) -> String {
	value.replace('\'', "''").replace('\\', "\\\\")
}
