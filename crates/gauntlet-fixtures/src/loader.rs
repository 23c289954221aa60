//! Transactional fixture loading.
//!
//! A load runs through these steps on one transaction:
//!
//! 1. resolve the requested fixture files and everything they inherit
//! 2. truncate every referenced table once, in first-seen order
//! 3. insert table by table in first-seen order, skipping empty tables,
//!    capturing named rows as the database returns them
//! 4. resynchronize sequences (PostgreSQL only)
//! 5. commit
//!
//! Any error rolls the transaction back and is returned with the table,
//! row or field it happened at.
//!
//! Where `TRUNCATE` commits implicitly (MySQL), step 2 runs and commits in
//! a transaction of its own and steps 3 to 5 run in a second one. A failed
//! load then leaves the tables empty.

use std::sync::Arc;

use async_trait::async_trait;

use crate::backends::{FixtureConnection, FixtureTransaction, JsonRow};
use crate::config::FixtureConfig;
use crate::dialect::{self, Dialect, InsertBatch};
use crate::error::{FixtureResult, ResultExt};
use crate::fixtures::{
	FieldValue, FixtureResolver, LoadContext, Row, TableName, resolve_and_define,
};

/// Loads named fixture sets into one database.
#[async_trait]
pub trait Loader: Send + Sync {
	/// Loads the fixtures, all or nothing.
	async fn load(&self, names: &[String]) -> FixtureResult<()>;
}

/// [`Loader`] for a SQL database.
pub struct FixtureLoader {
	connection: Arc<dyn FixtureConnection>,
	dialect: Arc<dyn Dialect>,
	config: FixtureConfig,
}

impl FixtureLoader {
	/// Creates a loader, picking the dialect from the connection's engine.
	pub fn new(connection: Arc<dyn FixtureConnection>, config: FixtureConfig) -> Self {
		let dialect = dialect::for_database(connection.database_type());
		Self::with_dialect(connection, dialect, config)
	}

	/// Creates a loader with an explicit dialect.
	pub fn with_dialect(
		connection: Arc<dyn FixtureConnection>,
		dialect: Arc<dyn Dialect>,
		config: FixtureConfig,
	) -> Self {
		Self {
			connection,
			dialect,
			config,
		}
	}

	/// The dialect statements are built with.
	pub fn dialect(&self) -> &dyn Dialect {
		self.dialect.as_ref()
	}

	/// Loader configuration.
	pub fn config(&self) -> &FixtureConfig {
		&self.config
	}

	/// Resolves fixture files into a fresh context without touching the
	/// database.
	pub fn resolve(&self, names: &[String]) -> FixtureResult<LoadContext> {
		let mut ctx = LoadContext::new();
		let resolver = FixtureResolver::new(&self.config.location).with_debug(self.config.debug);
		for name in names {
			resolver.load(name, &mut ctx)?;
		}
		Ok(ctx)
	}

	/// Splits the queued tables into dialect table names, keeping order.
	fn prepare(&self, ctx: &mut LoadContext) -> Vec<(TableName, Vec<Row>)> {
		ctx.take_tables()
			.into_iter()
			.map(|table| (self.dialect.table_name(&table.source), table.rows))
			.collect()
	}

	async fn truncate(
		&self,
		tx: &mut dyn FixtureTransaction,
		tables: &[(TableName, Vec<Row>)],
	) -> FixtureResult<()> {
		let mut distinct: Vec<TableName> = Vec::new();
		for (table, _) in tables {
			if !distinct.contains(table) {
				distinct.push(table.clone());
			}
		}
		for statement in self.dialect.build_truncate(&distinct) {
			self.execute(tx, &statement)
				.await
				.with_location(|| "truncate")?;
		}
		Ok(())
	}

	async fn insert(
		&self,
		tx: &mut dyn FixtureTransaction,
		ctx: &mut LoadContext,
		tables: &[(TableName, Vec<Row>)],
	) -> FixtureResult<()> {
		for (table, rows) in tables {
			if rows.is_empty() {
				continue;
			}
			self.load_table(tx, ctx, table, rows)
				.await
				.with_location(|| format!("table {}", self.dialect.qualified_name(table)))?;
		}

		if let Some(fixup) = self.dialect.sequence_fixup() {
			self.execute(tx, fixup)
				.await
				.with_location(|| "sequence fixup")?;
		}

		Ok(())
	}

	async fn load_table(
		&self,
		tx: &mut dyn FixtureTransaction,
		ctx: &mut LoadContext,
		table: &TableName,
		rows: &[Row],
	) -> FixtureResult<()> {
		let mut resolved = Vec::with_capacity(rows.len());
		for (idx, row) in rows.iter().enumerate() {
			let row = resolve_and_define(row, ctx).with_location(|| {
				format!("row {} of {}", idx, self.dialect.qualified_name(table))
			})?;
			resolved.push(row);
		}

		let chunk_size = self
			.dialect
			.rows_per_statement()
			.unwrap_or(resolved.len())
			.max(1);
		for (chunk_idx, chunk) in resolved.chunks(chunk_size).enumerate() {
			let batch = InsertBatch {
				table,
				rows: chunk,
				first_row: chunk_idx * chunk_size,
			};
			let statement = self.dialect.build_insert(&batch, ctx)?;
			self.log_statement(&statement);
			let inserted = self
				.dialect
				.execute_insert(tx, table, &statement)
				.await?;
			capture_inserted(&batch, inserted, ctx);
		}

		Ok(())
	}

	async fn execute(&self, tx: &mut dyn FixtureTransaction, statement: &str) -> FixtureResult<()> {
		self.log_statement(statement);
		tx.execute(statement).await?;
		Ok(())
	}

	fn log_statement(&self, statement: &str) {
		if self.config.debug {
			tracing::info!(sql = %statement, "Issuing SQL");
		} else {
			tracing::debug!(sql = %statement, "Issuing SQL");
		}
	}
}

/// Stores returned rows under the `$name` of the batch row at the same
/// position.
fn capture_inserted(batch: &InsertBatch<'_>, inserted: Vec<JsonRow>, ctx: &mut LoadContext) {
	for (row, values) in batch.rows.iter().zip(inserted) {
		let Some(name) = row.name() else {
			continue;
		};
		let values: Row = values
			.into_iter()
			.map(|(column, value)| (column, FieldValue::from_json(value)))
			.collect();
		tracing::debug!(name = %name, "Populating ref from inserted values");
		ctx.record_inserted(name, values);
	}
}

/// Commits on success, otherwise rolls back and returns the error.
async fn finish(tx: Box<dyn FixtureTransaction>, result: FixtureResult<()>) -> FixtureResult<()> {
	match result {
		Ok(()) => tx.commit().await.with_location(|| "commit"),
		Err(err) => {
			if let Err(rollback_err) = tx.rollback().await {
				tracing::warn!(error = %rollback_err, "Failed to roll back fixture transaction");
			}
			Err(err)
		}
	}
}

#[async_trait]
impl Loader for FixtureLoader {
	async fn load(&self, names: &[String]) -> FixtureResult<()> {
		let mut ctx = self.resolve(names)?;
		let tables = self.prepare(&mut ctx);

		if self.dialect.truncate_commits() {
			let mut tx = self.connection.begin().await?;
			let result = self.truncate(tx.as_mut(), &tables).await;
			finish(tx, result).await?;

			let mut tx = self.connection.begin().await?;
			let result = self.insert(tx.as_mut(), &mut ctx, &tables).await;
			return finish(tx, result).await;
		}

		let mut tx = self.connection.begin().await?;
		let mut result = self.truncate(tx.as_mut(), &tables).await;
		if result.is_ok() {
			result = self.insert(tx.as_mut(), &mut ctx, &tables).await;
		}
		finish(tx, result).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::backends::DatabaseType;
	use crate::error::FixtureError;
	use crate::fixtures::NAME_KEY;
	use rstest::rstest;
	use serde_json::json;

	struct NullConnection;

	#[async_trait]
	impl FixtureConnection for NullConnection {
		fn database_type(&self) -> DatabaseType {
			DatabaseType::Mysql
		}

		async fn begin(&self) -> FixtureResult<Box<dyn FixtureTransaction>> {
			Err(FixtureError::TransactionError("no database".to_string()))
		}
	}

	#[rstest]
	fn test_new_picks_dialect_from_connection() {
		let loader = FixtureLoader::new(Arc::new(NullConnection), FixtureConfig::default());
		assert_eq!(loader.dialect().database_type(), DatabaseType::Mysql);
	}

	#[rstest]
	#[tokio::test]
	async fn test_missing_fixture_fails_before_begin() {
		let dir = tempfile::TempDir::new().unwrap();
		let loader = FixtureLoader::new(Arc::new(NullConnection), FixtureConfig::new(dir.path()));

		let err = loader.load(&["absent".to_string()]).await.unwrap_err();
		assert!(matches!(err.root_cause(), FixtureError::FileNotFound { .. }));
	}

	#[rstest]
	fn test_capture_matches_rows_by_position() {
		let table = TableName::qualified("t");
		let rows = vec![
			Row::new().with(NAME_KEY, "first"),
			Row::new(),
			Row::new().with(NAME_KEY, "third"),
		];
		let batch = InsertBatch {
			table: &table,
			rows: &rows,
			first_row: 0,
		};
		let returned = vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]
			.into_iter()
			.map(|value| match value {
				serde_json::Value::Object(map) => map,
				_ => unreachable!(),
			})
			.collect();

		let mut ctx = LoadContext::new();
		capture_inserted(&batch, returned, &mut ctx);

		assert_eq!(ctx.inserted_field("first", "id").unwrap(), &FieldValue::Integer(1));
		assert_eq!(ctx.inserted_field("third", "id").unwrap(), &FieldValue::Integer(3));
	}

	#[rstest]
	fn test_capture_with_fewer_returned_rows() {
		let table = TableName::bare("t");
		let rows = vec![Row::new().with(NAME_KEY, "only")];
		let batch = InsertBatch {
			table: &table,
			rows: &rows,
			first_row: 0,
		};

		let mut ctx = LoadContext::new();
		capture_inserted(&batch, Vec::new(), &mut ctx);
		assert!(ctx.inserted("only").is_none());
	}
}
