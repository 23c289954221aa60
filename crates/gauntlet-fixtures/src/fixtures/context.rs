//! Working state of one fixture load.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use super::document::Row;
use super::value::FieldValue;
use crate::error::{FixtureError, FixtureResult};

/// A table section in load order, with its name as written in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTable {
	/// Table name as written, e.g. `users` or `audit.events`.
	pub source: String,

	/// Rows in document order, `$extend` not yet applied.
	pub rows: Vec<Row>,
}

/// State of a single `load` call.
///
/// Created when a load starts and dropped once it commits or rolls back.
/// It is owned by the loader and passed down by mutable reference, never
/// shared.
#[derive(Debug, Default)]
pub struct LoadContext {
	loaded_files: HashSet<PathBuf>,
	tables: Vec<LoadedTable>,
	definitions: HashMap<String, Row>,
	inserted: HashMap<String, Row>,
}

impl LoadContext {
	/// Creates an empty context.
	pub fn new() -> Self {
		Self::default()
	}

	/// Records a file as loaded. Returns false if it already was.
	pub fn mark_loaded(&mut self, path: &Path) -> bool {
		self.loaded_files.insert(path.to_path_buf())
	}

	/// Returns true if the file was already loaded in this context.
	pub fn is_loaded(&self, path: &Path) -> bool {
		self.loaded_files.contains(path)
	}

	/// Appends a table section in encounter order.
	pub fn push_table(&mut self, source: impl Into<String>, rows: Vec<Row>) {
		self.tables.push(LoadedTable {
			source: source.into(),
			rows,
		});
	}

	/// Table sections in encounter order.
	pub fn tables(&self) -> &[LoadedTable] {
		&self.tables
	}

	/// Moves the table list out, leaving it empty.
	pub fn take_tables(&mut self) -> Vec<LoadedTable> {
		std::mem::take(&mut self.tables)
	}

	/// Registers a named template or row definition.
	///
	/// Templates and rows share one namespace.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::DuplicateName`] if the name is already taken.
	pub fn define(&mut self, name: &str, row: Row) -> FixtureResult<()> {
		if self.definitions.contains_key(name) {
			return Err(FixtureError::DuplicateName(name.to_string()));
		}
		self.definitions.insert(name.to_string(), row);
		Ok(())
	}

	/// Looks up a definition, for `$extend`.
	pub fn definition(&self, name: &str) -> Option<&Row> {
		self.definitions.get(name)
	}

	/// Stores a row as returned by the database after insertion.
	pub fn record_inserted(&mut self, name: &str, row: Row) {
		self.inserted.insert(name.to_string(), row);
	}

	/// Looks up an inserted row, for `$name.field`.
	pub fn inserted(&self, name: &str) -> Option<&Row> {
		self.inserted.get(name)
	}

	/// Resolves `$name.field` against inserted rows.
	///
	/// # Errors
	///
	/// Returns [`FixtureError::UndefinedReference`] if no row named `name`
	/// has been inserted yet, or it has no such field.
	pub fn inserted_field(&self, name: &str, field: &str) -> FixtureResult<&FieldValue> {
		let row = self.inserted.get(name).ok_or_else(|| {
			FixtureError::UndefinedReference(format!("${} is not an inserted row", name))
		})?;
		row.get(field).ok_or_else(|| {
			FixtureError::UndefinedReference(format!("${} has no field '{}'", name, field))
		})
	}
}
