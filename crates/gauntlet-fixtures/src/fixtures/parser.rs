//! Fixture document parsing.
//!
//! The YAML is walked by hand instead of deserialized into structs so that
//! document order is kept and shape errors name the offending table and row.

use std::path::Path;

use indexmap::IndexMap;
use serde_yaml::{Mapping, Value};

use super::document::{EXTEND_KEY, FixtureDocument, NAME_KEY, Row};
use super::value::FieldValue;
use crate::error::{FixtureError, FixtureResult, ResultExt};

const INHERITS_KEY: &str = "inherits";
const TEMPLATES_KEY: &str = "templates";
const TABLES_KEY: &str = "tables";

/// Parser for fixture documents.
#[derive(Debug, Default)]
pub struct FixtureParser;

impl FixtureParser {
	/// Creates a new fixture parser.
	pub fn new() -> Self {
		Self
	}

	/// Reads and parses a fixture file.
	///
	/// # Errors
	///
	/// Returns an error if the file cannot be read or its content is not a
	/// valid fixture document. Errors are annotated with the file path.
	pub fn parse_file(&self, path: &Path) -> FixtureResult<FixtureDocument> {
		let content = std::fs::read_to_string(path)
			.map_err(FixtureError::from)
			.with_location(|| format!("file '{}'", path.display()))?;

		self.parse_str(&content)
			.with_location(|| format!("file '{}'", path.display()))
	}

	/// Parses a fixture document from a string.
	///
	/// Empty content is an empty document. YAML merge keys are applied
	/// before the document is read. Unknown top-level keys are ignored with
	/// a warning.
	pub fn parse_str(&self, content: &str) -> FixtureResult<FixtureDocument> {
		if content.trim().is_empty() {
			return Ok(FixtureDocument::default());
		}

		let mut root = serde_yaml::from_str::<Value>(content)?;
		// `<<: *anchor` merge keys
		root.apply_merge()?;

		let root = match root {
			Value::Null => return Ok(FixtureDocument::default()),
			Value::Mapping(mapping) => mapping,
			_ => {
				return Err(FixtureError::ParseError(
					"expected mapping at root level".to_string(),
				));
			}
		};

		let mut document = FixtureDocument::default();
		for (key, value) in root {
			let key = key_to_string(key)?;
			match key.as_str() {
				INHERITS_KEY => document.inherits = self.parse_inherits(value)?,
				TEMPLATES_KEY => document.templates = self.parse_templates(value)?,
				TABLES_KEY => document.tables = self.parse_tables(value)?,
				other => {
					tracing::warn!(key = %other, "Ignoring unknown top-level key in fixture");
				}
			}
		}

		Ok(document)
	}

	fn parse_inherits(&self, value: Value) -> FixtureResult<Vec<String>> {
		match value {
			Value::Null => Ok(Vec::new()),
			Value::String(name) => Ok(vec![name]),
			Value::Sequence(items) => items
				.into_iter()
				.enumerate()
				.map(|(idx, item)| match item {
					Value::String(name) => Ok(name),
					_ => Err(FixtureError::ParseError(format!(
						"inherits entry {} is not a string",
						idx
					))),
				})
				.collect(),
			_ => Err(FixtureError::ParseError(
				"inherits must be a list of fixture names".to_string(),
			)),
		}
	}

	fn parse_templates(&self, value: Value) -> FixtureResult<IndexMap<String, Row>> {
		let mapping = match value {
			Value::Null => return Ok(IndexMap::new()),
			Value::Mapping(mapping) => mapping,
			_ => {
				return Err(FixtureError::ParseError(
					"templates must be a mapping".to_string(),
				));
			}
		};

		let mut templates = IndexMap::with_capacity(mapping.len());
		for (key, value) in mapping {
			let name = key_to_string(key)?;
			let row = match value {
				Value::Null => Ok(Row::new()),
				Value::Mapping(fields) => self.parse_row(fields),
				_ => Err(FixtureError::ParseError("expected mapping".to_string())),
			}
			.with_location(|| format!("template '{}'", name))?;
			templates.insert(name, row);
		}
		Ok(templates)
	}

	fn parse_tables(&self, value: Value) -> FixtureResult<IndexMap<String, Vec<Row>>> {
		let mapping = match value {
			Value::Null => return Ok(IndexMap::new()),
			Value::Mapping(mapping) => mapping,
			_ => {
				return Err(FixtureError::ParseError(
					"tables must be a mapping".to_string(),
				));
			}
		};

		let mut tables = IndexMap::with_capacity(mapping.len());
		for (key, value) in mapping {
			let table = key_to_string(key)?;
			let rows = self
				.parse_table_rows(&table, value)
				.with_location(|| format!("table '{}'", table))?;
			tables.insert(table, rows);
		}
		Ok(tables)
	}

	fn parse_table_rows(&self, table: &str, value: Value) -> FixtureResult<Vec<Row>> {
		let items = match value {
			Value::Null => return Ok(Vec::new()),
			Value::Sequence(items) => items,
			_ => {
				return Err(FixtureError::ParseError(
					"expected array of rows".to_string(),
				));
			}
		};

		items
			.into_iter()
			.enumerate()
			.map(|(idx, item)| {
				let row = match item {
					Value::Mapping(fields) => self.parse_row(fields),
					_ => Err(FixtureError::ParseError("expected mapping".to_string())),
				};
				row.with_location(|| format!("row {} of {}", idx, table))
			})
			.collect()
	}

	fn parse_row(&self, fields: Mapping) -> FixtureResult<Row> {
		let mut row = Row::new();
		for (key, value) in fields {
			let key = key_to_string(key)?;
			let value = FieldValue::from_yaml(value).with_location(|| format!("field '{}'", key))?;
			if (key == NAME_KEY || key == EXTEND_KEY) && value.as_str().is_none() {
				return Err(FixtureError::ParseError(format!(
					"{} must be a string",
					key
				)));
			}
			row.insert(key, value);
		}
		Ok(row)
	}
}

fn key_to_string(key: Value) -> FixtureResult<String> {
	match key {
		Value::String(s) => Ok(s),
		Value::Number(n) => Ok(n.to_string()),
		Value::Bool(b) => Ok(b.to_string()),
		other => Err(FixtureError::ParseError(format!(
			"unsupported key {:?}",
			other
		))),
	}
}
