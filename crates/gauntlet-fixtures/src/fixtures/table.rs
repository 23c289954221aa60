//! Table names as written in fixture documents.

use std::fmt;

/// Schema used for unqualified PostgreSQL table names.
pub const DEFAULT_SCHEMA: &str = "public";

/// A possibly schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
	/// Schema, absent for dialects without schemas.
	pub schema: Option<String>,

	/// Bare table name.
	pub name: String,
}

impl TableName {
	/// Parses a `schema.table` name, defaulting the schema to `public`.
	///
	/// Only the first `.` separates schema from table, and an empty schema
	/// part also falls back to the default.
	///
	/// # Example
	///
	/// ```
	/// # use gauntlet_fixtures::fixtures::TableName;
	/// let table = TableName::qualified("schema1.table1");
	/// assert_eq!(table.schema.as_deref(), Some("schema1"));
	/// assert_eq!(table.name, "table1");
	///
	/// assert_eq!(TableName::qualified("table1").schema.as_deref(), Some("public"));
	/// assert_eq!(TableName::qualified(".table1").schema.as_deref(), Some("public"));
	/// ```
	pub fn qualified(source: &str) -> Self {
		match source.split_once('.') {
			Some((schema, name)) if !schema.is_empty() => Self {
				schema: Some(schema.to_string()),
				name: name.to_string(),
			},
			Some((_, name)) => Self {
				schema: Some(DEFAULT_SCHEMA.to_string()),
				name: name.to_string(),
			},
			None => Self {
				schema: Some(DEFAULT_SCHEMA.to_string()),
				name: source.to_string(),
			},
		}
	}

	/// Uses the name verbatim with no schema.
	pub fn bare(source: &str) -> Self {
		Self {
			schema: None,
			name: source.to_string(),
		}
	}
}

impl fmt::Display for TableName {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.schema {
			Some(schema) => write!(f, "{}.{}", schema, self.name),
			None => write!(f, "{}", self.name),
		}
	}
}
