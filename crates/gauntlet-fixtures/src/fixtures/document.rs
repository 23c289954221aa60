//! Fixture document model.
//!
//! A fixture file looks like:
//!
//! ```yaml
//! inherits: [base_users]
//! templates:
//!   admin:
//!     role: admin
//! tables:
//!   public.users:
//!     - $name: alice
//!       $extend: admin
//!       login: alice
//!   orders:
//!     - user_id: $alice.id
//!       created: $eval(CURRENT_DATE)
//! ```

use indexmap::IndexMap;

use super::value::FieldValue;

/// Meta-key naming a row or template.
pub const NAME_KEY: &str = "$name";

/// Meta-key naming the row or template to extend.
pub const EXTEND_KEY: &str = "$extend";

/// Returns true for keys that carry loader directives rather than columns.
pub fn is_meta_key(key: &str) -> bool {
	key.starts_with('$')
}

/// One fixture row or template: an ordered field map plus meta-keys.
///
/// Rows are values. Extension builds a new row and never touches its base.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
	fields: IndexMap<String, FieldValue>,
}

impl Row {
	/// Creates an empty row.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets a field, replacing any previous value.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
		self.fields.insert(key.into(), value.into());
	}

	/// Builder form of [`Row::insert`].
	pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
		self.insert(key, value);
		self
	}

	/// Returns a field, meta-keys included.
	pub fn get(&self, key: &str) -> Option<&FieldValue> {
		self.fields.get(key)
	}

	/// The `$name` of this row, if any.
	pub fn name(&self) -> Option<&str> {
		self.fields.get(NAME_KEY).and_then(FieldValue::as_str)
	}

	/// The `$extend` target of this row, if any.
	pub fn extends(&self) -> Option<&str> {
		self.fields.get(EXTEND_KEY).and_then(FieldValue::as_str)
	}

	/// Iterates over all fields in document order, meta-keys included.
	pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
		self.fields.iter()
	}

	/// Iterates over column fields only.
	pub fn columns(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
		self.fields.iter().filter(|(key, _)| !is_meta_key(key))
	}

	/// Column names in lexicographic order.
	pub fn sorted_columns(&self) -> Vec<&str> {
		let mut names: Vec<&str> = self.columns().map(|(key, _)| key.as_str()).collect();
		names.sort_unstable();
		names
	}

	/// Copy of this row without meta-keys.
	pub fn without_meta(&self) -> Self {
		Self {
			fields: self
				.columns()
				.map(|(key, value)| (key.clone(), value.clone()))
				.collect(),
		}
	}

	/// Builds a new row from `base` (meta-keys dropped) overlaid with `self`.
	///
	/// Fields of `self`, its own meta-keys included, win on collision.
	pub fn overlay_on(&self, base: &Row) -> Self {
		let mut merged = base.without_meta();
		for (key, value) in &self.fields {
			merged.fields.insert(key.clone(), value.clone());
		}
		merged
	}

	/// Number of fields, meta-keys included.
	pub fn len(&self) -> usize {
		self.fields.len()
	}

	/// Returns true if the row has no fields at all.
	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}
}

impl From<IndexMap<String, FieldValue>> for Row {
	fn from(fields: IndexMap<String, FieldValue>) -> Self {
		Self { fields }
	}
}

impl FromIterator<(String, FieldValue)> for Row {
	fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
		Self {
			fields: iter.into_iter().collect(),
		}
	}
}

/// One parsed fixture file. Never mutated after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureDocument {
	/// Fixture names to load before this document.
	pub inherits: Vec<String>,

	/// Named templates in document order.
	pub templates: IndexMap<String, Row>,

	/// Tables in document order, keyed by the name as written.
	pub tables: IndexMap<String, Vec<Row>>,
}

impl FixtureDocument {
	/// Total number of rows across all tables.
	pub fn row_count(&self) -> usize {
		self.tables.values().map(Vec::len).sum()
	}
}
