//! Field values of fixture rows.
//!
//! YAML is loosely typed, so every field is held as a [`FieldValue`] and all
//! SQL coercion switches on its tag explicitly.

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;

use crate::error::{FixtureError, FixtureResult};

/// A single field value of a fixture row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
	/// YAML `null` / `~` / empty value.
	Null,
	/// Text. Values starting with `$` are expressions.
	String(String),
	/// Signed integer.
	Integer(i64),
	/// Floating point number.
	Float(f64),
	/// Boolean.
	Boolean(bool),
	/// Nested sequence, stored as JSON.
	Sequence(Vec<FieldValue>),
	/// Nested mapping, stored as JSON.
	Mapping(IndexMap<String, FieldValue>),
}

impl FieldValue {
	/// Converts a parsed YAML value.
	///
	/// Tagged values, integers beyond `i64` and mappings with non-scalar keys
	/// cannot be JSON-encoded and are rejected.
	pub fn from_yaml(value: YamlValue) -> FixtureResult<Self> {
		match value {
			YamlValue::Null => Ok(Self::Null),
			YamlValue::Bool(b) => Ok(Self::Boolean(b)),
			YamlValue::Number(n) => {
				if let Some(i) = n.as_i64() {
					Ok(Self::Integer(i))
				} else if n.is_u64() {
					Err(FixtureError::UnsupportedValueType(format!(
						"integer {} is out of range",
						n
					)))
				} else {
					n.as_f64().map(Self::Float).ok_or_else(|| {
						FixtureError::UnsupportedValueType(format!("number {}", n))
					})
				}
			}
			YamlValue::String(s) => Ok(Self::String(s)),
			YamlValue::Sequence(items) => items
				.into_iter()
				.map(Self::from_yaml)
				.collect::<FixtureResult<Vec<_>>>()
				.map(Self::Sequence),
			YamlValue::Mapping(mapping) => {
				let mut fields = IndexMap::with_capacity(mapping.len());
				for (key, value) in mapping {
					let key = yaml_key_to_string(key)?;
					fields.insert(key, Self::from_yaml(value)?);
				}
				Ok(Self::Mapping(fields))
			}
			YamlValue::Tagged(tagged) => Err(FixtureError::UnsupportedValueType(format!(
				"tagged value {}",
				tagged.tag
			))),
		}
	}

	/// Converts a JSON value read back from the database.
	pub fn from_json(value: JsonValue) -> Self {
		match value {
			JsonValue::Null => Self::Null,
			JsonValue::Bool(b) => Self::Boolean(b),
			JsonValue::Number(n) => match n.as_i64() {
				Some(i) => Self::Integer(i),
				None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
			},
			JsonValue::String(s) => Self::String(s),
			JsonValue::Array(items) => {
				Self::Sequence(items.into_iter().map(Self::from_json).collect())
			}
			JsonValue::Object(map) => Self::Mapping(
				map.into_iter()
					.map(|(k, v)| (k, Self::from_json(v)))
					.collect(),
			),
		}
	}

	/// Encodes the value as JSON.
	pub fn to_json(&self) -> FixtureResult<JsonValue> {
		Ok(match self {
			Self::Null => JsonValue::Null,
			Self::String(s) => JsonValue::String(s.clone()),
			Self::Integer(i) => JsonValue::from(*i),
			Self::Float(f) => serde_json::Number::from_f64(*f)
				.map(JsonValue::Number)
				.ok_or_else(|| {
					FixtureError::UnsupportedValueType(format!("non-finite float {}", f))
				})?,
			Self::Boolean(b) => JsonValue::Bool(*b),
			Self::Sequence(items) => JsonValue::Array(
				items
					.iter()
					.map(Self::to_json)
					.collect::<FixtureResult<Vec<_>>>()?,
			),
			Self::Mapping(fields) => {
				let mut map = serde_json::Map::with_capacity(fields.len());
				for (key, value) in fields {
					map.insert(key.clone(), value.to_json()?);
				}
				JsonValue::Object(map)
			}
		})
	}

	/// Returns the text if this is a string value.
	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::String(s) => Some(s),
			_ => None,
		}
	}

	/// Returns true for strings starting with `$`.
	pub fn is_expression(&self) -> bool {
		self.as_str().is_some_and(|s| s.starts_with('$'))
	}
}

impl From<&str> for FieldValue {
	fn from(s: &str) -> Self {
		Self::String(s.to_string())
	}
}

impl From<String> for FieldValue {
	fn from(s: String) -> Self {
		Self::String(s)
	}
}

impl From<i64> for FieldValue {
	fn from(i: i64) -> Self {
		Self::Integer(i)
	}
}

impl From<f64> for FieldValue {
	fn from(f: f64) -> Self {
		Self::Float(f)
	}
}

impl From<bool> for FieldValue {
	fn from(b: bool) -> Self {
		Self::Boolean(b)
	}
}

fn yaml_key_to_string(key: YamlValue) -> FixtureResult<String> {
	match key {
		YamlValue::String(s) => Ok(s),
		YamlValue::Number(n) => Ok(n.to_string()),
		YamlValue::Bool(b) => Ok(b.to_string()),
		other => Err(FixtureError::UnsupportedValueType(format!(
			"mapping key {:?} cannot be encoded as JSON",
			other
		))),
	}
}
