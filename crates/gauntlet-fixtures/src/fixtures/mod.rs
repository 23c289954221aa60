//! Fixture documents and their resolution.
//!
//! - [`FixtureParser`] turns YAML into a [`FixtureDocument`]
//! - [`FixtureResolver`] finds files and expands `inherits`
//! - [`LoadContext`] holds the state of one load
//! - [`resolve_extension`] applies `$extend`, [`Expression`] parses `$` values

pub mod context;
pub mod document;
pub mod parser;
pub mod references;
pub mod resolver;
pub mod table;
pub mod value;

pub use context::{LoadContext, LoadedTable};
pub use document::{EXTEND_KEY, FixtureDocument, NAME_KEY, Row, is_meta_key};
pub use parser::FixtureParser;
pub use references::{Expression, resolve_and_define, resolve_extension};
pub use resolver::FixtureResolver;
pub use table::{DEFAULT_SCHEMA, TableName};
pub use value::FieldValue;
