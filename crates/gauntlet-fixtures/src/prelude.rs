//! Convenience re-exports for common usage.
//!
//! ```ignore
//! use gauntlet_fixtures::prelude::*;
//! ```

pub use std::sync::Arc;

// Error types
pub use crate::error::{FixtureError, FixtureResult, ResultExt};

// Fixture types
pub use crate::fixtures::{FieldValue, FixtureDocument, FixtureParser, LoadContext, Row, TableName};

// Database access
pub use crate::backends::{
	DatabaseType, FixtureConnection, FixtureTransaction, MySqlConnection, PostgresConnection,
};
pub use crate::dialect::{Dialect, MySqlDialect, PostgresDialect};

// Loading
pub use crate::config::{DatabaseSettings, FixtureConfig, FixtureSettings};
pub use crate::loader::{FixtureLoader, Loader};
pub use crate::multidb::{DatabaseFixtures, MultiDbLoader};
