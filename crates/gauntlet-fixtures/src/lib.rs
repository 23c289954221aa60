//! Declarative database fixtures for Gauntlet tests.
//!
//! Fixtures are YAML files mapping table names to rows. Files can inherit
//! other files, rows can extend named templates, and values can reference
//! columns of rows inserted earlier in the same load, including values the
//! database generated.
//!
//! # Fixture files
//!
//! ```yaml
//! inherits:
//!   - base_users
//!
//! templates:
//!   order:
//!     status: pending
//!     created_at: $eval(NOW())
//!
//! tables:
//!   orders:
//!     - $name: first_order
//!       $extend: order
//!       user_id: $admin.id
//!     - $extend: order
//!       parent_id: $first_order.id
//!       status: shipped
//! ```
//!
//! - `$name` registers a row for `$extend` and for references
//! - `$extend` starts the row from a named template or earlier row
//! - `$eval(...)` is copied into the statement as raw SQL
//! - `$refName.field` is replaced with the stored value of an inserted row
//!
//! # Loading
//!
//! ```ignore
//! use gauntlet_fixtures::prelude::*;
//!
//! let connection = PostgresConnection::connect("postgres://localhost/app").await?;
//! let loader = FixtureLoader::new(Arc::new(connection), FixtureConfig::new("tests/fixtures"));
//! loader.load(&["orders".to_string()]).await?;
//! ```
//!
//! Every load runs in one transaction: the touched tables are truncated, the
//! rows inserted, and on PostgreSQL the sequences are moved past the stored
//! ids. Any error rolls the whole load back.
//!
//! # Architecture
//!
//! - [`fixtures`] - documents, file resolution, `$extend` and references
//! - [`dialect`] - SQL generation for [`PostgresDialect`](dialect::PostgresDialect)
//!   and [`MySqlDialect`](dialect::MySqlDialect)
//! - [`backends`] - sqlx-backed connections and transactions
//! - [`loader`] - the transactional [`FixtureLoader`]
//! - [`multidb`] - [`MultiDbLoader`] dispatching to several databases
//! - [`config`] - settings read from code, the environment or TOML

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod config;
pub mod dialect;
pub mod error;
pub mod fixtures;
pub mod loader;
pub mod multidb;
pub mod prelude;

// Re-export commonly used types at crate root
pub use backends::{DatabaseType, FixtureConnection, FixtureTransaction};
pub use config::{DatabaseSettings, FixtureConfig, FixtureSettings};
pub use error::{FixtureError, FixtureResult};
pub use fixtures::{FieldValue, FixtureDocument, FixtureParser, Row};
pub use loader::{FixtureLoader, Loader};
pub use multidb::{DatabaseFixtures, MultiDbLoader};
