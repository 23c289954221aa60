//! # Gauntlet
//!
//! Declarative integration testing for database-backed services.
//!
//! This crate is a facade over the Gauntlet workspace members:
//!
//! - [`fixtures`] - YAML fixtures loaded into PostgreSQL or MySQL, with file
//!   inheritance, row templates and references to inserted rows
//! - [`storage`] - the storage interface test runners drive databases through
//!
//! ## Feature Flags
//!
//! - `fixtures` - fixture loading engine
//! - `storage` - storage interface (implies `fixtures`)
//! - `full` (default) - everything
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # async fn run() -> gauntlet::fixtures::FixtureResult<()> {
//! use gauntlet::fixtures::{DatabaseFixtures, FixtureSettings};
//!
//! let settings = FixtureSettings::from_file("gauntlet.toml")?;
//! let loader = settings.connect().await?;
//! loader
//!     .load("create order", &[DatabaseFixtures::new("main", ["users", "orders"])])
//!     .await?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "fixtures")]
pub mod fixtures;
#[cfg(feature = "storage")]
pub mod storage;
