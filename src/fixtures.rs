//! Fixture loading module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gauntlet::fixtures::{FixtureConfig, FixtureLoader, Loader};
//! ```

#[cfg(feature = "fixtures")]
pub use gauntlet_fixtures::*;
