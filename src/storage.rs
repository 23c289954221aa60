//! Storage interface module.
//!
//! # Examples
//!
//! ```rust,no_run
//! use gauntlet::storage::{SqlStorage, Storage};
//! ```

#[cfg(feature = "storage")]
pub use gauntlet_storage::*;
