//! # Quarry Test
//!
//! Testing utilities for Quarry.
//!
//! - **Settings fixtures**: SQLite topologies in memory or on disk, and
//!   locators that are guaranteed not to open
//! - **Logging**: one-time subscriber installation and log capture for
//!   assertions on degraded pools
//! - **TestContainers**: Postgres and MySQL containers, behind the
//!   `testcontainers` feature
//!
//! ```rust
//! use quarry_test::fixtures::sqlite_settings;
//!
//! let settings = sqlite_settings(2, 1);
//! assert_eq!(settings.data_source_replicas.len(), 2);
//! assert_eq!(settings.data_source_search_replicas.len(), 1);
//! ```

pub mod fixtures;
pub mod logging;

pub use fixtures::{file_backed_settings, sqlite_settings, unreachable_locator};
pub use logging::{CapturedLogs, capture_logs, init_test_logging};
