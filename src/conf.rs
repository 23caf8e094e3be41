//! Settings module.
//!
//! The settings model for a master, its replicas and its search replicas,
//! with TOML and environment loading.
//!
//! # Examples
//!
//! ```rust
//! use quarry::conf::{Dialect, SqlSettings};
//!
//! let settings = SqlSettings::new(Dialect::Postgres, "postgres://app:secret@db/app");
//! assert!(settings.validate().is_ok());
//! assert!(!format!("{:?}", settings).contains("secret"));
//! ```

pub use quarry_conf::*;
