//! # Quarry Conf
//!
//! Settings for a set of SQL connection pools: one master, ordered replicas
//! and ordered search replicas, all speaking one [`Dialect`] and sharing the
//! same per-pool limits.
//!
//! Settings come from TOML (top level or a `[sql]` table), can be overridden
//! from `QUARRY_SQL_*` environment variables, and are checked with
//! [`SqlSettings::validate`] before any pool is opened.
//!
//! ```rust
//! use quarry_conf::SqlSettings;
//!
//! let mut settings = SqlSettings::from_toml_str(r#"
//!     driver_name = "sqlite3"
//!     data_source = ":memory:"
//!     max_idle_conns = 1
//!     max_open_conns = 1
//! "#).unwrap();
//! settings.apply_env_from([("QUARRY_SQL_QUERY_TIMEOUT", "5")]).unwrap();
//! settings.validate().unwrap();
//! ```

mod dialect;
mod env;
mod error;
mod locator;
mod settings;

pub use dialect::Dialect;
pub use env::ENV_PREFIX;
pub use error::{SettingsError, SettingsResult};
pub use locator::mask_url_password;
pub use settings::{SETTINGS_TABLE, SqlSettings};
