//! # Quarry
//!
//! A database connection supplier: one write-capable master, ordered read
//! replicas and ordered search replicas, opened together from one settings
//! block and handed out to the data-access layer.
//!
//! Replicas are only used once the deployment is entitled to them. Until
//! then every read is served by the master, exactly as a single-database
//! deployment would be, while the replica pools stay open so that granting
//! the entitlement later needs no restart.
//!
//! ## Feature Flags
//!
//! - `full` (default) - Everything below except test utilities
//! - `database` - The pool supplier ([`db`])
//! - `conf` - The settings model only ([`conf`])
//! - `test-utils` - Fixtures and test logging ([`test`])
//! - `testcontainers` - Postgres and MySQL container fixtures
//!
//! ## Quick Example
//!
//! ```rust
//! use quarry::prelude::*;
//!
//! # async fn example() -> SupplierResult<()> {
//! let mut settings = SqlSettings::from_toml_str(r#"
//!     [sql]
//!     driver_name = "sqlite3"
//!     data_source = ":memory:"
//!     data_source_replicas = [":memory:", ":memory:"]
//!     max_idle_conns = 1
//!     max_open_conns = 4
//! "#)?;
//! settings.apply_env()?;
//!
//! let supplier = SqlSupplier::connect(settings).await?;
//! supplier.set_entitlement(true);
//!
//! let replica = supplier.select_replica();
//! assert_ne!(replica.role(), PoolRole::Master);
//!
//! supplier.close().await;
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```

#[cfg(feature = "conf")]
pub mod conf;
#[cfg(feature = "database")]
pub mod db;

#[cfg(feature = "conf")]
pub use quarry_conf::{Dialect, SettingsError, SqlSettings};

#[cfg(feature = "database")]
pub use quarry_db::{
	BulkReport, PoolHandle, PoolRole, PoolStats, ServerVersion, SqlSupplier, SupplierError,
	SupplierResult,
};

/// Everything a data-access layer usually needs.
pub mod prelude {
	#[cfg(feature = "conf")]
	pub use crate::{Dialect, SettingsError, SqlSettings};

	#[cfg(feature = "database")]
	pub use crate::{
		BulkReport, PoolHandle, PoolRole, PoolStats, ServerVersion, SqlSupplier, SupplierError,
		SupplierResult,
	};
}
