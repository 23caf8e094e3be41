//! # Quarry DB
//!
//! A connection supplier for one write-capable master, ordered read
//! replicas and ordered search replicas.
//!
//! - **Pool Registry**: opens every pool eagerly and probes it; the master
//!   must come up, replicas that cannot are left out
//! - **Selector**: routes reads and search reads round-robin, but only once
//!   the deployment is entitled to replicas; until then everything goes to
//!   the master
//! - **Recycler**: tightens the connection lifetime of the master and
//!   replicas at runtime and closes connections that outlived it
//! - **Version Probe**: asks each dialect for its server version
//!
//! Postgres, MySQL and SQLite are supported through sqlx.
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry_db::{Dialect, SqlSettings, SqlSupplier};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), quarry_db::SupplierError> {
//! let settings = SqlSettings::new(Dialect::Sqlite, ":memory:")
//!     .with_replicas(vec![":memory:".into()])
//!     .with_search_replicas(vec![":memory:".into()])
//!     .with_max_open_conns(2)
//!     .with_max_idle_conns(1);
//!
//! let supplier = SqlSupplier::connect(settings).await?;
//! supplier.set_entitlement(true);
//!
//! let reads = supplier.select_replica();
//! let search = supplier.select_search_replica();
//! println!("reads on {}, search on {}", reads.role(), search.role());
//!
//! let version = supplier.database_version(supplier.master()).await?;
//! println!("sqlite {}", version);
//!
//! let report = supplier.recycle(Duration::from_secs(300)).await;
//! assert!(report.is_ok());
//!
//! supplier.close().await;
//! # Ok(())
//! # }
//! # tokio::runtime::Runtime::new().unwrap().block_on(example()).unwrap();
//! ```

pub mod error;
pub mod pool;
pub mod recycler;
pub mod registry;
pub mod selector;
pub mod supplier;
pub mod version;

pub use error::{BulkReport, SupplierError, SupplierResult};
pub use pool::{DbPool, PoolConfig, PoolHandle, PoolRole, PoolStats};
pub use registry::PoolRegistry;
pub use selector::{RoundRobin, Selector};
pub use supplier::SqlSupplier;
pub use version::{ServerVersion, database_version, minimum_version};

pub use quarry_conf::{Dialect, SqlSettings};
