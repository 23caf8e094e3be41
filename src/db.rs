//! Connection supplier module.
//!
//! Pool handles, the registry, the entitlement-gated selector, recycling and
//! the server version probe.
//!
//! # Examples
//!
//! ```rust,no_run
//! use quarry::db::{SqlSettings, SqlSupplier};
//! use std::time::Duration;
//!
//! # async fn example() -> quarry::db::SupplierResult<()> {
//! let settings = SqlSettings::from_file("config/database.toml")?;
//! let supplier = SqlSupplier::connect(settings).await?;
//!
//! // Periodic churn for connections behind a load balancer
//! let report = supplier.recycle(Duration::from_secs(300)).await;
//! for failure in &report.failures {
//!     eprintln!("recycle failed: {}", failure);
//! }
//! # Ok(())
//! # }
//! ```

pub use quarry_db::*;
