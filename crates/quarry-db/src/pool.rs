//! Connection pool handles
//!
//! One [`PoolHandle`] wraps one sqlx pool for one data source. The handle
//! records its dialect and role, carries a lifetime bound that can be changed
//! while the pool is live, and counts the connections that bound closes.

pub mod config;
mod handle;
mod lifetime;

pub use config::PoolConfig;
pub use handle::{DbPool, PoolHandle, PoolRole, PoolStats};
