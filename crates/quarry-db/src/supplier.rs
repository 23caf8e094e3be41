//! The SQL supplier facade

use quarry_conf::{Dialect, SqlSettings};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{BulkReport, SupplierError, SupplierResult};
use crate::pool::{PoolHandle, PoolStats};
use crate::recycler;
use crate::registry::PoolRegistry;
use crate::selector::Selector;
use crate::version::{self, ServerVersion};

/// Owns every pool for one settings block and hands them out to the
/// data-access layer.
///
/// Pools are opened once by [`SqlSupplier::connect`]. Reads are routed by an
/// entitlement flag which starts out off, so until
/// [`SqlSupplier::set_entitlement`] is called every read goes to the master.
///
/// # Examples
///
/// ```rust
/// use quarry_conf::{Dialect, SqlSettings};
/// use quarry_db::SqlSupplier;
/// use std::sync::Arc;
///
/// # async fn example() {
/// let settings = SqlSettings::new(Dialect::Sqlite, ":memory:")
///     .with_replicas(vec![":memory:".into(), ":memory:".into()])
///     .with_max_open_conns(1)
///     .with_max_idle_conns(1);
/// let supplier = SqlSupplier::connect(settings).await.unwrap();
///
/// // Not entitled yet: reads stay on the master
/// assert!(Arc::ptr_eq(&supplier.select_replica(), supplier.master()));
///
/// supplier.set_entitlement(true);
/// let first = supplier.select_replica();
/// let second = supplier.select_replica();
/// assert!(!Arc::ptr_eq(&first, &second));
///
/// supplier.close().await;
/// # }
/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
/// ```
#[derive(Debug)]
pub struct SqlSupplier {
	settings: SqlSettings,
	registry: PoolRegistry,
	selector: Selector,
}

impl SqlSupplier {
	/// Validate `settings` and open every pool.
	pub async fn connect(settings: SqlSettings) -> SupplierResult<Self> {
		let registry = PoolRegistry::open(&settings).await?;
		Ok(Self {
			settings,
			registry,
			selector: Selector::new(),
		})
	}

	pub fn dialect(&self) -> Dialect {
		self.registry.dialect()
	}

	pub fn settings(&self) -> &SqlSettings {
		&self.settings
	}

	pub fn registry(&self) -> &PoolRegistry {
		&self.registry
	}

	pub fn set_entitlement(&self, entitled: bool) {
		self.selector.set_entitlement(entitled);
	}

	pub fn is_entitled(&self) -> bool {
		self.selector.is_entitled()
	}

	pub fn master(&self) -> &Arc<PoolHandle> {
		self.registry.master()
	}

	pub fn replicas(&self) -> &[Arc<PoolHandle>] {
		self.registry.replicas()
	}

	pub fn search_replicas(&self) -> &[Arc<PoolHandle>] {
		self.registry.search_replicas()
	}

	/// The master followed by the replicas. Search replicas are not included.
	pub fn all_pools(&self) -> Vec<Arc<PoolHandle>> {
		self.registry.all_pools()
	}

	pub fn select_replica(&self) -> Arc<PoolHandle> {
		Arc::clone(self.selector.select_replica(&self.registry))
	}

	pub fn select_search_replica(&self) -> Arc<PoolHandle> {
		Arc::clone(self.selector.select_search_replica(&self.registry))
	}

	/// Connection cap of the master pool.
	pub fn total_master_connections(&self) -> u32 {
		self.registry.master().config().max_connections
	}

	/// Combined connection cap of the replicas, zero without replicas.
	pub fn total_read_connections(&self) -> u32 {
		self.registry
			.replicas()
			.iter()
			.map(|p| p.config().max_connections)
			.sum()
	}

	/// Combined connection cap of the search replicas, zero without any.
	pub fn total_search_connections(&self) -> u32 {
		self.registry
			.search_replicas()
			.iter()
			.map(|p| p.config().max_connections)
			.sum()
	}

	/// Statistics for the master and every replica.
	pub fn stats(&self) -> Vec<PoolStats> {
		self.all_pools().iter().map(|p| p.stats()).collect()
	}

	/// The raw version string reported by the server behind `handle`.
	pub async fn database_version(&self, handle: &PoolHandle) -> SupplierResult<String> {
		version::database_version(handle).await
	}

	/// The parsed version of the server behind `handle`.
	pub async fn server_version(&self, handle: &PoolHandle) -> SupplierResult<ServerVersion> {
		let raw = version::database_version(handle).await?;
		ServerVersion::parse(&raw).ok_or_else(|| SupplierError::Query {
			pool: handle.role(),
			reason: format!("unrecognized version string '{}'", raw),
		})
	}

	/// Fail with `UnsupportedVersion` if the master runs a server older than
	/// the dialect's minimum.
	pub async fn ensure_minimum_version(&self) -> SupplierResult<ServerVersion> {
		let found = self.server_version(self.master()).await?;
		let minimum = version::minimum_version(self.dialect());
		if found < minimum {
			return Err(SupplierError::UnsupportedVersion {
				dialect: self.dialect(),
				found,
				minimum,
			});
		}
		Ok(found)
	}

	/// Apply a new connection lifetime to the master and replicas and close
	/// the idle connections that exceed it.
	pub async fn recycle(&self, max_lifetime: Duration) -> BulkReport {
		recycler::recycle(&self.all_pools(), max_lifetime).await
	}

	/// Churn every master and replica connection once, then put the
	/// configured lifetime back. Takes at least `max_lifetime` plus
	/// [`recycler::RECYCLE_GRACE`].
	pub async fn recycle_for(&self, max_lifetime: Duration) -> BulkReport {
		recycler::recycle_for(&self.all_pools(), max_lifetime).await
	}

	/// Close every pool, search replicas included.
	pub async fn close(&self) -> BulkReport {
		self.registry.close().await
	}
}
