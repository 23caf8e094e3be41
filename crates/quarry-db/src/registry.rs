//! Pool registry
//!
//! Opens and owns the master, replica and search-replica pools for one
//! settings block.

use futures::future::join_all;
use quarry_conf::{Dialect, SqlSettings};
use std::sync::Arc;

use crate::error::{BulkReport, SupplierError, SupplierResult};
use crate::pool::{PoolConfig, PoolHandle, PoolRole};

/// Every pool opened from one settings block.
///
/// The master is always present. Replicas and search replicas keep their
/// configured order; any that could not be opened are left out.
#[derive(Debug)]
pub struct PoolRegistry {
	dialect: Dialect,
	master: Arc<PoolHandle>,
	replicas: Vec<Arc<PoolHandle>>,
	search_replicas: Vec<Arc<PoolHandle>>,
}

impl PoolRegistry {
	/// Validate the settings and open every pool eagerly.
	///
	/// # Errors
	///
	/// `Configuration` for invalid settings, `Connection` when the master
	/// cannot be opened or probed. Replica failures are logged and the
	/// replica is dropped from its sequence.
	///
	/// # Examples
	///
	/// ```rust
	/// use quarry_conf::{Dialect, SqlSettings};
	/// use quarry_db::PoolRegistry;
	///
	/// # async fn example() {
	/// let settings = SqlSettings::new(Dialect::Sqlite, ":memory:")
	///     .with_replicas(vec![":memory:".into(), ":memory:".into()])
	///     .with_search_replicas(vec![":memory:".into()])
	///     .with_max_open_conns(1)
	///     .with_max_idle_conns(1);
	///
	/// let registry = PoolRegistry::open(&settings).await.unwrap();
	/// assert_eq!(registry.replicas().len(), 2);
	/// assert_eq!(registry.all_pools().len(), 3);
	/// # }
	/// # tokio::runtime::Runtime::new().unwrap().block_on(example());
	/// ```
	pub async fn open(settings: &SqlSettings) -> SupplierResult<Self> {
		settings.validate()?;
		let config = PoolConfig::from(settings);
		let dialect = settings.driver_name;

		let master = PoolHandle::open(
			PoolRole::Master,
			dialect,
			&settings.data_source,
			config.clone(),
		)
		.await
		.map(Arc::new)
		.inspect_err(|err| tracing::error!(error = %err, "failed to open master database pool"))?;

		let replicas = open_degradable(
			dialect,
			&settings.data_source_replicas,
			&config,
			PoolRole::Replica,
		)
		.await;
		let search_replicas = open_degradable(
			dialect,
			&settings.data_source_search_replicas,
			&config,
			PoolRole::SearchReplica,
		)
		.await;

		Ok(Self::from_parts(master, replicas, search_replicas))
	}

	/// Assemble a registry from pools opened elsewhere.
	pub fn from_parts(
		master: Arc<PoolHandle>,
		replicas: Vec<Arc<PoolHandle>>,
		search_replicas: Vec<Arc<PoolHandle>>,
	) -> Self {
		Self {
			dialect: master.dialect(),
			master,
			replicas,
			search_replicas,
		}
	}

	pub fn dialect(&self) -> Dialect {
		self.dialect
	}

	pub fn master(&self) -> &Arc<PoolHandle> {
		&self.master
	}

	pub fn replicas(&self) -> &[Arc<PoolHandle>] {
		&self.replicas
	}

	pub fn search_replicas(&self) -> &[Arc<PoolHandle>] {
		&self.search_replicas
	}

	/// The master followed by the replicas, in configured order.
	///
	/// Search replicas are not part of the primary fleet and are left out;
	/// bulk operations over this view (recycling, statistics) do not reach
	/// them.
	pub fn all_pools(&self) -> Vec<Arc<PoolHandle>> {
		std::iter::once(&self.master)
			.chain(self.replicas.iter())
			.cloned()
			.collect()
	}

	/// Best-effort close of every pool, search replicas included.
	pub async fn close(&self) -> BulkReport {
		let mut report = BulkReport::default();
		let pools = self
			.all_pools()
			.into_iter()
			.chain(self.search_replicas.iter().cloned());
		for pool in pools {
			let outcome = pool.close().await;
			if let Err(err) = &outcome {
				tracing::warn!(pool = %pool.role(), error = %err, "failed to close database pool");
			}
			report.record(outcome);
		}
		report
	}
}

/// Open a replica sequence concurrently, keeping configured order and
/// dropping members that fail.
async fn open_degradable(
	dialect: Dialect,
	locators: &[String],
	config: &PoolConfig,
	role: fn(usize) -> PoolRole,
) -> Vec<Arc<PoolHandle>> {
	let opened = join_all(
		locators
			.iter()
			.enumerate()
			.map(|(i, locator)| PoolHandle::open(role(i), dialect, locator, config.clone())),
	)
	.await;

	opened
		.into_iter()
		.filter_map(|result| match result {
			Ok(handle) => Some(Arc::new(handle)),
			Err(err) => {
				degrade(&err);
				None
			}
		})
		.collect()
}

fn degrade(err: &SupplierError) {
	tracing::warn!(error = %err, "database replica unavailable, excluding it from selection");
}
