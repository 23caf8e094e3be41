//! Opened pool handles

use quarry_conf::{Dialect, mask_url_password};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool};
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgConnectOptions, PgPool};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use sqlx::{Connection, Database, Executor, MySql, Pool, Postgres, Sqlite};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use super::config::PoolConfig;
use super::lifetime::LifetimePolicy;
use crate::error::{SupplierError, SupplierResult};

/// Position of a pool within its registry.
///
/// Indices are the configured positions, so a replica that failed to open
/// leaves a gap rather than shifting its successors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolRole {
	Master,
	Replica(usize),
	SearchReplica(usize),
}

impl fmt::Display for PoolRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PoolRole::Master => f.write_str("master"),
			PoolRole::Replica(i) => write!(f, "replica-{}", i),
			PoolRole::SearchReplica(i) => write!(f, "search-replica-{}", i),
		}
	}
}

/// The dialect-specific sqlx pool behind a handle.
#[derive(Debug, Clone)]
pub enum DbPool {
	Postgres(PgPool),
	MySql(MySqlPool),
	Sqlite(SqlitePool),
}

macro_rules! on_pool {
	($pool:expr, $p:ident => $body:expr) => {
		match $pool {
			DbPool::Postgres($p) => $body,
			DbPool::MySql($p) => $body,
			DbPool::Sqlite($p) => $body,
		}
	};
}

impl DbPool {
	pub fn dialect(&self) -> Dialect {
		match self {
			DbPool::Postgres(_) => Dialect::Postgres,
			DbPool::MySql(_) => Dialect::MySql,
			DbPool::Sqlite(_) => Dialect::Sqlite,
		}
	}

	/// Open and idle connections
	pub fn size(&self) -> u32 {
		on_pool!(self, p => p.size())
	}

	pub fn num_idle(&self) -> usize {
		on_pool!(self, p => p.num_idle())
	}

	pub fn is_closed(&self) -> bool {
		on_pool!(self, p => p.is_closed())
	}
}

/// Point-in-time statistics for one pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
	pub role: PoolRole,
	pub size: u32,
	pub idle: usize,
	pub max_connections: u32,
	pub max_lifetime: Option<Duration>,
	/// Connections closed because they outlived `max_lifetime`
	pub max_lifetime_closed: u64,
}

/// An opened, configured connection pool bound to one data source.
///
/// Handles are owned by the registry and shared as `Arc<PoolHandle>`; two
/// handles are the same pool exactly when `Arc::ptr_eq` holds. The sqlx pool
/// inside manages its own checkout concurrency.
pub struct PoolHandle {
	role: PoolRole,
	url: String,
	config: PoolConfig,
	pool: DbPool,
	lifetime: Arc<LifetimePolicy>,
}

impl PoolHandle {
	/// Open a pool eagerly and probe it until it answers or the configured
	/// attempts run out.
	pub async fn open(
		role: PoolRole,
		dialect: Dialect,
		locator: &str,
		config: PoolConfig,
	) -> SupplierResult<Self> {
		config.validate().map_err(SupplierError::Configuration)?;
		if !dialect.accepts_locator(locator) {
			return Err(SupplierError::Configuration(format!(
				"{} data source '{}' is not a {} locator",
				role,
				mask_url_password(locator),
				dialect
			)));
		}

		let lifetime = Arc::new(LifetimePolicy::new(config.max_lifetime));
		let url = match dialect {
			Dialect::Sqlite if !locator.starts_with("sqlite:") => format!("sqlite:{}", locator),
			_ => locator.to_string(),
		};

		let mut attempt = 1;
		let pool = loop {
			match connect(dialect, &url, &config, &lifetime).await {
				Ok(pool) => break pool,
				Err(source) if attempt < config.ping_attempts => {
					tracing::warn!(
						pool = %role,
						attempt,
						attempts = config.ping_attempts,
						error = %source,
						"database ping failed, retrying"
					);
					attempt += 1;
					tokio::time::sleep(config.ping_interval).await;
				}
				Err(source) => return Err(SupplierError::Connection { pool: role, source }),
			}
		};

		tracing::info!(
			pool = %role,
			dialect = %dialect,
			url = %mask_url_password(&url),
			max_connections = config.max_connections,
			"opened database pool"
		);

		Ok(Self {
			role,
			url,
			config,
			pool,
			lifetime,
		})
	}

	pub fn role(&self) -> PoolRole {
		self.role
	}

	pub fn dialect(&self) -> Dialect {
		self.pool.dialect()
	}

	/// The data-source URL with any password replaced by `***`.
	pub fn url(&self) -> String {
		mask_url_password(&self.url)
	}

	pub fn config(&self) -> &PoolConfig {
		&self.config
	}

	pub fn pool(&self) -> &DbPool {
		&self.pool
	}

	pub fn as_postgres(&self) -> Option<&PgPool> {
		match &self.pool {
			DbPool::Postgres(pool) => Some(pool),
			_ => None,
		}
	}

	pub fn as_mysql(&self) -> Option<&MySqlPool> {
		match &self.pool {
			DbPool::MySql(pool) => Some(pool),
			_ => None,
		}
	}

	pub fn as_sqlite(&self) -> Option<&SqlitePool> {
		match &self.pool {
			DbPool::Sqlite(pool) => Some(pool),
			_ => None,
		}
	}

	/// Statement timeout callers should bound their own queries by.
	pub fn query_timeout(&self) -> Option<Duration> {
		self.config.query_timeout
	}

	/// The lifetime bound currently in effect.
	pub fn max_lifetime(&self) -> Option<Duration> {
		self.lifetime.max_lifetime()
	}

	/// Change the lifetime bound of a live pool.
	///
	/// Takes effect at the next checkout or return of each connection;
	/// in-flight connections finish their current use first.
	pub fn set_max_lifetime(&self, max_lifetime: Option<Duration>) {
		self.lifetime.set_max_lifetime(max_lifetime);
	}

	pub fn max_lifetime_closed(&self) -> u64 {
		self.lifetime.closed()
	}

	pub fn size(&self) -> u32 {
		self.pool.size()
	}

	pub fn is_closed(&self) -> bool {
		self.pool.is_closed()
	}

	pub fn stats(&self) -> PoolStats {
		PoolStats {
			role: self.role,
			size: self.pool.size(),
			idle: self.pool.num_idle(),
			max_connections: self.config.max_connections,
			max_lifetime: self.lifetime.max_lifetime(),
			max_lifetime_closed: self.lifetime.closed(),
		}
	}

	/// Fail with `Query` when the pool has already been closed.
	pub fn ensure_open(&self) -> SupplierResult<()> {
		if self.pool.is_closed() {
			return Err(SupplierError::Query {
				pool: self.role,
				reason: "pool is closed".to_string(),
			});
		}
		Ok(())
	}

	/// Take every connection that is idle right now out of the pool and hand
	/// it straight back, so the lifetime bound is applied to it now rather
	/// than at its next natural checkout.
	///
	/// Never waits for a connection: anything checked out elsewhere is left
	/// alone and is judged when its holder returns it. Aged connections are
	/// closed on the way back. Returns the number of connections swept.
	pub async fn sweep_idle(&self) -> SupplierResult<usize> {
		const SETTLE_TIMEOUT: Duration = Duration::from_secs(1);

		self.ensure_open()?;
		let returned_before = self.lifetime.returned();
		let swept = on_pool!(&self.pool, p => sweep(p));

		// Returns run on spawned tasks; wait until ours have been judged.
		let target = returned_before + swept as u64;
		let settled = tokio::time::timeout(SETTLE_TIMEOUT, async {
			while self.lifetime.returned() < target {
				tokio::time::sleep(Duration::from_millis(1)).await;
			}
		})
		.await;
		if settled.is_err() {
			tracing::debug!(pool = %self.role, swept, "swept connections still returning");
		}
		Ok(swept)
	}

	/// Close the pool, waiting up to five seconds for checked-out
	/// connections to come back.
	pub async fn close(&self) -> SupplierResult<()> {
		const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

		let closed = on_pool!(&self.pool, p => tokio::time::timeout(CLOSE_TIMEOUT, p.close()).await);
		closed.map_err(|_| SupplierError::Timeout {
			pool: self.role,
			operation: "close",
			after: CLOSE_TIMEOUT,
		})
	}
}

impl fmt::Debug for PoolHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("PoolHandle")
			.field("role", &self.role)
			.field("dialect", &self.dialect())
			.field("url", &self.url())
			.field("config", &self.config)
			.finish()
	}
}

/// Pool options shared by every dialect, with the lifetime bound enforced
/// through the checkout and return hooks.
fn pool_options<DB: Database>(
	config: &PoolConfig,
	lifetime: &Arc<LifetimePolicy>,
) -> PoolOptions<DB> {
	let on_acquire = Arc::clone(lifetime);
	let on_release = Arc::clone(lifetime);

	PoolOptions::<DB>::new()
		.max_connections(config.max_connections)
		.min_connections(config.min_connections)
		.acquire_timeout(config.acquire_timeout)
		.idle_timeout(config.idle_timeout)
		.max_lifetime(None::<Duration>)
		.test_before_acquire(config.test_before_acquire)
		.before_acquire(move |_conn, meta| {
			let keep = on_acquire.admit(meta.age);
			if !keep {
				tracing::debug!(age = ?meta.age, "closing connection past its lifetime on checkout");
			}
			Box::pin(async move { Ok(keep) })
		})
		.after_release(move |_conn, meta| {
			let keep = on_release.admit(meta.age);
			if !keep {
				tracing::debug!(age = ?meta.age, "closing connection past its lifetime on release");
			}
			Box::pin(async move { Ok(keep) })
		})
}

async fn connect(
	dialect: Dialect,
	url: &str,
	config: &PoolConfig,
	lifetime: &Arc<LifetimePolicy>,
) -> Result<DbPool, sqlx::Error> {
	let pool = match dialect {
		Dialect::Postgres => {
			let mut options = PgConnectOptions::from_str(url)?;
			if let Some(timeout) = config.query_timeout {
				options = options.options([("statement_timeout", timeout.as_millis())]);
			}
			let pool = pool_options::<Postgres>(config, lifetime)
				.connect_with(options)
				.await?;
			DbPool::Postgres(pool)
		}
		Dialect::MySql => {
			let options = MySqlConnectOptions::from_str(url)?;
			let timeout_ms = config.query_timeout.map(|t| t.as_millis());
			let pool = pool_options::<MySql>(config, lifetime)
				.after_connect(move |conn, _meta| {
					Box::pin(async move {
						if let Some(ms) = timeout_ms {
							let statement = format!("SET SESSION max_execution_time = {}", ms);
							conn.execute(statement.as_str()).await?;
						}
						Ok(())
					})
				})
				.connect_with(options)
				.await?;
			DbPool::MySql(pool)
		}
		Dialect::Sqlite => {
			let mut options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
			if let Some(timeout) = config.query_timeout {
				options = options.busy_timeout(timeout);
			}
			let pool = pool_options::<Sqlite>(config, lifetime)
				.connect_with(options)
				.await?;
			DbPool::Sqlite(pool)
		}
	};

	if let Err(err) = on_pool!(&pool, p => ping(p).await) {
		on_pool!(&pool, p => p.close().await);
		return Err(err);
	}
	Ok(pool)
}

async fn ping<DB: Database>(pool: &Pool<DB>) -> Result<(), sqlx::Error> {
	let mut conn = pool.acquire().await?;
	conn.ping().await
}

fn sweep<DB: Database>(pool: &Pool<DB>) -> usize {
	let mut held = Vec::new();
	while let Some(conn) = pool.try_acquire() {
		held.push(conn);
	}
	held.len()
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn sqlite_config() -> PoolConfig {
		PoolConfig::new()
			.with_max_connections(1)
			.with_min_connections(1)
			.with_acquire_timeout(Duration::from_secs(5))
	}

	#[rstest]
	#[case(PoolRole::Master, "master")]
	#[case(PoolRole::Replica(0), "replica-0")]
	#[case(PoolRole::SearchReplica(2), "search-replica-2")]
	fn test_role_display(#[case] role: PoolRole, #[case] expected: &str) {
		assert_eq!(role.to_string(), expected);
	}

	#[rstest]
	#[tokio::test]
	async fn test_open_bare_memory_locator() {
		// Act
		let handle = PoolHandle::open(PoolRole::Master, Dialect::Sqlite, ":memory:", sqlite_config())
			.await
			.expect("Failed to open pool");

		// Assert
		assert_eq!(handle.dialect(), Dialect::Sqlite);
		assert_eq!(handle.url(), "sqlite::memory:");
		assert!(handle.as_sqlite().is_some());
		assert!(handle.as_postgres().is_none());
		assert!(handle.size() >= 1);
	}

	#[rstest]
	#[tokio::test]
	async fn test_open_rejects_foreign_locator() {
		let result = PoolHandle::open(
			PoolRole::Master,
			Dialect::Sqlite,
			"postgres://u:secret@db/app",
			sqlite_config(),
		)
		.await;

		match result {
			Err(SupplierError::Configuration(msg)) => assert!(!msg.contains("secret")),
			other => panic!("expected configuration error, got {:?}", other),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_open_unreachable_file_is_connection_error() {
		let result = PoolHandle::open(
			PoolRole::Replica(1),
			Dialect::Sqlite,
			"/nonexistent/quarry/replica.db",
			sqlite_config().with_ping(2, Duration::from_millis(10)),
		)
		.await;

		assert!(matches!(
			result,
			Err(SupplierError::Connection {
				pool: PoolRole::Replica(1),
				..
			})
		));
	}

	#[rstest]
	#[tokio::test]
	async fn test_stats_reflect_config() {
		let handle = PoolHandle::open(
			PoolRole::SearchReplica(0),
			Dialect::Sqlite,
			"sqlite::memory:",
			sqlite_config().with_max_lifetime(Some(Duration::from_secs(60))),
		)
		.await
		.unwrap();

		let stats = handle.stats();

		assert_eq!(stats.role, PoolRole::SearchReplica(0));
		assert_eq!(stats.max_connections, 1);
		assert_eq!(stats.max_lifetime, Some(Duration::from_secs(60)));
		assert_eq!(stats.max_lifetime_closed, 0);
	}

	#[rstest]
	#[tokio::test]
	async fn test_close_marks_pool_closed() {
		let handle = PoolHandle::open(PoolRole::Master, Dialect::Sqlite, ":memory:", sqlite_config())
			.await
			.unwrap();

		handle.close().await.expect("Failed to close pool");

		assert!(handle.is_closed());
	}

	#[rstest]
	#[tokio::test]
	async fn test_sweep_of_closed_pool_is_query_error() {
		// Arrange
		let handle = PoolHandle::open(PoolRole::Replica(0), Dialect::Sqlite, ":memory:", sqlite_config())
			.await
			.unwrap();
		handle.close().await.unwrap();

		// Act
		let result = handle.sweep_idle().await;

		// Assert
		match result {
			Err(SupplierError::Query { pool, reason }) => {
				assert_eq!(pool, PoolRole::Replica(0));
				assert_eq!(reason, "pool is closed");
			}
			other => panic!("expected query error, got {:?}", other),
		}
	}

	#[rstest]
	#[tokio::test]
	async fn test_sweep_skips_checked_out_connections() {
		// Arrange
		let config = sqlite_config()
			.with_max_connections(2)
			.with_min_connections(2)
			.with_acquire_timeout(Duration::from_secs(5));
		let handle = PoolHandle::open(PoolRole::Master, Dialect::Sqlite, ":memory:", config)
			.await
			.unwrap();
		let held = handle.as_sqlite().unwrap().acquire().await.unwrap();

		// Act
		let started = std::time::Instant::now();
		let swept = handle.sweep_idle().await.unwrap();

		// Assert
		assert!(started.elapsed() < Duration::from_secs(2));
		assert!(swept <= 1);
		drop(held);
	}
}
