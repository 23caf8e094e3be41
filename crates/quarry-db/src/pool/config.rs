//! Pool configuration

use quarry_conf::SqlSettings;
use std::time::Duration;

/// Limits and timeouts applied to every pool opened from one settings block.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
	pub max_connections: u32,
	/// Idle connections the pool keeps warm; surplus idle ones are reaped
	/// after `idle_timeout`
	pub min_connections: u32,
	pub acquire_timeout: Duration,
	pub idle_timeout: Option<Duration>,
	/// `None` reuses connections forever
	pub max_lifetime: Option<Duration>,
	pub query_timeout: Option<Duration>,
	pub test_before_acquire: bool,
	pub ping_attempts: u32,
	pub ping_interval: Duration,
}

impl Default for PoolConfig {
	fn default() -> Self {
		Self {
			max_connections: 10,
			min_connections: 1,
			acquire_timeout: Duration::from_secs(30),
			idle_timeout: Some(Duration::from_secs(600)),
			max_lifetime: Some(Duration::from_secs(3600)),
			query_timeout: Some(Duration::from_secs(30)),
			test_before_acquire: false,
			ping_attempts: 1,
			ping_interval: Duration::from_secs(1),
		}
	}
}

impl PoolConfig {
	/// Create a new pool configuration with default values
	///
	/// # Examples
	///
	/// ```rust
	/// use quarry_db::pool::PoolConfig;
	///
	/// let config = PoolConfig::new();
	/// assert_eq!(config.max_connections, 10);
	/// ```
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_max_connections(mut self, max: u32) -> Self {
		self.max_connections = max;
		self
	}

	pub fn with_min_connections(mut self, min: u32) -> Self {
		self.min_connections = min;
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout = timeout;
		self
	}

	pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.idle_timeout = timeout;
		self
	}

	pub fn with_max_lifetime(mut self, lifetime: Option<Duration>) -> Self {
		self.max_lifetime = lifetime;
		self
	}

	pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
		self.query_timeout = timeout;
		self
	}

	pub fn with_test_before_acquire(mut self, test: bool) -> Self {
		self.test_before_acquire = test;
		self
	}

	pub fn with_ping(mut self, attempts: u32, interval: Duration) -> Self {
		self.ping_attempts = attempts;
		self.ping_interval = interval;
		self
	}

	pub fn validate(&self) -> Result<(), String> {
		if self.max_connections == 0 {
			return Err("max_connections must be > 0".to_string());
		}
		if self.max_connections < self.min_connections {
			return Err("max_connections must be >= min_connections".to_string());
		}
		if self.ping_attempts == 0 {
			return Err("ping_attempts must be >= 1".to_string());
		}
		Ok(())
	}
}

impl From<&SqlSettings> for PoolConfig {
	fn from(settings: &SqlSettings) -> Self {
		let nonzero = |d: Duration| if d.is_zero() { None } else { Some(d) };

		Self {
			max_connections: settings.max_open_conns,
			min_connections: settings.max_idle_conns,
			acquire_timeout: settings.acquire_timeout(),
			max_lifetime: nonzero(settings.conn_max_lifetime()),
			query_timeout: nonzero(settings.query_timeout()),
			ping_attempts: settings.ping_attempts,
			ping_interval: settings.ping_interval(),
			..Self::default()
		}
	}
}
