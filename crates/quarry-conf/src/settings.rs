//! SQL settings for one logical pool set

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::dialect::Dialect;
use crate::error::{SettingsError, SettingsResult};
use crate::locator::mask_url_password;

/// Table name under which settings may be nested in a TOML document.
pub const SETTINGS_TABLE: &str = "sql";

/// Settings for a master pool, its replicas and its search replicas.
///
/// Every pool in the set shares the dialect and the per-pool limits below.
///
/// # Examples
///
/// ```rust
/// use quarry_conf::{Dialect, SqlSettings};
///
/// let settings = SqlSettings::new(Dialect::Sqlite, ":memory:")
///     .with_replicas(vec![":memory:".to_string()])
///     .with_max_open_conns(1)
///     .with_max_idle_conns(1);
///
/// assert!(settings.validate().is_ok());
/// assert_eq!(settings.data_source_replicas.len(), 1);
/// ```
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SqlSettings {
	pub driver_name: Dialect,
	pub data_source: String,
	pub data_source_replicas: Vec<String>,
	pub data_source_search_replicas: Vec<String>,
	pub max_idle_conns: u32,
	pub max_open_conns: u32,
	pub conn_max_lifetime_milliseconds: u64,
	/// Statement timeout, in seconds
	pub query_timeout: u64,
	pub acquire_timeout_milliseconds: u64,
	/// Liveness probe attempts made when a pool is opened
	pub ping_attempts: u32,
	pub ping_interval_milliseconds: u64,
}

impl Default for SqlSettings {
	fn default() -> Self {
		Self {
			driver_name: Dialect::Postgres,
			data_source: String::new(),
			data_source_replicas: Vec::new(),
			data_source_search_replicas: Vec::new(),
			max_idle_conns: 20,
			max_open_conns: 300,
			conn_max_lifetime_milliseconds: 3_600_000,
			query_timeout: 30,
			acquire_timeout_milliseconds: 30_000,
			ping_attempts: 1,
			ping_interval_milliseconds: 1_000,
		}
	}
}

impl SqlSettings {
	/// Settings for a single master with default limits.
	pub fn new(driver_name: Dialect, data_source: impl Into<String>) -> Self {
		Self {
			driver_name,
			data_source: data_source.into(),
			..Self::default()
		}
	}

	pub fn with_replicas(mut self, replicas: Vec<String>) -> Self {
		self.data_source_replicas = replicas;
		self
	}

	pub fn with_search_replicas(mut self, search_replicas: Vec<String>) -> Self {
		self.data_source_search_replicas = search_replicas;
		self
	}

	pub fn with_max_idle_conns(mut self, max_idle: u32) -> Self {
		self.max_idle_conns = max_idle;
		self
	}

	pub fn with_max_open_conns(mut self, max_open: u32) -> Self {
		self.max_open_conns = max_open;
		self
	}

	pub fn with_conn_max_lifetime(mut self, lifetime: Duration) -> Self {
		self.conn_max_lifetime_milliseconds = lifetime.as_millis().min(u64::MAX as u128) as u64;
		self
	}

	pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
		self.query_timeout = timeout.as_secs();
		self
	}

	pub fn with_acquire_timeout(mut self, timeout: Duration) -> Self {
		self.acquire_timeout_milliseconds = timeout.as_millis().min(u64::MAX as u128) as u64;
		self
	}

	pub fn with_ping_attempts(mut self, attempts: u32, interval: Duration) -> Self {
		self.ping_attempts = attempts;
		self.ping_interval_milliseconds = interval.as_millis().min(u64::MAX as u128) as u64;
		self
	}

	pub fn conn_max_lifetime(&self) -> Duration {
		Duration::from_millis(self.conn_max_lifetime_milliseconds)
	}

	pub fn query_timeout(&self) -> Duration {
		Duration::from_secs(self.query_timeout)
	}

	pub fn acquire_timeout(&self) -> Duration {
		Duration::from_millis(self.acquire_timeout_milliseconds)
	}

	pub fn ping_interval(&self) -> Duration {
		Duration::from_millis(self.ping_interval_milliseconds)
	}

	/// Parse settings from TOML.
	///
	/// The settings may sit at the top level of the document or under a
	/// `[sql]` table.
	///
	/// ```rust
	/// use quarry_conf::{Dialect, SqlSettings};
	///
	/// let settings = SqlSettings::from_toml_str(r#"
	///     [sql]
	///     driver_name = "sqlite3"
	///     data_source = ":memory:"
	///     data_source_search_replicas = [":memory:", ":memory:"]
	/// "#).unwrap();
	///
	/// assert_eq!(settings.driver_name, Dialect::Sqlite);
	/// assert_eq!(settings.data_source_search_replicas.len(), 2);
	/// ```
	pub fn from_toml_str(source: &str) -> SettingsResult<Self> {
		let mut document: toml::Table = toml::from_str(source)?;
		let table = match document.remove(SETTINGS_TABLE) {
			Some(toml::Value::Table(table)) => table,
			Some(_) => {
				return Err(SettingsError::Invalid(format!(
					"'{}' must be a table",
					SETTINGS_TABLE
				)));
			}
			None => document,
		};

		Ok(toml::Value::Table(table).try_into()?)
	}

	/// Read and parse a TOML settings file.
	pub fn from_file(path: impl AsRef<Path>) -> SettingsResult<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path)?;
		let settings = Self::from_toml_str(&source)?;
		tracing::debug!(path = %path.display(), driver = %settings.driver_name, "loaded sql settings");
		Ok(settings)
	}

	/// Check the settings before any pool is opened.
	pub fn validate(&self) -> SettingsResult<()> {
		self.validate_locator("data_source", &self.data_source)?;
		for (i, locator) in self.data_source_replicas.iter().enumerate() {
			self.validate_locator(&format!("data_source_replicas[{}]", i), locator)?;
		}
		for (i, locator) in self.data_source_search_replicas.iter().enumerate() {
			self.validate_locator(&format!("data_source_search_replicas[{}]", i), locator)?;
		}

		if self.max_open_conns == 0 {
			return Err(SettingsError::Invalid(
				"max_open_conns must be greater than zero".to_string(),
			));
		}
		if self.max_idle_conns > self.max_open_conns {
			return Err(SettingsError::Invalid(format!(
				"max_idle_conns ({}) must be <= max_open_conns ({})",
				self.max_idle_conns, self.max_open_conns
			)));
		}
		if self.ping_attempts == 0 {
			return Err(SettingsError::Invalid(
				"ping_attempts must be at least 1".to_string(),
			));
		}
		Ok(())
	}

	fn validate_locator(&self, field: &str, locator: &str) -> SettingsResult<()> {
		if locator.trim().is_empty() {
			return Err(SettingsError::Invalid(format!("{} is empty", field)));
		}
		if !self.driver_name.accepts_locator(locator) {
			return Err(SettingsError::Invalid(format!(
				"{} '{}' is not a {} data source",
				field,
				mask_url_password(locator),
				self.driver_name
			)));
		}
		Ok(())
	}
}

impl fmt::Debug for SqlSettings {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let masked = |locators: &[String]| -> Vec<String> {
			locators.iter().map(|l| mask_url_password(l)).collect()
		};

		f.debug_struct("SqlSettings")
			.field("driver_name", &self.driver_name)
			.field("data_source", &mask_url_password(&self.data_source))
			.field("data_source_replicas", &masked(&self.data_source_replicas))
			.field(
				"data_source_search_replicas",
				&masked(&self.data_source_search_replicas),
			)
			.field("max_idle_conns", &self.max_idle_conns)
			.field("max_open_conns", &self.max_open_conns)
			.field(
				"conn_max_lifetime_milliseconds",
				&self.conn_max_lifetime_milliseconds,
			)
			.field("query_timeout", &self.query_timeout)
			.field(
				"acquire_timeout_milliseconds",
				&self.acquire_timeout_milliseconds,
			)
			.field("ping_attempts", &self.ping_attempts)
			.field("ping_interval_milliseconds", &self.ping_interval_milliseconds)
			.finish()
	}
}
