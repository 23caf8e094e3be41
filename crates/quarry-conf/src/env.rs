//! Environment overrides for [`SqlSettings`]

use std::str::FromStr;

use crate::error::{SettingsError, SettingsResult};
use crate::settings::SqlSettings;

/// Prefix shared by every override variable.
pub const ENV_PREFIX: &str = "QUARRY_SQL_";

impl SqlSettings {
	/// Apply `QUARRY_SQL_*` overrides from the process environment.
	pub fn apply_env(&mut self) -> SettingsResult<()> {
		self.apply_env_from(std::env::vars())
	}

	/// Apply overrides from an explicit set of variables.
	///
	/// Keys are the upper-cased field names behind [`ENV_PREFIX`]. List
	/// fields take comma-separated locators; an empty value clears the list.
	/// Variables without the prefix are ignored, unknown prefixed keys are
	/// reported as errors.
	///
	/// ```rust
	/// use quarry_conf::{Dialect, SqlSettings};
	///
	/// let mut settings = SqlSettings::new(Dialect::Sqlite, ":memory:");
	/// settings
	///     .apply_env_from([
	///         ("QUARRY_SQL_DATA_SOURCE_REPLICAS", "a.db, b.db"),
	///         ("QUARRY_SQL_MAX_OPEN_CONNS", "4"),
	///         ("HOME", "/root"),
	///     ])
	///     .unwrap();
	///
	/// assert_eq!(settings.data_source_replicas, vec!["a.db", "b.db"]);
	/// assert_eq!(settings.max_open_conns, 4);
	/// ```
	pub fn apply_env_from<I, K, V>(&mut self, vars: I) -> SettingsResult<()>
	where
		I: IntoIterator<Item = (K, V)>,
		K: AsRef<str>,
		V: AsRef<str>,
	{
		for (key, value) in vars {
			let key = key.as_ref();
			let Some(field) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			let value = value.as_ref().trim();

			match field {
				"DRIVER_NAME" => self.driver_name = parse(key, value)?,
				"DATA_SOURCE" => self.data_source = value.to_string(),
				"DATA_SOURCE_REPLICAS" => self.data_source_replicas = split_list(value),
				"DATA_SOURCE_SEARCH_REPLICAS" => {
					self.data_source_search_replicas = split_list(value)
				}
				"MAX_IDLE_CONNS" => self.max_idle_conns = parse(key, value)?,
				"MAX_OPEN_CONNS" => self.max_open_conns = parse(key, value)?,
				"CONN_MAX_LIFETIME_MILLISECONDS" => {
					self.conn_max_lifetime_milliseconds = parse(key, value)?
				}
				"QUERY_TIMEOUT" => self.query_timeout = parse(key, value)?,
				"ACQUIRE_TIMEOUT_MILLISECONDS" => {
					self.acquire_timeout_milliseconds = parse(key, value)?
				}
				"PING_ATTEMPTS" => self.ping_attempts = parse(key, value)?,
				"PING_INTERVAL_MILLISECONDS" => {
					self.ping_interval_milliseconds = parse(key, value)?
				}
				_ => {
					return Err(SettingsError::Env {
						key: key.to_string(),
						reason: "unknown setting".to_string(),
					});
				}
			}
			tracing::debug!(key, "applied environment override");
		}
		Ok(())
	}
}

fn parse<T>(key: &str, value: &str) -> SettingsResult<T>
where
	T: FromStr,
	T::Err: std::fmt::Display,
{
	value.parse().map_err(|e: T::Err| SettingsError::Env {
		key: key.to_string(),
		reason: e.to_string(),
	})
}

fn split_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|s| !s.is_empty())
		.map(String::from)
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::Dialect;
	use rstest::rstest;

	#[rstest]
	fn test_overrides_every_scalar() {
		// Arrange
		let mut settings = SqlSettings::default();

		// Act
		settings
			.apply_env_from([
				("QUARRY_SQL_DRIVER_NAME", "mysql"),
				("QUARRY_SQL_DATA_SOURCE", "mysql://root@master/app"),
				("QUARRY_SQL_MAX_IDLE_CONNS", "2"),
				("QUARRY_SQL_MAX_OPEN_CONNS", "8"),
				("QUARRY_SQL_CONN_MAX_LIFETIME_MILLISECONDS", "60000"),
				("QUARRY_SQL_QUERY_TIMEOUT", "3"),
				("QUARRY_SQL_ACQUIRE_TIMEOUT_MILLISECONDS", "250"),
				("QUARRY_SQL_PING_ATTEMPTS", "5"),
				("QUARRY_SQL_PING_INTERVAL_MILLISECONDS", "10"),
			])
			.unwrap();

		// Assert
		assert_eq!(settings.driver_name, Dialect::MySql);
		assert_eq!(settings.data_source, "mysql://root@master/app");
		assert_eq!(settings.max_idle_conns, 2);
		assert_eq!(settings.max_open_conns, 8);
		assert_eq!(settings.conn_max_lifetime_milliseconds, 60_000);
		assert_eq!(settings.query_timeout, 3);
		assert_eq!(settings.acquire_timeout_milliseconds, 250);
		assert_eq!(settings.ping_attempts, 5);
		assert_eq!(settings.ping_interval_milliseconds, 10);
	}

	#[rstest]
	fn test_empty_list_clears_replicas() {
		let mut settings = SqlSettings::new(Dialect::Sqlite, ":memory:")
			.with_search_replicas(vec![":memory:".to_string()]);

		settings
			.apply_env_from([("QUARRY_SQL_DATA_SOURCE_SEARCH_REPLICAS", "")])
			.unwrap();

		assert!(settings.data_source_search_replicas.is_empty());
	}

	#[rstest]
	#[case("QUARRY_SQL_MAX_OPEN_CONNS", "many")]
	#[case("QUARRY_SQL_DRIVER_NAME", "oracle")]
	#[case("QUARRY_SQL_NOT_A_SETTING", "1")]
	fn test_bad_override_reports_key(#[case] key: &str, #[case] value: &str) {
		let mut settings = SqlSettings::default();

		let result = settings.apply_env_from([(key, value)]);

		assert!(matches!(result, Err(SettingsError::Env { key: k, .. }) if k == key));
	}
}
