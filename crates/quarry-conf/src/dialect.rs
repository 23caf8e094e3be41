//! Supported SQL dialects

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::SettingsError;

/// The database driver every pool in a settings block speaks.
///
/// The set is closed: selection, connection options and the version probe all
/// dispatch by matching on this tag.
///
/// # Examples
///
/// ```rust
/// use quarry_conf::Dialect;
///
/// let dialect: Dialect = "postgresql".parse().unwrap();
/// assert_eq!(dialect, Dialect::Postgres);
/// assert_eq!(dialect.as_str(), "postgres");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Dialect {
	#[default]
	#[serde(rename = "postgres", alias = "postgresql")]
	Postgres,
	#[serde(rename = "mysql", alias = "mariadb")]
	MySql,
	#[serde(rename = "sqlite3", alias = "sqlite")]
	Sqlite,
}

impl Dialect {
	pub const ALL: [Dialect; 3] = [Dialect::Postgres, Dialect::MySql, Dialect::Sqlite];

	/// Canonical driver name, as written in settings files.
	pub fn as_str(&self) -> &'static str {
		match self {
			Dialect::Postgres => "postgres",
			Dialect::MySql => "mysql",
			Dialect::Sqlite => "sqlite3",
		}
	}

	/// URL schemes a locator for this dialect may start with.
	pub fn schemes(&self) -> &'static [&'static str] {
		match self {
			Dialect::Postgres => &["postgres://", "postgresql://"],
			Dialect::MySql => &["mysql://", "mariadb://"],
			Dialect::Sqlite => &["sqlite:"],
		}
	}

	/// Whether `locator` is a plausible data source for this dialect.
	///
	/// SQLite also accepts bare paths and `:memory:`; any locator that carries
	/// another network scheme is rejected.
	///
	/// ```rust
	/// use quarry_conf::Dialect;
	///
	/// assert!(Dialect::Sqlite.accepts_locator(":memory:"));
	/// assert!(Dialect::MySql.accepts_locator("mysql://root@localhost/app"));
	/// assert!(!Dialect::Postgres.accepts_locator("mysql://root@localhost/app"));
	/// ```
	pub fn accepts_locator(&self, locator: &str) -> bool {
		let locator = locator.trim();
		if self.schemes().iter().any(|s| locator.starts_with(s)) {
			return true;
		}
		matches!(self, Dialect::Sqlite) && !locator.contains("://")
	}
}

impl fmt::Display for Dialect {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Dialect {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"postgres" | "postgresql" => Ok(Dialect::Postgres),
			"mysql" | "mariadb" => Ok(Dialect::MySql),
			"sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
			other => Err(SettingsError::Invalid(format!(
				"unrecognized driver name '{}'",
				other
			))),
		}
	}
}
