//! Server version probe
//!
//! Each dialect reports its version through a different query. The raw
//! answer is returned as-is once it has been checked for a
//! `major.minor[.patch]` component; [`ServerVersion`] gives it an ordering.

use quarry_conf::Dialect;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{SupplierError, SupplierResult};
use crate::pool::{DbPool, PoolHandle};

static VERSION_PATTERN: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").unwrap());

/// The query that reports the server version for a dialect.
pub fn version_query(dialect: Dialect) -> &'static str {
	match dialect {
		Dialect::Postgres => "SHOW server_version",
		Dialect::MySql => "SELECT VERSION()",
		Dialect::Sqlite => "SELECT sqlite_version()",
	}
}

/// Oldest server each dialect is supported against.
pub fn minimum_version(dialect: Dialect) -> ServerVersion {
	match dialect {
		Dialect::Postgres => ServerVersion::new(10, 0, None),
		Dialect::MySql => ServerVersion::new(5, 7, Some(12)),
		Dialect::Sqlite => ServerVersion::new(3, 8, Some(3)),
	}
}

/// Ask the server behind `handle` for its version string.
///
/// The string is returned untrimmed of vendor suffixes (`16.2 (Debian ...)`,
/// `10.11.6-MariaDB`), but is guaranteed to contain a `major.minor` group.
///
/// # Errors
///
/// `Query` when the probe fails or the answer carries no version number.
pub async fn database_version(handle: &PoolHandle) -> SupplierResult<String> {
	let query = version_query(handle.dialect());
	let fetched = match handle.pool() {
		DbPool::Postgres(pool) => sqlx::query_scalar::<_, String>(query).fetch_one(pool).await,
		DbPool::MySql(pool) => sqlx::query_scalar::<_, String>(query).fetch_one(pool).await,
		DbPool::Sqlite(pool) => sqlx::query_scalar::<_, String>(query).fetch_one(pool).await,
	};

	let raw = fetched.map_err(|err| SupplierError::Query {
		pool: handle.role(),
		reason: format!("{} failed: {}", query, err),
	})?;
	let raw = raw.trim().to_string();

	if !VERSION_PATTERN.is_match(&raw) {
		return Err(SupplierError::Query {
			pool: handle.role(),
			reason: format!("unrecognized version string '{}'", raw),
		});
	}
	Ok(raw)
}

/// A `major.minor[.patch]` server version.
///
/// A missing patch compares equal to patch zero, so `10.0` and `10.0.0` are
/// the same version.
#[derive(Debug, Clone, Copy)]
pub struct ServerVersion {
	pub major: u32,
	pub minor: u32,
	pub patch: Option<u32>,
}

impl ServerVersion {
	pub const fn new(major: u32, minor: u32, patch: Option<u32>) -> Self {
		Self {
			major,
			minor,
			patch,
		}
	}

	/// Extract the first version number from a raw server answer.
	///
	/// ```rust
	/// use quarry_db::ServerVersion;
	///
	/// let version = ServerVersion::parse("8.0.36-0ubuntu0.22.04.1").unwrap();
	/// assert_eq!((version.major, version.minor, version.patch), (8, 0, Some(36)));
	///
	/// assert!(ServerVersion::parse("unknown").is_none());
	/// ```
	pub fn parse(raw: &str) -> Option<Self> {
		let caps = VERSION_PATTERN.captures(raw)?;
		let major = caps.get(1)?.as_str().parse().ok()?;
		let minor = caps.get(2)?.as_str().parse().ok()?;
		let patch = match caps.get(3) {
			Some(m) => Some(m.as_str().parse().ok()?),
			None => None,
		};
		Some(Self::new(major, minor, patch))
	}

	fn key(&self) -> (u32, u32, u32) {
		(self.major, self.minor, self.patch.unwrap_or(0))
	}
}

impl FromStr for ServerVersion {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s).ok_or_else(|| format!("'{}' is not a major.minor[.patch] version", s))
	}
}

impl fmt::Display for ServerVersion {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.patch {
			Some(patch) => write!(f, "{}.{}.{}", self.major, self.minor, patch),
			None => write!(f, "{}.{}", self.major, self.minor),
		}
	}
}

impl PartialEq for ServerVersion {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key()
	}
}

impl Eq for ServerVersion {}

impl PartialOrd for ServerVersion {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ServerVersion {
	fn cmp(&self, other: &Self) -> Ordering {
		self.key().cmp(&other.key())
	}
}
