//! Settings fixtures
//!
//! SQLite topologies for exercising the supplier without a server. Every
//! `:memory:` locator opens its own private database, so pools built from
//! [`sqlite_settings`] are distinct even though their locators are equal.

use quarry_conf::{Dialect, SqlSettings};
use rstest::*;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

pub mod testcontainers;

/// In-memory SQLite settings with the given number of replicas and search
/// replicas.
///
/// Each pool holds at most two connections and keeps one warm.
pub fn sqlite_settings(replicas: usize, search_replicas: usize) -> SqlSettings {
	SqlSettings::new(Dialect::Sqlite, ":memory:")
		.with_replicas(vec![":memory:".to_string(); replicas])
		.with_search_replicas(vec![":memory:".to_string(); search_replicas])
		.with_max_open_conns(2)
		.with_max_idle_conns(1)
		.with_acquire_timeout(Duration::from_secs(5))
}

/// File-backed SQLite settings under `dir`.
///
/// Files are named `master.db`, `replica-N.db` and `search-replica-N.db`
/// and are created on open.
pub fn file_backed_settings(dir: &Path, replicas: usize, search_replicas: usize) -> SqlSettings {
	let locator = |name: String| dir.join(name).to_string_lossy().into_owned();
	SqlSettings::new(Dialect::Sqlite, locator("master.db".to_string()))
		.with_replicas(
			(0..replicas)
				.map(|i| locator(format!("replica-{}.db", i)))
				.collect(),
		)
		.with_search_replicas(
			(0..search_replicas)
				.map(|i| locator(format!("search-replica-{}.db", i)))
				.collect(),
		)
		.with_max_open_conns(2)
		.with_max_idle_conns(1)
		.with_acquire_timeout(Duration::from_secs(5))
}

/// A SQLite locator under `dir` that can never be opened: its parent
/// directory does not exist.
pub fn unreachable_locator(dir: &Path, name: &str) -> String {
	dir.join("missing")
		.join(format!("{}.db", name))
		.to_string_lossy()
		.into_owned()
}

/// Fixture: a temporary directory removed when the test ends.
#[fixture]
pub fn temp_dir() -> TempDir {
	TempDir::new().expect("Failed to create temporary directory")
}

/// Fixture: a single in-memory SQLite master with no replicas.
#[fixture]
pub fn single_sqlite() -> SqlSettings {
	sqlite_settings(0, 0)
}
