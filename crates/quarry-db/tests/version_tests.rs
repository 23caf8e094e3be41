//! Server version tests
//! SQLite always runs; Postgres and MySQL need the `testcontainers` feature

use quarry_db::{Dialect, ServerVersion, SqlSupplier, minimum_version};
use quarry_test::sqlite_settings;
use regex::Regex;
use rstest::*;

fn assert_version_shape(raw: &str) {
	let pattern = Regex::new(r"\d+\.\d+(\.\d+)?").unwrap();
	assert!(pattern.is_match(raw), "'{}' has no version number", raw);
}

#[rstest]
#[tokio::test]
async fn test_sqlite_version_on_every_pool() {
	// Arrange
	let supplier = SqlSupplier::connect(sqlite_settings(1, 1)).await.unwrap();

	// Act & Assert
	for pool in supplier
		.all_pools()
		.iter()
		.chain(supplier.search_replicas())
	{
		let raw = supplier.database_version(pool).await.unwrap();
		assert_version_shape(&raw);
		let parsed = supplier.server_version(pool).await.unwrap();
		assert_eq!(Some(parsed), ServerVersion::parse(&raw));
	}
}

#[rstest]
#[tokio::test]
async fn test_sqlite_minimum_version_is_met() {
	let supplier = SqlSupplier::connect(sqlite_settings(0, 0)).await.unwrap();

	let found = supplier.ensure_minimum_version().await.unwrap();

	assert!(found >= minimum_version(Dialect::Sqlite));
}

#[rstest]
#[tokio::test]
async fn test_version_on_closed_pool_is_query_error() {
	// Arrange
	let supplier = SqlSupplier::connect(sqlite_settings(0, 0)).await.unwrap();
	supplier.master().close().await.unwrap();

	// Act
	let result = supplier.database_version(supplier.master()).await;

	// Assert
	assert!(matches!(result, Err(quarry_db::SupplierError::Query { .. })));
}

#[cfg(feature = "testcontainers")]
mod containers {
	use super::*;
	use quarry_db::SqlSettings;
	use quarry_test::fixtures::testcontainers::{
		ContainerAsync, GenericImage, mysql_container, postgres_container,
	};
	use std::time::Duration;

	fn server_settings(dialect: Dialect, url: &str) -> SqlSettings {
		SqlSettings::new(dialect, url)
			.with_replicas(vec![url.to_string()])
			.with_max_open_conns(2)
			.with_max_idle_conns(1)
			.with_ping_attempts(10, Duration::from_secs(1))
	}

	#[rstest]
	#[tokio::test]
	async fn test_postgres_version(
		#[future] postgres_container: (ContainerAsync<GenericImage>, String),
	) {
		// Arrange
		let (_container, url) = postgres_container.await;
		let supplier = SqlSupplier::connect(server_settings(Dialect::Postgres, &url))
			.await
			.unwrap();

		// Act
		let raw = supplier.database_version(supplier.master()).await.unwrap();
		let found = supplier.ensure_minimum_version().await.unwrap();

		// Assert
		assert_version_shape(&raw);
		assert_eq!(found.major, 16);
		supplier.close().await;
	}

	#[rstest]
	#[tokio::test]
	async fn test_mysql_version(#[future] mysql_container: (ContainerAsync<GenericImage>, String)) {
		// Arrange
		let (_container, url) = mysql_container.await;
		let supplier = SqlSupplier::connect(server_settings(Dialect::MySql, &url))
			.await
			.unwrap();

		// Act
		let raw = supplier.database_version(supplier.master()).await.unwrap();
		let found = supplier.ensure_minimum_version().await.unwrap();

		// Assert
		assert_version_shape(&raw);
		assert_eq!((found.major, found.minor), (8, 0));
		supplier.close().await;
	}
}
