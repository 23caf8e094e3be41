//! Supplier errors

use quarry_conf::{Dialect, SettingsError};
use std::time::Duration;
use thiserror::Error;

use crate::pool::PoolRole;
use crate::version::ServerVersion;

/// Errors raised while provisioning pools or querying them administratively.
///
/// Selection never fails and therefore has no variant here.
#[derive(Debug, Error)]
pub enum SupplierError {
	/// A pool could not be opened or failed its liveness probe
	#[error("Connection error on {pool}: {source}")]
	Connection {
		pool: PoolRole,
		#[source]
		source: sqlx::Error,
	},

	/// A probe or administrative query failed
	#[error("Query error on {pool}: {reason}")]
	Query { pool: PoolRole, reason: String },

	/// Malformed or missing settings
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("{operation} on {pool} did not finish within {after:?}")]
	Timeout {
		pool: PoolRole,
		operation: &'static str,
		after: Duration,
	},

	#[error("{dialect} server version {found} is older than the minimum supported {minimum}")]
	UnsupportedVersion {
		dialect: Dialect,
		found: ServerVersion,
		minimum: ServerVersion,
	},
}

impl From<SettingsError> for SupplierError {
	fn from(err: SettingsError) -> Self {
		SupplierError::Configuration(err.to_string())
	}
}

pub type SupplierResult<T> = Result<T, SupplierError>;

/// Outcome of an operation applied to several pools at once.
///
/// Failures are collected per pool; one failing pool never stops the rest.
#[derive(Debug, Default)]
pub struct BulkReport {
	/// Pools the operation was applied to, failed ones included
	pub touched: usize,
	pub failures: Vec<SupplierError>,
}

impl BulkReport {
	pub fn is_ok(&self) -> bool {
		self.failures.is_empty()
	}

	pub(crate) fn record(&mut self, outcome: SupplierResult<()>) {
		self.touched += 1;
		if let Err(err) = outcome {
			self.failures.push(err);
		}
	}
}
