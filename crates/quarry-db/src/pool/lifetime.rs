//! Runtime-adjustable connection lifetime

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Connection lifetime bound shared between a handle and its pool hooks.
///
/// sqlx fixes `max_lifetime` when the pool is built, so the bound is kept
/// here instead and checked against connection age whenever a connection is
/// checked out or returned. Zero nanoseconds means unbounded.
#[derive(Debug)]
pub(crate) struct LifetimePolicy {
	max_lifetime_nanos: AtomicU64,
	closed: AtomicU64,
	released: AtomicU64,
}

impl LifetimePolicy {
	pub(crate) fn new(max_lifetime: Option<Duration>) -> Self {
		Self {
			max_lifetime_nanos: AtomicU64::new(to_nanos(max_lifetime)),
			closed: AtomicU64::new(0),
			released: AtomicU64::new(0),
		}
	}

	pub(crate) fn max_lifetime(&self) -> Option<Duration> {
		match self.max_lifetime_nanos.load(Ordering::SeqCst) {
			0 => None,
			nanos => Some(Duration::from_nanos(nanos)),
		}
	}

	pub(crate) fn set_max_lifetime(&self, max_lifetime: Option<Duration>) {
		self.max_lifetime_nanos
			.store(to_nanos(max_lifetime), Ordering::SeqCst);
	}

	/// Decide whether a connection of the given age may stay in the pool.
	///
	/// Every rejection is counted.
	pub(crate) fn admit(&self, age: Duration) -> bool {
		match self.max_lifetime() {
			Some(max) if age > max => {
				self.closed.fetch_add(1, Ordering::SeqCst);
				false
			}
			_ => true,
		}
	}

	/// [`admit`](Self::admit) for a connection coming back to the pool.
	///
	/// The return is counted after the decision, so a caller that sees the
	/// count move also sees any rejection it caused.
	pub(crate) fn admit_returned(&self, age: Duration) -> bool {
		let keep = self.admit(age);
		self.released.fetch_add(1, Ordering::SeqCst);
		keep
	}

	/// Connections closed because they outlived the bound.
	pub(crate) fn closed(&self) -> u64 {
		self.closed.load(Ordering::SeqCst)
	}

	/// Connections returned to the pool and checked against the bound.
	pub(crate) fn returned(&self) -> u64 {
		self.released.load(Ordering::SeqCst)
	}
}

fn to_nanos(lifetime: Option<Duration>) -> u64 {
	lifetime
		.map(|d| d.as_nanos().min(u64::MAX as u128) as u64)
		.unwrap_or(0)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unbounded_admits_everything() {
		let policy = LifetimePolicy::new(None);

		assert!(policy.admit(Duration::from_secs(86_400 * 365)));
		assert_eq!(policy.closed(), 0);
	}

	#[rstest]
	fn test_rejects_and_counts_aged_connections() {
		// Arrange
		let policy = LifetimePolicy::new(Some(Duration::from_secs(10)));

		// Act
		let young = policy.admit(Duration::from_secs(10));
		let old = policy.admit(Duration::from_secs(11));
		let older = policy.admit(Duration::from_secs(60));

		// Assert
		assert!(young);
		assert!(!old);
		assert!(!older);
		assert_eq!(policy.closed(), 2);
	}

	#[rstest]
	fn test_bound_can_be_tightened_and_lifted() {
		let policy = LifetimePolicy::new(Some(Duration::from_secs(3600)));
		assert!(policy.admit(Duration::from_secs(5)));

		policy.set_max_lifetime(Some(Duration::from_secs(1)));
		assert_eq!(policy.max_lifetime(), Some(Duration::from_secs(1)));
		assert!(!policy.admit(Duration::from_secs(5)));

		policy.set_max_lifetime(None);
		assert_eq!(policy.max_lifetime(), None);
		assert!(policy.admit(Duration::from_secs(5)));
		assert_eq!(policy.closed(), 1);
	}

	#[rstest]
	fn test_returns_are_counted_whether_kept_or_closed() {
		// Arrange
		let policy = LifetimePolicy::new(Some(Duration::from_secs(10)));

		// Act
		let kept = policy.admit_returned(Duration::from_secs(1));
		let closed = policy.admit_returned(Duration::from_secs(20));

		// Assert
		assert!(kept);
		assert!(!closed);
		assert_eq!(policy.returned(), 2);
		assert_eq!(policy.closed(), 1);
	}
}
