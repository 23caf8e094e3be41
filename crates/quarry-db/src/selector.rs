//! Entitlement-gated pool selection
//!
//! Without entitlement every read goes to the master, however many replicas
//! are open. With it, reads cycle through the replicas and search reads
//! through the search replicas, falling back to the replicas when no search
//! replicas are configured.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::pool::PoolHandle;
use crate::registry::PoolRegistry;

/// Round-robin cursor over one pool sequence.
///
/// The wrap is computed inside the same atomic update as the read, so
/// concurrent callers never observe the same position twice in a row or an
/// index past the end of the sequence.
///
/// # Examples
///
/// ```rust
/// use quarry_db::RoundRobin;
///
/// let cursor = RoundRobin::new();
/// let members = ["a", "b", "c"];
///
/// let picked: Vec<_> = (0..4).filter_map(|_| cursor.next(&members)).collect();
/// assert_eq!(picked, vec![&"a", &"b", &"c", &"a"]);
/// assert!(cursor.next::<&str>(&[]).is_none());
/// ```
#[derive(Debug, Default)]
pub struct RoundRobin {
	cursor: AtomicUsize,
}

impl RoundRobin {
	pub fn new() -> Self {
		Self::default()
	}

	/// The member at the cursor, advancing the cursor by one.
	///
	/// Returns `None` for an empty sequence without moving the cursor.
	pub fn next<'a, T>(&self, members: &'a [T]) -> Option<&'a T> {
		let len = members.len();
		if len == 0 {
			return None;
		}
		let previous = self
			.cursor
			.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
				Some((current + 1) % len)
			})
			.unwrap_or_else(|current| current);
		members.get(previous % len)
	}
}

/// Picks the pool a read or search read should use.
///
/// Holds the entitlement flag and one cursor per sequence. Both are the only
/// mutable state shared between callers.
#[derive(Debug, Default)]
pub struct Selector {
	entitled: AtomicBool,
	replicas: RoundRobin,
	search_replicas: RoundRobin,
}

impl Selector {
	/// A selector that starts out not entitled.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set_entitlement(&self, entitled: bool) {
		let previous = self.entitled.swap(entitled, Ordering::SeqCst);
		if previous != entitled {
			tracing::info!(entitled, "database replica entitlement changed");
		}
	}

	pub fn is_entitled(&self) -> bool {
		self.entitled.load(Ordering::SeqCst)
	}

	/// The pool for an ordinary read. Never fails: the master is the
	/// fallback whenever replicas are unavailable or not entitled.
	pub fn select_replica<'a>(&self, registry: &'a PoolRegistry) -> &'a Arc<PoolHandle> {
		if !self.is_entitled() {
			return registry.master();
		}
		self.replicas
			.next(registry.replicas())
			.unwrap_or_else(|| registry.master())
	}

	/// The pool for a search read.
	///
	/// Without search replicas this is exactly [`Selector::select_replica`],
	/// sharing its cursor.
	pub fn select_search_replica<'a>(&self, registry: &'a PoolRegistry) -> &'a Arc<PoolHandle> {
		if !self.is_entitled() {
			return registry.master();
		}
		match self.search_replicas.next(registry.search_replicas()) {
			Some(handle) => handle,
			None => self.select_replica(registry),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::collections::HashSet;

	#[rstest]
	fn test_cursor_visits_each_member_once_per_cycle() {
		let cursor = RoundRobin::new();
		let members = [10, 20, 30];

		let first: Vec<_> = (0..3).map(|_| *cursor.next(&members).unwrap()).collect();
		let second: Vec<_> = (0..3).map(|_| *cursor.next(&members).unwrap()).collect();

		assert_eq!(first, vec![10, 20, 30]);
		assert_eq!(second, vec![10, 20, 30]);
	}

	#[rstest]
	fn test_empty_sequence_leaves_cursor_in_place() {
		let cursor = RoundRobin::new();
		let members = ["only"];

		assert!(cursor.next::<&str>(&[]).is_none());
		assert_eq!(cursor.next(&members), Some(&"only"));
		assert_eq!(cursor.next(&members), Some(&"only"));
	}

	#[rstest]
	fn test_concurrent_cursor_stays_in_range() {
		// Arrange
		let cursor = Arc::new(RoundRobin::new());
		let members: Arc<Vec<usize>> = Arc::new((0..7).collect());

		// Act
		let handles: Vec<_> = (0..8)
			.map(|_| {
				let cursor = Arc::clone(&cursor);
				let members = Arc::clone(&members);
				std::thread::spawn(move || {
					(0..700)
						.map(|_| *cursor.next(&members).unwrap())
						.collect::<Vec<_>>()
				})
			})
			.collect();
		let picks: Vec<usize> = handles
			.into_iter()
			.flat_map(|h| h.join().unwrap())
			.collect();

		// Assert
		assert_eq!(picks.len(), 5600);
		let mut counts = [0usize; 7];
		for pick in picks {
			counts[pick] += 1;
		}
		assert!(counts.iter().all(|&c| c == 800), "uneven picks: {:?}", counts);
	}

	#[rstest]
	fn test_entitlement_defaults_off_and_toggles() {
		let selector = Selector::new();
		assert!(!selector.is_entitled());

		selector.set_entitlement(true);
		assert!(selector.is_entitled());

		selector.set_entitlement(false);
		assert!(!selector.is_entitled());
	}

	#[rstest]
	fn test_distinct_positions_under_one_cycle() {
		let cursor = RoundRobin::new();
		let members: Vec<usize> = (0..5).collect();

		let seen: HashSet<_> = (0..5).map(|_| *cursor.next(&members).unwrap()).collect();

		assert_eq!(seen.len(), 5);
	}
}
