//! Connection lifetime recycling
//!
//! Recycling tightens the lifetime bound on a set of pools and sweeps their
//! idle connections so anything older than the new bound is closed and
//! replaced. Connections checked out at the time finish their current use
//! and are closed when they come back.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{BulkReport, SupplierResult};
use crate::pool::PoolHandle;

/// Scheduling slack added on top of the lifetime before a timed recycle
/// sweeps, so connections opened right at the start have also aged out.
pub const RECYCLE_GRACE: Duration = Duration::from_secs(2);

/// Apply `max_lifetime` to every pool and sweep each one.
///
/// A zero duration lifts the bound. One pool failing does not stop the
/// others; every failure is collected in the report.
pub async fn recycle(pools: &[Arc<PoolHandle>], max_lifetime: Duration) -> BulkReport {
	let bound = (!max_lifetime.is_zero()).then_some(max_lifetime);
	let mut report = BulkReport::default();
	for pool in pools {
		let outcome = recycle_one(pool, bound).await;
		if let Err(err) = &outcome {
			tracing::warn!(pool = %pool.role(), error = %err, "failed to recycle database pool");
		}
		report.record(outcome);
	}
	report
}

/// Recycle with `max_lifetime`, wait for it to elapse, sweep again, then put
/// back each pool's configured lifetime.
///
/// Every connection that existed when the call started is closed by the
/// time it returns, unless it was still checked out.
pub async fn recycle_for(pools: &[Arc<PoolHandle>], max_lifetime: Duration) -> BulkReport {
	let mut report = recycle(pools, max_lifetime).await;
	tokio::time::sleep(max_lifetime + RECYCLE_GRACE).await;

	let mut restored = BulkReport::default();
	for pool in pools {
		let outcome = sweep_then_restore(pool).await;
		if let Err(err) = &outcome {
			tracing::warn!(pool = %pool.role(), error = %err, "failed to finish timed recycle");
		}
		restored.record(outcome);
	}
	report.failures.append(&mut restored.failures);
	report
}

async fn recycle_one(pool: &PoolHandle, bound: Option<Duration>) -> SupplierResult<()> {
	pool.ensure_open()?;
	pool.set_max_lifetime(bound);
	let before = pool.max_lifetime_closed();
	let swept = pool.sweep_idle().await?;
	tracing::debug!(
		pool = %pool.role(),
		max_lifetime = ?bound,
		swept,
		closed = pool.max_lifetime_closed() - before,
		"recycled database pool"
	);
	Ok(())
}

async fn sweep_then_restore(pool: &PoolHandle) -> SupplierResult<()> {
	let swept = pool.sweep_idle().await;
	pool.set_max_lifetime(pool.config().max_lifetime);
	swept.map(|_| ())
}
