//! Test logging utilities
//!
//! Provides utilities for initializing logging in test environments and for
//! capturing what a block of code logged.

use std::io;
use std::sync::{Arc, Mutex, Once, PoisonError};
use tracing::dispatcher::DefaultGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::util::SubscriberInitExt;

static INIT: Once = Once::new();

/// Initialize logging for tests (call once)
///
/// Honors `RUST_LOG`; without it, Quarry's own crates log at debug.
///
/// # Examples
///
/// ```
/// use quarry_test::logging::init_test_logging;
///
/// // In your test:
/// init_test_logging();
/// // Your test code
/// ```
pub fn init_test_logging() {
	INIT.call_once(|| {
		let filter = EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| EnvFilter::new("quarry_db=debug,quarry_conf=debug"));
		let _ = tracing_subscriber::fmt()
			.with_env_filter(filter)
			.with_test_writer()
			.try_init();
	});
}

/// Log output captured by [`capture_logs`].
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs {
	buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
	/// Everything logged so far, without ANSI colouring.
	pub fn contents(&self) -> String {
		let buf = self.buf.lock().unwrap_or_else(PoisonError::into_inner);
		String::from_utf8_lossy(&buf).into_owned()
	}

	pub fn contains(&self, needle: &str) -> bool {
		self.contents().contains(needle)
	}
}

pub struct CapturedWriter {
	buf: Arc<Mutex<Vec<u8>>>,
}

impl io::Write for CapturedWriter {
	fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
		self.buf
			.lock()
			.unwrap_or_else(PoisonError::into_inner)
			.extend_from_slice(bytes);
		Ok(bytes.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

impl<'a> MakeWriter<'a> for CapturedLogs {
	type Writer = CapturedWriter;

	fn make_writer(&'a self) -> Self::Writer {
		CapturedWriter {
			buf: Arc::clone(&self.buf),
		}
	}
}

/// Capture every event at debug or above on the current thread until the
/// returned guard is dropped.
///
/// Only events emitted on the calling thread are seen, so use it from
/// single-threaded tests (`#[tokio::test]`'s default flavor).
///
/// # Examples
///
/// ```
/// use quarry_test::logging::capture_logs;
///
/// let (logs, _guard) = capture_logs();
/// tracing::warn!(pool = "replica-0", "replica unavailable");
/// assert!(logs.contains("replica unavailable"));
/// assert!(logs.contains("replica-0"));
/// ```
pub fn capture_logs() -> (CapturedLogs, DefaultGuard) {
	let logs = CapturedLogs::default();
	let guard = tracing_subscriber::fmt()
		.with_writer(logs.clone())
		.with_ansi(false)
		.with_max_level(tracing::Level::DEBUG)
		.finish()
		.set_default();
	(logs, guard)
}
