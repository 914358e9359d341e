use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A process-wide "stop the workers" flag, checked once per dequeue by
/// [`net::worker::Worker`](../../net/src/worker.rs) so a host embedding the
/// simulator can shut every worker thread down cleanly and join them.
///
/// Grounded on the teacher's own `static EXIT: AtomicBool` in its (removed)
/// `runtime::rt::exec`, generalized from a single global into a cloneable
/// handle so each worker thread owns a reference rather than reaching for a
/// `static`.
#[derive(Clone, Default)]
pub struct Shutdown(Arc<AtomicBool>);

impl Shutdown {
	pub fn new() -> Self {
		Self(Arc::new(AtomicBool::new(false)))
	}

	pub fn requested(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}

	pub fn request(&self) {
		self.0.store(true, Ordering::Relaxed);
	}

	/// Installs a `SIGINT` handler that requests shutdown. Intended for host
	/// binaries; fails if a handler is already installed.
	pub fn install_ctrlc(&self) -> Result<(), ctrlc::Error> {
		let flag = self.clone();
		ctrlc::set_handler(move || flag.request())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn starts_unrequested_and_latches_on_request() {
		let s = Shutdown::new();
		assert!(!s.requested());
		s.request();
		assert!(s.requested());
	}

	#[test]
	fn clones_share_the_same_flag() {
		let s = Shutdown::new();
		let other = s.clone();
		other.request();
		assert!(s.requested());
	}
}
