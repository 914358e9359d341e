use std::sync::{Condvar, Mutex};

use crate::time::SimTime;

/// The cross-worker scheduling barrier of spec.md §4.9/§5.
///
/// Workers run disjoint sets of hosts on independent OS threads and must
/// never let one worker observe an event out of global time order. Since
/// every cross-worker event incurs at least `min_latency` of delay, a worker
/// is safe to process anything up to `global_min_time + min_latency`: no
/// other worker can inject something earlier than that into any host
/// (spec.md §5, "no other worker can inject an event into a host with an
/// earlier timestamp"). This is the classic conservative (Chandy-Misra)
/// look-ahead window, keyed on each worker publishing the time of its own
/// next pending event.
pub struct Barrier {
	min_latency: SimTime,
	state: Mutex<State>,
	condvar: Condvar,
}

struct State {
	/// `next[i]` is worker `i`'s next pending event time, or `None` if that
	/// worker currently has nothing queued (and so does not constrain the
	/// horizon).
	next: Vec<Option<SimTime>>,
}

impl State {
	/// The minimum next-event time across all workers that still have
	/// pending work, or `None` if every worker is idle.
	fn global_min(&self) -> Option<SimTime> {
		self.next.iter().filter_map(|t| *t).min()
	}
}

impl Barrier {
	/// Creates a barrier for `worker_count` workers, with the given minimum
	/// inter-host latency (the look-ahead window).
	pub fn new(worker_count: usize, min_latency: SimTime) -> Self {
		Self {
			min_latency,
			state: Mutex::new(State { next: vec![None; worker_count] }),
			condvar: Condvar::new(),
		}
	}

	/// Publishes that worker `id` next wants to run an event at `time`, and
	/// blocks until the global barrier permits it — i.e. until
	/// `time <= global_min_time + min_latency`. Returns the horizon that
	/// admitted it.
	///
	/// Every call (even ones that don't block) wakes other waiters, since
	/// publishing a new, possibly-lower `next` time can only shrink the
	/// horizon other workers are waiting to clear past.
	pub fn admit(&self, id: usize, time: SimTime) -> SimTime {
		let mut state = self.state.lock().unwrap();
		state.next[id] = Some(time);
		self.condvar.notify_all();

		loop {
			let horizon = match state.global_min() {
				Some(min) => min + self.min_latency,
				// No worker has pending work; nothing constrains us.
				None => SimTime::MAX,
			};

			if time <= horizon {
				return horizon;
			}

			state = self.condvar.wait(state).unwrap();
		}
	}

	/// Marks worker `id` as having no pending work, so it stops constraining
	/// the global horizon. Wakes any worker waiting on a shrinking horizon.
	pub fn retire(&self, id: usize) {
		let mut state = self.state.lock().unwrap();
		state.next[id] = None;
		self.condvar.notify_all();
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use std::thread;

	#[test]
	fn single_worker_never_blocks() {
		let barrier = Barrier::new(1, 5);
		assert_eq!(barrier.admit(0, 0), SimTime::MAX);
		assert_eq!(barrier.admit(0, 100), SimTime::MAX);
	}

	#[test]
	fn lagging_worker_bounds_the_others_horizon() {
		let barrier = Arc::new(Barrier::new(2, 10));

		// Worker 0 publishes time 0: horizon becomes 0 + 10 = 10.
		assert_eq!(barrier.admit(0, 0), 10);

		// Worker 1 wants to run at time 50, far past the horizon; it must
		// block until worker 0 catches up or retires.
		let b = barrier.clone();
		let waiter = thread::spawn(move || b.admit(1, 50));

		thread::sleep(std::time::Duration::from_millis(50));
		assert!(!waiter.is_finished());

		// Worker 0 retires (no more events); horizon becomes unconstrained.
		barrier.retire(0);
		assert_eq!(waiter.join().unwrap(), SimTime::MAX);
	}

	#[test]
	fn advancing_min_time_raises_the_horizon() {
		let barrier = Arc::new(Barrier::new(2, 5));
		assert_eq!(barrier.admit(0, 0), 5);

		let b = barrier.clone();
		let waiter = thread::spawn(move || b.admit(1, 20));
		thread::sleep(std::time::Duration::from_millis(50));
		assert!(!waiter.is_finished());

		// Worker 0 advances to time 15: horizon becomes 15 + 5 = 20, which
		// now admits worker 1's request.
		barrier.admit(0, 15);
		assert_eq!(waiter.join().unwrap(), 20);
	}
}
