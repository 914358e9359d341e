use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use runtime::{Barrier, LocalClock, Shutdown, SimTime, Tracker};

use crate::address::Address;
use crate::event::{Event, EventKind, WireEvent};
use crate::host::Host;
use crate::oracle::Oracles;
use crate::vci::Vci;

/// A cross-worker event inbox message — spec.md §4.8's "construct the
/// cross-worker wire frame ... and schedule the arrival event at the
/// destination", carried over a `crossbeam-channel` the way the teacher's
/// `dataplane::worker` routes `RoutedPacket`s between NIC worker threads.
pub type Inbox = Receiver<WireEvent>;
pub type Outbox = Sender<WireEvent>;

/// Which worker owns which host address, so a worker that produces a
/// follow-up event for a foreign host knows exactly which channel to use
/// rather than guessing. Shared read-only across every worker once built,
/// the way the teacher's dataplane hands every worker thread the same
/// routing table at spawn time.
pub type HostRoutes = Arc<HashMap<Address, usize>>;

/// Everything one worker thread owns: its event tracker, its local clock,
/// and the set of virtual hosts it alone serves (spec.md §4.9: "threads are
/// disjoint and serve disjoint sets of virtual hosts").
pub struct Worker<O: Oracles> {
	id: usize,
	hosts: HashMap<Address, Host>,
	tracker: Tracker<Event>,
	clock: LocalClock,
	inbox: Inbox,
	peers: HashMap<usize, Outbox>,
	routes: HostRoutes,
	barrier: Arc<Barrier>,
	shutdown: Shutdown,
	oracles: Arc<O>,
	vci: Vci,
}

impl<O: Oracles> Worker<O> {
	#[allow(clippy::too_many_arguments)]
	pub fn new(id: usize, hosts: Vec<Host>, tracker_granularity: u64, inbox: Inbox, peers: HashMap<usize, Outbox>, routes: HostRoutes, barrier: Arc<Barrier>, shutdown: Shutdown, oracles: Arc<O>) -> Self {
		let hosts = hosts.into_iter().map(|h| (h.address, h)).collect();
		Self { id, hosts, tracker: Tracker::new(tracker_granularity), clock: LocalClock::new(), inbox, peers, routes, barrier, shutdown, oracles, vci: Vci }
	}

	/// Injects a locally-originated event directly onto this worker's own
	/// tracker (e.g. the simulation driver scheduling the first `connect()`
	/// or a guest timer).
	pub fn schedule(&mut self, event: Event) {
		self.tracker.insert(event.deliver_time, event);
	}

	/// The outer loop of spec.md §4.9: pop the earliest event (coordinating
	/// with peer workers through the barrier's look-ahead window), execute
	/// its handler under the owning host's context, and schedule any
	/// follow-up events — locally, or by forwarding across a peer's channel.
	pub fn run(&mut self) {
		loop {
			if self.shutdown.requested() {
				self.barrier.retire(self.id);
				return;
			}

			self.step();
		}
	}

	/// Runs a single pass of the outer loop body: drain inbound wire events,
	/// find this worker's earliest pending event, clear it past the barrier's
	/// look-ahead horizon, and execute it. Returns whether an event actually
	/// ran, so tests can drive the loop deterministically instead of relying
	/// on a background thread.
	fn step(&mut self) -> bool {
		self.drain_inbox();

		let mut next_time: SimTime = 0;
		if self.tracker.peek_next(&mut next_time).is_none() {
			self.barrier.retire(self.id);
			return false;
		}

		let horizon = self.barrier.admit(self.id, next_time);
		if next_time > horizon {
			return false;
		}

		let mut time_out = 0;
		let Some(event) = self.tracker.pop_next(&mut time_out) else { return false };
		self.clock.advance_to(time_out);

		self.execute(event);
		true
	}

	fn drain_inbox(&mut self) {
		while let Ok(wire_event) = self.inbox.try_recv() {
			let event = wire_event.into_event();
			self.tracker.insert(event.deliver_time, event);
		}
	}

	fn execute(&mut self, event: Event) {
		let Event { deliver_time, dest, owner: _, cpu_cursor: _, kind } = event;

		let Some(host) = self.hosts.get_mut(&dest) else {
			log::warn!("worker {} has no host for address {dest}, dropping event", self.id);
			return;
		};

		let followups = host.handle(deliver_time, kind, &self.vci, self.oracles.as_ref());
		for followup in followups {
			self.route_followup(followup);
		}
	}

	/// Routes a handler's follow-up event either onto this worker's own
	/// tracker (destination served locally) or across the owning peer's
	/// channel (served by a different worker on the same slave process) —
	/// the same two destinations VCI itself distinguishes in `Dispatch`.
	fn route_followup(&mut self, event: Event) {
		if self.hosts.contains_key(&event.dest) {
			self.tracker.insert(event.deliver_time, event);
			return;
		}

		let Event { deliver_time, dest, owner, kind, .. } = event;
		let EventKind::OnPacket(pkt) = kind else {
			log::warn!("worker {} cannot forward a non-packet event to foreign host {dest}", self.id);
			return;
		};

		let Some(&peer_id) = self.routes.get(&dest) else {
			log::warn!("worker {} has no route for host {dest}, dropping event", self.id);
			return;
		};
		let Some(outbox) = self.peers.get(&peer_id) else {
			log::warn!("worker {} has no channel to worker {peer_id}, dropping event", self.id);
			return;
		};

		let _ = outbox.send(WireEvent::for_packet(deliver_time, dest, owner, pkt, false));
	}
}

/// A handle to a spawned worker thread — mirrors the teacher's
/// `WorkerHandle`: a join handle plus the shutdown signal used to stop it.
pub struct WorkerHandle {
	thread: Option<JoinHandle<()>>,
	shutdown: Shutdown,
}

impl WorkerHandle {
	#[allow(clippy::too_many_arguments)]
	pub fn spawn<O: Oracles + Send + Sync + 'static>(id: usize, hosts: Vec<Host>, tracker_granularity: u64, inbox: Inbox, peers: HashMap<usize, Outbox>, routes: HostRoutes, barrier: Arc<Barrier>, shutdown: Shutdown, oracles: Arc<O>) -> Self {
		let shutdown_for_thread = shutdown.clone();
		let thread = thread::Builder::new()
			.name(format!("net-worker-{id}"))
			.spawn(move || {
				let mut worker = Worker::new(id, hosts, tracker_granularity, inbox, peers, routes, barrier, shutdown_for_thread, oracles);
				worker.run();
			})
			.expect("failed to spawn worker thread");

		Self { thread: Some(thread), shutdown }
	}

	pub fn stop(&self) {
		self.shutdown.request();
	}

	pub fn join(mut self) {
		if let Some(thread) = self.thread.take() {
			let _ = thread.join();
		}
	}
}

impl Drop for WorkerHandle {
	fn drop(&mut self) {
		self.stop();
	}
}

#[cfg(test)]
mod tests {
	use crossbeam_channel::unbounded;

	use super::*;
	use crate::oracle::testing::FakeOracles;

	fn addr(worker: u8, node: u16) -> Address {
		Address::new_raw(0, worker, node)
	}

	fn single_worker(hosts: Vec<Host>) -> Worker<FakeOracles> {
		let (_tx, rx) = unbounded();
		Worker::new(0, hosts, 1, rx, HashMap::new(), Arc::new(HashMap::new()), Arc::new(Barrier::new(1, 5)), Shutdown::new(), Arc::new(FakeOracles::default()))
	}

	#[test]
	fn schedules_and_executes_a_local_event() {
		let host_addr = addr(1, 1);
		let mut host = Host::new(host_addr);
		let sockd = host.sockets.socket(crate::socket::SockType::Datagram);
		let mut worker = single_worker(vec![host]);

		worker.schedule(Event::new(10, host_addr, host_addr, EventKind::OnNotify { sockd }));

		assert!(worker.step());
		assert_eq!(worker.clock.now(), 10);
		assert!(!worker.step(), "tracker should be drained after one event");
	}

	#[test]
	fn idle_worker_retires_from_the_barrier() {
		let mut worker = single_worker(vec![Host::new(addr(1, 1))]);
		assert!(!worker.step());
	}

	#[test]
	fn event_for_unknown_host_is_dropped_without_panicking() {
		let mut worker = single_worker(vec![Host::new(addr(1, 1))]);
		let foreign = addr(1, 99);

		worker.schedule(Event::new(5, foreign, foreign, EventKind::OnUploaded));
		assert!(worker.step());
	}

	#[test]
	fn cross_worker_followup_is_forwarded_to_the_routed_peer() {
		let local_addr = addr(1, 1);
		let remote_addr = addr(2, 1);

		let (tx, rx) = unbounded();
		let mut routes = HashMap::new();
		routes.insert(remote_addr, 1usize);
		let mut peers = HashMap::new();
		peers.insert(1usize, tx);

		let mut worker = Worker::new(
			0,
			vec![Host::new(local_addr)],
			1,
			{
				let (_tx, rx) = unbounded();
				rx
			},
			peers,
			Arc::new(routes),
			Arc::new(Barrier::new(1, 5)),
			Shutdown::new(),
			Arc::new(FakeOracles::default()),
		);

		let pkt = crate::packet::Packet::control(local_addr, 1000, remote_addr, 2000, 0, 0, 0, crate::packet::Flags::ack_only()).into_ref();
		worker.route_followup(Event::new(20, remote_addr, remote_addr, EventKind::OnPacket(pkt)));

		let forwarded = rx.try_recv().expect("followup should have crossed to the peer channel");
		assert!(matches!(forwarded, WireEvent::PacketNoPayload { dest, .. } if dest == remote_addr));
	}

	#[test]
	fn followup_with_no_route_is_dropped_not_panicked() {
		let local_addr = addr(1, 1);
		let unknown = addr(9, 9);
		let mut worker = single_worker(vec![Host::new(local_addr)]);

		let pkt = crate::packet::Packet::control(local_addr, 1000, unknown, 2000, 0, 0, 0, crate::packet::Flags::ack_only()).into_ref();
		worker.route_followup(Event::new(20, unknown, unknown, EventKind::OnPacket(pkt)));
	}
}
