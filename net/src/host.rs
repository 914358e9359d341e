use runtime::SimTime;

use crate::address::Address;
use crate::event::{Event, EventKind};
use crate::oracle::Oracles;
use crate::pipe::PipeManager;
use crate::socket::{SockId, SocketManager};
use crate::transport::{TransportManager, UploadOutcome};
use crate::vci::{Dispatch, Vci};

/// One virtual host's full stack — spec.md §4.9's "identify the destination
/// host; acquire the host's lock; execute the event's handler in the host's
/// context". A `Worker` owns many of these behind one mutex each (spec.md
/// §5: "one host is locked exclusively while any of its events executes").
pub struct Host {
	pub address: Address,
	pub sockets: SocketManager,
	pub pipes: PipeManager,
	pub transport: TransportManager,

	/// Accumulated virtual-CPU delay for this host, in nanoseconds — the
	/// cursor `Vci::apply_cpu_delay` compares events against (spec.md §4.8).
	pub cpu_delay_ns: u64,
	pub cpu_blocked: bool,
}

impl Host {
	pub fn new(address: Address) -> Self {
		Self { address, sockets: SocketManager::new(address), pipes: PipeManager::new(), transport: TransportManager::new(address), cpu_delay_ns: 0, cpu_blocked: false }
	}

	/// Executes one event's handler under this host's context, returning any
	/// follow-up events this host must itself schedule locally (timers,
	/// retransmit requests, an immediate re-fire of the transport pipeline).
	/// Events destined for a *different* host are VCI's job, invoked from
	/// within the individual handlers below (`on_packet`) rather than from
	/// this dispatcher.
	pub fn handle(&mut self, now: SimTime, kind: EventKind, vci: &Vci, oracles: &dyn Oracles) -> Vec<Event> {
		match kind {
			EventKind::OnPacket(pkt) => self.on_packet(now, pkt, oracles),
			EventKind::OnNotify { sockd } => self.on_notify(sockd),
			EventKind::OnPoll { sockd } => self.on_poll(now, sockd, vci, oracles),
			EventKind::OnDack { sockd } => self.on_dack(sockd),
			EventKind::OnUploaded => self.on_uploaded(now, vci, oracles),
			EventKind::OnDownloaded => self.on_downloaded(now, oracles),
			EventKind::OnRetransmit { src_addr, src_port, dst_addr, dst_port, seq } => self.on_retransmit(now, src_addr, src_port, dst_addr, dst_port, seq, vci, oracles),
			EventKind::OnClose { dst_addr, dst_port, src_addr, src_port, rcv_end } => self.on_close(now, dst_addr, dst_port, src_addr, src_port, rcv_end, oracles),
		}
	}

	fn on_packet(&mut self, now: SimTime, pkt: crate::packet::PacketRef, oracles: &dyn Oracles) -> Vec<Event> {
		let local_port = pkt.dst_port;
		let Some(id) = self.sockets.route(pkt.protocol, pkt.dst_addr, local_port, pkt.src_addr, pkt.src_port) else {
			return Vec::new();
		};

		match self.transport.ready_receive(id, pkt, oracles) {
			Ok(()) => Vec::new(),
			Err(req) => vec![Event::new(now, req.src_addr, req.src_addr, EventKind::OnRetransmit { src_addr: req.src_addr, src_port: req.src_port, dst_addr: req.dst_addr, dst_port: req.dst_port, seq: req.seq })],
		}
	}

	fn on_notify(&mut self, _sockd: SockId) -> Vec<Event> {
		Vec::new()
	}

	fn on_poll(&mut self, now: SimTime, sockd: SockId, vci: &Vci, oracles: &dyn Oracles) -> Vec<Event> {
		if self.transport.ready_send(sockd) {
			return self.drain_uploads(now, vci, oracles);
		}
		Vec::new()
	}

	fn on_dack(&mut self, sockd: SockId) -> Vec<Event> {
		let Ok(socket) = self.sockets.get_mut(sockd) else { return Vec::new() };
		if let Some(pkt) = socket.tcp_dack_fire() {
			socket.vb.add_control(pkt.into_ref());
			self.transport.ready_send(sockd);
		}
		Vec::new()
	}

	fn on_uploaded(&mut self, now: SimTime, vci: &Vci, oracles: &dyn Oracles) -> Vec<Event> {
		self.drain_uploads(now, vci, oracles)
	}

	fn drain_uploads(&mut self, now: SimTime, vci: &Vci, oracles: &dyn Oracles) -> Vec<Event> {
		let mut followups = Vec::new();
		match self.transport.upload_next(now, &mut self.sockets, oracles) {
			UploadOutcome::KeepFiring(sent) => {
				for sent in sent {
					self.dispatch_sent(now, sent, vci, oracles, &mut followups);
				}
				followups.push(Event::new(now, self.address, self.address, EventKind::OnUploaded));
			}
			UploadOutcome::ScheduleUploaded { at, sent } => {
				for sent in sent {
					self.dispatch_sent(now, sent, vci, oracles, &mut followups);
				}
				followups.push(Event::new(at, self.address, self.address, EventKind::OnUploaded));
			}
		}
		followups
	}

	fn dispatch_sent(&self, now: SimTime, sent: crate::transport::Transmission, vci: &Vci, oracles: &dyn Oracles, followups: &mut Vec<Event>) {
		let pkt = sent.packet.into_ref();

		// A loopback-addressed packet never leaves the host (spec.md §3:
		// "Loopback is the constant 127.0.0.1"), so it skips VCI's
		// worker/slave classification and latency/loss sampling entirely.
		if pkt.dst_addr.is_loopback() {
			followups.push(Event::new(now, self.address, self.address, EventKind::OnPacket(pkt)));
			return;
		}

		let src_net = self.address.node_id() as u32;
		let dst_net = pkt.dst_addr.node_id() as u32;

		// Host has no channel to a peer worker, so a cross-worker dispatch
		// comes back as a plain `Event` too (dest = the foreign host); the
		// owning `Worker` is the one that re-wraps it into a `WireEvent` and
		// forwards it, once it notices `event.dest` isn't one of its own
		// hosts (see `Worker::route_followup`).
		match vci.route(src_net, dst_net, self.address, pkt.dst_addr, pkt, oracles, false) {
			Dispatch::Local(event) => followups.push(event),
			Dispatch::CrossWorker(wire_event) => followups.push(wire_event.into_event()),
			Dispatch::Dropped => {}
		}
	}

	fn on_downloaded(&mut self, now: SimTime, oracles: &dyn Oracles) -> Vec<Event> {
		let (next, notifies, dack_timers) = self.transport.download_next(now, &mut self.sockets, oracles);
		let mut followups = vec![Event::new(next, self.address, self.address, EventKind::OnDownloaded)];

		for notify in notifies {
			followups.push(self.close_event(now, notify.peer_addr, notify.peer_port, notify.local_addr, notify.local_port, 0, oracles));
		}

		for sockd in dack_timers {
			let at = now + crate::tcp::dack_timer_ms(oracles);
			followups.push(Event::new(at, self.address, self.address, EventKind::OnDack { sockd }));
		}

		followups
	}

	/// Builds the `OnClose` event that announces one side's drain state to
	/// the peer — spec.md §4.4's "schedule a close event at the peer", used
	/// both for a guest-initiated `close()` (carrying `snd_end`) and for a
	/// drained `CLOSE_WAIT` socket's automatic close-ack (carrying `0`).
	fn close_event(&self, now: SimTime, peer_addr: Address, peer_port: u16, local_addr: Address, local_port: u16, rcv_end: u32, oracles: &dyn Oracles) -> Event {
		let src_net = self.address.node_id() as u32;
		let peer_net = peer_addr.node_id() as u32;
		let deliver_time = now + oracles.latency(src_net, peer_net);
		Event::new(deliver_time, peer_addr, peer_addr, EventKind::OnClose { dst_addr: peer_addr, dst_port: peer_port, src_addr: local_addr, src_port: local_port, rcv_end })
	}

	/// Guest-initiated `close()` on a connected stream socket — spec.md
	/// §4.4: transition to `CLOSING` and tell the peer how many packets it
	/// should expect (`snd_end`).
	pub fn close(&mut self, sockd: SockId, now: SimTime, oracles: &dyn Oracles) -> Vec<Event> {
		let Ok(socket) = self.sockets.get_mut(sockd) else { return Vec::new() };
		let Some((local_addr, local_port)) = socket.local else { return Vec::new() };
		let Some((peer_addr, peer_port)) = socket.peer else { return Vec::new() };

		let Ok(snd_end) = socket.tcp_guest_close() else { return Vec::new() };
		vec![self.close_event(now, peer_addr, peer_port, local_addr, local_port, snd_end, oracles)]
	}

	fn on_retransmit(&mut self, now: SimTime, src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, seq: u32, vci: &Vci, oracles: &dyn Oracles) -> Vec<Event> {
		let Some(id) = self.sockets.route(crate::packet::Protocol::Stream, src_addr, src_port, dst_addr, dst_port) else { return Vec::new() };
		let Ok(socket) = self.sockets.get_mut(id) else { return Vec::new() };

		let Some(pkt) = socket.tcp_on_retransmit(seq) else { return Vec::new() };
		socket.tcp_requeue(pkt);
		self.transport.ready_send(id);
		self.drain_uploads(now, vci, oracles)
	}

	fn on_close(&mut self, now: SimTime, dst_addr: Address, dst_port: u16, src_addr: Address, src_port: u16, rcv_end: u32, oracles: &dyn Oracles) -> Vec<Event> {
		let Some(id) = self.sockets.route(crate::packet::Protocol::Stream, dst_addr, dst_port, src_addr, src_port) else { return Vec::new() };
		let Ok(socket) = self.sockets.get_mut(id) else { return Vec::new() };

		if socket.tcp_on_close_event(rcv_end) {
			self.sockets.destroy_child(id);
			return Vec::new();
		}

		// The peer's close may announce an `rcv_end` we've already fully
		// received (spec.md §4.4 scenario 3) — check the drain immediately
		// rather than waiting on a data packet that may never arrive.
		let Ok(socket) = self.sockets.get_mut(id) else { return Vec::new() };
		if socket.tcp_drain_complete() {
			let (local_addr, local_port) = socket.local.unwrap();
			let (peer_addr, peer_port) = socket.peer.unwrap();
			return vec![self.close_event(now, peer_addr, peer_port, local_addr, local_port, 0, oracles)];
		}
		Vec::new()
	}

	/// Autotune hook, invoked once a socket reaches `ESTABLISHED` — spec.md
	/// §4.4.7. Kept on `Host` (rather than `tcp.rs`) since it needs the
	/// oracle for peer bandwidths plus the RTT the caller measured.
	pub fn autotune(&mut self, sockd: SockId, peer: Address, rtt_ms: u64, oracles: &dyn Oracles) {
		let peer_net = peer.node_id() as u32;
		let down = oracles.down_bandwidth_kbps(peer_net);
		let up = oracles.up_bandwidth_kbps(peer_net);
		let (send_buf, recv_buf) = crate::socket::Socket::tcp_autotune(self.address, peer, rtt_ms, down, up, oracles);

		if let Ok(socket) = self.sockets.get_mut(sockd) {
			socket.vb.set_max_size(send_buf);
			socket.vb.set_recv_max_size(recv_buf);
		}
	}
}
