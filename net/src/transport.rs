use std::collections::VecDeque;

use runtime::SimTime;
use utils::config::{flag_or, int_or};

use crate::address::Address;
use crate::oracle::Oracles;
use crate::packet::{Packet, PacketRef};
use crate::socket::{SockId, SockType, SocketManager, SocketState};
use crate::tcp;

pub const DEFAULT_BATCH_MS: u64 = 10;
pub const DEFAULT_NIC_QUEUE_BYTES: u32 = 1024 * 1024;

fn batch_ms(cfg: &dyn Oracles) -> u64 {
	int_or(cfg, "transport.batch_ms", DEFAULT_BATCH_MS as i64) as u64
}

fn nic_queue_bytes(cfg: &dyn Oracles) -> u32 {
	int_or(cfg, "transport.nic_queue_bytes", DEFAULT_NIC_QUEUE_BYTES as i64) as u32
}

/// A packet selected off a socket's wire, ready to hand to VCI for
/// latency/loss routing (spec.md §4.6: "hands the packet to VCI for
/// scheduling").
pub struct Transmission {
	pub socket: SockId,
	pub packet: Packet,
}

/// Outcome of a single `upload_next` pass — either the batch is still
/// running (re-fire immediately) or it has been rate-limited (schedule
/// `uploaded` at the returned time).
pub enum UploadOutcome {
	KeepFiring(Vec<Transmission>),
	ScheduleUploaded { at: SimTime, sent: Vec<Transmission> },
}

/// Per-host rate shaper and NIC queue of spec.md §4.6. One instance per
/// virtual host; its two batched pipelines (upload, download) are driven by
/// the worker's `on_uploaded`/`on_downloaded` events.
pub struct TransportManager {
	host: Address,
	up_ready: VecDeque<SockId>,
	consumed_sent_ns: u64,

	nic_queue_used: u32,
	down_ready: VecDeque<(SockId, PacketRef)>,
	consumed_recv_ns: u64,
}

impl TransportManager {
	pub fn new(host: Address) -> Self {
		Self { host, up_ready: VecDeque::new(), consumed_sent_ns: 0, nic_queue_used: 0, down_ready: VecDeque::new(), consumed_recv_ns: 0 }
	}

	/// `ready_send(socket)` — spec.md §4.6: append if not already queued.
	/// Returns whether the socket was newly enqueued (the caller decides
	/// whether that should trigger an immediate `upload_next`, e.g. only
	/// when the pipeline isn't already mid-batch).
	pub fn ready_send(&mut self, socket: SockId) -> bool {
		if self.up_ready.contains(&socket) {
			return false;
		}
		self.up_ready.push_back(socket);
		true
	}

	/// Drains the batch: round-robins the ready queue, pulling one wire
	/// packet per socket per turn, until the nanosecond budget for this
	/// batch window is exhausted or the queue runs dry.
	pub fn upload_next(&mut self, now: SimTime, sockets: &mut SocketManager, oracles: &dyn Oracles) -> UploadOutcome {
		let bytes_per_ns_up = Self::bytes_per_ns(oracles.up_bandwidth_kbps(network_of(self.host)));
		let batch_ns = batch_ms(oracles) * 1_000_000;
		let mut sent = Vec::new();

		while self.consumed_sent_ns < batch_ns {
			let Some(id) = self.up_ready.pop_front() else { break };

			let Ok(socket) = sockets.get_mut(id) else { continue };
			let pkt = match socket.kind {
				SockType::Stream => socket.tcp_select_wire(),
				SockType::Datagram => socket.udp_select_wire(),
			};

			let Some(pkt) = pkt else { continue };

			let cost_ns = (pkt.data_size.max(1) as f64 / bytes_per_ns_up.max(f64::MIN_POSITIVE)) as u64;
			self.consumed_sent_ns += cost_ns;
			sent.push(Transmission { socket: id, packet: pkt });

			if socket.epoll().is_writable() || socket.vb.has_control() {
				self.up_ready.push_back(id);
			}
		}

		if self.consumed_sent_ns >= 1_000_000 {
			let ms = self.consumed_sent_ns / 1_000_000;
			self.consumed_sent_ns = 0;
			UploadOutcome::ScheduleUploaded { at: now + ms, sent }
		} else {
			UploadOutcome::KeepFiring(sent)
		}
	}

	fn bytes_per_ns(kbps: u64) -> f64 {
		(kbps as f64 * 1024.0) / 1e9
	}

	/// Inbound admission — spec.md §4.6: `ready_receive`. Admits the packet
	/// into the NIC queue if there is byte budget, requesting retransmission
	/// on overflow for stream packets and silently dropping datagrams.
	pub fn ready_receive(&mut self, socket: SockId, pkt: PacketRef, cfg: &dyn Oracles) -> Result<(), RetransmitRequest> {
		let budget = nic_queue_bytes(cfg);
		if self.nic_queue_used + pkt.data_size > budget {
			return match pkt.tcp {
				Some(header) => Err(RetransmitRequest { src_addr: pkt.src_addr, src_port: pkt.src_port, dst_addr: pkt.dst_addr, dst_port: pkt.dst_port, seq: header.seq }),
				None => Ok(()), // datagram: admission failure is a silent drop
			};
		}

		self.nic_queue_used += pkt.data_size;
		self.down_ready.push_back((socket, pkt));
		Ok(())
	}

	/// Symmetric to `upload_next`: dispatches a batch of admitted packets
	/// into their sockets' TCP/UDP state machines. Returns the next poll
	/// time plus any close-acks a drained `CLOSE_WAIT` socket now owes its
	/// peer (spec.md §4.4 scenario 3), since `Host` is the one with enough
	/// context (latency oracle, event construction) to turn those into
	/// `OnClose` events.
	pub fn download_next(&mut self, now: SimTime, sockets: &mut SocketManager, oracles: &dyn Oracles) -> (SimTime, Vec<CloseNotify>, Vec<SockId>) {
		let bytes_per_ns_down = Self::bytes_per_ns(oracles.down_bandwidth_kbps(network_of(self.host)));
		let batch_ns = batch_ms(oracles) * 1_000_000;
		let mut notifies = Vec::new();
		let mut dack_timers = Vec::new();

		while self.consumed_recv_ns < batch_ns {
			let Some((id, pkt)) = self.down_ready.pop_front() else { break };
			self.nic_queue_used = self.nic_queue_used.saturating_sub(pkt.data_size);

			let cost_ns = (pkt.data_size.max(1) as f64 / bytes_per_ns_down.max(f64::MIN_POSITIVE)) as u64;
			self.consumed_recv_ns += cost_ns;

			if let Some(notify) = self.process_incoming(sockets, id, pkt, oracles, &mut dack_timers) {
				notifies.push(notify);
			}
		}

		let ms = (self.consumed_recv_ns / 1_000_000).max(1);
		self.consumed_recv_ns = 0;
		(now + ms, notifies, dack_timers)
	}

	/// Dispatches one arrived packet against the socket's TCP/UDP state
	/// machine — spec.md §4.4's per-state reception rules, including the
	/// handshake transitions (`LISTEN` demultiplexing a SYN into a child,
	/// `SYN_SENT`/`SYN_RCVD` completing the handshake) that a bare `Socket`
	/// can't drive on its own since they mutate the `SocketManager`'s
	/// parent/child tables.
	fn process_incoming(&mut self, sockets: &mut SocketManager, id: SockId, pkt: PacketRef, oracles: &dyn Oracles, dack_timers: &mut Vec<SockId>) -> Option<CloseNotify> {
		let Ok(socket) = sockets.get_mut(id) else { return None };

		if socket.kind == SockType::Datagram {
			socket.udp_deliver(pkt);
			return None;
		}

		let Some(header) = pkt.tcp else { return None };

		if header.flags.rst() {
			socket.tcp_on_reset();
			return None;
		}

		let state = socket.state;

		if matches!(state, SocketState::Established | SocketState::CloseWait) {
			if !socket.tcp_in_receive_window(header.seq) {
				return None;
			}
			if header.ack > 0 || header.flags.ack() {
				socket.tcp_on_ack(header.seq, header.ack, header.adv_wnd);
			}
			if !pkt.is_control() {
				let _ = socket.tcp_process_data(pkt);
				socket.tcp_update_rcv_wnd(oracles);
				match socket.tcp_dack_on_receive(oracles) {
					tcp::DackAction::AckNow => {
						if let Some(ack) = socket.tcp_build_ack() {
							socket.vb.add_control(ack.into_ref());
							self.ready_send(id);
						}
					}
					tcp::DackAction::ScheduleTimer => dack_timers.push(id),
					tcp::DackAction::TimerPending => {}
				}
			}
			if socket.tcp_drain_complete() {
				let (local_addr, local_port) = socket.local?;
				let (peer_addr, peer_port) = socket.peer?;
				return Some(CloseNotify { local_addr, local_port, peer_addr, peer_port });
			}
			return None;
		}

		if state == SocketState::SynSent && header.flags.syn() && header.flags.ack() {
			if let Ok(ack_pkt) = socket.tcp_complete_handshake_initiator(header.seq, header.ack) {
				socket.vb.add_control(ack_pkt.into_ref());
				self.ready_send(id);
			}
			return None;
		}

		if state == SocketState::SynRcvd && header.flags.ack() {
			let completed = socket.tcp_complete_handshake_child(header.ack).is_ok();
			if completed {
				let _ = sockets.promote_child(id);
			}
			return None;
		}

		if state == SocketState::Listen && header.flags.syn() {
			let Ok(local) = sockets.get(id).and_then(|l| l.local.ok_or(utils::error::SimError::BadState)) else { return None };
			let remote = (pkt.src_addr, pkt.src_port);
			let backlog = tcp::backlog_limit(oracles);
			let Ok(child) = sockets.spawn_child(id, remote, backlog) else { return None };

			let (pcb, reply) = crate::socket::Socket::tcp_accept_syn(local.0, local.1, pkt.src_addr, pkt.src_port, header.seq, 64);
			if let Ok(child_socket) = sockets.get_mut(child) {
				child_socket.tcp = Some(pcb);
				child_socket.vb.add_control(reply.into_ref());
			}
			self.ready_send(child);
		}

		None
	}
}

/// A drained `CLOSE_WAIT` socket's close-ack, owed back to its peer —
/// spec.md §4.4 scenario 3's `rcv_end = 0` reply.
pub struct CloseNotify {
	pub local_addr: Address,
	pub local_port: u16,
	pub peer_addr: Address,
	pub peer_port: u16,
}

/// A stream packet the NIC queue could not admit — spec.md §4.6: "request
/// retransmission from the peer". Carries enough to build
/// `EventKind::OnRetransmit` at the call site without `transport` depending
/// on `event`.
pub struct RetransmitRequest {
	pub src_addr: Address,
	pub src_port: u16,
	pub dst_addr: Address,
	pub dst_port: u16,
	pub seq: u32,
}

/// Stand-in for the Address Mailbox Map's `address -> network_id` table
/// (spec.md §3) until a host/topology module owns it; every host is treated
/// as its own network for now, which keeps per-host rate shaping distinct
/// while leaving instantiation of a real multi-host topology to the
/// embedding application.
fn network_of(host: Address) -> u32 {
	host.node_id() as u32
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::oracle::testing::FakeOracles;
	use crate::packet::{Flags, PacketStorage};
	use crate::socket::SockType;

	fn addr(n: u16) -> Address {
		Address::new_raw(0, 0, n)
	}

	#[test]
	fn ready_send_does_not_duplicate_entries() {
		let mut t = TransportManager::new(addr(1));
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Datagram);

		assert!(t.ready_send(s));
		assert!(!t.ready_send(s));
	}

	#[test]
	fn upload_next_drains_a_udp_socket_fifo() {
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Datagram);
		mgr.bind(s, addr(1), 5000).unwrap();
		mgr.get_mut(s).unwrap().udp_send(b"hello", Some((addr(2), 6000))).unwrap();

		let mut t = TransportManager::new(addr(1));
		t.ready_send(s);

		let cfg = FakeOracles::default();
		match t.upload_next(0, &mut mgr, &cfg) {
			UploadOutcome::KeepFiring(sent) | UploadOutcome::ScheduleUploaded { sent, .. } => {
				assert_eq!(sent.len(), 1);
				assert_eq!(sent[0].socket, s);
			}
		}
	}

	#[test]
	fn nic_queue_overflow_requests_retransmit_for_stream_packets() {
		let mut t = TransportManager::new(addr(1));
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Stream);

		let cfg = FakeOracles { config: utils::config::StaticConfig::new().with_int("transport.nic_queue_bytes", 1), ..Default::default() };
		let mut pkt = Packet::data(addr(2), 1, addr(1), 2, 0, 0, 0, Flags::ack_only(), PacketStorage::Local(b"xx".as_slice().into()));
		pkt.data_size = 100;
		let result = t.ready_receive(s, pkt.into_ref(), &cfg);
		assert!(result.is_err());
	}

	#[test]
	fn nic_queue_overflow_silently_drops_datagrams() {
		let mut t = TransportManager::new(addr(1));
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Datagram);

		let cfg = FakeOracles { config: utils::config::StaticConfig::new().with_int("transport.nic_queue_bytes", 1), ..Default::default() };
		let mut pkt = Packet::datagram(addr(2), 1, addr(1), 2, PacketStorage::Local(b"xx".as_slice().into()));
		pkt.data_size = 100;
		let result = t.ready_receive(s, pkt.into_ref(), &cfg);
		assert!(result.is_ok());
	}
}
