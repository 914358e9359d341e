use utils::config::{flag_or, int_or};
use utils::error::{Result, SimError};

use crate::address::Address;
use crate::oracle::Oracles;
use crate::packet::{Flags, Packet, PacketStorage};
use crate::socket::{Socket, SocketState};

/// Per-stream-socket TCP control block — spec.md §3 "Virtual TCP (per
/// stream socket)".
#[derive(Debug, Clone)]
pub struct TcpPcb {
	pub snd_una: u32,
	pub snd_nxt: u32,
	pub snd_wnd: u32,
	pub snd_wl1: u32,
	pub snd_wl2: u32,
	pub snd_end: u32,

	pub rcv_nxt: u32,
	pub rcv_wnd: u32,
	pub rcv_irs: u32,
	/// Peer's highest byte, set once the peer starts closing (spec.md §4.4).
	pub rcv_end: Option<u32>,

	pub cng_wnd: u32,
	pub cng_threshold: Option<u32>,
	pub is_slow_start: bool,
	pub last_adv_wnd: u32,

	pub dack_scheduled: bool,
	pub dack_requested: bool,

	pub connection_was_reset: bool,
}

impl Default for TcpPcb {
	fn default() -> Self {
		Self {
			snd_una: 0,
			snd_nxt: 0,
			snd_wnd: 1,
			snd_wl1: 0,
			snd_wl2: 0,
			snd_end: 0,
			rcv_nxt: 0,
			rcv_wnd: 1,
			rcv_irs: 0,
			rcv_end: None,
			cng_wnd: 1,
			cng_threshold: None,
			is_slow_start: true,
			last_adv_wnd: 1,
			dack_scheduled: false,
			dack_requested: false,
			connection_was_reset: false,
		}
	}
}

pub const DEFAULT_MSS: i64 = 1460;
pub const DEFAULT_DACK_TIMER_MS: i64 = 10;
pub const LOOPBACK_BUFFER_BYTES: u32 = 16 * 1024 * 1024;

fn mss(cfg: &dyn Oracles) -> u32 {
	int_or(cfg, "tcp.mss", DEFAULT_MSS) as u32
}

pub fn dack_enabled(cfg: &dyn Oracles) -> bool {
	flag_or(cfg, "tcp.delayed_ack", true)
}

pub fn dack_timer_ms(cfg: &dyn Oracles) -> u64 {
	int_or(cfg, "tcp.dack_timer_ms", DEFAULT_DACK_TIMER_MS) as u64
}

/// What the caller owes the peer after a data packet lands — spec.md
/// §4.4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DackAction {
	/// Delayed-ACK is disabled; send a bare ACK now.
	AckNow,
	/// First data packet since the last ack; start the timer.
	ScheduleTimer,
	/// A timer is already running; nothing more to do.
	TimerPending,
}

pub fn autotune_enabled(cfg: &dyn Oracles) -> bool {
	flag_or(cfg, "tcp.autotune", true)
}

pub fn backlog_limit(cfg: &dyn Oracles) -> Option<u32> {
	match int_or(cfg, "tcp.backlog", 0) {
		n if n <= 0 => None,
		n => Some(n as u32),
	}
}

impl Socket {
	fn pcb(&self) -> &TcpPcb {
		self.tcp.as_ref().expect("tcp operation on non-stream socket")
	}

	fn pcb_mut(&mut self) -> &mut TcpPcb {
		self.tcp.as_mut().expect("tcp operation on non-stream socket")
	}

	/// `connect()` in `CLOSED` — spec.md §4.4: send SYN|CON, advance to
	/// `SYN_SENT`.
	pub fn tcp_connect(&mut self) -> Result<Packet> {
		if self.state != SocketState::Closed {
			return Err(SimError::BadState);
		}

		let (local_addr, local_port) = self.local.ok_or(SimError::BadState)?;
		let (peer_addr, peer_port) = self.peer.ok_or(SimError::BadState)?;

		self.state = SocketState::SynSent;
		let seq = self.pcb().snd_nxt;
		self.pcb_mut().snd_nxt += 1;
		self.pcb_mut().snd_end += 1;

		Ok(Packet::control(local_addr, local_port, peer_addr, peer_port, seq, 0, self.pcb().rcv_wnd, Flags::syn_con()))
	}

	/// `send(bytes)` — spec.md §4.4.1. Chops `bytes` into MSS-sized
	/// segments, each bumping `snd_end`/`snd_nxt` by one packet (sequence is
	/// packet-counted per spec.md §9's Open Question resolution). Returns
	/// the number of bytes actually accepted.
	pub fn tcp_send(&mut self, bytes: &[u8], cfg: &dyn Oracles) -> Result<usize> {
		if !matches!(self.state, SocketState::Established | SocketState::CloseWait) {
			return Err(SimError::BadState);
		}

		let (local_addr, local_port) = self.local.ok_or(SimError::BadState)?;
		let (peer_addr, peer_port) = self.peer.ok_or(SimError::PeerClosed)?;

		let segment = mss(cfg) as usize;
		let mut accepted = 0usize;

		for chunk in bytes.chunks(segment) {
			let rcv_nxt = self.pcb().rcv_nxt;
			let rcv_wnd = self.pcb().rcv_wnd;
			let seq = self.pcb().snd_nxt;

			let pkt = Packet::data(local_addr, local_port, peer_addr, peer_port, seq, rcv_nxt, rcv_wnd, Flags::ack_only(), PacketStorage::Local(chunk.into()));

			if self.vb.add_send(pkt, seq).is_err() {
				break;
			}

			self.pcb_mut().snd_nxt += 1;
			self.pcb_mut().snd_end += 1;
			accepted += chunk.len();
		}

		Ok(accepted)
	}

	/// Wire selection, called by the transport rate shaper — spec.md
	/// §4.4.2. Priority: control queue first, then the send window. A
	/// packet pulled from the send window moves into `tcp_retransmit` until
	/// acknowledged; control packets (ACK, SYN, FIN…) are not held, matching
	/// spec.md §3's `tcp_retransmit` being paired with `vwrite`, not
	/// `tcp_control`.
	pub fn tcp_select_wire(&mut self) -> Option<Packet> {
		if let Some(pkt) = self.vb.remove_tcp_control() {
			return Some((*pkt).clone());
		}

		let window_edge = self.pcb().snd_una.saturating_add(self.pcb().snd_wnd);
		let pkt = self.vb.remove_send(window_edge)?;
		let pkt = self.stamp_outgoing(pkt);
		self.tcp_hold_for_ack(pkt.clone());
		Some(pkt)
	}

	fn stamp_outgoing(&mut self, mut pkt: Packet) -> Packet {
		if let Some(header) = pkt.tcp.as_mut() {
			header.adv_wnd = self.pcb().rcv_wnd;
			if header.flags.ack() {
				header.ack = self.pcb().rcv_nxt;
				self.pcb_mut().dack_requested = false;
			}
		}
		pkt
	}

	/// Holds a just-selected packet in `tcp_retransmit` until acknowledged
	/// (spec.md §4.4.2's final step).
	pub fn tcp_hold_for_ack(&mut self, pkt: Packet) {
		let key = pkt.seq();
		self.vb.add_retransmit(pkt.into_ref(), key);
	}

	/// `LISTEN` receiving SYN|CON — spec.md §4.4: demultiplex into a new
	/// child under the parent server (handled by the socket manager; this
	/// builds the child's initial PCB and reply packet).
	pub fn tcp_accept_syn(local_addr: Address, local_port: u16, peer_addr: Address, peer_port: u16, peer_seq: u32, rcv_wnd: u32) -> (TcpPcb, Packet) {
		let mut pcb = TcpPcb { rcv_irs: peer_seq, rcv_nxt: peer_seq + 1, rcv_wnd, ..Default::default() };
		let seq = pcb.snd_nxt;
		pcb.snd_nxt += 1;
		pcb.snd_end += 1;

		let reply = Packet::control(local_addr, local_port, peer_addr, peer_port, seq, pcb.rcv_nxt, pcb.rcv_wnd, Flags::syn_ack_con());
		(pcb, reply)
	}

	/// `SYN_SENT` receiving SYN|CON|ACK with `ack ∈ (ISS, snd_nxt]` — advance
	/// to `ESTABLISHED` and send ACK|CON. Returns the ACK to send.
	pub fn tcp_complete_handshake_initiator(&mut self, peer_seq: u32, peer_ack: u32) -> Result<Packet> {
		if self.state != SocketState::SynSent {
			return Err(SimError::BadState);
		}

		if !(self.pcb().snd_una < peer_ack && peer_ack <= self.pcb().snd_nxt) {
			return Err(SimError::OutOfWindow);
		}

		self.pcb_mut().snd_una = peer_ack;
		self.pcb_mut().rcv_irs = peer_seq;
		self.pcb_mut().rcv_nxt = peer_seq + 1;
		self.state = SocketState::Established;

		let (local_addr, local_port) = self.local.unwrap();
		let (peer_addr, peer_port) = self.peer.unwrap();
		let seq = self.pcb().snd_nxt;
		let rcv_nxt = self.pcb().rcv_nxt;
		let rcv_wnd = self.pcb().rcv_wnd;

		Ok(Packet::control(local_addr, local_port, peer_addr, peer_port, seq, rcv_nxt, rcv_wnd, Flags::ack_con()))
	}

	/// `SYN_RCVD` receiving ACK|CON with `ack ∈ (ISS, snd_nxt]` — advance to
	/// `ESTABLISHED`.
	pub fn tcp_complete_handshake_child(&mut self, peer_ack: u32) -> Result<()> {
		if self.state != SocketState::SynRcvd {
			return Err(SimError::BadState);
		}

		if !(self.pcb().snd_una < peer_ack && peer_ack <= self.pcb().snd_nxt) {
			return Err(SimError::OutOfWindow);
		}

		self.pcb_mut().snd_una = peer_ack;
		self.state = SocketState::Established;
		Ok(())
	}

	/// Reception and congestion control on a pure ACK in the receive window
	/// — spec.md §4.4.3. Returns the number of newly-acked packets.
	pub fn tcp_on_ack(&mut self, seq: u32, ack: u32, adv_wnd: u32) -> u32 {
		let (una, nxt) = (self.pcb().snd_una, self.pcb().snd_nxt);
		if !(una < ack && ack <= nxt) {
			return 0;
		}

		let newly_acked = self.vb.clear_tcp_retransmit(true, ack);
		self.pcb_mut().snd_una = ack;

		let wl1 = self.pcb().snd_wl1;
		let wl2 = self.pcb().snd_wl2;
		if wl1 < seq || (wl1 == seq && wl2 <= ack) {
			self.pcb_mut().last_adv_wnd = adv_wnd;
			self.pcb_mut().snd_wl1 = seq;
			self.pcb_mut().snd_wl2 = ack;
		}

		if newly_acked > 0 {
			self.congestion_on_ack(newly_acked);
		}

		self.update_snd_wnd();
		newly_acked
	}

	fn congestion_on_ack(&mut self, n: u32) {
		let pcb = self.pcb_mut();
		if pcb.is_slow_start {
			pcb.cng_wnd += n;
			if let Some(threshold) = pcb.cng_threshold {
				if pcb.cng_wnd >= threshold {
					pcb.is_slow_start = false;
				}
			}
		} else {
			let wnd = pcb.cng_wnd.max(1);
			pcb.cng_wnd += (n * n) / wnd;
		}
	}

	/// On a retransmit trigger — spec.md §4.4.3/§4.4.6: halve the congestion
	/// window, set the threshold on the first retransmit, and leave
	/// slow-start via fast-retransmit.
	pub fn congestion_on_retransmit(&mut self) {
		let pcb = self.pcb_mut();
		if pcb.is_slow_start && pcb.cng_threshold.is_none() {
			pcb.cng_threshold = Some(pcb.cng_wnd);
		}
		pcb.is_slow_start = false;
		pcb.cng_wnd = (pcb.cng_wnd / 2).max(1);
		self.update_snd_wnd();
	}

	fn update_snd_wnd(&mut self) {
		let pcb = self.pcb_mut();
		pcb.snd_wnd = pcb.last_adv_wnd.min(pcb.cng_wnd).max(1);
	}

	/// `rcv_wnd := max(1, min(u32::MAX, receive_space_available / MSS))` —
	/// spec.md §4.4.8. Called after a data packet lands so the window
	/// advertised on the next outgoing ACK reflects current receive-buffer
	/// occupancy.
	pub fn tcp_update_rcv_wnd(&mut self, cfg: &dyn Oracles) {
		let space = self.vb.recv_space_available();
		let segment = mss(cfg).max(1);
		let wnd = (space / segment).clamp(1, u32::MAX);
		self.pcb_mut().rcv_wnd = wnd;
	}

	/// Data processing — spec.md §4.4.4. `seq = rcv_nxt`: enqueue into
	/// `vread`, advance `rcv_nxt`, drain any now-contiguous out-of-order
	/// entries. Otherwise, buffer as out-of-order (or request retransmit if
	/// there's no room).
	pub fn tcp_process_data(&mut self, pkt: crate::packet::PacketRef) -> Result<()> {
		if !matches!(self.state, SocketState::Established | SocketState::CloseWait) {
			return Err(SimError::BadState);
		}

		let seq = pkt.seq();
		if seq == self.pcb().rcv_nxt {
			self.vb.add_read(pkt);
			self.pcb_mut().rcv_nxt += 1;

			while let Some(next) = self.vb.remove_tcp_unprocessed(self.pcb().rcv_nxt) {
				self.vb.add_read(next);
				self.pcb_mut().rcv_nxt += 1;
			}

			Ok(())
		} else {
			self.vb.add_receive(pkt, seq)
		}
	}

	/// `ESTABLISHED` packet whose sequence falls outside `[rcv_nxt, rcv_nxt +
	/// rcv_wnd)` — spec.md §4.4: drop, and if it carries data or is in the
	/// future, request retransmission.
	pub fn tcp_in_receive_window(&self, seq: u32) -> bool {
		let lo = self.pcb().rcv_nxt;
		let hi = lo.wrapping_add(self.pcb().rcv_wnd);
		if hi >= lo {
			seq >= lo && seq < hi
		} else {
			seq >= lo || seq < hi
		}
	}

	/// What a socket's caller must do after `tcp_dack_on_receive` — spec.md
	/// §4.4.5: either ack immediately (delayed-ACK disabled), start the
	/// timer (this is the first data packet since the last ack), or do
	/// nothing (a timer is already running).
	pub fn tcp_build_ack(&self) -> Option<Packet> {
		let (local_addr, local_port) = self.local?;
		let (peer_addr, peer_port) = self.peer?;
		let seq = self.pcb().snd_nxt;
		let ack = self.pcb().rcv_nxt;
		let wnd = self.pcb().rcv_wnd;
		Some(Packet::control(local_addr, local_port, peer_addr, peer_port, seq, ack, wnd, Flags::ack_only()))
	}

	/// Delayed-ACK bookkeeping on receiving data — spec.md §4.4.5.
	pub fn tcp_dack_on_receive(&mut self, cfg: &dyn Oracles) -> DackAction {
		if !dack_enabled(cfg) {
			return DackAction::AckNow;
		}

		self.pcb_mut().dack_requested = true;
		if !self.pcb().dack_scheduled {
			self.pcb_mut().dack_scheduled = true;
			return DackAction::ScheduleTimer;
		}

		DackAction::TimerPending
	}

	/// Delayed-ACK timer fire — spec.md §4.4.5: if still requested, send a
	/// bare ACK; always clear `scheduled`.
	pub fn tcp_dack_fire(&mut self) -> Option<Packet> {
		let requested = self.pcb().dack_requested;
		self.pcb_mut().dack_scheduled = false;

		if !requested {
			return None;
		}

		self.pcb_mut().dack_requested = false;
		self.tcp_build_ack()
	}

	/// Retransmit event for `key` — spec.md §4.4.6. No-op if the key was
	/// already acked; otherwise shrinks the congestion window and re-sends.
	pub fn tcp_on_retransmit(&mut self, key: u32) -> Option<Packet> {
		if !self.vb.retransmit_contains(key) {
			return None;
		}

		self.congestion_on_retransmit();
		let pkt = self.vb.remove_retransmit(key)?;
		Some((*pkt).clone())
	}

	/// Re-queues a packet pulled off the retransmit map for another trip
	/// through wire selection.
	pub fn tcp_requeue(&mut self, pkt: Packet) {
		if pkt.is_control() {
			self.vb.add_control(pkt.into_ref());
		} else {
			let key = pkt.seq();
			let _ = self.vb.add_send(pkt, key);
		}
	}

	/// `guest_close()` while connected — spec.md §4.4: transition to
	/// `CLOSING`. Returns `snd_end` for the peer-facing close event.
	pub fn tcp_guest_close(&mut self) -> Result<u32> {
		if !matches!(self.state, SocketState::Established | SocketState::CloseWait) {
			return Err(SimError::BadState);
		}

		self.prev_state = self.state;
		self.state = SocketState::Closing;
		Ok(self.pcb().snd_end)
	}

	/// Close event received from the peer — spec.md §4.4. Returns `true` if
	/// this socket should now be destroyed (we were the initiator and the
	/// peer has acknowledged the drain).
	pub fn tcp_on_close_event(&mut self, peer_rcv_end: u32) -> bool {
		if self.state == SocketState::Closing {
			true
		} else {
			self.prev_state = self.state;
			self.state = SocketState::CloseWait;
			self.pcb_mut().rcv_end = Some(peer_rcv_end);
			self.vb.clear_tcp_retransmit(false, 0);
			false
		}
	}

	/// `CLOSE_WAIT` drain check — spec.md §4.4 scenario 3: once `rcv_nxt`
	/// reaches the peer's announced `rcv_end`, every byte the peer promised
	/// has arrived and a close-ack (`rcv_end = 0`) goes back. Clears
	/// `rcv_end` so a later stray data packet can't fire this twice.
	pub fn tcp_drain_complete(&mut self) -> bool {
		if self.state != SocketState::CloseWait {
			return false;
		}

		let Some(end) = self.pcb().rcv_end else { return false };
		if self.pcb().rcv_nxt < end {
			return false;
		}

		self.pcb_mut().rcv_end = None;
		true
	}

	/// Any-state RST handling — spec.md §4.4.
	pub fn tcp_on_reset(&mut self) {
		self.pcb_mut().connection_was_reset = true;
		if self.state == SocketState::SynSent {
			self.delete_when_drained = true;
		} else {
			self.delete_when_drained = self.vb.num_packets() == 0;
		}
	}

	/// Autotune on entering `ESTABLISHED` for non-loopback — spec.md
	/// §4.4.7. Returns `(send_max, recv_max)` in bytes.
	pub fn tcp_autotune(local: Address, peer: Address, rtt_ms: u64, peer_down_kbps: u64, peer_up_kbps: u64, cfg: &dyn Oracles) -> (u32, u32) {
		if !autotune_enabled(cfg) {
			return (0, 0);
		}

		if local.is_loopback() || peer.is_loopback() {
			return (LOOPBACK_BUFFER_BYTES, LOOPBACK_BUFFER_BYTES);
		}

		let bdp = |bw_kbps: u64| -> u32 { ((rtt_ms as f64 / 1000.0) * (bw_kbps as f64 * 1024.0) * 1.25) as u32 };

		(bdp(peer_up_kbps), bdp(peer_down_kbps))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::oracle::testing::FakeOracles;
	use crate::socket::{SockType, Socket};

	fn addr(n: u16) -> Address {
		Address::new_raw(0, 0, n)
	}

	fn connected_pair() -> (Socket, Socket) {
		let mut a = Socket::new(SockType::Stream, 1);
		a.local = Some((addr(1), 30000));
		a.peer = Some((addr(2), 30001));
		a.state = SocketState::Established;

		let mut b = Socket::new(SockType::Stream, 2);
		b.local = Some((addr(2), 30001));
		b.peer = Some((addr(1), 30000));
		b.state = SocketState::Established;

		(a, b)
	}

	#[test]
	fn handshake_completes_and_establishes() {
		let mut client = Socket::new(SockType::Stream, 1);
		client.local = Some((addr(1), 30000));
		client.peer = Some((addr(2), 30001));

		let syn = client.tcp_connect().unwrap();
		assert!(syn.flags().syn());
		assert_eq!(client.state, SocketState::SynSent);

		let (mut child_pcb, synack) = Socket::tcp_accept_syn(addr(2), 30001, addr(1), 30000, syn.seq(), 64);
		assert!(synack.flags().syn() && synack.flags().ack());
		child_pcb.snd_una = 0;

		let ack = client.tcp_complete_handshake_initiator(synack.seq(), synack.tcp.unwrap().ack).unwrap();
		assert!(ack.flags().ack());
		assert_eq!(client.state, SocketState::Established);
	}

	#[test]
	fn slow_start_then_congestion_avoidance() {
		let (mut a, _b) = connected_pair();
		a.pcb_mut().cng_wnd = 1;
		a.pcb_mut().snd_nxt = 5;
		a.vb.add_retransmit(Packet::control(addr(1), 1, addr(2), 2, 0, 0, 0, Flags::ack_only()).into_ref(), 0);

		let acked = a.tcp_on_ack(0, 1, 64);
		assert_eq!(acked, 1);
		assert_eq!(a.pcb().cng_wnd, 2);
		assert!(a.pcb().is_slow_start);
	}

	#[test]
	fn retransmit_halves_window_and_sets_threshold() {
		let (mut a, _b) = connected_pair();
		a.pcb_mut().cng_wnd = 8;
		a.pcb_mut().snd_nxt = 1;
		a.vb.add_retransmit(Packet::control(addr(1), 1, addr(2), 2, 0, 0, 0, Flags::ack_only()).into_ref(), 0);

		let resend = a.tcp_on_retransmit(0);
		assert!(resend.is_some());
		assert_eq!(a.pcb().cng_wnd, 4);
		assert_eq!(a.pcb().cng_threshold, Some(8));
		assert!(!a.pcb().is_slow_start);

		assert!(a.tcp_on_retransmit(0).is_none());
	}

	#[test]
	fn out_of_order_then_in_order_reassembly() {
		let (_a, mut b) = connected_pair();

		let p2 = Packet::control(addr(1), 1, addr(2), 2, 2, 0, 0, Flags::ack_only()).into_ref();
		b.tcp_process_data(p2).unwrap();
		assert_eq!(b.pcb().rcv_nxt, 0);

		let p1 = Packet::control(addr(1), 1, addr(2), 2, 1, 0, 0, Flags::ack_only()).into_ref();
		b.tcp_process_data(p1).unwrap();
		assert_eq!(b.pcb().rcv_nxt, 0);

		let p0 = Packet::control(addr(1), 1, addr(2), 2, 0, 0, 0, Flags::ack_only()).into_ref();
		b.tcp_process_data(p0).unwrap();
		assert_eq!(b.pcb().rcv_nxt, 3);
	}

	#[test]
	fn rcv_wnd_shrinks_as_receive_buffer_fills_and_recovers_on_drain() {
		let (_a, mut b) = connected_pair();
		b.vb.set_recv_max_size(2 * DEFAULT_MSS as u32);
		let cfg = FakeOracles::default();

		b.tcp_update_rcv_wnd(&cfg);
		assert_eq!(b.pcb().rcv_wnd, 2);

		let mut pkt = Packet::control(addr(1), 1, addr(2), 2, 0, 0, 0, Flags::ack_only());
		pkt.data_size = DEFAULT_MSS as u32;
		b.vb.add_read(pkt.into_ref());
		b.tcp_update_rcv_wnd(&cfg);
		assert_eq!(b.pcb().rcv_wnd, 1);

		b.vb.remove_read();
		b.tcp_update_rcv_wnd(&cfg);
		assert_eq!(b.pcb().rcv_wnd, 2);
	}

	#[test]
	fn autotune_loopback_is_fixed_16_mib() {
		let cfg = FakeOracles::default();
		let (send, recv) = Socket::tcp_autotune(crate::address::LOOPBACK, crate::address::LOOPBACK, 10, 1000, 1000, &cfg);
		assert_eq!(send, LOOPBACK_BUFFER_BYTES);
		assert_eq!(recv, LOOPBACK_BUFFER_BYTES);
	}

	#[test]
	fn autotune_matches_bandwidth_delay_product() {
		let cfg = FakeOracles::default();
		let (send, recv) = Socket::tcp_autotune(addr(1), addr(2), 10, 1024, 1024, &cfg);
		assert_eq!(send, 13_107);
		assert_eq!(recv, 13_107);
	}

	#[test]
	fn autotune_noop_when_disabled() {
		let cfg = FakeOracles { config: utils::config::StaticConfig::new().with_int("tcp.autotune", 0), ..Default::default() };
		let (send, recv) = Socket::tcp_autotune(addr(1), addr(2), 10, 1024, 1024, &cfg);
		assert_eq!((send, recv), (0, 0));
	}
}
