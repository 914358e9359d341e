use std::collections::{BTreeMap, VecDeque};

use utils::error::{Result, SimError};

use crate::epoll::Epoll;
use crate::packet::{Packet, PacketRef};

/// The per-socket send/receive buffer of spec.md §3/§4.3, paired with an
/// [`Epoll`] object that every mutating call refreshes.
///
/// Datagram sockets use only `vwrite` (FIFO, keyed by a monotonic counter
/// rather than a TCP sequence number) and `vread`; the `tcp_*` maps stay
/// empty for them, matching spec.md §4.3's "For datagram sockets, `tcp_*`
/// maps are absent".
pub struct VirtualBuffer {
	max_size: u32,
	current_size: u32,
	num_packets: u32,

	/// Receive-side occupancy, separate from the send-side pair above — §3's
	/// "Receive side ... Counters: current byte size, packet count, max byte
	/// size". Spans both `tcp_unprocessed` (out-of-order) and `vread`
	/// (in-order, not yet consumed by the guest): a packet's size is added
	/// once when it first lands in either bucket and removed once when it
	/// leaves `vread` via `remove_read`, with the `tcp_unprocessed` ->
	/// `vread` transition (`remove_tcp_unprocessed` then `add_read`) netting
	/// to zero so it's never double-counted.
	recv_max_size: u32,
	recv_current_size: u32,

	vwrite: BTreeMap<u32, Packet>,
	tcp_control: VecDeque<PacketRef>,
	tcp_retransmit: BTreeMap<u32, PacketRef>,

	vread: VecDeque<(PacketRef, u32)>,
	tcp_unprocessed: BTreeMap<u32, PacketRef>,

	epoll: Epoll,
	next_fifo_key: u32,
}

impl VirtualBuffer {
	pub fn new(max_size: u32) -> Self {
		Self {
			max_size,
			current_size: 0,
			num_packets: 0,
			recv_max_size: max_size,
			recv_current_size: 0,
			vwrite: BTreeMap::new(),
			tcp_control: VecDeque::new(),
			tcp_retransmit: BTreeMap::new(),
			vread: VecDeque::new(),
			tcp_unprocessed: BTreeMap::new(),
			epoll: Epoll::new(),
			next_fifo_key: 0,
		}
	}

	pub fn epoll(&self) -> Epoll {
		self.epoll
	}

	pub fn current_size(&self) -> u32 {
		self.current_size
	}

	pub fn max_size(&self) -> u32 {
		self.max_size
	}

	pub fn set_max_size(&mut self, max_size: u32) {
		self.max_size = max_size;
	}

	pub fn send_space_available(&self) -> u32 {
		self.max_size.saturating_sub(self.current_size)
	}

	pub fn recv_current_size(&self) -> u32 {
		self.recv_current_size
	}

	pub fn recv_max_size(&self) -> u32 {
		self.recv_max_size
	}

	pub fn set_recv_max_size(&mut self, max_size: u32) {
		self.recv_max_size = max_size;
	}

	pub fn recv_space_available(&self) -> u32 {
		self.recv_max_size.saturating_sub(self.recv_current_size)
	}

	pub fn num_packets(&self) -> u32 {
		self.num_packets
	}

	/// Total of every bucket's packet count — the invariant of spec.md §8:
	/// `num_packets = |vread| + |vwrite| + |tcp_retransmit| + |tcp_control| +
	/// |tcp_unprocessed|`.
	#[cfg(test)]
	fn counted_packets(&self) -> u32 {
		(self.vread.len() + self.vwrite.len() + self.tcp_retransmit.len() + self.tcp_control.len() + self.tcp_unprocessed.len()) as u32
	}

	fn refresh_epoll(&mut self) {
		self.epoll.set_readable(!self.vread.is_empty());
		self.epoll.set_writable(self.send_space_available() > 0);
	}

	/// `add_send(pkt, key)` — spec.md §4.3. Rejects if `pkt.data_size` would
	/// push `current_size` past `max_size`.
	pub fn add_send(&mut self, pkt: Packet, key: u32) -> Result<()> {
		if pkt.data_size > self.send_space_available() {
			return Err(SimError::OutOfBuffer);
		}

		self.current_size += pkt.data_size;
		self.num_packets += 1;
		self.vwrite.insert(key, pkt);
		self.refresh_epoll();
		Ok(())
	}

	/// FIFO variant for datagram sockets: always succeeds by spec.md's rule
	/// that datagram buffers admit in FIFO order without a sequence key.
	pub fn add_send_fifo(&mut self, pkt: Packet) -> Result<()> {
		let key = self.next_fifo_key;
		self.next_fifo_key = self.next_fifo_key.wrapping_add(1);
		self.add_send(pkt, key)
	}

	pub fn add_control(&mut self, pkt: PacketRef) {
		self.num_packets += 1;
		self.tcp_control.push_back(pkt);
		self.refresh_epoll();
	}

	pub fn add_retransmit(&mut self, pkt: PacketRef, key: u32) {
		self.tcp_retransmit.insert(key, pkt);
	}

	/// `get_send()` — smallest-key entry in `vwrite` whose key is within the
	/// current window (`key <= snd_una + snd_wnd`).
	pub fn get_send(&self, window_edge: u32) -> Option<&Packet> {
		self.vwrite.range(..=window_edge).next().map(|(_, pkt)| pkt)
	}

	/// `remove_send(max_key)` — pops the smallest-key entry iff it's within
	/// `max_key`.
	pub fn remove_send(&mut self, max_key: u32) -> Option<Packet> {
		let key = *self.vwrite.range(..=max_key).next()?.0;
		let pkt = self.vwrite.remove(&key)?;
		self.current_size = self.current_size.saturating_sub(pkt.data_size);
		self.num_packets -= 1;
		self.refresh_epoll();
		Some(pkt)
	}

	pub fn remove_tcp_control(&mut self) -> Option<PacketRef> {
		let pkt = self.tcp_control.pop_front()?;
		self.num_packets -= 1;
		self.refresh_epoll();
		Some(pkt)
	}

	pub fn has_control(&self) -> bool {
		!self.tcp_control.is_empty()
	}

	/// `clear_tcp_retransmit(only_acked, acknum)` — spec.md §4.3/§4.4.3.
	/// Removes every entry whose key is `< acknum` (or every entry,
	/// unconditionally, when `only_acked` is false), releasing each.
	/// Returns the count removed (used to drive the congestion-window
	/// update of §4.4.3).
	pub fn clear_tcp_retransmit(&mut self, only_acked: bool, acknum: u32) -> u32 {
		let keys: Vec<u32> = if only_acked {
			self.tcp_retransmit.range(..acknum).map(|(&k, _)| k).collect()
		} else {
			self.tcp_retransmit.keys().copied().collect()
		};

		for key in &keys {
			self.tcp_retransmit.remove(key);
		}

		keys.len() as u32
	}

	pub fn retransmit_contains(&self, key: u32) -> bool {
		self.tcp_retransmit.contains_key(&key)
	}

	pub fn remove_retransmit(&mut self, key: u32) -> Option<PacketRef> {
		self.tcp_retransmit.remove(&key)
	}

	/// `add_receive(pkt)` — out-of-order stream arrival, keyed by sequence.
	/// Charged against the receive-side budget, not the send-side one.
	pub fn add_receive(&mut self, pkt: PacketRef, key: u32) -> Result<()> {
		if pkt.data_size > self.recv_space_available() {
			return Err(SimError::OutOfBuffer);
		}

		self.recv_current_size += pkt.data_size;
		self.num_packets += 1;
		self.tcp_unprocessed.insert(key, pkt);
		self.refresh_epoll();
		Ok(())
	}

	pub fn get_tcp_unprocessed(&self, next_seq: u32) -> Option<&PacketRef> {
		let (&key, pkt) = self.tcp_unprocessed.iter().next()?;
		(key == next_seq).then_some(pkt)
	}

	pub fn remove_tcp_unprocessed(&mut self, next_seq: u32) -> Option<PacketRef> {
		let &key = self.tcp_unprocessed.keys().next()?;
		if key != next_seq {
			return None;
		}

		let pkt = self.tcp_unprocessed.remove(&key)?;
		self.recv_current_size = self.recv_current_size.saturating_sub(pkt.data_size);
		self.num_packets -= 1;
		Some(pkt)
	}

	/// `add_read(pkt)` — appends to `vread`. Counts against the receive-side
	/// budget: a packet delivered straight here (in-order, never buffered in
	/// `tcp_unprocessed`) is charged for the first time; one handed over from
	/// `remove_tcp_unprocessed` was already charged there, so the charge here
	/// just replaces it, netting to zero across the move.
	pub fn add_read(&mut self, pkt: PacketRef) {
		self.num_packets += 1;
		self.recv_current_size += pkt.data_size;
		self.vread.push_back((pkt, 0));
		self.refresh_epoll();
	}

	/// `get_read(&offset_out)` — head of `vread` plus its byte-offset cursor.
	pub fn get_read(&self, offset_out: &mut u32) -> Option<&PacketRef> {
		let (pkt, offset) = self.vread.front()?;
		*offset_out = *offset;
		Some(pkt)
	}

	/// Advances the head packet's read cursor by `n` bytes, for partial
	/// reads that don't consume the whole packet.
	pub fn advance_read_offset(&mut self, n: u32) {
		if let Some((_, offset)) = self.vread.front_mut() {
			*offset += n;
		}
	}

	pub fn remove_read(&mut self) -> Option<PacketRef> {
		let (pkt, _) = self.vread.pop_front()?;
		self.recv_current_size = self.recv_current_size.saturating_sub(pkt.data_size);
		self.num_packets -= 1;
		self.refresh_epoll();
		Some(pkt)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;
	use crate::address::Address;
	use crate::packet::Flags;

	fn addr() -> Address {
		Address::new_raw(0, 0, 1)
	}

	fn ctrl_pkt(seq: u32) -> Packet {
		Packet::control(addr(), 1, addr(), 2, seq, 0, 0, Flags::ack_only())
	}

	fn data_pkt(seq: u32, size: u32) -> Packet {
		let mut pkt = ctrl_pkt(seq);
		pkt.data_size = size;
		pkt
	}

	#[test]
	fn rejects_send_over_capacity() {
		let mut buf = VirtualBuffer::new(10);
		let mut pkt = ctrl_pkt(0);
		pkt.data_size = 11;
		assert!(matches!(buf.add_send(pkt, 0), Err(SimError::OutOfBuffer)));

		let mut pkt = ctrl_pkt(0);
		pkt.data_size = 10;
		assert!(buf.add_send(pkt, 0).is_ok());
	}

	#[test]
	fn get_send_returns_smallest_key_in_window() {
		let mut buf = VirtualBuffer::new(1000);
		buf.add_send(ctrl_pkt(5), 5).unwrap();
		buf.add_send(ctrl_pkt(10), 10).unwrap();

		assert!(buf.get_send(4).is_none());
		assert_eq!(buf.get_send(5).unwrap().seq(), 5);
		assert_eq!(buf.get_send(100).unwrap().seq(), 5);
	}

	#[test]
	fn remove_send_pops_smallest_within_bound() {
		let mut buf = VirtualBuffer::new(1000);
		buf.add_send(ctrl_pkt(5), 5).unwrap();
		assert!(buf.remove_send(4).is_none());
		assert_eq!(buf.remove_send(5).unwrap().seq(), 5);
		assert!(buf.vwrite.is_empty());
	}

	#[test]
	fn clear_retransmit_only_below_ack() {
		let mut buf = VirtualBuffer::new(1000);
		let p = Arc::new(ctrl_pkt(0));
		buf.add_retransmit(p.clone(), 0);
		buf.add_retransmit(p.clone(), 5);
		buf.add_retransmit(p, 10);

		let n = buf.clear_tcp_retransmit(true, 6);
		assert_eq!(n, 2);
		assert!(!buf.retransmit_contains(0));
		assert!(!buf.retransmit_contains(5));
		assert!(buf.retransmit_contains(10));
	}

	#[test]
	fn clear_retransmit_unconditional_clears_all() {
		let mut buf = VirtualBuffer::new(1000);
		let p = Arc::new(ctrl_pkt(0));
		buf.add_retransmit(p.clone(), 0);
		buf.add_retransmit(p, 10);
		assert_eq!(buf.clear_tcp_retransmit(false, 0), 2);
	}

	#[test]
	fn epoll_readable_tracks_vread() {
		let mut buf = VirtualBuffer::new(1000);
		assert!(!buf.epoll().is_readable());
		buf.add_read(Arc::new(ctrl_pkt(0)));
		assert!(buf.epoll().is_readable());
		buf.remove_read();
		assert!(!buf.epoll().is_readable());
	}

	#[test]
	fn out_of_order_then_in_order_drain() {
		let mut buf = VirtualBuffer::new(1000);
		buf.add_receive(Arc::new(ctrl_pkt(2)), 2).unwrap();
		assert!(buf.get_tcp_unprocessed(0).is_none());

		buf.add_receive(Arc::new(ctrl_pkt(0)), 0).unwrap();
		assert!(buf.get_tcp_unprocessed(0).is_some());
		assert_eq!(buf.remove_tcp_unprocessed(0).unwrap().seq(), 0);
		assert!(buf.remove_tcp_unprocessed(2).is_none());
	}

	#[test]
	fn recv_occupancy_tracks_in_order_delivery() {
		let mut buf = VirtualBuffer::new(1000);
		buf.set_recv_max_size(100);

		buf.add_read(Arc::new(data_pkt(0, 40)));
		assert_eq!(buf.recv_current_size(), 40);
		assert_eq!(buf.recv_space_available(), 60);

		buf.remove_read();
		assert_eq!(buf.recv_current_size(), 0);
		assert_eq!(buf.recv_space_available(), 100);
	}

	#[test]
	fn recv_occupancy_nets_to_zero_across_reorder_then_drain() {
		let mut buf = VirtualBuffer::new(1000);
		buf.set_recv_max_size(100);

		buf.add_receive(Arc::new(data_pkt(1, 30)), 1).unwrap();
		assert_eq!(buf.recv_current_size(), 30);

		let pkt = buf.remove_tcp_unprocessed(1).unwrap();
		buf.add_read(pkt);
		assert_eq!(buf.recv_current_size(), 30, "moving unprocessed -> read must not double-charge");

		buf.remove_read();
		assert_eq!(buf.recv_current_size(), 0);
	}

	#[test]
	fn add_receive_rejects_over_recv_capacity() {
		let mut buf = VirtualBuffer::new(1000);
		buf.set_recv_max_size(10);
		assert!(matches!(buf.add_receive(Arc::new(data_pkt(0, 11)), 0), Err(SimError::OutOfBuffer)));
		assert!(buf.add_receive(Arc::new(data_pkt(0, 10)), 0).is_ok());
	}

	#[test]
	fn num_packets_matches_sum_of_buckets() {
		let mut buf = VirtualBuffer::new(1000);
		buf.add_send(ctrl_pkt(0), 0).unwrap();
		buf.add_control(Arc::new(ctrl_pkt(1)));
		buf.add_read(Arc::new(ctrl_pkt(2)));
		assert_eq!(buf.num_packets(), buf.counted_packets());
	}
}
