use utils::error::{Result, SimError};

use crate::address::Address;
use crate::packet::{Packet, PacketRef, PacketStorage};
use crate::socket::{Socket, SockType};

/// Virtual UDP — spec.md §4.5. No state machine, no retransmission, no
/// reordering guarantees beyond FIFO: the socket's `state` stays `Udp` for
/// its whole life (spec.md §3).
impl Socket {
	/// `send(payload, to)` — builds a datagram and FIFO-enqueues it into
	/// `vwrite`. `to` overrides `self.peer` for an unconnected socket; a
	/// connected datagram socket ignores `to` and always sends to `peer`.
	pub fn udp_send(&mut self, payload: &[u8], to: Option<(Address, u16)>) -> Result<usize> {
		if self.kind != SockType::Datagram {
			return Err(SimError::ProtocolMismatch);
		}

		let (local_addr, local_port) = self.local.ok_or(SimError::BadState)?;
		let (dst_addr, dst_port) = self.peer.or(to).ok_or(SimError::NoRoute)?;

		let pkt = Packet::datagram(local_addr, local_port, dst_addr, dst_port, PacketStorage::Local(payload.into()));
		let size = pkt.data_size as usize;
		self.vb.add_send_fifo(pkt)?;
		Ok(size)
	}

	/// Wire selection for a datagram socket — spec.md §4.5/§4.6: oldest
	/// enqueued packet, FIFO, no window or retransmit bookkeeping.
	pub fn udp_select_wire(&mut self) -> Option<Packet> {
		self.vb.remove_send(u32::MAX)
	}

	/// Inbound admission — spec.md §4.5: append straight to `vread`, no
	/// sequencing.
	pub fn udp_deliver(&mut self, pkt: PacketRef) {
		self.vb.add_read(pkt);
	}

	/// `recv(from_out)` — pops the oldest datagram, reporting its source.
	pub fn udp_recv(&mut self, from_out: &mut Option<(Address, u16)>) -> Result<PacketRef> {
		let pkt = self.vb.remove_read().ok_or(SimError::OutOfBuffer)?;
		*from_out = Some((pkt.src_addr, pkt.src_port));
		Ok(pkt)
	}
}
