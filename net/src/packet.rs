use std::sync::Arc;

use bilge::prelude::*;
use collections::cabinet::SlotHandle;

use crate::address::Address;

/// spec.md §3: "protocol (stream|datagram)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
	Stream,
	Datagram,
}

/// The TCP flag set of spec.md §3: `flags ⊆ {FIN,SYN,RST,ACK,CON}`. `CON` is
/// the simulator's own "connection" control bit (distinct from RFC 793's
/// flag set, which the teacher's `tcp::Control` modelled in full — this spec
/// only needs five).
#[bitsize(8)]
#[derive(FromBits, Clone, Copy, PartialEq, Eq)]
pub struct Flags {
	pub fin: bool,
	pub syn: bool,
	pub rst: bool,
	pub ack: bool,
	pub con: bool,
	reserved: u3,
}

impl Flags {
	pub fn empty() -> Self {
		Flags::new(false, false, false, false, false, u3::new(0))
	}

	pub fn ack_only() -> Self {
		let mut f = Self::empty();
		f.set_ack(true);
		f
	}

	pub fn syn_con() -> Self {
		let mut f = Self::empty();
		f.set_syn(true);
		f.set_con(true);
		f
	}

	pub fn syn_ack_con() -> Self {
		let mut f = Self::empty();
		f.set_syn(true);
		f.set_ack(true);
		f.set_con(true);
		f
	}

	pub fn ack_con() -> Self {
		let mut f = Self::empty();
		f.set_ack(true);
		f.set_con(true);
		f
	}

	pub fn rst() -> Self {
		let mut f = Self::empty();
		f.set_rst(true);
		f
	}
}

/// The stream sub-header of spec.md §3's Packet data model.
#[derive(Debug, Clone, Copy)]
pub struct TcpHeader {
	pub seq: u32,
	pub ack: u32,
	pub adv_wnd: u32,
	pub flags: Flags,
}

/// `enum PacketStorage { Local(Owned), Shared(SlotHandle) }` of spec.md §9:
/// a packet's payload is either confined to one worker (no lock needed) or
/// backed by a [`SlotHandle`] into a shared-memory cabinet for zero-copy
/// cross-worker delivery (lock discipline lives on the handle itself).
#[derive(Clone)]
pub enum PacketStorage {
	Local(Arc<[u8]>),
	Shared(SlotHandle),
}

impl PacketStorage {
	pub fn len(&self) -> usize {
		match self {
			PacketStorage::Local(bytes) => bytes.len(),
			PacketStorage::Shared(slot) => slot.read().len(),
		}
	}

	/// Runs `f` against the payload bytes, taking the slot's read lock for
	/// shared storage (spec.md §5: "before reading fields, acquire read").
	pub fn with_bytes<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
		match self {
			PacketStorage::Local(bytes) => f(bytes),
			PacketStorage::Shared(slot) => f(&slot.read()),
		}
	}
}

/// The reference-counted packet of spec.md §3/§4.2. Immutable after
/// construction; sharing is `Arc` cloning ("scoped retain" in spec.md §9's
/// terms), and the last clone dropped frees the payload — there is no
/// separate manual retain/release pair to get wrong.
#[derive(Clone)]
pub struct Packet {
	pub protocol: Protocol,
	pub src_addr: Address,
	pub src_port: u16,
	pub dst_addr: Address,
	pub dst_port: u16,
	/// Present only for `Protocol::Stream` packets.
	pub tcp: Option<TcpHeader>,
	pub data_size: u32,
	pub payload: Option<PacketStorage>,
}

/// A shared, immutable handle to a [`Packet`] — what travels inside
/// `EventKind::OnPacket` and inside the virtual buffers once a packet has
/// left the send queue and can no longer be mutated.
pub type PacketRef = Arc<Packet>;

impl Packet {
	/// A header-only stream control packet (SYN, ACK, RST, FIN, …) with no
	/// payload — spec.md §4.3: "control packets carry no payload".
	#[allow(clippy::too_many_arguments)]
	pub fn control(src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, seq: u32, ack: u32, adv_wnd: u32, flags: Flags) -> Self {
		Self {
			protocol: Protocol::Stream,
			src_addr,
			src_port,
			dst_addr,
			dst_port,
			tcp: Some(TcpHeader { seq, ack, adv_wnd, flags }),
			data_size: 0,
			payload: None,
		}
	}

	/// A stream data segment carrying `payload`.
	#[allow(clippy::too_many_arguments)]
	pub fn data(src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, seq: u32, ack: u32, adv_wnd: u32, flags: Flags, payload: PacketStorage) -> Self {
		let data_size = payload.len() as u32;
		Self {
			protocol: Protocol::Stream,
			src_addr,
			src_port,
			dst_addr,
			dst_port,
			tcp: Some(TcpHeader { seq, ack, adv_wnd, flags }),
			data_size,
			payload: Some(payload),
		}
	}

	/// A UDP datagram.
	pub fn datagram(src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, payload: PacketStorage) -> Self {
		let data_size = payload.len() as u32;
		Self { protocol: Protocol::Datagram, src_addr, src_port, dst_addr, dst_port, tcp: None, data_size, payload: Some(payload) }
	}

	pub fn is_control(&self) -> bool {
		self.payload.is_none()
	}

	/// Sequence number, used as the key into `vwrite`/`tcp_retransmit`
	/// (§4.3). Datagram packets have no sequence space; this is `0`.
	pub fn seq(&self) -> u32 {
		self.tcp.map_or(0, |h| h.seq)
	}

	pub fn flags(&self) -> Flags {
		self.tcp.map_or(Flags::empty(), |h| h.flags)
	}

	pub fn into_ref(self) -> PacketRef {
		Arc::new(self)
	}
}
