use runtime::SimTime;

use crate::address::Address;
use crate::packet::PacketRef;
use crate::socket::SockId;

/// The tagged event payload of spec.md §9's design note, replacing a
/// void-pointer-plus-code pattern with a sum type dispatched on the variant
/// tag — "no virtual table is needed". Each variant carries exactly the
/// fields its handler needs (spec.md §4.8).
pub enum EventKind {
	OnPacket(PacketRef),
	OnNotify { sockd: SockId },
	OnPoll { sockd: SockId },
	OnDack { sockd: SockId },
	OnUploaded,
	OnDownloaded,
	OnRetransmit { src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, seq: u32 },
	OnClose { dst_addr: Address, dst_port: u16, src_addr: Address, src_port: u16, rcv_end: u32 },
}

impl EventKind {
	/// The wire code this event would carry across a worker boundary
	/// (spec.md §6), used for logging/diagnostics and for picking the right
	/// `WireEvent` variant when crossing into another worker's channel.
	pub fn code(&self) -> &'static str {
		match self {
			EventKind::OnPacket(pkt) if pkt.is_control() => "PACKET_NOPAYLOAD",
			EventKind::OnPacket(_) => "PACKET_PAYLOAD",
			EventKind::OnRetransmit { .. } => "RETRANSMIT",
			EventKind::OnClose { .. } => "CLOSE",
			EventKind::OnNotify { .. } | EventKind::OnPoll { .. } | EventKind::OnDack { .. } | EventKind::OnUploaded | EventKind::OnDownloaded => "LOCAL",
		}
	}
}

/// `Event { deliver_time, dest, owner, cpu_cursor, kind }` of spec.md §9.
///
/// `owner` is the first host to observe the event (the host whose context it
/// runs under once popped); `cpu_cursor` tracks the host's accumulated
/// virtual-CPU delay for the reschedule-behind-a-blocked-CPU behaviour of
/// §4.8.
pub struct Event {
	pub deliver_time: SimTime,
	pub dest: Address,
	pub owner: Address,
	pub cpu_cursor: u64,
	pub kind: EventKind,
}

impl Event {
	pub fn new(deliver_time: SimTime, dest: Address, owner: Address, kind: EventKind) -> Self {
		Self { deliver_time, dest, owner, cpu_cursor: 0, kind }
	}
}

/// The event codes of spec.md §6 — `PACKET_PAYLOAD, PACKET_NOPAYLOAD,
/// PACKET_PAYLOAD_SHM, PACKET_NOPAYLOAD_SHM, RETRANSMIT, CLOSE` — the typed
/// frame an [`Event`] takes when it crosses a worker boundary. Since
/// inter-process transport is an external byte-framing oracle (spec.md §1,
/// non-goal), this struct is the frame itself, passed directly over an
/// in-process channel between worker threads rather than serialized to
/// bytes; a host embedding multiple OS processes would be the one to encode
/// it further, outside this core.
pub enum WireEvent {
	PacketPayload { deliver_time: SimTime, dest: Address, owner: Address, packet: PacketRef },
	PacketNoPayload { deliver_time: SimTime, dest: Address, owner: Address, packet: PacketRef },
	PacketPayloadShm { deliver_time: SimTime, dest: Address, owner: Address, packet: PacketRef },
	PacketNoPayloadShm { deliver_time: SimTime, dest: Address, owner: Address, packet: PacketRef },
	Retransmit { deliver_time: SimTime, src_addr: Address, src_port: u16, dst_addr: Address, dst_port: u16, seq: u32 },
	Close { deliver_time: SimTime, dst_addr: Address, dst_port: u16, src_addr: Address, src_port: u16, rcv_end: u32 },
}

impl WireEvent {
	pub fn into_event(self) -> Event {
		match self {
			WireEvent::PacketPayload { deliver_time, dest, owner, packet }
			| WireEvent::PacketNoPayload { deliver_time, dest, owner, packet }
			| WireEvent::PacketPayloadShm { deliver_time, dest, owner, packet }
			| WireEvent::PacketNoPayloadShm { deliver_time, dest, owner, packet } => Event::new(deliver_time, dest, owner, EventKind::OnPacket(packet)),
			WireEvent::Retransmit { deliver_time, src_addr, src_port, dst_addr, dst_port, seq } => {
				Event::new(deliver_time, src_addr, src_addr, EventKind::OnRetransmit { src_addr, src_port, dst_addr, dst_port, seq })
			}
			WireEvent::Close { deliver_time, dst_addr, dst_port, src_addr, src_port, rcv_end } => {
				Event::new(deliver_time, dst_addr, dst_addr, EventKind::OnClose { dst_addr, dst_port, src_addr, src_port, rcv_end })
			}
		}
	}

	/// Builds the right `Packet*[_SHM]` variant for a packet crossing a
	/// worker boundary, per spec.md §4.8 ("hand over a shared-memory slot
	/// identifier ... or serialise the packet into a wire frame").
	pub fn for_packet(deliver_time: SimTime, dest: Address, owner: Address, packet: PacketRef, shared: bool) -> Self {
		match (packet.is_control(), shared) {
			(true, false) => WireEvent::PacketNoPayload { deliver_time, dest, owner, packet },
			(false, false) => WireEvent::PacketPayload { deliver_time, dest, owner, packet },
			(true, true) => WireEvent::PacketNoPayloadShm { deliver_time, dest, owner, packet },
			(false, true) => WireEvent::PacketPayloadShm { deliver_time, dest, owner, packet },
		}
	}
}
