use runtime::SimTime;

use crate::address::{classify, Address, DestinationClass, NetworkId};
use crate::event::{Event, EventKind, WireEvent};
use crate::oracle::Oracles;
use crate::packet::PacketRef;

/// The Virtual Communications Interface of spec.md §4.8: the event factory
/// and router. Stateless with respect to any one packet — every call takes
/// the source/destination network ids it needs, which the caller resolves
/// from its own address-to-network mailbox map (spec.md §3's "Address
/// Mailbox Map").
pub struct Vci;

/// What a routed packet turned into. `Local` stays on the current worker's
/// own tracker; `CrossWorker` must be handed to the destination worker's
/// channel (same slave, different worker) or serialised across the
/// slave-process boundary (different slave) — either way, spec.md §1 treats
/// the channel/process transport itself as an external byte-framing oracle.
pub enum Dispatch {
	Local(Event),
	CrossWorker(WireEvent),
	Dropped,
}

impl Vci {
	/// Routes one outbound packet — spec.md §4.8 steps 1-3.
	///
	/// `shared_memory` requests the zero-copy `Shared` wire variant for a
	/// same-slave cross-worker hop; it is ignored (forced off) once the
	/// destination is a different slave, since that always serialises.
	#[allow(clippy::too_many_arguments)]
	pub fn route(&self, src_net: NetworkId, dst_net: NetworkId, src: Address, dst: Address, pkt: PacketRef, oracles: &dyn Oracles, shared_memory: bool) -> Dispatch {
		let u = oracles.random_unit();
		if u > oracles.reliability(src_net, dst_net) {
			return match Self::retransmit_request(&pkt, oracles.current_simulated_time()) {
				Some(event) => Dispatch::Local(event),
				None => Dispatch::Dropped,
			};
		}

		let latency_ms = oracles.latency(src_net, dst_net);
		let deliver_time = oracles.current_simulated_time() + latency_ms;

		match classify(src, dst) {
			DestinationClass::SameSlaveSameWorker => Dispatch::Local(Event::new(deliver_time, dst, dst, EventKind::OnPacket(pkt))),
			DestinationClass::SameSlaveDifferentWorker => Dispatch::CrossWorker(WireEvent::for_packet(deliver_time, dst, dst, pkt, shared_memory)),
			DestinationClass::DifferentSlaveDifferentWorker => Dispatch::CrossWorker(WireEvent::for_packet(deliver_time, dst, dst, pkt, false)),
		}
	}

	/// Builds the feedback event fired at the sender when a packet is
	/// sampled as lost — spec.md §4.8 step 1: "schedule a retransmit-request
	/// back at the sender and stop." Only stream packets carry a sequence
	/// number to retransmit by; a lost datagram is simply dropped.
	fn retransmit_request(pkt: &PacketRef, now: SimTime) -> Option<Event> {
		let header = pkt.tcp?;
		let kind = EventKind::OnRetransmit { src_addr: pkt.src_addr, src_port: pkt.src_port, dst_addr: pkt.dst_addr, dst_port: pkt.dst_port, seq: header.seq };
		Some(Event::new(now, pkt.src_addr, pkt.src_addr, kind))
	}

	/// The CPU-delay interaction of spec.md §4.8/§4.9: if the host's virtual
	/// CPU is currently blocked and this event's delay cursor is behind the
	/// host's accumulated delay, push the event out by the millisecond-
	/// rounded difference and advance its cursor to match.
	pub fn apply_cpu_delay(event: &mut Event, cpu_blocked: bool, host_accumulated_delay_ns: u64) -> Option<SimTime> {
		if !cpu_blocked {
			return None;
		}

		let host_delay_ms = host_accumulated_delay_ns / 1_000_000;
		if event.cpu_cursor >= host_delay_ms {
			return None;
		}

		let offset = host_delay_ms - event.cpu_cursor;
		event.cpu_cursor = host_delay_ms;
		event.deliver_time += offset;
		Some(event.deliver_time)
	}
}
