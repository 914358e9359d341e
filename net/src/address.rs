use core::fmt;

use bilge::prelude::*;

/// The bit layout of [`Address`]: `slave_id | worker_id | node_id`, LSB
/// first, matching the teacher's `bilge` bitfield convention for wire
/// headers (see `ip::v4::Meta`, where the first-declared field occupies the
/// low bits; or `tcp::Control`, a plain flag bitfield of the same shape).
#[bitsize(32)]
#[derive(FromBits, Clone, Copy)]
struct Bits {
	slave_id: u8,
	worker_id: u8,
	node_id: u16,
}

/// The bit-packed 32-bit address of spec.md §3/GLOSSARY: `slave_id |
/// worker_id | node_id`.
///
/// A "slave" is one simulation host process; "worker" is an OS thread within
/// it; "node" is a virtual host address local to that worker. Wraps the
/// `bilge` bitfield in a plain newtype so it gets ordinary `Eq`/`Hash`/`Copy`
/// semantics for use as a map key, the way `net`'s routing tables need it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address(u32);

/// `127.0.0.1` — the address every loopback-destined packet resolves to,
/// per spec.md §3 ("Loopback is the constant 127.0.0.1").
pub const LOOPBACK: Address = Address(0x7F00_0001);

impl Address {
	pub fn new_raw(slave_id: u8, worker_id: u8, node_id: u16) -> Self {
		Address(Bits::new(slave_id, worker_id, node_id).into())
	}

	fn bits(&self) -> Bits {
		Bits::from(self.0)
	}

	pub fn slave_id(&self) -> u8 {
		self.bits().slave_id()
	}

	pub fn worker_id(&self) -> u8 {
		self.bits().worker_id()
	}

	pub fn node_id(&self) -> u16 {
		self.bits().node_id()
	}

	pub fn is_loopback(&self) -> bool {
		*self == LOOPBACK
	}

	/// True when `other` is served by the same worker thread as `self`.
	pub fn same_worker(&self, other: &Address) -> bool {
		self.slave_id() == other.slave_id() && self.worker_id() == other.worker_id()
	}

	/// True when `other` is a different worker on the same slave process.
	pub fn same_slave(&self, other: &Address) -> bool {
		self.slave_id() == other.slave_id()
	}
}

impl From<u32> for Address {
	fn from(raw: u32) -> Self {
		Address(raw)
	}
}

impl From<Address> for u32 {
	fn from(addr: Address) -> Self {
		addr.0
	}
}

impl fmt::Debug for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Address({self})")
	}
}

impl fmt::Display for Address {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.slave_id(), self.worker_id(), self.node_id())
	}
}

/// Classification of a destination relative to the worker originating a
/// packet — spec.md §4.8's three routing classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationClass {
	SameSlaveSameWorker,
	SameSlaveDifferentWorker,
	DifferentSlaveDifferentWorker,
}

pub fn classify(src: Address, dst: Address) -> DestinationClass {
	if src.same_worker(&dst) {
		DestinationClass::SameSlaveSameWorker
	} else if src.same_slave(&dst) {
		DestinationClass::SameSlaveDifferentWorker
	} else {
		DestinationClass::DifferentSlaveDifferentWorker
	}
}

/// An integer label for a region of the simulated topology (GLOSSARY:
/// "Network id"); latency and reliability between two networks are looked
/// up by the pair.
pub type NetworkId = u32;
