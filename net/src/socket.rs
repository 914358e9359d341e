use std::collections::VecDeque;

use collections::arena::{Arena, Key};
use collections::map::FastMap;
use utils::error::{Result, SimError};

use crate::address::Address;
use crate::buffer::VirtualBuffer;
use crate::epoll::Epoll;
use crate::packet::Protocol;
use crate::tcp::TcpPcb;

/// A socket descriptor — spec.md §9's design note: "Represent sockets in an
/// arena keyed by descriptor id. Parent-child links are descriptor ids, not
/// pointers."
pub type SockId = Key<Socket>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SockType {
	Stream,
	Datagram,
}

/// spec.md §3's unified state field: "state (one of the TCP states below
/// plus `UDP`)".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
	Closed,
	Listen,
	SynSent,
	SynRcvd,
	Established,
	Closing,
	CloseWait,
	Udp,
}

/// The Virtual Socket of spec.md §3.
pub struct Socket {
	pub id: u32,
	pub kind: SockType,
	pub vb: VirtualBuffer,
	pub local: Option<(Address, u16)>,
	pub peer: Option<(Address, u16)>,
	pub parent: Option<SockId>,
	pub state: SocketState,
	pub prev_state: SocketState,
	pub delete_when_drained: bool,
	pub active: bool,
	pub tcp: Option<TcpPcb>,
}

impl Socket {
	pub fn new(kind: SockType, id: u32) -> Self {
		let state = if kind == SockType::Datagram { SocketState::Udp } else { SocketState::Closed };
		Self {
			id,
			kind,
			vb: VirtualBuffer::new(64 * 1024),
			local: None,
			peer: None,
			parent: None,
			state,
			prev_state: state,
			delete_when_drained: false,
			active: true,
			tcp: (kind == SockType::Stream).then(TcpPcb::default),
		}
	}

	pub fn protocol(&self) -> Protocol {
		match self.kind {
			SockType::Stream => Protocol::Stream,
			SockType::Datagram => Protocol::Datagram,
		}
	}

	pub fn epoll(&self) -> Epoll {
		self.vb.epoll()
	}
}

/// Where a bound port is reserved — spec.md §4.7: binding to `INADDR_ANY`
/// reserves the port on both interfaces, `INADDR_LOOPBACK` only loopback,
/// the host's own address only ethernet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindScope {
	Ethernet,
	Loopback,
}

/// A hash key for a server's child tables: `hash(remote addr, remote port)`
/// (spec.md §3) — `(Address, u16)` is already hashable, so this is just a
/// type alias for clarity at call sites.
pub type ChildKey = (Address, u16);

/// The Virtual Server of spec.md §3: three tables keyed by remote endpoint,
/// plus an ordered FIFO mirroring `pending_children` for accept order.
#[derive(Default)]
pub struct Server {
	pub incomplete_children: FastMap<ChildKey, SockId>,
	pub pending_children: FastMap<ChildKey, SockId>,
	pub accepted_children: FastMap<ChildKey, SockId>,
	pub accept_order: VecDeque<ChildKey>,
	pub destroy_when_empty: bool,
}

impl Server {
	pub fn is_empty(&self) -> bool {
		self.incomplete_children.is_empty() && self.pending_children.is_empty() && self.accepted_children.is_empty()
	}
}

/// The Socket Manager of spec.md §4.7: descriptor allocation, bind / connect
/// / listen / accept / close, routing, and parent/child lifetime coupling.
pub struct SocketManager {
	host: Address,
	sockets: Arena<Socket>,
	servers: FastMap<SockId, Server>,
	bound: FastMap<(Protocol, u16, BindScope), SockId>,
	next_ephemeral_port: u16,
}

fn inaddr_any() -> Address {
	Address::new_raw(0, 0, 0)
}

impl SocketManager {
	pub fn new(host: Address) -> Self {
		Self { host, sockets: Arena::new(), servers: FastMap::default(), bound: FastMap::default(), next_ephemeral_port: 30000 }
	}

	/// `socket()` — spec.md §4.7 accepts only stream or datagram, always
	/// non-blocking.
	pub fn socket(&mut self, kind: SockType) -> SockId {
		let placeholder = Socket::new(kind, 0);
		let id = self.sockets.insert(placeholder);
		self.sockets[id].id = id.index() as u32;
		id
	}

	pub fn get(&self, id: SockId) -> Result<&Socket> {
		self.sockets.get(id).ok_or(SimError::SocketMissing)
	}

	pub fn get_mut(&mut self, id: SockId) -> Result<&mut Socket> {
		self.sockets.get_mut(id).ok_or(SimError::SocketMissing)
	}

	fn scopes_for(addr: Address) -> &'static [BindScope] {
		if addr == inaddr_any() {
			&[BindScope::Ethernet, BindScope::Loopback]
		} else if addr.is_loopback() {
			&[BindScope::Loopback]
		} else {
			&[BindScope::Ethernet]
		}
	}

	/// `bind()` — spec.md §4.7. Port `0` is substituted with a monotonic
	/// ephemeral-port counter.
	pub fn bind(&mut self, id: SockId, addr: Address, mut port: u16) -> Result<u16> {
		let protocol = self.get(id)?.protocol();

		if port == 0 {
			port = self.next_ephemeral_port;
			self.next_ephemeral_port = self.next_ephemeral_port.wrapping_add(1).max(30000);
		}

		let scopes = Self::scopes_for(addr);
		for &scope in scopes {
			if self.bound.contains_key(&(protocol, port, scope)) {
				return Err(SimError::BadState);
			}
		}

		for &scope in scopes {
			self.bound.insert((protocol, port, scope), id);
		}

		let bind_addr = if addr == inaddr_any() { self.host } else { addr };
		self.get_mut(id)?.local = Some((bind_addr, port));
		Ok(port)
	}

	/// `listen()` — transitions a bound stream socket into `LISTEN` and
	/// creates its server record.
	pub fn listen(&mut self, id: SockId) -> Result<()> {
		let socket = self.get_mut(id)?;
		if socket.kind != SockType::Stream || socket.local.is_none() {
			return Err(SimError::BadState);
		}
		socket.state = SocketState::Listen;
		self.servers.entry(id).or_default();
		Ok(())
	}

	/// `connect()` — reserves an ephemeral local port if unbound, records
	/// the peer, and leaves state transition to `tcp_connect`.
	pub fn connect(&mut self, id: SockId, peer_addr: Address, peer_port: u16) -> Result<()> {
		if self.get(id)?.local.is_none() {
			self.bind(id, inaddr_any(), 0)?;
		}
		let socket = self.get_mut(id)?;
		socket.peer = Some((peer_addr, peer_port));
		Ok(())
	}

	/// Looks up the listener bound to `(protocol, local_port)`, if any.
	pub fn find_listener(&self, protocol: Protocol, local_addr: Address, local_port: u16) -> Option<SockId> {
		let scope = if local_addr.is_loopback() { BindScope::Loopback } else { BindScope::Ethernet };
		let id = *self.bound.get(&(protocol, local_port, scope))?;
		(self.sockets.get(id)?.state == SocketState::Listen).then_some(id)
	}

	/// Routes an incoming packet to its socket — spec.md §4.7: for stream,
	/// check the server table first via `(remote_addr, remote_port)`; a
	/// remote with no child yet (the first SYN of a new connection) routes
	/// to the listener itself so it can demultiplex one.
	pub fn route(&self, protocol: Protocol, local_addr: Address, local_port: u16, remote_addr: Address, remote_port: u16) -> Option<SockId> {
		if let Some(listener) = self.find_listener(protocol, local_addr, local_port) {
			let server = self.servers.get(&listener)?;
			let key = (remote_addr, remote_port);
			let child = server.accepted_children.get(&key).or_else(|| server.pending_children.get(&key)).or_else(|| server.incomplete_children.get(&key));
			return Some(child.copied().unwrap_or(listener));
		}

		let scope = if local_addr.is_loopback() { BindScope::Loopback } else { BindScope::Ethernet };
		self.bound.get(&(protocol, local_port, scope)).copied()
	}

	/// Demultiplexes a SYN at a listener into a new child socket, subject to
	/// the backlog limit (spec.md §SPEC_FULL.C). Returns the child's id.
	pub fn spawn_child(&mut self, listener: SockId, remote: ChildKey, backlog: Option<u32>) -> Result<SockId> {
		let server = self.servers.get(&listener).ok_or(SimError::SocketMissing)?;
		if let Some(limit) = backlog {
			if server.incomplete_children.len() as u32 >= limit {
				return Err(SimError::OutOfBuffer);
			}
		}

		let local = self.get(listener)?.local;
		let child_id = self.sockets.insert(Socket::new(SockType::Stream, 0));
		self.sockets[child_id].id = child_id.index() as u32;
		self.sockets[child_id].local = local;
		self.sockets[child_id].peer = Some(remote);
		self.sockets[child_id].parent = Some(listener);
		self.sockets[child_id].state = SocketState::SynRcvd;

		self.servers.get_mut(&listener).unwrap().incomplete_children.insert(remote, child_id);
		Ok(child_id)
	}

	/// `SYN_RCVD` → `ESTABLISHED`: moves a child from `incomplete_children`
	/// to `pending_children` and marks the listener readable (spec.md §4.4).
	pub fn promote_child(&mut self, child: SockId) -> Result<()> {
		let parent = self.get(child)?.parent.ok_or(SimError::SocketMissing)?;
		let remote = self.get(child)?.peer.ok_or(SimError::SocketMissing)?;

		let server = self.servers.get_mut(&parent).ok_or(SimError::SocketMissing)?;
		server.incomplete_children.remove(&remote);
		server.pending_children.insert(remote, child);
		server.accept_order.push_back(remote);

		self.get_mut(parent)?.vb.add_read(crate::packet::Packet::control(Address::new_raw(0, 0, 0), 0, Address::new_raw(0, 0, 0), 0, 0, 0, 0, crate::packet::Flags::empty()).into_ref());
		Ok(())
	}

	/// `accept()` — pops the oldest pending child in FIFO order.
	pub fn accept(&mut self, listener: SockId) -> Result<SockId> {
		let server = self.servers.get_mut(&listener).ok_or(SimError::SocketMissing)?;
		let remote = server.accept_order.pop_front().ok_or(SimError::OutOfBuffer)?;
		let child = server.pending_children.remove(&remote).ok_or(SimError::SocketMissing)?;
		server.accepted_children.insert(remote, child);

		// Mirror the listener's vread consumption used to drive readiness.
		self.get_mut(listener)?.vb.remove_read();
		Ok(child)
	}

	/// `close()` on a listener: marks destroy-when-empty; the listener is
	/// actually removed once its pending/accepted children are gone
	/// (spec.md §4.7).
	pub fn close_listener(&mut self, listener: SockId) -> Result<()> {
		let server = self.servers.get_mut(&listener).ok_or(SimError::SocketMissing)?;
		server.destroy_when_empty = true;
		if server.is_empty() {
			self.servers.remove(&listener);
			self.sockets.remove(listener);
		}
		Ok(())
	}

	/// Removes a closed child from its parent's tables and garbage-collects
	/// the parent if it was waiting to destroy empty (spec.md §4.7: "child
	/// lifecycle ... notifies its parent listener for garbage collection").
	pub fn destroy_child(&mut self, child: SockId) {
		if let Some(socket) = self.sockets.get(child) {
			if let (Some(parent), Some(remote)) = (socket.parent, socket.peer) {
				if let Some(server) = self.servers.get_mut(&parent) {
					server.incomplete_children.remove(&remote);
					server.pending_children.remove(&remote);
					server.accepted_children.remove(&remote);

					if server.destroy_when_empty && server.is_empty() {
						self.servers.remove(&parent);
						self.sockets.remove(parent);
					}
				}
			}
		}

		self.sockets.remove(child);
	}

	pub fn iter(&self) -> impl Iterator<Item = (SockId, &Socket)> {
		self.sockets.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn addr(n: u16) -> Address {
		Address::new_raw(0, 0, n)
	}

	#[test]
	fn bind_any_reserves_both_interfaces() {
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Stream);
		let port = mgr.bind(s, inaddr_any(), 9000).unwrap();
		assert_eq!(port, 9000);

		let other = mgr.socket(SockType::Stream);
		assert!(mgr.bind(other, crate::address::LOOPBACK, 9000).is_err());
	}

	#[test]
	fn port_zero_gets_ephemeral_assignment() {
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Stream);
		let port = mgr.bind(s, inaddr_any(), 0).unwrap();
		assert!(port >= 30000);
	}

	#[test]
	fn listener_destroyed_only_after_children_gone() {
		let mut mgr = SocketManager::new(addr(1));
		let listener = mgr.socket(SockType::Stream);
		mgr.bind(listener, inaddr_any(), 30001).unwrap();
		mgr.listen(listener).unwrap();

		let child = mgr.spawn_child(listener, (addr(2), 1234), None).unwrap();
		mgr.promote_child(child).unwrap();

		mgr.close_listener(listener).unwrap();
		assert!(mgr.get(listener).is_ok(), "listener must survive while children remain");

		let accepted = mgr.accept(listener).unwrap();
		assert_eq!(accepted, child);

		mgr.destroy_child(child);
		assert!(mgr.get(listener).is_err(), "listener should be gone once empty");
	}

	#[test]
	fn backlog_limit_rejects_excess_syns() {
		let mut mgr = SocketManager::new(addr(1));
		let listener = mgr.socket(SockType::Stream);
		mgr.bind(listener, inaddr_any(), 30001).unwrap();
		mgr.listen(listener).unwrap();

		mgr.spawn_child(listener, (addr(2), 1), Some(1)).unwrap();
		assert!(mgr.spawn_child(listener, (addr(3), 1), Some(1)).is_err());
	}

	#[test]
	fn route_falls_back_to_direct_socket_after_server_check() {
		let mut mgr = SocketManager::new(addr(1));
		let s = mgr.socket(SockType::Datagram);
		mgr.bind(s, inaddr_any(), 5000).unwrap();

		let routed = mgr.route(Protocol::Datagram, addr(1), 5000, addr(9), 1);
		assert_eq!(routed, Some(s));
	}
}
