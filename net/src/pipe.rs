use std::collections::VecDeque;
use std::sync::Arc;

use collections::arena::{Arena, Key};
use utils::error::{Result, SimError};

use crate::epoll::Epoll;

/// A descriptor for one end of a pipe — spec.md §4.10.
pub type PipeId = Key<PipeEnd>;

/// One unidirectional queue feeding a pipe endpoint's reads, plus that
/// endpoint's [`Epoll`] readiness. Two of these, cross-wired, make a
/// bidirectional `socketpair(AF_UNIX, SOCK_STREAM)` (spec.md §4.1, §4.10).
pub struct PipeEnd {
	peer: Option<PipeId>,
	inbox: VecDeque<Arc<[u8]>>,
	read_closed: bool,
	write_closed: bool,
	epoll: Epoll,
}

impl PipeEnd {
	fn new() -> Self {
		Self { peer: None, inbox: VecDeque::new(), read_closed: false, write_closed: false, epoll: Epoll::new() }
	}

	pub fn epoll(&self) -> Epoll {
		self.epoll
	}

	fn refresh_readable(&mut self) {
		self.epoll.set_readable(!self.inbox.is_empty());
	}
}

/// The Pipe Manager of spec.md §4.10: `socketpair` support for `AF_UNIX
/// SOCK_STREAM`, as two linked-buffer queues rather than a pair of `Socket`s
/// routed through the Socket Manager — there is no address, port, or wire
/// delivery involved, just two endpoints passing bytes directly.
#[derive(Default)]
pub struct PipeManager {
	ends: Arena<PipeEnd>,
}

impl PipeManager {
	pub fn new() -> Self {
		Self { ends: Arena::new() }
	}

	/// `socketpair()` — allocates both ends, each pointing at the other.
	pub fn socketpair(&mut self) -> (PipeId, PipeId) {
		let a = self.ends.insert(PipeEnd::new());
		let b = self.ends.insert(PipeEnd::new());
		self.ends[a].peer = Some(b);
		self.ends[b].peer = Some(a);
		(a, b)
	}

	pub fn epoll(&self, id: PipeId) -> Result<Epoll> {
		Ok(self.ends.get(id).ok_or(SimError::SocketMissing)?.epoll())
	}

	/// Writes `data` into the peer's inbox. Fails if either direction is
	/// already closed.
	pub fn write(&mut self, id: PipeId, data: &[u8]) -> Result<usize> {
		let end = self.ends.get(id).ok_or(SimError::SocketMissing)?;
		if end.write_closed {
			return Err(SimError::PeerClosed);
		}
		let peer = end.peer.ok_or(SimError::PeerClosed)?;

		let peer_end = self.ends.get_mut(peer).ok_or(SimError::PeerClosed)?;
		if peer_end.read_closed {
			return Err(SimError::PeerClosed);
		}

		let n = data.len();
		peer_end.inbox.push_back(Arc::from(data));
		peer_end.refresh_readable();
		Ok(n)
	}

	/// Pops the oldest chunk written by the peer, if any.
	pub fn read(&mut self, id: PipeId) -> Result<Arc<[u8]>> {
		let end = self.ends.get_mut(id).ok_or(SimError::SocketMissing)?;
		let chunk = end.inbox.pop_front().ok_or(SimError::OutOfBuffer)?;
		end.refresh_readable();
		Ok(chunk)
	}

	/// Closes one endpoint: its own writes are refused from now on, and its
	/// peer can no longer write either (read side of this end is closed to
	/// the peer). The pipe itself — both `PipeEnd`s — is torn down once both
	/// sides have closed (spec.md §4.10: "destroyed when both endpoints
	/// close").
	pub fn close(&mut self, id: PipeId) -> Result<()> {
		let peer = {
			let end = self.ends.get_mut(id).ok_or(SimError::SocketMissing)?;
			end.write_closed = true;
			end.read_closed = true;
			end.peer
		};

		let peer_closed = match peer.and_then(|p| self.ends.get(p)) {
			Some(peer_end) => peer_end.read_closed && peer_end.write_closed,
			None => true,
		};

		if peer_closed {
			self.ends.remove(id);
			if let Some(peer) = peer {
				if self.ends.contains(peer) {
					self.ends.remove(peer);
				}
			}
		}

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn write_on_one_end_is_readable_on_the_other() {
		let mut mgr = PipeManager::new();
		let (a, b) = mgr.socketpair();

		mgr.write(a, b"hello").unwrap();
		assert!(mgr.epoll(b).unwrap().is_readable());
		assert!(!mgr.epoll(a).unwrap().is_readable());

		let chunk = mgr.read(b).unwrap();
		assert_eq!(&*chunk, b"hello");
		assert!(!mgr.epoll(b).unwrap().is_readable());
	}

	#[test]
	fn closing_one_end_refuses_further_writes_from_either_side() {
		let mut mgr = PipeManager::new();
		let (a, b) = mgr.socketpair();

		mgr.close(a).unwrap();
		assert!(matches!(mgr.write(b, b"x"), Err(SimError::PeerClosed)));
	}

	#[test]
	fn pipe_is_destroyed_only_once_both_ends_close() {
		let mut mgr = PipeManager::new();
		let (a, b) = mgr.socketpair();

		mgr.close(a).unwrap();
		assert!(mgr.epoll(b).is_ok(), "peer end must survive until it also closes");

		mgr.close(b).unwrap();
		assert!(mgr.epoll(b).is_err(), "both ends gone once both closed");
	}
}
