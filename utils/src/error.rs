use core::result;

use thiserror::Error;

/// Internal error taxonomy for the simulation core (spec.md §7).
///
/// Each variant maps deterministically to a guest-visible [`Errno`] when it
/// crosses the socket API boundary; see [`Errno::from_sim`].
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SimError {
	/// A buffer had no room for the requested write.
	#[error("buffer full")]
	OutOfBuffer,
	/// No socket exists for the given descriptor or routing key.
	#[error("socket missing")]
	SocketMissing,
	/// An operation was attempted against the wrong protocol (stream vs datagram).
	#[error("protocol mismatch")]
	ProtocolMismatch,
	/// A sequence number fell outside the current receive window.
	#[error("sequence out of window")]
	OutOfWindow,
	/// The socket's state does not permit the requested operation.
	#[error("bad socket state")]
	BadState,
	/// The peer reset the connection.
	#[error("connection reset by peer")]
	PeerReset,
	/// The peer has finished sending and closed its half of the connection.
	#[error("peer closed")]
	PeerClosed,
	/// VCI found no route to the destination.
	#[error("no route to destination")]
	NoRoute,
	/// A cross-worker wire frame failed to decode.
	#[error("wire frame decode error")]
	WireDecodeError,
}

/// POSIX-shaped error codes surfaced through the guest socket API (spec.md §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum Errno {
	EAFNOSUPPORT,
	EPROTONOSUPPORT,
	ENOTSOCK,
	EBADF,
	EFAULT,
	EINVAL,
	EADDRINUSE,
	EADDRNOTAVAIL,
	EMSGSIZE,
	EAGAIN,
	EINPROGRESS,
	EISCONN,
	EALREADY,
	ENOTCONN,
	ECONNREFUSED,
	ECONNRESET,
	EDESTADDRREQ,
	EWOULDBLOCK,
	ECONNABORTED,
	ENOSYS,
}

impl Errno {
	/// The default mapping from an internal error to its guest-visible errno.
	///
	/// Some call sites need a different mapping for the same [`SimError`] (e.g.
	/// `connect` mid-handshake reports `EALREADY` rather than the generic
	/// `BadState` mapping) — those map explicitly instead of calling this.
	pub fn from_sim(err: SimError) -> Self {
		match err {
			SimError::OutOfBuffer => Errno::EAGAIN,
			SimError::SocketMissing => Errno::EBADF,
			SimError::ProtocolMismatch => Errno::EPROTONOSUPPORT,
			SimError::OutOfWindow => Errno::EINVAL,
			SimError::BadState => Errno::EINVAL,
			SimError::PeerReset => Errno::ECONNRESET,
			SimError::PeerClosed => Errno::ENOTCONN,
			SimError::NoRoute => Errno::EADDRNOTAVAIL,
			SimError::WireDecodeError => Errno::EFAULT,
		}
	}
}

pub type Result<T = (), E = SimError> = result::Result<T, E>;

/// Adapts a `Result` into an `Option`, routing the error through a side-effect
/// (typically a `log::warn!`/`log::debug!` call) instead of propagating it.
///
/// Used at the boundaries where spec.md's propagation policy calls for
/// dropping a packet or event and logging rather than returning an error
/// (§7: "Event-level errors ... destroy the event silently and log at warn
/// level").
#[doc(hidden)]
pub trait Ext<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T>;
}

impl<T, E> Ext<T, E> for result::Result<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T> {
		match self {
			Ok(v) => Some(v),
			Err(e) => {
				f(e);
				None
			}
		}
	}
}

pub use Ext as _;

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn errno_mapping_is_total_and_deterministic() {
		for err in [
			SimError::OutOfBuffer,
			SimError::SocketMissing,
			SimError::ProtocolMismatch,
			SimError::OutOfWindow,
			SimError::BadState,
			SimError::PeerReset,
			SimError::PeerClosed,
			SimError::NoRoute,
			SimError::WireDecodeError,
		] {
			assert_eq!(Errno::from_sim(err), Errno::from_sim(err));
		}

		assert_eq!(Errno::from_sim(SimError::PeerReset), Errno::ECONNRESET);
		assert_eq!(Errno::from_sim(SimError::PeerClosed), Errno::ENOTCONN);
	}
}
