pub mod address;
pub mod buffer;
pub mod epoll;
pub mod event;
pub mod host;
pub mod oracle;
pub mod packet;
pub mod pipe;
pub mod socket;
pub mod tcp;
pub mod transport;
pub mod udp;
pub mod vci;
pub mod worker;

pub use address::Address;
pub use event::{Event, EventKind, WireEvent};
pub use host::Host;
pub use oracle::Oracles;
pub use packet::{Packet, PacketRef};
pub use worker::{HostRoutes, Inbox, Outbox, Worker, WorkerHandle};
