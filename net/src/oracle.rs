use runtime::SimTime;
use utils::config::Sysconfig;

use crate::address::NetworkId;

/// The environment oracles of spec.md §6: everything the core calls out to
/// but does not implement itself (the topology/latency graph, the resolver,
/// randomness, the clock, and configuration). A single bundle trait keeps
/// call sites (`vci`, `tcp`) from threading five separate parameters.
pub trait Oracles: Sysconfig {
	/// Milliseconds of latency between two network ids.
	fn latency(&self, src_net: NetworkId, dst_net: NetworkId) -> u64;

	/// Packet loss probability in `[0,1)` between two network ids.
	fn reliability(&self, src_net: NetworkId, dst_net: NetworkId) -> f64;

	/// Downstream bandwidth of a network, in kilobytes per second.
	fn down_bandwidth_kbps(&self, net: NetworkId) -> u64;

	/// Upstream bandwidth of a network, in kilobytes per second.
	fn up_bandwidth_kbps(&self, net: NetworkId) -> u64;

	/// Uniform sample in `[0,1)`.
	fn random_unit(&self) -> f64;

	/// Uniform sample in `[0, max)`.
	fn random_range(&self, max: u32) -> u32;

	fn current_simulated_time(&self) -> SimTime;
}
