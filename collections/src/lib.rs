/// The shared-memory cabinet/slot allocator backing zero-copy packets.
pub mod cabinet;
/// Generic typed-key slab arena.
pub mod arena;
/// An `ahash`-backed `HashMap` alias for the hot routing tables.
pub mod map;
