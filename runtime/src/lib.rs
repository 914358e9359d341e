/// The cross-worker scheduling barrier (spec.md §4.9/§5).
pub mod barrier;
/// The terminal logger (`log::Log` impl).
pub mod logger;
/// A cloneable shutdown flag for coordinating graceful worker-pool teardown.
pub mod shutdown;
/// Simulated time: the `SimTime` alias and a worker's monotonic local clock.
pub mod time;
/// The generic, time-bucketed event tracker (spec.md §4.1).
pub mod tracker;

pub use barrier::Barrier;
pub use shutdown::Shutdown;
pub use time::{LocalClock, SimTime};
pub use tracker::Tracker;
