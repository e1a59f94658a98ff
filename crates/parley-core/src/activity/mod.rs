//! Local session-continuity bookkeeping: the per-topic activity record,
//! the throttled activity tracker that keeps it fresh, and the background
//! sweeper that purges stale records.

pub mod store;
pub mod sweeper;
pub mod throttle;
pub mod tracker;

pub use store::LocalActivityStore;
pub use sweeper::spawn_sweeper;
pub use tracker::TrackerHandle;
