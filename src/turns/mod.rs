pub mod store;
pub mod tracker;

pub use store::{SessionSummary, TurnRecord, TurnStore};
pub use tracker::TurnTracker;
