//! Deduplication engine: coordinator decision logic and eviction sweeper.

pub mod coordinator;
pub mod sweeper;

pub use coordinator::{Coordinator, Outcome};
pub use sweeper::Sweeper;
