pub mod hub;
pub mod publisher;
pub mod scheduler;

pub use hub::HubPublisher;
pub use publisher::*;
pub use scheduler::{SyncHandle, SyncScheduler, TickOutcome};
