pub mod config;
pub mod feedback;
pub mod ingest;
pub mod sync;

pub use config::FeedbackConfig;
pub use feedback::{FeedbackError, FeedbackRecorder};
pub use sync::{SyncScheduler, TickOutcome};
