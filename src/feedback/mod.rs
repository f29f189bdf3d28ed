pub mod conversation;
pub mod folder;
pub mod recorder;
pub mod types;
pub mod writer;

pub use conversation::*;
pub use folder::FeedbackFolder;
pub use recorder::FeedbackRecorder;
pub use types::*;
pub use writer::*;
