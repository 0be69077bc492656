//! Download completion tracking
//!
//! The poll loop that follows a download to a terminal state, the
//! correlation of metadata and content records, and the clock it runs on.

pub mod clock;
pub mod correlate;
pub mod tracker;

pub use clock::{Clock, TokioClock};
pub use correlate::{collect_files, resolve, LogicalDownload, Phase};
pub use tracker::{step, CompletionState, CompletionTracker, PollSettings};
