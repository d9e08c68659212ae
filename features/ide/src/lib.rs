//! Editor state synchronization.
//!
//! Tracks what the user's editor looks like (active file, cursor,
//! selection, open files) and produces context messages for the model:
//! a full JSON snapshot on first contact or after a history reset, and
//! compact structural deltas afterwards.

pub mod snapshot;
pub mod tracker;

pub use snapshot::ActiveFile;
pub use snapshot::CursorPosition;
pub use snapshot::IdeSnapshot;
pub use tracker::EditorContextTracker;
