//! Tactline Timeline - Arrangement data model
//!
//! Implements the multitrack arrangement:
//! - Tracks holding tick-positioned blocks
//! - Solo/mute across tracks
//! - Undo/redo journal with per-entity and global order
//! - Structural-edit lock shared with playback
//! - Change notifications and document save/restore

/// A caller broke an ownership contract (wrong track, unknown track).
/// Loud in debug builds, logged and skipped in release builds.
macro_rules! contract_violation {
    ($($arg:tt)+) => {{
        tracing::error!($($arg)+);
        debug_assert!(false, $($arg)+);
    }};
}

pub mod block;
pub mod clipboard;
pub mod container;
pub mod engine;
pub mod events;
pub mod journal;
pub mod serialization;
mod solo;
pub mod track;

pub use block::{BlockContent, BlockState, Note, TimedBlock};
pub use clipboard::Clipboard;
pub use container::{ContainerState, TrackContainer};
pub use engine::{ActiveBlock, BlockSpan, EngineContext, PlaybackTopology, TrackLayout};
pub use events::{EventBus, TimelineEvent};
pub use journal::{Journal, JournalAction, JournalEntry, Owner};
pub use serialization::ArrangementFile;
pub use track::{Track, TrackState, TrackStatus, TrackType};
