//! Timed content blocks: the segments living on a track.

use serde::{Deserialize, Serialize};
use tactline_core::{AutomationCurve, TickRange, Ticks};
use uuid::Uuid;

use crate::events::TimelineEvent;
use crate::journal::{EditContext, JournalAction, Owner};
use crate::track::TrackType;

/// One note inside an instrument pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Offset from the start of the pattern.
    pub offset: Ticks,
    pub length: Ticks,
    pub key: u8,
    pub velocity: u8,
}

/// Type-specific payload of a block. Which variant a track creates is
/// decided by its [`TrackType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockContent {
    /// Notes played by an instrument track.
    Pattern { name: String, notes: Vec<Note> },
    /// Reference to one beat/bassline arrangement.
    BeatPattern { name: String, beat_index: usize },
    Automation(AutomationCurve),
    /// Reference to a sample file, empty while nothing is loaded.
    Sample { path: String },
}

impl BlockContent {
    /// Fresh payload for a block created on a track of `kind`.
    pub fn for_track(kind: TrackType) -> Self {
        match kind {
            TrackType::Instrument => Self::Pattern {
                name: String::new(),
                notes: Vec::new(),
            },
            TrackType::BeatBassline => Self::BeatPattern {
                name: String::new(),
                beat_index: 0,
            },
            TrackType::Automation | TrackType::HiddenAutomation => {
                Self::Automation(AutomationCurve::default())
            }
            TrackType::Sample => Self::Sample {
                path: String::new(),
            },
        }
    }

    /// Document node name of the payload kind.
    pub fn node_name(&self) -> &'static str {
        match self {
            Self::Pattern { .. } => "pattern",
            Self::BeatPattern { .. } => "beat_pattern",
            Self::Automation(_) => "automation",
            Self::Sample { .. } => "sample",
        }
    }

    /// Whether a block with this payload belongs on a track of `kind`.
    pub fn fits(&self, kind: TrackType) -> bool {
        matches!(
            (self, kind),
            (Self::Pattern { .. }, TrackType::Instrument)
                | (Self::BeatPattern { .. }, TrackType::BeatBassline)
                | (
                    Self::Automation(_),
                    TrackType::Automation | TrackType::HiddenAutomation
                )
                | (Self::Sample { .. }, TrackType::Sample)
        )
    }

    /// Length a freshly created block starts with. Samples have no
    /// length until something is loaded into them.
    pub fn initial_length(&self) -> Ticks {
        match self {
            Self::Sample { .. } => Ticks::ZERO,
            _ => Ticks::TACT,
        }
    }
}

/// Saved form of a block, used for documents, the clipboard, cloning
/// and journal snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockState {
    /// Payload kind name, informational only.
    #[serde(default)]
    pub node: String,
    /// Identity to restore; `None` gives the restored block a new one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub pos: Ticks,
    pub len: Ticks,
    #[serde(default)]
    pub muted: bool,
    pub content: BlockContent,
}

impl BlockState {
    /// Same state without an identity, for copies.
    pub fn detached(mut self) -> Self {
        self.id = None;
        self
    }
}

/// A segment on a track: start position, length, mute flag and payload.
///
/// Fields are read-only outside this crate; every mutation goes through
/// [`TrackContainer`](crate::TrackContainer) so it is journalled,
/// announced and published to playback.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedBlock {
    id: Uuid,
    track: Uuid,
    start: Ticks,
    length: Ticks,
    muted: bool,
    content: BlockContent,
}

/// `length` clamped to `[0, MAX - start]`.
fn fit_length(start: Ticks, length: Ticks) -> Ticks {
    length.clamped().min(Ticks::MAX - start)
}

impl TimedBlock {
    /// Construction is never journalled.
    pub(crate) fn new(track: Uuid, content: BlockContent, start: Ticks, length: Ticks) -> Self {
        let start = start.clamped();
        Self {
            id: Uuid::new_v4(),
            track,
            start,
            length: fit_length(start, length),
            muted: false,
            content,
        }
    }

    /// Rebuild a block from saved state, keeping the saved identity.
    pub(crate) fn from_state(track: Uuid, state: &BlockState) -> Self {
        let start = state.pos.clamped();
        Self {
            id: state.id.unwrap_or_else(Uuid::new_v4),
            track,
            start,
            length: fit_length(start, state.len),
            muted: state.muted,
            content: state.content.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Track owning this block.
    pub fn track(&self) -> Uuid {
        self.track
    }

    pub fn start_position(&self) -> Ticks {
        self.start
    }

    pub fn length(&self) -> Ticks {
        self.length
    }

    pub fn end_position(&self) -> Ticks {
        self.start + self.length
    }

    pub fn span(&self) -> TickRange {
        TickRange::new(self.start, self.end_position())
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn content(&self) -> &BlockContent {
        &self.content
    }

    pub(crate) fn attach_to(&mut self, track: Uuid) {
        self.track = track;
    }

    /// Move to `position`, clamped at zero and so that the end stays
    /// representable. Returns whether it moved.
    pub(crate) fn move_to(&mut self, position: Ticks, cx: &mut EditContext<'_>) -> bool {
        let position = position.clamped().min(Ticks::MAX - self.length);
        if position == self.start {
            return false;
        }
        cx.record(
            Owner::Block(self.id),
            JournalAction::Move {
                delta: self.start - position,
            },
        );
        self.start = position;
        cx.emit(TimelineEvent::BlockMoved {
            track: self.track,
            block: self.id,
            position,
        });
        true
    }

    /// Change the length, clamped like [`move_to`](Self::move_to) clamps
    /// the start. Returns whether it changed.
    pub(crate) fn resize(&mut self, length: Ticks, cx: &mut EditContext<'_>) -> bool {
        let length = fit_length(self.start, length);
        if length == self.length {
            return false;
        }
        cx.record(
            Owner::Block(self.id),
            JournalAction::Resize {
                delta: self.length - length,
            },
        );
        self.length = length;
        cx.emit(TimelineEvent::BlockResized {
            track: self.track,
            block: self.id,
            length,
        });
        true
    }

    /// Not journalled: muting a block is a lightweight toggle.
    pub(crate) fn set_muted(&mut self, muted: bool, cx: &mut EditContext<'_>) {
        if self.muted == muted {
            return;
        }
        self.muted = muted;
        cx.emit(TimelineEvent::BlockMuteChanged {
            track: self.track,
            block: self.id,
            muted,
        });
    }

    pub(crate) fn update_content(
        &mut self,
        edit: impl FnOnce(&mut BlockContent),
        cx: &mut EditContext<'_>,
    ) {
        edit(&mut self.content);
        cx.emit(TimelineEvent::BlockContentChanged {
            track: self.track,
            block: self.id,
        });
    }

    pub fn save_state(&self) -> BlockState {
        BlockState {
            node: self.content.node_name().to_owned(),
            id: Some(self.id),
            pos: self.start,
            len: self.length,
            muted: self.muted,
            content: self.content.clone(),
        }
    }

    /// Take over everything but the identity from `state`.
    ///
    /// Position and length changes go through [`move_to`](Self::move_to)
    /// and [`resize`](Self::resize), so they are journalled unless the
    /// caller suspended journalling.
    pub(crate) fn restore_state(&mut self, state: &BlockState, cx: &mut EditContext<'_>) {
        self.move_to(state.pos, cx);
        self.resize(state.len, cx);
        self.set_muted(state.muted, cx);
        if self.content != state.content {
            let content = state.content.clone();
            self.update_content(move |c| *c = content, cx);
        }
    }
}
