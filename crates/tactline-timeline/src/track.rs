//! Tracks: typed, ordered collections of timed blocks.

use serde::{Deserialize, Serialize};
use tactline_core::Ticks;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::block::{BlockContent, BlockState, TimedBlock};
use crate::events::TimelineEvent;
use crate::journal::{EditContext, JournalAction, Owner};

/// Kind of track. Fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    Instrument,
    BeatBassline,
    Sample,
    Automation,
    /// Automation track that is not shown in the arrangement.
    HiddenAutomation,
}

impl TrackType {
    pub const ALL: [TrackType; 5] = [
        Self::Instrument,
        Self::BeatBassline,
        Self::Sample,
        Self::Automation,
        Self::HiddenAutomation,
    ];

    /// Integer discriminant written to documents.
    pub fn discriminant(self) -> u8 {
        match self {
            Self::Instrument => 0,
            Self::BeatBassline => 1,
            Self::Sample => 2,
            Self::Automation => 5,
            Self::HiddenAutomation => 6,
        }
    }

    pub fn from_discriminant(value: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.discriminant() == value)
    }

    /// Document node name of the track type.
    pub fn node_name(self) -> &'static str {
        match self {
            Self::Instrument => "instrumenttrack",
            Self::BeatBassline => "bbtrack",
            Self::Sample => "sampletrack",
            Self::Automation => "automationtrack",
            Self::HiddenAutomation => "hiddenautomationtrack",
        }
    }

    pub fn default_name(self) -> &'static str {
        match self {
            Self::Instrument => "Instrument",
            Self::BeatBassline => "Beat/Bassline",
            Self::Sample => "Sample track",
            Self::Automation | Self::HiddenAutomation => "Automation track",
        }
    }
}

/// Effective playback state of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackStatus {
    Normal,
    Muted,
    Soloed,
}

/// Saved form of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackState {
    /// Track type name, informational only.
    #[serde(default)]
    pub node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Track type discriminant, see [`TrackType::discriminant`].
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub muted: bool,
    #[serde(default)]
    pub solo: bool,
    /// Blocks in list order.
    #[serde(default)]
    pub blocks: Vec<BlockState>,
}

impl TrackState {
    /// Same state with the track and all of its blocks stripped of
    /// their identities.
    pub fn detached(mut self) -> Self {
        self.id = None;
        self.blocks = self.blocks.into_iter().map(BlockState::detached).collect();
        self
    }
}

/// A track holding timed blocks.
///
/// The block list is kept in insertion order, which is not the timeline
/// order; [`blocks_in_range`](Self::blocks_in_range) sorts by start.
#[derive(Debug, Clone)]
pub struct Track {
    id: Uuid,
    name: String,
    kind: TrackType,
    blocks: Vec<TimedBlock>,
    muted: bool,
    solo: bool,
    pub(crate) muted_before_solo: bool,
}

impl Track {
    /// Create an empty, detached track. Hand it to
    /// [`TrackContainer::add_track`](crate::TrackContainer::add_track).
    pub fn new(kind: TrackType, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            blocks: Vec::new(),
            muted: false,
            solo: false,
            muted_before_solo: false,
        }
    }

    /// Build a track from saved state, keeping saved identities.
    ///
    /// Returns `None` for an unknown track type discriminant.
    pub fn from_state(state: &TrackState) -> Option<Self> {
        let kind = TrackType::from_discriminant(state.kind)?;
        let id = state.id.unwrap_or_else(Uuid::new_v4);
        Some(Self {
            id,
            name: state.name.clone(),
            kind,
            blocks: state
                .blocks
                .iter()
                .map(|b| TimedBlock::from_state(id, b))
                .collect(),
            muted: state.muted,
            solo: state.solo,
            muted_before_solo: false,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TrackType {
        self.kind
    }

    /// Blocks in list order.
    pub fn blocks(&self) -> &[TimedBlock] {
        &self.blocks
    }

    pub fn block(&self, id: Uuid) -> Option<&TimedBlock> {
        self.blocks.iter().find(|b| b.id() == id)
    }

    pub fn block_at(&self, index: usize) -> Option<&TimedBlock> {
        self.blocks.get(index)
    }

    /// List index of a block, `None` (with a warning) if the block does
    /// not live on this track.
    pub fn block_index(&self, id: Uuid) -> Option<usize> {
        let index = self.blocks.iter().position(|b| b.id() == id);
        if index.is_none() {
            warn!(track = %self.id, block = %id, "block not found on track");
        }
        index
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_solo(&self) -> bool {
        self.solo
    }

    pub fn state(&self) -> TrackStatus {
        if self.solo {
            TrackStatus::Soloed
        } else if self.muted {
            TrackStatus::Muted
        } else {
            TrackStatus::Normal
        }
    }

    /// Latest end position among the blocks.
    pub fn end_position(&self) -> Ticks {
        self.blocks
            .iter()
            .map(TimedBlock::end_position)
            .max()
            .unwrap_or(Ticks::ZERO)
    }

    /// Track length in whole tacts, rounded down.
    pub fn length(&self) -> i64 {
        self.end_position().tacts()
    }

    /// Blocks whose closed interval overlaps `[start, end]`, ascending by
    /// start position. Blocks with equal starts keep their list order.
    pub fn blocks_in_range(&self, start: Ticks, end: Ticks) -> Vec<&TimedBlock> {
        let mut found: Vec<&TimedBlock> = self
            .blocks
            .iter()
            .filter(|b| b.span().overlaps(start, end))
            .collect();
        found.sort_by_key(|b| b.start_position());
        found
    }

    pub(crate) fn block_mut(&mut self, id: Uuid) -> Option<&mut TimedBlock> {
        self.blocks.iter_mut().find(|b| b.id() == id)
    }

    // ── Block list ──────────────────────────────────────────────

    /// Append a block. Not journalled; the caller records the edit.
    pub(crate) fn add_block(&mut self, mut block: TimedBlock, cx: &mut EditContext<'_>) -> Uuid {
        block.attach_to(self.id);
        let id = block.id();
        self.blocks.push(block);
        cx.emit(TimelineEvent::BlockAdded {
            track: self.id,
            block: id,
        });
        id
    }

    /// Unlink a block. Not journalled.
    pub(crate) fn remove_block(
        &mut self,
        id: Uuid,
        cx: &mut EditContext<'_>,
    ) -> Option<TimedBlock> {
        let Some(index) = self.blocks.iter().position(|b| b.id() == id) else {
            contract_violation!("block {} is not owned by track {}", id, self.id);
            return None;
        };
        let block = self.blocks.remove(index);
        cx.emit(TimelineEvent::BlockRemoved {
            track: self.id,
            block: id,
        });
        Some(block)
    }

    /// Create a block of this track's payload kind at `position`.
    pub(crate) fn create_block(&mut self, position: Ticks, cx: &mut EditContext<'_>) -> Uuid {
        let content = BlockContent::for_track(self.kind);
        let length = content.initial_length();
        let block = TimedBlock::new(self.id, content, position, length);
        self.insert_block(block, cx)
    }

    /// Append a block and journal the addition.
    pub(crate) fn insert_block(&mut self, block: TimedBlock, cx: &mut EditContext<'_>) -> Uuid {
        let id = self.add_block(block, cx);
        cx.record(
            Owner::Track(self.id),
            JournalAction::AddBlock {
                block: id,
                state: None,
            },
        );
        debug!(track = %self.id, block = %id, "block added");
        id
    }

    /// Unlink a block and journal the removal with a snapshot.
    pub(crate) fn delete_block(
        &mut self,
        id: Uuid,
        cx: &mut EditContext<'_>,
    ) -> Option<TimedBlock> {
        let block = self.remove_block(id, cx)?;
        cx.record(
            Owner::Track(self.id),
            JournalAction::RemoveBlock {
                block: id,
                state: Some(block.save_state()),
            },
        );
        debug!(track = %self.id, block = %id, "block removed");
        Some(block)
    }

    /// Exchange two blocks in the list and swap their start positions.
    ///
    /// Afterwards the block formerly at `a` sits at index `b` with `b`'s
    /// old start, and vice versa. Both moves are journalled.
    pub(crate) fn swap_blocks(&mut self, a: usize, b: usize, cx: &mut EditContext<'_>) -> bool {
        if a >= self.blocks.len() || b >= self.blocks.len() {
            warn!(track = %self.id, a, b, "swap index out of range");
            return false;
        }
        if a == b {
            return false;
        }
        self.blocks.swap(a, b);
        let first_start = self.blocks[a].start_position();
        let second_start = self.blocks[b].start_position();
        self.blocks[a].move_to(second_start, cx);
        self.blocks[b].move_to(first_start, cx);
        true
    }

    /// Shift every block starting at or after `position` by
    /// `delta_tacts` tacts. Results are clamped at zero.
    pub(crate) fn shift_after(&mut self, position: Ticks, delta_tacts: i64, cx: &mut EditContext<'_>) {
        let delta = Ticks::from_tacts(delta_tacts);
        for block in &mut self.blocks {
            if block.start_position() >= position {
                let target = block.start_position() + delta;
                block.move_to(target, cx);
            }
        }
    }

    // ── Mute / solo flags ───────────────────────────────────────

    /// Set both flags, emitting a notification if either changed.
    pub(crate) fn set_mute_solo(&mut self, muted: bool, solo: bool, cx: &mut EditContext<'_>) {
        if self.muted == muted && self.solo == solo {
            return;
        }
        self.muted = muted;
        self.solo = solo;
        cx.emit(TimelineEvent::TrackMuteSoloChanged {
            track: self.id,
            muted,
            solo,
        });
    }

    // ── State ───────────────────────────────────────────────────

    pub fn save_state(&self) -> TrackState {
        TrackState {
            node: self.kind.node_name().to_owned(),
            id: Some(self.id),
            kind: self.kind.discriminant(),
            name: self.name.clone(),
            muted: self.muted,
            solo: self.solo,
            blocks: self.blocks.iter().map(TimedBlock::save_state).collect(),
        }
    }

    /// Replace name, flags and blocks with `state`. The track keeps its
    /// identity and type; a type mismatch is reported and restoration
    /// continues with whatever fits.
    pub(crate) fn restore_state(&mut self, state: &TrackState, cx: &mut EditContext<'_>) {
        if state.kind != self.kind.discriminant() {
            warn!(
                track = %self.id,
                expected = self.kind.discriminant(),
                found = state.kind,
                "track type mismatch while restoring"
            );
        }
        self.name = state.name.clone();
        self.set_mute_solo(state.muted, state.solo, cx);

        for block in std::mem::take(&mut self.blocks) {
            cx.emit(TimelineEvent::BlockRemoved {
                track: self.id,
                block: block.id(),
            });
        }
        for saved in &state.blocks {
            let block = TimedBlock::from_state(self.id, saved);
            self.add_block(block, cx);
        }
    }

    /// Remove all blocks, last first, announcing each removal.
    pub(crate) fn drain_blocks(&mut self, cx: &mut EditContext<'_>) {
        while let Some(block) = self.blocks.pop() {
            cx.emit(TimelineEvent::BlockRemoved {
                track: self.id,
                block: block.id(),
            });
        }
    }
}
