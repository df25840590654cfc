//! The structural-edit lock shared with playback.
//!
//! The container publishes a flattened [`PlaybackTopology`] behind one
//! mutex. Structural edits hold that mutex for their whole duration, so
//! a playback pass that takes it sees either the topology before an
//! edit or the one after, never a mixture.
//!
//! Structural edits rebuild the whole topology under the lock. Edits
//! inside one track (move, resize, block mute) replace only that track's
//! layout, and mute/solo changes only touch the per-track mute flags.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use tactline_core::{TickRange, Ticks};
use uuid::Uuid;

use crate::track::{Track, TrackType};

/// One block as playback sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub id: Uuid,
    pub start: Ticks,
    pub end: Ticks,
    pub muted: bool,
}

/// One track as playback sees it, blocks sorted by start.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLayout {
    pub id: Uuid,
    pub kind: TrackType,
    pub muted: bool,
    /// Latest block end on the track.
    pub end: Ticks,
    pub blocks: Vec<BlockSpan>,
}

impl TrackLayout {
    fn of(track: &Track) -> Self {
        let mut blocks: Vec<BlockSpan> = track
            .blocks()
            .iter()
            .map(|b| BlockSpan {
                id: b.id(),
                start: b.start_position(),
                end: b.end_position(),
                muted: b.is_muted(),
            })
            .collect();
        blocks.sort_by_key(|b| b.start);
        Self {
            id: track.id(),
            kind: track.kind(),
            muted: track.is_muted(),
            end: blocks.iter().map(|b| b.end).max().unwrap_or(Ticks::ZERO),
            blocks,
        }
    }
}

/// A block that sounds inside a queried window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveBlock {
    pub track: Uuid,
    pub block: Uuid,
    pub start: Ticks,
    pub end: Ticks,
}

/// Read-only view of the arrangement for the playback thread.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackTopology {
    pub tracks: Vec<TrackLayout>,
    /// Arrangement length in whole tacts.
    pub length_tacts: i64,
    /// Bumped on every publish.
    pub revision: u64,
}

impl PlaybackTopology {
    pub(crate) fn rebuild(&mut self, tracks: &[Track]) {
        self.tracks.clear();
        self.tracks.extend(tracks.iter().map(TrackLayout::of));
        self.refresh_length();
        self.revision += 1;
    }

    /// Replace the layout of the track at `index`.
    pub(crate) fn update_track(&mut self, index: usize, track: &Track) {
        match self.tracks.get_mut(index) {
            Some(layout) if layout.id == track.id() => *layout = TrackLayout::of(track),
            _ => {
                contract_violation!("published topology has no track {} at {}", track.id(), index);
                return;
            }
        }
        self.refresh_length();
        self.revision += 1;
    }

    /// Copy every track's effective mute flag.
    pub(crate) fn update_mutes(&mut self, tracks: &[Track]) {
        for (layout, track) in self.tracks.iter_mut().zip(tracks) {
            layout.muted = track.is_muted();
        }
        self.revision += 1;
    }

    fn refresh_length(&mut self) {
        self.length_tacts = self.tracks.iter().map(|t| t.end.tacts()).max().unwrap_or(0);
    }

    pub fn block_count(&self) -> usize {
        self.tracks.iter().map(|t| t.blocks.len()).sum()
    }

    /// Unmuted blocks on unmuted tracks overlapping `window`, in track
    /// order then start order.
    pub fn sounding_in(&self, window: TickRange) -> Vec<ActiveBlock> {
        self.tracks
            .iter()
            .filter(|t| !t.muted)
            .flat_map(move |t| {
                t.blocks
                    .iter()
                    .filter(move |b| !b.muted && window.overlaps(b.start, b.end))
                    .map(move |b| ActiveBlock {
                        track: t.id,
                        block: b.id,
                        start: b.start,
                        end: b.end,
                    })
            })
            .collect()
    }
}

/// Handle to the structural-edit lock. Cheap to clone; every clone
/// refers to the same topology.
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    topology: Arc<Mutex<PlaybackTopology>>,
}

impl EngineContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the structural-edit lock.
    pub fn lock(&self) -> MutexGuard<'_, PlaybackTopology> {
        self.topology.lock()
    }

    /// Copy of the currently published topology.
    pub fn snapshot(&self) -> PlaybackTopology {
        self.topology.lock().clone()
    }

    pub fn revision(&self) -> u64 {
        self.topology.lock().revision
    }

    /// Whether both handles share one lock.
    pub fn same_as(&self, other: &EngineContext) -> bool {
        Arc::ptr_eq(&self.topology, &other.topology)
    }
}
