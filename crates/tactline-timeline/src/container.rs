//! The track container: arrangement-level editing.
//!
//! [`TrackContainer`] is the only mutation surface of the arrangement.
//! Every operation records its journal entry, emits notifications and
//! republishes the playback topology. Operations that change the shape
//! of the arrangement (tracks or blocks appearing, disappearing or
//! being reordered) run entirely under the structural-edit lock; the
//! others edit first and take the lock only to republish.

use crossbeam_channel::Receiver;
use serde::{Deserialize, Serialize};
use tactline_core::{Ticks, TimelineConfig};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::block::{BlockContent, TimedBlock};
use crate::clipboard::Clipboard;
use crate::engine::EngineContext;
use crate::events::{EventBus, TimelineEvent};
use crate::journal::{EditContext, Journal, JournalAction, JournalEntry, Owner};
use crate::solo;
use crate::track::{Track, TrackState, TrackType};

/// Saved form of a container: its tracks in list order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerState {
    pub tracks: Vec<TrackState>,
}

/// An ordered collection of tracks plus everything needed to edit it.
#[derive(Debug)]
pub struct TrackContainer {
    tracks: Vec<Track>,
    journal: Journal,
    events: EventBus,
    engine: EngineContext,
    clipboard: Clipboard,
    /// Last announced length in tacts.
    length: i64,
}

impl TrackContainer {
    /// Create an empty container publishing to `engine`.
    pub fn new(engine: EngineContext, config: &TimelineConfig) -> Self {
        let container = Self {
            tracks: Vec::new(),
            journal: Journal::new(config.journal_depth),
            events: EventBus::new(config.event_capacity),
            engine,
            clipboard: Clipboard::default(),
            length: 0,
        };
        container.engine.lock().rebuild(&container.tracks);
        info!(journal_depth = config.journal_depth, "track container created");
        container
    }

    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        self.events.subscribe()
    }

    // ── Queries ─────────────────────────────────────────────────

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    pub fn track_at(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn track_index(&self, id: Uuid) -> Option<usize> {
        self.tracks.iter().position(|t| t.id() == id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Find a block on any track.
    pub fn block(&self, id: Uuid) -> Option<&TimedBlock> {
        self.tracks.iter().find_map(|t| t.block(id))
    }

    /// Total length in whole tacts: the latest block end on any track.
    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn engine(&self) -> &EngineContext {
        &self.engine
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn can_undo(&self) -> bool {
        self.journal.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.journal.can_redo()
    }

    pub fn clipboard(&self) -> &Clipboard {
        &self.clipboard
    }

    // ── Edit plumbing ───────────────────────────────────────────

    fn edit<R>(&mut self, edit: impl FnOnce(&mut Vec<Track>, &mut EditContext<'_>) -> R) -> R {
        let mut cx = EditContext::new(&mut self.journal, &mut self.events);
        edit(&mut self.tracks, &mut cx)
    }

    /// Run a topology change with the structural-edit lock held until
    /// the new topology is published.
    fn structural<R>(
        &mut self,
        edit: impl FnOnce(&mut Vec<Track>, &mut EditContext<'_>) -> R,
    ) -> R {
        let engine = self.engine.clone();
        let mut topology = engine.lock();
        let result = self.edit(edit);
        topology.rebuild(&self.tracks);
        let length = topology.length_tacts;
        drop(topology);
        self.update_length(length);
        result
    }

    /// Republish one track after its blocks changed in place.
    fn publish_track(&mut self, index: usize) {
        let length = {
            let mut topology = self.engine.lock();
            topology.update_track(index, &self.tracks[index]);
            topology.length_tacts
        };
        self.update_length(length);
    }

    /// Republish every track's effective mute flag.
    fn publish_mutes(&mut self) {
        self.engine.lock().update_mutes(&self.tracks);
    }

    fn update_length(&mut self, length: i64) {
        if length != self.length {
            self.length = length;
            self.events.emit(TimelineEvent::LengthChanged { tacts: length });
        }
    }

    fn update_after_track_add(&mut self, track: Uuid) {
        debug!(%track, tracks = self.tracks.len(), "track added");
    }

    /// Index of a track the caller claims is in this container.
    fn require_track(&self, id: Uuid) -> Option<usize> {
        let index = self.track_index(id);
        if index.is_none() {
            contract_violation!("track {} is not in this container", id);
        }
        index
    }

    fn block_track(&self, block: Uuid) -> Option<usize> {
        let index = self.tracks.iter().position(|t| t.block(block).is_some());
        if index.is_none() {
            warn!(%block, "block not found");
        }
        index
    }

    /// Edit a block in place. Returns the owning track's index alongside
    /// the edit's result.
    fn with_block<R>(
        &mut self,
        id: Uuid,
        edit: impl FnOnce(&mut TimedBlock, &mut EditContext<'_>) -> R,
    ) -> Option<(usize, R)> {
        let result = self.edit(|tracks, cx| {
            let (index, block) = tracks
                .iter_mut()
                .enumerate()
                .find_map(|(i, t)| Some((i, t.block_mut(id)?)))?;
            Some((index, edit(block, cx)))
        });
        if result.is_none() {
            warn!(block = %id, "block not found");
        }
        result
    }

    // ── Tracks ──────────────────────────────────────────────────

    /// Append a new, empty track of `kind`.
    pub fn create_track(&mut self, kind: TrackType) -> Uuid {
        self.add_track(Track::new(kind, kind.default_name()))
    }

    /// Append a track built by the caller.
    pub fn add_track(&mut self, track: Track) -> Uuid {
        let id = track.id();
        self.structural(|tracks, cx| {
            let index = tracks.len();
            announce_track(&track, cx);
            tracks.push(track);
            cx.record(
                Owner::Container,
                JournalAction::AddTrack {
                    track: id,
                    index,
                    state: None,
                },
            );
        });
        self.update_after_track_add(id);
        id
    }

    /// Remove a track and all of its blocks. A soloed track leaves the
    /// solo domain first.
    pub fn remove_track(&mut self, id: Uuid) -> bool {
        let Some(index) = self.require_track(id) else {
            return false;
        };
        self.structural(|tracks, cx| {
            let state = detach_track(tracks, index, cx);
            cx.record(
                Owner::Container,
                JournalAction::RemoveTrack {
                    track: id,
                    index,
                    state: Some(state),
                },
            );
        });
        debug!(track = %id, "track removed");
        true
    }

    /// Append a copy of a track with fresh identities for the track and
    /// its blocks. The copy is never soloed.
    pub fn clone_track(&mut self, id: Uuid) -> Option<Uuid> {
        let index = self.require_track(id)?;
        let mut state = self.tracks[index].save_state().detached();
        state.solo = false;
        let copy = Track::from_state(&state)?;
        Some(self.add_track(copy))
    }

    pub fn move_track_up(&mut self, id: Uuid) -> bool {
        self.move_track_by(id, -1)
    }

    pub fn move_track_down(&mut self, id: Uuid) -> bool {
        self.move_track_by(id, 1)
    }

    fn move_track_by(&mut self, id: Uuid, offset: i64) -> bool {
        let Some(from) = self.require_track(id) else {
            return false;
        };
        let to = from as i64 + offset;
        if to < 0 || to >= self.tracks.len() as i64 {
            return false;
        }
        let to = to as usize;
        self.structural(|tracks, cx| {
            move_track(tracks, from, to, cx);
            cx.record(
                Owner::Track(id),
                JournalAction::MoveTrack {
                    delta: from as i64 - to as i64,
                },
            );
        });
        true
    }

    /// Set a track's own mute flag. Not journalled.
    pub fn set_track_muted(&mut self, id: Uuid, muted: bool) -> bool {
        let Some(index) = self.require_track(id) else {
            return false;
        };
        self.edit(|tracks, cx| {
            let solo = tracks[index].is_solo();
            tracks[index].set_mute_solo(muted, solo, cx);
        });
        self.publish_mutes();
        true
    }

    /// Enter or leave the solo domain. Not journalled.
    pub fn set_solo(&mut self, id: Uuid, solo: bool) -> bool {
        let Some(index) = self.require_track(id) else {
            return false;
        };
        self.edit(|tracks, cx| solo::set_solo(tracks, index, solo, cx));
        self.publish_mutes();
        true
    }

    /// Flip a track's solo flag. Returns the new flag.
    pub fn toggle_solo(&mut self, id: Uuid) -> Option<bool> {
        let solo = !self.track(id).map(Track::is_solo)?;
        self.set_solo(id, solo).then_some(solo)
    }

    // ── Blocks ──────────────────────────────────────────────────

    /// Create a block of the track's payload kind at `position`.
    pub fn create_block(&mut self, track: Uuid, position: Ticks) -> Option<Uuid> {
        let index = self.require_track(track)?;
        Some(self.structural(|tracks, cx| tracks[index].create_block(position, cx)))
    }

    /// Remove a block from the track that owns it.
    pub fn remove_block(&mut self, track: Uuid, block: Uuid) -> bool {
        let Some(index) = self.require_track(track) else {
            return false;
        };
        self.structural(|tracks, cx| tracks[index].delete_block(block, cx).is_some())
    }

    pub fn move_block(&mut self, block: Uuid, position: Ticks) -> bool {
        match self.with_block(block, |b, cx| b.move_to(position, cx)) {
            Some((index, true)) => {
                self.publish_track(index);
                true
            }
            _ => false,
        }
    }

    pub fn resize_block(&mut self, block: Uuid, length: Ticks) -> bool {
        match self.with_block(block, |b, cx| b.resize(length, cx)) {
            Some((index, true)) => {
                self.publish_track(index);
                true
            }
            _ => false,
        }
    }

    pub fn set_block_muted(&mut self, block: Uuid, muted: bool) -> bool {
        let Some((index, ())) = self.with_block(block, |b, cx| b.set_muted(muted, cx)) else {
            return false;
        };
        self.publish_track(index);
        true
    }

    /// Flip a block's mute flag. Returns the new flag.
    pub fn toggle_block_mute(&mut self, block: Uuid) -> Option<bool> {
        let muted = !self.block(block)?.is_muted();
        self.set_block_muted(block, muted).then_some(muted)
    }

    /// Edit a block's payload in place. Not journalled.
    pub fn update_block_content(
        &mut self,
        block: Uuid,
        edit: impl FnOnce(&mut BlockContent),
    ) -> bool {
        self.with_block(block, |b, cx| b.update_content(edit, cx))
            .is_some()
    }

    /// Add a copy of a block to the same track, at the same position.
    pub fn clone_block(&mut self, block: Uuid) -> Option<Uuid> {
        let index = self.block_track(block)?;
        let state = self.tracks[index].block(block)?.save_state().detached();
        Some(self.structural(|tracks, cx| {
            let track = &mut tracks[index];
            let copy = TimedBlock::from_state(track.id(), &state);
            track.insert_block(copy, cx)
        }))
    }

    /// Exchange the blocks at two list indices, positions included.
    pub fn swap_blocks(&mut self, track: Uuid, a: usize, b: usize) -> bool {
        let Some(index) = self.require_track(track) else {
            return false;
        };
        self.structural(|tracks, cx| tracks[index].swap_blocks(a, b, cx))
    }

    /// Shift the blocks of one track starting at or after `position`.
    pub fn shift_blocks_after(&mut self, track: Uuid, position: Ticks, delta_tacts: i64) -> bool {
        let Some(index) = self.require_track(track) else {
            return false;
        };
        self.structural(|tracks, cx| tracks[index].shift_after(position, delta_tacts, cx));
        true
    }

    /// Insert one tact at `position` on every track.
    pub fn insert_tact(&mut self, position: Ticks) {
        self.structural(|tracks, cx| {
            for track in tracks.iter_mut() {
                track.shift_after(position, 1, cx);
            }
        });
    }

    /// Remove one tact at `position` on every track. Blocks that would
    /// start before zero stop at zero.
    pub fn remove_tact(&mut self, position: Ticks) {
        self.structural(|tracks, cx| {
            for track in tracks.iter_mut() {
                track.shift_after(position, -1, cx);
            }
        });
    }

    /// The block at list `index` of a track. An index past the end is
    /// answered with a fresh placeholder block at `index` tacts; the
    /// placeholder is not journalled.
    pub fn block_or_create(&mut self, track: Uuid, index: usize) -> Option<Uuid> {
        let t = self.require_track(track)?;
        if let Some(block) = self.tracks[t].block_at(index) {
            return Some(block.id());
        }
        warn!(%track, index, "block index out of range, creating placeholder");
        let position = Ticks::from_tacts(i64::try_from(index).unwrap_or(i64::MAX));
        Some(self.structural(|tracks, cx| cx.silently(|cx| tracks[t].create_block(position, cx))))
    }

    /// List index of a block on a track.
    pub fn block_index(&self, track: Uuid, block: Uuid) -> Option<usize> {
        let t = self.require_track(track)?;
        self.tracks[t].block_index(block)
    }

    // ── Clipboard ───────────────────────────────────────────────

    pub fn copy_block(&mut self, block: Uuid) -> bool {
        let Some(state) = self.block(block).map(TimedBlock::save_state) else {
            warn!(%block, "cannot copy missing block");
            return false;
        };
        self.clipboard.store(state);
        true
    }

    /// Copy a block to the clipboard and remove it. The removal is
    /// journalled.
    pub fn cut_block(&mut self, block: Uuid) -> bool {
        if !self.copy_block(block) {
            return false;
        }
        let Some(index) = self.block_track(block) else {
            return false;
        };
        self.structural(|tracks, cx| tracks[index].delete_block(block, cx).is_some())
    }

    /// Create a block from the clipboard at `position`. Refused when the
    /// clipboard payload does not belong on the track's type.
    pub fn paste_block(&mut self, track: Uuid, position: Ticks) -> Option<Uuid> {
        let index = self.require_track(track)?;
        let Some(mut state) = self.clipboard.content().cloned() else {
            debug!("clipboard is empty");
            return None;
        };
        let kind = self.tracks[index].kind();
        if !state.content.fits(kind) {
            warn!(
                %track,
                content = state.content.node_name(),
                track_type = kind.node_name(),
                "clipboard content does not fit track, paste refused"
            );
            return None;
        }
        state.pos = position;
        Some(self.structural(|tracks, cx| {
            let track = &mut tracks[index];
            let block = TimedBlock::from_state(track.id(), &state);
            track.insert_block(block, cx)
        }))
    }

    // ── Undo / redo ─────────────────────────────────────────────

    /// Undo the most recent edit of any entity. Entries whose object is
    /// currently gone are parked and skipped.
    pub fn undo(&mut self) -> bool {
        while let Some(entry) = self.journal.pop_undo() {
            if self.replay(entry, true) {
                return true;
            }
        }
        false
    }

    /// Redo the most recently undone edit of any entity, skipping parked
    /// entries like [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        while let Some(entry) = self.journal.pop_redo() {
            if self.replay(entry, false) {
                return true;
            }
        }
        false
    }

    /// Undo the most recent edit of one entity.
    pub fn undo_entity(&mut self, owner: Owner) -> bool {
        match self.journal.pop_undo_for(owner) {
            Some(entry) => self.replay(entry, true),
            None => false,
        }
    }

    pub fn redo_entity(&mut self, owner: Owner) -> bool {
        match self.journal.pop_redo_for(owner) {
            Some(entry) => self.replay(entry, false),
            None => false,
        }
    }

    fn replay(&mut self, entry: JournalEntry, undo: bool) -> bool {
        let stale = entry.clone();
        let reverse = self.structural(|tracks, cx| cx.silently(|cx| revert(tracks, entry, cx)));
        let Some(reverse) = reverse else {
            debug!(owner = ?stale.owner, "journal entry refers to a missing object, parked");
            if undo {
                self.journal.park_undo(stale);
            } else {
                self.journal.park_redo(stale);
            }
            return false;
        };
        if undo {
            self.journal.push_redo(reverse);
        } else {
            self.journal.push_undo(reverse);
        }
        true
    }

    // ── State ───────────────────────────────────────────────────

    pub fn save_state(&self) -> ContainerState {
        ContainerState {
            tracks: self.tracks.iter().map(Track::save_state).collect(),
        }
    }

    /// Replace every track with the saved ones. Not journalled, and the
    /// existing history is dropped. Tracks of unknown type are skipped.
    pub fn restore_state(&mut self, state: &ContainerState) {
        self.structural(|tracks, cx| {
            cx.silently(|cx| {
                clear_tracks(tracks, cx);
                for saved in &state.tracks {
                    match Track::from_state(saved) {
                        Some(track) => {
                            announce_track(&track, cx);
                            tracks.push(track);
                        }
                        None => warn!(kind = saved.kind, name = %saved.name, "unknown track type, skipped"),
                    }
                }
            })
        });
        self.journal.clear();
        info!(tracks = self.tracks.len(), "arrangement restored");
    }

    /// Restore one existing track from saved state, keeping its identity.
    /// A saved solo flag goes through the solo domain like
    /// [`set_solo`](Self::set_solo).
    pub fn restore_track_state(&mut self, track: Uuid, state: &TrackState) -> bool {
        let Some(index) = self.require_track(track) else {
            return false;
        };
        self.structural(|tracks, cx| {
            cx.silently(|cx| {
                solo::set_solo(tracks, index, false, cx);
                tracks[index].restore_state(state, cx);
                let muted = tracks[index].is_muted();
                tracks[index].set_mute_solo(muted, false, cx);
                if tracks.iter().any(Track::is_solo) {
                    // inside someone else's solo: remember the saved mute,
                    // stay silent
                    tracks[index].muted_before_solo = muted;
                    tracks[index].set_mute_solo(true, false, cx);
                }
                if state.solo {
                    solo::set_solo(tracks, index, true, cx);
                }
            })
        });
        true
    }

    /// Remove every track, last first, each one emptied before it goes.
    pub fn clear(&mut self) {
        self.structural(|tracks, cx| cx.silently(|cx| clear_tracks(tracks, cx)));
        self.journal.clear();
    }
}

impl Default for TrackContainer {
    fn default() -> Self {
        Self::new(EngineContext::new(), &TimelineConfig::default())
    }
}

impl Drop for TrackContainer {
    fn drop(&mut self) {
        if !self.tracks.is_empty() {
            self.clear();
        }
    }
}

// ── Free helpers ────────────────────────────────────────────────
//
// These take the track list and the edit context separately so both can
// be borrowed from the container at once.

fn announce_track(track: &Track, cx: &mut EditContext<'_>) {
    cx.emit(TimelineEvent::TrackAdded { track: track.id() });
    for block in track.blocks() {
        cx.emit(TimelineEvent::BlockAdded {
            track: track.id(),
            block: block.id(),
        });
    }
}

/// Take a track out of the list and return its last state.
fn detach_track(tracks: &mut Vec<Track>, index: usize, cx: &mut EditContext<'_>) -> TrackState {
    if tracks[index].is_solo() {
        solo::set_solo(tracks, index, false, cx);
    }
    let mut track = tracks.remove(index);
    let state = track.save_state();
    track.drain_blocks(cx);
    cx.emit(TimelineEvent::TrackRemoved { track: track.id() });
    state
}

fn clear_tracks(tracks: &mut Vec<Track>, cx: &mut EditContext<'_>) {
    while let Some(mut track) = tracks.pop() {
        track.drain_blocks(cx);
        cx.emit(TimelineEvent::TrackRemoved { track: track.id() });
    }
}

fn move_track(tracks: &mut Vec<Track>, from: usize, to: usize, cx: &mut EditContext<'_>) {
    let track = tracks.remove(from);
    let id = track.id();
    tracks.insert(to, track);
    cx.emit(TimelineEvent::TrackMoved { track: id, index: to });
}

/// Apply the undo path of `entry` and return the entry that reverses
/// what was just done. `None` if the entry's object no longer exists.
fn revert(
    tracks: &mut Vec<Track>,
    entry: JournalEntry,
    cx: &mut EditContext<'_>,
) -> Option<JournalEntry> {
    let JournalEntry { owner, mut action } = entry;
    match (owner, &mut action) {
        (Owner::Block(id), JournalAction::Move { delta }) => {
            let block = tracks.iter_mut().find_map(|t| t.block_mut(id))?;
            let target = block.start_position() + *delta;
            block.move_to(target, cx);
        }
        (Owner::Block(id), JournalAction::Resize { delta }) => {
            let block = tracks.iter_mut().find_map(|t| t.block_mut(id))?;
            let target = block.length() + *delta;
            block.resize(target, cx);
        }
        (Owner::Track(id), JournalAction::AddBlock { block, state }) => {
            let track = tracks.iter_mut().find(|t| t.id() == id)?;
            track.block(*block)?;
            let removed = track.remove_block(*block, cx)?;
            *state = Some(removed.save_state());
        }
        (Owner::Track(id), JournalAction::RemoveBlock { state, .. }) => {
            let track = tracks.iter_mut().find(|t| t.id() == id)?;
            let block = TimedBlock::from_state(track.id(), state.as_ref()?);
            track.add_block(block, cx);
        }
        (Owner::Track(id), JournalAction::MoveTrack { delta }) => {
            let from = tracks.iter().position(|t| t.id() == id)?;
            let last = tracks.len() as i64 - 1;
            let to = (from as i64 + *delta).clamp(0, last) as usize;
            move_track(tracks, from, to, cx);
        }
        (
            Owner::Container,
            JournalAction::AddTrack {
                track,
                index,
                state,
            },
        ) => {
            let at = tracks.iter().position(|t| t.id() == *track)?;
            *index = at;
            *state = Some(detach_track(tracks, at, cx));
        }
        (Owner::Container, JournalAction::RemoveTrack { index, state, .. }) => {
            let track = Track::from_state(state.as_ref()?)?;
            let at = (*index).min(tracks.len());
            announce_track(&track, cx);
            tracks.insert(at, track);
        }
        (owner, action) => {
            warn!(?owner, ?action, "journal entry does not apply to its owner");
            return None;
        }
    }
    action.invert();
    Some(JournalEntry::new(owner, action))
}
