//! Undo/redo journal.
//!
//! Every journalled entity (a block, a track, or the container itself)
//! owns an undo and a redo stack. A global ordering on top of them lets
//! the container undo "the most recent edit" regardless of which entity
//! recorded it, while entity-scoped undo/redo is still available.
//!
//! Move/Resize/MoveTrack entries store a signed delta, not a snapshot.
//! Undo applies the delta to the current value; redo negates the delta
//! and replays the undo path. Add/Remove entries carry a full state
//! snapshot so a removed object can be rebuilt with its identity intact.
//!
//! An entry whose object is currently gone (a block removed by an
//! entity-scoped undo of its track, say) is parked: it goes back on its
//! owner's stack but leaves the global order, so global undo skips it and
//! entity-scoped undo finds it again once the object is back.

use std::collections::{HashMap, VecDeque};
use std::ops::{Deref, DerefMut};

use tactline_core::Ticks;
use tracing::trace;
use uuid::Uuid;

use crate::block::BlockState;
use crate::events::{EventBus, TimelineEvent};
use crate::track::TrackState;

// ── Entries ─────────────────────────────────────────────────────

/// The entity a journal entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    Container,
    Track(Uuid),
    Block(Uuid),
}

/// A reversible edit. How it is undone depends on the owner kind.
#[derive(Debug, Clone, PartialEq)]
pub enum JournalAction {
    /// Block moved; `delta = old_position - new_position`.
    Move { delta: Ticks },
    /// Block resized; `delta = old_length - new_length`.
    Resize { delta: Ticks },
    /// Block added to the owning track. `state` is filled in when the
    /// addition is undone, so redo can rebuild the block.
    AddBlock {
        block: Uuid,
        state: Option<BlockState>,
    },
    /// Block removed from the owning track.
    RemoveBlock {
        block: Uuid,
        state: Option<BlockState>,
    },
    /// Track added to the container at `index`.
    AddTrack {
        track: Uuid,
        index: usize,
        state: Option<TrackState>,
    },
    /// Track removed from the container at `index`.
    RemoveTrack {
        track: Uuid,
        index: usize,
        state: Option<TrackState>,
    },
    /// Track reordered; `delta = old_index - new_index`.
    MoveTrack { delta: i64 },
}

impl JournalAction {
    /// Turn the action into its mirror image: deltas are negated and
    /// add/remove pairs swap. Replaying the undo path of the inverted
    /// action performs a redo.
    pub fn invert(&mut self) {
        let inverted = match std::mem::replace(self, Self::MoveTrack { delta: 0 }) {
            Self::Move { delta } => Self::Move { delta: -delta },
            Self::Resize { delta } => Self::Resize { delta: -delta },
            Self::MoveTrack { delta } => Self::MoveTrack { delta: -delta },
            Self::AddBlock { block, state } => Self::RemoveBlock { block, state },
            Self::RemoveBlock { block, state } => Self::AddBlock { block, state },
            Self::AddTrack {
                track,
                index,
                state,
            } => Self::RemoveTrack {
                track,
                index,
                state,
            },
            Self::RemoveTrack {
                track,
                index,
                state,
            } => Self::AddTrack {
                track,
                index,
                state,
            },
        };
        *self = inverted;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub owner: Owner,
    pub action: JournalAction,
}

impl JournalEntry {
    pub fn new(owner: Owner, action: JournalAction) -> Self {
        Self { owner, action }
    }
}

// ── Journal ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct History {
    undo: VecDeque<JournalAction>,
    redo: Vec<JournalAction>,
}

/// Undo/redo log for one arrangement.
#[derive(Debug)]
pub struct Journal {
    histories: HashMap<Owner, History>,
    /// Owners of undoable entries, oldest first.
    undo_order: VecDeque<Owner>,
    /// Owners of redoable entries, oldest first.
    redo_order: Vec<Owner>,
    suspended: bool,
    max_depth: usize,
}

impl Journal {
    /// Create a journal keeping at most `max_depth` undo steps.
    pub fn new(max_depth: usize) -> Self {
        Self {
            histories: HashMap::new(),
            undo_order: VecDeque::new(),
            redo_order: Vec::new(),
            suspended: false,
            max_depth: max_depth.max(1),
        }
    }

    /// Whether an entry recorded right now would be kept.
    pub fn is_recording(&self) -> bool {
        !self.suspended
    }

    /// Record a fresh edit. Clears the owner's redo stack.
    ///
    /// Returns false if journalling is suspended.
    pub fn record(&mut self, entry: JournalEntry) -> bool {
        if !self.is_recording() {
            trace!(owner = ?entry.owner, "journalling suspended, entry discarded");
            return false;
        }
        let history = self.histories.entry(entry.owner).or_default();
        history.redo.clear();
        self.redo_order.retain(|owner| *owner != entry.owner);
        self.push_undo(entry);
        true
    }

    /// Pop the most recent undoable entry across all owners.
    pub fn pop_undo(&mut self) -> Option<JournalEntry> {
        let owner = self.undo_order.pop_back()?;
        let action = self.histories.get_mut(&owner)?.undo.pop_back()?;
        Some(JournalEntry::new(owner, action))
    }

    /// Pop the most recent undoable entry of one owner.
    pub fn pop_undo_for(&mut self, owner: Owner) -> Option<JournalEntry> {
        let action = self.histories.get_mut(&owner)?.undo.pop_back()?;
        if let Some(pos) = self.undo_order.iter().rposition(|o| *o == owner) {
            self.undo_order.remove(pos);
        }
        Some(JournalEntry::new(owner, action))
    }

    /// Pop the most recently undone entry across all owners.
    pub fn pop_redo(&mut self) -> Option<JournalEntry> {
        let owner = self.redo_order.pop()?;
        let action = self.histories.get_mut(&owner)?.redo.pop()?;
        Some(JournalEntry::new(owner, action))
    }

    /// Pop the most recently undone entry of one owner.
    pub fn pop_redo_for(&mut self, owner: Owner) -> Option<JournalEntry> {
        let action = self.histories.get_mut(&owner)?.redo.pop()?;
        if let Some(pos) = self.redo_order.iter().rposition(|o| *o == owner) {
            self.redo_order.remove(pos);
        }
        Some(JournalEntry::new(owner, action))
    }

    /// Store an entry that has just been undone.
    pub fn push_redo(&mut self, entry: JournalEntry) {
        self.histories
            .entry(entry.owner)
            .or_default()
            .redo
            .push(entry.action);
        self.redo_order.push(entry.owner);
    }

    /// Store an entry that has just been redone. Unlike [`record`](Self::record)
    /// this keeps the redo history and ignores suspension.
    pub fn push_undo(&mut self, entry: JournalEntry) {
        self.histories
            .entry(entry.owner)
            .or_default()
            .undo
            .push_back(entry.action);
        self.undo_order.push_back(entry.owner);

        if self.undo_order.len() > self.max_depth {
            if let Some(oldest) = self.undo_order.pop_front() {
                if let Some(history) = self.histories.get_mut(&oldest) {
                    history.undo.pop_front();
                }
            }
        }
    }

    /// Put back an undo entry that could not be applied. It stays on its
    /// owner's stack but is skipped by [`pop_undo`](Self::pop_undo).
    pub fn park_undo(&mut self, entry: JournalEntry) {
        trace!(owner = ?entry.owner, "undo entry parked");
        self.histories
            .entry(entry.owner)
            .or_default()
            .undo
            .push_back(entry.action);
    }

    /// Redo counterpart of [`park_undo`](Self::park_undo).
    pub fn park_redo(&mut self, entry: JournalEntry) {
        trace!(owner = ?entry.owner, "redo entry parked");
        self.histories
            .entry(entry.owner)
            .or_default()
            .redo
            .push(entry.action);
    }

    /// Suspend journalling until the guard drops.
    pub fn suspend(&mut self) -> Suspended<'_> {
        let previous = std::mem::replace(&mut self.suspended, true);
        Suspended {
            journal: self,
            previous,
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_order.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_order.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_order.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_order.len()
    }

    /// Number of undo steps recorded for one owner.
    pub fn undo_count_for(&self, owner: Owner) -> usize {
        self.histories.get(&owner).map_or(0, |h| h.undo.len())
    }

    /// Drop all history. Suspension state is left untouched.
    pub fn clear(&mut self) {
        self.histories.clear();
        self.undo_order.clear();
        self.redo_order.clear();
    }
}

impl Default for Journal {
    fn default() -> Self {
        Self::new(200)
    }
}

// ── Scoped suspension ───────────────────────────────────────────

/// Guard returned by [`Journal::suspend`].
///
/// Dereferences to the journal; the previous suspension state comes back
/// on drop, whichever way the scope is left.
#[derive(Debug)]
pub struct Suspended<'a> {
    journal: &'a mut Journal,
    previous: bool,
}

impl Deref for Suspended<'_> {
    type Target = Journal;
    fn deref(&self) -> &Journal {
        self.journal
    }
}

impl DerefMut for Suspended<'_> {
    fn deref_mut(&mut self) -> &mut Journal {
        self.journal
    }
}

impl Drop for Suspended<'_> {
    fn drop(&mut self) {
        self.journal.suspended = self.previous;
    }
}

// ── Edit context ────────────────────────────────────────────────

/// What an editing operation needs besides the object it edits: the
/// journal to record into and the bus to notify.
pub(crate) struct EditContext<'a> {
    pub(crate) journal: &'a mut Journal,
    pub(crate) events: &'a mut EventBus,
}

impl<'a> EditContext<'a> {
    pub(crate) fn new(journal: &'a mut Journal, events: &'a mut EventBus) -> Self {
        Self { journal, events }
    }

    pub(crate) fn record(&mut self, owner: Owner, action: JournalAction) {
        self.journal.record(JournalEntry::new(owner, action));
    }

    pub(crate) fn emit(&mut self, event: TimelineEvent) {
        self.events.emit(event);
    }

    /// Run `edit` with journalling suspended.
    pub(crate) fn silently<R>(&mut self, edit: impl FnOnce(&mut EditContext<'_>) -> R) -> R {
        let mut journal = self.journal.suspend();
        let mut cx = EditContext {
            journal: &mut *journal,
            events: &mut *self.events,
        };
        edit(&mut cx)
    }
}
