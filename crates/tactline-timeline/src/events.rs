//! Change notifications for the view layer.
//!
//! Every subscriber gets its own channel; a subscriber that drops its
//! receiver is forgotten on the next emit.

use crossbeam_channel::{Receiver, Sender, TrySendError};
use smallvec::SmallVec;
use tactline_core::Ticks;
use tracing::trace;
use uuid::Uuid;

/// Something observable changed in the arrangement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineEvent {
    BlockAdded { track: Uuid, block: Uuid },
    BlockRemoved { track: Uuid, block: Uuid },
    BlockMoved { track: Uuid, block: Uuid, position: Ticks },
    BlockResized { track: Uuid, block: Uuid, length: Ticks },
    BlockMuteChanged { track: Uuid, block: Uuid, muted: bool },
    /// The block's type-specific payload was replaced or edited.
    BlockContentChanged { track: Uuid, block: Uuid },
    TrackAdded { track: Uuid },
    TrackRemoved { track: Uuid },
    /// The track now sits at `index` in the track list.
    TrackMoved { track: Uuid, index: usize },
    TrackMuteSoloChanged { track: Uuid, muted: bool, solo: bool },
    /// Total arrangement length, in whole tacts.
    LengthChanged { tacts: i64 },
}

/// Fan-out of [`TimelineEvent`]s to any number of receivers.
#[derive(Debug)]
pub struct EventBus {
    subscribers: SmallVec<[Sender<TimelineEvent>; 2]>,
    capacity: Option<usize>,
}

impl EventBus {
    /// `capacity` bounds each subscriber channel; `None` is unbounded.
    pub fn new(capacity: Option<usize>) -> Self {
        Self {
            subscribers: SmallVec::new(),
            capacity,
        }
    }

    pub fn subscribe(&mut self) -> Receiver<TimelineEvent> {
        let (tx, rx) = match self.capacity {
            Some(capacity) => crossbeam_channel::bounded(capacity),
            None => crossbeam_channel::unbounded(),
        };
        self.subscribers.push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn emit(&mut self, event: TimelineEvent) {
        self.subscribers
            .retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) => true,
                Err(TrySendError::Full(dropped)) => {
                    trace!(?dropped, "notification channel full, event dropped");
                    true
                }
                Err(TrySendError::Disconnected(_)) => false,
            });
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(None)
    }
}
