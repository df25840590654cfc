//! Sequencer: walks the published topology one window at a time.

use tactline_core::{TickRange, Ticks};
use tactline_timeline::{ActiveBlock, PlaybackTopology};

/// Result of one sequencer pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Pass {
    /// Ticks covered by this pass.
    pub window: TickRange,
    /// Topology revision the pass read.
    pub revision: u64,
    /// Blocks sounding inside the window.
    pub active: Vec<ActiveBlock>,
    /// Blocks whose start falls inside the window.
    pub started: Vec<ActiveBlock>,
}

/// Playback cursor over a [`PlaybackTopology`].
#[derive(Debug, Clone)]
pub struct Sequencer {
    position: Ticks,
    step: Ticks,
    /// Jump back to zero after the last tact.
    pub looping: bool,
}

impl Sequencer {
    /// Create a sequencer advancing `step` ticks per pass (at least one).
    pub fn new(step: Ticks) -> Self {
        Self {
            position: Ticks::ZERO,
            step: if step.get() > 0 { step } else { Ticks::new(1) },
            looping: true,
        }
    }

    pub fn position(&self) -> Ticks {
        self.position
    }

    pub fn step(&self) -> Ticks {
        self.step
    }

    /// Move the cursor. Negative positions clamp to zero.
    pub fn seek(&mut self, position: Ticks) {
        self.position = position.clamped();
    }

    /// Report the blocks sounding in the next window and advance.
    ///
    /// The caller holds the structural-edit lock while this runs, so the
    /// whole pass sees one consistent topology.
    pub fn pass(&mut self, topology: &PlaybackTopology) -> Pass {
        let end_of_song = Ticks::from_tacts(topology.length_tacts);
        if self.looping && end_of_song > Ticks::ZERO && self.position >= end_of_song {
            self.position = Ticks::ZERO;
        }

        let window = TickRange::new(self.position, self.position + self.step - Ticks::new(1));
        let active = topology.sounding_in(window);
        let started = active
            .iter()
            .filter(|b| window.contains(b.start))
            .copied()
            .collect();

        self.position += self.step;
        Pass {
            window,
            revision: topology.revision,
            active,
            started,
        }
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new(Ticks::new(48))
    }
}
