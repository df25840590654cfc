//! Tactline Audio - Playback side of the arrangement
//!
//! Architecture:
//! - `EngineContext`: structural-edit lock shared with the track container
//! - `Sequencer`: walks the published topology one window at a time
//! - `AudioEngine`: owns the context and runs the playback thread
//!
//! No signal processing happens here; playback reports which blocks
//! sound when, over a channel.

pub mod sequencer;

pub use sequencer::{Pass, Sequencer};

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tactline_core::{Result, Ticks, TimelineConfig};
use tactline_timeline::{EngineContext, TrackContainer};
use tracing::{debug, info, warn};

/// Messages from the playback thread.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Started { position: Ticks },
    Pass(Pass),
    Stopped { position: Ticks },
}

/// Audio engine state.
pub struct AudioEngine {
    context: EngineContext,
    step: Ticks,
    interval: Duration,
    looping: bool,
    playing: Arc<AtomicBool>,
    position: Arc<AtomicI64>,
    thread: Option<JoinHandle<()>>,
}

impl AudioEngine {
    pub fn new(config: &TimelineConfig) -> Self {
        info!(
            step = config.playback_step_ticks,
            interval_ms = config.playback_interval_ms,
            "Initializing audio engine"
        );
        Self {
            context: EngineContext::new(),
            step: Ticks::new(config.playback_step_ticks),
            interval: Duration::from_millis(config.playback_interval_ms),
            looping: true,
            playing: Arc::new(AtomicBool::new(false)),
            position: Arc::new(AtomicI64::new(0)),
            thread: None,
        }
    }

    /// Handle to pass into [`TrackContainer::new`].
    pub fn context(&self) -> EngineContext {
        self.context.clone()
    }

    /// A container wired to this engine.
    pub fn create_container(&self, config: &TimelineConfig) -> TrackContainer {
        TrackContainer::new(self.context(), config)
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Start the playback thread from the current position.
    ///
    /// Each pass takes the structural-edit lock, reads the topology and
    /// releases it before reporting. Playing again while already playing
    /// restarts the thread.
    pub fn play(&mut self) -> Result<Receiver<PlaybackEvent>> {
        self.stop();
        let (tx, rx) = crossbeam_channel::unbounded();

        let mut sequencer = Sequencer::new(self.step);
        sequencer.looping = self.looping;
        sequencer.seek(Ticks::new(self.position.load(Ordering::Relaxed)));

        let context = self.context.clone();
        let playing = Arc::clone(&self.playing);
        let position = Arc::clone(&self.position);
        let interval = self.interval;

        playing.store(true, Ordering::Release);
        let handle = std::thread::Builder::new()
            .name("tactline-playback".to_string())
            .spawn(move || run_playback(sequencer, context, playing, position, interval, tx));
        match handle {
            Ok(handle) => {
                self.thread = Some(handle);
                info!("Playback started");
                Ok(rx)
            }
            Err(e) => {
                self.playing.store(false, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Stop the playback thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.playing.store(false, Ordering::Release);
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                warn!("playback thread panicked");
            }
            info!("Playback stopped");
        }
    }

    /// Move the playback cursor; takes effect on the next `play`.
    pub fn seek(&mut self, position: Ticks) {
        self.position
            .store(position.clamped().get(), Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Acquire)
    }

    /// Position reached by the playback thread.
    pub fn position(&self) -> Ticks {
        Ticks::new(self.position.load(Ordering::Relaxed))
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new(&TimelineConfig::default())
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_playback(
    mut sequencer: Sequencer,
    context: EngineContext,
    playing: Arc<AtomicBool>,
    position: Arc<AtomicI64>,
    interval: Duration,
    tx: Sender<PlaybackEvent>,
) {
    let _ = tx.send(PlaybackEvent::Started {
        position: sequencer.position(),
    });
    while playing.load(Ordering::Acquire) {
        let pass = {
            let topology = context.lock();
            sequencer.pass(&topology)
        };
        position.store(sequencer.position().get(), Ordering::Relaxed);
        if tx.send(PlaybackEvent::Pass(pass)).is_err() {
            debug!("playback receiver gone, stopping");
            break;
        }
        std::thread::sleep(interval);
    }
    playing.store(false, Ordering::Release);
    let _ = tx.send(PlaybackEvent::Stopped {
        position: sequencer.position(),
    });
}
