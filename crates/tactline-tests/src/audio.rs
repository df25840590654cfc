//! Integration tests for the audio subsystem.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tactline_audio::{AudioEngine, PlaybackEvent, Sequencer};
use tactline_core::{Ticks, TimelineConfig, TICKS_PER_TACT};
use tactline_timeline::TrackType;

fn fast_config() -> TimelineConfig {
    TimelineConfig {
        playback_interval_ms: 1,
        playback_step_ticks: TICKS_PER_TACT,
        ..TimelineConfig::default()
    }
}

#[test]
fn audio_engine_creates_idle() {
    let engine = AudioEngine::default();
    assert!(!engine.is_playing());
    assert_eq!(engine.position(), Ticks::ZERO);
}

#[test]
fn playback_reports_blocks_in_order() {
    let config = fast_config();
    let mut engine = AudioEngine::new(&config);
    let mut container = engine.create_container(&config);
    let track = container.create_track(TrackType::Instrument);
    let first = container.create_block(track, Ticks::ZERO).unwrap();
    let second = container.create_block(track, Ticks::from_tacts(2)).unwrap();
    engine.set_looping(false);

    let rx = engine.play().unwrap();
    let mut started = Vec::new();
    for event in rx.iter() {
        if let PlaybackEvent::Pass(pass) = event {
            started.extend(pass.started.iter().map(|b| b.block));
            if pass.window.start >= Ticks::from_tacts(3) {
                break;
            }
        }
    }
    engine.stop();

    assert_eq!(started, vec![first, second]);
}

#[test]
fn muted_block_is_not_reported() {
    let config = fast_config();
    let engine = AudioEngine::new(&config);
    let mut container = engine.create_container(&config);
    let track = container.create_track(TrackType::Sample);
    let block = container.create_block(track, Ticks::ZERO).unwrap();
    container.resize_block(block, Ticks::TACT);
    container.toggle_block_mute(block);

    let pass = Sequencer::new(Ticks::TACT).pass(&engine.context().lock());
    assert!(pass.active.is_empty());
}

#[test]
fn playback_never_sees_half_applied_tact_insertion() {
    let config = fast_config();
    let engine = AudioEngine::new(&config);
    let mut container = engine.create_container(&config);
    let track = container.create_track(TrackType::BeatBassline);
    for tact in 0..16 {
        container.create_block(track, Ticks::from_tacts(tact));
    }

    let before: Vec<i64> = (0..16).map(|t| t * TICKS_PER_TACT).collect();
    let after: Vec<i64> = (1..17).map(|t| t * TICKS_PER_TACT).collect();

    let context = engine.context();
    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let done = Arc::clone(&done);
        std::thread::spawn(move || {
            let mut checked = 0u64;
            let mut last_revision = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                let topology = context.lock();
                let starts: Vec<i64> = topology.tracks[0]
                    .blocks
                    .iter()
                    .map(|b| b.start.get())
                    .collect();
                assert!(
                    starts == before || starts == after,
                    "torn topology: {:?}",
                    starts
                );
                assert!(topology.revision >= last_revision);
                last_revision = topology.revision;
                checked += 1;
                if finished {
                    break;
                }
            }
            checked
        })
    };

    for _ in 0..200 {
        container.insert_tact(Ticks::ZERO);
        container.remove_tact(Ticks::ZERO);
    }
    done.store(true, Ordering::Release);

    let checked = reader.join().unwrap();
    assert!(checked > 0);
}
