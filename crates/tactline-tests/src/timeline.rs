//! Integration tests for the timeline subsystem.
//!
//! Exercises cross-crate interactions between tactline-core and
//! tactline-timeline.

use proptest::prelude::*;
use tactline_core::{AutomationCurve, Progression, Ticks, TimelineConfig, TICKS_PER_TACT};
use tactline_timeline::{
    ArrangementFile, BlockContent, Owner, TimelineEvent, TrackContainer, TrackStatus, TrackType,
};
use uuid::Uuid;

// ── Helpers ────────────────────────────────────────────────────

fn arrangement() -> (TrackContainer, Uuid, Uuid) {
    let mut container = TrackContainer::default();
    let lead = container.create_track(TrackType::Instrument);
    let volume = container.create_track(TrackType::Automation);
    for tact in [0, 2, 5] {
        container.create_block(lead, Ticks::from_tacts(tact));
    }
    container.create_block(volume, Ticks::ZERO);
    (container, lead, volume)
}

fn starts(container: &TrackContainer, track: Uuid) -> Vec<i64> {
    container
        .track(track)
        .unwrap()
        .blocks()
        .iter()
        .map(|b| b.start_position().get())
        .collect()
}

// ── Arrangement length ─────────────────────────────────────────

#[test]
fn length_is_latest_block_end_in_whole_tacts() {
    let (mut container, lead, _) = arrangement();
    // last lead block covers tact 5 completely
    assert_eq!(container.length(), 6);

    let last = container.track(lead).unwrap().blocks()[2].id();
    container.resize_block(last, Ticks::new(TICKS_PER_TACT - 1));
    assert_eq!(container.length(), 5);
}

#[test]
fn removing_last_block_shrinks_length() {
    let (mut container, lead, _) = arrangement();
    let rx = container.subscribe();
    let last = container.track(lead).unwrap().blocks()[2].id();

    assert!(container.remove_block(lead, last));
    assert_eq!(container.length(), 3);
    assert!(rx
        .try_iter()
        .any(|e| e == TimelineEvent::LengthChanged { tacts: 3 }));
}

// ── Tact insertion ─────────────────────────────────────────────

#[test]
fn insert_tact_shifts_every_track() {
    let (mut container, lead, volume) = arrangement();
    container.insert_tact(Ticks::from_tacts(1));

    assert_eq!(starts(&container, lead), vec![0, 576, 1152]);
    assert_eq!(starts(&container, volume), vec![0]);

    container.remove_tact(Ticks::from_tacts(1));
    assert_eq!(starts(&container, lead), vec![0, 384, 960]);
}

#[test]
fn insert_tact_is_undone_block_by_block() {
    let (mut container, lead, _) = arrangement();
    container.insert_tact(Ticks::ZERO);
    assert_eq!(starts(&container, lead), vec![192, 576, 1152]);

    // one journal entry per shifted block, across both tracks
    for _ in 0..4 {
        assert!(container.undo());
    }
    assert_eq!(starts(&container, lead), vec![0, 384, 960]);
}

// ── Journal ────────────────────────────────────────────────────

#[test]
fn journal_depth_comes_from_config() {
    let config = TimelineConfig {
        journal_depth: 3,
        ..TimelineConfig::default()
    };
    let mut container = TrackContainer::new(Default::default(), &config);
    let track = container.create_track(TrackType::Instrument);
    let block = container.create_block(track, Ticks::ZERO).unwrap();
    for i in 1..=5 {
        container.move_block(block, Ticks::new(i * 10));
    }

    let mut undone = 0;
    while container.undo() {
        undone += 1;
    }
    assert_eq!(undone, 3);
    assert_eq!(
        container.block(block).unwrap().start_position(),
        Ticks::new(20)
    );
}

#[test]
fn new_edit_clears_only_that_entitys_redo() {
    let (mut container, lead, _) = arrangement();
    let blocks: Vec<Uuid> = container
        .track(lead)
        .unwrap()
        .blocks()
        .iter()
        .map(|b| b.id())
        .collect();
    container.move_block(blocks[0], Ticks::new(50));
    container.move_block(blocks[1], Ticks::new(900));
    container.undo();
    container.undo();
    assert!(container.can_redo());

    container.move_block(blocks[0], Ticks::new(60));
    assert!(container.redo_entity(Owner::Block(blocks[1])));
    assert!(!container.redo_entity(Owner::Block(blocks[0])));
    assert_eq!(
        container.block(blocks[1]).unwrap().start_position(),
        Ticks::new(900)
    );
}

#[test]
fn track_removal_roundtrips_through_journal() {
    let (mut container, lead, volume) = arrangement();
    let before = container.save_state();

    assert!(container.remove_track(lead));
    assert_eq!(container.track_index(volume), Some(0));
    assert!(container.undo());

    assert_eq!(container.save_state(), before);
}

// ── Solo ───────────────────────────────────────────────────────

#[test]
fn solo_moves_between_tracks() {
    let (mut container, lead, volume) = arrangement();
    container.set_solo(lead, true);
    container.set_solo(volume, true);

    assert_eq!(container.track(lead).unwrap().state(), TrackStatus::Muted);
    assert_eq!(container.track(volume).unwrap().state(), TrackStatus::Soloed);

    let topology = container.engine().snapshot();
    assert!(topology.tracks[0].muted);
    assert!(!topology.tracks[1].muted);
}

// ── Payload and documents ──────────────────────────────────────

#[test]
fn automation_payload_survives_clone_and_document() {
    let (mut container, _, volume) = arrangement();
    let block = container.track(volume).unwrap().blocks()[0].id();
    container.update_block_content(block, |content| {
        if let BlockContent::Automation(curve) = content {
            *curve = AutomationCurve::new("volume");
            curve.set(Ticks::ZERO, 0.0, Progression::Linear);
            curve.set(Ticks::TACT, 1.0, Progression::Discrete);
        }
    });

    let copy = container.clone_block(block).unwrap();
    assert_eq!(
        container.block(copy).unwrap().content(),
        container.block(block).unwrap().content()
    );

    let json = ArrangementFile::capture("auto", &container).to_json().unwrap();
    let mut restored = TrackContainer::default();
    ArrangementFile::from_json(&json).unwrap().apply(&mut restored);

    let BlockContent::Automation(curve) = restored.block(block).unwrap().content() else {
        panic!("automation payload lost");
    };
    assert_eq!(curve.value_at(Ticks::new(96)), 0.5);
}

#[test]
fn restore_type_mismatch_keeps_track_type() {
    let (mut container, lead, volume) = arrangement();
    let state = container.track(volume).unwrap().save_state().detached();

    assert!(container.restore_track_state(lead, &state));
    let track = container.track(lead).unwrap();
    assert_eq!(track.kind(), TrackType::Instrument);
    assert_eq!(track.block_count(), 1);
}

// ── Properties ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Edit {
    Move(usize, i64),
    Resize(usize, i64),
    InsertTact(i64),
    RemoveTact(i64),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        (0usize..4, -500i64..5000).prop_map(|(i, p)| Edit::Move(i, p)),
        (0usize..4, -500i64..2000).prop_map(|(i, l)| Edit::Resize(i, l)),
        (0i64..10).prop_map(Edit::InsertTact),
        (0i64..10).prop_map(Edit::RemoveTact),
    ]
}

fn four_blocks() -> (TrackContainer, Uuid, Vec<Uuid>) {
    let mut container = TrackContainer::default();
    let track = container.create_track(TrackType::Instrument);
    let blocks = (0..4)
        .map(|i| container.create_block(track, Ticks::from_tacts(i)).unwrap())
        .collect();
    (container, track, blocks)
}

proptest! {
    #[test]
    fn end_is_start_plus_length(edits in prop::collection::vec(edit(), 1..40)) {
        let (mut container, track, blocks) = four_blocks();
        for e in edits {
            match e {
                Edit::Move(i, p) => { container.move_block(blocks[i], Ticks::new(p)); }
                Edit::Resize(i, l) => { container.resize_block(blocks[i], Ticks::new(l)); }
                Edit::InsertTact(t) => container.insert_tact(Ticks::from_tacts(t)),
                Edit::RemoveTact(t) => container.remove_tact(Ticks::from_tacts(t)),
            }
        }
        for block in container.track(track).unwrap().blocks() {
            prop_assert!(block.start_position() >= Ticks::ZERO);
            prop_assert!(block.length() >= Ticks::ZERO);
            prop_assert_eq!(block.end_position(), block.start_position() + block.length());
        }
    }

    #[test]
    fn move_and_resize_undo_redo_roundtrip(
        index in 0usize..4,
        position in 0i64..5000,
        length in 0i64..2000,
    ) {
        let (mut container, _, blocks) = four_blocks();
        let block = blocks[index];
        let before = container.block(block).unwrap().clone();

        container.move_block(block, Ticks::new(position));
        container.resize_block(block, Ticks::new(length));
        let after = container.block(block).unwrap().clone();

        while container.undo_entity(Owner::Block(block)) {}
        let undone = container.block(block).unwrap();
        prop_assert_eq!(undone.start_position(), before.start_position());
        prop_assert_eq!(undone.length(), before.length());

        while container.redo_entity(Owner::Block(block)) {}
        let redone = container.block(block).unwrap();
        prop_assert_eq!(redone.start_position(), after.start_position());
        prop_assert_eq!(redone.length(), after.length());
    }

    #[test]
    fn range_query_overlaps_and_is_sorted(
        positions in prop::collection::vec(0i64..4000, 0..20),
        start in 0i64..4000,
        span in 0i64..2000,
    ) {
        let mut container = TrackContainer::default();
        let track = container.create_track(TrackType::Instrument);
        for p in &positions {
            container.create_block(track, Ticks::new(*p));
        }
        let (start, end) = (Ticks::new(start), Ticks::new(start + span));

        let track = container.track(track).unwrap();
        let found = track.blocks_in_range(start, end);
        for pair in found.windows(2) {
            prop_assert!(pair[0].start_position() <= pair[1].start_position());
        }
        for block in &found {
            prop_assert!(block.start_position() <= end && block.end_position() >= start);
        }
        let expected = track
            .blocks()
            .iter()
            .filter(|b| b.start_position() <= end && b.end_position() >= start)
            .count();
        prop_assert_eq!(found.len(), expected);
    }

    #[test]
    fn solo_domain_restores_independent_mutes(
        initial in prop::collection::vec(any::<bool>(), 2..6),
        toggles in prop::collection::vec((0usize..6, any::<bool>()), 0..20),
    ) {
        let mut container = TrackContainer::default();
        let tracks: Vec<Uuid> = initial
            .iter()
            .map(|&muted| {
                let id = container.create_track(TrackType::Instrument);
                container.set_track_muted(id, muted);
                id
            })
            .collect();

        for (index, solo) in toggles {
            container.set_solo(tracks[index % tracks.len()], solo);
            let soloed = container.tracks().iter().filter(|t| t.is_solo()).count();
            prop_assert!(soloed <= 1);
            if soloed == 1 {
                let unmuted = container.tracks().iter().filter(|t| !t.is_muted()).count();
                prop_assert_eq!(unmuted, 1);
            }
        }

        for &id in &tracks {
            container.set_solo(id, false);
        }
        let mutes: Vec<bool> = container.tracks().iter().map(|t| t.is_muted()).collect();
        prop_assert_eq!(mutes, initial);
    }

    #[test]
    fn clone_matches_everything_but_identity(position in 0i64..5000, length in 0i64..2000, muted in any::<bool>()) {
        let (mut container, _, blocks) = four_blocks();
        container.move_block(blocks[0], Ticks::new(position));
        container.resize_block(blocks[0], Ticks::new(length));
        container.set_block_muted(blocks[0], muted);

        let copy = container.clone_block(blocks[0]).unwrap();
        let (a, b) = (container.block(blocks[0]).unwrap(), container.block(copy).unwrap());
        prop_assert_ne!(a.id(), b.id());
        prop_assert_eq!(a.start_position(), b.start_position());
        prop_assert_eq!(a.length(), b.length());
        prop_assert_eq!(a.is_muted(), b.is_muted());
        prop_assert_eq!(a.content(), b.content());
    }
}
