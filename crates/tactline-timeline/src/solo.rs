//! The container-wide solo domain.
//!
//! The first track to enter solo snapshots every track's mute flag;
//! soloing another track moves the solo over without a new snapshot;
//! the last track to leave solo restores the snapshot.

use crate::journal::EditContext;
use crate::track::Track;

/// Set the solo flag of `tracks[index]` and apply its effect on the
/// other tracks' mute flags.
pub(crate) fn set_solo(tracks: &mut [Track], index: usize, solo: bool, cx: &mut EditContext<'_>) {
    let Some(track) = tracks.get(index) else {
        return;
    };
    if track.is_solo() == solo {
        return;
    }
    let other_soloed = tracks
        .iter()
        .enumerate()
        .any(|(i, t)| i != index && t.is_solo());

    for (i, track) in tracks.iter_mut().enumerate() {
        if solo {
            if !other_soloed {
                track.muted_before_solo = track.is_muted();
            }
            track.set_mute_solo(i != index, i == index, cx);
        } else if i == index {
            let muted = if other_soloed {
                track.is_muted()
            } else {
                track.muted_before_solo
            };
            track.set_mute_solo(muted, false, cx);
        } else if !other_soloed {
            let solo = track.is_solo();
            track.set_mute_solo(track.muted_before_solo, solo, cx);
        }
    }
}
