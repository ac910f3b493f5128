//! Pure sequencing over the rack.
//!
//! Album scans visit each other slot at most once and never return the slot
//! they started from, so a rack with a single playable album has no advance
//! target in either direction. A slot counts as playable when it holds an
//! album with at least one track.

use crate::playback::position::Position;
use crate::state::{Rack, RACK_SIZE};

pub fn next_album(rack: &Rack, from: usize) -> Option<usize> {
    (1..RACK_SIZE)
        .map(|step| (from + step) % RACK_SIZE)
        .find(|&slot| rack.is_playable(slot))
}

pub fn previous_album(rack: &Rack, from: usize) -> Option<usize> {
    (1..RACK_SIZE)
        .map(|step| (from + RACK_SIZE - step) % RACK_SIZE)
        .find(|&slot| rack.is_playable(slot))
}

/// The track after `at`: the next one on this album, or the first track of the
/// next playable album.
pub fn next_track(rack: &Rack, at: Position) -> Option<Position> {
    let album = rack.get(at.slot)?;
    match album.last_track_index() {
        Some(last) if at.track < last => Some(Position::new(at.slot, at.track + 1)),
        _ => next_album(rack, at.slot).map(|slot| Position::new(slot, 0)),
    }
}

/// The track before `at`: the previous one on this album, or the last track of
/// the previous playable album.
pub fn previous_track(rack: &Rack, at: Position) -> Option<Position> {
    let album = rack.get(at.slot)?;
    if at.track > 0 && album.is_playable() {
        let track = (at.track - 1).min(album.last_track_index().unwrap_or(0));
        return Some(Position::new(at.slot, track));
    }

    let slot = previous_album(rack, at.slot)?;
    let last = rack.get(slot)?.last_track_index()?;
    Some(Position::new(slot, last))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{Album, Track};

    fn album(id: &str, tracks: usize) -> Album {
        Album {
            id: id.to_string(),
            album_name: id.to_string(),
            artist_name: "Artist".to_string(),
            image_url: String::new(),
            tracks: (0..tracks)
                .map(|i| Track {
                    id: format!("{id}-{i}"),
                    name: format!("Track {i}"),
                    duration_ms: 1000,
                })
                .collect(),
        }
    }

    fn rack_with(slots: &[(usize, usize)]) -> Rack {
        slots.iter().fold(Rack::default(), |rack, &(slot, tracks)| {
            rack.with_album(slot, album(&format!("a{slot}"), tracks))
                .unwrap()
        })
    }

    #[test]
    fn next_album_skips_empty_slots_and_wraps() {
        let rack = rack_with(&[(0, 2), (3, 2)]);

        assert_eq!(next_album(&rack, 0), Some(3));
        assert_eq!(next_album(&rack, 3), Some(0));
        assert_eq!(previous_album(&rack, 0), Some(3));
        assert_eq!(previous_album(&rack, 3), Some(0));
    }

    #[test]
    fn single_album_has_no_target() {
        for slot in 0..RACK_SIZE {
            let rack = rack_with(&[(slot, 4)]);
            assert_eq!(next_album(&rack, slot), None);
            assert_eq!(previous_album(&rack, slot), None);
        }
    }

    #[test]
    fn empty_rack_has_no_target() {
        let rack = Rack::default();
        assert_eq!(next_album(&rack, 5), None);
        assert_eq!(next_track(&rack, Position::new(5, 0)), None);
    }

    #[test]
    fn previous_undoes_next_on_sparse_racks() {
        let layouts: [&[(usize, usize)]; 3] = [
            &[(1, 1), (6, 3)],
            &[(0, 2), (4, 1), (9, 5)],
            &[(2, 1), (5, 1), (8, 1), (11, 1)],
        ];

        for layout in layouts {
            let rack = rack_with(layout);
            for &(slot, _) in layout {
                let next = next_album(&rack, slot).unwrap();
                assert_eq!(previous_album(&rack, next), Some(slot));
            }
        }
    }

    #[test]
    fn trackless_albums_are_skipped() {
        let rack = rack_with(&[(0, 1), (1, 0), (2, 1)]);
        assert_eq!(next_album(&rack, 0), Some(2));
        assert_eq!(previous_album(&rack, 2), Some(0));
    }

    #[test]
    fn next_track_stays_on_album_until_the_end() {
        let rack = rack_with(&[(0, 3), (7, 2)]);

        assert_eq!(next_track(&rack, Position::new(0, 0)), Some(Position::new(0, 1)));
        assert_eq!(next_track(&rack, Position::new(0, 1)), Some(Position::new(0, 2)));
        assert_eq!(next_track(&rack, Position::new(0, 2)), Some(Position::new(7, 0)));
    }

    #[test]
    fn previous_track_lands_on_last_track_of_previous_album() {
        let rack = rack_with(&[(2, 4), (7, 2)]);

        assert_eq!(
            previous_track(&rack, Position::new(7, 0)),
            Some(Position::new(2, 3))
        );
        assert_eq!(
            previous_track(&rack, Position::new(7, 1)),
            Some(Position::new(7, 0))
        );
    }

    #[test]
    fn lone_album_walks_back_to_its_first_track() {
        let tracks = 5;
        let rack = rack_with(&[(4, tracks)]);
        let last = Position::new(4, tracks - 1);

        assert_eq!(next_track(&rack, last), None);

        let mut at = last;
        for _ in 0..tracks - 1 {
            at = previous_track(&rack, at).unwrap();
        }
        assert_eq!(at, Position::new(4, 0));
        assert_eq!(previous_track(&rack, at), None);
    }

    #[test]
    fn empty_current_slot_has_no_track_target() {
        let rack = rack_with(&[(3, 2)]);
        assert_eq!(next_track(&rack, Position::new(0, 0)), None);
        assert_eq!(previous_track(&rack, Position::new(0, 0)), None);
    }
}
