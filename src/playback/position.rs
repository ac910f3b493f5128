use serde::Serialize;

/// Where the changer is: a rack slot and a track index into that slot's album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub slot: usize,
    pub track: usize,
}

impl Position {
    pub fn new(slot: usize, track: usize) -> Self {
        Self { slot, track }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Status {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Who moved the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cause {
    User,
    Auto,
}

/// Current position plus what the device last said about it.
///
/// Every move bumps `generation`. Moves made by the poll loop also record
/// their generation so a navigation command computed from an older snapshot
/// can tell it has been overtaken.
#[derive(Debug, Default)]
pub struct PositionTracker {
    position: Position,
    generation: u64,
    last_auto_generation: u64,
    remote_position_ms: u64,
    progress_seen: bool,
}

impl PositionTracker {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn remote_position_ms(&self) -> u64 {
        self.remote_position_ms
    }

    /// Whether the current track has reported a non-zero position since it started.
    pub fn progress_seen(&self) -> bool {
        self.progress_seen
    }

    pub fn move_to(&mut self, target: Position, cause: Cause) {
        self.position = target;
        self.generation += 1;
        if cause == Cause::Auto {
            self.last_auto_generation = self.generation;
        }
        self.remote_position_ms = 0;
        self.progress_seen = false;
    }

    /// Back to the first track of the current slot.
    pub fn rewind(&mut self) {
        let slot = self.position.slot;
        self.move_to(Position::new(slot, 0), Cause::User);
    }

    pub fn observe_remote(&mut self, position_ms: u64) {
        self.remote_position_ms = position_ms;
        if position_ms > 0 {
            self.progress_seen = true;
        }
    }

    pub fn seek(&mut self, position_ms: u64) {
        self.remote_position_ms = position_ms;
    }

    /// True when an automatic advance happened after generation `seen`.
    pub fn overtaken_since(&self, seen: u64) -> bool {
        self.last_auto_generation > seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_resets_remote_progress() {
        let mut tracker = PositionTracker::default();
        tracker.observe_remote(42_000);
        assert!(tracker.progress_seen());

        tracker.move_to(Position::new(0, 1), Cause::User);
        assert_eq!(tracker.remote_position_ms(), 0);
        assert!(!tracker.progress_seen());
        assert_eq!(tracker.generation(), 1);
    }

    #[test]
    fn only_automatic_moves_overtake() {
        let mut tracker = PositionTracker::default();
        tracker.move_to(Position::new(0, 1), Cause::User);
        assert!(!tracker.overtaken_since(0));

        tracker.move_to(Position::new(0, 2), Cause::Auto);
        assert!(tracker.overtaken_since(1));
        assert!(!tracker.overtaken_since(2));
    }
}
