//! Device polling: the poll timer and track-completion inference.

use std::time::Duration;

use tokio::time::Instant;

use crate::playback::device::PlaybackState;

/// What one device sample means for the current track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Track is still going (or has not started). Carries the reported position.
    Progress(u64),
    /// Track finished.
    Completed,
    /// Sample is about some other track; nothing to learn from it.
    Foreign,
}

/// Interprets device samples for the track the changer believes is playing.
///
/// The device has no end-of-track event. A finished track shows up as paused
/// at position zero, which is also what a track paused right at its start
/// looks like. With `guard` on, that tuple only counts as completion once the
/// track has reported a non-zero position.
#[derive(Debug, Clone, Copy)]
pub struct CompletionDetector {
    pub guard: bool,
}

impl CompletionDetector {
    pub fn new(guard: bool) -> Self {
        Self { guard }
    }

    pub fn classify(
        &self,
        state: &PlaybackState,
        expected_track: Option<&str>,
        progress_seen: bool,
    ) -> Observation {
        if let (Some(reported), Some(expected)) = (state.track_id.as_deref(), expected_track) {
            if reported != expected {
                return Observation::Foreign;
            }
        }

        let at_rest = state.position_ms == 0 && state.is_paused;
        if at_rest && (progress_seen || !self.guard) {
            Observation::Completed
        } else {
            Observation::Progress(state.position_ms)
        }
    }
}

/// Deadline of the next poll. Exists only while playback is running; clearing
/// it is all it takes to cancel polling.
#[derive(Debug)]
pub struct PollSchedule {
    period: Duration,
    deadline: Option<Instant>,
}

impl PollSchedule {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            deadline: None,
        }
    }

    /// Begin polling if not already scheduled.
    pub fn start(&mut self) {
        if self.deadline.is_none() {
            self.deadline = Some(Instant::now() + self.period);
        }
    }

    /// Schedule the next poll one period after the cycle that just finished.
    pub fn rearm(&mut self) {
        self.deadline = Some(Instant::now() + self.period);
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// Resolves at `deadline`, or never when there is none.
pub async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(position_ms: u64, is_paused: bool, track: &str) -> PlaybackState {
        PlaybackState {
            position_ms,
            duration_ms: 180_000,
            is_paused,
            track_id: Some(track.to_string()),
        }
    }

    #[test]
    fn paused_at_zero_completes_after_progress() {
        let detector = CompletionDetector::new(true);
        let sample = state(0, true, "t1");

        assert_eq!(detector.classify(&sample, Some("t1"), false), Observation::Progress(0));
        assert_eq!(detector.classify(&sample, Some("t1"), true), Observation::Completed);
    }

    #[test]
    fn unguarded_detector_trusts_the_first_sample() {
        let detector = CompletionDetector::new(false);
        assert_eq!(
            detector.classify(&state(0, true, "t1"), Some("t1"), false),
            Observation::Completed
        );
    }

    #[test]
    fn playing_or_mid_track_is_progress() {
        let detector = CompletionDetector::new(true);
        assert_eq!(
            detector.classify(&state(0, false, "t1"), Some("t1"), true),
            Observation::Progress(0)
        );
        assert_eq!(
            detector.classify(&state(5_000, true, "t1"), Some("t1"), true),
            Observation::Progress(5_000)
        );
    }

    #[test]
    fn other_track_is_ignored() {
        let detector = CompletionDetector::new(true);
        assert_eq!(
            detector.classify(&state(0, true, "t0"), Some("t1"), true),
            Observation::Foreign
        );
    }

    #[tokio::test(start_paused = true)]
    async fn schedule_only_exists_while_started() {
        let mut schedule = PollSchedule::new(Duration::from_millis(1000));
        assert!(schedule.deadline().is_none());

        schedule.start();
        let first = schedule.deadline().unwrap();
        schedule.start();
        assert_eq!(schedule.deadline(), Some(first));

        schedule.stop();
        assert!(schedule.deadline().is_none());
    }
}
