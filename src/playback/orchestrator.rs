//! The playback orchestrator.
//!
//! One tokio task owns the rack, the position, the session and the device
//! adapter. Commands reach it through a queue and are handled one at a time;
//! the poll timer is just another branch of the same loop. While a device call
//! is awaited nothing else runs, so a poll-driven advance and a user command
//! can never interleave their reads and writes of the position.

use serde::Serialize;
use tokio::select;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::error::{ChangerError, Result};
use crate::playback::command::{Advance, Command, Reply, Step};
use crate::playback::device::{DeviceAdapter, DeviceBackend};
use crate::playback::poll::{self, CompletionDetector, Observation, PollSchedule};
use crate::playback::position::{Cause, Position, PositionTracker, Status};
use crate::playback::sequencer;
use crate::provider::{Album, Track};
use crate::state::{Config, Rack, RackStore, Store};

const QUEUE_DEPTH: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackSession {
    pub status: Status,
    pub remote_position_ms: u64,
    pub volume_percent: u8,
    pub device_ready: bool,
    pub last_error: Option<String>,
}

/// Read-only view of the changer, republished after every command and poll.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub rack: Rack,
    pub position: Position,
    pub session: PlaybackSession,
    pub generation: u64,
}

impl Snapshot {
    pub fn current_album(&self) -> Option<&Album> {
        self.rack.get(self.position.slot)
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_album()?.track(self.position.track)
    }
}

/// Cloneable handle to a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<Command>,
    snapshot: watch::Receiver<Snapshot>,
}

impl OrchestratorHandle {
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| ChangerError::Closed)?;
        rx.await.map_err(|_| ChangerError::Closed)?
    }

    pub async fn initialize(&self) -> Result<()> {
        self.request(Command::Initialize).await
    }

    pub async fn load_album(&self, slot: usize, album: Album) -> Result<()> {
        self.request(|reply| Command::LoadAlbum { slot, album, reply })
            .await
    }

    pub async fn remove_album(&self, slot: usize) -> Result<Option<Album>> {
        self.request(|reply| Command::RemoveAlbum { slot, reply })
            .await
    }

    pub async fn toggle_play_pause(&self) -> Result<Status> {
        self.request(Command::TogglePlayPause).await
    }

    /// Navigate relative to the position in the latest snapshot.
    pub async fn navigate(&self, step: Step) -> Result<Advance> {
        let seen = self.snapshot.borrow().generation;
        self.navigate_from(step, seen).await
    }

    /// Navigate relative to the snapshot with generation `seen`. If the poll
    /// loop has advanced since then, the command is coalesced.
    pub async fn navigate_from(&self, step: Step, seen: u64) -> Result<Advance> {
        self.request(|reply| Command::Navigate { step, seen, reply })
            .await
    }

    pub async fn next_track(&self) -> Result<Advance> {
        self.navigate(Step::NextTrack).await
    }

    pub async fn previous_track(&self) -> Result<Advance> {
        self.navigate(Step::PreviousTrack).await
    }

    pub async fn next_album(&self) -> Result<Advance> {
        self.navigate(Step::NextAlbum).await
    }

    pub async fn previous_album(&self) -> Result<Advance> {
        self.navigate(Step::PreviousAlbum).await
    }

    pub async fn select_slot(&self, slot: usize) -> Result<()> {
        self.request(|reply| Command::SelectSlot { slot, reply })
            .await
    }

    pub async fn set_volume(&self, percent: u8) -> Result<u8> {
        self.request(|reply| Command::SetVolume { percent, reply })
            .await
    }

    pub async fn seek(&self, position_ms: u64) -> Result<()> {
        self.request(|reply| Command::Seek { position_ms, reply })
            .await
    }

    /// Stop playback, drop the device session and forget the device.
    pub async fn disconnect(&self) -> Result<()> {
        self.request(Command::Disconnect).await
    }

    /// Stop the orchestrator task. The rack is already on disk.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(done)).await.is_ok() {
            let _ = rx.await;
        }
    }
}

pub struct Orchestrator<B: DeviceBackend> {
    rack: RackStore,
    device: DeviceAdapter<B>,
    tracker: PositionTracker,
    status: Status,
    volume_percent: u8,
    last_error: Option<String>,
    detector: CompletionDetector,
    schedule: PollSchedule,
    rx: mpsc::Receiver<Command>,
    snapshot_tx: watch::Sender<Snapshot>,
}

impl<B: DeviceBackend> Orchestrator<B> {
    /// Restore the rack from `store` and start the orchestrator task.
    pub fn spawn(backend: B, store: Store, config: &Config) -> OrchestratorHandle {
        let (tx, rx) = mpsc::channel(QUEUE_DEPTH);
        let (snapshot_tx, snapshot) = watch::channel(Snapshot::default());

        let device = DeviceAdapter::new(backend, store.clone());
        let orchestrator = Self {
            rack: RackStore::open(store),
            volume_percent: device.volume_percent(),
            device,
            tracker: PositionTracker::default(),
            status: Status::Stopped,
            last_error: None,
            detector: CompletionDetector::new(config.completion_guard),
            schedule: PollSchedule::new(config.poll_interval()),
            rx,
            snapshot_tx,
        };
        orchestrator.publish();

        tokio::spawn(orchestrator.run());
        OrchestratorHandle { tx, snapshot }
    }

    async fn run(mut self) {
        info!("Orchestrator started");
        loop {
            select! {
                biased;
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Shutdown(done)) => {
                        let _ = done.send(());
                        break;
                    }
                    Some(cmd) => self.handle(cmd).await,
                    None => break,
                },
                _ = poll::wait_for(self.schedule.deadline()) => {
                    self.poll_cycle().await;
                    self.publish();
                }
            }
        }
        self.schedule.stop();
        info!("Orchestrator stopped");
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            rack: self.rack.rack().clone(),
            position: self.tracker.position(),
            session: PlaybackSession {
                status: self.status,
                remote_position_ms: self.tracker.remote_position_ms(),
                volume_percent: self.volume_percent,
                device_ready: self.device.is_ready(),
                last_error: self.last_error.clone(),
            },
            generation: self.tracker.generation(),
        }
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    async fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::Initialize(reply) => {
                let result = self.initialize().await;
                self.reply(reply, result);
            }
            Command::LoadAlbum { slot, album, reply } => {
                let result = self.load_album(slot, album).await;
                self.reply(reply, result);
            }
            Command::RemoveAlbum { slot, reply } => {
                let result = self.remove_album(slot).await;
                self.reply(reply, result);
            }
            Command::TogglePlayPause(reply) => {
                let result = self.toggle_play_pause().await;
                self.reply(reply, result);
            }
            Command::Navigate { step, seen, reply } => {
                let result = self.navigate(step, seen).await;
                self.reply(reply, result);
            }
            Command::SelectSlot { slot, reply } => {
                let result = self.select_slot(slot).await;
                self.reply(reply, result);
            }
            Command::SetVolume { percent, reply } => {
                let result = self.set_volume(percent).await;
                self.reply(reply, result);
            }
            Command::Seek { position_ms, reply } => {
                let result = self.seek(position_ms).await;
                self.reply(reply, result);
            }
            Command::Disconnect(reply) => {
                self.disconnect().await;
                self.reply(reply, Ok(()));
            }
            Command::Shutdown(done) => {
                let _ = done.send(());
            }
        }
    }

    /// Publish before answering so a caller that reads the snapshot after the
    /// reply sees its own command applied.
    fn reply<T>(&self, reply: Reply<T>, result: Result<T>) {
        self.publish();
        let _ = reply.send(result);
    }

    fn set_status(&mut self, status: Status) {
        if self.status != status {
            debug!(from = ?self.status, to = ?status, "status change");
        }
        self.status = status;
        if status == Status::Playing {
            self.schedule.start();
        } else {
            self.schedule.stop();
        }
    }

    fn current_track(&self) -> Option<&Track> {
        let at = self.tracker.position();
        self.rack.rack().get(at.slot)?.track(at.track)
    }

    /// Record a failed device call. The status is left as it was before the call.
    fn device_failed(&mut self, err: ChangerError) -> ChangerError {
        warn!(status = ?self.status, "{}", err);
        self.last_error = Some(err.to_string());
        err
    }

    async fn initialize(&mut self) -> Result<()> {
        match self.device.initialize().await {
            Ok(()) => {
                self.last_error = None;
                Ok(())
            }
            Err(e) => Err(self.device_failed(e)),
        }
    }

    /// Play the track at `target` from its start and make it the position.
    async fn start_track(&mut self, target: Position, cause: Cause) -> Result<()> {
        let track_id = self
            .rack
            .rack()
            .get(target.slot)
            .and_then(|album| album.track(target.track))
            .map(|track| track.id.clone())
            .ok_or(ChangerError::InvalidSlot(target.slot))?;

        if let Err(e) = self.device.play(Some(&track_id)).await {
            return Err(self.device_failed(e));
        }

        info!(slot = target.slot, track = target.track, ?cause, "playing");
        self.tracker.move_to(target, cause);
        self.last_error = None;
        self.set_status(Status::Playing);
        Ok(())
    }

    /// Stop playback locally, pausing the device if it was playing.
    async fn halt(&mut self) {
        if self.status == Status::Playing {
            if let Err(e) = self.device.pause().await {
                warn!("Failed to pause device while stopping: {}", e);
            }
        }
        self.set_status(Status::Stopped);
    }

    async fn load_album(&mut self, slot: usize, album: Album) -> Result<()> {
        info!(slot, album = %album.album_name, tracks = album.tracks.len(), "loading album");
        self.rack.load(slot, album)?;

        if slot == self.tracker.position().slot {
            self.halt().await;
            self.tracker.rewind();
        }
        Ok(())
    }

    async fn remove_album(&mut self, slot: usize) -> Result<Option<Album>> {
        let removed = self.rack.remove(slot)?;
        info!(slot, removed = removed.is_some(), "removed album");

        if slot == self.tracker.position().slot {
            self.halt().await;
            self.tracker.rewind();
        }
        Ok(removed)
    }

    async fn toggle_play_pause(&mut self) -> Result<Status> {
        if self.current_track().is_none() {
            debug!("Nothing to play in the current slot");
            return Ok(self.status);
        }

        match self.status {
            Status::Playing => {
                if let Err(e) = self.device.pause().await {
                    return Err(self.device_failed(e));
                }
                self.set_status(Status::Paused);
            }
            Status::Paused => {
                if let Err(e) = self.device.play(None).await {
                    return Err(self.device_failed(e));
                }
                self.last_error = None;
                self.set_status(Status::Playing);
            }
            Status::Stopped => {
                self.start_track(self.tracker.position(), Cause::User)
                    .await?;
            }
        }
        Ok(self.status)
    }

    async fn navigate(&mut self, step: Step, seen: u64) -> Result<Advance> {
        if self.tracker.overtaken_since(seen) {
            info!(?step, "position already advanced automatically, command coalesced");
            return Ok(Advance::Coalesced);
        }

        let at = self.tracker.position();
        let rack = self.rack.rack();
        let target = match step {
            Step::NextTrack => sequencer::next_track(rack, at),
            Step::PreviousTrack => sequencer::previous_track(rack, at),
            Step::NextAlbum => sequencer::next_album(rack, at.slot).map(|s| Position::new(s, 0)),
            Step::PreviousAlbum => {
                sequencer::previous_album(rack, at.slot).map(|s| Position::new(s, 0))
            }
        };

        let Some(target) = target else {
            info!(?step, slot = at.slot, track = at.track, "no target to move to");
            return Ok(Advance::NoTarget);
        };

        self.start_track(target, Cause::User).await?;
        Ok(Advance::Moved(target))
    }

    async fn select_slot(&mut self, slot: usize) -> Result<()> {
        Rack::check_slot(slot)?;
        if slot == self.tracker.position().slot {
            return Ok(());
        }

        let target = Position::new(slot, 0);
        if self.status == Status::Playing && self.rack.rack().is_playable(slot) {
            return self.start_track(target, Cause::User).await;
        }

        self.halt().await;
        self.tracker.move_to(target, Cause::User);
        Ok(())
    }

    async fn set_volume(&mut self, percent: u8) -> Result<u8> {
        let applied = self.device.set_volume(percent).await?;
        self.volume_percent = applied;
        Ok(applied)
    }

    async fn seek(&mut self, position_ms: u64) -> Result<()> {
        if !self.device.is_ready() {
            debug!(position_ms, "No device session, seek ignored");
            return Ok(());
        }
        if let Err(e) = self.device.seek(position_ms).await {
            return Err(self.device_failed(e));
        }
        self.tracker.seek(position_ms);
        Ok(())
    }

    async fn disconnect(&mut self) {
        self.halt().await;
        self.device.disconnect().await;
        self.last_error = None;
    }

    async fn poll_cycle(&mut self) {
        if self.status != Status::Playing {
            self.schedule.stop();
            return;
        }

        match self.device.get_state().await {
            Ok(Some(state)) => {
                let expected = self.current_track().map(|t| t.id.clone());
                let observation =
                    self.detector
                        .classify(&state, expected.as_deref(), self.tracker.progress_seen());

                match observation {
                    Observation::Progress(position_ms) => self.tracker.observe_remote(position_ms),
                    Observation::Foreign => {
                        debug!(reported = ?state.track_id, ?expected, "sample for another track")
                    }
                    Observation::Completed => self.advance_after_completion().await,
                }
            }
            Ok(None) => debug!("No playback state from device"),
            Err(e) => warn!("Failed to read playback state: {}", e),
        }

        if self.status == Status::Playing {
            self.schedule.rearm();
        } else {
            self.schedule.stop();
        }
    }

    async fn advance_after_completion(&mut self) {
        let at = self.tracker.position();
        self.tracker.observe_remote(0);

        let at_last_track = self
            .rack
            .rack()
            .get(at.slot)
            .and_then(Album::last_track_index)
            .map_or(true, |last| at.track >= last);

        let Some(target) = sequencer::next_track(self.rack.rack(), at) else {
            info!(slot = at.slot, track = at.track, "end of rack reached, stopping");
            self.set_status(Status::Stopped);
            return;
        };

        if at_last_track {
            info!(from = at.slot, to = target.slot, "album finished, changing disc");
        } else {
            debug!(slot = at.slot, track = at.track, "track finished");
        }

        // The device is idle at the end of the track, so a failed advance stops.
        if self.start_track(target, Cause::Auto).await.is_err() {
            self.set_status(Status::Stopped);
        }
    }
}
