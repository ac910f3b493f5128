#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::Notify;

use changer::playback::{DeviceBackend, DeviceReport, Orchestrator, OrchestratorHandle, PlaybackState};
use changer::provider::{Album, Track};
use changer::state::{Config, Store};

pub const DEVICE: &str = "fake-device";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Connect(Option<String>),
    Start(Option<String>),
    Pause,
    Seek(u64),
    Volume(u8),
    Report,
    Release,
}

#[derive(Debug, Clone)]
pub enum ConnectScript {
    Device(String),
    NoDevice,
    Fail,
}

struct FakeState {
    calls: Vec<Call>,
    connect: ConnectScript,
    fail_start: bool,
    start_delay: Option<Duration>,
    reports: VecDeque<DeviceReport>,
    last_report: DeviceReport,
}

/// Scriptable device backend. Clones share state, so a test keeps one clone
/// while the orchestrator owns another.
#[derive(Clone)]
pub struct FakeDevice {
    state: Arc<Mutex<FakeState>>,
    /// Woken (via `notify_waiters`) whenever `start` is entered.
    pub started: Arc<Notify>,
}

impl Default for FakeDevice {
    fn default() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                connect: ConnectScript::Device(DEVICE.to_string()),
                fail_start: false,
                start_delay: None,
                reports: VecDeque::new(),
                last_report: DeviceReport::Ready(None),
            })),
            started: Arc::new(Notify::new()),
        }
    }
}

impl FakeDevice {
    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(c)).count()
    }

    /// Track ids passed to `start`, in order. Resumes are skipped.
    pub fn started_tracks(&self) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Start(Some(id)) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn set_connect(&self, script: ConnectScript) {
        self.lock().connect = script;
    }

    pub fn fail_start(&self, fail: bool) {
        self.lock().fail_start = fail;
    }

    pub fn delay_start(&self, delay: Duration) {
        self.lock().start_delay = Some(delay);
    }

    /// Queue reports to hand out one per poll. The last one repeats.
    pub fn script_reports(&self, reports: impl IntoIterator<Item = DeviceReport>) {
        self.lock().reports.extend(reports);
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }
}

#[async_trait]
impl DeviceBackend for FakeDevice {
    async fn connect(&self, remembered: Option<&str>) -> Result<Option<String>> {
        self.record(Call::Connect(remembered.map(str::to_string)));
        match self.lock().connect.clone() {
            ConnectScript::Device(id) => Ok(Some(id)),
            ConnectScript::NoDevice => Ok(None),
            ConnectScript::Fail => bail!("player refused to start"),
        }
    }

    async fn start(&self, _device: &str, track_id: Option<&str>) -> Result<()> {
        self.record(Call::Start(track_id.map(str::to_string)));
        self.started.notify_waiters();

        let (delay, fail) = {
            let state = self.lock();
            (state.start_delay, state.fail_start)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if fail {
            bail!("device rejected play");
        }
        Ok(())
    }

    async fn pause(&self, _device: &str) -> Result<()> {
        self.record(Call::Pause);
        Ok(())
    }

    async fn seek(&self, _device: &str, position_ms: u64) -> Result<()> {
        self.record(Call::Seek(position_ms));
        Ok(())
    }

    async fn set_volume(&self, _device: &str, percent: u8) -> Result<()> {
        self.record(Call::Volume(percent));
        Ok(())
    }

    async fn report(&self, _device: &str) -> Result<DeviceReport> {
        self.record(Call::Report);
        let mut state = self.lock();
        if let Some(next) = state.reports.pop_front() {
            state.last_report = next;
        }
        Ok(state.last_report.clone())
    }

    async fn release(&self, _device: &str) -> Result<()> {
        self.record(Call::Release);
        Ok(())
    }
}

pub fn album(id: &str, tracks: usize) -> Album {
    Album {
        id: id.to_string(),
        album_name: format!("Album {id}"),
        artist_name: "Artist".to_string(),
        image_url: String::new(),
        tracks: (0..tracks)
            .map(|i| Track {
                id: track_id(id, i),
                name: format!("Track {i}"),
                duration_ms: 180_000,
            })
            .collect(),
    }
}

pub fn track_id(album: &str, index: usize) -> String {
    format!("{album}-{index}")
}

pub fn playing(track: &str, position_ms: u64) -> DeviceReport {
    DeviceReport::Ready(Some(PlaybackState {
        position_ms,
        duration_ms: 180_000,
        is_paused: false,
        track_id: Some(track.to_string()),
    }))
}

/// What the device shows once a track has run out.
pub fn finished(track: &str) -> DeviceReport {
    DeviceReport::Ready(Some(PlaybackState {
        position_ms: 0,
        duration_ms: 180_000,
        is_paused: true,
        track_id: Some(track.to_string()),
    }))
}

pub struct Harness {
    pub dir: TempDir,
    pub store: Store,
    pub device: FakeDevice,
    pub changer: OrchestratorHandle,
}

pub fn config(dir: &TempDir) -> Config {
    Config {
        data_dir: dir.path().to_path_buf(),
        poll_interval_ms: 1000,
        ..Config::default()
    }
}

/// Orchestrator over a fresh store and a fake device, with `albums` loaded as
/// `(slot, album id, track count)`.
pub async fn harness(albums: &[(usize, &str, usize)]) -> Harness {
    let dir = TempDir::new().unwrap();
    let config = config(&dir);
    let store = Store::open(&config.store_path()).unwrap();
    let device = FakeDevice::default();
    let changer = Orchestrator::spawn(device.clone(), store.clone(), &config);

    for &(slot, id, tracks) in albums {
        changer.load_album(slot, album(id, tracks)).await.unwrap();
    }

    Harness {
        dir,
        store,
        device,
        changer,
    }
}
