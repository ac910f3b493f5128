//! Device adapter over a remote playback endpoint.
//!
//! [`DeviceBackend`] is the raw transport: it knows how to talk to one kind of
//! device and nothing else. [`DeviceAdapter`] wraps a backend with the session
//! rules the orchestrator relies on: lazy initialization, persisted volume,
//! remembered device identity, and no-op behavior when no session exists.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{ChangerError, Result};
use crate::state::store::{Store, DEVICE_KEY, VOLUME_KEY};

pub const DEFAULT_VOLUME: u8 = 50;

/// What the device last reported about its playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub position_ms: u64,
    pub duration_ms: u64,
    pub is_paused: bool,
    pub track_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReport {
    /// Device is up. `None` when it has nothing loaded.
    Ready(Option<PlaybackState>),
    /// Device went away or is no longer the active player.
    NotReady,
}

#[async_trait]
pub trait DeviceBackend: Send + Sync + 'static {
    /// Locate a device to play on. `remembered` is the token of the device used
    /// last time, if any. `Ok(None)` means no device is currently ready.
    async fn connect(&self, remembered: Option<&str>) -> anyhow::Result<Option<String>>;

    /// Start `track_id` from the beginning, or resume when `None`.
    async fn start(&self, device: &str, track_id: Option<&str>) -> anyhow::Result<()>;

    async fn pause(&self, device: &str) -> anyhow::Result<()>;

    async fn seek(&self, device: &str, position_ms: u64) -> anyhow::Result<()>;

    async fn set_volume(&self, device: &str, percent: u8) -> anyhow::Result<()>;

    async fn report(&self, device: &str) -> anyhow::Result<DeviceReport>;

    async fn release(&self, device: &str) -> anyhow::Result<()>;
}

struct DeviceSession {
    device_id: String,
}

pub struct DeviceAdapter<B> {
    backend: B,
    store: Store,
    session: Option<DeviceSession>,
}

impl<B: DeviceBackend> DeviceAdapter<B> {
    pub fn new(backend: B, store: Store) -> Self {
        Self {
            backend,
            store,
            session: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_some()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.device_id.as_str())
    }

    /// Persisted volume, or the default when none was ever set.
    pub fn volume_percent(&self) -> u8 {
        match self.store.get::<u8>(VOLUME_KEY) {
            Ok(volume) => volume.unwrap_or(DEFAULT_VOLUME).min(100),
            Err(e) => {
                warn!("Stored volume is unreadable: {:#}", e);
                DEFAULT_VOLUME
            }
        }
    }

    /// Establish the device session. Does nothing when one already exists.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.session.is_some() {
            debug!("Device already initialized");
            return Ok(());
        }

        let remembered = self.store.get::<String>(DEVICE_KEY).ok().flatten();
        info!(remembered = ?remembered, "Initializing device");

        let device_id = self
            .backend
            .connect(remembered.as_deref())
            .await
            .map_err(|e| ChangerError::InitializationFailed(format!("{e:#}")))?
            .ok_or(ChangerError::NoActiveDevice)?;

        if let Err(e) = self.store.put(DEVICE_KEY, &device_id) {
            warn!("Failed to remember device {}: {:#}", device_id, e);
        }

        let volume = self.volume_percent();
        if let Err(e) = self.backend.set_volume(&device_id, volume).await {
            warn!("Failed to apply starting volume {}: {:#}", volume, e);
        }

        info!(device_id = %device_id, volume, "Device ready");
        self.session = Some(DeviceSession { device_id });
        Ok(())
    }

    /// Play `track_id` from its start, or resume when `None`. Initializes the
    /// session first if needed.
    pub async fn play(&mut self, track_id: Option<&str>) -> Result<()> {
        if self.session.is_none() {
            debug!("No device session, initializing before play");
            self.initialize().await?;
        }
        let device = self.device_id().ok_or(ChangerError::NoActiveDevice)?;

        debug!(device, track_id = ?track_id, "play");
        self.backend
            .start(device, track_id)
            .await
            .map_err(ChangerError::device)
    }

    pub async fn pause(&mut self) -> Result<()> {
        let Some(device) = self.device_id() else {
            debug!("No device session, pause ignored");
            return Ok(());
        };

        self.backend.pause(device).await.map_err(ChangerError::device)
    }

    pub async fn seek(&mut self, position_ms: u64) -> Result<()> {
        let Some(device) = self.device_id() else {
            debug!("No device session, seek ignored");
            return Ok(());
        };

        self.backend
            .seek(device, position_ms)
            .await
            .map_err(ChangerError::device)
    }

    /// Persist `percent` and apply it to the device if there is one. A device
    /// failure is logged and does not undo the persisted value.
    pub async fn set_volume(&mut self, percent: u8) -> Result<u8> {
        let percent = percent.min(100);
        self.store
            .put(VOLUME_KEY, &percent)
            .map_err(ChangerError::storage)?;

        match self.device_id() {
            Some(device) => {
                if let Err(e) = self.backend.set_volume(device, percent).await {
                    warn!("Failed to set device volume to {}: {:#}", percent, e);
                }
            }
            None => debug!(percent, "No device session, volume stored only"),
        }

        Ok(percent)
    }

    pub async fn get_state(&mut self) -> Result<Option<PlaybackState>> {
        let Some(device) = self.device_id() else {
            return Ok(None);
        };

        let report = self
            .backend
            .report(device)
            .await
            .map_err(ChangerError::device)?;

        match report {
            DeviceReport::Ready(state) => Ok(state),
            DeviceReport::NotReady => {
                warn!("Device has gone offline");
                self.forget_device();
                Ok(None)
            }
        }
    }

    /// Tear down the session and forget the device.
    pub async fn disconnect(&mut self) {
        if let Some(session) = self.session.as_ref() {
            if let Err(e) = self.backend.release(&session.device_id).await {
                warn!("Failed to release device {}: {:#}", session.device_id, e);
            }
            info!(device = %session.device_id, "Device disconnected");
        }
        self.forget_device();
    }

    fn forget_device(&mut self) {
        self.session = None;
        if let Err(e) = self.store.remove(DEVICE_KEY) {
            warn!("Failed to clear device token: {:#}", e);
        }
    }
}
