use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::playback::device::{DeviceBackend, DeviceReport, PlaybackState};
use crate::provider::spotify::API_BASE;
use crate::provider::SpotifyProvider;

/// Drives a Spotify Connect device through the Web API player endpoints.
pub struct SpotifyPlayer {
    api: SpotifyProvider,
    device_name: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyDevices {
    devices: Vec<SpotifyDevice>,
}

#[derive(Deserialize)]
struct SpotifyDevice {
    id: Option<String>,
    name: String,
    #[serde(default)]
    is_active: bool,
    #[serde(default)]
    is_restricted: bool,
}

#[derive(Deserialize)]
struct SpotifyPlayerState {
    device: Option<SpotifyDevice>,
    progress_ms: Option<u64>,
    is_playing: bool,
    item: Option<SpotifyPlayingItem>,
}

#[derive(Deserialize)]
struct SpotifyPlayingItem {
    id: Option<String>,
    duration_ms: u64,
}

impl SpotifyPlayer {
    pub fn new(api: SpotifyProvider, device_name: Option<String>) -> Self {
        Self { api, device_name }
    }

    fn player_url(path: &str, device: &str, extra: &[(&str, String)]) -> String {
        let mut url = format!(
            "{}/me/player/{}?device_id={}",
            API_BASE,
            path,
            urlencoding::encode(device)
        );
        for (key, value) in extra {
            url.push_str(&format!("&{}={}", key, urlencoding::encode(value)));
        }
        url
    }

    async fn put(&self, url: String, body: Option<serde_json::Value>) -> Result<()> {
        let mut request = self.api.http().put(&url);
        request = match body {
            Some(body) => request.json(&body),
            None => request.header("Content-Length", "0"),
        };
        self.api.api_send(request).await?;
        Ok(())
    }

    /// Preferred name, then the remembered device, then the active one, then any.
    fn pick_device(&self, devices: Vec<SpotifyDevice>, remembered: Option<&str>) -> Option<String> {
        let usable: Vec<SpotifyDevice> = devices
            .into_iter()
            .filter(|d| d.id.is_some() && !d.is_restricted)
            .collect();

        let by_name = self
            .device_name
            .as_deref()
            .and_then(|name| usable.iter().find(|d| d.name.eq_ignore_ascii_case(name)));
        let by_token = remembered.and_then(|id| usable.iter().find(|d| d.id.as_deref() == Some(id)));

        by_name
            .or(by_token)
            .or_else(|| usable.iter().find(|d| d.is_active))
            .or_else(|| usable.first())
            .and_then(|d| d.id.clone())
    }
}

#[async_trait]
impl DeviceBackend for SpotifyPlayer {
    async fn connect(&self, remembered: Option<&str>) -> Result<Option<String>> {
        let url = format!("{}/me/player/devices", API_BASE);
        let devices: SpotifyDevices = self
            .api
            .api_send(self.api.http().get(&url))
            .await?
            .json()
            .await
            .context("Failed to parse device list")?;

        debug!(count = devices.devices.len(), "listed Spotify Connect devices");
        Ok(self.pick_device(devices.devices, remembered))
    }

    async fn start(&self, device: &str, track_id: Option<&str>) -> Result<()> {
        let body = track_id.map(|id| {
            serde_json::json!({
                "uris": [format!("spotify:track:{}", id)],
                "position_ms": 0
            })
        });
        self.put(Self::player_url("play", device, &[]), body)
            .await
            .context("Failed to start playback")
    }

    async fn pause(&self, device: &str) -> Result<()> {
        self.put(Self::player_url("pause", device, &[]), None)
            .await
            .context("Failed to pause playback")
    }

    async fn seek(&self, device: &str, position_ms: u64) -> Result<()> {
        let extra = [("position_ms", position_ms.to_string())];
        self.put(Self::player_url("seek", device, &extra), None)
            .await
            .context("Failed to seek")
    }

    async fn set_volume(&self, device: &str, percent: u8) -> Result<()> {
        let extra = [("volume_percent", percent.to_string())];
        self.put(Self::player_url("volume", device, &extra), None)
            .await
            .context("Failed to set volume")
    }

    async fn report(&self, device: &str) -> Result<DeviceReport> {
        let url = format!("{}/me/player", API_BASE);
        let response = self.api.api_send(self.api.http().get(&url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(DeviceReport::Ready(None));
        }

        let state: SpotifyPlayerState = response
            .json()
            .await
            .context("Failed to parse playback state")?;
        Ok(to_report(state, device))
    }

    async fn release(&self, device: &str) -> Result<()> {
        self.pause(device).await
    }
}

fn to_report(state: SpotifyPlayerState, device: &str) -> DeviceReport {
    let on_our_device = state
        .device
        .as_ref()
        .and_then(|d| d.id.as_deref())
        .is_some_and(|id| id == device);
    if !on_our_device {
        return DeviceReport::NotReady;
    }

    DeviceReport::Ready(Some(PlaybackState {
        position_ms: state.progress_ms.unwrap_or(0),
        duration_ms: state.item.as_ref().map(|i| i.duration_ms).unwrap_or(0),
        is_paused: !state.is_playing,
        track_id: state.item.and_then(|i| i.id),
    }))
}
