use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use changer::playback::{DeviceBackend, DeviceReport, Orchestrator, OrchestratorHandle, SpotifyPlayer};
use changer::provider::{OAuthToken, SpotifyProvider};
use changer::state::store::CREDENTIALS_KEY;
use changer::state::{Config, Store};

pub fn client() -> Result<SpotifyProvider> {
    let client_id = std::env::var("SPOTIFY_CLIENT_ID").context("SPOTIFY_CLIENT_ID not set")?;
    let client_secret =
        std::env::var("SPOTIFY_CLIENT_SECRET").context("SPOTIFY_CLIENT_SECRET not set")?;
    Ok(SpotifyProvider::new(client_id, client_secret))
}

pub fn open_store(config: &Config) -> Result<Store> {
    Store::open(&config.store_path())
}

/// Authenticated Spotify client, refreshing and re-saving the token if it expired.
pub async fn create_provider(store: &Store) -> Result<SpotifyProvider> {
    let spotify = client()?;
    let mut token: OAuthToken = store
        .get(CREDENTIALS_KEY)?
        .context("No credentials found. Please run 'changer auth' first.")?;

    if token.is_expired() {
        info!("Access token expired, refreshing");
        token = spotify
            .refresh_token(&token)
            .await
            .context("Failed to refresh token. Run 'changer auth' again.")?;
        store.put(CREDENTIALS_KEY, &token)?;
    }

    Ok(spotify.with_token(&token))
}

/// Orchestrator over the Spotify Connect player. Nothing talks to the device
/// until playback is requested.
pub async fn spawn_orchestrator(config: &Config) -> Result<(OrchestratorHandle, SpotifyProvider)> {
    let store = open_store(config)?;
    let provider = create_provider(&store).await?;
    let player = SpotifyPlayer::new(provider.clone(), config.device_name.clone());
    Ok((Orchestrator::spawn(player, store, config), provider))
}

/// Backend for commands that only touch the rack or stored settings. It never
/// finds a device, so nothing can start playing.
struct Offline;

#[async_trait]
impl DeviceBackend for Offline {
    async fn connect(&self, _remembered: Option<&str>) -> Result<Option<String>> {
        Ok(None)
    }

    async fn start(&self, _device: &str, _track_id: Option<&str>) -> Result<()> {
        anyhow::bail!("offline")
    }

    async fn pause(&self, _device: &str) -> Result<()> {
        Ok(())
    }

    async fn seek(&self, _device: &str, _position_ms: u64) -> Result<()> {
        Ok(())
    }

    async fn set_volume(&self, _device: &str, _percent: u8) -> Result<()> {
        Ok(())
    }

    async fn report(&self, _device: &str) -> Result<DeviceReport> {
        Ok(DeviceReport::NotReady)
    }

    async fn release(&self, _device: &str) -> Result<()> {
        Ok(())
    }
}

/// Orchestrator without Spotify credentials, for rack and volume edits.
pub fn spawn_offline(config: &Config) -> Result<OrchestratorHandle> {
    let store = open_store(config)?;
    Ok(Orchestrator::spawn(Offline, store, config))
}

/// Extract an album id from an open.spotify.com URL, or return the input as-is.
pub fn extract_album_id(input: &str) -> String {
    if input.contains("spotify.com/album/") {
        return input
            .split("album/")
            .nth(1)
            .and_then(|s| s.split('?').next())
            .unwrap_or(input)
            .to_string();
    }
    if let Some(id) = input.strip_prefix("spotify:album:") {
        return id.to_string();
    }
    input.to_string()
}

pub fn format_duration(ms: u64) -> String {
    let secs = ms / 1000;
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use changer::state::store::VOLUME_KEY;

    #[test]
    fn album_ids_come_out_of_urls() {
        assert_eq!(
            extract_album_id("https://open.spotify.com/album/4sb0eMpDn3upAFfyi4q2rw?si=abc"),
            "4sb0eMpDn3upAFfyi4q2rw"
        );
        assert_eq!(extract_album_id("spotify:album:xyz"), "xyz");
        assert_eq!(extract_album_id("plainid"), "plainid");
    }

    #[tokio::test]
    async fn rack_and_volume_edits_work_without_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(dir.path()).unwrap();
        let handle = spawn_offline(&config).unwrap();

        assert_eq!(handle.set_volume(35).await.unwrap(), 35);
        assert!(handle.remove_album(4).await.unwrap().is_none());
        assert!(!handle.snapshot().session.device_ready);
        handle.shutdown().await;

        let store = open_store(&config).unwrap();
        assert_eq!(store.get::<u8>(VOLUME_KEY).unwrap(), Some(35));
    }

    #[test]
    fn durations_render_as_minutes_and_seconds() {
        assert_eq!(format_duration(0), "00:00");
        assert_eq!(format_duration(185_400), "03:05");
    }
}
