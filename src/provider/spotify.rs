use crate::provider::{AlbumSummary, Catalog, OAuthToken, SearchHit, Track};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

const AUTH_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub(crate) const API_BASE: &str = "https://api.spotify.com/v1";

const SCOPES: [&str; 8] = [
    "streaming",
    "user-read-email",
    "user-read-private",
    "user-library-read",
    "user-read-playback-state",
    "user-modify-playback-state",
    "user-read-currently-playing",
    "app-remote-control",
];

#[derive(Clone)]
pub struct SpotifyProvider {
    client_id: String,
    client_secret: String,
    access_token: Option<String>,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct SpotifyTokenResponse {
    access_token: String,
    token_type: String,
    expires_in: i64,
    refresh_token: Option<String>,
    scope: Option<String>,
}

#[derive(Deserialize)]
struct SpotifySearchResponse {
    tracks: SpotifySearchTracks,
}

#[derive(Deserialize)]
struct SpotifySearchTracks {
    items: Vec<SpotifySearchTrack>,
}

#[derive(Deserialize)]
struct SpotifySearchTrack {
    id: String,
    album: SpotifyAlbumObject,
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyAlbumObject {
    id: String,
    name: String,
    #[serde(default)]
    images: Vec<SpotifyImage>,
    #[serde(default)]
    artists: Vec<SpotifyArtist>,
}

#[derive(Deserialize)]
struct SpotifyImage {
    url: String,
}

#[derive(Deserialize)]
struct SpotifyArtist {
    name: String,
}

#[derive(Deserialize)]
struct SpotifyTrackPage {
    items: Vec<SpotifyTrackObject>,
    next: Option<String>,
}

#[derive(Deserialize)]
struct SpotifyTrackObject {
    id: String,
    name: String,
    duration_ms: u64,
}

impl SpotifyTokenResponse {
    fn into_oauth_token(self) -> OAuthToken {
        OAuthToken {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at: Some(chrono::Utc::now().timestamp() + self.expires_in),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

impl From<SpotifyTrackObject> for Track {
    fn from(track: SpotifyTrackObject) -> Self {
        Track {
            id: track.id,
            name: track.name,
            duration_ms: track.duration_ms,
        }
    }
}

fn first_artist(artists: &[SpotifyArtist]) -> String {
    artists.first().map(|a| a.name.clone()).unwrap_or_default()
}

fn first_image(images: &[SpotifyImage]) -> String {
    images.first().map(|i| i.url.clone()).unwrap_or_default()
}

impl SpotifyProvider {
    pub fn new(client_id: String, client_secret: String) -> Self {
        Self {
            client_id,
            client_secret,
            access_token: None,
            http: reqwest::Client::new(),
        }
    }

    pub fn with_token(mut self, token: &OAuthToken) -> Self {
        self.access_token = Some(token.access_token.clone());
        self
    }

    fn get_token(&self) -> Result<&str> {
        self.access_token
            .as_deref()
            .context("Not authenticated with Spotify")
    }

    fn basic_auth_header(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.client_id, self.client_secret);
        base64::engine::general_purpose::STANDARD.encode(credentials)
    }

    pub fn oauth_url(&self, redirect_uri: &str, state: &str) -> String {
        format!(
            "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}&show_dialog=true",
            AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&SCOPES.join(" ")),
            urlencoding::encode(state),
        )
    }

    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<OAuthToken> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];

        self.token_request(&params)
            .await
            .map(|r| r.into_oauth_token())
    }

    pub async fn refresh_token(&self, token: &OAuthToken) -> Result<OAuthToken> {
        let refresh = token
            .refresh_token
            .as_ref()
            .context("No refresh token available")?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh.as_str()),
        ];

        let mut new_token = self.token_request(&params).await?.into_oauth_token();

        // Spotify doesn't always return a new refresh_token
        if new_token.refresh_token.is_none() {
            new_token.refresh_token = token.refresh_token.clone();
        }

        Ok(new_token)
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<SpotifyTokenResponse> {
        let response = self
            .http
            .post(TOKEN_URL)
            .header(
                "Authorization",
                format!("Basic {}", self.basic_auth_header()),
            )
            .form(params)
            .send()
            .await
            .context("Failed to send token request")?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Token request failed: {}", error_text);
        }

        response
            .json()
            .await
            .context("Failed to parse token response")
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Authorize and send a prepared request, failing on any non-2xx status.
    pub(crate) async fn api_send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let token = self.get_token()?;
        let response = request
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .context("Failed to send API request")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Spotify API error {}: {}", status, error_text);
        }

        Ok(response)
    }

    async fn api_get<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.api_send(self.http.get(url))
            .await?
            .json()
            .await
            .context("Failed to parse API response")
    }
}

#[async_trait]
impl Catalog for SpotifyProvider {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!(
            "{}/search?q={}&type=track&limit=20",
            API_BASE,
            urlencoding::encode(query)
        );

        let resp: SpotifySearchResponse = self.api_get(&url).await?;
        debug!(query, hits = resp.tracks.items.len(), "search finished");

        Ok(resp
            .tracks
            .items
            .into_iter()
            .map(|track| SearchHit {
                track_id: track.id,
                album_id: track.album.id,
                album_name: track.album.name,
                artist_name: first_artist(&track.artists),
                image_url: first_image(&track.album.images),
            })
            .collect())
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
        let mut tracks = Vec::new();
        let mut next_url = Some(format!("{}/albums/{}/tracks?limit=50", API_BASE, album_id));

        while let Some(url) = next_url {
            let page: SpotifyTrackPage = self
                .api_get(&url)
                .await
                .with_context(|| format!("Failed to fetch tracks for album {}", album_id))?;
            tracks.extend(page.items.into_iter().map(Track::from));
            next_url = page.next;
        }

        debug!(album_id, tracks = tracks.len(), "fetched album tracks");
        Ok(tracks)
    }

    async fn album(&self, album_id: &str) -> Result<AlbumSummary> {
        let url = format!("{}/albums/{}", API_BASE, album_id);
        let album: SpotifyAlbumObject = self.api_get(&url).await?;

        Ok(AlbumSummary {
            artist_name: first_artist(&album.artists),
            image_url: first_image(&album.images),
            id: album.id,
            album_name: album.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_url_requests_playback_scopes() {
        let provider = SpotifyProvider::new("client".into(), "secret".into());
        let url = provider.oauth_url("http://127.0.0.1:8888/callback", "xyz");

        assert!(url.starts_with(AUTH_URL));
        assert!(url.contains("client_id=client"));
        assert!(url.contains("user-modify-playback-state"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn search_payload_maps_album_metadata() {
        let json = r#"{"tracks":{"items":[{"id":"t1","artists":[{"name":"Miles Davis"}],
            "album":{"id":"a1","name":"Kind of Blue","images":[{"url":"http://img/1"}]}}]}}"#;
        let resp: SpotifySearchResponse = serde_json::from_str(json).unwrap();
        let track = &resp.tracks.items[0];

        assert_eq!(track.album.id, "a1");
        assert_eq!(first_artist(&track.artists), "Miles Davis");
        assert_eq!(first_image(&track.album.images), "http://img/1");
    }
}
