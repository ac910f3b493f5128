use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
}

/// An album as it sits in a rack slot. Replaced wholesale, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: String,
    pub album_name: String,
    pub artist_name: String,
    pub image_url: String,
    pub tracks: Vec<Track>,
}

impl Album {
    pub fn track(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn last_track_index(&self) -> Option<usize> {
        self.tracks.len().checked_sub(1)
    }

    pub fn is_playable(&self) -> bool {
        !self.tracks.is_empty()
    }
}

/// One row of a catalog search: a track together with its album's display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub track_id: String,
    pub album_id: String,
    pub album_name: String,
    pub artist_name: String,
    pub image_url: String,
}

/// Album display data without tracks, as grouped from search hits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumSummary {
    pub id: String,
    pub album_name: String,
    pub artist_name: String,
    pub image_url: String,
}

impl AlbumSummary {
    pub fn with_tracks(self, tracks: Vec<Track>) -> Album {
        Album {
            id: self.id,
            album_name: self.album_name,
            artist_name: self.artist_name,
            image_url: self.image_url,
            tracks,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<i64>,
    pub token_type: String,
    pub scope: Option<String>,
}

impl OAuthToken {
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .is_some_and(|at| chrono::Utc::now().timestamp() >= at - 30)
    }
}
