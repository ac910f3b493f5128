use std::collections::HashSet;

use anyhow::Result;
use async_trait::async_trait;

use crate::error::ChangerError;
use crate::provider::{Album, AlbumSummary, SearchHit, Track};

/// Album and track lookup.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>>;

    /// All tracks of an album, in album order.
    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>>;

    async fn album(&self, album_id: &str) -> Result<AlbumSummary>;
}

/// Collapse track hits into albums. The first hit of an album supplies its
/// display metadata; result order follows first appearance.
pub fn group_by_album(hits: Vec<SearchHit>) -> Vec<AlbumSummary> {
    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|hit| seen.insert(hit.album_id.clone()))
        .map(|hit| AlbumSummary {
            id: hit.album_id,
            album_name: hit.album_name,
            artist_name: hit.artist_name,
            image_url: hit.image_url,
        })
        .collect()
}

pub async fn fetch_album(catalog: &dyn Catalog, summary: AlbumSummary) -> Result<Album> {
    let tracks = catalog.album_tracks(&summary.id).await?;
    Ok(summary.with_tracks(tracks))
}

/// Resolve an album id into a rack-ready album with its full track list.
pub async fn lookup_album(catalog: &dyn Catalog, album_id: &str) -> crate::Result<Album> {
    let summary = catalog
        .album(album_id)
        .await
        .map_err(|e| ChangerError::Catalog(format!("{e:#}")))?;
    fetch_album(catalog, summary)
        .await
        .map_err(|e| ChangerError::Catalog(format!("{e:#}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct OneAlbum;

    #[async_trait]
    impl Catalog for OneAlbum {
        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>> {
            Ok(Vec::new())
        }

        async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>> {
            Ok((0..3)
                .map(|i| Track {
                    id: format!("{album_id}-{i}"),
                    name: format!("Track {i}"),
                    duration_ms: 200_000,
                })
                .collect())
        }

        async fn album(&self, album_id: &str) -> Result<AlbumSummary> {
            if album_id != "a1" {
                anyhow::bail!("album {} not found", album_id);
            }
            Ok(AlbumSummary {
                id: album_id.to_string(),
                album_name: "Giant Steps".to_string(),
                artist_name: "John Coltrane".to_string(),
                image_url: String::new(),
            })
        }
    }

    #[tokio::test]
    async fn lookup_builds_full_album() {
        let album = lookup_album(&OneAlbum, "a1").await.unwrap();
        assert_eq!(album.album_name, "Giant Steps");
        assert_eq!(album.tracks.len(), 3);
        assert_eq!(album.tracks[2].id, "a1-2");
    }

    #[tokio::test]
    async fn lookup_failure_is_a_catalog_error() {
        let err = lookup_album(&OneAlbum, "missing").await.unwrap_err();
        assert!(matches!(err, ChangerError::Catalog(_)));
    }

    fn hit(track: &str, album: &str, name: &str) -> SearchHit {
        SearchHit {
            track_id: track.to_string(),
            album_id: album.to_string(),
            album_name: name.to_string(),
            artist_name: "Artist".to_string(),
            image_url: String::new(),
        }
    }

    #[test]
    fn first_hit_wins_for_album_metadata() {
        let albums = group_by_album(vec![
            hit("t1", "a1", "Kind of Blue"),
            hit("t2", "a2", "Blue Train"),
            hit("t3", "a1", "Kind of Blue (Legacy Edition)"),
        ]);

        assert_eq!(albums.len(), 2);
        assert_eq!(albums[0].id, "a1");
        assert_eq!(albums[0].album_name, "Kind of Blue");
        assert_eq!(albums[1].id, "a2");
    }
}
