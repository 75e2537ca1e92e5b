//! Catalog service contract
//!
//! [`CatalogService`] is the seam between the loaders and the remote API.
//! Production code uses [`crate::http::HttpCatalogService`]; tests mock it.

use crate::error::Result;
use crate::models::{
    AlbumSummary, Banner, ChartSummary, DiscoveryIcon, PlaylistSummary, StreamInfo, Track,
    TrackId, TrackSummary,
};
use async_trait::async_trait;
use std::fmt;

/// Remote catalog operations.
#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn banners(&self) -> Result<Vec<Banner>>;

    async fn discovery_icons(&self) -> Result<Vec<DiscoveryIcon>>;

    async fn recommended_playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>>;

    /// Tracks of a playlist; `None` fetches the whole playlist.
    async fn playlist_tracks(&self, id: i64, limit: Option<usize>) -> Result<Vec<TrackSummary>>;

    async fn album_tracks(&self, id: i64) -> Result<Vec<TrackSummary>>;

    /// Stream URLs for `ids`, in whatever order the server answers.
    async fn stream_urls(&self, ids: &[TrackId]) -> Result<Vec<StreamInfo>>;

    async fn top_charts(&self) -> Result<Vec<ChartSummary>>;

    async fn newest_albums(&self) -> Result<Vec<AlbumSummary>>;
}

/// What the user asked to play.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SongRequest {
    /// Tracks already known to the caller; only URLs are resolved.
    Songs {
        tracks: Vec<Track>,
        start_id: Option<TrackId>,
    },
    Playlist { id: i64, start_id: Option<TrackId> },
    /// An album always starts at its first track.
    Album { id: i64 },
}

impl SongRequest {
    pub fn start_id(&self) -> Option<TrackId> {
        match self {
            SongRequest::Songs { start_id, .. } | SongRequest::Playlist { start_id, .. } => {
                *start_id
            }
            SongRequest::Album { .. } => None,
        }
    }
}

impl fmt::Display for SongRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SongRequest::Songs { tracks, .. } => write!(f, "songs:{}", tracks.len()),
            SongRequest::Playlist { id, .. } => write!(f, "playlist:{}", id),
            SongRequest::Album { id } => write!(f, "album:{}", id),
        }
    }
}
