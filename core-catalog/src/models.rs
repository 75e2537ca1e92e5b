//! Catalog domain types
//!
//! What the rest of the core sees of the remote catalog. Wire formats live in
//! [`crate::dto`]; conversions live in [`crate::mapper`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Song identifier. Two tracks are the same song iff their ids match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackId(pub i64);

impl TrackId {
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for TrackId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// A playable (or not yet resolved) song.
///
/// `url` stays `None` until stream resolution finds one; such a track can be
/// queued and displayed but not started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub name: String,
    /// Display line, e.g. `"Artist A - Artist B - Album"`.
    pub artist: String,
    pub cover_url: String,
    pub url: Option<String>,
    pub duration_ms: u64,
    /// The stream is a paid preview or requires a subscription.
    pub pay_gated: bool,
}

impl Track {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        artist: impl Into<String>,
        cover_url: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId(id),
            name: name.into(),
            artist: artist.into(),
            cover_url: cover_url.into(),
            url: None,
            duration_ms: 0,
            pay_gated: false,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_playable(&self) -> bool {
        self.url.is_some()
    }
}

/// One row of a playlist, album, or chart listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackSummary {
    pub id: TrackId,
    pub name: String,
    pub artists: Vec<String>,
    pub album_id: i64,
    pub album: String,
    pub cover_url: String,
    pub mv_id: i64,
}

/// Stream resolution for one track, as returned by `song/url/v1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub id: TrackId,
    /// `None` when the server has no stream for this account.
    pub url: Option<String>,
    pub duration_ms: u64,
    pub pay_gated: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub image_url: String,
    pub target_id: i64,
    pub target_type: i64,
    pub title_color: String,
    pub type_title: String,
}

/// Shortcut icon on the home page ("daily mix", "radio", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryIcon {
    pub id: i64,
    pub icon_url: String,
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: i64,
    pub name: String,
    pub pic_url: String,
    pub play_count: i64,
    pub kind: i64,
}

/// Entry of the recommended-playlist section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendedEntry {
    /// Several playlists rendered as one rotating card.
    Carousel(Vec<PlaylistSummary>),
    Playlist(PlaylistSummary),
}

/// A chart as listed by `toplist/detail`, before its preview is fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSummary {
    pub id: i64,
    pub name: String,
    pub cover_url: String,
    pub description: String,
    pub play_count: i64,
    pub update_frequency: String,
}

/// A chart with its first few tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chart {
    pub id: i64,
    pub name: String,
    pub play_count: i64,
    pub preview: Vec<TrackSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumSummary {
    pub id: i64,
    pub name: String,
    pub pic_url: String,
    pub artist: String,
}
