//! Home feed
//!
//! The home page is six independent sections. They load concurrently and
//! each keeps its own `Result`, so one failing section never blanks the
//! others.

use crate::error::Result;
use crate::loader::{CatalogLoader, ChartLoadReport};
use crate::mapper::group_recommended;
use crate::models::{AlbumSummary, Banner, DiscoveryIcon, PlaylistSummary, RecommendedEntry, TrackSummary};
use tracing::{debug, instrument, warn};

/// "Songs from a recommended playlist" section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendedSongs {
    pub playlist: PlaylistSummary,
    pub tracks: Vec<TrackSummary>,
}

/// Every home section with its own outcome.
#[derive(Debug, Clone)]
pub struct HomeFeed {
    pub banners: Result<Vec<Banner>>,
    pub icons: Result<Vec<DiscoveryIcon>>,
    pub recommended: Result<Vec<RecommendedEntry>>,
    /// `Ok(None)` when there is no recommended playlist to draw from.
    pub recommended_songs: Result<Option<RecommendedSongs>>,
    pub charts: Result<ChartLoadReport>,
    pub newest_albums: Result<Vec<AlbumSummary>>,
}

impl HomeFeed {
    /// Number of sections that failed to load.
    pub fn failed_sections(&self) -> usize {
        [
            self.banners.is_err(),
            self.icons.is_err(),
            self.recommended.is_err(),
            self.recommended_songs.is_err(),
            self.charts.is_err(),
            self.newest_albums.is_err(),
        ]
        .iter()
        .filter(|failed| **failed)
        .count()
    }
}

/// Loads the [`HomeFeed`].
#[derive(Clone)]
pub struct HomeFeedLoader {
    loader: CatalogLoader,
}

impl HomeFeedLoader {
    pub fn new(loader: CatalogLoader) -> Self {
        Self { loader }
    }

    #[instrument(skip(self))]
    pub async fn load(&self) -> HomeFeed {
        let service = self.loader.service();
        let config = self.loader.config();

        let (banners, icons, recommended, recommended_songs, charts, newest_albums) = futures::join!(
            service.banners(),
            service.discovery_icons(),
            service.recommended_playlists(config.recommended_limit),
            self.recommended_songs(),
            self.loader.load_charts(),
            service.newest_albums(),
        );

        let feed = HomeFeed {
            banners,
            icons,
            recommended: recommended.map(group_recommended),
            recommended_songs,
            charts,
            newest_albums,
        };

        match feed.failed_sections() {
            0 => debug!("Home feed loaded"),
            failed => warn!(failed, "Home feed loaded with failed sections"),
        }
        feed
    }

    /// Reload only the recommended-songs section: the top recommended
    /// playlist and its first `recommended_song_limit` tracks.
    pub async fn recommended_songs(&self) -> Result<Option<RecommendedSongs>> {
        let service = self.loader.service();
        let limit = self.loader.config().recommended_song_limit;

        let Some(playlist) = service.recommended_playlists(1).await?.into_iter().next() else {
            return Ok(None);
        };
        let mut tracks = service.playlist_tracks(playlist.id, Some(limit)).await?;
        tracks.truncate(limit);
        Ok(Some(RecommendedSongs { playlist, tracks }))
    }
}
