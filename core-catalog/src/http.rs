//! HTTP-backed [`CatalogService`]

use crate::dto::{
    BannerListDto, BaseDto, IconListDto, NewestAlbumListDto, PersonalizedListDto, SongListDto,
    SongUrlListDto, TopListDto,
};
use crate::error::{CatalogError, Result};
use crate::models::{
    AlbumSummary, Banner, ChartSummary, DiscoveryIcon, PlaylistSummary, StreamInfo, TrackId,
    TrackSummary,
};
use crate::service::CatalogService;
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::time::Clock;
use core_auth::SessionStore;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// `playlist/track/all` has no "everything" switch; this limit stands in.
const FULL_PLAYLIST_LIMIT: usize = i32::MAX as usize;

/// Catalog client over the host [`HttpClient`].
///
/// Every request gets a `timeStamp` query parameter and the stored session
/// cookie. A non-2xx status or a body `code` other than 200 is reported as
/// [`CatalogError::Remote`].
pub struct HttpCatalogService {
    http: Arc<dyn HttpClient>,
    base_url: String,
    clock: Arc<dyn Clock>,
    session: SessionStore,
    stream_quality: String,
}

impl HttpCatalogService {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        clock: Arc<dyn Clock>,
        session: SessionStore,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clock,
            session,
            stream_quality: "exhigh".to_string(),
        }
    }

    /// Quality level requested from `song/url/v1`.
    pub fn with_stream_quality(mut self, quality: impl Into<String>) -> Self {
        self.stream_quality = quality.into();
        self
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let mut request = HttpRequest::get(format!("{}/{}", self.base_url, path));
        for (key, value) in query {
            request = request.query(key, value);
        }
        let request = request
            .query("timeStamp", self.clock.unix_timestamp_millis().to_string())
            .header("Cookie", self.session.cookie_header().await);

        debug!(path, "Fetching catalog resource");
        let response = self.http.execute(request).await?.error_for_status()?;

        let base: BaseDto = response.json()?;
        if !base.is_success() {
            warn!(path, code = base.code, "Catalog request rejected");
            return Err(CatalogError::Remote(base.message.unwrap_or_else(|| {
                format!("{} returned code {}", path, base.code)
            })));
        }
        Ok(response.json()?)
    }
}

#[async_trait]
impl CatalogService for HttpCatalogService {
    #[instrument(skip(self))]
    async fn banners(&self) -> Result<Vec<Banner>> {
        let dto: BannerListDto = self.get("banner", &[]).await?;
        Ok(dto.banners.into_iter().map(Banner::from).collect())
    }

    #[instrument(skip(self))]
    async fn discovery_icons(&self) -> Result<Vec<DiscoveryIcon>> {
        let dto: IconListDto = self.get("homepage/dragon/ball", &[]).await?;
        Ok(dto.data.into_iter().map(DiscoveryIcon::from).collect())
    }

    #[instrument(skip(self))]
    async fn recommended_playlists(&self, limit: usize) -> Result<Vec<PlaylistSummary>> {
        let dto: PersonalizedListDto = self
            .get("personalized", &[("limit", limit.to_string())])
            .await?;
        Ok(dto.result.into_iter().map(PlaylistSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn playlist_tracks(&self, id: i64, limit: Option<usize>) -> Result<Vec<TrackSummary>> {
        let limit = limit.unwrap_or(FULL_PLAYLIST_LIMIT);
        let dto: SongListDto = self
            .get(
                "playlist/track/all",
                &[
                    ("id", id.to_string()),
                    ("limit", limit.to_string()),
                    ("offset", "0".to_string()),
                ],
            )
            .await?;
        Ok(dto.songs.into_iter().map(TrackSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn album_tracks(&self, id: i64) -> Result<Vec<TrackSummary>> {
        let dto: SongListDto = self.get("album", &[("id", id.to_string())]).await?;
        Ok(dto.songs.into_iter().map(TrackSummary::from).collect())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn stream_urls(&self, ids: &[TrackId]) -> Result<Vec<StreamInfo>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(TrackId::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let dto: SongUrlListDto = self
            .get(
                "song/url/v1",
                &[("id", joined), ("level", self.stream_quality.clone())],
            )
            .await?;
        Ok(dto.data.into_iter().map(StreamInfo::from).collect())
    }

    #[instrument(skip(self))]
    async fn top_charts(&self) -> Result<Vec<ChartSummary>> {
        let dto: TopListDto = self.get("toplist/detail", &[]).await?;
        Ok(dto.list.into_iter().map(ChartSummary::from).collect())
    }

    #[instrument(skip(self))]
    async fn newest_albums(&self) -> Result<Vec<AlbumSummary>> {
        let dto: NewestAlbumListDto = self.get("album/newest", &[]).await?;
        Ok(dto.albums.into_iter().map(AlbumSummary::from).collect())
    }
}
