//! Track resolution and chart loading
//!
//! [`CatalogLoader::resolve`] turns a [`SongRequest`] into a playable list:
//! fetch the listing, resolve stream URLs for the whole id set in one call,
//! and merge the two by id. [`CatalogLoader::load_charts`] fans out one
//! preview request per chart.

use crate::error::{CatalogError, Result};
use crate::mapper::merge_stream_info;
use crate::models::{Chart, ChartSummary, Track, TrackId};
use crate::service::{CatalogService, SongRequest};
use core_runtime::config::{CatalogConfig, ChartFanoutPolicy};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of [`CatalogLoader::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTracks {
    /// Listing order; unresolvable tracks keep `url = None`.
    pub tracks: Vec<Track>,
    pub start_id: Option<TrackId>,
    /// Tracks left without a stream URL.
    pub unresolved: usize,
}

impl ResolvedTracks {
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// A chart whose preview could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartFailure {
    pub chart_id: i64,
    pub message: String,
}

/// Charts that loaded, in chart order, plus the ones that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartLoadReport {
    pub charts: Vec<Chart>,
    pub failures: Vec<ChartFailure>,
}

impl ChartLoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Loads track lists and charts through a [`CatalogService`].
#[derive(Clone)]
pub struct CatalogLoader {
    service: Arc<dyn CatalogService>,
    config: CatalogConfig,
    events: EventBus,
}

impl CatalogLoader {
    pub fn new(service: Arc<dyn CatalogService>, config: CatalogConfig, events: EventBus) -> Self {
        Self {
            service,
            config,
            events,
        }
    }

    pub fn service(&self) -> &Arc<dyn CatalogService> {
        &self.service
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// Fetch, resolve, and merge the tracks of `request`.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::ResourceUnavailable`] when the listing cannot be
    ///   fetched, or when a non-empty listing has no playable track.
    ///
    /// A failed or partial URL lookup is not an error by itself: affected
    /// tracks keep `url = None` and are counted in `unresolved`. An empty
    /// listing resolves to an empty result.
    #[instrument(skip(self), fields(request = %request))]
    pub async fn resolve(&self, request: SongRequest) -> Result<ResolvedTracks> {
        let label = request.to_string();
        let start_id = request.start_id();

        let mut tracks = self.fetch_listing(request).await.map_err(|e| {
            warn!(error = %e, "Track listing unavailable");
            CatalogError::ResourceUnavailable(format!("{}: {}", label, e))
        })?;

        if tracks.is_empty() {
            debug!("Listing is empty");
            return Ok(ResolvedTracks {
                tracks,
                start_id,
                unresolved: 0,
            });
        }

        let ids: Vec<TrackId> = tracks.iter().map(|t| t.id).collect();
        let unresolved = match self.service.stream_urls(&ids).await {
            Ok(streams) => merge_stream_info(&mut tracks, streams),
            Err(e) => {
                warn!(error = %e, "Stream URL resolution failed, tracks stay unresolved");
                tracks.iter().filter(|t| !t.is_playable()).count()
            }
        };

        info!(
            track_count = tracks.len(),
            unresolved, "Resolved track list"
        );
        Ok(ResolvedTracks {
            tracks,
            start_id,
            unresolved,
        })
    }

    async fn fetch_listing(&self, request: SongRequest) -> Result<Vec<Track>> {
        let summaries = match request {
            SongRequest::Songs { tracks, .. } => return Ok(tracks),
            SongRequest::Playlist { id, .. } => self.service.playlist_tracks(id, None).await?,
            SongRequest::Album { id } => self.service.album_tracks(id).await?,
        };
        Ok(summaries.iter().map(|s| s.to_track()).collect())
    }

    /// Load the first `chart_limit` charts with their track previews.
    ///
    /// Previews are fetched concurrently. Under
    /// [`ChartFanoutPolicy::PartialSuccess`] failed previews are reported in
    /// [`ChartLoadReport::failures`] (and as `ChartPreviewFailed` events);
    /// under [`ChartFanoutPolicy::AbortOnFirstError`] the first failure in
    /// chart order fails the whole call.
    #[instrument(skip(self))]
    pub async fn load_charts(&self) -> Result<ChartLoadReport> {
        let charts: Vec<ChartSummary> = self
            .service
            .top_charts()
            .await?
            .into_iter()
            .take(self.config.chart_limit)
            .collect();

        let preview_len = self.config.chart_preview_len;
        let previews = join_all(
            charts
                .iter()
                .map(|chart| self.service.playlist_tracks(chart.id, Some(preview_len))),
        )
        .await;

        let mut report = ChartLoadReport::default();
        for (chart, preview) in charts.into_iter().zip(previews) {
            match preview {
                Ok(mut tracks) => {
                    tracks.truncate(preview_len);
                    report.charts.push(chart.with_preview(tracks));
                }
                Err(e) => match self.config.chart_policy {
                    ChartFanoutPolicy::AbortOnFirstError => {
                        warn!(chart_id = chart.id, error = %e, "Chart preview failed, aborting");
                        return Err(e);
                    }
                    ChartFanoutPolicy::PartialSuccess => {
                        warn!(chart_id = chart.id, error = %e, "Chart preview failed, skipping chart");
                        let message = e.to_string();
                        let _ = self
                            .events
                            .emit(CoreEvent::Catalog(CatalogEvent::ChartPreviewFailed {
                                chart_id: chart.id,
                                message: message.clone(),
                            }));
                        report.failures.push(ChartFailure {
                            chart_id: chart.id,
                            message,
                        });
                    }
                },
            }
        }

        debug!(
            loaded = report.charts.len(),
            failed = report.failures.len(),
            "Charts loaded"
        );
        Ok(report)
    }
}
