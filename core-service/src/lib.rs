//! Core service façade and bootstrap.
//!
//! This crate wires host-provided bridges (HTTP, settings, media engine)
//! into the catalog, login, and playback crates and exposes one handle to
//! the host application. Desktop apps typically enable the `desktop-shims`
//! feature (which depends on `bridge-desktop`) so HTTP and settings fall back
//! to built-in implementations.
//!
//! ```ignore
//! let config = CoreConfig::builder()
//!     .api_base_url("http://localhost:3000")
//!     .settings_path(data_dir.join("settings.db"))
//!     .media_engine(engine)
//!     .build()?;
//! let core = CoreService::bootstrap(config).await?;
//!
//! core.play_request(SongRequest::Playlist { id: 3778678, start_id: None }).await?;
//! let mut state = core.playback().subscribe_state();
//! ```

pub mod error;

pub use error::{CoreError, Result};

#[cfg(feature = "desktop-shims")]
pub use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};

use bridge_traits::storage::SettingsStore;
use core_async::sync::{CancellationToken, Mutex};
use core_auth::{HttpQrLoginApi, LoginProfile, QrLoginApi, QrLoginFlow, SessionStore};
use core_catalog::{
    CatalogError, CatalogLoader, CatalogService, ChartLoadReport, HomeFeed, HomeFeedLoader,
    HttpCatalogService, SongRequest,
};
use core_playback::{PlaybackAction, PlaybackController, PlaybackHandle, PlaybackPreferences};
use core_runtime::config::{CoreConfig, LoginConfig};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, EventStream};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// What became of a [`CoreService::play_request`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The queue was handed to the controller.
    Started { track_count: usize, unresolved: usize },
    /// A newer request arrived before this one finished loading.
    Superseded,
}

#[derive(Default)]
struct InFlight {
    next_id: u64,
    current: Option<(u64, CancellationToken)>,
}

impl InFlight {
    /// Clear load `id` if it is still the newest one. Returns false when a
    /// newer request has taken over.
    fn finish(&mut self, id: u64) -> bool {
        match self.current {
            Some((current, _)) if current == id => {
                self.current = None;
                true
            }
            _ => false,
        }
    }
}

/// Primary façade exposed to host applications.
#[derive(Clone)]
pub struct CoreService {
    events: EventBus,
    session: SessionStore,
    catalog: CatalogLoader,
    home: HomeFeedLoader,
    login_api: Arc<dyn QrLoginApi>,
    login_config: LoginConfig,
    playback: PlaybackHandle,
    in_flight: Arc<Mutex<InFlight>>,
}

impl CoreService {
    /// Wire the HTTP catalog and login services from `config` and start the
    /// playback controller with the persisted repeat mode.
    #[instrument(skip(config), fields(api = %config.api_base_url))]
    pub async fn bootstrap(config: CoreConfig) -> Result<Self> {
        config.validate()?;
        let settings = config.settings_store().await?;
        let session = SessionStore::new(Arc::clone(&settings));

        let catalog: Arc<dyn CatalogService> = Arc::new(
            HttpCatalogService::new(
                Arc::clone(&config.http_client),
                config.api_base_url.clone(),
                Arc::clone(&config.clock),
                session.clone(),
            )
            .with_stream_quality(config.catalog.stream_quality.clone()),
        );
        let login_api: Arc<dyn QrLoginApi> = Arc::new(HttpQrLoginApi::new(
            Arc::clone(&config.http_client),
            config.api_base_url.clone(),
            Arc::clone(&config.clock),
            session.clone(),
        ));

        Self::assemble(config, settings, catalog, login_api).await
    }

    /// Like [`CoreService::bootstrap`], with the remote services supplied by
    /// the caller.
    pub async fn with_services(
        config: CoreConfig,
        catalog: Arc<dyn CatalogService>,
        login_api: Arc<dyn QrLoginApi>,
    ) -> Result<Self> {
        config.validate()?;
        let settings = config.settings_store().await?;
        Self::assemble(config, settings, catalog, login_api).await
    }

    async fn assemble(
        config: CoreConfig,
        settings: Arc<dyn SettingsStore>,
        catalog: Arc<dyn CatalogService>,
        login_api: Arc<dyn QrLoginApi>,
    ) -> Result<Self> {
        let events = EventBus::new(config.event_buffer_size);
        let session = SessionStore::new(Arc::clone(&settings));

        let loader = CatalogLoader::new(catalog, config.catalog.clone(), events.clone());
        let playback = PlaybackController::spawn(
            Arc::clone(&config.media_engine),
            PlaybackPreferences::new(settings),
            events.clone(),
            &config.playback,
        )
        .await?;

        info!("Core service started");
        Ok(Self {
            events,
            session,
            home: HomeFeedLoader::new(loader.clone()),
            catalog: loader,
            login_api,
            login_config: config.login.clone(),
            playback,
            in_flight: Arc::new(Mutex::new(InFlight::default())),
        })
    }

    /// Resolve `request` and start it.
    ///
    /// Cancels any load still in flight. While resolving, the playback state
    /// shows `loading`; a failure is surfaced as the state error and a
    /// `LoadFailed` event.
    #[instrument(skip(self), fields(request = %request))]
    pub async fn play_request(&self, request: SongRequest) -> Result<PlayOutcome> {
        let label = request.to_string();
        let (id, token) = self.begin_load().await;

        self.playback.mark_loading().await?;
        self.emit(CatalogEvent::LoadStarted {
            request: label.clone(),
        });

        let resolved = core_async::select! {
            _ = token.cancelled() => {
                debug!("Load superseded");
                return Ok(PlayOutcome::Superseded);
            }
            resolved = self.catalog.resolve(request) => resolved,
        };

        // Held until the outcome reaches the controller, so a newer request
        // cannot mark loading in between.
        let mut in_flight = self.in_flight.lock().await;
        if !in_flight.finish(id) {
            debug!("Load superseded after resolving");
            return Ok(PlayOutcome::Superseded);
        }

        let resolved = match resolved {
            Ok(resolved) if resolved.is_empty() => Err(CatalogError::ResourceUnavailable(format!(
                "{}: nothing to play",
                label
            ))),
            other => other,
        };

        let outcome = match resolved {
            Ok(resolved) => {
                let outcome = PlayOutcome::Started {
                    track_count: resolved.tracks.len(),
                    unresolved: resolved.unresolved,
                };
                self.emit(CatalogEvent::LoadCompleted {
                    request: label,
                    track_count: resolved.tracks.len(),
                    unresolved: resolved.unresolved,
                });
                self.playback
                    .dispatch(PlaybackAction::Init {
                        tracks: resolved.tracks,
                        start_id: resolved.start_id,
                    })
                    .await?;
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Load failed");
                self.emit(CatalogEvent::LoadFailed {
                    request: label,
                    message: e.to_string(),
                });
                self.playback.report_load_failure(e.to_string()).await?;
                Err(e.into())
            }
        };
        drop(in_flight);
        outcome
    }

    /// Load every home section; sections fail independently.
    pub async fn home_feed(&self) -> HomeFeed {
        self.home.load().await
    }

    pub async fn charts(&self) -> Result<ChartLoadReport> {
        Ok(self.catalog.load_charts().await?)
    }

    /// Run the QR login flow until it completes, fails, or `cancel` fires.
    /// Progress is reported on the event bus as `AuthEvent`s.
    pub async fn login_with_qr(&self, cancel: CancellationToken) -> Result<LoginProfile> {
        let flow = QrLoginFlow::new(
            Arc::clone(&self.login_api),
            self.session.clone(),
            self.events.clone(),
            self.login_config.clone(),
        );
        Ok(flow.run(cancel).await?)
    }

    pub async fn sign_out(&self) -> Result<()> {
        Ok(core_auth::sign_out(&self.session, &self.events).await?)
    }

    pub async fn is_logged_in(&self) -> Result<bool> {
        Ok(self.session.is_logged_in().await?)
    }

    pub fn playback(&self) -> &PlaybackHandle {
        &self.playback
    }

    /// Subscribe to every core event.
    pub fn events(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Cancel any pending load and stop playback.
    pub async fn shutdown(&self) -> Result<()> {
        if let Some((_, token)) = self.in_flight.lock().await.current.take() {
            token.cancel();
        }
        self.playback.shutdown().await?;
        info!("Core service stopped");
        Ok(())
    }

    async fn begin_load(&self) -> (u64, CancellationToken) {
        let mut in_flight = self.in_flight.lock().await;
        if let Some((previous, token)) = in_flight.current.take() {
            debug!(previous, "Cancelling previous load");
            token.cancel();
        }
        in_flight.next_id += 1;
        let id = in_flight.next_id;
        let token = CancellationToken::new();
        in_flight.current = Some((id, token.clone()));
        (id, token)
    }

    fn emit(&self, event: CatalogEvent) {
        let _ = self.events.emit(CoreEvent::Catalog(event));
    }
}
