//! End-to-end wiring of the service façade with mocked remote services and
//! a silent media engine.

use async_trait::async_trait;
use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore};
use bridge_traits::engine::{
    EngineEventStream, EngineItem, EngineMode, EngineNotification, EngineState, MediaEngine,
    QueueGeneration,
};
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::storage::SettingsStore;
use core_auth::{AuthError, QrCheck, QrLoginApi, QrStatus, QrTicket};
use core_catalog::{
    AlbumSummary, Banner, CatalogError, CatalogService, ChartSummary, DiscoveryIcon,
    PlaylistSummary, SongRequest, StreamInfo, TrackId, TrackSummary,
};
use core_playback::PlaybackState;
use core_runtime::config::{CoreConfig, LoginConfig};
use core_runtime::events::{CatalogEvent, CoreEvent, EventStream};
use core_service::{CoreError, CoreService, PlayOutcome};
use mockall::mock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};
use tokio::time::timeout;

// ============================================================================
// Doubles
// ============================================================================

mock! {
    pub Catalog {}

    #[async_trait]
    impl CatalogService for Catalog {
        async fn banners(&self) -> core_catalog::Result<Vec<Banner>>;
        async fn discovery_icons(&self) -> core_catalog::Result<Vec<DiscoveryIcon>>;
        async fn recommended_playlists(&self, limit: usize) -> core_catalog::Result<Vec<PlaylistSummary>>;
        async fn playlist_tracks(&self, id: i64, limit: Option<usize>) -> core_catalog::Result<Vec<TrackSummary>>;
        async fn album_tracks(&self, id: i64) -> core_catalog::Result<Vec<TrackSummary>>;
        async fn stream_urls(&self, ids: &[TrackId]) -> core_catalog::Result<Vec<StreamInfo>>;
        async fn top_charts(&self) -> core_catalog::Result<Vec<ChartSummary>>;
        async fn newest_albums(&self) -> core_catalog::Result<Vec<AlbumSummary>>;
    }
}

mock! {
    pub Login {}

    #[async_trait]
    impl QrLoginApi for Login {
        async fn generate_key(&self) -> core_auth::Result<String>;
        async fn create_qr(&self, key: &str) -> core_auth::Result<QrTicket>;
        async fn check(&self, key: &str) -> core_auth::Result<QrCheck>;
    }
}

/// Accepts every command; never emits anything.
struct SilentEngine {
    // Keeps the event stream open for the lifetime of the engine.
    _events: mpsc::UnboundedSender<EngineNotification>,
    stream: Mutex<Option<mpsc::UnboundedReceiver<EngineNotification>>>,
}

impl SilentEngine {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            _events: tx,
            stream: Mutex::new(Some(rx)),
        }
    }
}

struct ChannelStream(mpsc::UnboundedReceiver<EngineNotification>);

#[async_trait]
impl EngineEventStream for ChannelStream {
    async fn next(&mut self) -> Option<EngineNotification> {
        self.0.recv().await
    }
}

#[async_trait]
impl MediaEngine for SilentEngine {
    async fn prepare(&self, _: QueueGeneration, _: Vec<EngineItem>) -> BridgeResult<()> {
        Ok(())
    }
    async fn seek(&self, _: usize, _: u64) -> BridgeResult<()> {
        Ok(())
    }
    async fn set_intended_play(&self, _: bool) -> BridgeResult<()> {
        Ok(())
    }
    async fn remove_item(&self, _: usize) -> BridgeResult<()> {
        Ok(())
    }
    async fn apply_mode(&self, _: EngineMode) -> BridgeResult<()> {
        Ok(())
    }
    async fn release(&self) -> BridgeResult<()> {
        Ok(())
    }
    async fn subscribe_events(&self) -> BridgeResult<Box<dyn EngineEventStream>> {
        let rx = self.stream.lock().await.take().ok_or_else(|| {
            bridge_traits::BridgeError::OperationFailed("already subscribed".into())
        })?;
        Ok(Box::new(ChannelStream(rx)))
    }
    fn current_elapsed_ms(&self) -> u64 {
        0
    }
    fn current_index(&self) -> Option<usize> {
        None
    }
    fn current_track_duration_ms(&self) -> u64 {
        0
    }
    fn engine_state(&self) -> EngineState {
        EngineState::Ready
    }
}

/// Playlist 1 never finishes loading; every other playlist resolves at once.
struct GatedCatalog {
    gate: Notify,
}

#[async_trait]
impl CatalogService for GatedCatalog {
    async fn banners(&self) -> core_catalog::Result<Vec<Banner>> {
        Ok(Vec::new())
    }
    async fn discovery_icons(&self) -> core_catalog::Result<Vec<DiscoveryIcon>> {
        Ok(Vec::new())
    }
    async fn recommended_playlists(&self, _: usize) -> core_catalog::Result<Vec<PlaylistSummary>> {
        Ok(Vec::new())
    }
    async fn playlist_tracks(&self, id: i64, _: Option<usize>) -> core_catalog::Result<Vec<TrackSummary>> {
        if id == 1 {
            self.gate.notified().await;
        }
        Ok(vec![song(id * 10), song(id * 10 + 1)])
    }
    async fn album_tracks(&self, _: i64) -> core_catalog::Result<Vec<TrackSummary>> {
        Ok(Vec::new())
    }
    async fn stream_urls(&self, ids: &[TrackId]) -> core_catalog::Result<Vec<StreamInfo>> {
        Ok(ids.iter().map(|&id| stream(id.0)).collect())
    }
    async fn top_charts(&self) -> core_catalog::Result<Vec<ChartSummary>> {
        Ok(Vec::new())
    }
    async fn newest_albums(&self) -> core_catalog::Result<Vec<AlbumSummary>> {
        Ok(Vec::new())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn song(id: i64) -> TrackSummary {
    TrackSummary {
        id: TrackId(id),
        name: format!("Song {}", id),
        artists: vec!["Singer".to_string()],
        album_id: 9,
        album: "Album".to_string(),
        cover_url: String::new(),
        mv_id: 0,
    }
}

fn stream(id: i64) -> StreamInfo {
    StreamInfo {
        id: TrackId(id),
        url: Some(format!("https://cdn.example.com/{}.mp3", id)),
        duration_ms: 200_000,
        pay_gated: false,
    }
}

async fn core_with(catalog: Arc<dyn CatalogService>, login: MockLogin) -> (CoreService, Arc<dyn SettingsStore>) {
    let settings: Arc<dyn SettingsStore> =
        Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
    let config = CoreConfig::builder()
        .api_base_url("http://localhost:3000")
        .http_client(Arc::new(ReqwestHttpClient::new().unwrap()))
        .settings_store(Arc::clone(&settings))
        .media_engine(Arc::new(SilentEngine::new()))
        .position_tick(Duration::from_millis(50))
        .login(LoginConfig {
            poll_interval: Duration::from_millis(5),
            max_polls: 20,
            max_regenerations: 1,
        })
        .build()
        .unwrap();

    let core = CoreService::with_services(config, catalog, Arc::new(login))
        .await
        .unwrap();
    (core, settings)
}

async fn wait_for_state(core: &CoreService, predicate: impl Fn(&PlaybackState) -> bool) -> PlaybackState {
    let mut rx = core.playback().subscribe_state();
    let state = timeout(Duration::from_secs(2), rx.wait_for(|s| predicate(s)))
        .await
        .expect("timed out waiting for state")
        .expect("controller stopped")
        .clone();
    state
}

fn catalog_events(stream: &mut EventStream) -> Vec<CatalogEvent> {
    let mut out = Vec::new();
    while let Some(Ok(event)) = stream.try_recv() {
        if let CoreEvent::Catalog(event) = event {
            out.push(event);
        }
    }
    out
}

// ============================================================================
// Play requests
// ============================================================================

#[tokio::test]
async fn play_request_resolves_and_starts_queue() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_playlist_tracks()
        .withf(|id, limit| *id == 5 && limit.is_none())
        .returning(|_, _| Ok(vec![song(1), song(2), song(3)]));
    catalog
        .expect_stream_urls()
        .returning(|_| Ok(vec![stream(3), stream(1)]));

    let (core, _) = core_with(Arc::new(catalog), MockLogin::new()).await;
    let mut events = core.events();

    let outcome = core
        .play_request(SongRequest::Playlist {
            id: 5,
            start_id: Some(TrackId(3)),
        })
        .await
        .unwrap();

    assert_eq!(
        outcome,
        PlayOutcome::Started {
            track_count: 3,
            unresolved: 1
        }
    );

    let state = core.playback().state();
    assert_eq!(state.current_track_id(), Some(TrackId(3)));
    assert!(!state.loading);
    assert_eq!(state.queue.len(), 3);
    assert_eq!(state.queue[1].url, None);
    assert_eq!(state.queue[0].artist, "Singer - Album");

    assert_eq!(
        catalog_events(&mut events),
        vec![
            CatalogEvent::LoadStarted {
                request: "playlist:5".to_string()
            },
            CatalogEvent::LoadCompleted {
                request: "playlist:5".to_string(),
                track_count: 3,
                unresolved: 1,
            },
        ]
    );
}

#[tokio::test]
async fn failed_load_is_reported_in_playback_state() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_album_tracks()
        .returning(|_| Err(CatalogError::Remote("502 Bad Gateway".to_string())));
    catalog.expect_stream_urls().never();

    let (core, _) = core_with(Arc::new(catalog), MockLogin::new()).await;
    let mut events = core.events();

    let result = core.play_request(SongRequest::Album { id: 8 }).await;
    assert!(matches!(
        result,
        Err(CoreError::Catalog(CatalogError::ResourceUnavailable(_)))
    ));

    let state = wait_for_state(&core, |s| s.error.is_some()).await;
    assert!(!state.loading);
    assert!(state.error.unwrap().contains("502 Bad Gateway"));
    assert!(catalog_events(&mut events)
        .iter()
        .any(|e| matches!(e, CatalogEvent::LoadFailed { request, .. } if request == "album:8")));
}

#[tokio::test]
async fn empty_listing_is_not_handed_to_playback() {
    let mut catalog = MockCatalog::new();
    catalog.expect_playlist_tracks().returning(|_, _| Ok(Vec::new()));
    catalog.expect_stream_urls().never();

    let (core, _) = core_with(Arc::new(catalog), MockLogin::new()).await;

    let result = core
        .play_request(SongRequest::Playlist {
            id: 1,
            start_id: None,
        })
        .await;
    assert!(result.is_err());

    let state = wait_for_state(&core, |s| s.error.is_some()).await;
    assert!(state.queue.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn newer_request_supersedes_pending_load() {
    let catalog = Arc::new(GatedCatalog {
        gate: Notify::new(),
    });
    let (core, _) = core_with(catalog.clone(), MockLogin::new()).await;
    let mut events = core.events();

    let slow = {
        let core = core.clone();
        tokio::spawn(async move {
            core.play_request(SongRequest::Playlist {
                id: 1,
                start_id: None,
            })
            .await
        })
    };

    // Wait until the slow request is in flight.
    timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(CoreEvent::Catalog(CatalogEvent::LoadStarted { .. })) = events.recv().await {
                break;
            }
        }
    })
    .await
    .unwrap();

    let fast = core
        .play_request(SongRequest::Playlist {
            id: 2,
            start_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(fast, PlayOutcome::Started { track_count: 2, .. }));

    let slow = timeout(Duration::from_secs(2), slow).await.unwrap().unwrap();
    assert_eq!(slow.unwrap(), PlayOutcome::Superseded);

    let state = core.playback().state();
    assert_eq!(state.current_track_id(), Some(TrackId(20)));
    assert!(!state.loading);
}

#[tokio::test]
async fn load_that_resolves_after_a_newer_request_began_is_not_started() {
    let catalog = Arc::new(GatedCatalog {
        gate: Notify::new(),
    });
    let (core, _) = core_with(catalog.clone(), MockLogin::new()).await;
    let mut events = core.events();

    let slow = {
        let core = core.clone();
        tokio::spawn(async move {
            core.play_request(SongRequest::Playlist {
                id: 1,
                start_id: None,
            })
            .await
        })
    };

    timeout(Duration::from_secs(2), async {
        loop {
            if let Ok(CoreEvent::Catalog(CatalogEvent::LoadStarted { .. })) = events.recv().await {
                break;
            }
        }
    })
    .await
    .unwrap();

    // Let the slow listing complete, then start the newer request before the
    // slow task gets a chance to hand its queue over.
    catalog.gate.notify_one();
    let fast = core
        .play_request(SongRequest::Playlist {
            id: 2,
            start_id: None,
        })
        .await
        .unwrap();
    assert!(matches!(fast, PlayOutcome::Started { track_count: 2, .. }));

    let slow = timeout(Duration::from_secs(2), slow).await.unwrap().unwrap();
    assert_eq!(slow.unwrap(), PlayOutcome::Superseded);

    let state = core.playback().state();
    let ids: Vec<i64> = state.queue.iter().map(|t| t.id.0).collect();
    assert_eq!(ids, vec![20, 21]);
    assert_eq!(state.current_track_id(), Some(TrackId(20)));
    assert!(!state.loading);
}

#[tokio::test]
async fn tracks_without_stream_urls_are_still_queued() {
    let mut catalog = MockCatalog::new();
    catalog
        .expect_album_tracks()
        .returning(|_| Ok(vec![song(1), song(2)]));
    catalog.expect_stream_urls().returning(|_| Ok(Vec::new()));

    let (core, _) = core_with(Arc::new(catalog), MockLogin::new()).await;
    let result = core.play_request(SongRequest::Album { id: 9 }).await;

    // The queue is handed over; the first track cannot start.
    assert!(matches!(
        result,
        Err(CoreError::Playback(core_playback::PlaybackError::ResourceUnavailable(_)))
    ));
    let state = core.playback().state();
    let ids: Vec<i64> = state.queue.iter().map(|t| t.id.0).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(state.queue.iter().all(|t| t.url.is_none()));
    assert_eq!(state.current_track_id(), None);
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn qr_login_signs_in_and_out() {
    let mut login = MockLogin::new();
    login
        .expect_generate_key()
        .returning(|| Ok("key-1".to_string()));
    login
        .expect_create_qr()
        .returning(|key| Ok(QrTicket::new(key, "https://music.example.com/login?codekey=key-1")));
    login.expect_check().returning(|_| {
        Ok(QrCheck {
            status: QrStatus::Authorized,
            message: "authorized".to_string(),
            nickname: Some("alvin".to_string()),
            avatar_url: None,
            cookie: "MUSIC_U=abc".to_string(),
        })
    });

    let (core, settings) = core_with(Arc::new(MockCatalog::new()), login).await;
    assert!(!core.is_logged_in().await.unwrap());

    let profile = core
        .login_with_qr(core_async::sync::CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(profile.nickname.as_deref(), Some("alvin"));
    assert!(core.is_logged_in().await.unwrap());
    assert_eq!(
        settings.get_string("user.cookie").await.unwrap().as_deref(),
        Some("MUSIC_U=abc")
    );

    core.sign_out().await.unwrap();
    assert!(!core.is_logged_in().await.unwrap());
}

#[tokio::test]
async fn cancelled_login_returns_cancelled() {
    let mut login = MockLogin::new();
    login.expect_generate_key().returning(|| Ok("key".to_string()));
    login
        .expect_create_qr()
        .returning(|key| Ok(QrTicket::new(key, "qr")));
    login.expect_check().returning(|_| {
        Ok(QrCheck {
            status: QrStatus::Waiting,
            message: String::new(),
            nickname: None,
            avatar_url: None,
            cookie: String::new(),
        })
    });

    let (core, _) = core_with(Arc::new(MockCatalog::new()), login).await;
    let cancel = core_async::sync::CancellationToken::new();
    cancel.cancel();

    let result = core.login_with_qr(cancel).await;
    assert!(matches!(result, Err(CoreError::Auth(AuthError::Cancelled))));
}

// ============================================================================
// Shutdown
// ============================================================================

#[tokio::test]
async fn shutdown_stops_playback() {
    let (core, _) = core_with(Arc::new(MockCatalog::new()), MockLogin::new()).await;
    core.shutdown().await.unwrap();

    let result = core
        .playback()
        .dispatch(core_playback::PlaybackAction::Next)
        .await;
    assert!(result.is_err());
}
