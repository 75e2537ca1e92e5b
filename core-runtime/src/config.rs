//! # Core Configuration Module
//!
//! Builder-based configuration for the client core.
//!
//! ## Overview
//!
//! [`CoreConfig`] holds every injected bridge plus the tuning knobs of the
//! playback, catalog and login subsystems. [`CoreConfigBuilder::build`]
//! validates eagerly, so a misconfigured host fails at startup with an
//! actionable message instead of at the first request.
//!
//! ## Required Dependencies
//!
//! - `api_base_url` - Root of the music API (`http://` or `https://`)
//! - `MediaEngine` - Always host-provided
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - desktop default: `ReqwestHttpClient`
//! - `SettingsStore` - desktop default: `SqliteSettingsStore` at `settings_path`
//! - `Clock` - default: `SystemClock`
//!
//! Defaults are only available with the `desktop-shims` feature; without it
//! a missing bridge is reported as [`Error::CapabilityMissing`].
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("http://localhost:3000")
//!     .settings_path("/home/me/.config/mcc/settings.db")
//!     .media_engine(Arc::new(MyEngine::new()))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use bridge_traits::{Clock, HttpClient, MediaEngine, SettingsStore, SystemClock};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Upper bound for the position tick.
const MAX_POSITION_TICK: Duration = Duration::from_secs(60);

/// How chart loading reacts to a failed per-chart preview fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartFanoutPolicy {
    /// Keep the charts that loaded and report the failures.
    #[default]
    PartialSuccess,
    /// Fail the whole chart section on the first failed preview.
    AbortOnFirstError,
}

/// Playback controller tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackConfig {
    /// Cadence of position updates while playing.
    pub position_tick: Duration,
    /// Capacity of the controller's command channel.
    pub command_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            position_tick: Duration::from_secs(1),
            command_buffer: 64,
        }
    }
}

/// Catalog loading tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Number of charts shown on the home feed.
    pub chart_limit: usize,
    /// Tracks fetched per chart preview.
    pub chart_preview_len: usize,
    /// Recommended playlists requested for the home feed.
    pub recommended_limit: usize,
    /// Tracks shown in the "recommended songs" section.
    pub recommended_song_limit: usize,
    /// Stream quality level passed to URL resolution.
    pub stream_quality: String,
    pub chart_policy: ChartFanoutPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            chart_limit: 8,
            chart_preview_len: 3,
            recommended_limit: 10,
            recommended_song_limit: 15,
            stream_quality: "exhigh".to_string(),
            chart_policy: ChartFanoutPolicy::PartialSuccess,
        }
    }
}

/// QR login polling tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginConfig {
    pub poll_interval: Duration,
    /// Status checks before the flow gives up.
    pub max_polls: u32,
    /// How many times an expired QR code is replaced.
    pub max_regenerations: u32,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 90,
            max_regenerations: 3,
        }
    }
}

/// Core configuration for the client core.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Root URL of the music API, without trailing slash.
    pub api_base_url: String,

    /// Location of the desktop settings database.
    pub settings_path: Option<PathBuf>,

    pub http_client: Arc<dyn HttpClient>,

    /// Resolved lazily by [`CoreConfig::settings_store`].
    settings_store: Option<Arc<dyn SettingsStore>>,

    pub media_engine: Arc<dyn MediaEngine>,

    pub clock: Arc<dyn Clock>,

    pub playback: PlaybackConfig,
    pub catalog: CatalogConfig,
    pub login: LoginConfig,

    /// Buffer of the core event bus.
    pub event_buffer_size: usize,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("api_base_url", &self.api_base_url)
            .field("settings_path", &self.settings_path)
            .field("http_client", &"HttpClient { ... }")
            .field(
                "settings_store",
                &self.settings_store.as_ref().map(|_| "SettingsStore { ... }"),
            )
            .field("media_engine", &"MediaEngine { ... }")
            .field("playback", &self.playback)
            .field("catalog", &self.catalog)
            .field("login", &self.login)
            .field("event_buffer_size", &self.event_buffer_size)
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Returns the injected settings store, or opens the desktop default.
    ///
    /// Opening the SQLite database is async, so it happens here rather than
    /// in [`CoreConfigBuilder::build`].
    pub async fn settings_store(&self) -> Result<Arc<dyn SettingsStore>> {
        if let Some(store) = &self.settings_store {
            return Ok(Arc::clone(store));
        }
        provide_default_settings_store(self.settings_path.as_ref()).await
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if url.is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "API base URL must start with http:// or https://, got '{}'",
                url
            )));
        }

        if self.playback.position_tick.is_zero() {
            return Err(Error::Config(
                "Position tick must be greater than zero".to_string(),
            ));
        }
        if self.playback.position_tick > MAX_POSITION_TICK {
            return Err(Error::Config(format!(
                "Position tick exceeds maximum of {}s",
                MAX_POSITION_TICK.as_secs()
            )));
        }
        if self.playback.command_buffer == 0 {
            return Err(Error::Config(
                "Command buffer must hold at least one command".to_string(),
            ));
        }

        if self.catalog.chart_limit == 0 || self.catalog.chart_preview_len == 0 {
            return Err(Error::Config(
                "Chart limit and chart preview length must be greater than zero".to_string(),
            ));
        }
        if self.catalog.stream_quality.trim().is_empty() {
            return Err(Error::Config("Stream quality cannot be empty".to_string()));
        }

        if self.login.poll_interval.is_zero() || self.login.max_polls == 0 {
            return Err(Error::Config(
                "Login poll interval and max polls must be greater than zero".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        if self.settings_store.is_none() && self.settings_path.is_none() {
            return Err(Error::Config(
                "Settings path is required when no SettingsStore is injected. \
                 Use .settings_path() to set it."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

fn media_engine_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "MediaEngine".to_string(),
        message: "A MediaEngine implementation is required for playback. \
                 There is no built-in default; inject the host audio engine."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "HttpClient implementation is required for catalog and login requests. \
                 Desktop: enable the 'desktop-shims' feature to use ReqwestHttpClient. \
                 Mobile: inject the platform-native HTTP adapter."
            .to_string(),
    })
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client() -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::new()
        .map_err(|e| Error::Internal(format!("Failed to create default HttpClient: {}", e)))?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn settings_store_missing_error() -> Error {
    Error::CapabilityMissing {
        capability: "SettingsStore".to_string(),
        message: "SettingsStore implementation is required for login state and preferences. \
                 Desktop: enable the 'desktop-shims' feature to use SqliteSettingsStore. \
                 Mobile: inject platform-native settings (UserDefaults/DataStore)."
            .to_string(),
    }
}

#[cfg(not(feature = "desktop-shims"))]
async fn provide_default_settings_store(
    _settings_path: Option<&PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    Err(settings_store_missing_error())
}

#[cfg(feature = "desktop-shims")]
async fn provide_default_settings_store(
    settings_path: Option<&PathBuf>,
) -> Result<Arc<dyn SettingsStore>> {
    let path = settings_path
        .cloned()
        .ok_or_else(|| Error::Config("Settings path is required".to_string()))?;

    let store = bridge_desktop::SqliteSettingsStore::new(path).await?;
    Ok(Arc::new(store))
}

/// Builder for constructing [`CoreConfig`] instances.
#[derive(Default)]
pub struct CoreConfigBuilder {
    api_base_url: Option<String>,
    settings_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    media_engine: Option<Arc<dyn MediaEngine>>,
    clock: Option<Arc<dyn Clock>>,
    playback: PlaybackConfig,
    catalog: CatalogConfig,
    login: LoginConfig,
    event_buffer_size: Option<usize>,
}

impl CoreConfigBuilder {
    /// Sets the API root, e.g. `http://localhost:3000`.
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn media_engine(mut self, engine: Arc<dyn MediaEngine>) -> Self {
        self.media_engine = Some(engine);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    pub fn position_tick(mut self, tick: Duration) -> Self {
        self.playback.position_tick = tick;
        self
    }

    pub fn catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn chart_policy(mut self, policy: ChartFanoutPolicy) -> Self {
        self.catalog.chart_policy = policy;
        self
    }

    pub fn login(mut self, login: LoginConfig) -> Self {
        self.login = login;
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when a value is missing or out of range
    /// - [`Error::CapabilityMissing`] when a bridge has no implementation
    pub fn build(self) -> Result<CoreConfig> {
        let api_base_url = self
            .api_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                Error::Config(
                    "API base URL is required. Use .api_base_url() to set it.".to_string(),
                )
            })?;

        let media_engine = self.media_engine.ok_or_else(media_engine_missing_error)?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client()?,
        };

        #[cfg(not(feature = "desktop-shims"))]
        if self.settings_store.is_none() {
            return Err(settings_store_missing_error());
        }

        let config = CoreConfig {
            api_base_url,
            settings_path: self.settings_path,
            http_client,
            settings_store: self.settings_store,
            media_engine,
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            playback: self.playback,
            catalog: self.catalog,
            login: self.login,
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
        };

        config.validate()?;

        Ok(config)
    }
}
