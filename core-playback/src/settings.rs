//! Persisted playback preferences.

use crate::error::{PlaybackError, Result};
use crate::mode::RepeatMode;
use bridge_traits::storage::SettingsStore;
use std::sync::Arc;
use tracing::warn;

/// Settings key of the repeat mode code.
pub const KEY_PLAY_MODE: &str = "playing.play_mode";

/// Typed access to playback preferences.
#[derive(Clone)]
pub struct PlaybackPreferences {
    settings: Arc<dyn SettingsStore>,
}

impl PlaybackPreferences {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Stored repeat mode.
    ///
    /// Falls back to the default when nothing is stored, the stored code is
    /// unknown, or the store cannot be read.
    pub async fn repeat_mode(&self) -> RepeatMode {
        match self.settings.get_i64(KEY_PLAY_MODE).await {
            Ok(Some(code)) => RepeatMode::from_code(code).unwrap_or_else(|| {
                warn!(code, "Unknown stored play mode, using default");
                RepeatMode::default()
            }),
            Ok(None) => RepeatMode::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read play mode, using default");
                RepeatMode::default()
            }
        }
    }

    pub async fn set_repeat_mode(&self, mode: RepeatMode) -> Result<()> {
        self.settings
            .set_i64(KEY_PLAY_MODE, mode.code())
            .await
            .map_err(|e| PlaybackError::Settings(e.to_string()))
    }
}
