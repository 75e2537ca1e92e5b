//! # Playback Error Types
//!
//! Errors returned by the playback controller and its queue.

use bridge_traits::error::BridgeError;
use core_runtime::events::NoticeKind;
use thiserror::Error;

/// Errors that can occur during playback operations.
///
/// Most of these are recoverable: the controller turns them into a
/// [`NoticeKind`] notice and leaves the playback state untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// Skip past the first or last track of a non-repeating queue.
    #[error("{0}")]
    OutOfRange(String),

    /// The action does not apply to the current queue, e.g. removing the
    /// track that is playing.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The media engine rejected a command.
    #[error("Engine error: {0}")]
    Engine(String),

    /// The track has no stream URL, or nothing in the list can be played.
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),

    /// The controller task has stopped.
    #[error("Playback controller is not running")]
    ControllerClosed,

    /// Preferences could not be read or written.
    #[error("Settings error: {0}")]
    Settings(String),
}

impl PlaybackError {
    /// Notice category used when this error is shown to the user.
    pub fn notice_kind(&self) -> NoticeKind {
        match self {
            PlaybackError::OutOfRange(_) => NoticeKind::OutOfRange,
            PlaybackError::InvalidOperation(_) => NoticeKind::InvalidOperation,
            PlaybackError::ResourceUnavailable(_) => NoticeKind::ResourceUnavailable,
            PlaybackError::Engine(_)
            | PlaybackError::ControllerClosed
            | PlaybackError::Settings(_) => NoticeKind::Engine,
        }
    }
}

impl From<BridgeError> for PlaybackError {
    fn from(err: BridgeError) -> Self {
        PlaybackError::Engine(err.to_string())
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
