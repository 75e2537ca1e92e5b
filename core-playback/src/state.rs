//! Published playback state.

use crate::mode::RepeatMode;
use core_catalog::{Track, TrackId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Player phase, as last confirmed by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PlayerPhase {
    #[default]
    Idle,
    Ready,
    Buffering,
    Playing,
    Paused,
    Ended,
    Error,
}

/// Snapshot of the controller, published on a watch channel.
///
/// `version` increases by one each time any other field changes, and only
/// then. Consumers can compare versions to tell whether anything happened.
#[derive(Debug, Clone, Default)]
pub struct PlaybackState {
    pub current_track: Option<Track>,
    /// True only once the engine has confirmed playback.
    pub playing: bool,
    pub phase: PlayerPhase,
    pub repeat_mode: RepeatMode,
    /// A catalog load for a new queue is in flight.
    pub loading: bool,
    pub error: Option<String>,
    pub queue: Arc<Vec<Track>>,
    pub version: u64,
}

impl PlaybackState {
    pub fn new(repeat_mode: RepeatMode) -> Self {
        Self {
            repeat_mode,
            ..Self::default()
        }
    }

    pub fn current_track_id(&self) -> Option<TrackId> {
        self.current_track.as_ref().map(|t| t.id)
    }

    /// Field-by-field equality, ignoring `version`.
    pub fn same_content(&self, other: &PlaybackState) -> bool {
        self.current_track == other.current_track
            && self.playing == other.playing
            && self.phase == other.phase
            && self.repeat_mode == other.repeat_mode
            && self.loading == other.loading
            && self.error == other.error
            && (Arc::ptr_eq(&self.queue, &other.queue) || self.queue == other.queue)
    }
}

/// Position tick, published while playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackPosition {
    pub track_id: Option<TrackId>,
    pub elapsed_ms: u64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_content_ignores_version() {
        let a = PlaybackState::new(RepeatMode::Shuffle);
        let mut b = a.clone();
        b.version = 9;
        assert!(a.same_content(&b));

        b.loading = true;
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_same_content_compares_queue_by_value() {
        let mut a = PlaybackState::default();
        let mut b = PlaybackState::default();
        a.queue = Arc::new(vec![Track::new(1, "One", "", "")]);
        b.queue = Arc::new(vec![Track::new(1, "One", "", "")]);
        assert!(a.same_content(&b));

        b.queue = Arc::new(Vec::new());
        assert!(!a.same_content(&b));
    }

    #[test]
    fn test_defaults() {
        let state = PlaybackState::default();
        assert_eq!(state.phase, PlayerPhase::Idle);
        assert_eq!(state.repeat_mode, RepeatMode::RepeatAll);
        assert!(!state.playing);
        assert_eq!(state.current_track_id(), None);
    }
}
