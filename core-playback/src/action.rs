//! User actions accepted by the controller.

use crate::mode::RepeatMode;
use core_catalog::{Track, TrackId};

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackAction {
    /// Replace the queue and start `start_id` (or the first track).
    Init {
        tracks: Vec<Track>,
        start_id: Option<TrackId>,
    },
    PlayPause,
    Previous,
    Next,
    /// Seek within the current track, in milliseconds.
    SeekTo(u64),
    SwitchSong(TrackId),
    ChangeMode(RepeatMode),
    RemoveSong(TrackId),
}

impl PlaybackAction {
    pub fn name(&self) -> &'static str {
        match self {
            PlaybackAction::Init { .. } => "init",
            PlaybackAction::PlayPause => "play_pause",
            PlaybackAction::Previous => "previous",
            PlaybackAction::Next => "next",
            PlaybackAction::SeekTo(_) => "seek_to",
            PlaybackAction::SwitchSong(_) => "switch_song",
            PlaybackAction::ChangeMode(_) => "change_mode",
            PlaybackAction::RemoveSong(_) => "remove_song",
        }
    }
}
