//! # Playback Queue
//!
//! Ordered track list with a cursor. The queue never talks to the engine;
//! the controller mirrors every mutation there.
//!
//! Invariant: when set, the cursor is inside `0..len`. It is checked with
//! `debug_assert!` after every mutation.
//!
//! Shuffle never reorders the tracks themselves. It keeps a separate
//! traversal order (a permutation of the indices, current track first) that
//! `advance` walks and that is handed to the engine for auto-advance.

use crate::error::{PlaybackError, Result};
use crate::mode::{Direction, RepeatMode};
use bridge_traits::engine::{EngineItem, EngineMode, QueueGeneration};
use core_catalog::{Track, TrackId};
use rand::seq::SliceRandom;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct PlaybackQueue {
    tracks: Arc<Vec<Track>>,
    current: Option<usize>,
    generation: QueueGeneration,
    mode: RepeatMode,
    shuffle_order: Option<Vec<usize>>,
}

impl PlaybackQueue {
    pub fn new(mode: RepeatMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Replace the queue.
    ///
    /// The cursor moves to `start_id`, or to the first track when `start_id`
    /// is absent or not queued. Bumps the generation.
    pub fn load(&mut self, tracks: Vec<Track>, start_id: Option<TrackId>) {
        self.current = if tracks.is_empty() {
            None
        } else {
            start_id
                .and_then(|id| tracks.iter().position(|t| t.id == id))
                .or(Some(0))
        };
        self.tracks = Arc::new(tracks);
        self.generation = self.generation.next();
        self.rebuild_shuffle_order();
        self.check_invariants();
    }

    /// Remove a track that is not the current one.
    ///
    /// Returns the offset it was removed from, which the engine must drop
    /// as well.
    pub fn remove(&mut self, id: TrackId) -> Result<usize> {
        let index = self.index_of(id).ok_or_else(|| {
            PlaybackError::InvalidOperation(format!("Track {} is not in the queue", id))
        })?;
        if Some(index) == self.current {
            return Err(PlaybackError::InvalidOperation(
                "Cannot remove the track that is playing".to_string(),
            ));
        }

        Arc::make_mut(&mut self.tracks).remove(index);
        if let Some(current) = self.current.as_mut() {
            if index < *current {
                *current -= 1;
            }
        }
        if let Some(order) = self.shuffle_order.as_mut() {
            order.retain(|&i| i != index);
            for i in order.iter_mut() {
                if *i > index {
                    *i -= 1;
                }
            }
        }

        self.check_invariants();
        Ok(index)
    }

    /// Index the cursor would move to; the cursor itself stays put.
    pub fn advance(&self, direction: Direction) -> Result<usize> {
        let len = self.tracks.len();
        if len == 0 {
            return Err(PlaybackError::OutOfRange("The queue is empty".to_string()));
        }

        let Some(current) = self.current else {
            return match direction {
                Direction::Next => Ok(self.traversal_first()),
                Direction::Previous => Err(PlaybackError::OutOfRange(
                    "No track is playing".to_string(),
                )),
            };
        };

        match self.mode {
            RepeatMode::Sequential => match direction {
                Direction::Next if current + 1 < len => Ok(current + 1),
                Direction::Next => Err(PlaybackError::OutOfRange(
                    "Already at the last track".to_string(),
                )),
                Direction::Previous if current > 0 => Ok(current - 1),
                Direction::Previous => Err(PlaybackError::OutOfRange(
                    "Already at the first track".to_string(),
                )),
            },
            // A user skip moves on even in RepeatOne; only engine
            // auto-completion repeats the track.
            RepeatMode::RepeatOne | RepeatMode::RepeatAll => Ok(wrap(current, direction, len)),
            RepeatMode::Shuffle => {
                let Some(order) = self.shuffle_order.as_ref() else {
                    return Ok(wrap(current, direction, len));
                };
                let position = order.iter().position(|&i| i == current).unwrap_or(0);
                Ok(order[wrap(position, direction, order.len())])
            }
        }
    }

    /// Move the cursor to `index`.
    pub fn commit(&mut self, index: usize) -> Result<()> {
        if index >= self.tracks.len() {
            return Err(PlaybackError::OutOfRange(format!(
                "Index {} is outside a queue of {}",
                index,
                self.tracks.len()
            )));
        }
        self.current = Some(index);
        self.check_invariants();
        Ok(())
    }

    /// Forget the cursor; used when the queue has played out.
    pub fn clear_current(&mut self) {
        self.current = None;
    }

    /// Switch traversal mode. Entering shuffle draws a fresh order with the
    /// current track first; leaving it drops the order.
    pub fn set_repeat_mode(&mut self, mode: RepeatMode) {
        self.mode = mode;
        self.rebuild_shuffle_order();
        self.check_invariants();
    }

    pub fn mode(&self) -> RepeatMode {
        self.mode
    }

    pub fn generation(&self) -> QueueGeneration {
        self.generation
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// Shared snapshot of the tracks, cheap to publish.
    pub fn snapshot(&self) -> Arc<Vec<Track>> {
        Arc::clone(&self.tracks)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current.and_then(|i| self.tracks.get(i))
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.tracks.iter().position(|t| t.id == id)
    }

    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffle_order.as_deref()
    }

    /// The prepared set handed to the engine.
    pub fn engine_items(&self) -> Vec<EngineItem> {
        self.tracks
            .iter()
            .map(|t| EngineItem {
                id: t.id.0,
                url: t.url.clone(),
            })
            .collect()
    }

    /// Engine-side equivalent of the current mode.
    pub fn engine_mode(&self) -> EngineMode {
        match &self.shuffle_order {
            Some(order) => EngineMode::shuffled(self.mode.engine_repeat(), order.clone()),
            None => EngineMode::new(self.mode.engine_repeat()),
        }
    }

    fn traversal_first(&self) -> usize {
        self.shuffle_order
            .as_ref()
            .and_then(|order| order.first().copied())
            .unwrap_or(0)
    }

    fn rebuild_shuffle_order(&mut self) {
        if !self.mode.is_shuffle() {
            self.shuffle_order = None;
            return;
        }

        let mut rest: Vec<usize> = (0..self.tracks.len())
            .filter(|&i| Some(i) != self.current)
            .collect();
        rest.shuffle(&mut rand::thread_rng());

        let mut order = Vec::with_capacity(self.tracks.len());
        order.extend(self.current);
        order.extend(rest);
        self.shuffle_order = Some(order);
    }

    fn check_invariants(&self) {
        debug_assert!(
            self.current.map_or(true, |i| i < self.tracks.len()),
            "cursor {:?} outside queue of {}",
            self.current,
            self.tracks.len()
        );
        debug_assert!(
            self.shuffle_order
                .as_ref()
                .map_or(true, |order| order.len() == self.tracks.len()),
            "shuffle order out of sync with queue"
        );
    }
}

fn wrap(index: usize, direction: Direction, len: usize) -> usize {
    match direction {
        Direction::Next => (index + 1) % len,
        Direction::Previous => (index + len - 1) % len,
    }
}
