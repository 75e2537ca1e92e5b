//! Media engine bridge.
//!
//! The playback controller drives a host-provided audio engine one way:
//! commands go in through [`MediaEngine`], state changes come back out as a
//! stream of [`EngineNotification`]s. The controller never reaches into
//! engine internals.
//!
//! ## Generations
//!
//! Every [`MediaEngine::prepare`] call carries a [`QueueGeneration`]. Engines
//! must stamp each notification with the generation of the prepared set it
//! belongs to, so the controller can discard events that were emitted for a
//! queue it has already replaced.
//!
//! ```text
//!   PlaybackController                        MediaEngine (host)
//!   ──────────────────                        ──────────────────
//!   prepare(gen 4, items) ──────────────────▶ replaces prepared set
//!   seek(2, 0) / set_intended_play(true) ──▶ starts item 2
//!                         ◀── { gen 4, Ready }
//!                         ◀── { gen 4, Playing }
//!                         ◀── { gen 4, AutoAdvanced }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Version tag of a prepared track set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct QueueGeneration(pub u64);

impl QueueGeneration {
    /// Returns the following generation.
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl std::fmt::Display for QueueGeneration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// A single prepared item: the track id plus its resolved stream URL.
///
/// `url` is `None` for tracks whose stream could not be resolved; engines
/// should report an [`EngineEvent::Error`] if such an item is started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineItem {
    pub id: i64,
    pub url: Option<String>,
}

/// Repeat behaviour the engine applies when a track finishes on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineRepeat {
    Off,
    One,
    All,
}

/// Traversal configuration pushed to the engine.
///
/// When `shuffle_order` is set, the engine must auto-advance through the
/// prepared items in that order (a permutation of `0..len`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMode {
    pub repeat: EngineRepeat,
    pub shuffle_order: Option<Vec<usize>>,
}

impl EngineMode {
    pub fn new(repeat: EngineRepeat) -> Self {
        Self {
            repeat,
            shuffle_order: None,
        }
    }

    pub fn shuffled(repeat: EngineRepeat, order: Vec<usize>) -> Self {
        Self {
            repeat,
            shuffle_order: Some(order),
        }
    }
}

/// Coarse engine state, as reported by [`MediaEngine::engine_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    /// Nothing prepared, or the prepared set was dropped after an error.
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// State changes reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "detail")]
pub enum EngineEvent {
    Idle,
    Ready,
    Buffering,
    Playing,
    Paused,
    /// The last item finished and no repeat applies.
    Ended,
    Error(String),
    /// The engine finished an item on its own and moved to the next one.
    AutoAdvanced,
}

/// An [`EngineEvent`] stamped with the generation it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineNotification {
    pub generation: QueueGeneration,
    pub event: EngineEvent,
}

impl EngineNotification {
    pub fn new(generation: QueueGeneration, event: EngineEvent) -> Self {
        Self { generation, event }
    }
}

/// Host audio engine driven by the playback controller.
///
/// # Threading
///
/// Command methods are awaited from the controller task one at a time; the
/// synchronous query methods may be called from the position ticker
/// concurrently and must not block.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Replace the prepared item set. Calling this again with an identical
    /// set and generation must keep the current item and position.
    async fn prepare(&self, generation: QueueGeneration, items: Vec<EngineItem>) -> Result<()>;

    /// Jump to `index` in the prepared set at `position_ms`.
    async fn seek(&self, index: usize, position_ms: u64) -> Result<()>;

    /// Set whether the engine should play as soon as it is ready.
    async fn set_intended_play(&self, play: bool) -> Result<()>;

    /// Drop the prepared item at `index`, shifting later items down.
    async fn remove_item(&self, index: usize) -> Result<()>;

    /// Configure how the engine advances on its own.
    async fn apply_mode(&self, mode: EngineMode) -> Result<()>;

    /// Release decoder and output resources.
    async fn release(&self) -> Result<()>;

    /// Subscribe to engine notifications.
    async fn subscribe_events(&self) -> Result<Box<dyn EngineEventStream>>;

    /// Elapsed time into the current item.
    fn current_elapsed_ms(&self) -> u64;

    /// Index of the current item in the prepared set, if any.
    fn current_index(&self) -> Option<usize>;

    /// Duration of the current item, or 0 when unknown.
    fn current_track_duration_ms(&self) -> u64;

    fn engine_state(&self) -> EngineState;
}

/// Stream of engine notifications.
#[async_trait]
pub trait EngineEventStream: Send {
    /// Returns `None` once the engine has shut down.
    async fn next(&mut self) -> Option<EngineNotification>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_increments() {
        let gen = QueueGeneration::default();
        assert_eq!(gen.next(), QueueGeneration(1));
        assert_eq!(QueueGeneration(u64::MAX).next(), QueueGeneration(0));
    }

    #[test]
    fn engine_event_serializes_with_tag() {
        let json = serde_json::to_string(&EngineEvent::Error("decoder".into())).unwrap();
        assert_eq!(json, r#"{"event":"Error","detail":"decoder"}"#);

        let back: EngineEvent = serde_json::from_str(r#"{"event":"AutoAdvanced"}"#).unwrap();
        assert_eq!(back, EngineEvent::AutoAdvanced);
    }

    #[test]
    fn shuffled_mode_carries_order() {
        let mode = EngineMode::shuffled(EngineRepeat::All, vec![2, 0, 1]);
        assert_eq!(mode.shuffle_order.as_deref(), Some(&[2, 0, 1][..]));
        assert_eq!(EngineMode::new(EngineRepeat::One).shuffle_order, None);
    }
}
