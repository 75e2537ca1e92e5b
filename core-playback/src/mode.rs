//! Repeat and shuffle modes.

use bridge_traits::engine::EngineRepeat;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the queue is traversed.
///
/// The numeric codes are what gets persisted; they must not change.
///
/// # Examples
///
/// ```
/// use core_playback::RepeatMode;
///
/// assert_eq!(RepeatMode::default(), RepeatMode::RepeatAll);
/// assert_eq!(RepeatMode::RepeatAll.cycle(), RepeatMode::Shuffle);
/// assert_eq!(RepeatMode::from_code(3), Some(RepeatMode::Shuffle));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Play through once; skipping past either end is refused.
    Sequential,
    /// Repeat the current track when it finishes on its own.
    RepeatOne,
    /// Wrap around at either end.
    #[default]
    RepeatAll,
    /// Random traversal order, wrapping around.
    Shuffle,
}

impl RepeatMode {
    pub fn code(&self) -> i64 {
        match self {
            RepeatMode::Sequential => 0,
            RepeatMode::RepeatOne => 1,
            RepeatMode::RepeatAll => 2,
            RepeatMode::Shuffle => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RepeatMode::Sequential),
            1 => Some(RepeatMode::RepeatOne),
            2 => Some(RepeatMode::RepeatAll),
            3 => Some(RepeatMode::Shuffle),
            _ => None,
        }
    }

    /// Next mode of the mode button: one → all → shuffle → one.
    /// `Sequential` is not on the cycle and moves to `RepeatOne`.
    pub fn cycle(&self) -> Self {
        match self {
            RepeatMode::Sequential => RepeatMode::RepeatOne,
            RepeatMode::RepeatOne => RepeatMode::RepeatAll,
            RepeatMode::RepeatAll => RepeatMode::Shuffle,
            RepeatMode::Shuffle => RepeatMode::RepeatOne,
        }
    }

    /// Repeat setting the engine applies on auto-advance.
    pub fn engine_repeat(&self) -> EngineRepeat {
        match self {
            RepeatMode::Sequential => EngineRepeat::Off,
            RepeatMode::RepeatOne => EngineRepeat::One,
            RepeatMode::RepeatAll | RepeatMode::Shuffle => EngineRepeat::All,
        }
    }

    pub fn is_shuffle(&self) -> bool {
        matches!(self, RepeatMode::Shuffle)
    }
}

impl fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatMode::Sequential => write!(f, "sequential"),
            RepeatMode::RepeatOne => write!(f, "repeat-one"),
            RepeatMode::RepeatAll => write!(f, "repeat-all"),
            RepeatMode::Shuffle => write!(f, "shuffle"),
        }
    }
}

/// Skip direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}
