//! # Playback Module
//!
//! The playback queue and the controller that drives the host media engine.
//!
//! ## Overview
//!
//! - [`PlaybackQueue`]: ordered tracks with a cursor, repeat modes and a
//!   shuffle traversal order
//! - [`PlaybackController`]: single-task state machine fed by user actions
//!   and engine notifications; controlled through a [`PlaybackHandle`]
//! - [`PlaybackState`]: read-only snapshot published on a watch channel,
//!   versioned so no-op transitions publish nothing
//! - [`PlaybackPreferences`]: the persisted repeat mode
//!
//! ## Usage
//!
//! ```ignore
//! let handle = PlaybackController::spawn(engine, preferences, events, &config).await?;
//! handle
//!     .dispatch(PlaybackAction::Init { tracks, start_id: Some(TrackId(42)) })
//!     .await?;
//!
//! let mut state = handle.subscribe_state();
//! state.changed().await?;
//! println!("now playing: {:?}", state.borrow().current_track);
//! ```

pub mod action;
pub mod controller;
pub mod error;
pub mod mode;
pub mod queue;
pub mod settings;
pub mod state;
pub mod ticker;

pub use action::PlaybackAction;
pub use controller::{PlaybackController, PlaybackHandle, ENGINE_ERROR_MESSAGE};
pub use error::{PlaybackError, Result};
pub use mode::{Direction, RepeatMode};
pub use queue::PlaybackQueue;
pub use settings::PlaybackPreferences;
pub use state::{PlaybackPosition, PlaybackState, PlayerPhase};
