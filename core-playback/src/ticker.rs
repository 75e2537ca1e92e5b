//! Position ticker.
//!
//! Emits a [`PlaybackPosition`] right away, then once per interval while the
//! published phase is `Playing`. The controller replaces the ticker after
//! every command, so at most one is alive.

use crate::state::{PlaybackPosition, PlaybackState, PlayerPhase};
use bridge_traits::engine::MediaEngine;
use core_async::sync::{broadcast, watch, CancellationToken};
use core_async::time::{sleep, Duration};
use std::sync::Arc;
use tracing::trace;

/// Running ticker task. Dropping it stops the task.
#[derive(Debug)]
pub struct PositionTicker {
    cancel: CancellationToken,
}

impl PositionTicker {
    pub fn start(
        engine: Arc<dyn MediaEngine>,
        state: watch::Receiver<PlaybackState>,
        positions: broadcast::Sender<PlaybackPosition>,
        interval: Duration,
    ) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        core_async::task::spawn(async move {
            loop {
                let (track_id, phase) = {
                    let state = state.borrow();
                    (state.current_track_id(), state.phase)
                };

                let position = PlaybackPosition {
                    track_id,
                    elapsed_ms: engine.current_elapsed_ms(),
                    duration_ms: engine.current_track_duration_ms(),
                };
                // No subscribers is fine.
                let _ = positions.send(position);

                if phase != PlayerPhase::Playing {
                    break;
                }

                core_async::select! {
                    _ = token.cancelled() => break,
                    _ = sleep(interval) => {}
                }

                if token.is_cancelled() || state.borrow().phase != PlayerPhase::Playing {
                    break;
                }
            }
            trace!("Position ticker stopped");
        });

        Self { cancel }
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for PositionTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
