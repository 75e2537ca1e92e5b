//! # Playback Controller
//!
//! A single task owns the [`PlaybackQueue`] and the published
//! [`PlaybackState`]. User actions (through [`PlaybackHandle`]) and engine
//! notifications (through a forwarder task reading the engine's event
//! stream) share one command channel, so every transition is handled to
//! completion, and its state published, before the next one starts.
//!
//! ```text
//!  PlaybackHandle ──┐
//!  PlaybackHandle ──┼──▶ mpsc ──▶ controller task ──▶ MediaEngine
//!  engine stream ───┘                  │
//!                                      ├──▶ watch<PlaybackState>
//!                                      ├──▶ broadcast<PlaybackPosition>
//!                                      └──▶ EventBus (notices, track changes)
//! ```
//!
//! Engine notifications stamped with a generation other than the queue's
//! are dropped: they belong to a prepared set that has since been replaced.

use crate::action::PlaybackAction;
use crate::error::{PlaybackError, Result};
use crate::mode::{Direction, RepeatMode};
use crate::queue::PlaybackQueue;
use crate::settings::PlaybackPreferences;
use crate::state::{PlaybackPosition, PlaybackState, PlayerPhase};
use crate::ticker::PositionTicker;
use bridge_traits::engine::{
    EngineEvent, EngineEventStream, EngineNotification, EngineState, MediaEngine,
};
use core_async::sync::{broadcast, mpsc, oneshot, watch};
use core_async::task::JoinHandle;
use core_async::time::Duration;
use core_catalog::{Track, TrackId};
use core_runtime::config::PlaybackConfig;
use core_runtime::events::{CoreEvent, EventBus, NoticeKind, PlaybackEvent};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const POSITION_BUFFER: usize = 16;

/// Message shown in the state when the engine reports an error.
pub const ENGINE_ERROR_MESSAGE: &str = "Playback error";

enum Command {
    Action {
        action: PlaybackAction,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Engine(EngineNotification),
    Loading,
    LoadFailed(String),
    Shutdown {
        reply: oneshot::Sender<Result<()>>,
    },
}

/// The controller actor. Created and started by [`PlaybackController::spawn`].
pub struct PlaybackController {
    engine: Arc<dyn MediaEngine>,
    preferences: PlaybackPreferences,
    events: EventBus,
    queue: PlaybackQueue,
    intended_play: bool,
    state_tx: watch::Sender<PlaybackState>,
    position_tx: broadcast::Sender<PlaybackPosition>,
    position_tick: Duration,
    ticker: Option<PositionTicker>,
    forwarder: Option<JoinHandle<()>>,
}

impl PlaybackController {
    /// Start the controller with the persisted repeat mode and return a
    /// handle to it.
    pub async fn spawn(
        engine: Arc<dyn MediaEngine>,
        preferences: PlaybackPreferences,
        events: EventBus,
        config: &PlaybackConfig,
    ) -> Result<PlaybackHandle> {
        let mode = preferences.repeat_mode().await;
        let stream = engine.subscribe_events().await?;

        let (commands, receiver) = mpsc::channel(config.command_buffer.max(1));
        let (state_tx, state_rx) = watch::channel(PlaybackState::new(mode));
        let (position_tx, _) = broadcast::channel(POSITION_BUFFER);

        let forwarder = core_async::task::spawn(forward_engine_events(stream, commands.downgrade()));

        let controller = Self {
            engine,
            preferences,
            events,
            queue: PlaybackQueue::new(mode),
            intended_play: false,
            state_tx,
            position_tx: position_tx.clone(),
            position_tick: config.position_tick,
            ticker: None,
            forwarder: Some(forwarder),
        };
        core_async::task::spawn(controller.run(receiver));

        info!(%mode, "Playback controller started");
        Ok(PlaybackHandle {
            commands,
            state: state_rx,
            positions: position_tx,
        })
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        while let Some(command) = commands.recv().await {
            match command {
                Command::Action { action, reply } => {
                    let result = self.handle_action(action).await;
                    if let Err(e) = &result {
                        self.notify(e.notice_kind(), e.to_string());
                    }
                    self.restart_ticker();
                    if let Some(reply) = reply {
                        let _ = reply.send(result);
                    }
                }
                Command::Engine(notification) => {
                    if notification.generation != self.queue.generation() {
                        debug!(
                            stale = %notification.generation,
                            current = %self.queue.generation(),
                            event = ?notification.event,
                            "Dropping engine event from a replaced queue"
                        );
                        continue;
                    }
                    self.handle_engine_event(notification.event).await;
                    self.restart_ticker();
                }
                Command::Loading => {
                    self.update(|s| s.loading = true);
                    self.restart_ticker();
                }
                Command::LoadFailed(message) => {
                    self.update(|s| {
                        s.loading = false;
                        s.error = Some(message.clone());
                    });
                    self.notify(NoticeKind::Remote, message);
                    self.restart_ticker();
                }
                Command::Shutdown { reply } => {
                    let result = self.shutdown().await;
                    let _ = reply.send(result);
                    break;
                }
            }
        }

        self.stop_background();
        debug!("Playback controller stopped");
    }

    #[instrument(skip_all, fields(action = action.name()))]
    async fn handle_action(&mut self, action: PlaybackAction) -> Result<()> {
        match action {
            PlaybackAction::Init { tracks, start_id } => self.init(tracks, start_id).await,
            PlaybackAction::PlayPause => self.play_pause().await,
            PlaybackAction::Previous => self.skip(Direction::Previous).await,
            PlaybackAction::Next => self.skip(Direction::Next).await,
            PlaybackAction::SeekTo(position_ms) => self.seek_to(position_ms).await,
            PlaybackAction::SwitchSong(id) => self.switch_song(id).await,
            PlaybackAction::ChangeMode(mode) => self.change_mode(mode).await,
            PlaybackAction::RemoveSong(id) => self.remove_song(id).await,
        }
    }

    async fn init(&mut self, tracks: Vec<Track>, start_id: Option<TrackId>) -> Result<()> {
        self.queue.load(tracks, start_id);
        self.intended_play = false;

        // An unplayable start track leaves the new queue loaded with nothing
        // current.
        let refused = match self.queue.current_index() {
            Some(index) => self.check_playable(index).err(),
            None => None,
        };
        if refused.is_some() {
            self.queue.clear_current();
        }

        let current = self.queue.current_track().cloned();
        let queue = self.queue.snapshot();
        info!(
            generation = %self.queue.generation(),
            tracks = queue.len(),
            start = ?current.as_ref().map(|t| t.id),
            "Loading queue"
        );

        self.emit_track_change(current.as_ref());
        self.update(|s| {
            s.current_track = current.clone();
            s.playing = false;
            s.phase = PlayerPhase::Idle;
            s.loading = false;
            s.error = None;
            s.queue = Arc::clone(&queue);
        });

        self.engine
            .prepare(self.queue.generation(), self.queue.engine_items())
            .await?;
        self.engine.apply_mode(self.queue.engine_mode()).await?;

        if let Some(e) = refused {
            return Err(e);
        }
        match self.queue.current_index() {
            // `load` already moved the cursor, so this bypasses the
            // "already current" check of `SwitchSong`.
            Some(index) => self.play_index(index).await,
            None => Ok(()),
        }
    }

    async fn play_pause(&mut self) -> Result<()> {
        if self.queue.is_empty() {
            return Ok(());
        }
        if self.queue.current_index().is_none() {
            let index = self.queue.advance(Direction::Next)?;
            return self.start_track(index).await;
        }

        self.ensure_prepared().await?;
        let play = !self.intended_play;
        self.engine.set_intended_play(play).await?;
        self.intended_play = play;
        debug!(play, "Toggled playback");
        Ok(())
    }

    async fn skip(&mut self, direction: Direction) -> Result<()> {
        let index = self.queue.advance(direction)?;
        self.start_track(index).await
    }

    async fn seek_to(&mut self, position_ms: u64) -> Result<()> {
        match self.queue.current_index() {
            Some(index) => Ok(self.engine.seek(index, position_ms).await?),
            None => {
                debug!(position_ms, "Seek ignored, nothing is current");
                Ok(())
            }
        }
    }

    async fn switch_song(&mut self, id: TrackId) -> Result<()> {
        if self.queue.current_track().map(|t| t.id) == Some(id) {
            debug!(%id, "Already current");
            return Ok(());
        }

        let index = self.queue.index_of(id).ok_or_else(|| {
            PlaybackError::InvalidOperation(format!("Track {} is not in the queue", id))
        })?;
        self.start_track(index).await
    }

    async fn change_mode(&mut self, mode: RepeatMode) -> Result<()> {
        if let Err(e) = self.preferences.set_repeat_mode(mode).await {
            warn!(error = %e, %mode, "Failed to persist play mode");
        }
        if mode == self.queue.mode() {
            debug!(%mode, "Mode unchanged");
            return Ok(());
        }

        self.queue.set_repeat_mode(mode);
        if self.update(|s| s.repeat_mode = mode) {
            self.emit(PlaybackEvent::ModeChanged {
                mode: mode.to_string(),
            });
        }

        self.engine.apply_mode(self.queue.engine_mode()).await?;
        Ok(())
    }

    async fn remove_song(&mut self, id: TrackId) -> Result<()> {
        let offset = self.queue.remove(id)?;
        let queue = self.queue.snapshot();
        self.update(|s| s.queue = Arc::clone(&queue));

        self.engine.remove_item(offset).await?;
        if self.queue.mode().is_shuffle() {
            self.engine.apply_mode(self.queue.engine_mode()).await?;
        }
        debug!(%id, offset, "Removed track");
        Ok(())
    }

    /// Start the track at `index`, re-preparing an idle engine first.
    ///
    /// A track without a stream URL is refused before the engine is touched.
    async fn start_track(&mut self, index: usize) -> Result<()> {
        self.check_playable(index)?;
        self.ensure_prepared().await?;
        self.play_index(index).await
    }

    /// Seek to the start of `index`, resume, and publish it as current.
    async fn play_index(&mut self, index: usize) -> Result<()> {
        self.engine.seek(index, 0).await?;
        self.engine.set_intended_play(true).await?;
        self.intended_play = true;

        self.queue.commit(index)?;
        let track = self.queue.current_track().cloned();
        self.emit_track_change(track.as_ref());
        self.update(|s| s.current_track = track.clone());
        Ok(())
    }

    fn check_playable(&self, index: usize) -> Result<()> {
        match self.queue.get(index) {
            Some(track) if !track.is_playable() => Err(PlaybackError::ResourceUnavailable(
                format!("\"{}\" cannot be played", track.name),
            )),
            _ => Ok(()),
        }
    }

    async fn ensure_prepared(&self) -> Result<()> {
        if self.engine.engine_state() == EngineState::Idle {
            debug!(generation = %self.queue.generation(), "Engine idle, preparing again");
            self.engine
                .prepare(self.queue.generation(), self.queue.engine_items())
                .await?;
        }
        Ok(())
    }

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        debug!(?event, "Engine event");
        match event {
            EngineEvent::Idle => {
                self.update(|s| s.phase = PlayerPhase::Idle);
            }
            EngineEvent::Ready => {
                self.update(|s| s.phase = PlayerPhase::Ready);
            }
            EngineEvent::Buffering => {
                self.update(|s| s.phase = PlayerPhase::Buffering);
            }
            EngineEvent::Playing => self.on_playing(),
            EngineEvent::Paused => {
                self.intended_play = false;
                let was_playing = self.state_tx.borrow().playing;
                self.update(|s| {
                    s.playing = false;
                    s.phase = PlayerPhase::Paused;
                });
                if let (true, Some(track)) = (was_playing, self.queue.current_track()) {
                    self.emit(PlaybackEvent::Paused {
                        track_id: track.id.0,
                        position_ms: self.engine.current_elapsed_ms(),
                    });
                }
            }
            EngineEvent::Ended => {
                self.intended_play = false;
                self.queue.clear_current();
                self.update(|s| {
                    s.phase = PlayerPhase::Ended;
                    s.playing = false;
                    s.current_track = None;
                });
                self.emit(PlaybackEvent::Ended);
                if let Err(e) = self.engine.set_intended_play(false).await {
                    warn!(error = %e, "Failed to stop engine after queue ended");
                }
            }
            EngineEvent::Error(message) => {
                error!(%message, "Engine reported an error");
                self.intended_play = false;
                self.update(|s| {
                    s.phase = PlayerPhase::Error;
                    s.playing = false;
                    s.error = Some(ENGINE_ERROR_MESSAGE.to_string());
                });
                self.emit(PlaybackEvent::Error {
                    track_id: self.queue.current_track().map(|t| t.id.0),
                    message,
                });
            }
            EngineEvent::AutoAdvanced => self.on_auto_advanced(),
        }
    }

    fn on_playing(&mut self) {
        self.intended_play = true;
        if let Some(index) = self.engine.current_index() {
            if self.queue.commit(index).is_err() {
                warn!(index, len = self.queue.len(), "Engine index outside the queue");
            }
        }

        let track = self.queue.current_track().cloned();
        let was_playing = self.state_tx.borrow().playing;
        self.emit_track_change(track.as_ref());
        self.update(|s| {
            s.phase = PlayerPhase::Playing;
            s.playing = true;
            s.error = None;
            // Keep the published copy when it is the same track; it may carry
            // the engine's duration.
            if s.current_track_id() != track.as_ref().map(|t| t.id) {
                s.current_track = track.clone();
            }
        });

        if let (false, Some(track)) = (was_playing, track) {
            self.emit(PlaybackEvent::Started {
                track_id: track.id.0,
            });
        }
    }

    fn on_auto_advanced(&mut self) {
        let Some(index) = self.engine.current_index() else {
            warn!("Auto-advance without an engine index");
            return;
        };
        if self.queue.commit(index).is_err() {
            warn!(index, len = self.queue.len(), "Auto-advance outside the queue, ignoring");
            return;
        }

        let duration_ms = self.engine.current_track_duration_ms();
        let track = self.queue.current_track().cloned().map(|mut t| {
            if duration_ms > 0 {
                t.duration_ms = duration_ms;
            }
            t
        });

        self.intended_play = true;
        self.emit_track_change(track.as_ref());
        self.update(|s| {
            s.current_track = track.clone();
            s.playing = true;
            s.phase = PlayerPhase::Playing;
        });
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.stop_background();
        self.intended_play = false;
        self.engine.release().await?;
        info!("Playback controller shut down");
        Ok(())
    }

    fn stop_background(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.stop();
        }
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }

    fn restart_ticker(&mut self) {
        // Drop the old ticker before starting the new one.
        self.ticker = None;
        self.ticker = Some(PositionTicker::start(
            Arc::clone(&self.engine),
            self.state_tx.subscribe(),
            self.position_tx.clone(),
            self.position_tick,
        ));
    }

    /// Apply `change` and publish it if the content changed.
    ///
    /// Returns whether a new version was published.
    fn update(&self, change: impl FnOnce(&mut PlaybackState)) -> bool {
        self.state_tx.send_if_modified(|state| {
            let mut next = state.clone();
            change(&mut next);
            if next.same_content(state) {
                return false;
            }
            next.version = state.version + 1;
            *state = next;
            true
        })
    }

    fn emit_track_change(&self, track: Option<&Track>) {
        let Some(track) = track else { return };
        if self.state_tx.borrow().current_track_id() == Some(track.id) {
            return;
        }
        self.emit(PlaybackEvent::TrackChanged {
            track_id: track.id.0,
            title: track.name.clone(),
        });
    }

    fn notify(&self, kind: NoticeKind, message: String) {
        debug!(?kind, %message, "Playback notice");
        self.emit(PlaybackEvent::Notice { kind, message });
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.emit(CoreEvent::Playback(event));
    }
}

async fn forward_engine_events(
    mut stream: Box<dyn EngineEventStream>,
    commands: mpsc::WeakSender<Command>,
) {
    while let Some(notification) = stream.next().await {
        let Some(commands) = commands.upgrade() else {
            break;
        };
        if commands.send(Command::Engine(notification)).await.is_err() {
            break;
        }
    }
    debug!("Engine event forwarder stopped");
}

/// Cheap, cloneable handle to a running [`PlaybackController`].
///
/// The controller stops once every handle has been dropped, or on
/// [`PlaybackHandle::shutdown`].
#[derive(Clone)]
pub struct PlaybackHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<PlaybackState>,
    positions: broadcast::Sender<PlaybackPosition>,
}

impl PlaybackHandle {
    /// Send an action and wait until it has been handled.
    ///
    /// Recoverable failures (out of range, invalid operation, unplayable
    /// track) are also published as notices; the state is left unchanged.
    pub async fn dispatch(&self, action: PlaybackAction) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Action {
            action,
            reply: Some(reply),
        })
        .await?;
        outcome.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    /// Queue an action without waiting for its outcome.
    pub async fn submit(&self, action: PlaybackAction) -> Result<()> {
        self.send(Command::Action {
            action,
            reply: None,
        })
        .await
    }

    /// Latest published state.
    pub fn state(&self) -> PlaybackState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.state.clone()
    }

    pub fn subscribe_position(&self) -> broadcast::Receiver<PlaybackPosition> {
        self.positions.subscribe()
    }

    /// Flag that a new queue is being loaded.
    pub async fn mark_loading(&self) -> Result<()> {
        self.send(Command::Loading).await
    }

    /// Clear the loading flag and surface `message` as the state error.
    pub async fn report_load_failure(&self, message: impl Into<String>) -> Result<()> {
        self.send(Command::LoadFailed(message.into())).await
    }

    /// Release the engine and stop the controller.
    pub async fn shutdown(&self) -> Result<()> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Shutdown { reply }).await?;
        outcome.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::ControllerClosed)
    }
}

impl std::fmt::Debug for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("PlaybackHandle")
            .field("version", &state.version)
            .field("phase", &state.phase)
            .field("closed", &self.commands.is_closed())
            .finish()
    }
}
