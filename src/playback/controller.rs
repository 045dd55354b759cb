use std::time::Duration;

use log::{debug, info, warn};

use crate::library::{Catalog, FilteredView, Track};
use crate::observer::{Observers, SubscriptionId};

use super::backend::{BackendEvent, BackendState, MediaBackend};
use super::error::PlaybackError;
use super::order::{PlayOrder, PlayOrderError};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PlayerState {
    Idle,
    Playing,
    Paused,
}

/// What is currently loaded into the backend. Replaced on every track change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Catalog index of the loaded track.
    pub track: usize,
    pub state: PlayerState,
    /// Backend load generation of the stream.
    pub generation: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A new track was loaded; `track` is its catalog index.
    TrackChanged { track: usize },
    StateChanged(PlayerState),
}

/// Transport state machine: Idle, Playing and Paused.
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    session: Option<Session>,
    repeat_one: bool,
    observers: Observers<SessionEvent>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B, repeat_one: bool) -> Self {
        Self {
            backend,
            session: None,
            repeat_one,
            observers: Observers::default(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn state(&self) -> PlayerState {
        self.session.as_ref().map_or(PlayerState::Idle, |s| s.state)
    }

    /// Catalog index of the loaded track.
    pub fn current_track(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.track)
    }

    pub fn repeat_one(&self) -> bool {
        self.repeat_one
    }

    pub fn set_repeat_one(&mut self, on: bool) {
        self.repeat_one = on;
    }

    pub fn subscribe(&mut self, callback: impl FnMut(&SessionEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Load and start the track at `view_index` and move the order's cursor to it.
    ///
    /// Replacing a playing track goes straight to `Playing` on the new one. A
    /// failed load leaves the current session untouched.
    pub fn play(
        &mut self,
        catalog: &Catalog,
        view: &FilteredView,
        order: &mut PlayOrder,
        view_index: usize,
    ) -> Result<(), PlaybackError> {
        if view.is_empty() {
            return Err(PlaybackError::EmptyOrder);
        }
        let out_of_range = PlaybackError::OutOfRange {
            index: view_index,
            len: view.len(),
        };
        let Some(track_index) = view.get(view_index) else {
            return Err(out_of_range);
        };
        let track = catalog.get(track_index).map_err(|_| out_of_range)?;

        self.start(track_index, track)?;
        order.activate(view_index);
        Ok(())
    }

    pub fn next(
        &mut self,
        catalog: &Catalog,
        view: &FilteredView,
        order: &mut PlayOrder,
    ) -> Result<(), PlaybackError> {
        self.step(catalog, view, order, PlayOrder::next)
    }

    pub fn previous(
        &mut self,
        catalog: &Catalog,
        view: &FilteredView,
        order: &mut PlayOrder,
    ) -> Result<(), PlaybackError> {
        self.step(catalog, view, order, PlayOrder::previous)
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        let next = match self.state() {
            PlayerState::Idle => return Err(PlaybackError::NothingLoaded),
            PlayerState::Playing => {
                self.backend.pause();
                PlayerState::Paused
            }
            PlayerState::Paused => {
                self.backend.play();
                PlayerState::Playing
            }
        };
        self.set_state(next);
        Ok(())
    }

    /// React to one backend event. End-of-stream behaves like `next()`,
    /// including repeat-one.
    pub fn handle_event(
        &mut self,
        event: BackendEvent,
        catalog: &Catalog,
        view: &FilteredView,
        order: &mut PlayOrder,
    ) -> Result<(), PlaybackError> {
        match event {
            BackendEvent::EndOfStream { generation } => {
                let Some(session) = self.session.as_ref() else {
                    return Ok(());
                };
                // Queued before a newer load replaced that stream.
                if session.generation != generation {
                    debug!("dropping end of stream for load {generation}");
                    return Ok(());
                }
                match self.step(catalog, view, order, PlayOrder::next) {
                    Err(PlaybackError::EmptyOrder) => {
                        info!("end of stream with nothing visible to play, stopping");
                        self.stop();
                        Err(PlaybackError::EmptyOrder)
                    }
                    result => result,
                }
            }
            // Track changes are driven from here, so a backend stop in between
            // two loads is not a transition.
            BackendEvent::StateChanged(BackendState::Stopped) => {
                if self.session.is_some() {
                    debug!("ignoring backend stop while a track is loaded");
                }
                Ok(())
            }
            BackendEvent::StateChanged(BackendState::Playing) => {
                self.sync_state(PlayerState::Playing);
                Ok(())
            }
            BackendEvent::StateChanged(BackendState::Paused) => {
                self.sync_state(PlayerState::Paused);
                Ok(())
            }
        }
    }

    /// Seek relative to the current position, clamped to the track.
    pub fn seek_by(&mut self, catalog: &Catalog, seconds: i64) -> Result<(), PlaybackError> {
        if self.session.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        let current = self.backend.position();
        let delta = Duration::from_secs(seconds.unsigned_abs());
        let mut target = if seconds < 0 {
            current.saturating_sub(delta)
        } else {
            current.saturating_add(delta)
        };
        if let Some(total) = self.duration(catalog) {
            target = target.min(total);
        }
        self.backend.seek(target);
        Ok(())
    }

    /// Seek to `fraction` (0.0..=1.0) of the track. A no-op while the
    /// duration is unknown.
    pub fn seek_to_fraction(&mut self, catalog: &Catalog, fraction: f64) -> Result<(), PlaybackError> {
        if self.session.is_none() {
            return Err(PlaybackError::NothingLoaded);
        }
        let Some(total) = self.duration(catalog) else {
            return Ok(());
        };
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.backend.seek(total.mul_f64(fraction));
        Ok(())
    }

    pub fn position(&self) -> Duration {
        if self.session.is_none() {
            return Duration::ZERO;
        }
        self.backend.position()
    }

    /// Length of the loaded track, preferring what the backend reports.
    pub fn duration(&self, catalog: &Catalog) -> Option<Duration> {
        let session = self.session.as_ref()?;
        self.backend.duration().or_else(|| {
            catalog
                .get(session.track)
                .ok()
                .map(|t| t.duration)
                .filter(|d| !d.is_zero())
        })
    }

    pub fn position_fraction(&self, catalog: &Catalog) -> Option<f64> {
        let total = self.duration(catalog)?;
        if total.is_zero() {
            return None;
        }
        Some((self.position().as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0))
    }

    /// Stop the backend and drop the session.
    pub fn stop(&mut self) {
        self.backend.stop();
        if self.session.take().is_some() {
            self.observers
                .notify(&SessionEvent::StateChanged(PlayerState::Idle));
        }
    }

    /// Explicit teardown: release the backend and drop the session.
    pub fn shutdown(&mut self) {
        self.backend.shutdown();
        if self.session.take().is_some() {
            self.observers
                .notify(&SessionEvent::StateChanged(PlayerState::Idle));
        }
    }

    pub fn poll_backend(&mut self) -> Option<BackendEvent> {
        self.backend.poll_event()
    }

    /// Step the order and play the result. The cursor moves back if the
    /// load fails.
    fn step(
        &mut self,
        catalog: &Catalog,
        view: &FilteredView,
        order: &mut PlayOrder,
        advance: fn(&mut PlayOrder, bool) -> Result<usize, PlayOrderError>,
    ) -> Result<(), PlaybackError> {
        let cursor = order.cursor();
        let view_index = advance(order, self.repeat_one)?;
        let result = self.play(catalog, view, order, view_index);
        if result.is_err() {
            order.set_cursor(cursor);
        }
        result
    }

    fn start(&mut self, track_index: usize, track: &Track) -> Result<(), PlaybackError> {
        let generation = match self.backend.load(&track.uri) {
            Ok(generation) => generation,
            Err(e) => {
                warn!("cannot play {}: {e}", track.path.display());
                return Err(e.into());
            }
        };
        self.backend.play();
        info!("now playing {}", track.path.display());

        let was = self.state();
        self.session = Some(Session {
            track: track_index,
            state: PlayerState::Playing,
            generation,
        });
        self.observers
            .notify(&SessionEvent::TrackChanged { track: track_index });
        if was != PlayerState::Playing {
            self.observers
                .notify(&SessionEvent::StateChanged(PlayerState::Playing));
        }
        Ok(())
    }

    fn set_state(&mut self, state: PlayerState) {
        if let Some(session) = self.session.as_mut() {
            session.state = state;
            self.observers.notify(&SessionEvent::StateChanged(state));
        }
    }

    fn sync_state(&mut self, state: PlayerState) {
        if self.session.as_ref().is_some_and(|s| s.state != state) {
            self.set_state(state);
        }
    }
}
