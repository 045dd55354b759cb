//! The player context: catalog, filtered view, play order and transport,
//! owned by the control loop and mutated only there.

use std::path::Path;
use std::time::Duration;

use log::debug;

use crate::library::{Catalog, FilteredView, ItemsChanged, Metadata, Track};
use crate::observer::{Observers, SubscriptionId};
use crate::playback::{
    MediaBackend, PlayOrder, PlaybackController, PlaybackError, PlayerState, Session, SessionEvent,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerOptions {
    pub shuffle: bool,
    pub repeat_one: bool,
    /// Fixed shuffle seed; random when `None`.
    pub seed: Option<u64>,
}

pub struct Player<B: MediaBackend> {
    catalog: Catalog,
    view: FilteredView,
    order: PlayOrder,
    controller: PlaybackController<B>,
    items_changed: Observers<ItemsChanged>,
}

impl<B: MediaBackend> Player<B> {
    pub fn new(backend: B, options: PlayerOptions) -> Self {
        let order = match options.seed {
            Some(seed) => PlayOrder::with_seed(options.shuffle, seed),
            None => PlayOrder::new(options.shuffle),
        };
        Self {
            catalog: Catalog::new(),
            view: FilteredView::new(),
            order,
            controller: PlaybackController::new(backend, options.repeat_one),
            items_changed: Observers::default(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn view(&self) -> &FilteredView {
        &self.view
    }

    pub fn order(&self) -> &PlayOrder {
        &self.order
    }

    pub fn session(&self) -> Option<&Session> {
        self.controller.session()
    }

    pub fn state(&self) -> PlayerState {
        self.controller.state()
    }

    pub fn repeat_one(&self) -> bool {
        self.controller.repeat_one()
    }

    pub fn shuffle(&self) -> bool {
        self.order.shuffle()
    }

    /// Catalog index of the loaded track.
    pub fn now_playing_index(&self) -> Option<usize> {
        self.controller.current_track()
    }

    pub fn now_playing(&self) -> Option<&Track> {
        let index = self.controller.current_track()?;
        self.catalog.get(index).ok()
    }

    /// Append a newly discovered track.
    pub fn add_track(&mut self, track: Track) -> usize {
        let change = self.catalog.append(track);
        let index = change.position;
        if let Some(change) = self.view.admit(&self.catalog, index) {
            self.rebuild_order();
            self.items_changed.notify(&change);
        }
        index
    }

    /// Apply resolved metadata to the track at `path`. Returns whether
    /// anything changed.
    pub fn apply_metadata(&mut self, path: &Path, metadata: Metadata) -> bool {
        let (_, applied) = match self.catalog.apply_metadata(path, metadata) {
            Ok(result) => result,
            Err(e) => {
                debug!("dropping metadata update: {e}");
                return false;
            }
        };
        if !applied {
            debug!("{} was already resolved, update ignored", path.display());
            return false;
        }
        // Tags only matter to membership while a query is active.
        if !self.view.query().is_empty() {
            if let Some(change) = self.view.refresh(&self.catalog) {
                self.rebuild_order();
                self.items_changed.notify(&change);
            }
        }
        true
    }

    pub fn set_filter(&mut self, query: &str) {
        if query == self.view.query() {
            return;
        }
        let change = self.view.apply(&self.catalog, query);
        self.rebuild_order();
        self.items_changed.notify(&change);
    }

    pub fn set_shuffle(&mut self, on: bool) {
        self.order.set_shuffle(on, self.view.len());
        self.reactivate_current();
    }

    pub fn set_repeat_one(&mut self, on: bool) {
        self.controller.set_repeat_one(on);
    }

    /// Play the track at `view_index` of the filtered view.
    pub fn play(&mut self, view_index: usize) -> Result<(), PlaybackError> {
        self.controller
            .play(&self.catalog, &self.view, &mut self.order, view_index)
    }

    /// Play the track at `catalog_index`, if it is visible.
    pub fn play_track(&mut self, catalog_index: usize) -> Result<(), PlaybackError> {
        let view_index = self
            .view
            .position_of(catalog_index)
            .ok_or(PlaybackError::OutOfRange {
                index: catalog_index,
                len: self.catalog.count(),
            })?;
        self.play(view_index)
    }

    pub fn next(&mut self) -> Result<(), PlaybackError> {
        self.controller
            .next(&self.catalog, &self.view, &mut self.order)
    }

    pub fn previous(&mut self) -> Result<(), PlaybackError> {
        self.controller
            .previous(&self.catalog, &self.view, &mut self.order)
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        self.controller.toggle_play_pause()
    }

    pub fn seek_by(&mut self, seconds: i64) -> Result<(), PlaybackError> {
        self.controller.seek_by(&self.catalog, seconds)
    }

    pub fn seek_to_fraction(&mut self, fraction: f64) -> Result<(), PlaybackError> {
        self.controller.seek_to_fraction(&self.catalog, fraction)
    }

    pub fn position(&self) -> Duration {
        self.controller.position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.controller.duration(&self.catalog)
    }

    pub fn position_fraction(&self) -> Option<f64> {
        self.controller.position_fraction(&self.catalog)
    }

    /// Drain pending backend events through the state machine.
    pub fn pump_backend_events(&mut self) -> Vec<PlaybackError> {
        let mut errors = Vec::new();
        while let Some(event) = self.controller.poll_backend() {
            if let Err(e) =
                self.controller
                    .handle_event(event, &self.catalog, &self.view, &mut self.order)
            {
                errors.push(e);
            }
        }
        errors
    }

    pub fn subscribe_items_changed(
        &mut self,
        callback: impl FnMut(&ItemsChanged) + 'static,
    ) -> SubscriptionId {
        self.items_changed.subscribe(callback)
    }

    pub fn unsubscribe_items_changed(&mut self, id: SubscriptionId) -> bool {
        self.items_changed.unsubscribe(id)
    }

    pub fn subscribe_session(
        &mut self,
        callback: impl FnMut(&SessionEvent) + 'static,
    ) -> SubscriptionId {
        self.controller.subscribe(callback)
    }

    pub fn unsubscribe_session(&mut self, id: SubscriptionId) -> bool {
        self.controller.unsubscribe(id)
    }

    /// Stop playback and release the backend.
    pub fn shutdown(&mut self) {
        self.controller.shutdown();
    }

    fn rebuild_order(&mut self) {
        self.order.rebuild(self.view.len());
        self.reactivate_current();
    }

    /// After a rebuild, keep `next()` continuing from the loaded track.
    fn reactivate_current(&mut self) {
        let visible = self
            .controller
            .current_track()
            .and_then(|track| self.view.position_of(track));
        if let Some(view_index) = visible {
            self.order.activate(view_index);
        }
    }
}
