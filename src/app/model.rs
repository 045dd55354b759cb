//! Application model: `App` wraps the `Player` context with the state only
//! the terminal UI cares about (selection, filter editing, scrubbing, scan
//! progress and the last reported condition).

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use log::debug;

use crate::library::{ScanEvent, ScanSummary, Track};
use crate::playback::{MediaBackend, PlaybackError, PlayerState, SessionEvent};
use crate::player::Player;

/// Library scan progress as seen by the control thread.
#[derive(Debug, Clone, Default)]
pub struct ScanStatus {
    pub discovered: usize,
    pub resolved: usize,
    pub finished: Option<ScanSummary>,
}

/// An uncommitted scrub: a target position not yet sent to the backend.
#[derive(Debug, Clone, Copy)]
pub struct Scrub {
    pub fraction: f64,
    pub last_input: Instant,
}

/// Last polled playback position, shown by the progress bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct Progress {
    pub elapsed: Duration,
    pub total: Option<Duration>,
    pub fraction: Option<f64>,
}

/// The main application model.
pub struct App<B: MediaBackend> {
    pub player: Player<B>,
    /// Catalog index of the highlighted row.
    pub selected: usize,
    pub follow_playback: bool,
    pub filter_mode: bool,
    pub filter_query: String,
    pub metadata_window: bool,
    pub current_dir: Option<String>,
    pub scan: ScanStatus,
    pub scrub: Option<Scrub>,
    pub progress: Progress,
    /// Last condition reported by a command, cleared by the next success.
    pub notice: Option<String>,

    followed_track: Rc<Cell<Option<usize>>>,
    view_changed: Rc<Cell<bool>>,
}

impl<B: MediaBackend> App<B> {
    /// Create a new `App` driving `player`.
    pub fn new(mut player: Player<B>) -> Self {
        let followed_track = Rc::new(Cell::new(None));
        let followed = followed_track.clone();
        player.subscribe_session(move |event| {
            if let SessionEvent::TrackChanged { track } = event {
                followed.set(Some(*track));
            }
        });

        let view_changed = Rc::new(Cell::new(false));
        let changed = view_changed.clone();
        player.subscribe_items_changed(move |_| changed.set(true));

        Self {
            player,
            selected: 0,
            follow_playback: true,
            filter_mode: false,
            filter_query: String::new(),
            metadata_window: false,
            current_dir: None,
            scan: ScanStatus::default(),
            scrub: None,
            progress: Progress::default(),
            notice: None,
            followed_track,
            view_changed,
        }
    }

    /// Record the current directory in the app state.
    pub fn set_current_dir(&mut self, dir: String) {
        self.current_dir = Some(dir);
    }

    pub fn toggle_metadata_window(&mut self) {
        self.metadata_window = !self.metadata_window;
    }

    /// Enable following playback (cursor follows currently playing track).
    pub fn follow_playback_on(&mut self) {
        self.follow_playback = true;
    }

    pub fn follow_playback_off(&mut self) {
        self.follow_playback = false;
    }

    /// Return true if any track is visible.
    pub fn has_tracks(&self) -> bool {
        !self.player.view().is_empty()
    }

    /// View position of the selected row, if it is visible.
    pub fn selected_position(&self) -> Option<usize> {
        self.player.view().position_of(self.selected)
    }

    pub fn selected_track(&self) -> Option<&Track> {
        self.selected_position()?;
        self.player.catalog().get(self.selected).ok()
    }

    /// Apply one message from the scan worker.
    pub fn ingest(&mut self, event: ScanEvent) {
        match event {
            ScanEvent::Discovered(track) => {
                self.scan.discovered += 1;
                self.player.add_track(track);
            }
            ScanEvent::Resolved { path, metadata } => {
                if self.player.apply_metadata(&path, metadata) {
                    self.scan.resolved += 1;
                }
            }
            ScanEvent::Finished(summary) => {
                self.scan.finished = Some(summary);
            }
        }
    }

    /// Fold observer notifications into the UI state. Called once per loop iteration.
    pub fn sync(&mut self) {
        if self.view_changed.replace(false) {
            self.ensure_selected_visible();
        }
        if let Some(track) = self.followed_track.take() {
            let visible = self.player.view().position_of(track).is_some();
            if self.follow_playback && !self.filter_mode && visible {
                self.selected = track;
            }
        }
    }

    /// Drain backend events; the last reported condition becomes the notice.
    pub fn pump_backend(&mut self) {
        for e in self.player.pump_backend_events() {
            self.report(Err(e));
        }
    }

    /// Refresh the progress bar from the backend. Suspended while scrubbing.
    pub fn poll_position(&mut self) {
        if self.scrub.is_some() {
            return;
        }
        self.progress = Progress {
            elapsed: self.player.position(),
            total: self.player.duration(),
            fraction: self.player.position_fraction(),
        };
    }

    /// The fraction shown by the progress bar.
    pub fn display_fraction(&self) -> Option<f64> {
        match self.scrub {
            Some(s) => Some(s.fraction),
            None => self.progress.fraction,
        }
    }

    pub fn play_selected(&mut self) {
        if self.selected_position().is_none() {
            self.report(Err(PlaybackError::EmptyOrder));
            return;
        }
        if !self.filter_mode {
            self.follow_playback_on();
        }
        let result = self.player.play_track(self.selected);
        self.report(result);
    }

    /// Play/pause; when nothing is loaded the selection starts playing.
    pub fn toggle_play_pause(&mut self) {
        match self.player.toggle_play_pause() {
            Err(PlaybackError::NothingLoaded) => self.play_selected(),
            result => self.report(result),
        }
    }

    pub fn next_track(&mut self) {
        if !self.filter_mode {
            self.follow_playback_on();
        }
        let result = self.player.next();
        self.report(result);
    }

    pub fn prev_track(&mut self) {
        if !self.filter_mode {
            self.follow_playback_on();
        }
        let result = self.player.previous();
        self.report(result);
    }

    pub fn seek_by(&mut self, seconds: i64) {
        let result = self.player.seek_by(seconds);
        self.report(result);
        self.poll_position();
    }

    /// Move the pending scrub target by `percent` of the track.
    pub fn scrub_by(&mut self, percent: i32, now: Instant) {
        let start = match self.scrub {
            Some(s) => Some(s.fraction),
            None => self.player.position_fraction(),
        };
        let Some(start) = start else {
            self.notice = Some("nothing to scrub".to_string());
            return;
        };
        self.scrub = Some(Scrub {
            fraction: (start + f64::from(percent) / 100.0).clamp(0.0, 1.0),
            last_input: now,
        });
    }

    /// Whether the pending scrub has been idle for at least `timeout`.
    pub fn scrub_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.scrub
            .is_some_and(|s| now.saturating_duration_since(s.last_input) >= timeout)
    }

    pub fn commit_scrub(&mut self) {
        if let Some(s) = self.scrub.take() {
            let result = self.player.seek_to_fraction(s.fraction);
            self.report(result);
            self.poll_position();
        }
    }

    pub fn cancel_scrub(&mut self) {
        self.scrub = None;
    }

    pub fn toggle_shuffle(&mut self) {
        let on = !self.player.shuffle();
        self.player.set_shuffle(on);
    }

    pub fn toggle_repeat_one(&mut self) {
        let on = !self.player.repeat_one();
        self.player.set_repeat_one(on);
    }

    /// Select the loaded track, if visible.
    pub fn jump_to_now_playing(&mut self) {
        if let Some(track) = self.player.now_playing_index() {
            if self.player.view().position_of(track).is_some() {
                self.selected = track;
                self.follow_playback_on();
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.player.state() == PlayerState::Idle
    }

    /// Enter filter mode: typing edits the query.
    pub fn enter_filter_mode(&mut self) {
        self.filter_mode = true;
        self.follow_playback_off();
    }

    pub fn exit_filter_mode(&mut self) {
        self.filter_mode = false;
    }

    /// Clear the active filter and restore selection visibility.
    pub fn clear_filter(&mut self) {
        self.filter_query.clear();
        self.filter_mode = false;
        self.apply_filter();
    }

    pub fn push_filter_char(&mut self, c: char) {
        self.filter_query.push(c);
        self.apply_filter();
    }

    pub fn pop_filter_char(&mut self) {
        self.filter_query.pop();
        self.apply_filter();
    }

    fn apply_filter(&mut self) {
        let query = self.filter_query.trim().to_string();
        self.player.set_filter(&query);
        self.ensure_selected_visible();
    }

    /// Keep `selected` on a visible row, falling back to the first one.
    fn ensure_selected_visible(&mut self) {
        let view = self.player.view();
        if view.position_of(self.selected).is_none() {
            self.selected = view.get(0).unwrap_or(0);
        }
    }

    /// Move selection to the next visible track, wrapping.
    pub fn next(&mut self) {
        let view = self.player.view();
        if view.is_empty() {
            return;
        }
        let pos = self.selected_position().map_or(0, |p| (p + 1) % view.len());
        self.selected = view.get(pos).unwrap_or(self.selected);
    }

    /// Move selection to the previous visible track, wrapping.
    pub fn prev(&mut self) {
        let view = self.player.view();
        if view.is_empty() {
            return;
        }
        let pos = match self.selected_position() {
            Some(0) | None => view.len() - 1,
            Some(p) => p - 1,
        };
        self.selected = view.get(pos).unwrap_or(self.selected);
    }

    pub fn select_first(&mut self) {
        if let Some(first) = self.player.view().get(0) {
            self.selected = first;
        }
    }

    pub fn select_last(&mut self) {
        let view = self.player.view();
        if let Some(last) = view.len().checked_sub(1).and_then(|i| view.get(i)) {
            self.selected = last;
        }
    }

    fn report(&mut self, result: Result<(), PlaybackError>) {
        match result {
            Ok(()) => self.notice = None,
            Err(e) => {
                debug!("command reported: {e}");
                self.notice = Some(e.to_string());
            }
        }
    }
}
