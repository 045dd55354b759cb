use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::config;
use crate::library::ScanEvent;
use crate::playback::MediaBackend;
use crate::ui;

/// Scan messages applied per iteration, so a large library does not starve input.
const SCAN_BATCH: usize = 512;

/// State tracked by the runtime event loop across iterations.
pub struct EventLoopState {
    /// Internal two-key prefix state used for `gg` handling.
    pub pending_gg: bool,
    pending_zz: bool,
    last_poll: Option<Instant>,
    scan_open: bool,
}

impl EventLoopState {
    pub fn new() -> Self {
        Self {
            pending_gg: false,
            pending_zz: false,
            last_poll: None,
            scan_open: true,
        }
    }

    fn clear_prefixes(&mut self) {
        self.pending_gg = false;
        self.pending_zz = false;
    }
}

/// Main terminal event loop: applies scan results, pumps backend events,
/// polls the position, draws and handles input. Returns `Ok(())` when
/// shutdown is requested.
pub fn run<B: MediaBackend>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    settings: &config::Settings,
    app: &mut App<B>,
    scan_rx: &Receiver<ScanEvent>,
    state: &mut EventLoopState,
) -> Result<(), Box<dyn std::error::Error>> {
    let poll_every = Duration::from_millis(settings.controls.position_poll_ms);
    let scrub_commit = Duration::from_millis(settings.controls.scrub_commit_ms);

    loop {
        if state.scan_open {
            drain_scan(app, scan_rx, state);
        }

        app.pump_backend();
        app.sync();

        let now = Instant::now();
        if app.scrub_expired(now, scrub_commit) {
            app.commit_scrub();
        }
        if state.last_poll.is_none_or(|t| now.duration_since(t) >= poll_every) {
            app.poll_position();
            state.last_poll = Some(now);
        }

        terminal.draw(|f| ui::draw(f, app, &settings.ui, &settings.controls))?;

        if event::poll(Duration::from_millis(50))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                if handle_key_event(key, settings, app, state) {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn drain_scan<B: MediaBackend>(app: &mut App<B>, scan_rx: &Receiver<ScanEvent>, state: &mut EventLoopState) {
    for _ in 0..SCAN_BATCH {
        match scan_rx.try_recv() {
            Ok(event) => app.ingest(event),
            Err(TryRecvError::Empty) => break,
            Err(TryRecvError::Disconnected) => {
                state.scan_open = false;
                break;
            }
        }
    }
}

fn handle_key_event<B: MediaBackend>(
    key: KeyEvent,
    settings: &config::Settings,
    app: &mut App<B>,
    state: &mut EventLoopState,
) -> bool {
    if app.filter_mode {
        state.clear_prefixes();
        match key.code {
            KeyCode::Esc => app.clear_filter(),
            KeyCode::Backspace => app.pop_filter_char(),
            KeyCode::Char('j') | KeyCode::Char('n') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.next();
            }
            KeyCode::Char('k') | KeyCode::Char('p') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                app.prev();
            }
            KeyCode::Down => app.next(),
            KeyCode::Up => app.prev(),
            KeyCode::Char(c) => {
                if !c.is_control() {
                    app.push_filter_char(c);
                }
            }
            KeyCode::Enter => {
                if app.has_tracks() {
                    app.exit_filter_mode();
                    app.play_selected();
                }
            }
            _ => {}
        }

        return false;
    }

    let seek_step = |large: bool| -> i64 {
        let secs = if large {
            settings.controls.seek_seconds_large
        } else {
            settings.controls.seek_seconds
        };
        secs.min(i64::MAX as u64) as i64
    };
    let scrub_step = i32::from(settings.controls.scrub_step_percent);

    match key.code {
        KeyCode::Char('z') => {
            state.pending_gg = false;
            if state.pending_zz {
                state.pending_zz = false;
                app.jump_to_now_playing();
            } else {
                state.pending_zz = true;
            }
            return false;
        }
        KeyCode::Char('g') => {
            state.pending_zz = false;
            if state.pending_gg {
                state.pending_gg = false;
                app.follow_playback_off();
                app.select_first();
            } else {
                state.pending_gg = true;
            }
            return false;
        }
        _ => state.clear_prefixes(),
    }

    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if app.scrub.is_some() {
                app.cancel_scrub();
            } else if !app.filter_query.is_empty() {
                app.clear_filter();
            }
        }
        KeyCode::Char('/') => app.enter_filter_mode(),
        KeyCode::Char('s') => app.toggle_shuffle(),
        KeyCode::Char('r') => app.toggle_repeat_one(),
        KeyCode::Char('G') => {
            app.follow_playback_off();
            app.select_last();
        }
        KeyCode::Char('j') | KeyCode::Down => {
            app.follow_playback_off();
            app.next();
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.follow_playback_off();
            app.prev();
        }
        KeyCode::Enter => {
            if app.scrub.is_some() {
                app.commit_scrub();
            } else if app.player.now_playing_index() != Some(app.selected) || app.is_idle() {
                app.play_selected();
            }
        }
        KeyCode::Char('p') | KeyCode::Char(' ') => app.toggle_play_pause(),
        KeyCode::Char('l') | KeyCode::Char('n') => app.next_track(),
        KeyCode::Char('h') | KeyCode::Char('N') => app.prev_track(),
        KeyCode::Right => app.seek_by(seek_step(key.modifiers.contains(KeyModifiers::SHIFT))),
        KeyCode::Left => app.seek_by(-seek_step(key.modifiers.contains(KeyModifiers::SHIFT))),
        KeyCode::Char(']') => app.scrub_by(scrub_step, Instant::now()),
        KeyCode::Char('[') => app.scrub_by(-scrub_step, Instant::now()),
        KeyCode::Char('K') => app.toggle_metadata_window(),
        _ => {}
    }

    false
}
