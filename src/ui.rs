//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Padding, Paragraph, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Duration};

use crate::app::App;
use crate::config::{ControlsSettings, TimeField, UiSettings};
use crate::library::{Track, display_from_fields, subtitle};
use crate::playback::{MediaBackend, PlayerState};

static CONTROLS_MAP: LazyLock<BTreeMap<String, String>> = LazyLock::new(|| {
    let mut map: BTreeMap<String, String> = BTreeMap::new();
    map.insert("j/k".to_string(), "up/down".to_string());
    map.insert("gg/G".to_string(), "top/bottom".to_string());
    map.insert("enter".to_string(), "play selected song".to_string());
    map.insert("space/p".to_string(), "play/pause".to_string());
    map.insert("h/l".to_string(), "prev/next song".to_string());
    // Seek and scrub steps are filled dynamically from config.
    map.insert("/".to_string(), "filter".to_string());
    map.insert("s".to_string(), "shuffle".to_string());
    map.insert("r".to_string(), "repeat one".to_string());
    map.insert("K".to_string(), "metadata".to_string());
    map.insert("zz".to_string(), "now playing".to_string());
    map.insert("q".to_string(), "quit".to_string());
    map
});

/// Render the controls help text, incorporating seek and scrub steps.
fn controls_text(controls: &ControlsSettings) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "left/right", "[/]", "enter", "space/p", "gg/G", "zz", "K", "/", "s", "r",
        "q",
    ];
    order
        .iter()
        .filter_map(|k| match *k {
            "left/right" => Some(format!(
                "[left/right] seek -/+{}s (shift {}s)",
                controls.seek_seconds, controls.seek_seconds_large
            )),
            "[/]" => Some(format!(
                "[[/]] scrub -/+{}%",
                controls.scrub_step_percent
            )),
            _ => CONTROLS_MAP.get(*k).map(|v| format!("[{}] {}", k, v)),
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

/// Format a `Duration` as `MM:SS`.
fn format_mmss(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Build the now-playing time text (elapsed/total/remaining) per `UiSettings`.
fn now_playing_time_text(
    elapsed: Duration,
    total: Option<Duration>,
    ui: &UiSettings,
) -> Option<String> {
    if ui.now_playing_time_fields.is_empty() {
        return None;
    }

    let mut parts: Vec<String> = Vec::new();
    for f in &ui.now_playing_time_fields {
        match f {
            TimeField::Elapsed => parts.push(format_mmss(elapsed)),
            TimeField::Total => {
                if let Some(t) = total {
                    parts.push(format_mmss(t));
                }
            }
            TimeField::Remaining => {
                if let Some(t) = total {
                    let rem = t.saturating_sub(elapsed);
                    parts.push(format!("-{}", format_mmss(rem)));
                }
            }
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join(&ui.now_playing_time_separator))
    }
}

/// Compute a centered rectangle with given size constrained to `r`.
fn centered_rect_sized(mut width: u16, mut height: u16, r: Rect) -> Rect {
    // Keep the popup smaller and avoid covering the entire UI.
    width = width.min(r.width.saturating_sub(2)).max(10);
    height = height.min(r.height.saturating_sub(2)).max(5);

    let x = r.x + (r.width.saturating_sub(width) / 2);
    let y = r.y + (r.height.saturating_sub(height) / 2);
    Rect {
        x,
        y,
        width,
        height,
    }
}

/// Format a duration, rounding up partial seconds, showing total seconds.
/// Zero means "not resolved".
fn format_duration_mmss_ceil(d: Duration) -> String {
    if d.is_zero() {
        return "-".to_string();
    }

    let mut total_secs = d.as_secs();
    if d.subsec_nanos() > 0 {
        total_secs = total_secs.saturating_add(1);
    }

    let minutes = total_secs / 60;
    let seconds = total_secs % 60;
    format!("{}:{:02} ({}s)", minutes, seconds, total_secs)
}

fn or_dash(s: &str) -> &str {
    if s.trim().is_empty() { "-" } else { s }
}

/// Scan progress for the status box.
fn scan_text<B: MediaBackend>(app: &App<B>) -> String {
    match &app.scan.finished {
        Some(summary) if summary.cancelled => {
            format!("SCAN: cancelled at {}", app.scan.discovered)
        }
        Some(summary) => format!(
            "SCAN: {} tracks in {:.1}s",
            summary.files,
            summary.elapsed.as_secs_f64()
        ),
        None => format!(
            "SCAN: {} found, {} tagged…",
            app.scan.discovered, app.scan.resolved
        ),
    }
}

fn metadata_text(track: &Track) -> String {
    let cover = match &track.cover {
        Some(c) => format!("{}x{}", c.width(), c.height()),
        None => "-".to_string(),
    };
    let tags = if track.is_resolved() { "read" } else { "pending" };
    format!(
        "Title: {}\nArtist: {}\nAlbum: {}\nDuration: {}\nCover: {}\nTags: {}\nPath: {}",
        or_dash(&track.title),
        or_dash(&track.artist),
        or_dash(&track.album),
        format_duration_mmss_ceil(track.duration),
        cover,
        tags,
        track.path.display()
    )
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw<B: MediaBackend>(
    frame: &mut Frame,
    app: &App<B>,
    ui_settings: &UiSettings,
    controls_settings: &ControlsSettings,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());
    // Header
    let header = Paragraph::new(ui_settings.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" hyper music ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let player = &app.player;

    // Status box
    let status = {
        let mut parts: Vec<String> = Vec::new();

        parts.push(format!(" {}", scan_text(app)));

        // cursor mode
        if app.follow_playback {
            parts.push("CURSOR: Follow".to_string());
        } else {
            parts.push("CURSOR: Free-roam".to_string());
        }

        // filter
        let q = app.filter_query.trim();
        if app.filter_mode || !q.is_empty() {
            let mut filter_part = String::from("FILTER:");
            if !q.is_empty() {
                filter_part.push(' ');
                filter_part.push_str(q);
            }
            filter_part.push_str(&format!(" ({} shown)", player.view().len()));
            parts.push(filter_part);
        }

        // playback info
        match player.now_playing() {
            Some(track) => {
                let song = display_from_fields(
                    track,
                    &ui_settings.now_playing_track_fields,
                    &ui_settings.now_playing_track_separator,
                );
                let time =
                    now_playing_time_text(app.progress.elapsed, app.progress.total, ui_settings);
                if let Some(time) = time {
                    parts.push(format!("Song: {} [{}]", song, time));
                } else {
                    parts.push(format!("Song: {}", song));
                }
                let state = match player.state() {
                    PlayerState::Playing => "Playing",
                    PlayerState::Paused => "Paused",
                    PlayerState::Idle => "Stopped",
                };
                parts.push(state.to_string());
            }
            None => parts.push("Stopped".to_string()),
        }

        parts.push(format!(
            "Shuffle: {}",
            if player.shuffle() { "ON" } else { "OFF" }
        ));
        parts.push(format!(
            "Repeat-one: {}",
            if player.repeat_one() { "ON" } else { "OFF" }
        ));

        // current dir
        if let Some(dir) = &app.current_dir {
            parts.push(format!("Dir: {}", dir));
        }

        if let Some(notice) = &app.notice {
            parts.push(format!("! {}", notice));
        }

        parts.join(" • ")
    };

    let status_par = Paragraph::new(status)
        .block(
            Block::bordered()
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                })
                .title(" status "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    // Main list
    {
        let view = player.view();
        let catalog = player.catalog();
        let playing = player.now_playing_index();

        // Center the selected item when possible by creating a visible window.
        // Important: only build ListItems for the visible window (avoid allocating the entire list).
        let total = view.len();
        let list_height = chunks[2].height.saturating_sub(2) as usize;
        let sel_pos = app.selected_position().unwrap_or(0);
        let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
            (0, total, sel_pos)
        } else {
            let half = list_height / 2;
            let mut start = sel_pos.saturating_sub(half);
            if start + list_height > total {
                start = total - list_height;
            }
            (start, start + list_height, sel_pos - start)
        };

        let visible_items: Vec<ListItem> = view.indices()[start..end]
            .iter()
            .filter_map(|&i| {
                let track = catalog.get(i).ok()?;
                let text = display_from_fields(
                    track,
                    &ui_settings.list_fields,
                    &ui_settings.list_separator,
                );
                let item = ListItem::new(text);
                Some(if playing == Some(i) { item.bold() } else { item })
            })
            .collect();

        let title = if total == catalog.count() {
            format!(" tracks ({}) ", total)
        } else {
            format!(" tracks ({}/{}) ", total, catalog.count())
        };
        let list = List::new(visible_items)
            .block(Block::default().borders(Borders::ALL).title(title))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ratatui::widgets::ListState::default();
        if total > 0 {
            state.select(Some(selected_pos_in_visible));
        }
        frame.render_stateful_widget(list, chunks[2], &mut state);
    }

    // Overlay metadata popup (keeps list visible under it)
    if app.metadata_window {
        // Keep the popup inside the list area so it doesn't cover header/status/footer.
        let list_area = chunks[2];
        let popup_area = centered_rect_sized(72, 10, list_area);
        frame.render_widget(Clear, popup_area);

        let meta = match app.selected_track() {
            Some(track) => metadata_text(track),
            None => "No track selected".to_string(),
        };
        let meta_paragraph = Paragraph::new(meta)
            .block(
                Block::default()
                    .padding(Padding {
                        left: 1,
                        right: 0,
                        top: 0,
                        bottom: 0,
                    })
                    .borders(Borders::ALL)
                    .title(" metadata (K closes) "),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(meta_paragraph, popup_area);
    }

    // Progress bar
    {
        let ratio = app.display_fraction().unwrap_or(0.0).clamp(0.0, 1.0);
        let label = match player.now_playing() {
            Some(track) if app.scrub.is_some() => {
                format!("scrub {:.0}% • {}", ratio * 100.0, subtitle(track))
            }
            Some(track) => subtitle(track),
            None => String::new(),
        };
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title(" progress "))
            .ratio(ratio)
            .label(label);
        frame.render_widget(gauge, chunks[3]);
    }

    let footer_text = controls_text(controls_settings);
    let footer = Paragraph::new(footer_text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" controls ")
                .padding(Padding {
                    left: 1,
                    right: 0,
                    top: 0,
                    bottom: 0,
                }),
        )
        .wrap(Wrap { trim: true });

    frame.render_widget(footer, chunks[4]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_text_follows_configured_fields() {
        let ui = UiSettings::default();
        let text = now_playing_time_text(
            Duration::from_secs(65),
            Some(Duration::from_secs(200)),
            &ui,
        );
        assert_eq!(text.as_deref(), Some("01:05 / 03:20 / -02:15"));

        let unknown = now_playing_time_text(Duration::from_secs(5), None, &ui);
        assert_eq!(unknown.as_deref(), Some("00:05"));
    }

    #[test]
    fn unresolved_duration_renders_as_dash() {
        assert_eq!(format_duration_mmss_ceil(Duration::ZERO), "-");
        assert_eq!(
            format_duration_mmss_ceil(Duration::from_millis(61_200)),
            "1:02 (62s)"
        );
    }

    #[test]
    fn metadata_popup_reports_missing_fields() {
        let track = Track::new("/m/x.flac");
        let text = metadata_text(&track);
        assert!(text.starts_with("Title: -\nArtist: -\nAlbum: -\nDuration: -\nCover: -\nTags: pending"));
    }

    #[test]
    fn controls_text_uses_configured_steps() {
        let text = controls_text(&ControlsSettings::default());
        assert!(text.contains("seek -/+5s (shift 15s)"));
        assert!(text.contains("scrub -/+2%"));
    }
}
