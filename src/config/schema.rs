use std::path::PathBuf;

use serde::Deserialize;

/// Top-level application settings loaded from `config.toml`.
///
/// File format: TOML
/// Default path (Linux/XDG): `$XDG_CONFIG_HOME/hyper-music/config.toml` or `~/.config/hyper-music/config.toml`
///
/// Precedence (highest wins):
/// 1) Environment variables (prefix `HYPERMUSIC__`, `__` as nested separator)
/// 2) Config file (if present)
/// 3) Struct defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub library: LibrarySettings,
    pub metadata: MetadataSettings,
    pub playback: PlaybackSettings,
    pub audio: AudioSettings,
    pub controls: ControlsSettings,
    pub ui: UiSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// File extensions to treat as audio (case-insensitive, without dot).
    pub extensions: Vec<String>,
    /// Whether to include hidden files/directories (dotfiles).
    pub include_hidden: bool,
    /// Whether to follow symlinks during scanning.
    pub follow_links: bool,
    /// Optional cap on directory recursion depth (the root is depth 0).
    pub max_depth: Option<usize>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            extensions: [
                "mp3", "flac", "ogg", "oga", "opus", "m4a", "aac", "wav", "wma", "alac",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            include_hidden: false,
            follow_links: true,
            max_depth: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetadataSettings {
    /// Upper bound for probing a single file (milliseconds).
    pub timeout_ms: u64,
    /// Probe threads. 0 probes inline on the scan worker.
    pub workers: usize,
    /// Whether to decode embedded cover art.
    pub read_cover_art: bool,
    /// Decoded covers are downscaled to fit this many pixels per side.
    pub cover_max_px: u32,
}

impl Default for MetadataSettings {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            workers: 0,
            read_cover_art: true,
            cover_max_px: 256,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Whether shuffle starts enabled.
    pub shuffle: bool,
    /// Whether repeat-one starts enabled.
    pub repeat_one: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Crossfade duration when switching tracks (milliseconds).
    /// Set to 0 to disable crossfade.
    pub crossfade_ms: u64,
    /// Number of steps used to fade volumes (higher = smoother, more CPU).
    pub crossfade_steps: u64,
    /// Fade-out duration when quitting (milliseconds).
    /// Set to 0 to stop immediately.
    pub quit_fade_out_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            crossfade_ms: 250,
            crossfade_steps: 10,
            quit_fade_out_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControlsSettings {
    /// Seconds to seek with the arrow keys.
    pub seek_seconds: u64,
    /// Seconds to seek with shift + arrow keys.
    pub seek_seconds_large: u64,
    /// Percentage of the track moved per scrub key press.
    pub scrub_step_percent: u8,
    /// A scrub is committed after this long without scrub input (milliseconds).
    pub scrub_commit_ms: u64,
    /// Position polling period for the progress bar (milliseconds).
    pub position_poll_ms: u64,
}

impl Default for ControlsSettings {
    fn default() -> Self {
        Self {
            seek_seconds: 5,
            seek_seconds_large: 15,
            scrub_step_percent: 2,
            scrub_commit_ms: 400,
            position_poll_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// The text rendered inside the top header box.
    pub header_text: String,

    /// Which track fields make up a row in the track list.
    ///
    /// Example: ["artist", "title"] -> "Artist - Title"
    pub list_fields: Vec<TrackDisplayField>,
    /// Separator used to join `list_fields`.
    pub list_separator: String,

    /// Which track fields to show in the status "Song:" line, and in what order.
    pub now_playing_track_fields: Vec<TrackDisplayField>,
    /// Separator used to join `now_playing_track_fields`.
    pub now_playing_track_separator: String,

    /// Which time fields to show for the status line, and in what order.
    ///
    /// Example: ["elapsed", "total", "remaining"]
    pub now_playing_time_fields: Vec<TimeField>,
    /// Separator used to join `now_playing_time_fields`.
    pub now_playing_time_separator: String,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            header_text: " ~ hyper music ~ ".to_string(),
            list_fields: vec![TrackDisplayField::Artist, TrackDisplayField::Title],
            list_separator: " - ".to_string(),
            now_playing_track_fields: vec![TrackDisplayField::Display],
            now_playing_track_separator: " - ".to_string(),
            now_playing_time_fields: vec![TimeField::Elapsed, TimeField::Total, TimeField::Remaining],
            now_playing_time_separator: " / ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is not set (e.g. "info", "hypermusic=debug").
    pub level: String,
    /// Log file. Defaults to `$XDG_STATE_HOME/hyper-music/hyper-music.log`.
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimeField {
    Elapsed,
    Total,
    Remaining,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackDisplayField {
    /// "Artist - Title", or the file name for untagged tracks.
    Display,
    Title,
    Artist,
    Album,
    Filename,
    Path,
}
