//! Audio-related small types and handles.
//!
//! This module defines the commands sent to the audio thread and the
//! status handle it publishes for the control thread.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::sink::TrackSource;

/// A decoded file, ready to be appended to a sink.
pub(super) struct LoadedTrack {
    pub path: PathBuf,
    pub source: TrackSource,
    pub duration: Option<Duration>,
    /// Load generation reported back with `EndOfStream`.
    pub generation: u64,
}

pub(super) enum AudioCmd {
    /// Replace the current stream. The new one starts paused.
    Load(LoadedTrack),
    /// Start or resume the loaded stream, crossfading from the one it replaced.
    Play,
    Pause,
    /// Drop the loaded stream.
    Stop,
    /// Seek to an absolute position within the loaded stream.
    Seek(Duration),
    /// Quit the audio thread, optionally fading out over `fade_out_ms` milliseconds.
    Quit { fade_out_ms: u64 },
}

#[derive(Debug, Clone, Default)]
/// Runtime playback status shared with the control thread.
pub(super) struct PlaybackInfo {
    pub loaded: bool,
    pub playing: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
}

pub(super) type PlaybackHandle = Arc<Mutex<PlaybackInfo>>;
