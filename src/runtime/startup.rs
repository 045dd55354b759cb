use std::env;
use std::path::PathBuf;

use crate::config;
use crate::player::PlayerOptions;

/// Library root: the first argument, else the working directory.
pub fn library_root() -> PathBuf {
    env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("Music"))
}

/// Initial transport flags from `[playback]`.
pub fn player_options(settings: &config::Settings) -> PlayerOptions {
    PlayerOptions {
        shuffle: settings.playback.shuffle,
        repeat_one: settings.playback.repeat_one,
        seed: None,
    }
}
