use std::{env, path::PathBuf};

use super::schema::Settings;

const APP_DIR: &str = "hyper-music";

/// Configuration loading helpers.
///
/// `Settings::load` tries environment variables first (prefix `HYPERMUSIC__`), then an
/// optional config file and falls back to struct defaults.
impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("HYPERMUSIC")
                .separator("__")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self
            .library
            .extensions
            .iter()
            .all(|e| e.trim().trim_start_matches('.').is_empty())
        {
            return Err("library.extensions must name at least one extension".to_string());
        }
        if self.metadata.timeout_ms == 0 {
            return Err("metadata.timeout_ms must be >= 1".to_string());
        }
        if self.audio.crossfade_steps == 0 {
            return Err("audio.crossfade_steps must be >= 1".to_string());
        }
        if self.controls.position_poll_ms == 0 {
            return Err("controls.position_poll_ms must be >= 1".to_string());
        }
        if !(1..=50).contains(&self.controls.scrub_step_percent) {
            return Err("controls.scrub_step_percent must be between 1 and 50".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `HYPERMUSIC_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("HYPERMUSIC_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// Compute the default config path under `$XDG_CONFIG_HOME/hyper-music/config.toml`
/// or `~/.config/hyper-music/config.toml` when `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    let config_home = if let Some(xdg) = env::var_os("XDG_CONFIG_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".config"))
    };

    config_home.map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Compute the default log file under `$XDG_STATE_HOME/hyper-music/`
/// or `~/.local/state/hyper-music/`.
pub fn default_log_path() -> Option<PathBuf> {
    let state_home = if let Some(xdg) = env::var_os("XDG_STATE_HOME") {
        Some(PathBuf::from(xdg))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(".local").join("state"))
    };

    state_home.map(|d| d.join(APP_DIR).join("hyper-music.log"))
}
