use std::fs::{self, OpenOptions};

use env_logger::{Env, Target};

use crate::config::{self, LoggingSettings};

/// Route `log` output to a file; the terminal belongs to the UI.
///
/// `RUST_LOG` wins over `[logging].level`. When no file can be opened,
/// logging stays disabled.
pub fn init(settings: &LoggingSettings) {
    let Some(path) = settings.file.clone().or_else(config::default_log_path) else {
        eprintln!("hyper-music: logging disabled, no log file location");
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = fs::create_dir_all(dir);
    }
    let file = match OpenOptions::new().create(true).append(true).open(&path) {
        Ok(file) => file,
        Err(e) => {
            eprintln!("hyper-music: logging disabled, cannot open {}: {e}", path.display());
            return;
        }
    };

    let env = Env::default().default_filter_or(settings.level.as_str());
    let result = env_logger::Builder::from_env(env)
        .format_timestamp_millis()
        .target(Target::Pipe(Box::new(file)))
        .try_init();
    if let Err(e) = result {
        eprintln!("hyper-music: logging disabled: {e}");
    }
}
