use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to open {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
    #[error("not a local file uri: {0}")]
    InvalidUri(String),
    #[error("no audio output: {0}")]
    NoOutput(String),
    #[error("audio output is gone")]
    Disconnected,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendState {
    Stopped,
    Playing,
    Paused,
}

/// Events reported by the backend, drained by the control loop.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BackendEvent {
    /// The stream from load `generation` played to its end.
    EndOfStream { generation: u64 },
    StateChanged(BackendState),
}

/// Decode and output collaborator driven by the playback controller.
///
/// `load` replaces whatever was loaded and leaves the new stream paused at
/// its start; `play` starts it. Every successful `load` returns a new
/// generation, and end-of-stream events name the generation they belong to.
pub trait MediaBackend {
    fn load(&mut self, uri: &str) -> Result<u64, BackendError>;
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    fn seek(&mut self, position: Duration);
    fn position(&self) -> Duration;
    /// `None` while unknown (nothing loaded, or a stream without a length).
    fn duration(&self) -> Option<Duration>;
    fn poll_event(&mut self) -> Option<BackendEvent>;

    /// Release the output. Nothing is played afterwards.
    fn shutdown(&mut self) {
        self.stop();
    }
}
