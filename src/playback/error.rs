use thiserror::Error;

use super::backend::BackendError;
use super::order::PlayOrderError;

/// Conditions reported by transport commands. None of these are fatal:
/// the command is a no-op and the condition is shown to the user.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("nothing visible to play")]
    EmptyOrder,
    #[error("position {index} is outside the visible list ({len} tracks)")]
    OutOfRange { index: usize, len: usize },
    #[error("nothing is loaded")]
    NothingLoaded,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<PlayOrderError> for PlaybackError {
    fn from(e: PlayOrderError) -> Self {
        match e {
            PlayOrderError::EmptyOrder => PlaybackError::EmptyOrder,
        }
    }
}
