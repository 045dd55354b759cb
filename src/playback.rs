//! Play order and transport state machine.
//!
//! `PlayOrder` decides which visible track comes next; `PlaybackController`
//! drives a `MediaBackend` and owns what is currently loaded.

mod backend;
mod controller;
mod error;
mod order;

pub use backend::{BackendError, BackendEvent, BackendState, MediaBackend};
pub use controller::{PlaybackController, PlayerState, Session, SessionEvent};
pub use error::PlaybackError;
pub use order::{PlayOrder, PlayOrderError};

#[cfg(test)]
pub(crate) mod fake;
