//! Audio output built on `rodio`.
//!
//! `RodioBackend` implements `MediaBackend`: files are opened and decoded on
//! the caller's thread, then handed to an audio thread that owns the output
//! stream, crossfades between tracks and reports end-of-stream.

mod player;
mod sink;
mod thread;
mod types;

pub use player::RodioBackend;
