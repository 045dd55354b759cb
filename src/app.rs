//! Application module: exposes the app model used by the TUI and runtime.
//!
//! The `App` model lives in `app::model` and holds the player together with
//! selection, filter editing and scrub state.

mod model;

pub use model::*;
