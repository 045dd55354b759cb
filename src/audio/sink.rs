//! Utilities for opening tracks and creating `rodio` sinks.
//!
//! Opening and decoding happen on the caller's thread so that failures are
//! reported synchronously from `load`.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rodio::{Decoder, OutputStream, Sink, Source};

use crate::library::path_from_file_uri;
use crate::playback::BackendError;

use super::types::LoadedTrack;

pub(super) type TrackSource = Decoder<BufReader<File>>;

/// Open and decode the file behind `path`.
pub(super) fn open_source(path: &Path) -> Result<TrackSource, BackendError> {
    let file = File::open(path).map_err(|source| BackendError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Decoder::new(BufReader::new(file)).map_err(|e| BackendError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Resolve a `file://` URI and decode the file it names.
pub(super) fn load_uri(uri: &str, generation: u64) -> Result<LoadedTrack, BackendError> {
    let path: PathBuf =
        path_from_file_uri(uri).ok_or_else(|| BackendError::InvalidUri(uri.to_string()))?;
    let source = open_source(&path)?;
    let duration = source.total_duration();
    Ok(LoadedTrack {
        path,
        source,
        duration,
        generation,
    })
}

/// Create a paused `Sink` for `source`.
pub(super) fn paused_sink<S>(stream: &OutputStream, source: S) -> Sink
where
    S: Source + Send + 'static,
{
    let sink = Sink::connect_new(stream.mixer());
    sink.append(source);
    sink.pause();
    sink
}

/// Rebuild a paused sink for `path` that starts at `start_at`. Used when the
/// decoder cannot seek in place.
pub(super) fn paused_sink_at(
    stream: &OutputStream,
    path: &Path,
    start_at: Duration,
) -> Result<Sink, BackendError> {
    // `skip_duration` is our fallback seeking primitive; even Duration::ZERO is fine.
    let source = open_source(path)?.skip_duration(start_at);
    Ok(paused_sink(stream, source))
}

/// Volume levels for a fade in `steps` steps, ending at 1.0.
pub(super) fn fade_levels(steps: u64) -> impl Iterator<Item = f32> {
    let steps = steps.max(1);
    (1..=steps).map(move |step| step as f32 / steps as f32)
}
