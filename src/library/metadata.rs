//! Per-track metadata probing.
//!
//! A probe reads tags, duration and an embedded cover image with `lofty`.
//! Probes run on a helper thread so the caller can bound them with a timeout;
//! a probe that overruns is abandoned and its late result discarded.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use image::imageops::FilterType;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::*;
use log::{debug, warn};
use thiserror::Error;

use crate::config::MetadataSettings;

use super::model::{CoverArt, Metadata};

#[derive(Debug, Error)]
pub(crate) enum ProbeError {
    #[error("failed to read tags: {0}")]
    Read(String),
    #[error("probe timed out after {0:?}")]
    TimedOut(Duration),
    #[error("probe thread exited without a result")]
    WorkerLost,
}

/// Resolves [`Metadata`] for audio files, bounded by a fixed timeout.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    timeout: Duration,
    read_cover_art: bool,
    cover_max_px: u32,
}

impl MetadataResolver {
    pub fn new(settings: &MetadataSettings) -> Self {
        Self {
            timeout: Duration::from_millis(settings.timeout_ms.max(1)),
            read_cover_art: settings.read_cover_art,
            cover_max_px: settings.cover_max_px.max(1),
        }
    }

    /// Probe `path`. Failure and timeout both yield `None`: the track keeps
    /// its defaults and the caller posts nothing.
    pub fn resolve(&self, path: &Path) -> Option<Metadata> {
        let (read_cover, max_px) = (self.read_cover_art, self.cover_max_px);
        match run_with_timeout(path.to_path_buf(), self.timeout, move |p| {
            probe(&p, read_cover, max_px)
        }) {
            Ok(metadata) => Some(metadata),
            Err(ProbeError::TimedOut(after)) => {
                warn!("metadata probe for {} timed out after {:?}", path.display(), after);
                None
            }
            Err(e) => {
                debug!("metadata probe for {} failed: {e}", path.display());
                None
            }
        }
    }
}

/// Run `job` on a helper thread and wait at most `timeout` for its result.
pub(crate) fn run_with_timeout<F>(
    path: PathBuf,
    timeout: Duration,
    job: F,
) -> Result<Metadata, ProbeError>
where
    F: FnOnce(PathBuf) -> Result<Metadata, ProbeError> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);
    let spawned = thread::Builder::new()
        .name("metadata-probe".to_string())
        .spawn(move || {
            // The receiver is gone if we overran; nothing to report then.
            let _ = tx.send(job(path));
        });
    if let Err(e) = spawned {
        debug!("failed to spawn probe thread: {e}");
        return Err(ProbeError::WorkerLost);
    }

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ProbeError::TimedOut(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => Err(ProbeError::WorkerLost),
    }
}

fn tag_text(value: Option<std::borrow::Cow<'_, str>>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

/// Blocking probe of one file.
pub(crate) fn probe(path: &Path, read_cover: bool, cover_max_px: u32) -> Result<Metadata, ProbeError> {
    let tagged = lofty::read_from_path(path).map_err(|e| ProbeError::Read(e.to_string()))?;

    let mut metadata = Metadata {
        duration: tagged.properties().duration(),
        ..Metadata::default()
    };

    if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
        metadata.title = tag_text(tag.title());
        metadata.artist = tag_text(tag.artist());
        metadata.album = tag_text(tag.album());

        if read_cover {
            metadata.cover = pick_picture(tag.pictures())
                .and_then(|pic| decode_cover(pic, cover_max_px, path));
        }
    }

    Ok(metadata)
}

/// Prefer the front cover, fall back to whatever picture comes first.
fn pick_picture(pictures: &[Picture]) -> Option<&Picture> {
    pictures
        .iter()
        .find(|p| p.pic_type() == PictureType::CoverFront)
        .or_else(|| pictures.first())
}

fn decode_cover(pic: &Picture, max_px: u32, path: &Path) -> Option<CoverArt> {
    decode_cover_bytes(pic.data(), max_px)
        .map(|image| CoverArt {
            image,
            mime_type: pic.mime_type().map(|m| m.as_str().to_string()),
        })
        .or_else(|| {
            debug!("cover art in {} could not be decoded", path.display());
            None
        })
}

/// Decode an encoded image and shrink it to fit within `max_px` on both sides.
pub(crate) fn decode_cover_bytes(bytes: &[u8], max_px: u32) -> Option<image::RgbaImage> {
    let img = image::load_from_memory(bytes).ok()?;
    let img = if img.width() > max_px || img.height() > max_px {
        img.resize(max_px, max_px, FilterType::Triangle)
    } else {
        img
    };
    Some(img.to_rgba8())
}
