use std::path::{Path, PathBuf};
use std::time::Duration;

use image::RgbaImage;

use super::uri::file_uri;

/// Embedded cover art, decoded and downscaled once by the resolver.
#[derive(Clone, Debug)]
pub struct CoverArt {
    pub image: RgbaImage,
    pub mime_type: Option<String>,
}

impl CoverArt {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Fully resolved fields posted by the metadata resolver for one track.
///
/// Text fields use the empty string for "unknown".
#[derive(Clone, Debug, Default)]
pub struct Metadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Duration,
    pub cover: Option<CoverArt>,
}

/// One audio file in the catalog.
///
/// Identity is the absolute path. Tag fields start empty and are filled at
/// most once by [`Track::apply_metadata`].
#[derive(Clone, Debug)]
pub struct Track {
    pub path: PathBuf,
    pub uri: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: Duration,
    pub cover: Option<CoverArt>,
    resolved: bool,
}

impl Track {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let uri = file_uri(&path);
        Self {
            path,
            uri,
            title: String::new(),
            artist: String::new(),
            album: String::new(),
            duration: Duration::ZERO,
            cover: None,
            resolved: false,
        }
    }

    /// Whether a metadata update has already been applied.
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Apply resolved metadata. Only the first call has an effect; returns
    /// `false` when the record was already resolved.
    pub fn apply_metadata(&mut self, metadata: Metadata) -> bool {
        if self.resolved {
            return false;
        }
        self.title = metadata.title;
        self.artist = metadata.artist;
        self.album = metadata.album;
        self.duration = metadata.duration;
        self.cover = metadata.cover;
        self.resolved = true;
        true
    }

    /// Title, or the file name when no title tag is known.
    pub fn display_title(&self) -> String {
        if !self.title.trim().is_empty() {
            return self.title.clone();
        }
        file_name(&self.path)
    }
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
