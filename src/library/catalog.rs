use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::model::{Metadata, Track};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog index {index} out of range (count {count})")]
    OutOfRange { index: usize, count: usize },
    #[error("no catalog entry for {0:?}")]
    UnknownTrack(PathBuf),
}

/// Change notification for an ordered list, in list-model terms: at
/// `position`, `removed` entries were replaced by `added` new ones.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ItemsChanged {
    pub position: usize,
    pub removed: usize,
    pub added: usize,
}

/// Append-only ordered store of every discovered track.
///
/// Indices are stable for the lifetime of the catalog.
#[derive(Debug, Default)]
pub struct Catalog {
    tracks: Vec<Track>,
    by_path: HashMap<PathBuf, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `track` at the end and return the change to publish.
    pub fn append(&mut self, track: Track) -> ItemsChanged {
        let position = self.tracks.len();
        self.by_path.entry(track.path.clone()).or_insert(position);
        self.tracks.push(track);
        ItemsChanged {
            position,
            removed: 0,
            added: 1,
        }
    }

    pub fn get(&self, index: usize) -> Result<&Track, CatalogError> {
        self.tracks.get(index).ok_or(CatalogError::OutOfRange {
            index,
            count: self.tracks.len(),
        })
    }

    pub fn count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.tracks.iter()
    }

    pub fn position_of(&self, path: &Path) -> Option<usize> {
        self.by_path.get(path).copied()
    }

    /// Apply resolved metadata to the record identified by `path`.
    ///
    /// Returns the record's index, and whether the update took effect (a record
    /// is only ever resolved once).
    pub fn apply_metadata(
        &mut self,
        path: &Path,
        metadata: Metadata,
    ) -> Result<(usize, bool), CatalogError> {
        let index = self
            .position_of(path)
            .ok_or_else(|| CatalogError::UnknownTrack(path.to_path_buf()))?;
        let applied = self.tracks[index].apply_metadata(metadata);
        Ok((index, applied))
    }
}
