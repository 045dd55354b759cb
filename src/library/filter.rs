use super::catalog::{Catalog, ItemsChanged};
use super::model::Track;

/// Case-insensitive substring match over title, artist and album.
///
/// `needle_lower` must already be lower-cased.
pub fn matches(track: &Track, needle_lower: &str) -> bool {
    if needle_lower.is_empty() {
        return true;
    }
    [&track.title, &track.artist, &track.album]
        .into_iter()
        .any(|field| field.to_lowercase().contains(needle_lower))
}

/// Projection of the catalog through the active search query: the catalog
/// indices that currently match, in catalog order.
#[derive(Debug, Default, Clone)]
pub struct FilteredView {
    query: String,
    needle: String,
    indices: Vec<usize>,
}

impl FilteredView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    /// Replace the query and recompute the view from scratch.
    pub fn apply(&mut self, catalog: &Catalog, query: &str) -> ItemsChanged {
        self.query = query.to_string();
        self.needle = query.to_lowercase();
        self.recompute(catalog)
    }

    /// Recompute the view for the current query. Returns `None` when the
    /// membership did not change.
    pub fn refresh(&mut self, catalog: &Catalog) -> Option<ItemsChanged> {
        let before = self.indices.clone();
        let change = self.recompute(catalog);
        (before != self.indices).then_some(change)
    }

    /// Admit a freshly appended catalog entry if it matches.
    pub fn admit(&mut self, catalog: &Catalog, catalog_index: usize) -> Option<ItemsChanged> {
        let track = catalog.get(catalog_index).ok()?;
        if !matches(track, &self.needle) {
            return None;
        }
        let position = self.indices.len();
        self.indices.push(catalog_index);
        Some(ItemsChanged {
            position,
            removed: 0,
            added: 1,
        })
    }

    fn recompute(&mut self, catalog: &Catalog) -> ItemsChanged {
        let removed = self.indices.len();
        let needle = self.needle.as_str();
        self.indices = catalog
            .iter()
            .enumerate()
            .filter(|(_, t)| matches(t, needle))
            .map(|(i, _)| i)
            .collect();
        ItemsChanged {
            position: 0,
            removed,
            added: self.indices.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Catalog index at view position `view_index`.
    pub fn get(&self, view_index: usize) -> Option<usize> {
        self.indices.get(view_index).copied()
    }

    /// View position of the catalog entry `catalog_index`, if visible.
    pub fn position_of(&self, catalog_index: usize) -> Option<usize> {
        // Indices are kept in ascending catalog order.
        self.indices.binary_search(&catalog_index).ok()
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}
