//! Library ingestion: the track model, the append-only catalog, search
//! filtering and the background scanner with its metadata resolver.

mod catalog;
mod display;
mod filter;
mod metadata;
mod model;
mod scan;
mod uri;

pub use catalog::{Catalog, CatalogError, ItemsChanged};
pub use display::{display_from_fields, subtitle};
pub use filter::{FilteredView, matches};
pub use metadata::MetadataResolver;
pub use model::{CoverArt, Metadata, Track};
pub use scan::{CancelToken, ScanEvent, ScanHandle, ScanSummary, Scanner};
pub use uri::{file_uri, path_from_file_uri};

#[cfg(test)]
mod tests;
