//! # Catalog Search Interface
//!
//! The resolver only ever sees a catalog through [`CatalogSearch`]. Backends
//! answer with a [`CatalogResponse`], which is either a batch of raw entries
//! or an explicit `Malformed` marker for queries the upstream service cannot
//! answer. Backends never panic or return errors for bad queries; they report
//! `Malformed` and let the resolver move on.
//!
//! Shipped backends:
//!
//! - [`MpdClient`](crate::mpd_client::MpdClient) - searches the MPD database via `mpc`
//! - [`LibraryCatalog`](crate::library::LibraryCatalog) - searches a muse SQLite library
//!
//! Any `Fn(&str) -> CatalogResponse` closure is also a catalog, which keeps
//! tests and experiments short.

use serde::{Deserialize, Serialize};

/// One raw search hit, exactly as the catalog reported it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub album: Option<String>,
    /// Playable URI (MPD file path, service URI, ...).
    pub uri: Option<String>,
    /// Service-specific item id, used when no URI is available.
    pub item_id: Option<String>,
}

impl CatalogEntry {
    /// Fully populated entry.
    pub fn new(title: &str, artist: &str, album: &str, uri: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            artist: Some(artist.to_string()),
            album: Some(album.to_string()),
            uri: Some(uri.to_string()),
            item_id: None,
        }
    }
}

/// Outcome of a single catalog query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogResponse {
    /// Ranked entries, best first as far as the catalog is concerned.
    Entries(Vec<CatalogEntry>),
    /// The catalog could not produce a usable answer for this query.
    Malformed(String),
}

impl CatalogResponse {
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_))
    }
}

/// Something that can be searched for tracks.
pub trait CatalogSearch {
    fn search(&self, query: &str) -> CatalogResponse;
}

impl<F> CatalogSearch for F
where
    F: Fn(&str) -> CatalogResponse,
{
    fn search(&self, query: &str) -> CatalogResponse {
        self(query)
    }
}
