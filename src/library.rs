//! SQLite library catalog.
//!
//! Searches a muse music library (`songs` table with `path`, `artist`,
//! `album` and `title` columns) without going through MPD. Every query word
//! must appear in the title, artist or album; matching is case-insensitive
//! substring matching via `LIKE`.
//!
//! SQLite's own case folding (`LIKE`, `lower()`) covers ASCII only, so both
//! sides are folded with Rust's Unicode lowercasing instead: "ásgeir" finds
//! "Ásgeir".

use crate::catalog::{CatalogEntry, CatalogResponse, CatalogSearch};
use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::Path;

/// Upper bound on rows returned for one query.
const MAX_ROWS: usize = 200;

/// SQL name of the Unicode lowercasing function registered on the connection.
const FOLD_FUNCTION: &str = "muse_fold";

pub struct LibraryCatalog {
    conn: Connection,
}

impl LibraryCatalog {
    /// Open an existing library read-only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not an SQLite
    /// database with a `songs` table.
    pub fn open(db_path: &Path) -> Result<Self> {
        if !db_path.exists() {
            anyhow::bail!("Music library not found at {}", db_path.display());
        }

        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open music library at {}", db_path.display()))?;
        Self::from_connection(conn)
            .with_context(|| format!("{} is not a muse music library", db_path.display()))
    }

    /// Wrap an already open connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection has no usable `songs` table.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.prepare("SELECT path, artist, album, title FROM songs LIMIT 0")
            .context("songs table is missing or lacks path/artist/album/title columns")?;
        conn.create_scalar_function(
            FOLD_FUNCTION,
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
        )
        .context("Failed to register case folding function")?;
        Ok(Self { conn })
    }

    fn query_entries(&self, words: &[&str]) -> rusqlite::Result<Vec<CatalogEntry>> {
        let clauses: Vec<String> = (1..=words.len())
            .map(|i| {
                format!(
                    "({FOLD_FUNCTION}(title) LIKE ?{i} ESCAPE '\\' \
                     OR {FOLD_FUNCTION}(artist) LIKE ?{i} ESCAPE '\\' \
                     OR {FOLD_FUNCTION}(album) LIKE ?{i} ESCAPE '\\')"
                )
            })
            .collect();
        let sql = format!(
            "SELECT title, artist, album, path FROM songs WHERE {} ORDER BY artist, album, title LIMIT {MAX_ROWS}",
            clauses.join(" AND ")
        );
        let patterns: Vec<String> = words
            .iter()
            .map(|w| format!("%{}%", escape_like(&w.to_lowercase())))
            .collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(patterns.iter()), |row| {
            Ok(CatalogEntry {
                title: row.get(0)?,
                artist: row.get(1)?,
                album: row.get(2)?,
                uri: row.get(3)?,
                item_id: None,
            })
        })?;
        let entries = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(entries)
    }
}

impl CatalogSearch for LibraryCatalog {
    fn search(&self, query: &str) -> CatalogResponse {
        let words: Vec<&str> = query.split_whitespace().collect();
        if words.is_empty() {
            return CatalogResponse::Malformed("empty query".to_string());
        }

        match self.query_entries(&words) {
            Ok(entries) => {
                log::debug!("Library returned {} entries for {query:?}", entries.len());
                CatalogResponse::Entries(entries)
            }
            Err(e) => CatalogResponse::Malformed(format!("library query failed: {e}")),
        }
    }
}

/// Escape `LIKE` wildcards so query words match literally.
fn escape_like(word: &str) -> String {
    let mut escaped = String::with_capacity(word.len());
    for c in word.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
