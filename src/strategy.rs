//! # Query Strategy Module
//!
//! Pure translation from a [`ParsedRequest`] into the ordered list of catalog
//! queries the resolver will try. Nothing here touches the catalog. Queries
//! use the request's query form, which keeps "don't" searchable as "don t".
//!
//! Plan layout, most specific first:
//!
//! ```text
//! acoustic <title> <artist>    ┐ only with Preference::Acoustic
//! <title> acoustic <artist>    ┘
//! live <title> <artist>        ┐ only with Preference::Live
//! <title> live <artist>        ┘
//! <title> <artist>             ← base query, always present
//! <artist> <title>             ← only when an artist is known
//! <title>                      ← title-only fallback, always last
//! ```

use crate::request::{ParsedRequest, Preference};
use serde::Serialize;

/// Ordered, deduplicated, never-empty list of catalog queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryPlan {
    queries: Vec<String>,
}

impl QueryPlan {
    #[must_use]
    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Always false for plans built by [`plan_queries`].
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.queries.iter().map(String::as_str)
    }

    #[must_use]
    pub fn into_queries(self) -> Vec<String> {
        self.queries
    }

    fn push(&mut self, parts: &[&str]) {
        let query = parts
            .iter()
            .filter(|part| !part.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join(" ");
        if !query.is_empty() && !self.queries.contains(&query) {
            self.queries.push(query);
        }
    }
}

/// Build the query plan for a parsed request.
///
/// # Examples
///
/// ```
/// use muse_resolver::request::{ParsedRequest, Preference};
/// use muse_resolver::strategy::plan_queries;
///
/// let request = ParsedRequest::new("harvest", Some("neil young"), [Preference::Live]);
/// let plan = plan_queries(&request);
/// assert_eq!(plan.queries()[0], "live harvest neil young");
/// assert_eq!(plan.queries().last().map(String::as_str), Some("harvest"));
/// ```
#[must_use]
pub fn plan_queries(request: &ParsedRequest) -> QueryPlan {
    let title = request.query_title();
    let artist = request.query_artist().unwrap_or("");
    let mut plan = QueryPlan { queries: Vec::new() };

    // Acoustic is the more specific ask, so its variants go ahead of live.
    for (preference, keyword) in [(Preference::Acoustic, "acoustic"), (Preference::Live, "live")] {
        if request.prefers(preference) {
            plan.push(&[keyword, title, artist]);
            plan.push(&[title, keyword, artist]);
        }
    }

    plan.push(&[title, artist]);
    if !artist.is_empty() {
        plan.push(&[artist, title]);
    }
    plan.push(&[title]);

    log::debug!("Planned {} queries for {request}", plan.len());
    plan
}

/// Simplified variants of a query the catalog choked on: each single word
/// dropped in turn, then the trailing two words. Queries of two words or
/// fewer have no variants.
#[must_use]
pub fn simplified_queries(query: &str) -> Vec<String> {
    let words: Vec<&str> = query.split_whitespace().collect();
    if words.len() <= 2 {
        return Vec::new();
    }

    let mut variants: Vec<String> = Vec::new();
    let mut add = |candidate: String| {
        if candidate != query && !variants.contains(&candidate) {
            variants.push(candidate);
        }
    };

    for skip in 0..words.len() {
        add(words
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != skip)
            .map(|(_, w)| *w)
            .collect::<Vec<_>>()
            .join(" "));
    }
    add(words[words.len() - 2..].join(" "));

    variants
}
