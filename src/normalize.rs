//! # Result Normalization Module
//!
//! Converts raw [`CatalogEntry`] batches into [`Candidate`]s. Each candidate
//! carries a set of [`VersionTag`]s derived from its title *and* album, since
//! many catalogs only mark a live recording in the album name
//! ("Live from the Artists Den").

use crate::algorithm::ScoreBreakdown;
use crate::catalog::CatalogEntry;
use crate::request::normalize_text;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// Version attributes detected on a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionTag {
    Live,
    Acoustic,
    Studio,
    Remaster,
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Live => "live",
            Self::Acoustic => "acoustic",
            Self::Studio => "studio",
            Self::Remaster => "remaster",
        })
    }
}

/// A normalized search result eligible for selection.
///
/// Candidates live for one resolution only. `score` and `breakdown` stay at
/// zero until the pool is ranked.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub source_identifier: String,
    pub version_tags: BTreeSet<VersionTag>,
    /// Query that surfaced this candidate.
    pub origin_query: String,
    /// Position of `origin_query` among the queries actually issued.
    pub query_rank: usize,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

impl Candidate {
    #[must_use]
    pub fn has_tag(&self, tag: VersionTag) -> bool {
        self.version_tags.contains(&tag)
    }

    /// Title with version annotations removed, normalized for comparison.
    #[must_use]
    pub fn matching_title(&self) -> String {
        matching_title(&self.title)
    }

    /// Comma-separated tag list, e.g. `"live, remaster"`.
    #[must_use]
    pub fn tag_list(&self) -> String {
        self.version_tags
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.title, self.artist)?;
        if !self.album.is_empty() {
            write!(f, " ({})", self.album)?;
        }
        Ok(())
    }
}

lazy_static! {
    static ref LIVE_LEXICON: Regex =
        Regex::new(r"\b(?:live|concert|unplugged)\b|artists\s+den|live\s+(?:at|from)")
            .expect("valid live lexicon");

    static ref ACOUSTIC_LEXICON: Regex =
        Regex::new(r"\b(?:acoustic|unplugged|stripped)\b|solo\s+acoustic")
            .expect("valid acoustic lexicon");

    static ref REMASTER_LEXICON: Regex = Regex::new(r"remaster|anniversary|deluxe|reissue")
        .expect("valid remaster lexicon");

    /// "(2009 Remaster)", "[Live at the Fillmore]", "(Explicit)", ...
    static ref BRACKETED_ANNOTATION: Regex = Regex::new(
        r"(?i)\s*[(\[][^)\]]*\b(?:live|remaster(?:ed)?|explicit|acoustic|unplugged|deluxe|anniversary|reissue|mono|stereo|version|edit|demo)\b[^)\]]*[)\]]"
    ).expect("valid bracketed annotation pattern");

    /// "Harvest - Live", "Harvest - Remastered 2011", ...
    static ref DASH_ANNOTATION: Regex = Regex::new(
        r"(?i)\s+-\s+[^-]*\b(?:live|remaster(?:ed)?|acoustic|unplugged|version|edit|mono|stereo|demo)\b.*$"
    ).expect("valid dash annotation pattern");
}

/// Derive version tags from a title and album.
///
/// Remaster coexists with every other tag. Studio is implied whenever the
/// entry is neither live nor acoustic.
#[must_use]
pub fn derive_version_tags(title: &str, album: &str) -> BTreeSet<VersionTag> {
    let haystack = format!("{title} {album}").to_lowercase();
    let mut tags = BTreeSet::new();

    if LIVE_LEXICON.is_match(&haystack) {
        tags.insert(VersionTag::Live);
    }
    if ACOUSTIC_LEXICON.is_match(&haystack) {
        tags.insert(VersionTag::Acoustic);
    }
    if REMASTER_LEXICON.is_match(&haystack) {
        tags.insert(VersionTag::Remaster);
    }
    if !tags.contains(&VersionTag::Live) && !tags.contains(&VersionTag::Acoustic) {
        tags.insert(VersionTag::Studio);
    }
    tags
}

/// Strip version annotations from a catalog title and normalize it.
///
/// ```
/// use muse_resolver::normalize::matching_title;
///
/// assert_eq!(matching_title("Harvest (2009 Remaster)"), "harvest");
/// assert_eq!(matching_title("Harvest Moon - Live at Farm Aid"), "harvest moon");
/// ```
#[must_use]
pub fn matching_title(title: &str) -> String {
    let without_brackets = BRACKETED_ANNOTATION.replace_all(title, "");
    let stripped = DASH_ANNOTATION.replace(&without_brackets, "");
    let normalized = normalize_text(&stripped);
    if normalized.is_empty() {
        // Title was nothing but annotation; compare on the raw text instead.
        normalize_text(title)
    } else {
        normalized
    }
}

/// Normalize one catalog batch.
///
/// Entries without a title, or without anything to hand to the player, are
/// dropped silently.
#[must_use]
pub fn normalize_batch(entries: &[CatalogEntry], origin_query: &str, query_rank: usize) -> Vec<Candidate> {
    let candidates: Vec<Candidate> = entries
        .iter()
        .filter_map(|entry| normalize_entry(entry, origin_query, query_rank))
        .collect();

    if candidates.len() < entries.len() {
        log::debug!(
            "Dropped {} of {} entries for {origin_query:?} (missing title or identifier)",
            entries.len() - candidates.len(),
            entries.len()
        );
    }
    candidates
}

fn normalize_entry(entry: &CatalogEntry, origin_query: &str, query_rank: usize) -> Option<Candidate> {
    let title = non_blank(entry.title.as_deref())?;
    let source_identifier = non_blank(entry.uri.as_deref()).or_else(|| non_blank(entry.item_id.as_deref()))?;
    let artist = non_blank(entry.artist.as_deref()).unwrap_or_default();
    let album = non_blank(entry.album.as_deref()).unwrap_or_default();

    Some(Candidate {
        version_tags: derive_version_tags(&title, &album),
        title,
        artist,
        album,
        source_identifier,
        origin_query: origin_query.to_string(),
        query_rank,
        score: 0.0,
        breakdown: ScoreBreakdown::default(),
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(title: &str, album: &str) -> Vec<VersionTag> {
        derive_version_tags(title, album).into_iter().collect()
    }

    #[test]
    fn test_live_from_album_only() {
        assert_eq!(tags("Harvest", "Live from the Artists Den"), vec![VersionTag::Live]);
        assert_eq!(tags("Harvest (Live)", "Tuscaloosa (Live)"), vec![VersionTag::Live]);
        assert_eq!(tags("Cortez the Killer", "Rust Never Sleeps"), vec![VersionTag::Studio]);
    }

    #[test]
    fn test_unplugged_is_live_and_acoustic() {
        assert_eq!(
            tags("About a Girl", "MTV Unplugged in New York"),
            vec![VersionTag::Live, VersionTag::Acoustic]
        );
    }

    #[test]
    fn test_remaster_coexists() {
        assert_eq!(
            tags("Harvest (2009 Remaster)", "Harvest"),
            vec![VersionTag::Studio, VersionTag::Remaster]
        );
        assert_eq!(
            tags("Harvest", "Live at Massey Hall (Deluxe Edition)"),
            vec![VersionTag::Live, VersionTag::Remaster]
        );
    }

    #[test]
    fn test_word_boundaries() {
        // "alive" and "olive" are not live recordings
        assert_eq!(tags("Alive", "Ten"), vec![VersionTag::Studio]);
        assert_eq!(tags("Olive Tree", "Songs"), vec![VersionTag::Studio]);
    }

    #[test]
    fn test_acoustic_variants() {
        assert_eq!(tags("Wonderwall (Stripped)", "B-Sides"), vec![VersionTag::Acoustic]);
        assert_eq!(tags("Wonderwall", "Solo Acoustic Vol. 2"), vec![VersionTag::Acoustic]);
    }

    #[test]
    fn test_matching_title_strips_annotations() {
        assert_eq!(matching_title("Harvest (Live)"), "harvest");
        assert_eq!(matching_title("Harvest [Explicit]"), "harvest");
        assert_eq!(matching_title("Harvest - Remastered 2011"), "harvest");
        assert_eq!(matching_title("Harvest Moon"), "harvest moon");
        assert_eq!(matching_title("Heart-Shaped Box"), "heart shaped box");
        assert_eq!(matching_title("(Live)"), "live");
    }

    #[test]
    fn test_normalize_batch_drops_unusable_entries() {
        let entries = vec![
            CatalogEntry::new("Harvest", "Neil Young", "Harvest", "file:harvest.flac"),
            CatalogEntry {
                title: None,
                uri: Some("file:untitled.flac".to_string()),
                ..CatalogEntry::default()
            },
            CatalogEntry {
                title: Some("   ".to_string()),
                uri: Some("file:blank.flac".to_string()),
                ..CatalogEntry::default()
            },
            CatalogEntry {
                title: Some("No Identifier".to_string()),
                ..CatalogEntry::default()
            },
            CatalogEntry {
                title: Some("Item Only".to_string()),
                item_id: Some("10032020track".to_string()),
                ..CatalogEntry::default()
            },
        ];

        let candidates = normalize_batch(&entries, "harvest neil young", 2);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].source_identifier, "file:harvest.flac");
        assert_eq!(candidates[0].origin_query, "harvest neil young");
        assert_eq!(candidates[0].query_rank, 2);
        assert_eq!(candidates[1].source_identifier, "10032020track");
        assert_eq!(candidates[1].artist, "");
        assert!(candidates[1].has_tag(VersionTag::Studio));
    }

    #[test]
    fn test_candidate_display() {
        let entry = CatalogEntry::new("Harvest (Live)", "Neil Young", "Tuscaloosa (Live)", "uri:1");
        let candidate = normalize_batch(&[entry], "q", 0).remove(0);
        assert_eq!(candidate.to_string(), "Harvest (Live) - Neil Young (Tuscaloosa (Live))");
        assert_eq!(candidate.tag_list(), "live");
    }
}
