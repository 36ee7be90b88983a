//! # Request Parsing Module
//!
//! Turns a free-text music request into a [`ParsedRequest`]:
//!
//! ```text
//! "I'd like to hear a live version of Neil Young's Harvest"
//!     → title = "harvest", artist = Some("neil young"), preferences = {Live}
//! ```
//!
//! Parsing happens in five passes:
//!
//! 1. Command phrases ("play", "put on", "i'd like to hear", ...) are removed
//!    from the front, "please" from the back.
//! 2. A trailing album hint ("from the harvest album", "off the album
//!    decade") is cut off and kept as the request's album.
//! 3. Version keywords are collected into [`Preference`]s and the phrases that
//!    carry them ("a live version of") are cut out so they never end up in
//!    the title.
//! 4. The remainder is segmented: `"<title> by <artist>"` first, then the
//!    possessive `"<artist>'s <title>"`, otherwise everything is the title.
//!    A `from`/`off` tail on the artist is an album hint as well.
//! 5. Title and artist are normalized with [`normalize_text`] for matching,
//!    and with [`query_text`] for searching.

use crate::error::ResolutionError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A requested version attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Live,
    Acoustic,
    Studio,
}

impl Preference {
    /// Human wording, used in arbiter prompts.
    #[must_use]
    pub const fn describe(self) -> &'static str {
        match self {
            Self::Live => "live version",
            Self::Acoustic => "acoustic version",
            Self::Studio => "studio version",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Live => "prefer_live",
            Self::Acoustic => "prefer_acoustic",
            Self::Studio => "prefer_studio",
        };
        f.write_str(name)
    }
}

/// Structured intent extracted from one request. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRequest {
    title: String,
    artist: Option<String>,
    album: Option<String>,
    preferences: BTreeSet<Preference>,
    #[serde(skip)]
    query_title: String,
    #[serde(skip)]
    query_artist: Option<String>,
}

impl ParsedRequest {
    /// Build a request from already-segmented parts. Title and artist are
    /// normalized; an artist that normalizes to nothing is dropped.
    pub fn new(
        title: &str,
        artist: Option<&str>,
        preferences: impl IntoIterator<Item = Preference>,
    ) -> Self {
        let artist = artist.filter(|a| !normalize_text(a).is_empty());
        Self {
            title: normalize_text(title),
            artist: artist.map(normalize_text),
            album: None,
            preferences: preferences.into_iter().collect(),
            query_title: query_text(title),
            query_artist: artist.map(query_text),
        }
    }

    /// Attach an album hint. A hint that normalizes to nothing is ignored.
    #[must_use]
    pub fn with_album(mut self, album: &str) -> Self {
        let album = normalize_text(album);
        self.album = (!album.is_empty()).then_some(album);
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> Option<&str> {
        self.artist.as_deref()
    }

    #[must_use]
    pub fn album(&self) -> Option<&str> {
        self.album.as_deref()
    }

    /// Title as catalog query words. Unlike [`title`](Self::title) this
    /// splits words at apostrophes, so `"don t"` still finds "Don't" in a
    /// substring search.
    #[must_use]
    pub fn query_title(&self) -> &str {
        &self.query_title
    }

    #[must_use]
    pub fn query_artist(&self) -> Option<&str> {
        self.query_artist.as_deref()
    }

    #[must_use]
    pub fn preferences(&self) -> &BTreeSet<Preference> {
        &self.preferences
    }

    #[must_use]
    pub fn prefers(&self, preference: Preference) -> bool {
        self.preferences.contains(&preference)
    }
}

impl fmt::Display for ParsedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.title)?;
        if let Some(artist) = &self.artist {
            write!(f, " by {artist}")?;
        }
        if let Some(album) = &self.album {
            write!(f, " from {album}")?;
        }
        if !self.preferences.is_empty() {
            let prefs: Vec<String> = self.preferences.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", prefs.join(", "))?;
        }
        Ok(())
    }
}

lazy_static! {
    static ref COMMAND_PREFIX: Regex = Regex::new(
        r"^(?:(?:please|hey|ok|okay)\s+)?(?:(?:can|could|would|will)\s+you\s+(?:please\s+)?)?(?:play|put\s+on|queue\s+up|queue|find|i'?d\s+like\s+to\s+hear|i\s+would\s+like\s+to\s+hear|i\s+want\s+to\s+hear|i\s+wanna\s+hear|let\s+me\s+hear|let'?s\s+hear)(?:\s+|$)"
    ).expect("valid command prefix pattern");

    static ref FILLER_PREFIX: Regex = Regex::new(
        r"^(?:me\s+)?(?:(?:the|that)\s+)?(?:song|track|tune)\s+"
    ).expect("valid filler pattern");

    static ref TRAILING_NOISE: Regex = Regex::new(r"[\s,]*(?:please)?[\s.!?]*$")
        .expect("valid trailing pattern");

    static ref LIVE_WORDS: Regex = Regex::new(r"\b(?:live|concert|unplugged)\b")
        .expect("valid live pattern");

    static ref ACOUSTIC_WORDS: Regex = Regex::new(r"\b(?:acoustic|unplugged|stripped)\b")
        .expect("valid acoustic pattern");

    static ref STUDIO_WORDS: Regex = Regex::new(r"\b(?:studio|original)\b")
        .expect("valid studio pattern");

    /// "a live version of", "the acoustic recording of", "unplugged", ...
    static ref PREFERENCE_PHRASE: Regex = Regex::new(
        r"(?:\b(?:a|an|the|some)\s+)?\b(?:live|concert|unplugged|acoustic|stripped(?:\s+down)?|studio|original)\b(?:\s+(?:version|recording|performance|take|cut|edition|mix))?(?:\s+of\b)?"
    ).expect("valid preference phrase pattern");

    static ref BY_ARTIST_ONLY: Regex = Regex::new(r"^by\s+").expect("valid by pattern");

    static ref POSSESSIVE: Regex = Regex::new(r"^(.+?)'s\s+(.+)$").expect("valid possessive pattern");

    static ref PLURAL_POSSESSIVE: Regex = Regex::new(r"^(.+?s)'\s+(.+)$")
        .expect("valid plural possessive pattern");

    /// "... from the harvest album", "... off the album decade", "... on the record x".
    static ref ALBUM_HINT: Regex = Regex::new(
        r"^(?P<rest>.*\S)\s+(?:from|off|on)\s+(?:the\s+)?(?:(?:album|record|lp)\s+(?P<lead>.+)|(?P<tail>.+?)\s+(?:album|record|lp))$"
    ).expect("valid album hint pattern");

    /// "neil young from harvest": an album after a " by " artist.
    static ref ARTIST_ALBUM_TAIL: Regex = Regex::new(
        r"^(?P<artist>.+?)\s+(?:from|off)\s+(?:the\s+)?(?:(?:album|record|lp)\s+)?(?P<album>.+)$"
    ).expect("valid artist album pattern");

    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Words that look like a possessive artist but are contractions ("it's", "that's").
const NOT_AN_ARTIST: &[&str] = &[
    "it", "that", "what", "there", "here", "he", "she", "who", "where", "how", "let", "now",
    "today", "tonight", "everybody", "nobody", "somebody",
];

/// Case-fold, drop apostrophes, turn other punctuation into spaces and
/// collapse whitespace. Idempotent.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '\u{2019}' | '\u{2018}' | '`'))
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Query form of `text`: case-folded, with apostrophes and other
/// punctuation turned into word breaks. Idempotent.
#[must_use]
pub fn query_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Collect version preferences mentioned anywhere in `text`.
///
/// "unplugged" implies both live and acoustic.
#[must_use]
pub fn detect_preferences(text: &str) -> BTreeSet<Preference> {
    let lowered = text.to_lowercase();
    let mut preferences = BTreeSet::new();
    if LIVE_WORDS.is_match(&lowered) {
        preferences.insert(Preference::Live);
    }
    if ACOUSTIC_WORDS.is_match(&lowered) {
        preferences.insert(Preference::Acoustic);
    }
    if STUDIO_WORDS.is_match(&lowered) {
        preferences.insert(Preference::Studio);
    }
    preferences
}

/// Parse a free-text request.
///
/// # Errors
///
/// Returns [`ResolutionError::ParseAmbiguous`] when nothing usable as a title
/// remains once command phrases and version keywords are removed.
///
/// # Examples
///
/// ```
/// use muse_resolver::request::{parse_request, Preference};
///
/// let parsed = parse_request("I'd like to hear a live version of Neil Young's Harvest")?;
/// assert_eq!(parsed.title(), "harvest");
/// assert_eq!(parsed.artist(), Some("neil young"));
/// assert!(parsed.prefers(Preference::Live));
/// # Ok::<(), muse_resolver::error::ResolutionError>(())
/// ```
pub fn parse_request(raw: &str) -> Result<ParsedRequest, ResolutionError> {
    let ambiguous = || ResolutionError::ParseAmbiguous {
        request: raw.to_string(),
    };

    let lowered = raw
        .trim()
        .to_lowercase()
        .replace(['\u{2019}', '\u{2018}'], "'");
    let without_command = COMMAND_PREFIX.replace(&lowered, "");
    let without_filler = FILLER_PREFIX.replace(&without_command, "");
    let cleaned = TRAILING_NOISE.replace(&without_filler, "").to_string();
    let (body, mut album) = split_album_hint(&cleaned);

    let preferences = detect_preferences(body);
    let stripped = PREFERENCE_PHRASE.replace_all(body, " ");
    let remainder = WHITESPACE.replace_all(stripped.trim(), " ").to_string();

    if remainder.is_empty() || BY_ARTIST_ONLY.is_match(&remainder) {
        return Err(ambiguous());
    }

    let (title, mut artist) = segment(&remainder);
    if let Some(caps) = artist.and_then(|a| ARTIST_ALBUM_TAIL.captures(a)) {
        if let (Some(name), Some(hint)) = (caps.name("artist"), caps.name("album")) {
            artist = Some(name.as_str());
            album = album.or(Some(hint.as_str()));
        }
    }

    let mut parsed = ParsedRequest::new(title, artist, preferences);
    if let Some(album) = album {
        parsed = parsed.with_album(album);
    }
    if parsed.title.is_empty() {
        return Err(ambiguous());
    }

    log::debug!("Parsed {raw:?} as {parsed}");
    Ok(parsed)
}

/// Cut a trailing album hint off `body`, returning the rest and the album.
fn split_album_hint(body: &str) -> (&str, Option<&str>) {
    let Some(caps) = ALBUM_HINT.captures(body) else {
        return (body, None);
    };
    let album = caps.name("lead").or_else(|| caps.name("tail"));
    match (caps.name("rest"), album) {
        (Some(rest), Some(album)) => (rest.as_str(), Some(album.as_str())),
        _ => (body, None),
    }
}

/// Split the cleaned remainder into `(title, artist)`.
fn segment(remainder: &str) -> (&str, Option<&str>) {
    // Last " by " so that "stand by me by ben e king" keeps its title intact.
    if let Some(idx) = remainder.rfind(" by ") {
        let title = remainder[..idx].trim();
        let artist = remainder[idx + 4..].trim();
        if !title.is_empty() && !artist.is_empty() {
            return (title, Some(artist));
        }
    }

    for pattern in [&*POSSESSIVE, &*PLURAL_POSSESSIVE] {
        if let Some(caps) = pattern.captures(remainder) {
            let (Some(artist), Some(title)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if NOT_AN_ARTIST.contains(&artist.as_str().trim()) {
                continue;
            }
            return (title.as_str(), Some(artist.as_str()));
        }
    }

    (remainder, None)
}
