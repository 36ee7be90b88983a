//! Candidate scoring and ranking.
//!
//! Scores a [`Candidate`] against a [`ParsedRequest`] and sorts a pool into a
//! [`RankedResultList`].

use crate::normalize::{matching_title, Candidate, VersionTag};
use crate::request::{normalize_text, ParsedRequest, Preference};
use serde::Serialize;
use std::cmp::Ordering;

/// Score differences closer than this are treated as equal.
pub(crate) const SCORE_EPSILON: f64 = 1e-9;

/// Scoring weights. These are design constants; they are not read from
/// runtime configuration.
#[derive(Debug, Clone)]
pub struct ScoringContext {
    pub title_weight: f64,
    pub artist_match_bonus: f64,
    pub artist_match_threshold: f64,
    pub artist_mismatch_penalty: f64,
    pub artist_mismatch_threshold: f64,
    /// Small nudge toward the album named in the request.
    pub album_match_bonus: f64,
    pub album_match_threshold: f64,
    pub preference_bonus: f64,
    pub preference_penalty: f64,
    pub remaster_bias: f64,
    pub studio_bias: f64,
}

impl Default for ScoringContext {
    fn default() -> Self {
        Self {
            title_weight: 1.0,
            artist_match_bonus: 0.5,
            artist_match_threshold: 0.8,
            artist_mismatch_penalty: 0.2,
            artist_mismatch_threshold: 0.4,
            album_match_bonus: 0.15,
            album_match_threshold: 0.9,
            preference_bonus: 0.3,
            preference_penalty: 0.1,
            remaster_bias: 0.05,
            studio_bias: 0.05,
        }
    }
}

/// Individual score terms. `total()` is the candidate's score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    /// Weighted title similarity.
    pub title: f64,
    /// Artist bonus or penalty.
    pub artist: f64,
    /// Album hint bonus.
    pub album: f64,
    /// Sum of per-preference adjustments.
    pub version: f64,
    /// Studio/remaster bias, only when no preference was expressed.
    pub bias: f64,
}

impl ScoreBreakdown {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.title + self.artist + self.album + self.version + self.bias
    }
}

/// Length-normalized edit similarity in `[0, 1]`.
#[must_use]
pub fn title_similarity(candidate_title: &str, requested_title: &str) -> f64 {
    if candidate_title == requested_title {
        return 1.0;
    }
    strsim::normalized_levenshtein(candidate_title, requested_title)
}

/// Artist similarity in `[0, 1]`. A whole-word containment either way
/// ("neil young" in "neil young & stray gators") counts as at least 0.8.
#[must_use]
pub fn artist_similarity(candidate_artist: &str, requested_artist: &str) -> f64 {
    let candidate = normalize_text(candidate_artist);
    let requested = normalize_text(requested_artist);
    if candidate.is_empty() || requested.is_empty() {
        return 0.0;
    }
    if candidate == requested {
        return 1.0;
    }

    let similarity = strsim::normalized_levenshtein(&candidate, &requested);
    let padded_candidate = format!(" {candidate} ");
    let padded_requested = format!(" {requested} ");
    if padded_candidate.contains(&padded_requested) || padded_requested.contains(&padded_candidate) {
        similarity.max(0.8)
    } else {
        similarity
    }
}

/// Album similarity in `[0, 1]`, ignoring bracketed edition notes
/// ("Harvest (2009 Remaster)" matches "harvest" exactly).
#[must_use]
pub fn album_similarity(candidate_album: &str, requested_album: &str) -> f64 {
    artist_similarity(&matching_title(candidate_album), requested_album)
}

/// Full breakdown of a candidate's score.
#[must_use]
pub fn score_breakdown(candidate: &Candidate, request: &ParsedRequest, context: &ScoringContext) -> ScoreBreakdown {
    let title = context.title_weight * title_similarity(&candidate.matching_title(), request.title());

    let artist = match request.artist() {
        None => 0.0,
        // Catalog gave no artist: no evidence either way.
        Some(_) if candidate.artist.trim().is_empty() => 0.0,
        Some(requested) => {
            let similarity = artist_similarity(&candidate.artist, requested);
            if similarity >= context.artist_match_threshold {
                context.artist_match_bonus
            } else if similarity < context.artist_mismatch_threshold {
                -context.artist_mismatch_penalty
            } else {
                0.0
            }
        }
    };

    let album = match request.album() {
        Some(requested) if album_similarity(&candidate.album, requested) >= context.album_match_threshold => {
            context.album_match_bonus
        }
        _ => 0.0,
    };

    let version = request
        .preferences()
        .iter()
        .map(|&preference| preference_adjustment(preference, candidate, context))
        .sum();

    let bias = if request.preferences().is_empty() {
        let mut bias = 0.0;
        if candidate.has_tag(VersionTag::Remaster) {
            bias -= context.remaster_bias;
        }
        if candidate.has_tag(VersionTag::Studio) {
            bias += context.studio_bias;
        }
        bias
    } else {
        0.0
    };

    ScoreBreakdown {
        title,
        artist,
        album,
        version,
        bias,
    }
}

/// Score of a candidate; higher is better. Deterministic.
#[must_use]
pub fn calculate_score(candidate: &Candidate, request: &ParsedRequest, context: &ScoringContext) -> f64 {
    score_breakdown(candidate, request, context).total()
}

/// One bonus or one penalty per preference, never both.
fn preference_adjustment(preference: Preference, candidate: &Candidate, context: &ScoringContext) -> f64 {
    let (wanted, opposites): (VersionTag, &[VersionTag]) = match preference {
        Preference::Live => (VersionTag::Live, &[VersionTag::Studio]),
        Preference::Acoustic => (VersionTag::Acoustic, &[VersionTag::Studio]),
        Preference::Studio => (VersionTag::Studio, &[VersionTag::Live, VersionTag::Acoustic]),
    };

    if candidate.has_tag(wanted) {
        context.preference_bonus
    } else if opposites.iter().any(|&tag| candidate.has_tag(tag)) {
        -context.preference_penalty
    } else {
        0.0
    }
}

/// Candidates sorted best first.
///
/// Ties on score go to the candidate from the earlier query, then to the
/// shorter album name (canonical release over an elaborately titled
/// compilation), then to arrival order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RankedResultList {
    candidates: Vec<Candidate>,
}

impl RankedResultList {
    /// Score every candidate in `pool` and sort.
    #[must_use]
    pub fn rank(pool: Vec<Candidate>, request: &ParsedRequest, context: &ScoringContext) -> Self {
        let candidates: Vec<Candidate> = pool
            .into_iter()
            .map(|mut candidate| {
                candidate.breakdown = score_breakdown(&candidate, request, context);
                candidate.score = candidate.breakdown.total();
                candidate
            })
            .collect();
        Self::from_scored(candidates)
    }

    /// Sort candidates that already carry a score. Scores are not touched.
    #[must_use]
    pub fn from_scored(mut candidates: Vec<Candidate>) -> Self {
        // sort_by is stable, which preserves arrival order as the last tie-break
        candidates.sort_by(compare_ranked);
        Self { candidates }
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    #[must_use]
    pub fn top(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Candidate> {
        self.candidates.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.candidates.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Score on a `SCORE_EPSILON` grid, so rounding noise cannot decide an
/// order while the comparison stays total.
fn score_key(score: f64) -> i64 {
    (score / SCORE_EPSILON).round() as i64
}

fn compare_ranked(a: &Candidate, b: &Candidate) -> Ordering {
    score_key(b.score)
        .cmp(&score_key(a.score))
        .then_with(|| a.query_rank.cmp(&b.query_rank))
        .then_with(|| a.album.chars().count().cmp(&b.album.chars().count()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogEntry;
    use crate::normalize::normalize_batch;

    fn candidate(title: &str, artist: &str, album: &str) -> Candidate {
        normalize_batch(&[CatalogEntry::new(title, artist, album, &format!("uri:{title}:{album}"))], "q", 0).remove(0)
    }

    fn harvest_pool() -> Vec<Candidate> {
        vec![
            candidate("Harvest Moon", "Neil Young", "Harvest Moon"),
            candidate("Harvest (2009 Remaster)", "Neil Young", "Harvest (2009 Remaster)"),
            candidate("Harvest", "Neil Young", "Harvest"),
            candidate("Harvest (Live)", "Neil Young & Stray Gators", "Tuscaloosa (Live)"),
        ]
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let request = ParsedRequest::new("harvest", Some("neil young"), [Preference::Live]);
        let context = ScoringContext::default();
        for c in harvest_pool() {
            assert_eq!(calculate_score(&c, &request, &context), calculate_score(&c, &request, &context));
        }
    }

    #[test]
    fn test_live_request_ranks_live_entry_first() {
        let request = ParsedRequest::new("harvest", Some("neil young"), [Preference::Live]);
        let ranked = RankedResultList::rank(harvest_pool(), &request, &ScoringContext::default());

        let top = ranked.top().expect("non-empty");
        assert_eq!(top.album, "Tuscaloosa (Live)");
        assert!((top.score - 1.8).abs() < 1e-9, "got {}", top.score);
        assert_eq!(ranked.get(3).map(|c| c.title.as_str()), Some("Harvest Moon"));
    }

    #[test]
    fn test_no_preference_prefers_plain_studio() {
        let request = ParsedRequest::new("harvest", Some("neil young"), []);
        let ranked = RankedResultList::rank(harvest_pool(), &request, &ScoringContext::default());

        let top = ranked.top().expect("non-empty");
        assert_eq!(top.title, "Harvest");
        assert!((top.score - 1.55).abs() < 1e-9, "got {}", top.score);

        let remaster = ranked
            .iter()
            .find(|c| c.title == "Harvest (2009 Remaster)")
            .expect("remaster present");
        assert!(top.score > remaster.score);
        assert_eq!(remaster.breakdown.bias, 0.0);
    }

    #[test]
    fn test_artist_terms() {
        let context = ScoringContext::default();
        let request = ParsedRequest::new("harvest", Some("neil young"), []);

        let matching = candidate("Harvest", "Neil Young", "Harvest");
        assert_eq!(score_breakdown(&matching, &request, &context).artist, 0.5);

        let cover = candidate("Harvest", "Kaki King", "Covers");
        assert_eq!(score_breakdown(&cover, &request, &context).artist, -0.2);

        let unknown = candidate("Harvest", "", "Harvest");
        assert_eq!(score_breakdown(&unknown, &request, &context).artist, 0.0);

        let no_artist_requested = ParsedRequest::new("harvest", None, []);
        assert_eq!(score_breakdown(&cover, &no_artist_requested, &context).artist, 0.0);
    }

    #[test]
    fn test_preference_adjustment_applies_once() {
        let context = ScoringContext::default();
        let studio = candidate("Harvest", "Neil Young", "Harvest");
        let live_remaster = candidate("Harvest", "Neil Young", "Live at Massey Hall (Deluxe)");
        let unplugged = candidate("Harvest", "Neil Young", "Unplugged");

        let live = ParsedRequest::new("harvest", None, [Preference::Live]);
        assert_eq!(score_breakdown(&studio, &live, &context).version, -0.1);
        assert_eq!(score_breakdown(&live_remaster, &live, &context).version, 0.3);

        let both = ParsedRequest::new("harvest", None, [Preference::Live, Preference::Acoustic]);
        assert!((score_breakdown(&unplugged, &both, &context).version - 0.6).abs() < 1e-9);
        assert!((score_breakdown(&studio, &both, &context).version + 0.2).abs() < 1e-9);

        let studio_wanted = ParsedRequest::new("harvest", None, [Preference::Studio]);
        assert_eq!(score_breakdown(&unplugged, &studio_wanted, &context).version, -0.1);
        assert_eq!(score_breakdown(&studio, &studio_wanted, &context).version, 0.3);
        assert_eq!(score_breakdown(&studio, &studio_wanted, &context).bias, 0.0);
    }

    #[test]
    fn test_acoustic_request_does_not_penalize_live_only() {
        let context = ScoringContext::default();
        let live_only = candidate("Harvest", "Neil Young", "Live Rust");
        let acoustic = ParsedRequest::new("harvest", None, [Preference::Acoustic]);
        assert_eq!(score_breakdown(&live_only, &acoustic, &context).version, 0.0);
    }

    #[test]
    fn test_similarity_helpers() {
        assert_eq!(title_similarity("harvest", "harvest"), 1.0);
        let partial = title_similarity("harvest moon", "harvest");
        assert!(partial > 0.5 && partial < 0.6, "got {partial}");
        assert_eq!(artist_similarity("Neil Young", "neil young"), 1.0);
        assert!(artist_similarity("Neil Young & Stray Gators", "neil young") >= 0.8);
        assert!(artist_similarity("Young Fathers", "neil young") < 0.8);
        assert_eq!(artist_similarity("", "neil young"), 0.0);
    }

    #[test]
    fn test_tie_breaks() {
        let request = ParsedRequest::new("harvest", Some("neil young"), []);
        let mut late = candidate("Harvest", "Neil Young", "Harvest");
        late.query_rank = 2;
        let mut early_long = candidate("Harvest", "Neil Young", "Harvest");
        early_long.album = "Harvest: The Complete Anthology Box".to_string();
        early_long.version_tags = late.version_tags.clone();
        early_long.query_rank = 0;
        let mut early_short = early_long.clone();
        early_short.album = "Harvest".to_string();
        early_short.source_identifier = "uri:short".to_string();

        let ranked = RankedResultList::rank(
            vec![late.clone(), early_long.clone(), early_short.clone()],
            &request,
            &ScoringContext::default(),
        );
        let order: Vec<(usize, &str)> = ranked.iter().map(|c| (c.query_rank, c.album.as_str())).collect();
        assert_eq!(
            order,
            vec![(0, "Harvest"), (0, "Harvest: The Complete Anthology Box"), (2, "Harvest")]
        );
    }

    #[test]
    fn test_album_hint_bonus() {
        let context = ScoringContext::default();
        let request = ParsedRequest::new("harvest", Some("neil young"), []).with_album("Harvest");

        let on_album = candidate("Harvest", "Neil Young", "Harvest");
        let remastered = candidate("Harvest (2009 Remaster)", "Neil Young", "Harvest (2009 Remaster)");
        let elsewhere = candidate("Harvest", "Neil Young", "Decade");
        let other_album = candidate("Harvest Moon", "Neil Young", "Harvest Moon");

        assert_eq!(score_breakdown(&on_album, &request, &context).album, 0.15);
        assert_eq!(score_breakdown(&remastered, &request, &context).album, 0.15);
        assert_eq!(score_breakdown(&elsewhere, &request, &context).album, 0.0);
        assert_eq!(score_breakdown(&other_album, &request, &context).album, 0.0);

        let without_hint = ParsedRequest::new("harvest", Some("neil young"), []);
        assert_eq!(score_breakdown(&on_album, &without_hint, &context).album, 0.0);
        assert!((calculate_score(&on_album, &request, &context) - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_album_hint_lifts_album_track_over_compilation() {
        let request = ParsedRequest::new("heart of gold", Some("neil young"), []).with_album("decade");
        let mut pool = vec![
            candidate("Heart of Gold", "Neil Young", "Harvest"),
            candidate("Heart of Gold", "Neil Young", "Decade"),
        ];
        pool[1].query_rank = 1;

        let ranked = RankedResultList::rank(pool, &request, &ScoringContext::default());
        assert_eq!(ranked.top().map(|c| c.album.as_str()), Some("Decade"));
    }

    #[test]
    fn test_rounding_noise_does_not_beat_tie_breaks() {
        let mut early = candidate("Harvest", "Neil Young", "Harvest");
        early.score = 0.3;
        early.query_rank = 0;
        let mut late = early.clone();
        late.score = 0.1 + 0.2;
        late.query_rank = 1;
        assert!(late.score > early.score);

        assert_eq!(compare_ranked(&early, &late), Ordering::Less);
        assert_eq!(compare_ranked(&late, &early), Ordering::Greater);

        let mut clearly_better = late.clone();
        clearly_better.score = 0.3 + 1e-6;
        assert_eq!(compare_ranked(&clearly_better, &early), Ordering::Less);
    }

    #[test]
    fn test_rank_empty_pool() {
        let request = ParsedRequest::new("harvest", None, []);
        let ranked = RankedResultList::rank(Vec::new(), &request, &ScoringContext::default());
        assert!(ranked.is_empty());
        assert!(ranked.top().is_none());
    }
}
