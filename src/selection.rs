//! # Selection Policy
//!
//! Picks the winner from a [`RankedResultList`]. A clear leader is taken
//! directly. When the field is crowded the choice is escalated to an
//! [`Arbiter`], which runs on a worker thread under a timeout. Any arbiter
//! failure (missing, slow, nonsensical answer) falls back to the top-ranked
//! candidate, so escalation can never fail a resolution.
//!
//! ```text
//! top - second ≥ margin ─────────────► Deterministic
//!        │ no
//!        ▼
//! escalation reason? ── none ────────► Deterministic
//!        │ yes
//!        ▼
//! arbiter answers in time, in range ─► Arbiter
//!        │ otherwise
//!        ▼
//!   top candidate ───────────────────► Fallback
//! ```

use crate::algorithm::{RankedResultList, SCORE_EPSILON};
use crate::error::{ArbiterError, ResolutionError};
use crate::normalize::Candidate;
use crate::request::ParsedRequest;
use serde::{Serialize, Serializer};
use std::fmt;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

/// Tie-breaking collaborator consulted for ambiguous selections.
///
/// Returns a 0-based index into `candidates`. Any
/// `Fn(&ParsedRequest, &[Candidate]) -> Result<usize, ArbiterError>` closure
/// that is `Send + Sync` is an arbiter.
pub trait Arbiter: Send + Sync {
    fn select(&self, request: &ParsedRequest, candidates: &[Candidate]) -> Result<usize, ArbiterError>;
}

impl<F> Arbiter for F
where
    F: Fn(&ParsedRequest, &[Candidate]) -> Result<usize, ArbiterError> + Send + Sync,
{
    fn select(&self, request: &ParsedRequest, candidates: &[Candidate]) -> Result<usize, ArbiterError> {
        self(request, candidates)
    }
}

/// How the winner was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionTier {
    /// Clear leader, or nothing worth escalating.
    Deterministic,
    /// The arbiter picked from the shortlist.
    Arbiter,
    /// Escalation was warranted but the arbiter was absent or failed.
    Fallback,
}

impl fmt::Display for SelectionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deterministic => "deterministic",
            Self::Arbiter => "arbiter",
            Self::Fallback => "fallback",
        })
    }
}

/// Why a selection was escalated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationReason {
    /// The top three candidates all sit within the margin of the leader.
    TightTopThree,
    /// Three or more candidates reach the strong-match threshold.
    CrowdedStrongMatches,
    /// Several close contenders were moved by version preferences.
    PreferenceContention,
}

impl fmt::Display for EscalationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::TightTopThree => "top three within margin",
            Self::CrowdedStrongMatches => "several strong matches",
            Self::PreferenceContention => "version preference contention",
        })
    }
}

/// Outcome of the selection step.
#[derive(Debug, Clone, Serialize)]
pub struct Selection {
    pub candidate: Candidate,
    /// Position of `candidate` in the ranked list.
    pub rank: usize,
    pub tier: SelectionTier,
    pub escalation: Option<EscalationReason>,
    /// Why the arbiter's answer was not used, when it was consulted.
    #[serde(serialize_with = "serialize_arbiter_error")]
    pub arbiter_error: Option<ArbiterError>,
}

fn serialize_arbiter_error<S: Serializer>(error: &Option<ArbiterError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Selection thresholds.
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    /// Lead over the runner-up that settles a selection outright.
    pub margin: f64,
    /// Score at which a candidate counts as a strong match.
    pub strong_match: f64,
    /// Number of top candidates shown to the arbiter.
    pub shortlist: usize,
    pub arbiter_timeout: Duration,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            margin: 0.25,
            strong_match: 1.25,
            shortlist: 10,
            arbiter_timeout: Duration::from_secs(20),
        }
    }
}

impl SelectionPolicy {
    /// Choose the winner of `ranked`.
    ///
    /// The returned candidate is always an element of `ranked`.
    ///
    /// # Errors
    ///
    /// Returns [`ResolutionError::NoMatch`] when `ranked` is empty.
    pub fn select(
        &self,
        ranked: &RankedResultList,
        request: &ParsedRequest,
        arbiter: Option<&Arc<dyn Arbiter>>,
    ) -> Result<Selection, ResolutionError> {
        let top = ranked.top().ok_or_else(|| ResolutionError::NoMatch {
            title: request.title().to_string(),
            queries_tried: Vec::new(),
        })?;

        let Some(reason) = self.escalation_reason(ranked, request) else {
            return Ok(self.pick(ranked, 0, SelectionTier::Deterministic, None, None));
        };
        log::debug!("Escalating selection for {request}: {reason}");

        let Some(arbiter) = arbiter else {
            log::info!("No arbiter configured; taking top candidate {top}");
            return Ok(self.pick(ranked, 0, SelectionTier::Fallback, Some(reason), None));
        };

        let shortlist: Vec<Candidate> = ranked.iter().take(self.shortlist.max(1)).cloned().collect();
        let shortlist_len = shortlist.len();
        let answer = consult_arbiter(arbiter, request, shortlist, self.arbiter_timeout).and_then(|index| {
            if index < shortlist_len {
                Ok(index)
            } else {
                Err(ArbiterError::InvalidResponse(format!(
                    "index {index} outside shortlist of {shortlist_len}"
                )))
            }
        });

        match answer {
            Ok(index) => Ok(self.pick(ranked, index, SelectionTier::Arbiter, Some(reason), None)),
            Err(err) => {
                log::warn!("Arbiter failed ({err}); falling back to top candidate {top}");
                Ok(self.pick(ranked, 0, SelectionTier::Fallback, Some(reason), Some(err)))
            }
        }
    }

    /// Why `ranked` needs an arbiter, or `None` if the top candidate should
    /// simply be taken.
    #[must_use]
    pub fn escalation_reason(&self, ranked: &RankedResultList, request: &ParsedRequest) -> Option<EscalationReason> {
        let candidates = ranked.as_slice();
        let (top, second) = match candidates {
            [top, second, ..] => (top, second),
            _ => return None,
        };
        if top.score - second.score >= self.margin - SCORE_EPSILON {
            return None;
        }

        let within_margin = |candidate: &Candidate| top.score - candidate.score < self.margin - SCORE_EPSILON;

        if candidates.len() >= 3 && candidates[..3].iter().all(within_margin) {
            return Some(EscalationReason::TightTopThree);
        }

        let strong = candidates
            .iter()
            .filter(|c| c.score >= self.strong_match - SCORE_EPSILON)
            .count();
        if strong >= 3 {
            return Some(EscalationReason::CrowdedStrongMatches);
        }

        if !request.preferences().is_empty() {
            let adjusted = candidates
                .iter()
                .take_while(|c| within_margin(*c))
                .filter(|c| c.breakdown.version != 0.0)
                .count();
            if adjusted > 1 {
                return Some(EscalationReason::PreferenceContention);
            }
        }

        None
    }

    fn pick(
        &self,
        ranked: &RankedResultList,
        rank: usize,
        tier: SelectionTier,
        escalation: Option<EscalationReason>,
        arbiter_error: Option<ArbiterError>,
    ) -> Selection {
        // Callers only pass 0 or an index already checked against the list.
        let candidate = ranked.as_slice()[rank].clone();
        log::info!("Selected {candidate} (score {:.3}, {tier})", candidate.score);
        Selection {
            candidate,
            rank,
            tier,
            escalation,
            arbiter_error,
        }
    }
}

/// Ask `arbiter` on a worker thread and wait at most `timeout`.
///
/// A worker that overruns is left to finish on its own; its answer is
/// discarded. [`CommandArbiter`](crate::arbiter::CommandArbiter) kills its
/// child process at the same deadline.
pub fn consult_arbiter(
    arbiter: &Arc<dyn Arbiter>,
    request: &ParsedRequest,
    shortlist: Vec<Candidate>,
    timeout: Duration,
) -> Result<usize, ArbiterError> {
    let (tx, rx) = mpsc::channel();
    let arbiter = Arc::clone(arbiter);
    let request = request.clone();

    thread::Builder::new()
        .name("muse-arbiter".to_string())
        .spawn(move || {
            let answer = arbiter.select(&request, &shortlist);
            // Receiver is gone after a timeout.
            let _ = tx.send(answer);
        })
        .map_err(|e| ArbiterError::Unavailable(format!("could not start arbiter thread: {e}")))?;

    match rx.recv_timeout(timeout) {
        Ok(answer) => answer,
        Err(mpsc::RecvTimeoutError::Timeout) => Err(ArbiterError::Timeout(timeout)),
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            Err(ArbiterError::Unavailable("arbiter thread exited without answering".to_string()))
        }
    }
}
