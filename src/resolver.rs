//! # Resolver
//!
//! Drives one request through the whole pipeline:
//!
//! ```text
//! raw text ─► parse_request ─► plan_queries ─► catalog search (per query)
//!                                                 │
//!                                 normalize_batch ◄┘   (pooled, deduplicated)
//!                                        │
//!                 RankedResultList::rank ┘─► SelectionPolicy::select ─► Resolution
//! ```
//!
//! Each step is recorded as a [`ResolveState`] transition and logged at
//! `debug`, so `RUST_LOG=muse_resolver::resolver=debug` shows the full path a
//! request took.
//!
//! Malformed catalog responses count as empty results. When a planned query
//! comes back malformed, a few simplified variants of it are tried right
//! after it before the plan continues.

use crate::algorithm::{RankedResultList, ScoringContext};
use crate::catalog::{CatalogResponse, CatalogSearch};
use crate::error::ResolutionError;
use crate::normalize::{normalize_batch, Candidate};
use crate::playback::Playback;
use crate::request::{parse_request, ParsedRequest};
use crate::selection::{Arbiter, Selection, SelectionPolicy, SelectionTier};
use crate::strategy::{plan_queries, simplified_queries};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Runtime limits of the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Pool size at which querying stops.
    pub candidate_cap: usize,
    /// Simplified variants tried per malformed planned query.
    pub max_fallback_queries: usize,
    pub selection: SelectionPolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            candidate_cap: 50,
            max_fallback_queries: 3,
            selection: SelectionPolicy::default(),
        }
    }
}

/// Resolution lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ResolveState {
    Idle,
    Searching { attempt: usize, query: String },
    Normalizing { query: String, entries: usize },
    Scoring { pool: usize },
    Selecting,
    Done,
    Failed,
}

impl fmt::Display for ResolveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::Searching { attempt, query } => write!(f, "Searching({attempt}: {query:?})"),
            Self::Normalizing { query, entries } => write!(f, "Normalizing({entries} entries from {query:?})"),
            Self::Scoring { pool } => write!(f, "Scoring({pool} candidates)"),
            Self::Selecting => write!(f, "Selecting"),
            Self::Done => write!(f, "Done"),
            Self::Failed => write!(f, "Failed"),
        }
    }
}

/// One catalog query as it was actually issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryAttempt {
    pub query: String,
    /// Raw entries returned.
    pub entries: usize,
    /// Candidates that made it into the pool.
    pub added: usize,
    /// Catalog's reason when the response was malformed.
    pub malformed: Option<String>,
    /// True for simplified variants of a malformed query.
    pub fallback: bool,
}

/// Everything known about a successful resolution.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub request: ParsedRequest,
    pub selection: Selection,
    pub attempts: Vec<QueryAttempt>,
    pub ranked: RankedResultList,
    pub trace: Vec<ResolveState>,
}

impl Resolution {
    #[must_use]
    pub fn candidate(&self) -> &Candidate {
        &self.selection.candidate
    }

    #[must_use]
    pub fn tier(&self) -> SelectionTier {
        self.selection.tier
    }

    pub fn queries_tried(&self) -> impl Iterator<Item = &str> {
        self.attempts.iter().map(|a| a.query.as_str())
    }

    #[must_use]
    pub fn malformed_queries(&self) -> usize {
        self.attempts.iter().filter(|a| a.malformed.is_some()).count()
    }
}

/// Resolves free-text requests against one catalog.
///
/// Holds no per-request state; a single resolver can serve any number of
/// requests.
pub struct Resolver {
    catalog: Box<dyn CatalogSearch>,
    arbiter: Option<Arc<dyn Arbiter>>,
    config: ResolverConfig,
    scoring: ScoringContext,
}

impl Resolver {
    pub fn new(catalog: impl CatalogSearch + 'static) -> Self {
        Self::from_boxed(Box::new(catalog))
    }

    /// Resolver over a catalog chosen at runtime.
    #[must_use]
    pub fn from_boxed(catalog: Box<dyn CatalogSearch>) -> Self {
        Self {
            catalog,
            arbiter: None,
            config: ResolverConfig::default(),
            scoring: ScoringContext::default(),
        }
    }

    #[must_use]
    pub fn with_arbiter(self, arbiter: impl Arbiter + 'static) -> Self {
        self.with_shared_arbiter(Arc::new(arbiter))
    }

    #[must_use]
    pub fn with_shared_arbiter(mut self, arbiter: Arc<dyn Arbiter>) -> Self {
        self.arbiter = Some(arbiter);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    #[must_use]
    pub fn has_arbiter(&self) -> bool {
        self.arbiter.is_some()
    }

    /// Parse and resolve a free-text request.
    ///
    /// # Errors
    ///
    /// - [`ResolutionError::ParseAmbiguous`] when no title can be isolated;
    ///   the catalog is not queried.
    /// - [`ResolutionError::NoMatch`] when no query produced a usable
    ///   candidate.
    pub fn resolve(&self, raw_request: &str) -> Result<Resolution, ResolutionError> {
        let request = parse_request(raw_request)?;
        self.resolve_request(request)
    }

    /// Resolve an already parsed request.
    ///
    /// # Errors
    ///
    /// [`ResolutionError::NoMatch`] when no query produced a usable candidate.
    pub fn resolve_request(&self, request: ParsedRequest) -> Result<Resolution, ResolutionError> {
        let mut trace = Trace::default();
        let planned = plan_queries(&request).into_queries();

        let mut pending: VecDeque<(String, bool)> = planned.iter().map(|q| (q.clone(), false)).collect();
        let mut queued: HashSet<String> = planned.into_iter().collect();
        let mut pool: Vec<Candidate> = Vec::new();
        let mut pooled_ids: HashSet<String> = HashSet::new();
        let mut attempts: Vec<QueryAttempt> = Vec::new();

        while let Some((query, fallback)) = pending.pop_front() {
            if pool.len() >= self.config.candidate_cap {
                debug!("Candidate cap of {} reached; skipping remaining queries", self.config.candidate_cap);
                break;
            }

            let query_rank = attempts.len();
            trace.enter(ResolveState::Searching {
                attempt: query_rank,
                query: query.clone(),
            });

            match self.catalog.search(&query) {
                CatalogResponse::Malformed(reason) => {
                    warn!("Catalog returned a malformed response for {query:?}: {reason}");
                    if !fallback {
                        let variants: Vec<String> = simplified_queries(&query)
                            .into_iter()
                            .filter(|variant| !queued.contains(variant))
                            .take(self.config.max_fallback_queries)
                            .collect();
                        if !variants.is_empty() {
                            debug!("Retrying {query:?} as {variants:?}");
                        }
                        for variant in variants.into_iter().rev() {
                            queued.insert(variant.clone());
                            pending.push_front((variant, true));
                        }
                    }
                    attempts.push(QueryAttempt {
                        query,
                        entries: 0,
                        added: 0,
                        malformed: Some(reason),
                        fallback,
                    });
                }
                CatalogResponse::Entries(entries) => {
                    trace.enter(ResolveState::Normalizing {
                        query: query.clone(),
                        entries: entries.len(),
                    });

                    let mut added = 0;
                    for candidate in normalize_batch(&entries, &query, query_rank) {
                        if pool.len() >= self.config.candidate_cap {
                            break;
                        }
                        if pooled_ids.insert(candidate.source_identifier.clone()) {
                            pool.push(candidate);
                            added += 1;
                        }
                    }
                    debug!("{query:?}: {} entries, {added} new candidates", entries.len());

                    attempts.push(QueryAttempt {
                        query,
                        entries: entries.len(),
                        added,
                        malformed: None,
                        fallback,
                    });
                }
            }
        }

        if pool.is_empty() {
            trace.enter(ResolveState::Failed);
            info!("No match for {request} after {} queries", attempts.len());
            return Err(ResolutionError::NoMatch {
                title: request.title().to_string(),
                queries_tried: attempts.into_iter().map(|a| a.query).collect(),
            });
        }

        trace.enter(ResolveState::Scoring { pool: pool.len() });
        let ranked = RankedResultList::rank(pool, &request, &self.scoring);

        trace.enter(ResolveState::Selecting);
        let selection = self
            .config
            .selection
            .select(&ranked, &request, self.arbiter.as_ref())?;

        trace.enter(ResolveState::Done);
        Ok(Resolution {
            request,
            selection,
            attempts,
            ranked,
            trace: trace.into_states(),
        })
    }

    /// Resolve, then hand the winner to `playback` once.
    ///
    /// # Errors
    ///
    /// Everything [`resolve`](Self::resolve) returns, plus
    /// [`ResolutionError::Playback`] when the player refuses the track.
    pub fn resolve_and_play(&self, raw_request: &str, playback: &dyn Playback) -> Result<Resolution, ResolutionError> {
        let resolution = self.resolve(raw_request)?;
        playback.play(&resolution.candidate().source_identifier)?;
        Ok(resolution)
    }
}

#[derive(Default)]
struct Trace {
    states: Vec<ResolveState>,
}

impl Trace {
    fn enter(&mut self, state: ResolveState) {
        let previous = self.states.last().unwrap_or(&ResolveState::Idle);
        debug!("{previous} -> {state}");
        if self.states.is_empty() {
            self.states.push(ResolveState::Idle);
        }
        self.states.push(state);
    }

    fn into_states(self) -> Vec<ResolveState> {
        self.states
    }
}
