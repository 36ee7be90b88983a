//! # Error Types
//!
//! Only [`ResolutionError`] ever reaches a caller of the resolver. Catalog and
//! arbiter defects are absorbed inside the resolver and only show up in logs
//! and in the [`Resolution`](crate::resolver::Resolution) diagnostics.

use std::time::Duration;
use thiserror::Error;

/// Terminal failures of a single resolution.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// No plausible song title could be isolated from the request.
    /// Raised before any catalog query is issued.
    #[error("could not make out a song title in {request:?}")]
    ParseAmbiguous { request: String },

    /// Every query in the plan came back without a usable candidate.
    #[error("no catalog match for {title:?} ({} queries tried)", .queries_tried.len())]
    NoMatch {
        title: String,
        queries_tried: Vec<String>,
    },

    /// The winning track was found but the player refused it.
    #[error("playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

/// Reasons the arbiter could not settle an ambiguous selection.
///
/// All of these fall back to the deterministic top candidate.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArbiterError {
    #[error("arbiter unavailable: {0}")]
    Unavailable(String),

    #[error("arbiter did not answer within {0:?}")]
    Timeout(Duration),

    #[error("arbiter gave an unusable answer: {0}")]
    InvalidResponse(String),
}

/// Failures reported by a [`Playback`](crate::playback::Playback) backend.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("player unavailable: {0}")]
    Unavailable(String),

    #[error("player rejected {identifier}: {reason}")]
    Rejected { identifier: String, reason: String },
}
