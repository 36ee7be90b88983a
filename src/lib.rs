//! Natural-language music request resolver.
//!
//! Turns "I'd like to hear a live version of Neil Young's Harvest" into one
//! playable track from a music catalog.
//!
//! Core modules:
//! - [`request`] - Request parsing into title, artist and version preferences
//! - [`strategy`] - Ordered catalog query plans
//! - [`normalize`] - Raw catalog entries to tagged candidates
//! - [`algorithm`] - Candidate scoring and ranking
//! - [`selection`] - Winner selection with optional arbiter escalation
//! - [`resolver`] - The pipeline tying it all together
//!
//! ### Backends
//!
//! - [`catalog`] - Catalog search interface
//! - [`mpd_client`] - MPD search and playback via `mpc`
//! - [`library`] - Search over a muse SQLite music library
//! - [`playback`] - Playback interface
//! - [`arbiter`] - External-command arbiter
//!
//! ### Supporting Modules
//!
//! - [`config`] - Configuration file and data directory locations
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//! - [`error`] - Error types
//!
//! ## Quick Start Example
//!
//! ```
//! use muse_resolver::catalog::{CatalogEntry, CatalogResponse};
//! use muse_resolver::resolver::Resolver;
//! use muse_resolver::selection::SelectionTier;
//!
//! let resolver = Resolver::new(|query: &str| {
//!     if query.contains("harvest") {
//!         CatalogResponse::Entries(vec![
//!             CatalogEntry::new("Harvest", "Neil Young", "Harvest", "neil/harvest.flac"),
//!             CatalogEntry::new("Harvest (Live)", "Neil Young", "Tuscaloosa (Live)", "neil/tuscaloosa.flac"),
//!         ])
//!     } else {
//!         CatalogResponse::Entries(Vec::new())
//!     }
//! });
//!
//! let resolution = resolver.resolve("play a live version of neil young's harvest")?;
//! assert_eq!(resolution.candidate().source_identifier, "neil/tuscaloosa.flac");
//! assert_eq!(resolution.tier(), SelectionTier::Deterministic);
//! # Ok::<(), muse_resolver::error::ResolutionError>(())
//! ```
//!
//! ## Scoring
//!
//! Each candidate's score is the sum of:
//! - title similarity (normalized Levenshtein, weight 1.0)
//! - +0.5 for a matching artist, -0.2 for a clearly different one
//! - +0.3 per satisfied version preference, -0.1 when the opposite version
//!   is present
//! - without preferences, a small studio bonus and remaster penalty
//!
//! A candidate leading by 0.25 or more wins outright. Tighter fields may be
//! handed to an [`Arbiter`](selection::Arbiter); its failures always fall back
//! to the top-ranked candidate.
//!
//! ## Error Handling
//!
//! Library operations return typed errors from [`error`]. Only
//! [`ResolutionError`](error::ResolutionError) reaches callers of the
//! resolver; malformed catalog responses and arbiter failures are absorbed
//! and logged.
//!
//! ## Logging
//!
//! All modules log through the `log` facade. The binary initializes
//! `env_logger`:
//!
//! ```bash
//! RUST_LOG=muse_resolver::resolver=debug muse-resolver resolve harvest by neil young
//! ```

pub mod algorithm;
pub mod arbiter;
pub mod catalog;
pub mod cli;
pub mod completion;
pub mod config;
pub mod error;
pub mod library;
pub mod mpd_client;
pub mod normalize;
pub mod playback;
pub mod request;
pub mod resolver;
pub mod selection;
pub mod strategy;
