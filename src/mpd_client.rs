//! # MPD Client Module
//!
//! Catalog search and playback against Music Player Daemon (MPD) through the
//! `mpc` command-line client.
//!
//! ## Design Decision: mpc vs Direct Protocol
//!
//! This implementation uses the `mpc` command-line tool instead of direct MPD
//! protocol communication:
//! - No need to implement MPD protocol parsing
//! - mpc is well-tested and handles connection edge cases
//! - Works with any MPD version that mpc supports
//!
//! ## Searching
//!
//! Every query word becomes an `any <word>` pair, which MPD ANDs together:
//!
//! ```text
//! "harvest neil young"
//!   → mpc --format "[%title%]\t[%artist%]\t[%album%]\t%file%" search any harvest any neil any young
//! ```
//!
//! Output lines are tab-separated `title, artist, album, file`; `file` is the
//! MPD-relative path and becomes the candidate's source identifier.
//!
//! ## Playback
//!
//! `mpc add <file>` appends the track (after `mpc clear` when configured),
//! then `mpc play <n>` starts the newly added queue position.
//!
//! ## Error Handling
//!
//! Search never fails: a missing `mpc`, an unreachable daemon or a rejected
//! query all come back as [`CatalogResponse::Malformed`]. Playback failures
//! are reported as [`PlaybackError`] and surfaced by the resolver.

use crate::catalog::{CatalogEntry, CatalogResponse, CatalogSearch};
use crate::error::PlaybackError;
use crate::playback::Playback;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::process::{Command, Output};

/// `mpc --format` template for search output.
const SEARCH_FORMAT: &str = "[%title%]\t[%artist%]\t[%album%]\t%file%";

/// Handle on one MPD instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MpdClient {
    host: Option<String>,
    port: Option<u16>,
    clear_queue: bool,
}

impl MpdClient {
    /// Client for mpc's own default (`MPD_HOST`/`MPD_PORT` or localhost:6600).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Replace the queue instead of appending to it.
    #[must_use]
    pub fn with_clear_queue(mut self, clear_queue: bool) -> Self {
        self.clear_queue = clear_queue;
        self
    }

    /// Verifies MPD and mpc availability.
    ///
    /// Runs `mpc version`, which only succeeds when mpc is installed and the
    /// daemon is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if mpc is not installed or MPD cannot be reached.
    pub fn check_connection(&self) -> Result<()> {
        let output = self
            .command(&["version"])
            .output()
            .context("Failed to execute mpc command. Please install mpc (MPD client)")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "Failed to connect to MPD at {}.\nError: {}",
                self.describe_target(),
                stderr.trim()
            );
        }
        Ok(())
    }

    /// `mpc` argv (without the program name) for searching `query`.
    #[must_use]
    pub fn search_args(query: &str) -> Vec<String> {
        let mut args = vec!["--format".to_string(), SEARCH_FORMAT.to_string(), "search".to_string()];
        for word in query.split_whitespace() {
            args.push("any".to_string());
            args.push(word.to_string());
        }
        args
    }

    fn command<S: AsRef<std::ffi::OsStr>>(&self, args: &[S]) -> Command {
        let mut command = Command::new("mpc");
        if let Some(host) = &self.host {
            command.arg("--host").arg(host);
        }
        if let Some(port) = self.port {
            command.arg("--port").arg(port.to_string());
        }
        command.args(args);
        command
    }

    fn describe_target(&self) -> String {
        format!(
            "{}:{}",
            self.host.as_deref().unwrap_or("localhost"),
            self.port.unwrap_or(6600)
        )
    }

    /// Run one playback step, mapping failures onto [`PlaybackError`].
    fn run_playback_step(&self, args: &[&str], identifier: &str) -> Result<Output, PlaybackError> {
        let output = self
            .command(args)
            .output()
            .map_err(|e| PlaybackError::Unavailable(format!("failed to execute mpc: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(PlaybackError::Rejected {
                identifier: identifier.to_string(),
                reason: format!("mpc {} failed: {}", args.join(" "), stderr.trim()),
            });
        }
        Ok(output)
    }
}

impl CatalogSearch for MpdClient {
    fn search(&self, query: &str) -> CatalogResponse {
        if query.split_whitespace().next().is_none() {
            return CatalogResponse::Malformed("empty query".to_string());
        }

        debug!("Searching MPD for {query:?}");
        let args = Self::search_args(query);
        let output = match self.command(&args[..]).output() {
            Ok(output) => output,
            Err(e) => return CatalogResponse::Malformed(format!("failed to execute mpc: {e}")),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return CatalogResponse::Malformed(format!("mpc search failed: {}", stderr.trim()));
        }

        let entries = parse_search_output(&String::from_utf8_lossy(&output.stdout));
        debug!("MPD returned {} entries for {query:?}", entries.len());
        CatalogResponse::Entries(entries)
    }
}

impl Playback for MpdClient {
    fn play(&self, source_identifier: &str) -> Result<(), PlaybackError> {
        if self.clear_queue {
            self.run_playback_step(&["clear"], source_identifier)?;
        }

        self.run_playback_step(&["add", source_identifier], source_identifier)?;

        // The track just added is the last queue entry.
        let playlist = self.run_playback_step(&["playlist"], source_identifier)?;
        let position = String::from_utf8_lossy(&playlist.stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .count()
            .max(1);

        let position_arg = position.to_string();
        self.run_playback_step(&["play", position_arg.as_str()], source_identifier)?;
        info!("Playing {source_identifier} at queue position {position}");
        Ok(())
    }
}

/// Parse `mpc search` output produced with the search format.
///
/// Empty fields become `None`. Lines without the expected four fields are
/// skipped.
#[must_use]
pub fn parse_search_output(stdout: &str) -> Vec<CatalogEntry> {
    stdout
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 4 {
                warn!("Skipping unexpected mpc output line: {line:?}");
                return None;
            }
            let field = |i: usize| Some(fields[i].trim()).filter(|f| !f.is_empty()).map(str::to_string);
            Some(CatalogEntry {
                title: field(0),
                artist: field(1),
                album: field(2),
                uri: field(3),
                item_id: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_output() {
        let stdout = "Harvest\tNeil Young\tHarvest\tNeil Young/Harvest/05 Harvest.flac\n\
                      Harvest (Live)\tNeil Young & Stray Gators\tTuscaloosa (Live)\tNeil Young/Tuscaloosa/07 Harvest.flac\n";
        let entries = parse_search_output(stdout);

        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0],
            CatalogEntry::new("Harvest", "Neil Young", "Harvest", "Neil Young/Harvest/05 Harvest.flac")
        );
        assert_eq!(entries[1].album.as_deref(), Some("Tuscaloosa (Live)"));
    }

    #[test]
    fn test_parse_search_output_missing_tags() {
        let stdout = "\t\t\tincoming/untagged.mp3\nFixing Her Hair\t\t\tani/fixing.mp3\n";
        let entries = parse_search_output(stdout);

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, None);
        assert_eq!(entries[0].uri.as_deref(), Some("incoming/untagged.mp3"));
        assert_eq!(entries[1].title.as_deref(), Some("Fixing Her Hair"));
        assert_eq!(entries[1].artist, None);
    }

    #[test]
    fn test_parse_search_output_skips_garbage() {
        let entries = parse_search_output("error: Connection refused\n\n");
        assert!(entries.is_empty());
    }

    #[test]
    fn test_search_args() {
        assert_eq!(
            MpdClient::search_args("harvest  neil young"),
            vec!["--format", SEARCH_FORMAT, "search", "any", "harvest", "any", "neil", "any", "young"]
        );
    }

    #[test]
    fn test_empty_query_is_malformed() {
        assert!(MpdClient::new().search("   ").is_malformed());
    }

    #[test]
    fn test_command_carries_connection() {
        let client = MpdClient::new().with_host("music.local").with_port(6601);
        let command = client.command(&["status"]);
        let args: Vec<String> = command
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(args, vec!["--host", "music.local", "--port", "6601", "status"]);
        assert_eq!(client.describe_target(), "music.local:6601");
        assert_eq!(MpdClient::new().describe_target(), "localhost:6600");
    }
}
