//! # Configuration Module
//!
//! Runtime configuration for the resolver and its backends.
//!
//! ## Locations
//!
//! The configuration file lives in the platform-standard config directory:
//! - Linux: `~/.config/muse/resolver.json`
//! - macOS: `~/Library/Application Support/muse/resolver.json`
//! - Windows: `%APPDATA%\muse\resolver.json`
//!
//! A missing file is not an error; every field has a default. The muse music
//! library defaults to `<data_dir>/muse/music.db`, the same database the rest
//! of muse maintains.
//!
//! ## Example
//!
//! ```json
//! {
//!   "catalog": "library",
//!   "mpd_host": "music.local",
//!   "arbiter_command": ["llm", "-m", "claude-3.5-haiku"],
//!   "arbiter_timeout_secs": 10
//! }
//! ```

use crate::resolver::ResolverConfig;
use crate::selection::SelectionPolicy;
use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Which catalog backend answers searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    /// Search the MPD database through `mpc`.
    #[default]
    Mpd,
    /// Search the muse SQLite library directly.
    Library,
}

/// Returns the platform-appropriate muse data directory.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().ok_or_else(|| {
        anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        )
    })?;
    Ok(data_dir.join("muse"))
}

/// Returns the default music library path, `<data_dir>/muse/music.db`.
///
/// # Errors
///
/// Returns an error if the system data directory cannot be determined.
pub fn get_db_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("music.db"))
}

/// Returns the default configuration file path.
///
/// # Errors
///
/// Returns an error if the system config directory cannot be determined.
pub fn get_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine system config directory."))?;
    Ok(config_dir.join("muse").join("resolver.json"))
}

/// Configuration for runtime behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub catalog: CatalogKind,
    /// Music library for the `library` catalog. `None` means the default path.
    pub library_path: Option<PathBuf>,
    /// MPD host; `None` leaves it to mpc (`MPD_HOST` or localhost).
    pub mpd_host: Option<String>,
    pub mpd_port: Option<u16>,
    pub candidate_cap: usize,
    pub max_fallback_queries: usize,
    /// Full argv of the arbiter command. No arbiter when unset.
    pub arbiter_command: Option<Vec<String>>,
    pub arbiter_timeout_secs: u64,
    pub arbiter_shortlist: usize,
    /// Replace the MPD queue instead of appending when playing.
    pub clear_queue: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let resolver = ResolverConfig::default();
        Self {
            catalog: CatalogKind::default(),
            library_path: None,
            mpd_host: None,
            mpd_port: None,
            candidate_cap: resolver.candidate_cap,
            max_fallback_queries: resolver.max_fallback_queries,
            arbiter_command: None,
            arbiter_timeout_secs: resolver.selection.arbiter_timeout.as_secs(),
            arbiter_shortlist: resolver.selection.shortlist,
            clear_queue: false,
        }
    }
}

impl RuntimeConfig {
    /// Load from the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Load from `path`; defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// holds invalid values.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No configuration at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Reject values the resolver cannot work with.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.candidate_cap == 0 {
            anyhow::bail!("candidate_cap must be at least 1");
        }
        if self.arbiter_shortlist == 0 {
            anyhow::bail!("arbiter_shortlist must be at least 1");
        }
        if self.arbiter_timeout_secs == 0 {
            anyhow::bail!("arbiter_timeout_secs must be at least 1");
        }
        if matches!(&self.arbiter_command, Some(argv) if argv.is_empty()) {
            anyhow::bail!("arbiter_command must name a program");
        }
        Ok(())
    }

    /// Library path, falling back to the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if no path is configured and the system data
    /// directory cannot be determined.
    pub fn library_path(&self) -> Result<PathBuf> {
        match &self.library_path {
            Some(path) => Ok(path.clone()),
            None => get_db_path(),
        }
    }

    #[must_use]
    pub fn to_resolver_config(&self) -> ResolverConfig {
        ResolverConfig {
            candidate_cap: self.candidate_cap,
            max_fallback_queries: self.max_fallback_queries,
            selection: SelectionPolicy {
                shortlist: self.arbiter_shortlist,
                arbiter_timeout: Duration::from_secs(self.arbiter_timeout_secs),
                ..SelectionPolicy::default()
            },
        }
    }
}
