//! # Command-Line Interface Module
//!
//! Clap derive definitions for the `muse-resolver` binary.
//!
//! ## Commands
//!
//! - `resolve`: Resolve a request to one track, optionally play it
//! - `parse`: Show how a request is understood
//! - `plan`: Show the catalog queries a request produces
//! - `search`: Run one raw catalog query
//! - `config`: Print the effective configuration
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! muse-resolver resolve --play "a live version of neil young's harvest"
//! muse-resolver --catalog library plan fixing her hair by ani difranco
//! muse-resolver search harvest neil young
//! ```

use crate::config::{CatalogKind, RuntimeConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Global flags override the configuration file for a single invocation.
#[derive(Parser, Debug)]
#[command(name = "muse-resolver")]
#[command(about = "Resolve natural-language music requests to playable tracks")]
#[command(version)]
pub struct Args {
    /// Catalog backend to search
    #[arg(long, global = true, value_enum)]
    pub catalog: Option<CatalogKind>,

    /// Music library database (for `--catalog library`)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub library: Option<PathBuf>,

    /// MPD host
    #[arg(long, global = true, env = "MPD_HOST")]
    pub mpd_host: Option<String>,

    /// MPD port
    #[arg(long, global = true, env = "MPD_PORT")]
    pub mpd_port: Option<u16>,

    /// Arbiter command line, e.g. "llm -m claude-3.5-haiku"
    ///
    /// Split on whitespace. The command receives a selection prompt on stdin
    /// and must print a 1-based position.
    #[arg(long, global = true, value_hint = clap::ValueHint::CommandString)]
    pub arbiter_command: Option<String>,

    /// Never consult an arbiter, even if one is configured
    #[arg(long, global = true, conflicts_with = "arbiter_command")]
    pub no_arbiter: bool,

    /// Configuration file (default: <config_dir>/muse/resolver.json)
    #[arg(long, global = true, value_hint = clap::ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Args {
    /// Fold command-line overrides into `config`.
    pub fn apply_overrides(&self, config: &mut RuntimeConfig) {
        if let Some(catalog) = self.catalog {
            config.catalog = catalog;
        }
        if let Some(library) = &self.library {
            config.library_path = Some(library.clone());
        }
        if let Some(host) = &self.mpd_host {
            config.mpd_host = Some(host.clone());
        }
        if let Some(port) = self.mpd_port {
            config.mpd_port = Some(port);
        }
        if let Some(command) = &self.arbiter_command {
            let argv: Vec<String> = command.split_whitespace().map(str::to_string).collect();
            if !argv.is_empty() {
                config.arbiter_command = Some(argv);
            }
        }
        if self.no_arbiter {
            config.arbiter_command = None;
        }
    }
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve a request to a single track
    ///
    /// Parses the request, searches the catalog with several query variants,
    /// scores every candidate and prints the winner.
    Resolve {
        /// The request, e.g. "a live version of neil young's harvest"
        #[arg(required = true, num_args = 1.., value_hint = clap::ValueHint::Other)]
        request: Vec<String>,

        /// Start playback of the winner through MPD
        #[arg(long)]
        play: bool,

        /// Show queries, ranked candidates and score breakdowns
        #[arg(short, long)]
        verbose: bool,

        /// Print the full resolution as JSON
        #[arg(long, conflicts_with = "verbose")]
        json: bool,
    },

    /// Show the parsed title, artist and version preferences
    Parse {
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },

    /// Show the ordered catalog queries for a request
    Plan {
        #[arg(required = true, num_args = 1..)]
        request: Vec<String>,
    },

    /// Run one raw catalog query and list the normalized candidates
    Search {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Print the effective configuration as JSON
    Config,

    /// Generate shell completions
    ///
    /// Usage: muse-resolver completion bash > ~/.local/share/bash-completion/completions/muse-resolver
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_resolve_joins_words() {
        let args = Args::try_parse_from(["muse-resolver", "resolve", "--play", "harvest", "by", "neil", "young"])
            .expect("parse");
        match args.command {
            Command::Resolve { request, play, verbose, json } => {
                assert_eq!(request.join(" "), "harvest by neil young");
                assert!(play);
                assert!(!verbose);
                assert!(!json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_resolve_requires_request() {
        assert!(Args::try_parse_from(["muse-resolver", "resolve"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = Args::try_parse_from([
            "muse-resolver",
            "plan",
            "harvest",
            "--catalog",
            "library",
            "--library",
            "/tmp/music.db",
        ])
        .expect("parse");
        assert_eq!(args.catalog, Some(CatalogKind::Library));
        assert_eq!(args.library, Some(PathBuf::from("/tmp/music.db")));
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "muse-resolver",
            "--catalog",
            "library",
            "--mpd-port",
            "6601",
            "--arbiter-command",
            "llm -m haiku",
            "config",
        ])
        .expect("parse");

        let mut config = RuntimeConfig::default();
        args.apply_overrides(&mut config);
        assert_eq!(config.catalog, CatalogKind::Library);
        assert_eq!(config.mpd_port, Some(6601));
        assert_eq!(
            config.arbiter_command,
            Some(vec!["llm".to_string(), "-m".to_string(), "haiku".to_string()])
        );
    }

    #[test]
    fn test_no_arbiter_clears_configured_command() {
        let args = Args::try_parse_from(["muse-resolver", "--no-arbiter", "config"]).expect("parse");
        let mut config = RuntimeConfig {
            arbiter_command: Some(vec!["llm".to_string()]),
            ..RuntimeConfig::default()
        };
        args.apply_overrides(&mut config);
        assert_eq!(config.arbiter_command, None);
    }

    #[test]
    fn test_no_arbiter_conflicts_with_command() {
        assert!(Args::try_parse_from(["muse-resolver", "--no-arbiter", "--arbiter-command", "llm", "config"]).is_err());
    }
}
