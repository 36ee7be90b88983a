//! # muse-resolver
//!
//! Resolves a free-text music request against MPD or a muse music library,
//! and optionally plays the result.
//!
//! ## Usage
//!
//! ```bash
//! # Resolve and play
//! muse-resolver resolve --play "i'd like to hear a live version of neil young's harvest"
//!
//! # See why a track was chosen
//! muse-resolver resolve --verbose harvest by neil young
//!
//! # Inspect the pipeline stages
//! muse-resolver parse fixing her hair by ani difranco
//! muse-resolver plan fixing her hair by ani difranco
//! muse-resolver search harvest neil young
//! ```

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use muse_resolver::arbiter::CommandArbiter;
use muse_resolver::catalog::{CatalogResponse, CatalogSearch};
use muse_resolver::cli::{self, Args};
use muse_resolver::completion;
use muse_resolver::config::{self, CatalogKind, RuntimeConfig};
use muse_resolver::library::LibraryCatalog;
use muse_resolver::mpd_client::MpdClient;
use muse_resolver::normalize::normalize_batch;
use muse_resolver::request::parse_request;
use muse_resolver::resolver::{Resolution, Resolver};
use muse_resolver::strategy::plan_queries;
use std::io;
use std::time::Duration;

/// Main entry point.
///
/// Initializes environment logger which can be controlled via `RUST_LOG`:
/// - `RUST_LOG=debug muse-resolver resolve ...` - Enable debug logging
/// - `RUST_LOG=muse_resolver::selection=debug muse-resolver resolve ...` - Module-specific logging
fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut runtime = match &args.config_file {
        Some(path) => RuntimeConfig::load_from(path)?,
        None => RuntimeConfig::load()?,
    };
    args.apply_overrides(&mut runtime);
    runtime.validate().context("Invalid command-line overrides")?;
    debug!("Effective configuration: {runtime:?}");

    match &args.command {
        cli::Command::Resolve { request, play, verbose, json } => {
            let raw = request.join(" ");
            let resolver = build_resolver(&runtime)?;

            let outcome = if *play {
                let player = mpd_client(&runtime);
                resolver.resolve_and_play(&raw, &player)
            } else {
                resolver.resolve(&raw)
            };
            let resolution = outcome.with_context(|| format!("Could not resolve {raw:?}"))?;

            if *json {
                println!("{}", serde_json::to_string_pretty(&resolution)?);
            } else {
                print_resolution(&resolution, *verbose);
            }
            if *play {
                info!("Playback started for {}", resolution.candidate());
            }
        }
        cli::Command::Parse { request } => {
            let parsed = parse_request(&request.join(" "))?;
            println!("title:       {}", parsed.title());
            println!("artist:      {}", parsed.artist().unwrap_or("-"));
            println!("album:       {}", parsed.album().unwrap_or("-"));
            let preferences: Vec<String> = parsed.preferences().iter().map(ToString::to_string).collect();
            println!(
                "preferences: {}",
                if preferences.is_empty() { "-".to_string() } else { preferences.join(", ") }
            );
        }
        cli::Command::Plan { request } => {
            let parsed = parse_request(&request.join(" "))?;
            for (i, query) in plan_queries(&parsed).iter().enumerate() {
                println!("{:>2}. {query}", i + 1);
            }
        }
        cli::Command::Search { query } => {
            let query = query.join(" ");
            let catalog = build_catalog(&runtime)?;
            match catalog.search(&query) {
                CatalogResponse::Malformed(reason) => {
                    anyhow::bail!("Catalog could not answer {query:?}: {reason}");
                }
                CatalogResponse::Entries(entries) => {
                    let candidates = normalize_batch(&entries, &query, 0);
                    println!("{} entries, {} usable candidates", entries.len(), candidates.len());
                    for candidate in candidates {
                        println!("  {candidate}  [{}]", candidate.tag_list());
                        println!("      {}", candidate.source_identifier);
                    }
                }
            }
        }
        cli::Command::Config => {
            println!("{}", serde_json::to_string_pretty(&runtime)?);
            if runtime.catalog == CatalogKind::Library {
                println!("library: {}", runtime.library_path()?.display());
            }
            let config_path = match &args.config_file {
                Some(path) => path.clone(),
                None => config::get_config_path()?,
            };
            println!("config file: {}", config_path.display());
        }
        cli::Command::Completion { shell } => {
            let mut cmd = Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(*shell),
                &mut cmd,
                &mut io::stdout(),
            );
        }
    }

    Ok(())
}

fn mpd_client(runtime: &RuntimeConfig) -> MpdClient {
    let mut client = MpdClient::new().with_clear_queue(runtime.clear_queue);
    if let Some(host) = &runtime.mpd_host {
        client = client.with_host(host.clone());
    }
    if let Some(port) = runtime.mpd_port {
        client = client.with_port(port);
    }
    client
}

fn build_catalog(runtime: &RuntimeConfig) -> Result<Box<dyn CatalogSearch>> {
    match runtime.catalog {
        CatalogKind::Mpd => {
            let client = mpd_client(runtime);
            client
                .check_connection()
                .context("Cannot search: MPD connection failed")?;
            Ok(Box::new(client))
        }
        CatalogKind::Library => {
            let path = runtime.library_path()?;
            let library = LibraryCatalog::open(&path)?;
            Ok(Box::new(library))
        }
    }
}

fn build_resolver(runtime: &RuntimeConfig) -> Result<Resolver> {
    let mut resolver = Resolver::from_boxed(build_catalog(runtime)?).with_config(runtime.to_resolver_config());
    if let Some(arbiter) = runtime.arbiter_command.as_deref().and_then(CommandArbiter::from_argv) {
        let arbiter = arbiter.with_timeout(Duration::from_secs(runtime.arbiter_timeout_secs));
        debug!("Using arbiter command {} with a {:?} deadline", arbiter.program(), arbiter.timeout());
        resolver = resolver.with_arbiter(arbiter);
    }
    Ok(resolver)
}

fn print_resolution(resolution: &Resolution, verbose: bool) {
    let winner = resolution.candidate();
    println!("{winner}");
    println!("  {}", winner.source_identifier);

    if !verbose {
        return;
    }

    println!();
    println!("request:   {}", resolution.request);
    match resolution.selection.escalation {
        Some(reason) => println!("selection: {} ({reason})", resolution.tier()),
        None => println!("selection: {}", resolution.tier()),
    }
    if let Some(err) = &resolution.selection.arbiter_error {
        println!("arbiter:   {err}");
    }

    println!();
    println!("queries ({} malformed):", resolution.malformed_queries());
    for attempt in &resolution.attempts {
        let marker = if attempt.fallback { "↳" } else { " " };
        match &attempt.malformed {
            Some(reason) => println!("  {marker} {:<40} malformed: {reason}", attempt.query),
            None => println!(
                "  {marker} {:<40} {} entries, {} new",
                attempt.query, attempt.entries, attempt.added
            ),
        }
    }

    println!();
    println!("candidates:");
    for (i, candidate) in resolution.ranked.iter().enumerate() {
        let b = candidate.breakdown;
        println!(
            "  {:>2}. {:>6.3}  {candidate}  [{}]",
            i + 1,
            candidate.score,
            candidate.tag_list()
        );
        println!(
            "       title {:.3}  artist {:+.2}  album {:+.2}  version {:+.2}  bias {:+.2}  via {:?}",
            b.title, b.artist, b.album, b.version, b.bias, candidate.origin_query
        );
    }
}
