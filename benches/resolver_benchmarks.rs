//! # Resolver Performance Benchmarks
//!
//! Benchmarks for the hot paths of a resolution.
//!
//! ## Benchmark Categories
//!
//! - **Request Parsing**: Regex-heavy request parsing
//! - **Candidate Scoring**: Single-candidate scoring and pool ranking
//! - **Resolution**: Full pipeline against an in-memory catalog
//! - **Library Search**: `LIKE` search over an SQLite library
//!
//! ## Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench
//!
//! # Run specific benchmark group
//! cargo bench scoring
//! cargo bench library
//! ```

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use muse_resolver::algorithm::{calculate_score, RankedResultList, ScoringContext};
use muse_resolver::catalog::{CatalogEntry, CatalogResponse, CatalogSearch};
use muse_resolver::library::LibraryCatalog;
use muse_resolver::normalize::{normalize_batch, Candidate};
use muse_resolver::request::{parse_request, ParsedRequest, Preference};
use muse_resolver::resolver::Resolver;
use std::hint::black_box;
use std::path::PathBuf;
use tempfile::TempDir;

const VERSIONS: [&str; 5] = ["", " (Live)", " (2011 Remaster)", " - Acoustic", " [Explicit]"];

fn create_test_entries(count: usize) -> Vec<CatalogEntry> {
    (0..count)
        .map(|i| {
            let title = format!("Harvest{}", VERSIONS[i % VERSIONS.len()]);
            let artist = if i % 3 == 0 { "Neil Young" } else { "Tribute Band" };
            let album = format!("Album {:04}", i);
            CatalogEntry::new(&title, artist, &album, &format!("music/{i:04}.flac"))
        })
        .collect()
}

fn create_test_candidates(count: usize) -> Vec<Candidate> {
    normalize_batch(&create_test_entries(count), "harvest neil young", 0)
}

/// Library with `count` songs spread over 50 artists.
fn create_benchmark_library(count: usize) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("benchmark_music.db");

    let mut conn = rusqlite::Connection::open(&db_path).expect("Failed to open database");
    conn.execute(
        "CREATE TABLE songs (
            id INTEGER PRIMARY KEY,
            path TEXT NOT NULL UNIQUE,
            artist TEXT NOT NULL,
            album TEXT NOT NULL,
            title TEXT NOT NULL
        )",
        [],
    )
    .expect("Failed to create songs table");

    let tx = conn.transaction().expect("Failed to start transaction");
    {
        let mut stmt = tx
            .prepare("INSERT INTO songs (path, artist, album, title) VALUES (?1, ?2, ?3, ?4)")
            .expect("Failed to prepare insert");
        for i in 0..count {
            stmt.execute((
                format!("/music/artist{}/album{}/song{i:05}.flac", i % 50, i % 200),
                format!("Artist {}", i % 50),
                format!("Album {}", i % 200),
                format!("Song {i:05}"),
            ))
            .expect("Failed to insert song");
        }
    }
    tx.commit().expect("Failed to commit");

    (temp_dir, db_path)
}

fn benchmark_request_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_parsing");

    let requests = [
        "harvest by neil young",
        "I'd like to hear a live version of Neil Young's Harvest",
        "can you please play the acoustic version of wonderwall by oasis",
        "queen bohemian rhapsody",
    ];

    for (i, raw) in requests.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("parse_request", i), raw, |b, raw| {
            b.iter(|| parse_request(black_box(raw)))
        });
    }

    group.finish();
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoring");

    let context = ScoringContext::default();
    let request = ParsedRequest::new("harvest", Some("neil young"), [Preference::Live]);
    let candidate = create_test_candidates(2)[1].clone();

    group.bench_function("single_candidate_score", |b| {
        b.iter(|| calculate_score(black_box(&candidate), black_box(&request), black_box(&context)))
    });

    for size in [10, 50, 200, 1000].iter() {
        let pool = create_test_candidates(*size);
        group.bench_with_input(BenchmarkId::new("rank_pool", size), &pool, |b, pool| {
            b.iter_batched(
                || pool.clone(),
                |pool| RankedResultList::rank(black_box(pool), black_box(&request), black_box(&context)),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn benchmark_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let entries = create_test_entries(50);
    let resolver = Resolver::new(move |query: &str| {
        if query.contains("harvest") {
            CatalogResponse::Entries(entries.clone())
        } else {
            CatalogResponse::Entries(Vec::new())
        }
    });

    group.bench_function("resolve_live_harvest", |b| {
        b.iter(|| resolver.resolve(black_box("a live version of neil young's harvest")))
    });

    let malformed = Resolver::new(|query: &str| {
        if query.split_whitespace().count() > 2 {
            CatalogResponse::Malformed("bad request".to_string())
        } else {
            CatalogResponse::Entries(create_test_entries(5))
        }
    });

    group.bench_function("resolve_with_fallbacks", |b| {
        b.iter(|| malformed.resolve(black_box("fixing her hair by ani difranco")))
    });

    group.finish();
}

fn benchmark_library_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("library_search");

    let (_temp_dir, db_path) = create_benchmark_library(5000);
    let library = LibraryCatalog::open(&db_path).expect("Failed to open library");

    let queries = ["song 00050", "artist 5", "album 25 artist 25", "no such song anywhere"];
    for (i, query) in queries.iter().enumerate() {
        group.bench_with_input(BenchmarkId::new("search_query", i), query, |b, query| {
            b.iter(|| library.search(black_box(query)))
        });
    }

    group.finish();
}

// Group all benchmarks
criterion_group!(
    benches,
    benchmark_request_parsing,
    benchmark_scoring,
    benchmark_resolution,
    benchmark_library_search
);

criterion_main!(benches);
