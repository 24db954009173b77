//! End-to-end selection flow over fixture data: filter a venue's
//! performance history, deduplicate artists, and pick tracks with a
//! strategy. No network access; exercises the offline pipeline stages.

use chrono::NaiveDate;
use v2p_cli::filters::{ConfidenceFilter, DateRangeFilter, FilterChain};
use v2p_cli::pipeline::dedupe_by_artist;
use v2p_cli::strategies::{parse_strategy_count, resolve_strategy};
use v2p_common::models::{CatalogTrack, Metadata, Performance};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn performance(artist: &str, perf_date: Option<NaiveDate>, confidence: f64) -> Performance {
    Performance {
        artist_name: artist.to_string(),
        venue_name: "CBGB".to_string(),
        city: "New York".to_string(),
        country: Some("US".to_string()),
        performance_date: perf_date,
        performance_date_range: None,
        source_name: "setlist.fm".to_string(),
        source_reference: format!("https://www.setlist.fm/setlist/{}", artist),
        confidence_score: confidence,
        metadata: Metadata::new(),
    }
}

fn track(id: &str, name: &str, release: Option<&str>, popularity: u32) -> CatalogTrack {
    CatalogTrack {
        id: id.to_string(),
        name: name.to_string(),
        artist_name: "Television".to_string(),
        album_name: "Marquee Moon".to_string(),
        release_date: release.map(|s| s.to_string()),
        popularity,
    }
}

#[test]
fn venue_history_to_track_selection() {
    // A venue history with repeats, undated records, and low-confidence
    // records mixed in.
    let history = vec![
        performance("Television", Some(date(1977, 3, 10)), 1.0),
        performance("Blondie", Some(date(1977, 5, 2)), 1.0),
        performance("Television", Some(date(1978, 7, 14)), 1.0),
        performance("Ramones", None, 0.4),
        performance("Talking Heads", Some(date(1982, 6, 1)), 1.0),
        performance("Patti Smith", Some(date(1977, 12, 30)), 0.3),
    ];

    let chain = FilterChain::new()
        .add(DateRangeFilter::new(date(1976, 1, 1), date(1979, 12, 31)))
        .add(ConfidenceFilter::new(0.5).unwrap());
    let filtered = chain.apply(&history);

    // Talking Heads out of range, Ramones undated, Patti Smith low
    // confidence; each appears exactly once in the exclusions.
    assert_eq!(filtered.included.len() + filtered.excluded.len(), history.len());
    assert_eq!(filtered.excluded.len(), 3);

    let artists = dedupe_by_artist(filtered.included);
    let names: Vec<&str> = artists.iter().map(|p| p.artist_name.as_str()).collect();
    assert_eq!(names, vec!["Television", "Blondie"]);

    // The surviving Television record is the first (1977) performance.
    assert_eq!(artists[0].performance_date, Some(date(1977, 3, 10)));

    // Select tracks for the first artist with an era-weighted strategy.
    let catalog = vec![
        track("t1", "Marquee Moon", Some("1977-02-08"), 71),
        track("t2", "Glory", Some("1978-04-07"), 48),
        track("t3", "Call Mr. Lee", Some("1992-09-22"), 35),
    ];

    let token = "era-2";
    let strategy = resolve_strategy(token, None);
    let count = parse_strategy_count(token, 3);
    assert_eq!(count, 2);

    let selected = strategy.select_tracks(
        "sp-television",
        "Television",
        &catalog,
        artists[0].performance_date,
        count,
    );

    // 1977 and 1978 releases sit closest to the performance year.
    let ids: Vec<&str> = selected.iter().map(|t| t.spotify_id.as_str()).collect();
    assert_eq!(ids, vec!["t1", "t2"]);
    assert_eq!(selected[0].selection_strategy, "era_weighted");
    assert!(selected[0].selection_reason.starts_with("Era-weighted"));
}

#[test]
fn deep_cuts_flow_avoids_the_hits() {
    let catalog = vec![
        track("t1", "Marquee Moon", Some("1977-02-08"), 71),
        track("t2", "Venus", Some("1977-02-08"), 65),
        track("t3", "Glory", Some("1978-04-07"), 41),
        track("t4", "Days", Some("1978-04-07"), 28),
    ];

    let strategy = resolve_strategy("deep-2", None);
    let selected = strategy.select_tracks("sp-television", "Television", &catalog, None, 2);

    assert_eq!(selected.len(), 2);
    for t in &selected {
        assert!(t.popularity <= 60, "popular track selected: {}", t.name);
        assert!(t.selection_reason.starts_with("Deep cut:"));
    }
}

#[test]
fn unknown_strategy_token_falls_back_to_popularity_ranking() {
    let catalog = vec![
        track("t1", "Marquee Moon", Some("1977-02-08"), 71),
        track("t2", "Glory", Some("1978-04-07"), 48),
    ];

    let strategy = resolve_strategy("bogus-9", None);
    let selected = strategy.select_tracks("sp-television", "Television", &catalog, None, 1);

    assert_eq!(selected.len(), 1);
    assert_eq!(selected[0].spotify_id, "t1");
    assert_eq!(selected[0].selection_strategy, "top_n");
}
