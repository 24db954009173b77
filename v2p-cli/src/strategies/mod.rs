//! Track selection strategies
//!
//! A strategy turns an artist's raw track catalog into a bounded,
//! justified subset for the playlist. Strategies hold only their own
//! configuration; every `select_tracks` call is independent and
//! reentrant, modulo explicit randomness.

pub mod deep_cuts;
pub mod era_weighted;
pub mod random_n;
pub mod top_n;

pub use deep_cuts::DeepCuts;
pub use era_weighted::EraWeighted;
pub use random_n::RandomN;
pub use top_n::TopN;

use chrono::NaiveDate;
use v2p_common::models::{CatalogTrack, Track};

/// A track selection policy.
///
/// `select_tracks` returns at most `count` tracks (fewer when the catalog
/// is smaller), never errors for a well-formed track list, and returns an
/// empty list for an empty catalog.
pub trait TrackSelectionStrategy: Send + Sync {
    /// Strategy identifier recorded on every selected track.
    fn name(&self) -> String;

    fn select_tracks(
        &self,
        artist_id: &str,
        artist_name: &str,
        tracks: &[CatalogTrack],
        performance_date: Option<NaiveDate>,
        count: usize,
    ) -> Vec<Track>;
}

/// Parse a catalog release date string.
///
/// Accepts `YYYY`, `YYYY-MM`, and `YYYY-MM-DD`; partial dates default
/// month and day to 1. Any parse failure yields `None` — the caller
/// treats it as a missing release date, never as an error.
pub fn parse_release_date(raw: &str) -> Option<NaiveDate> {
    let mut parts = raw.splitn(3, '-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 1,
    };
    let day: u32 = match parts.next() {
        Some(p) => p.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Build a selected `Track` from a catalog candidate.
pub(crate) fn to_selected(track: &CatalogTrack, strategy: &str, reason: String) -> Track {
    Track {
        spotify_id: track.id.clone(),
        name: track.name.clone(),
        artist_name: track.artist_name.clone(),
        album_name: track.album_name.clone(),
        release_date: track.release_date.as_deref().and_then(parse_release_date),
        popularity: track.popularity,
        selection_strategy: strategy.to_string(),
        selection_reason: reason,
    }
}

/// Resolve a strategy token like `top-3`, `random-5`, `era-2`, `deep-4`
/// (or bare `top`, `era_weighted`, ...) to a configured strategy.
///
/// The numeric suffix is not consumed here; it is the `count` parameter
/// threaded separately by the caller (see [`parse_strategy_count`]).
/// An unrecognized prefix logs a warning and falls back to Top-N rather
/// than failing the pipeline.
pub fn resolve_strategy(
    token: &str,
    max_popularity: Option<u32>,
) -> Box<dyn TrackSelectionStrategy> {
    let prefix = token
        .split('-')
        .next()
        .unwrap_or(token)
        .to_lowercase();

    match prefix.as_str() {
        "top" | "top_n" => Box::new(TopN),
        "random" | "random_n" => Box::new(RandomN::new()),
        "era" | "era_weighted" => Box::new(EraWeighted),
        "deep" | "deep_cuts" => Box::new(DeepCuts::new(max_popularity.unwrap_or(60))),
        _ => {
            tracing::warn!(token = %token, fallback = "top_n", "Unknown strategy token");
            Box::new(TopN)
        }
    }
}

/// Extract the per-artist track count from a strategy token
/// (`"top-3"` -> 3). Missing or unparsable suffixes use the default.
pub fn parse_strategy_count(token: &str, default: usize) -> usize {
    token
        .split('-')
        .nth(1)
        .and_then(|suffix| suffix.parse().ok())
        .unwrap_or(default)
}

/// Whether a strategy token needs the artist's broader catalog rather
/// than the pre-ranked top-tracks endpoint.
pub fn needs_full_catalog(token: &str) -> bool {
    let lower = token.to_lowercase();
    lower.contains("era") || lower.contains("random")
}
