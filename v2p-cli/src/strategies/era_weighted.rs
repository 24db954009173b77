//! Era-proximity weighted selection

use super::{to_selected, TopN, TrackSelectionStrategy};
use chrono::{Datelike, NaiveDate};
use v2p_common::models::{CatalogTrack, Track};

/// Prefers tracks released near the performance date.
///
/// Scores each track by release-year proximity to the performance year
/// (100 for the same year, minus 10 per year of distance, floored at 0;
/// missing or unparsable release dates score 0), then takes the highest
/// scores. Without a performance date this degrades fully to Top-N,
/// reason strings included.
pub struct EraWeighted;

impl EraWeighted {
    fn era_score(release_date: Option<&str>, performance_year: i32) -> i64 {
        let release_year = match release_date.and_then(parse_release_year) {
            Some(year) => year,
            None => return 0,
        };
        let years_diff = (release_year - performance_year).abs() as i64;
        (100 - years_diff * 10).max(0)
    }
}

fn parse_release_year(raw: &str) -> Option<i32> {
    raw.split('-').next()?.trim().parse().ok()
}

impl TrackSelectionStrategy for EraWeighted {
    fn name(&self) -> String {
        "era_weighted".to_string()
    }

    fn select_tracks(
        &self,
        artist_id: &str,
        artist_name: &str,
        tracks: &[CatalogTrack],
        performance_date: Option<NaiveDate>,
        count: usize,
    ) -> Vec<Track> {
        let performance_date = match performance_date {
            Some(date) => date,
            None => {
                tracing::debug!(artist = %artist_name, fallback = "top_n", "No performance date for era weighting");
                return TopN.select_tracks(artist_id, artist_name, tracks, None, count);
            }
        };

        let performance_year = performance_date.year();

        let mut scored: Vec<(i64, &CatalogTrack)> = tracks
            .iter()
            .map(|t| (Self::era_score(t.release_date.as_deref(), performance_year), t))
            .collect();
        // Stable sort: equal scores keep catalog order
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(count)
            .map(|(_, t)| {
                let released = t.release_date.as_deref().unwrap_or("unknown");
                to_selected(t, &self.name(), format!("Era-weighted: released {}", released))
            })
            .collect()
    }
}
