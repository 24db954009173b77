//! Top-N by popularity

use super::{to_selected, TrackSelectionStrategy};
use chrono::NaiveDate;
use v2p_common::models::{CatalogTrack, Track};

/// Selects the artist's top N tracks by popularity.
///
/// Assumes the caller supplied tracks already ordered by popularity
/// descending (true for the top-tracks endpoint); this strategy does not
/// re-sort. Ordering responsibility belongs to the catalog provider.
pub struct TopN;

impl TrackSelectionStrategy for TopN {
    fn name(&self) -> String {
        "top_n".to_string()
    }

    fn select_tracks(
        &self,
        _artist_id: &str,
        _artist_name: &str,
        tracks: &[CatalogTrack],
        _performance_date: Option<NaiveDate>,
        count: usize,
    ) -> Vec<Track> {
        tracks
            .iter()
            .take(count)
            .enumerate()
            .map(|(i, t)| to_selected(t, &self.name(), format!("Top {} by popularity", i + 1)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::track;
    use super::*;

    #[test]
    fn takes_first_count_in_given_order() {
        let tracks = vec![
            track("t1", "Marquee Moon", 80, Some("1977-02-08")),
            track("t2", "Venus", 72, Some("1977-02-08")),
            track("t3", "Friction", 65, Some("1977-02-08")),
            track("t4", "Elevation", 60, Some("1977-02-08")),
            track("t5", "Guiding Light", 55, Some("1977-02-08")),
        ];

        let selected = TopN.select_tracks("a1", "Television", &tracks, None, 3);
        assert_eq!(selected.len(), 3);
        assert_eq!(selected[0].spotify_id, "t1");
        assert_eq!(selected[1].spotify_id, "t2");
        assert_eq!(selected[2].spotify_id, "t3");
    }

    #[test]
    fn reasons_carry_one_based_rank() {
        let tracks = vec![
            track("t1", "Marquee Moon", 80, None),
            track("t2", "Venus", 72, None),
        ];

        let selected = TopN.select_tracks("a1", "Television", &tracks, None, 2);
        assert_eq!(selected[0].selection_reason, "Top 1 by popularity");
        assert_eq!(selected[1].selection_reason, "Top 2 by popularity");
        assert_eq!(selected[0].selection_strategy, "top_n");
    }

    #[test]
    fn short_catalog_returns_everything() {
        let tracks = vec![track("t1", "Marquee Moon", 80, None)];
        let selected = TopN.select_tracks("a1", "Television", &tracks, None, 5);
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn empty_catalog_returns_empty() {
        let selected = TopN.select_tracks("a1", "Television", &[], None, 3);
        assert!(selected.is_empty());
    }
}
