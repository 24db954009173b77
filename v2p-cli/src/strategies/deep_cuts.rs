//! Deep cuts: popularity-exclusion selection

use super::{to_selected, TrackSelectionStrategy};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use v2p_common::models::{CatalogTrack, Track};

/// Prefers lesser-known songs by excluding tracks above a popularity
/// ceiling, then sampling uniformly from what remains.
///
/// When nothing in the catalog sits below the ceiling, the pool falls
/// back to the `2*count` least-popular tracks overall so a near-empty
/// catalog still yields a result.
pub struct DeepCuts {
    max_popularity: u32,
    seed: Option<u64>,
}

impl DeepCuts {
    pub fn new(max_popularity: u32) -> Self {
        Self {
            max_popularity,
            seed: None,
        }
    }

    pub fn with_seed(max_popularity: u32, seed: u64) -> Self {
        Self {
            max_popularity,
            seed: Some(seed),
        }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for DeepCuts {
    fn default() -> Self {
        Self::new(60)
    }
}

impl TrackSelectionStrategy for DeepCuts {
    fn name(&self) -> String {
        format!("deep_cuts(max_pop={})", self.max_popularity)
    }

    fn select_tracks(
        &self,
        _artist_id: &str,
        artist_name: &str,
        tracks: &[CatalogTrack],
        _performance_date: Option<NaiveDate>,
        count: usize,
    ) -> Vec<Track> {
        let mut pool: Vec<&CatalogTrack> = tracks
            .iter()
            .filter(|t| t.popularity <= self.max_popularity)
            .collect();

        if pool.is_empty() && !tracks.is_empty() {
            tracing::warn!(
                artist = %artist_name,
                max_popularity = self.max_popularity,
                fallback = "least_popular",
                "No tracks below popularity ceiling"
            );
            // Safety net: the 2*count least-popular tracks overall
            let mut by_popularity: Vec<&CatalogTrack> = tracks.iter().collect();
            by_popularity.sort_by_key(|t| t.popularity);
            pool = by_popularity.into_iter().take(count * 2).collect();
        }

        let chosen: Vec<&CatalogTrack> = if pool.len() <= count {
            pool
        } else {
            let mut rng = self.rng();
            rand::seq::index::sample(&mut rng, pool.len(), count)
                .into_iter()
                .map(|i| pool[i])
                .collect()
        };

        chosen
            .into_iter()
            .map(|t| to_selected(t, &self.name(), format!("Deep cut: popularity {}", t.popularity)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::track;
    use super::*;
    use std::collections::HashSet;

    fn catalog() -> Vec<CatalogTrack> {
        vec![
            track("t10", "Obscure", 10, None),
            track("t70", "Radio Hit", 70, None),
            track("t55", "Album Cut", 55, None),
            track("t90", "The Single", 90, None),
            track("t40", "B-Side", 40, None),
        ]
    }

    #[test]
    fn selects_only_below_ceiling() {
        let strategy = DeepCuts::new(60);
        let selected = strategy.select_tracks("a1", "Television", &catalog(), None, 2);

        assert_eq!(selected.len(), 2);
        let deep_ids: HashSet<&str> = ["t10", "t55", "t40"].into_iter().collect();
        for t in &selected {
            assert!(deep_ids.contains(t.spotify_id.as_str()));
            assert!(t.popularity <= 60);
        }
    }

    #[test]
    fn small_pool_returned_whole() {
        let strategy = DeepCuts::new(60);
        let selected = strategy.select_tracks("a1", "Television", &catalog(), None, 5);

        // Pool has 3 tracks, fewer than requested
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn empty_pool_falls_back_to_least_popular() {
        let tracks = vec![
            track("t95", "Smash", 95, None),
            track("t85", "Hit", 85, None),
            track("t99", "Anthem", 99, None),
        ];

        let strategy = DeepCuts::new(60);
        let selected = strategy.select_tracks("a1", "Television", &tracks, None, 1);

        // Fallback pool = 2 least popular (t85, t95); one sampled from it
        assert_eq!(selected.len(), 1);
        assert_ne!(selected[0].spotify_id, "t99");
    }

    #[test]
    fn reason_cites_popularity() {
        let tracks = vec![track("t10", "Obscure", 10, None)];
        let selected = DeepCuts::new(60).select_tracks("a1", "Television", &tracks, None, 1);

        assert_eq!(selected[0].selection_reason, "Deep cut: popularity 10");
        assert_eq!(selected[0].selection_strategy, "deep_cuts(max_pop=60)");
    }

    #[test]
    fn seeded_sampling_is_deterministic() {
        let a = DeepCuts::with_seed(60, 7).select_tracks("a1", "Television", &catalog(), None, 2);
        let b = DeepCuts::with_seed(60, 7).select_tracks("a1", "Television", &catalog(), None, 2);

        let ids = |sel: &[Track]| sel.iter().map(|t| t.spotify_id.clone()).collect::<Vec<_>>();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn empty_catalog_returns_empty() {
        let selected = DeepCuts::new(60).select_tracks("a1", "Television", &[], None, 3);
        assert!(selected.is_empty());
    }
}
