//! Uniform random sampling from the catalog

use super::{to_selected, TrackSelectionStrategy};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};
use v2p_common::models::{CatalogTrack, Track};

/// Selects a uniform random sample of N tracks without replacement.
///
/// When the catalog holds `count` tracks or fewer the whole catalog is
/// returned in its given order. Non-deterministic by default; construct
/// [`RandomN::with_seed`] for deterministic tests.
pub struct RandomN {
    seed: Option<u64>,
}

impl RandomN {
    pub fn new() -> Self {
        Self { seed: None }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self { seed: Some(seed) }
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}

impl Default for RandomN {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackSelectionStrategy for RandomN {
    fn name(&self) -> String {
        "random_n".to_string()
    }

    fn select_tracks(
        &self,
        _artist_id: &str,
        _artist_name: &str,
        tracks: &[CatalogTrack],
        _performance_date: Option<NaiveDate>,
        count: usize,
    ) -> Vec<Track> {
        let chosen: Vec<&CatalogTrack> = if tracks.len() <= count {
            tracks.iter().collect()
        } else {
            sample_without_replacement(&mut self.rng(), tracks, count)
        };

        chosen
            .into_iter()
            .map(|t| to_selected(t, &self.name(), "Random selection from catalog".to_string()))
            .collect()
    }
}

/// Sample `count` distinct tracks uniformly.
pub(crate) fn sample_without_replacement<'a, R: Rng>(
    rng: &mut R,
    tracks: &'a [CatalogTrack],
    count: usize,
) -> Vec<&'a CatalogTrack> {
    index::sample(rng, tracks.len(), count)
        .into_iter()
        .map(|i| &tracks[i])
        .collect()
}
