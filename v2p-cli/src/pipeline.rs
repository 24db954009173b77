//! Playlist creation pipeline
//!
//! Orchestrates the full run: venue search across registered data
//! sources, performance retrieval, filtering, artist deduplication,
//! optional MusicBrainz enrichment, per-artist track selection, and
//! playlist creation on Spotify.

use chrono::NaiveDate;
use tracing::{debug, info, warn};
use v2p_common::models::{ExcludedItem, Performance, PlaylistResult, Track, VenueMatch};
use v2p_common::{Error, Result};

use crate::filters::{ConfidenceFilter, DateRangeFilter, FieldFilter, Filter, FilterChain};
use crate::services::{MusicBrainzClient, SpotifyClient};
use crate::sources::SourceRegistry;

/// Parameters for one playlist creation run.
#[derive(Debug, Clone)]
pub struct PlaylistRequest {
    pub venue_name: String,
    pub city: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Strategy token, e.g. "top-5", "deep-3", "era-weighted"
    pub strategy: String,
    /// Records below this confidence are excluded
    pub min_confidence: f64,
    /// Restrict to artists whose enriched genres intersect this list
    pub genres: Vec<String>,
    /// Popularity ceiling override for deep-cut selection
    pub max_popularity: Option<u32>,
    /// Look up canonical names and genres on MusicBrainz
    pub enrich: bool,
    pub playlist_name: Option<String>,
    pub public: bool,
    /// Select tracks but do not create the playlist
    pub dry_run: bool,
}

/// The playlist creation pipeline.
pub struct Pipeline {
    sources: SourceRegistry,
    musicbrainz: MusicBrainzClient,
    spotify: SpotifyClient,
}

impl Pipeline {
    pub fn new(
        sources: SourceRegistry,
        musicbrainz: MusicBrainzClient,
        spotify: SpotifyClient,
    ) -> Self {
        Self {
            sources,
            musicbrainz,
            spotify,
        }
    }

    /// Run the full pipeline and return the playlist result.
    pub async fn run(&self, request: &PlaylistRequest) -> Result<PlaylistResult> {
        let venue = self
            .find_venue(&request.venue_name, &request.city)
            .await?
            .ok_or_else(|| {
                Error::NotFound(format!(
                    "No venue matching '{}' in {} on any data source",
                    request.venue_name, request.city
                ))
            })?;

        info!(
            venue = %venue.venue_name,
            city = %venue.city,
            source = %venue.source_name,
            "Venue matched"
        );

        let source = self.sources.get(&venue.source_name).ok_or_else(|| {
            Error::NotFound(format!("Data source '{}' not registered", venue.source_name))
        })?;

        let performances = source
            .get_performances(&venue.venue_id, request.start_date, request.end_date)
            .await?;
        info!(count = performances.len(), "Performances retrieved");

        let mut excluded_items = Vec::new();
        let result = self.build_chain(request)?.apply(&performances);
        excluded_items.extend(result.excluded);

        let mut performances = dedupe_by_artist(result.included);
        info!(count = performances.len(), "Unique artists after filtering");

        let enrich = request.enrich || !request.genres.is_empty();
        if enrich {
            self.enrich_performances(&mut performances).await;
        }

        if !request.genres.is_empty() {
            let genre_filter = FieldFilter::new("genres", request.genres.clone());
            let result = genre_filter.apply(&performances);
            excluded_items.extend(result.excluded);
            performances = result.included;
            info!(count = performances.len(), "Artists after genre filter");
        }

        // An empty set here is not itself fatal; the no-tracks check
        // below reports it
        let mut tracks: Vec<Track> = Vec::new();
        for performance in &performances {
            let artist_name = canonical_name(performance);
            let (selected, excluded) = self
                .spotify
                .tracks_for_artist(
                    artist_name,
                    &request.strategy,
                    performance.performance_date,
                    request.max_popularity,
                )
                .await?;
            tracks.extend(selected);
            excluded_items.extend(excluded);
        }

        if tracks.is_empty() {
            return Err(Error::NotFound(
                "No tracks selected for any artist".to_string(),
            ));
        }

        let playlist_name = request
            .playlist_name
            .clone()
            .unwrap_or_else(|| default_playlist_name(&venue, request));
        let description = format!(
            "Artists who played {} in {}. {} artists, {} tracks.",
            venue.venue_name,
            venue.city,
            performances.len(),
            tracks.len()
        );

        let (playlist_id, playlist_url) = if request.dry_run {
            info!(tracks = tracks.len(), "Dry run, playlist not created");
            (String::new(), String::new())
        } else {
            let playlist = self
                .spotify
                .create_playlist(&playlist_name, &description, request.public)
                .await?;
            let track_ids: Vec<String> =
                tracks.iter().map(|t| t.spotify_id.clone()).collect();
            self.spotify.add_tracks(&playlist.id, &track_ids).await?;
            (playlist.id, playlist.url)
        };

        let total_artists = performances.len();
        Ok(PlaylistResult {
            playlist_id,
            playlist_url,
            playlist_name,
            performances,
            tracks,
            excluded_items,
            sources_used: self.sources.names().iter().map(|s| s.to_string()).collect(),
            total_artists,
        })
    }

    /// Search every registered source and return the first match.
    ///
    /// A source that errors is logged and skipped so one broken source
    /// cannot take down the run.
    pub async fn find_venue(&self, venue_name: &str, city: &str) -> Result<Option<VenueMatch>> {
        let mut matches = Vec::new();
        for source in self.sources.all() {
            match source.search_venues(venue_name, city).await {
                Ok(found) => {
                    debug!(source = source.name(), count = found.len(), "Venue search");
                    matches.extend(found);
                }
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Venue search failed, skipping source");
                }
            }
        }

        if matches.len() > 1 {
            debug!(count = matches.len(), "Multiple venue matches, using first");
        }
        Ok(matches.into_iter().next())
    }

    fn build_chain(&self, request: &PlaylistRequest) -> Result<FilterChain> {
        let mut chain = FilterChain::new();
        if let (Some(start), Some(end)) = (request.start_date, request.end_date) {
            chain = chain.add(DateRangeFilter::new(start, end));
        }
        chain = chain.add(ConfidenceFilter::new(request.min_confidence)?);
        Ok(chain)
    }

    /// Attach MusicBrainz canonical names and genres to each performance.
    async fn enrich_performances(&self, performances: &mut [Performance]) {
        for performance in performances.iter_mut() {
            let mbid = performance
                .metadata
                .get("artist_mbid")
                .map(|v| v.to_string());
            let extra = self
                .musicbrainz
                .enrich_metadata(&performance.artist_name, mbid.as_deref())
                .await;
            performance.metadata.extend(extra);
        }
    }
}

/// Collapse repeat performances to one record per artist.
///
/// The first occurrence wins, preserving source order; artist names are
/// compared case-insensitively.
pub fn dedupe_by_artist(performances: Vec<Performance>) -> Vec<Performance> {
    let mut seen = std::collections::BTreeSet::new();
    performances
        .into_iter()
        .filter(|p| seen.insert(p.artist_name.to_lowercase()))
        .collect()
}

/// The canonical artist name when enrichment resolved one, else the
/// name as documented by the source.
fn canonical_name(performance: &Performance) -> &str {
    match performance.metadata.get("artist_canonical") {
        Some(v2p_common::models::MetadataValue::Str(name)) => name.as_str(),
        _ => &performance.artist_name,
    }
}

fn default_playlist_name(venue: &VenueMatch, request: &PlaylistRequest) -> String {
    match (request.start_date, request.end_date) {
        (Some(start), Some(end)) => format!(
            "{} {}-{}",
            venue.venue_name,
            start.format("%Y"),
            end.format("%Y")
        ),
        _ => format!("{} Venue History", venue.venue_name),
    }
}
