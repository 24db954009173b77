//! Spotify API client
//!
//! Destination side of the pipeline: artist lookup, track retrieval, and
//! playlist creation. Authentication uses the OAuth refresh-token grant;
//! the access token is cached in-process and refreshed on demand.
//!
//! Lookup failures (artist search, track fetches) degrade to empty
//! results so one artist cannot abort a whole run; playlist mutation
//! errors propagate.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use v2p_common::models::{Artist, CatalogTrack, ExcludedItem, Metadata, MetadataValue, Track};
use v2p_common::{Error, Result};

use crate::cache::Cache;
use crate::strategies::{needs_full_catalog, parse_strategy_count, resolve_strategy};

const API_BASE_URL: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
const DEFAULT_MARKET: &str = "US";
const DEFAULT_TRACK_COUNT: usize = 3;
// Spotify caps playlist additions at 100 tracks per request
const ADD_TRACKS_BATCH: usize = 100;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct MeResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    artists: ArtistPage,
}

#[derive(Debug, Default, Deserialize)]
struct ArtistPage {
    #[serde(default)]
    items: Vec<SpArtist>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpArtist {
    id: String,
    name: String,
    #[serde(default)]
    genres: Vec<String>,
    popularity: Option<f64>,
    followers: Option<SpFollowers>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpFollowers {
    total: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TopTracksResponse {
    #[serde(default)]
    tracks: Vec<SpTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpTrack {
    id: String,
    name: String,
    popularity: Option<u32>,
    album: Option<SpAlbum>,
    #[serde(default)]
    artists: Vec<SpSimpleArtist>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpSimpleArtist {
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct SpAlbum {
    id: String,
    name: String,
    release_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AlbumsResponse {
    #[serde(default)]
    items: Vec<SpAlbum>,
}

#[derive(Debug, Deserialize)]
struct AlbumTracksResponse {
    #[serde(default)]
    items: Vec<SpSimpleTrack>,
}

#[derive(Debug, Clone, Deserialize)]
struct SpSimpleTrack {
    id: String,
    name: String,
    #[serde(default)]
    artists: Vec<SpSimpleArtist>,
}

#[derive(Debug, Deserialize)]
struct CreatePlaylistResponse {
    id: String,
    external_urls: ExternalUrls,
}

#[derive(Debug, Default, Deserialize)]
struct ExternalUrls {
    spotify: Option<String>,
}

/// A created playlist handle.
#[derive(Debug, Clone)]
pub struct CreatedPlaylist {
    pub id: String,
    pub url: String,
}

struct TokenState {
    access_token: String,
    expires_at: Instant,
}

/// Spotify Web API client.
pub struct SpotifyClient {
    client: reqwest::Client,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token: Mutex<Option<TokenState>>,
    user_id: Mutex<Option<String>>,
    cache: Option<Arc<Cache>>,
}

impl SpotifyClient {
    pub fn new(
        client_id: String,
        client_secret: String,
        refresh_token: String,
        cache: Option<Arc<Cache>>,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            refresh_token,
            token: Mutex::new(None),
            user_id: Mutex::new(None),
            cache,
        })
    }

    /// Get a valid access token, refreshing it when missing or expired.
    async fn ensure_token(&self) -> Result<String> {
        let mut token = self.token.lock().await;

        if let Some(state) = token.as_ref() {
            if Instant::now() < state.expires_at {
                return Ok(state.access_token.clone());
            }
        }

        debug!("Refreshing Spotify access token");
        let response = self
            .client
            .post(TOKEN_URL)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", &self.refresh_token),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(Error::Config(format!(
                "Spotify token refresh failed with status {}. Check \
                 spotify_client_id / spotify_client_secret / spotify_refresh_token.",
                status
            )));
        }

        let data: TokenResponse = response.json().await?;
        // Refresh one minute early to avoid using a token at its expiry edge
        let expires_at = Instant::now() + Duration::from_secs(data.expires_in.saturating_sub(60));
        let access_token = data.access_token.clone();
        *token = Some(TokenState {
            access_token: data.access_token,
            expires_at,
        });

        Ok(access_token)
    }

    /// The authenticated user's Spotify ID, fetched once.
    async fn current_user_id(&self) -> Result<String> {
        let mut user_id = self.user_id.lock().await;
        if let Some(id) = user_id.as_ref() {
            return Ok(id.clone());
        }

        let token = self.ensure_token().await?;
        let me: MeResponse = self
            .client
            .get(format!("{}/me", API_BASE_URL))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        info!(user_id = %me.id, "Spotify user authenticated");
        *user_id = Some(me.id.clone());
        Ok(me.id)
    }

    /// Search for an artist, preferring an exact name match.
    ///
    /// Returns `Ok(None)` on a miss or a service error; the caller
    /// records the exclusion.
    pub async fn find_artist(&self, artist_name: &str) -> Result<Option<Artist>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_artist_mapping(artist_name).await? {
                if cached.spotify_id.is_some() {
                    debug!(artist = %artist_name, "Artist cache hit");
                    return Ok(Some(cached));
                }
            }
        }

        info!(artist = %artist_name, "Searching artist on Spotify");

        let search = async {
            let token = self.ensure_token().await?;
            let response: ArtistSearchResponse = self
                .client
                .get(format!("{}/search", API_BASE_URL))
                .bearer_auth(&token)
                .query(&[
                    ("q", format!("artist:\"{}\"", artist_name)),
                    ("type", "artist".to_string()),
                    ("limit", "5".to_string()),
                ])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok::<_, Error>(response.artists.items)
        };

        let candidates = match search.await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(artist = %artist_name, error = %e, "Artist search failed");
                return Ok(None);
            }
        };

        let best = match pick_artist(candidates, artist_name) {
            Some(best) => best,
            None => {
                warn!(artist = %artist_name, "Artist not found on Spotify");
                return Ok(None);
            }
        };

        if best.name.to_lowercase() != artist_name.to_lowercase() {
            debug!(query = %artist_name, matched = %best.name, "Artist fuzzy match");
        }

        let artist = to_artist(best);
        if let Some(cache) = &self.cache {
            cache.set_artist_mapping(artist_name, &artist).await?;
        }

        Ok(Some(artist))
    }

    /// The artist's top tracks, pre-ranked by popularity by the API.
    pub async fn fetch_top_tracks(&self, artist_id: &str) -> Vec<CatalogTrack> {
        let fetch = async {
            let token = self.ensure_token().await?;
            let response: TopTracksResponse = self
                .client
                .get(format!("{}/artists/{}/top-tracks", API_BASE_URL, artist_id))
                .bearer_auth(&token)
                .query(&[("market", DEFAULT_MARKET)])
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            Ok::<_, Error>(response.tracks)
        };

        match fetch.await {
            Ok(tracks) => tracks.iter().map(to_catalog_track).collect(),
            Err(e) => {
                error!(artist_id = %artist_id, error = %e, "Top tracks fetch failed");
                vec![]
            }
        }
    }

    /// A broader slice of the artist's catalog, flattened from up to
    /// `max_albums` albums and singles. Album tracks carry no popularity
    /// score; it is reported as 0.
    pub async fn fetch_catalog(&self, artist_id: &str, max_albums: usize) -> Vec<CatalogTrack> {
        let albums = match self.fetch_albums(artist_id, max_albums).await {
            Ok(albums) => albums,
            Err(e) => {
                error!(artist_id = %artist_id, error = %e, "Album list fetch failed");
                return vec![];
            }
        };

        let mut all_tracks = Vec::new();
        for album in albums {
            match self.fetch_album_tracks(&album.id).await {
                Ok(tracks) => {
                    all_tracks.extend(tracks.iter().map(|t| simple_to_catalog_track(t, &album)));
                }
                Err(e) => {
                    error!(album_id = %album.id, error = %e, "Album tracks fetch failed");
                }
            }
        }

        all_tracks
    }

    async fn fetch_albums(&self, artist_id: &str, limit: usize) -> Result<Vec<SpAlbum>> {
        let token = self.ensure_token().await?;
        let response: AlbumsResponse = self
            .client
            .get(format!("{}/artists/{}/albums", API_BASE_URL, artist_id))
            .bearer_auth(&token)
            .query(&[
                ("include_groups", "album,single".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.items)
    }

    async fn fetch_album_tracks(&self, album_id: &str) -> Result<Vec<SpSimpleTrack>> {
        let token = self.ensure_token().await?;
        let response: AlbumTracksResponse = self
            .client
            .get(format!("{}/albums/{}/tracks", API_BASE_URL, album_id))
            .bearer_auth(&token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.items)
    }

    /// Create a playlist for the authenticated user.
    pub async fn create_playlist(
        &self,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<CreatedPlaylist> {
        info!(name = %name, public = public, "Creating playlist");

        let user_id = self.current_user_id().await?;
        let token = self.ensure_token().await?;

        let playlist: CreatePlaylistResponse = self
            .client
            .post(format!("{}/users/{}/playlists", API_BASE_URL, user_id))
            .bearer_auth(&token)
            .json(&json!({
                "name": name,
                "description": description,
                "public": public,
            }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let url = playlist
            .external_urls
            .spotify
            .unwrap_or_else(|| format!("https://open.spotify.com/playlist/{}", playlist.id));

        info!(name = %name, id = %playlist.id, url = %url, "Playlist created");

        Ok(CreatedPlaylist {
            id: playlist.id,
            url,
        })
    }

    /// Add tracks to a playlist in batches of 100.
    ///
    /// Returns the number of tracks added; a failed batch is logged and
    /// skipped rather than aborting the remaining batches.
    pub async fn add_tracks(&self, playlist_id: &str, track_ids: &[String]) -> Result<usize> {
        if track_ids.is_empty() {
            return Ok(0);
        }

        let uris: Vec<String> = track_ids
            .iter()
            .map(|id| format!("spotify:track:{}", id))
            .collect();

        let mut added = 0;
        for (batch_num, batch) in uris.chunks(ADD_TRACKS_BATCH).enumerate() {
            let token = self.ensure_token().await?;
            let result = self
                .client
                .post(format!("{}/playlists/{}/tracks", API_BASE_URL, playlist_id))
                .bearer_auth(&token)
                .json(&json!({ "uris": batch }))
                .send()
                .await
                .and_then(|r| r.error_for_status());

            match result {
                Ok(_) => {
                    added += batch.len();
                    debug!(
                        playlist_id = %playlist_id,
                        batch_num = batch_num + 1,
                        count = batch.len(),
                        "Tracks added"
                    );
                }
                Err(e) => {
                    error!(
                        playlist_id = %playlist_id,
                        batch_num = batch_num + 1,
                        error = %e,
                        "Failed to add track batch"
                    );
                }
            }
        }

        info!(playlist_id = %playlist_id, total = added, "Tracks added to playlist");
        Ok(added)
    }

    /// Select tracks for one artist using a strategy token.
    ///
    /// The main entry point used by the pipeline: resolves the strategy
    /// and count from the token, fetches the right catalog slice for the
    /// strategy kind, and maps lookup misses to artist-level exclusions.
    pub async fn tracks_for_artist(
        &self,
        artist_name: &str,
        strategy_token: &str,
        performance_date: Option<NaiveDate>,
        max_popularity: Option<u32>,
    ) -> Result<(Vec<Track>, Vec<ExcludedItem>)> {
        let count = parse_strategy_count(strategy_token, DEFAULT_TRACK_COUNT);
        let strategy = resolve_strategy(strategy_token, max_popularity);
        let mut excluded = Vec::new();

        let artist = match self.find_artist(artist_name).await? {
            Some(artist) => artist,
            None => {
                excluded.push(ExcludedItem::artist(
                    artist_name,
                    "Artist not found on Spotify",
                ));
                return Ok((vec![], excluded));
            }
        };
        let artist_id = match artist.spotify_id.as_deref() {
            Some(id) => id,
            None => {
                excluded.push(ExcludedItem::artist(
                    artist_name,
                    "Artist not found on Spotify",
                ));
                return Ok((vec![], excluded));
            }
        };

        let tracks = if needs_full_catalog(strategy_token) {
            self.fetch_catalog(artist_id, 10).await
        } else {
            self.fetch_top_tracks(artist_id).await
        };

        if tracks.is_empty() {
            excluded.push(ExcludedItem::artist(
                artist_name,
                "No tracks available on Spotify",
            ));
            return Ok((vec![], excluded));
        }

        let selected =
            strategy.select_tracks(artist_id, &artist.name, &tracks, performance_date, count);

        info!(
            artist = %artist_name,
            strategy = %strategy_token,
            count = selected.len(),
            "Tracks selected"
        );

        Ok((selected, excluded))
    }
}

/// Prefer an exact (case-insensitive) name match, else the first hit.
fn pick_artist(candidates: Vec<SpArtist>, query: &str) -> Option<SpArtist> {
    let query_lower = query.to_lowercase();
    candidates
        .iter()
        .find(|a| a.name.to_lowercase() == query_lower)
        .cloned()
        .or_else(|| candidates.into_iter().next())
}

fn to_artist(sp: SpArtist) -> Artist {
    let mut metadata = Metadata::new();
    if !sp.genres.is_empty() {
        metadata.insert("genres".to_string(), MetadataValue::List(sp.genres));
    }
    if let Some(popularity) = sp.popularity {
        metadata.insert("popularity".to_string(), MetadataValue::Num(popularity));
    }
    if let Some(total) = sp.followers.and_then(|f| f.total) {
        metadata.insert("followers".to_string(), MetadataValue::Num(total));
    }

    Artist {
        name: sp.name,
        aliases: vec![],
        musicbrainz_id: None,
        spotify_id: Some(sp.id),
        metadata,
    }
}

fn to_catalog_track(track: &SpTrack) -> CatalogTrack {
    CatalogTrack {
        id: track.id.clone(),
        name: track.name.clone(),
        artist_name: track
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        album_name: track
            .album
            .as_ref()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        release_date: track.album.as_ref().and_then(|a| a.release_date.clone()),
        popularity: track.popularity.unwrap_or(0),
    }
}

fn simple_to_catalog_track(track: &SpSimpleTrack, album: &SpAlbum) -> CatalogTrack {
    CatalogTrack {
        id: track.id.clone(),
        name: track.name.clone(),
        artist_name: track
            .artists
            .first()
            .map(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown".to_string()),
        album_name: album.name.clone(),
        release_date: album.release_date.clone(),
        // Simplified album tracks carry no popularity score
        popularity: 0,
    }
}
