//! MusicBrainz artist canonicalization
//!
//! Normalizes artist identities and resolves aliases. Not a performance
//! data source; it only enriches records with artist metadata. Lookup
//! misses and service errors degrade to "no enrichment", they never
//! abort the pipeline.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{error, info, warn};
use v2p_common::models::{Artist, Metadata, MetadataValue};
use v2p_common::rate_limit::RateLimiter;
use v2p_common::Result;

use crate::cache::Cache;

const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const USER_AGENT: &str = "v2p/0.1.0 (https://github.com/v2p/v2p)";
// MusicBrainz allows 1 request per second
const RATE_LIMIT_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct ArtistSearchResponse {
    #[serde(default)]
    artists: Vec<MbArtist>,
}

#[derive(Debug, Default, Clone, Deserialize)]
struct MbArtist {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    country: Option<String>,
    #[serde(rename = "type")]
    artist_type: Option<String>,
    #[serde(default)]
    aliases: Vec<MbAlias>,
    #[serde(default)]
    tags: Vec<MbTag>,
    #[serde(rename = "life-span")]
    life_span: Option<MbLifeSpan>,
    #[serde(rename = "begin-area")]
    begin_area: Option<MbArea>,
}

#[derive(Debug, Clone, Deserialize)]
struct MbAlias {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MbTag {
    name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct MbLifeSpan {
    begin: Option<String>,
    end: Option<String>,
    ended: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
struct MbArea {
    name: Option<String>,
}

/// MusicBrainz API client for artist canonicalization.
pub struct MusicBrainzClient {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    cache: Option<Arc<Cache>>,
}

impl MusicBrainzClient {
    pub fn new(cache: Option<Arc<Cache>>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
            cache,
        })
    }

    /// Canonicalize an artist name and fetch its metadata.
    ///
    /// Prefers a direct MBID lookup when the data source supplied one
    /// (setlist.fm usually does); otherwise searches by name and picks
    /// the best match. Returns `Ok(None)` when the artist cannot be
    /// resolved, including on service errors.
    pub async fn canonicalize_artist(
        &self,
        artist_name: &str,
        mbid: Option<&str>,
    ) -> Result<Option<Artist>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_artist_mapping(artist_name).await? {
                if cached.musicbrainz_id.is_some() {
                    info!(artist = %artist_name, "Artist cache hit");
                    return Ok(Some(cached));
                }
            }
        }

        info!(artist = %artist_name, mbid = ?mbid, "Canonicalizing artist");

        let artist_data = match self.fetch_artist(artist_name, mbid).await {
            Ok(Some(data)) => data,
            Ok(None) => {
                warn!(artist = %artist_name, "Artist not found on MusicBrainz");
                return Ok(None);
            }
            Err(e) => {
                error!(artist = %artist_name, error = %e, "MusicBrainz lookup failed");
                return Ok(None);
            }
        };

        let artist = to_artist(artist_data, artist_name);

        info!(
            original = %artist_name,
            canonical = %artist.name,
            mbid = ?artist.musicbrainz_id,
            "Artist canonicalized"
        );

        if let Some(cache) = &self.cache {
            cache.set_artist_mapping(artist_name, &artist).await?;
        }

        Ok(Some(artist))
    }

    /// Artist metadata delta for merging into `Performance.metadata`.
    pub async fn enrich_metadata(&self, artist_name: &str, mbid: Option<&str>) -> Metadata {
        let artist = match self.canonicalize_artist(artist_name, mbid).await {
            Ok(Some(artist)) => artist,
            Ok(None) => return Metadata::new(),
            Err(e) => {
                error!(artist = %artist_name, error = %e, "Enrichment failed");
                return Metadata::new();
            }
        };

        let mut delta = Metadata::new();
        delta.insert(
            "artist_canonical".to_string(),
            MetadataValue::from(artist.name.clone()),
        );
        if let Some(mbid) = &artist.musicbrainz_id {
            delta.insert("artist_mbid".to_string(), MetadataValue::from(mbid.clone()));
        }
        for key in ["genres", "country", "type"] {
            if let Some(value) = artist.metadata.get(key) {
                let delta_key = if key == "type" { "artist_type" } else { key };
                delta.insert(delta_key.to_string(), value.clone());
            }
        }
        delta
    }

    async fn fetch_artist(
        &self,
        artist_name: &str,
        mbid: Option<&str>,
    ) -> Result<Option<MbArtist>> {
        self.rate_limiter.wait().await;

        if let Some(mbid) = mbid {
            let url = format!(
                "{}/artist/{}?inc=aliases+tags&fmt=json",
                MUSICBRAINZ_BASE_URL, mbid
            );
            let response = self.client.get(&url).send().await?;
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            let artist: MbArtist = response.error_for_status()?.json().await?;
            return Ok(Some(artist));
        }

        let url = format!("{}/artist?fmt=json", MUSICBRAINZ_BASE_URL);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("query", format!("artist:\"{}\"", artist_name)),
                ("limit", "5".to_string()),
            ])
            .send()
            .await?;
        let data: ArtistSearchResponse = response.error_for_status()?.json().await?;

        Ok(best_match(data.artists, artist_name))
    }
}

/// Pick the best search hit: exact name match first, then alias match,
/// then the first result.
fn best_match(artists: Vec<MbArtist>, query: &str) -> Option<MbArtist> {
    let query_lower = query.to_lowercase();

    for artist in &artists {
        if artist.name.to_lowercase() == query_lower {
            return Some(artist.clone());
        }
        let alias_hit = artist.aliases.iter().any(|alias| {
            alias
                .name
                .as_deref()
                .is_some_and(|name| name.to_lowercase() == query_lower)
        });
        if alias_hit {
            return Some(artist.clone());
        }
    }

    artists.into_iter().next()
}

fn to_artist(data: MbArtist, queried_name: &str) -> Artist {
    let canonical_name = if data.name.is_empty() {
        queried_name.to_string()
    } else {
        data.name.clone()
    };

    let aliases: Vec<String> = data
        .aliases
        .iter()
        .filter_map(|a| a.name.clone())
        .filter(|name| name != &canonical_name)
        .collect();

    let genres: Vec<String> = data.tags.iter().filter_map(|t| t.name.clone()).collect();

    let mut metadata = Metadata::new();
    if !genres.is_empty() {
        metadata.insert("genres".to_string(), MetadataValue::List(genres));
    }
    if let Some(country) = &data.country {
        metadata.insert("country".to_string(), MetadataValue::from(country.clone()));
    }
    if let Some(artist_type) = &data.artist_type {
        metadata.insert("type".to_string(), MetadataValue::from(artist_type.clone()));
    }
    if let Some(life_span) = &data.life_span {
        if let Some(begin) = &life_span.begin {
            metadata.insert("begin_year".to_string(), MetadataValue::from(begin.clone()));
        }
        if let Some(end) = &life_span.end {
            metadata.insert("end_year".to_string(), MetadataValue::from(end.clone()));
        }
        metadata.insert(
            "ended".to_string(),
            MetadataValue::Bool(life_span.ended.unwrap_or(false)),
        );
    }
    if let Some(area) = data.begin_area.as_ref().and_then(|a| a.name.clone()) {
        metadata.insert("origin_area".to_string(), MetadataValue::from(area));
    }

    Artist {
        name: canonical_name,
        aliases,
        musicbrainz_id: if data.id.is_empty() { None } else { Some(data.id) },
        spotify_id: None,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mb_artist(id: &str, name: &str, aliases: &[&str]) -> MbArtist {
        MbArtist {
            id: id.to_string(),
            name: name.to_string(),
            country: Some("US".to_string()),
            artist_type: Some("Group".to_string()),
            aliases: aliases
                .iter()
                .map(|a| MbAlias {
                    name: Some(a.to_string()),
                })
                .collect(),
            tags: vec![
                MbTag {
                    name: Some("punk".to_string()),
                },
                MbTag {
                    name: Some("art rock".to_string()),
                },
            ],
            life_span: Some(MbLifeSpan {
                begin: Some("1973".to_string()),
                end: Some("1978".to_string()),
                ended: Some(true),
            }),
            begin_area: Some(MbArea {
                name: Some("New York".to_string()),
            }),
        }
    }

    #[test]
    fn exact_name_match_preferred_over_first_hit() {
        let artists = vec![
            mb_artist("m1", "Television Personalities", &[]),
            mb_artist("m2", "Television", &[]),
        ];

        let hit = best_match(artists, "television").unwrap();
        assert_eq!(hit.id, "m2");
    }

    #[test]
    fn alias_match_counts_as_exact() {
        let artists = vec![
            mb_artist("m1", "Unrelated", &[]),
            mb_artist("m2", "Talking Heads", &["The Talking Heads"]),
        ];

        let hit = best_match(artists, "the talking heads").unwrap();
        assert_eq!(hit.id, "m2");
    }

    #[test]
    fn falls_back_to_first_hit_without_exact_match() {
        let artists = vec![
            mb_artist("m1", "Television Personalities", &[]),
            mb_artist("m2", "Televangelist", &[]),
        ];

        let hit = best_match(artists, "television").unwrap();
        assert_eq!(hit.id, "m1");
    }

    #[test]
    fn empty_result_set_is_none() {
        assert!(best_match(vec![], "television").is_none());
    }

    #[test]
    fn artist_conversion_extracts_metadata() {
        let artist = to_artist(mb_artist("m1", "Television", &["TV", "Television"]), "television");

        assert_eq!(artist.name, "Television");
        assert_eq!(artist.musicbrainz_id.as_deref(), Some("m1"));
        // The canonical name itself is not an alias
        assert_eq!(artist.aliases, vec!["TV".to_string()]);
        assert_eq!(
            artist.metadata.get("genres"),
            Some(&MetadataValue::List(vec![
                "punk".to_string(),
                "art rock".to_string()
            ]))
        );
        assert_eq!(artist.metadata.get("country"), Some(&MetadataValue::from("US")));
        assert_eq!(artist.metadata.get("ended"), Some(&MetadataValue::Bool(true)));
        assert_eq!(
            artist.metadata.get("origin_area"),
            Some(&MetadataValue::from("New York"))
        );
    }
}
