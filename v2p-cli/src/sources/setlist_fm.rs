//! Setlist.fm data source
//!
//! Primary source for structured concert data.
//! API documentation: https://api.setlist.fm/docs/1.0/index.html

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde::Deserialize;
use tracing::{debug, info, warn};
use v2p_common::models::{Metadata, MetadataValue, Performance, VenueMatch};
use v2p_common::rate_limit::RateLimiter;
use v2p_common::{Error, Result};

use super::DataSource;
use crate::cache::Cache;

const SETLIST_FM_BASE_URL: &str = "https://api.setlist.fm/rest/1.0";
// setlist.fm allows 2 requests per second
const RATE_LIMIT_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct VenueSearchResponse {
    #[serde(default)]
    venue: Vec<SlfmVenue>,
}

#[derive(Debug, Default, Deserialize)]
struct SlfmVenue {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    city: Option<SlfmCity>,
}

#[derive(Debug, Default, Deserialize)]
struct SlfmCity {
    #[serde(default)]
    name: String,
    state: Option<String>,
    #[serde(rename = "stateCode")]
    state_code: Option<String>,
    country: Option<SlfmCountry>,
}

#[derive(Debug, Deserialize)]
struct SlfmCountry {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SetlistsResponse {
    #[serde(default)]
    setlist: Vec<SlfmSetlist>,
    #[serde(rename = "itemsPerPage", default)]
    items_per_page: u32,
    #[serde(default)]
    total: u32,
}

#[derive(Debug, Default, Deserialize)]
struct SlfmSetlist {
    #[serde(default)]
    id: String,
    #[serde(rename = "eventDate", default)]
    event_date: String,
    url: Option<String>,
    artist: Option<SlfmArtist>,
    venue: Option<SlfmVenue>,
    tour: Option<SlfmTour>,
}

#[derive(Debug, Deserialize)]
struct SlfmArtist {
    name: Option<String>,
    mbid: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SlfmTour {
    name: Option<String>,
}

/// Setlist.fm API data source.
///
/// Provides structured concert setlist data with exact dates, so records
/// carry confidence 1.0.
pub struct SetlistFmSource {
    client: reqwest::Client,
    rate_limiter: RateLimiter,
    cache: Option<Arc<Cache>>,
}

impl SetlistFmSource {
    pub fn new(api_key: &str, cache: Option<Arc<Cache>>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(api_key)
                .map_err(|_| Error::Config("setlist.fm API key contains invalid characters".to_string()))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(RATE_LIMIT_MS),
            cache,
        })
    }

    /// Parse the setlist.fm event date format (dd-MM-yyyy).
    fn parse_event_date(date_str: &str) -> Option<NaiveDate> {
        match NaiveDate::parse_from_str(date_str, "%d-%m-%Y") {
            Ok(date) => Some(date),
            Err(_) => {
                warn!(date_str = %date_str, "Failed to parse setlist.fm event date");
                None
            }
        }
    }

    /// Convert a setlist to a performance record.
    ///
    /// Setlists without a parsable event date carry no temporal evidence
    /// and are dropped here with a warning rather than defaulted.
    fn setlist_to_performance(&self, setlist: &SlfmSetlist) -> Option<Performance> {
        let event_date = Self::parse_event_date(&setlist.event_date);
        let artist = setlist.artist.as_ref();
        let artist_name = artist
            .and_then(|a| a.name.clone())
            .unwrap_or_else(|| "Unknown Artist".to_string());

        let event_date = match event_date {
            Some(date) => date,
            None => {
                warn!(
                    setlist_id = %setlist.id,
                    artist = %artist_name,
                    "Skipping setlist without event date"
                );
                return None;
            }
        };

        let venue = setlist.venue.as_ref();
        let city = venue.and_then(|v| v.city.as_ref());

        let source_reference = setlist
            .url
            .clone()
            .unwrap_or_else(|| format!("https://www.setlist.fm/setlist/{}", setlist.id));

        let mut metadata = Metadata::new();
        metadata.insert("setlist_id".to_string(), MetadataValue::from(setlist.id.clone()));
        if let Some(mbid) = artist.and_then(|a| a.mbid.clone()) {
            metadata.insert("artist_mbid".to_string(), MetadataValue::from(mbid));
        }
        if let Some(tour) = setlist.tour.as_ref().and_then(|t| t.name.clone()) {
            metadata.insert("tour_name".to_string(), MetadataValue::from(tour));
        }

        Some(Performance {
            artist_name,
            venue_name: venue
                .map(|v| v.name.clone())
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| "Unknown Venue".to_string()),
            city: city.map(|c| c.name.clone()).unwrap_or_default(),
            country: city
                .and_then(|c| c.country.as_ref())
                .and_then(|c| c.code.clone()),
            performance_date: Some(event_date),
            performance_date_range: None,
            source_name: self.name().to_string(),
            source_reference,
            // Setlist.fm records have exact dates
            confidence_score: 1.0,
            metadata,
        })
    }

    fn total_pages(items_per_page: u32, total: u32) -> u32 {
        if items_per_page == 0 {
            1
        } else {
            total.div_ceil(items_per_page)
        }
    }
}

#[async_trait]
impl DataSource for SetlistFmSource {
    fn name(&self) -> &'static str {
        "setlist.fm"
    }

    async fn search_venues(&self, venue_name: &str, city: &str) -> Result<Vec<VenueMatch>> {
        if let Some(cache) = &self.cache {
            if let Some(cached) = cache.get_venue_search(venue_name, city, self.name()).await? {
                info!(venue = %venue_name, city = %city, "Venue search cache hit");
                return Ok(cached);
            }
        }

        info!(venue = %venue_name, city = %city, source = self.name(), "Searching venues");
        self.rate_limiter.wait().await;

        let response = self
            .client
            .get(format!("{}/search/venues", SETLIST_FM_BASE_URL))
            .query(&[("name", venue_name), ("cityName", city), ("p", "1")])
            .send()
            .await?;

        // setlist.fm answers 404 for searches with no results
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            info!(venue = %venue_name, city = %city, "No venues found");
            return Ok(vec![]);
        }
        let data: VenueSearchResponse = response.error_for_status()?.json().await?;

        let results: Vec<VenueMatch> = data
            .venue
            .iter()
            .map(|venue| {
                let city_data = venue.city.as_ref();
                let mut metadata = Metadata::new();
                if let Some(state) = city_data.and_then(|c| c.state.clone()) {
                    metadata.insert("state".to_string(), MetadataValue::from(state));
                }
                if let Some(code) = city_data.and_then(|c| c.state_code.clone()) {
                    metadata.insert("state_code".to_string(), MetadataValue::from(code));
                }

                VenueMatch {
                    venue_id: venue.id.clone(),
                    venue_name: venue.name.clone(),
                    city: city_data.map(|c| c.name.clone()).unwrap_or_default(),
                    country: city_data
                        .and_then(|c| c.country.as_ref())
                        .and_then(|c| c.code.clone()),
                    source_name: self.name().to_string(),
                    metadata,
                }
            })
            .collect();

        info!(venue = %venue_name, city = %city, results = results.len(), "Venue search complete");

        if let Some(cache) = &self.cache {
            if !results.is_empty() {
                cache
                    .set_venue_search(venue_name, city, self.name(), &results)
                    .await?;
            }
        }

        Ok(results)
    }

    /// Fetch performances at a venue.
    ///
    /// The setlist.fm API has no date-range parameter, so all pages are
    /// fetched and the window is applied client-side.
    async fn get_performances(
        &self,
        venue_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Performance>> {
        let start_str = start_date.map(|d| d.to_string());
        let end_str = end_date.map(|d| d.to_string());

        if let Some(cache) = &self.cache {
            if let Some(cached) = cache
                .get_performances(venue_id, self.name(), start_str.as_deref(), end_str.as_deref())
                .await?
            {
                info!(venue_id = %venue_id, "Performances cache hit");
                return Ok(cached);
            }
        }

        info!(
            venue_id = %venue_id,
            start_date = ?start_str,
            end_date = ?end_str,
            source = self.name(),
            "Fetching performances"
        );

        let mut all_setlists: Vec<SlfmSetlist> = Vec::new();
        let mut page = 1;
        let mut total_pages = 1;

        while page <= total_pages {
            self.rate_limiter.wait().await;

            let response = self
                .client
                .get(format!("{}/venue/{}/setlists", SETLIST_FM_BASE_URL, venue_id))
                .query(&[("p", page.to_string())])
                .send()
                .await?;

            if response.status() == reqwest::StatusCode::NOT_FOUND {
                break;
            }
            let data: SetlistsResponse = response.error_for_status()?.json().await?;

            total_pages = Self::total_pages(data.items_per_page, data.total);
            debug!(page = page, total_pages = total_pages, count = data.setlist.len(), "Fetched page");

            all_setlists.extend(data.setlist);
            page += 1;
        }

        let total_fetched = all_setlists.len();
        let performances: Vec<Performance> = all_setlists
            .iter()
            .filter_map(|s| self.setlist_to_performance(s))
            .filter(|perf| match (start_date, end_date) {
                (Some(start), Some(end)) => perf.overlaps_range(start, end),
                _ => true,
            })
            .collect();

        info!(
            venue_id = %venue_id,
            total_fetched = total_fetched,
            after_filter = performances.len(),
            "Performance fetch complete"
        );

        if let Some(cache) = &self.cache {
            if !performances.is_empty() {
                cache
                    .set_performances(
                        venue_id,
                        self.name(),
                        &performances,
                        start_str.as_deref(),
                        end_str.as_deref(),
                    )
                    .await?;
            }
        }

        Ok(performances)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> SetlistFmSource {
        SetlistFmSource::new("test-key", None).unwrap()
    }

    fn setlist(id: &str, event_date: &str, artist: &str) -> SlfmSetlist {
        SlfmSetlist {
            id: id.to_string(),
            event_date: event_date.to_string(),
            url: Some(format!("https://www.setlist.fm/setlist/{}", id)),
            artist: Some(SlfmArtist {
                name: Some(artist.to_string()),
                mbid: Some("mbid-1".to_string()),
            }),
            venue: Some(SlfmVenue {
                id: "v1".to_string(),
                name: "CBGB".to_string(),
                city: Some(SlfmCity {
                    name: "New York".to_string(),
                    state: Some("New York".to_string()),
                    state_code: Some("NY".to_string()),
                    country: Some(SlfmCountry {
                        code: Some("US".to_string()),
                    }),
                }),
            }),
            tour: Some(SlfmTour {
                name: Some("Marquee Moon Tour".to_string()),
            }),
        }
    }

    #[test]
    fn event_date_uses_day_month_year_order() {
        let date = SetlistFmSource::parse_event_date("10-03-1978").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(1978, 3, 10).unwrap());

        assert!(SetlistFmSource::parse_event_date("1978-03-10").is_none());
        assert!(SetlistFmSource::parse_event_date("").is_none());
    }

    #[test]
    fn setlist_converts_to_performance_with_attribution() {
        let perf = source()
            .setlist_to_performance(&setlist("s1", "10-03-1978", "Television"))
            .unwrap();

        assert_eq!(perf.artist_name, "Television");
        assert_eq!(perf.venue_name, "CBGB");
        assert_eq!(perf.city, "New York");
        assert_eq!(perf.country.as_deref(), Some("US"));
        assert_eq!(
            perf.performance_date,
            Some(NaiveDate::from_ymd_opt(1978, 3, 10).unwrap())
        );
        assert_eq!(perf.source_name, "setlist.fm");
        assert_eq!(perf.source_reference, "https://www.setlist.fm/setlist/s1");
        assert_eq!(perf.confidence_score, 1.0);
        assert_eq!(
            perf.metadata.get("artist_mbid"),
            Some(&MetadataValue::from("mbid-1"))
        );
        assert_eq!(
            perf.metadata.get("tour_name"),
            Some(&MetadataValue::from("Marquee Moon Tour"))
        );
    }

    #[test]
    fn undated_setlist_is_skipped() {
        let perf = source().setlist_to_performance(&setlist("s1", "", "Television"));
        assert!(perf.is_none());
    }

    #[test]
    fn pagination_rounds_up() {
        assert_eq!(SetlistFmSource::total_pages(20, 0), 0);
        assert_eq!(SetlistFmSource::total_pages(20, 1), 1);
        assert_eq!(SetlistFmSource::total_pages(20, 20), 1);
        assert_eq!(SetlistFmSource::total_pages(20, 21), 2);
        assert_eq!(SetlistFmSource::total_pages(0, 100), 1);
    }
}
