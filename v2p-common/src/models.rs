//! Shared data models for v2p
//!
//! Every record that crosses a module boundary (source -> filter ->
//! strategy -> playlist) is one of these types. All of them serialize, so
//! the cache and the JSON result output reuse the same definitions.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Open-ended metadata value attached to performances and artists.
///
/// Closed sum rather than arbitrary JSON so the field filter's type
/// dispatch stays exhaustive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Num(f64),
    Str(String),
    List(Vec<String>),
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::Bool(b) => write!(f, "{}", b),
            MetadataValue::Num(n) => write!(f, "{}", n),
            MetadataValue::Str(s) => write!(f, "{}", s),
            MetadataValue::List(items) => write!(f, "[{}]", items.join(", ")),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::Str(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::Str(s)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(items: Vec<String>) -> Self {
        MetadataValue::List(items)
    }
}

/// Extensible key-value metadata bag.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A documented performance record from a data source.
///
/// Each record must carry temporal evidence (exact date or date range);
/// records without it cannot pass any date-based filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Performance {
    /// Artist or band name as documented
    pub artist_name: String,
    /// Venue name as documented
    pub venue_name: String,
    /// City where the venue is located
    pub city: String,
    /// Country code (ISO 3166-1 alpha-2)
    pub country: Option<String>,
    /// Exact performance date if known
    pub performance_date: Option<NaiveDate>,
    /// Date range (start, end) if the exact date is unknown
    pub performance_date_range: Option<(NaiveDate, NaiveDate)>,
    /// Name of the data source (e.g., "setlist.fm")
    pub source_name: String,
    /// URL or identifier for the source record
    pub source_reference: String,
    /// Confidence in the record (0.0-1.0); below 1.0 when dates are approximate
    pub confidence_score: f64,
    /// Additional structured fields (genre, country, ...) for filtering
    #[serde(default)]
    pub metadata: Metadata,
}

impl Performance {
    /// Whether this record carries temporal evidence.
    pub fn has_temporal_evidence(&self) -> bool {
        self.performance_date.is_some() || self.performance_date_range.is_some()
    }

    /// Whether this performance falls within or overlaps the given window.
    ///
    /// An exact date takes precedence over a documented range. Range
    /// comparison is a closed-interval overlap test, not containment.
    pub fn overlaps_range(&self, start: NaiveDate, end: NaiveDate) -> bool {
        if let Some(date) = self.performance_date {
            return start <= date && date <= end;
        }
        if let Some((perf_start, perf_end)) = self.performance_date_range {
            // Ranges overlap if neither ends before the other starts
            return perf_start <= end && start <= perf_end;
        }
        false
    }

    /// Display label used in exclusion audit entries.
    pub fn display_name(&self) -> String {
        format!("{} @ {}", self.artist_name, self.venue_name)
    }
}

/// A canonicalized artist identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    /// Canonical artist name
    pub name: String,
    /// Known aliases and spelling variants
    #[serde(default)]
    pub aliases: Vec<String>,
    /// MusicBrainz artist MBID
    pub musicbrainz_id: Option<String>,
    /// Spotify artist ID
    pub spotify_id: Option<String>,
    /// Additional structured fields (genres, country, active years, ...)
    #[serde(default)]
    pub metadata: Metadata,
}

/// Raw track data from the catalog provider, read-only input to strategies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogTrack {
    /// Spotify track ID
    pub id: String,
    /// Track name
    pub name: String,
    /// Primary artist name
    pub artist_name: String,
    /// Album name
    pub album_name: String,
    /// Raw release date string (YYYY, YYYY-MM, or YYYY-MM-DD)
    pub release_date: Option<String>,
    /// Spotify popularity score (0-100)
    pub popularity: u32,
}

/// A track selected for the playlist. Created only by a strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Spotify track ID
    pub spotify_id: String,
    /// Track name
    pub name: String,
    /// Artist name on Spotify
    pub artist_name: String,
    /// Album name
    pub album_name: String,
    /// Normalized album/track release date
    pub release_date: Option<NaiveDate>,
    /// Spotify popularity score (0-100)
    pub popularity: u32,
    /// Strategy that selected this track
    pub selection_strategy: String,
    /// Why this track was selected
    pub selection_reason: String,
}

/// A performance or artist dropped from the pipeline, with the reason.
///
/// Append-only audit record; accumulated across the whole run for
/// transparency, never used for control flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcludedItem {
    /// Type of item: "performance" or "artist"
    pub item_type: String,
    /// Artist or performance identifier
    pub name: String,
    /// Human-readable reason for exclusion
    pub reason: String,
    /// Filter or strategy step that caused the exclusion
    pub filter_name: Option<String>,
}

impl ExcludedItem {
    pub fn performance(name: impl Into<String>, reason: impl Into<String>, filter_name: &str) -> Self {
        Self {
            item_type: "performance".to_string(),
            name: name.into(),
            reason: reason.into(),
            filter_name: Some(filter_name.to_string()),
        }
    }

    pub fn artist(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            item_type: "artist".to_string(),
            name: name.into(),
            reason: reason.into(),
            filter_name: None,
        }
    }
}

/// A venue match from a data source search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueMatch {
    /// Venue identifier in the data source
    pub venue_id: String,
    /// Venue name
    pub venue_name: String,
    /// City name
    pub city: String,
    /// Country code
    pub country: Option<String>,
    /// Data source name
    pub source_name: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Final output of a playlist creation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistResult {
    /// Spotify playlist ID
    pub playlist_id: String,
    /// Spotify playlist URL
    pub playlist_url: String,
    /// Name of the created playlist
    pub playlist_name: String,
    /// Performances included in the playlist (one per unique artist)
    pub performances: Vec<Performance>,
    /// Tracks added to the playlist
    pub tracks: Vec<Track>,
    /// Items excluded during the run, with reasons
    #[serde(default)]
    pub excluded_items: Vec<ExcludedItem>,
    /// Data sources queried
    pub sources_used: Vec<String>,
    /// Total unique artists in the playlist
    pub total_artists: usize,
}
