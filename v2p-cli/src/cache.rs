//! SQLite result cache for external API responses
//!
//! Caches venue searches, performance fetches, and artist mappings with a
//! TTL so repeated runs against the same venue do not re-hit the upstream
//! APIs. Only the external collaborators read or write it; the filter and
//! strategy core persists nothing.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};
use v2p_common::models::{Artist, Performance, VenueMatch};
use v2p_common::Result;

const DEFAULT_TTL_DAYS: i64 = 7;

/// SQLite-backed cache for API responses and processed data.
pub struct Cache {
    pool: SqlitePool,
    ttl_days: i64,
}

impl Cache {
    /// Open (or create) the cache database at the given path.
    pub async fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        debug!("Connecting to cache database: {}", db_url);
        let pool = SqlitePool::connect(&db_url).await?;

        let cache = Self {
            pool,
            ttl_days: DEFAULT_TTL_DAYS,
        };
        cache.init_tables().await?;
        Ok(cache)
    }

    /// In-memory cache, used by tests.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePool::connect("sqlite::memory:").await?;
        let cache = Self {
            pool,
            ttl_days: DEFAULT_TTL_DAYS,
        };
        cache.init_tables().await?;
        Ok(cache)
    }

    /// Override the default 7-day TTL.
    pub fn with_ttl_days(mut self, ttl_days: i64) -> Self {
        self.ttl_days = ttl_days;
        self
    }

    async fn init_tables(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS venue_searches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                venue_name TEXT NOT NULL,
                city TEXT NOT NULL,
                source_name TEXT NOT NULL,
                results_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                UNIQUE(venue_name, city, source_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS performances (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                venue_id TEXT NOT NULL,
                source_name TEXT NOT NULL,
                start_date TEXT,
                end_date TEXT,
                performances_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                UNIQUE(venue_id, source_name, start_date, end_date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artist_mappings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                artist_name TEXT NOT NULL,
                artist_json TEXT NOT NULL,
                cached_at TEXT NOT NULL,
                UNIQUE(artist_name)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn is_expired(&self, cached_at: &str) -> bool {
        match DateTime::parse_from_rfc3339(cached_at) {
            Ok(time) => Utc::now() - time.with_timezone(&Utc) > Duration::days(self.ttl_days),
            Err(_) => true,
        }
    }

    fn now() -> String {
        Utc::now().to_rfc3339()
    }

    /// Decode a cached JSON payload; a corrupt row is treated as a miss.
    fn decode<T: serde::de::DeserializeOwned>(&self, json: &str, what: &str) -> Option<T> {
        match serde_json::from_str(json) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(what = %what, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    // Venue searches

    pub async fn get_venue_search(
        &self,
        venue_name: &str,
        city: &str,
        source_name: &str,
    ) -> Result<Option<Vec<VenueMatch>>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT results_json, cached_at FROM venue_searches
             WHERE venue_name = ? AND city = ? AND source_name = ?",
        )
        .bind(venue_name.to_lowercase())
        .bind(city.to_lowercase())
        .bind(source_name)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json, cached_at)) if !self.is_expired(&cached_at) => {
                Ok(self.decode(&json, "venue_search"))
            }
            _ => Ok(None),
        }
    }

    pub async fn set_venue_search(
        &self,
        venue_name: &str,
        city: &str,
        source_name: &str,
        results: &[VenueMatch],
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO venue_searches
                 (venue_name, city, source_name, results_json, cached_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(venue_name.to_lowercase())
        .bind(city.to_lowercase())
        .bind(source_name)
        .bind(serde_json::to_string(results).unwrap_or_else(|_| "[]".to_string()))
        .bind(Self::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Performance records

    pub async fn get_performances(
        &self,
        venue_id: &str,
        source_name: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<Option<Vec<Performance>>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT performances_json, cached_at FROM performances
             WHERE venue_id = ? AND source_name = ?
               AND (start_date = ? OR (start_date IS NULL AND ? IS NULL))
               AND (end_date = ? OR (end_date IS NULL AND ? IS NULL))",
        )
        .bind(venue_id)
        .bind(source_name)
        .bind(start_date)
        .bind(start_date)
        .bind(end_date)
        .bind(end_date)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json, cached_at)) if !self.is_expired(&cached_at) => {
                Ok(self.decode(&json, "performances"))
            }
            _ => Ok(None),
        }
    }

    pub async fn set_performances(
        &self,
        venue_id: &str,
        source_name: &str,
        performances: &[Performance],
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO performances
                 (venue_id, source_name, start_date, end_date, performances_json, cached_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(venue_id)
        .bind(source_name)
        .bind(start_date)
        .bind(end_date)
        .bind(serde_json::to_string(performances).unwrap_or_else(|_| "[]".to_string()))
        .bind(Self::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Artist mappings

    pub async fn get_artist_mapping(&self, artist_name: &str) -> Result<Option<Artist>> {
        let row: Option<(String, String)> = sqlx::query_as(
            "SELECT artist_json, cached_at FROM artist_mappings WHERE artist_name = ?",
        )
        .bind(artist_name.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json, cached_at)) if !self.is_expired(&cached_at) => {
                Ok(self.decode(&json, "artist_mapping"))
            }
            _ => Ok(None),
        }
    }

    /// Store an artist mapping, merging with any live existing entry.
    ///
    /// The MusicBrainz and Spotify clients each resolve one side of the
    /// artist's identity, so a write must not wipe the other service's
    /// id: ids and aliases fill in from the previous entry, and metadata
    /// keys from the newer record win.
    pub async fn set_artist_mapping(&self, artist_name: &str, artist: &Artist) -> Result<()> {
        let key = artist_name.to_lowercase();

        let previous: Option<(String, String)> = sqlx::query_as(
            "SELECT artist_json, cached_at FROM artist_mappings WHERE artist_name = ?",
        )
        .bind(&key)
        .fetch_optional(&self.pool)
        .await?;

        let merged = match previous {
            Some((json, cached_at)) if !self.is_expired(&cached_at) => {
                match self.decode::<Artist>(&json, "artist_mapping") {
                    Some(existing) => merge_artists(existing, artist.clone()),
                    None => artist.clone(),
                }
            }
            _ => artist.clone(),
        };

        sqlx::query(
            "INSERT OR REPLACE INTO artist_mappings (artist_name, artist_json, cached_at)
             VALUES (?, ?, ?)",
        )
        .bind(&key)
        .bind(serde_json::to_string(&merged).unwrap_or_else(|_| "{}".to_string()))
        .bind(Self::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Maintenance

    /// Delete all expired entries. Returns the number of deleted rows.
    pub async fn clear_expired(&self) -> Result<u64> {
        let cutoff = (Utc::now() - Duration::days(self.ttl_days)).to_rfc3339();
        let mut total = 0;

        for table in ["venue_searches", "performances", "artist_mappings"] {
            let result = sqlx::query(&format!("DELETE FROM {} WHERE cached_at < ?", table))
                .bind(&cutoff)
                .execute(&self.pool)
                .await?;
            total += result.rows_affected();
        }

        Ok(total)
    }

    /// Delete all cached data.
    pub async fn clear_all(&self) -> Result<()> {
        for table in ["venue_searches", "performances", "artist_mappings"] {
            sqlx::query(&format!("DELETE FROM {}", table))
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }
}

/// Merge a fresh artist record into a previously cached one.
fn merge_artists(previous: Artist, fresh: Artist) -> Artist {
    let mut metadata = previous.metadata;
    metadata.extend(fresh.metadata);

    let mut aliases = previous.aliases;
    for alias in fresh.aliases {
        if !aliases.contains(&alias) {
            aliases.push(alias);
        }
    }

    Artist {
        name: fresh.name,
        aliases,
        musicbrainz_id: fresh.musicbrainz_id.or(previous.musicbrainz_id),
        spotify_id: fresh.spotify_id.or(previous.spotify_id),
        metadata,
    }
}
