//! Performance data sources
//!
//! A data source is anything that can resolve a venue and return
//! documented performance records for it. Every record must carry
//! source attribution; sources never invent dates or performers.

pub mod setlist_fm;

pub use setlist_fm::SetlistFmSource;

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use v2p_common::models::{Performance, VenueMatch};
use v2p_common::Result;

/// A venue performance data source.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Unique identifier for this source (e.g. "setlist.fm").
    fn name(&self) -> &'static str;

    /// Search for venues matching the given name and city.
    async fn search_venues(&self, venue_name: &str, city: &str) -> Result<Vec<VenueMatch>>;

    /// Fetch performances at a venue, optionally pre-filtered to a window.
    async fn get_performances(
        &self,
        venue_id: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<Performance>>;
}

/// Registry of data sources, keyed by source name.
#[derive(Default)]
pub struct SourceRegistry {
    sources: BTreeMap<&'static str, Box<dyn DataSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: impl DataSource + 'static) {
        self.sources.insert(source.name(), Box::new(source));
    }

    pub fn get(&self, name: &str) -> Option<&dyn DataSource> {
        self.sources.get(name).map(|s| s.as_ref())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn DataSource> {
        self.sources.values().map(|s| s.as_ref())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.sources.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
