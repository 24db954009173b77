//! Extensible filter framework for performance records
//!
//! Filters operate on structured `Performance` data and classify every
//! input record as included or excluded-with-reason. Chains compose
//! filters sequentially, threading the included set forward and
//! accumulating exclusions from every stage into one audit trail.

pub mod confidence;
pub mod date_range;
pub mod field;

pub use confidence::ConfidenceFilter;
pub use date_range::DateRangeFilter;
pub use field::FieldFilter;

use v2p_common::models::{ExcludedItem, Performance};

/// Result of applying a filter or a whole chain.
///
/// `included` preserves input order; `excluded` is in filter-application
/// order and is append-only.
#[derive(Debug, Default)]
pub struct FilterResult {
    pub included: Vec<Performance>,
    pub excluded: Vec<ExcludedItem>,
}

/// A performance filter.
///
/// Implementations must be pure: no input mutation, no errors for
/// well-formed input, and every input record classified exactly once.
///
/// A new filter's predicate must not depend on metadata written by an
/// earlier filter in the chain; the chain relies on each inclusion test
/// being independent so that filter order only changes which filter
/// claims an exclusion, never the final included set.
pub trait Filter: Send + Sync {
    /// Deterministic identifier describing this filter's configuration,
    /// used for audit grouping (e.g. `confidence(>=0.5)`).
    fn name(&self) -> String;

    /// Classify every record as included or excluded.
    fn apply(&self, performances: &[Performance]) -> FilterResult;
}

/// Ordered chain of filters applied in sequence.
///
/// Each stage receives the included set of the previous stage; excluded
/// items accumulate across all stages. An empty chain is a legal no-op.
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn Filter>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter, consuming and returning the chain.
    pub fn add(mut self, filter: impl Filter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Apply all filters in sequence.
    pub fn apply(&self, performances: &[Performance]) -> FilterResult {
        let mut current = performances.to_vec();
        let mut all_excluded: Vec<ExcludedItem> = Vec::new();

        for filter in &self.filters {
            let result = filter.apply(&current);
            current = result.included;
            all_excluded.extend(result.excluded);
        }

        FilterResult {
            included: current,
            excluded: all_excluded,
        }
    }

    /// Names of all filters in the chain, in application order.
    pub fn names(&self) -> Vec<String> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::NaiveDate;
    use v2p_common::models::{Metadata, Performance};

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn performance(artist: &str, perf_date: Option<NaiveDate>, confidence: f64) -> Performance {
        Performance {
            artist_name: artist.to_string(),
            venue_name: "CBGB".to_string(),
            city: "New York".to_string(),
            country: Some("US".to_string()),
            performance_date: perf_date,
            performance_date_range: None,
            source_name: "setlist.fm".to_string(),
            source_reference: format!("https://www.setlist.fm/setlist/{}", artist),
            confidence_score: confidence,
            metadata: Metadata::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::{date, performance};
    use super::*;

    #[test]
    fn empty_chain_is_a_no_op() {
        let records = vec![
            performance("Television", Some(date(1978, 3, 10)), 1.0),
            performance("Blondie", None, 0.4),
        ];

        let chain = FilterChain::new();
        let result = chain.apply(&records);

        assert_eq!(result.included.len(), 2);
        assert!(result.excluded.is_empty());
    }

    #[test]
    fn every_record_classified_exactly_once() {
        let records = vec![
            performance("Television", Some(date(1978, 3, 10)), 1.0),
            performance("Blondie", Some(date(1985, 6, 1)), 0.9),
            performance("Ramones", None, 0.3),
            performance("Talking Heads", Some(date(1979, 1, 5)), 0.2),
        ];

        let chain = FilterChain::new()
            .add(DateRangeFilter::new(date(1978, 1, 1), date(1980, 12, 31)))
            .add(ConfidenceFilter::new(0.5).unwrap());

        let result = chain.apply(&records);
        assert_eq!(result.included.len() + result.excluded.len(), records.len());

        // No duplicates: each artist appears once across both lists
        let mut names: Vec<String> = result
            .included
            .iter()
            .map(|p| p.artist_name.clone())
            .chain(result.excluded.iter().map(|e| {
                e.name.split(" @ ").next().unwrap_or(&e.name).to_string()
            }))
            .collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), records.len());
    }

    #[test]
    fn excluded_lists_concatenate_across_stages() {
        let records = vec![
            performance("Television", Some(date(1985, 3, 10)), 1.0),
            performance("Blondie", Some(date(1978, 6, 1)), 0.2),
        ];

        let chain = FilterChain::new()
            .add(DateRangeFilter::new(date(1978, 1, 1), date(1980, 12, 31)))
            .add(ConfidenceFilter::new(0.5).unwrap());

        let result = chain.apply(&records);
        assert!(result.included.is_empty());
        assert_eq!(result.excluded.len(), 2);
        // Exclusion order follows filter application order
        assert_eq!(
            result.excluded[0].filter_name.as_deref(),
            Some("date_range(1978-01-01:1980-12-31)")
        );
        assert_eq!(
            result.excluded[1].filter_name.as_deref(),
            Some("confidence(>=0.5)")
        );
    }

    #[test]
    fn filter_order_changes_claiming_filter_not_inclusion() {
        // This record fails both the date filter and the confidence filter
        let records = vec![performance("Suicide", Some(date(1990, 1, 1)), 0.1)];

        let date_first = FilterChain::new()
            .add(DateRangeFilter::new(date(1978, 1, 1), date(1980, 12, 31)))
            .add(ConfidenceFilter::new(0.5).unwrap());
        let confidence_first = FilterChain::new()
            .add(ConfidenceFilter::new(0.5).unwrap())
            .add(DateRangeFilter::new(date(1978, 1, 1), date(1980, 12, 31)));

        let a = date_first.apply(&records);
        let b = confidence_first.apply(&records);

        // Excluded either way
        assert!(a.included.is_empty());
        assert!(b.included.is_empty());
        assert_eq!(a.excluded.len(), 1);
        assert_eq!(b.excluded.len(), 1);

        // But claimed by whichever filter ran first
        assert!(a.excluded[0]
            .filter_name
            .as_deref()
            .unwrap()
            .starts_with("date_range"));
        assert!(b.excluded[0]
            .filter_name
            .as_deref()
            .unwrap()
            .starts_with("confidence"));
    }

    #[test]
    fn chain_reports_filter_names_in_order() {
        let chain = FilterChain::new()
            .add(ConfidenceFilter::new(0.5).unwrap())
            .add(DateRangeFilter::new(date(1978, 1, 1), date(1980, 12, 31)));

        assert_eq!(chain.len(), 2);
        assert_eq!(
            chain.names(),
            vec![
                "confidence(>=0.5)".to_string(),
                "date_range(1978-01-01:1980-12-31)".to_string()
            ]
        );
    }
}
