//! Date range filter

use super::{Filter, FilterResult};
use chrono::NaiveDate;
use v2p_common::models::{ExcludedItem, Performance};

/// Filters performances to an inclusive date window.
///
/// A record with an exact date is included when the date falls inside the
/// window. A record with only a documented range is included when the
/// range overlaps the window (closed-interval overlap, not containment).
/// Records with no temporal evidence are excluded, never defaulted.
pub struct DateRangeFilter {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl DateRangeFilter {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    fn record_dates(perf: &Performance) -> String {
        if let Some(date) = perf.performance_date {
            return date.to_string();
        }
        match perf.performance_date_range {
            Some((start, end)) => format!("{}..{}", start, end),
            None => "unknown".to_string(),
        }
    }
}

impl Filter for DateRangeFilter {
    fn name(&self) -> String {
        format!("date_range({}:{})", self.start_date, self.end_date)
    }

    fn apply(&self, performances: &[Performance]) -> FilterResult {
        let mut result = FilterResult::default();

        for perf in performances {
            if !perf.has_temporal_evidence() {
                result.excluded.push(ExcludedItem::performance(
                    perf.display_name(),
                    "No temporal evidence (missing date)",
                    &self.name(),
                ));
            } else if perf.overlaps_range(self.start_date, self.end_date) {
                result.included.push(perf.clone());
            } else {
                result.excluded.push(ExcludedItem::performance(
                    perf.display_name(),
                    format!(
                        "Date {} outside range {} to {}",
                        Self::record_dates(perf),
                        self.start_date,
                        self.end_date
                    ),
                    &self.name(),
                ));
            }
        }

        result
    }
}
