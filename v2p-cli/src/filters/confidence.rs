//! Confidence threshold filter

use super::{Filter, FilterResult};
use v2p_common::models::{ExcludedItem, Performance};
use v2p_common::{Error, Result};

/// Excludes performances with a confidence score below a threshold.
pub struct ConfidenceFilter {
    min_confidence: f64,
}

impl ConfidenceFilter {
    /// Create a confidence filter.
    ///
    /// Thresholds outside [0, 1] are a construction-time error, never
    /// silently clamped.
    pub fn new(min_confidence: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(Error::InvalidConfiguration(format!(
                "min_confidence must be between 0.0 and 1.0, got {}",
                min_confidence
            )));
        }
        Ok(Self { min_confidence })
    }
}

impl Filter for ConfidenceFilter {
    fn name(&self) -> String {
        format!("confidence(>={})", self.min_confidence)
    }

    fn apply(&self, performances: &[Performance]) -> FilterResult {
        let mut result = FilterResult::default();

        for perf in performances {
            if perf.confidence_score >= self.min_confidence {
                result.included.push(perf.clone());
            } else {
                result.excluded.push(ExcludedItem::performance(
                    perf.display_name(),
                    format!(
                        "Confidence {:.2} below threshold {}",
                        perf.confidence_score, self.min_confidence
                    ),
                    &self.name(),
                ));
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{date, performance};
    use super::*;

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        assert!(matches!(
            ConfidenceFilter::new(-0.1),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(matches!(
            ConfidenceFilter::new(1.5),
            Err(Error::InvalidConfiguration(_))
        ));
        assert!(ConfidenceFilter::new(0.0).is_ok());
        assert!(ConfidenceFilter::new(1.0).is_ok());
    }

    #[test]
    fn threshold_is_inclusive() {
        let filter = ConfidenceFilter::new(0.5).unwrap();
        let records = vec![
            performance("Television", Some(date(1978, 3, 10)), 0.5),
            performance("Blondie", Some(date(1978, 3, 11)), 0.49),
        ];

        let result = filter.apply(&records);
        assert_eq!(result.included.len(), 1);
        assert_eq!(result.included[0].artist_name, "Television");
        assert_eq!(result.excluded.len(), 1);
    }

    #[test]
    fn exclusion_reason_cites_score_and_threshold() {
        let filter = ConfidenceFilter::new(0.5).unwrap();
        let records = vec![performance("Blondie", Some(date(1978, 3, 11)), 0.49)];

        let result = filter.apply(&records);
        let excluded = &result.excluded[0];
        assert!(excluded.reason.contains("0.49"));
        assert!(excluded.reason.contains("0.5"));
        assert_eq!(excluded.filter_name.as_deref(), Some("confidence(>=0.5)"));
    }

    #[test]
    fn name_is_deterministic() {
        let filter = ConfidenceFilter::new(0.75).unwrap();
        assert_eq!(filter.name(), "confidence(>=0.75)");
    }
}
