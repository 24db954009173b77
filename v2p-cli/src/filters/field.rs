//! Generic metadata field filter

use std::collections::BTreeSet;

use super::{Filter, FilterResult};
use v2p_common::models::{ExcludedItem, MetadataValue, Performance};

/// Filters on any structured metadata field against a set of allowed
/// values.
///
/// Enables new filtering dimensions without code changes: have the data
/// source populate the metadata field, then construct a `FieldFilter`
/// for it (e.g. genre, country, decade). List-valued fields match when
/// ANY element matches an allowed value.
pub struct FieldFilter {
    field: String,
    allowed_values: BTreeSet<String>,
    case_insensitive: bool,
    include_missing: bool,
    normalized_allowed: BTreeSet<String>,
}

impl FieldFilter {
    /// Create a field filter. Defaults: case-insensitive matching,
    /// records missing the field excluded.
    pub fn new<I, S>(field: impl Into<String>, allowed_values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allowed_values: BTreeSet<String> =
            allowed_values.into_iter().map(Into::into).collect();
        let mut filter = Self {
            field: field.into(),
            allowed_values,
            case_insensitive: true,
            include_missing: false,
            normalized_allowed: BTreeSet::new(),
        };
        filter.renormalize();
        filter
    }

    /// Toggle case-insensitive string comparison (default true).
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self.renormalize();
        self
    }

    /// Toggle inclusion of records missing the field (default false).
    pub fn include_missing(mut self, include_missing: bool) -> Self {
        self.include_missing = include_missing;
        self
    }

    fn renormalize(&mut self) {
        self.normalized_allowed = self
            .allowed_values
            .iter()
            .map(|v| self.normalize(v))
            .collect();
    }

    fn normalize(&self, value: &str) -> String {
        if self.case_insensitive {
            value.to_lowercase()
        } else {
            value.to_string()
        }
    }

    fn matches(&self, value: &MetadataValue) -> bool {
        match value {
            MetadataValue::List(items) => items
                .iter()
                .any(|item| self.normalized_allowed.contains(&self.normalize(item))),
            MetadataValue::Str(s) => self.normalized_allowed.contains(&self.normalize(s)),
            // Numbers and booleans compare by their display form
            other => self
                .normalized_allowed
                .contains(&self.normalize(&other.to_string())),
        }
    }
}

impl Filter for FieldFilter {
    fn name(&self) -> String {
        let values: Vec<&str> = self.allowed_values.iter().map(String::as_str).collect();
        format!("field({}={{{}}})", self.field, values.join(","))
    }

    fn apply(&self, performances: &[Performance]) -> FilterResult {
        let mut result = FilterResult::default();

        for perf in performances {
            match perf.metadata.get(&self.field) {
                None => {
                    if self.include_missing {
                        result.included.push(perf.clone());
                    } else {
                        result.excluded.push(ExcludedItem::performance(
                            perf.display_name(),
                            format!("Missing metadata field '{}'", self.field),
                            &self.name(),
                        ));
                    }
                }
                Some(value) if self.matches(value) => {
                    result.included.push(perf.clone());
                }
                Some(value) => {
                    result.excluded.push(ExcludedItem::performance(
                        perf.display_name(),
                        format!(
                            "Field '{}' value '{}' not in allowed values {{{}}}",
                            self.field,
                            value,
                            self.allowed_values
                                .iter()
                                .cloned()
                                .collect::<Vec<_>>()
                                .join(",")
                        ),
                        &self.name(),
                    ));
                }
            }
        }

        result
    }
}
