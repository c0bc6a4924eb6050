//! Search request model.

use serde::{Deserialize, Serialize};

/// Default number of results when the caller does not ask for a count
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Search query parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text query; must not be blank
    pub text: String,

    /// Maximum number of records to return (upper-bounded by configuration)
    pub max_results: usize,
}

impl SearchQuery {
    /// Create a new search query
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            max_results: DEFAULT_MAX_RESULTS,
        }
    }

    /// Set maximum results
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Number of raw entries to request upstream so that skipped entries
    /// still leave enough records to fill `max_results`
    pub fn overfetch(&self, factor: usize) -> usize {
        self.max_results.saturating_mul(factor.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_builder() {
        let query = SearchQuery::new("machine learning in healthcare").max_results(7);
        assert_eq!(query.text, "machine learning in healthcare");
        assert_eq!(query.max_results, 7);
        assert_eq!(SearchQuery::new("x").max_results, DEFAULT_MAX_RESULTS);
    }

    #[test]
    fn test_overfetch() {
        let query = SearchQuery::new("x").max_results(5);
        assert_eq!(query.overfetch(2), 10);
        assert_eq!(query.overfetch(0), 5);
    }
}
