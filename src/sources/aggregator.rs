//! Fan-out search across all enabled sources.

use futures_util::future::join_all;
use std::sync::Arc;

use super::{Source, SourceError, SourceRegistry};
use crate::config::SearchConfig;
use crate::models::{PaperRecord, SearchQuery};
use crate::utils::dedupe;

const DEFAULT_MAX_RESULTS_CAP: usize = 20;

/// Errors returned by [`Aggregator::search`]
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Every source failed or returned nothing
    #[error("No results found for {query:?}{}", describe_failures(.failures))]
    NoResults {
        query: String,
        failures: Vec<SourceFailure>,
    },
}

fn describe_failures(failures: &[SourceFailure]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!(" ({})", parts.join("; "))
}

/// One source that failed during a search
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceFailure {
    pub source: String,
    pub error: String,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Merged records plus the sources that failed along the way
#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    pub papers: Vec<PaperRecord>,
    pub failures: Vec<SourceFailure>,
}

/// Queries every source concurrently and merges the results
#[derive(Debug, Clone)]
pub struct Aggregator {
    sources: Vec<Arc<dyn Source>>,
    max_results_cap: usize,
}

impl Aggregator {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        Self {
            sources,
            max_results_cap: DEFAULT_MAX_RESULTS_CAP,
        }
    }

    pub fn from_registry(registry: SourceRegistry, search: &SearchConfig) -> Self {
        Self::new(registry.into_sources()).with_max_results_cap(search.max_results_cap)
    }

    pub fn with_max_results_cap(mut self, cap: usize) -> Self {
        self.max_results_cap = cap.max(1);
        self
    }

    pub fn sources(&self) -> &[Arc<dyn Source>] {
        &self.sources
    }

    /// Check the query before any request is sent
    pub fn validate(&self, query: &SearchQuery) -> Result<(), SearchError> {
        if query.text.trim().is_empty() {
            return Err(SearchError::InvalidQuery(
                "query text must not be empty".to_string(),
            ));
        }
        if query.max_results == 0 || query.max_results > self.max_results_cap {
            return Err(SearchError::InvalidQuery(format!(
                "max_results must be between 1 and {}, got {}",
                self.max_results_cap, query.max_results
            )));
        }
        Ok(())
    }

    /// Search all sources and return at most `query.max_results` unique
    /// records. Fails only when nothing at all was found.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperRecord>, SearchError> {
        self.search_detailed(query).await.map(|result| result.papers)
    }

    /// Like [`search`](Self::search), but also reports which sources failed
    /// when others succeeded
    pub async fn search_detailed(&self, query: &SearchQuery) -> Result<AggregateResult, SearchError> {
        self.validate(query)?;

        let outcomes: Vec<Result<Vec<PaperRecord>, SourceError>> =
            join_all(self.sources.iter().map(|source| source.search(query))).await;

        let mut merged = Vec::new();
        let mut failures = Vec::new();
        // join_all keeps input order, so merging follows source order
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            match outcome {
                Ok(records) => {
                    tracing::info!("{}: {} record(s)", source.name(), records.len());
                    merged.extend(records);
                }
                Err(err) => {
                    tracing::warn!("Source {} failed: {}", source.id(), err);
                    failures.push(SourceFailure {
                        source: source.id().to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }

        let mut papers = dedupe(merged);
        papers.truncate(query.max_results);

        if papers.is_empty() {
            return Err(SearchError::NoResults {
                query: query.text.clone(),
                failures,
            });
        }

        tracing::info!("Found {} unique record(s) for {:?}", papers.len(), query.text);
        Ok(AggregateResult { papers, failures })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::mock::make_paper;
    use crate::sources::MockSource;
    use std::time::Duration;

    fn ids(papers: &[PaperRecord]) -> Vec<&str> {
        papers.iter().map(|p| p.id()).collect()
    }

    #[tokio::test]
    async fn test_merges_in_source_order_not_completion_order() {
        let slow = MockSource::new("slow")
            .with_records(vec![make_paper("s1", "Shared", "Ann"), make_paper("s2", "Slow", "Bo")])
            .with_delay(Duration::from_millis(50));
        let fast = MockSource::new("fast")
            .with_records(vec![make_paper("f1", "shared", "ann"), make_paper("f2", "Fast", "Cy")]);

        let aggregator = Aggregator::new(vec![Arc::new(slow), Arc::new(fast)]);
        let papers = aggregator
            .search(&SearchQuery::new("q").max_results(10))
            .await
            .unwrap();

        assert_eq!(ids(&papers), vec!["s1", "s2", "f2"]);
    }

    #[tokio::test]
    async fn test_failed_source_does_not_abort() {
        let down = Arc::new(MockSource::new("down").with_error("HTTP 503"));
        let up = Arc::new(MockSource::new("up").with_records(vec![make_paper("1", "T", "A")]));

        let aggregator = Aggregator::new(vec![down.clone(), up.clone()]);
        let result = aggregator
            .search_detailed(&SearchQuery::new("q"))
            .await
            .unwrap();

        assert_eq!(result.papers.len(), 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].source, "down");
        assert_eq!(down.calls(), 1);
        assert_eq!(up.calls(), 1);
    }

    #[tokio::test]
    async fn test_no_results_when_everything_fails() {
        let aggregator = Aggregator::new(vec![
            Arc::new(MockSource::new("a").with_error("boom")),
            Arc::new(MockSource::new("b")),
        ]);
        let err = aggregator
            .search(&SearchQuery::new("quantum gravity"))
            .await
            .unwrap_err();

        match &err {
            SearchError::NoResults { query, failures } => {
                assert_eq!(query, "quantum gravity");
                assert_eq!(failures.len(), 1);
            }
            other => panic!("unexpected error {:?}", other),
        }
        assert!(err.to_string().contains("quantum gravity"));
    }

    #[tokio::test]
    async fn test_no_sources_is_no_results() {
        let err = Aggregator::new(Vec::new())
            .search(&SearchQuery::new("q"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::NoResults { .. }));
    }

    #[tokio::test]
    async fn test_truncates_after_dedup() {
        let records = vec![
            make_paper("1", "A", "x"),
            make_paper("2", "A", "x"),
            make_paper("3", "B", "x"),
            make_paper("4", "C", "x"),
        ];
        let aggregator = Aggregator::new(vec![Arc::new(MockSource::new("m").with_records(records))]);
        let papers = aggregator
            .search(&SearchQuery::new("q").max_results(2))
            .await
            .unwrap();
        assert_eq!(ids(&papers), vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_invalid_queries_send_nothing() {
        let source = Arc::new(MockSource::new("m"));
        let aggregator = Aggregator::new(vec![source.clone()]).with_max_results_cap(20);

        for query in [
            SearchQuery::new("   "),
            SearchQuery::new("q").max_results(0),
            SearchQuery::new("q").max_results(21),
        ] {
            let err = aggregator.search(&query).await.unwrap_err();
            assert!(matches!(err, SearchError::InvalidQuery(_)));
        }
        assert_eq!(source.calls(), 0);
    }
}
