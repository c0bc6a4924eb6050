//! Mock source for testing purposes.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::models::{FieldMap, PaperRecord, PaperRecordBuilder, SearchQuery, SourceTag};
use crate::normalize::normalize;
use crate::sources::{Source, SourceError};

#[derive(Debug, Clone)]
enum Script {
    Records(Vec<PaperRecord>),
    Entries(Vec<FieldMap>),
    Error(String),
}

/// A source that returns scripted results without touching the network.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    script: Script,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a mock source that returns no records
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            script: Script::Records(Vec::new()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Return these records from every search
    pub fn with_records(mut self, records: Vec<PaperRecord>) -> Self {
        self.script = Script::Records(records);
        self
    }

    /// Normalize these raw entries on every search
    pub fn with_entries(mut self, entries: Vec<FieldMap>) -> Self {
        self.script = Script::Entries(entries);
        self
    }

    /// Fail every search with an API error
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.script = Script::Error(message.into());
        self
    }

    /// Wait before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of searches served so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Other(self.id.clone())
    }

    async fn search(&self, _query: &SearchQuery) -> Result<Vec<PaperRecord>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.script {
            Script::Records(records) => Ok(records.clone()),
            Script::Entries(entries) => {
                let tag = self.tag();
                Ok(entries.iter().map(|e| normalize(e, &tag)).collect())
            }
            Script::Error(message) => Err(SourceError::Api(message.clone())),
        }
    }
}

/// Helper function to create a mock paper for testing.
pub fn make_paper(id: &str, title: &str, first_author: &str) -> PaperRecord {
    PaperRecordBuilder::new(id, SourceTag::Other("mock".to_string()))
        .title(title)
        .authors([first_author])
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_records() {
        let source = MockSource::new("mock").with_records(vec![make_paper("1", "T", "A")]);
        let records = source.search(&SearchQuery::new("q")).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_scripted_entries_are_normalized() {
        let source = MockSource::new("fixture")
            .with_entries(vec![FieldMap::new().with("id", "x").with("title", "Raw")]);
        let records = source.search(&SearchQuery::new("q")).await.unwrap();
        assert_eq!(records[0].title(), "Raw");
        assert_eq!(records[0].source().id(), "fixture");
    }

    #[tokio::test]
    async fn test_scripted_error() {
        let source = MockSource::new("down").with_error("service unavailable");
        let err = source.search(&SearchQuery::new("q")).await.unwrap_err();
        assert!(err.to_string().contains("service unavailable"));
    }
}
