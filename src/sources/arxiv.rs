//! arXiv research source implementation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ArxivConfig;
use crate::models::{PaperRecord, SearchQuery, SourceTag};
use crate::parser::PayloadFormat;
use crate::sources::{records_from_payload, Source, SourceError};
use crate::utils::{FetchRequest, HttpClient};

const DEFAULT_OVERFETCH: usize = 2;

/// arXiv export API source.
///
/// Requests twice the wanted number of entries so that malformed entries
/// and duplicates can be dropped without coming up short.
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
    overfetch_factor: usize,
}

impl ArxivSource {
    pub fn new(client: Arc<HttpClient>, config: &ArxivConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            overfetch_factor: DEFAULT_OVERFETCH,
        }
    }

    pub fn with_overfetch(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    fn build_request(&self, query: &SearchQuery) -> FetchRequest {
        FetchRequest::get(self.base_url.clone())
            .param("search_query", format!("all:{}", query.text.trim()))
            .param("start", 0)
            .param("max_results", query.overfetch(self.overfetch_factor))
            .param("sortBy", "relevance")
            .param("sortOrder", "descending")
            .accept("application/atom+xml")
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::Arxiv
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperRecord>, SourceError> {
        tracing::debug!("Searching arXiv for {:?}", query.text);

        let response = self.client.fetch(self.build_request(query)).await?;
        let records = records_from_payload(
            response.body(),
            PayloadFormat::Atom,
            &self.tag(),
            query.overfetch(self.overfetch_factor),
        )?;

        tracing::info!(
            "arXiv returned {} record(s) after {} attempt(s)",
            records.len(),
            response.attempts
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use mockito::Matcher;

    fn entry(id: &str, title: &str) -> String {
        format!(
            "<entry><id>http://arxiv.org/abs/{id}v1</id>\
             <published>2024-01-15T10:00:00Z</published>\
             <title>{title}</title><summary>About {title}.</summary>\
             <author><name>Ada Lovelace</name></author>\
             <arxiv:primary_category xmlns:arxiv=\"http://arxiv.org/schemas/atom\" term=\"cs.AI\"/>\
             </entry>"
        )
    }

    fn source_for(server: &mockito::Server) -> ArxivSource {
        let transport = TransportConfig {
            max_attempts: 2,
            backoff_base_ms: 1,
            ..TransportConfig::default()
        };
        let client = Arc::new(HttpClient::new(&transport).unwrap());
        ArxivSource::new(
            client,
            &ArxivConfig {
                base_url: format!("{}/api/query", server.url()),
            },
        )
    }

    #[tokio::test]
    async fn test_search_sends_expected_query() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "<feed xmlns=\"http://www.w3.org/2005/Atom\">{}{}</feed>",
            entry("2401.00001", "First"),
            entry("2401.00002", "Second")
        );
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:graph neural networks".into()),
                Matcher::UrlEncoded("start".into(), "0".into()),
                Matcher::UrlEncoded("max_results".into(), "6".into()),
                Matcher::UrlEncoded("sortBy".into(), "relevance".into()),
                Matcher::UrlEncoded("sortOrder".into(), "descending".into()),
            ]))
            .match_header("accept", "application/atom+xml")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let source = source_for(&server);
        let query = SearchQuery::new("graph neural networks").max_results(3);
        let records = source.search(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "https://arxiv.org/abs/2401.00001");
        assert_eq!(records[0].venue(), "cs.AI");
        assert_eq!(records[0].year(), Some(2024));
        assert_eq!(records[1].title(), "Second");
        assert!(records.iter().all(|r| r.source() == &source.tag()));
    }

    #[tokio::test]
    async fn test_search_surfaces_network_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let source = source_for(&server);
        let err = source.search(&SearchQuery::new("x")).await.unwrap_err();

        mock.assert_async().await;
        match err {
            SourceError::Network(e) => assert_eq!(e.attempts(), 2),
            other => panic!("expected network error, got {:?}", other),
        }
    }
}
