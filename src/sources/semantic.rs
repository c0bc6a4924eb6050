//! Semantic Scholar research source implementation.

use async_trait::async_trait;
use reqwest::header::HeaderName;
use std::sync::Arc;

use crate::config::SemanticConfig;
use crate::models::{PaperRecord, SearchQuery, SourceTag};
use crate::parser::PayloadFormat;
use crate::sources::{records_from_payload, Source, SourceError};
use crate::utils::{FetchRequest, HttpClient};

const SEARCH_FIELDS: &str =
    "paperId,title,abstract,year,authors,venue,url,citationCount,referenceCount";

/// The search endpoint rejects larger pages
const MAX_LIMIT: usize = 100;

/// Semantic Scholar Graph API source
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: Option<String>,
    overfetch_factor: usize,
}

impl SemanticScholarSource {
    pub fn new(client: Arc<HttpClient>, config: &SemanticConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            overfetch_factor: 2,
        }
    }

    pub fn with_overfetch(mut self, factor: usize) -> Self {
        self.overfetch_factor = factor.max(1);
        self
    }

    fn limit(&self, query: &SearchQuery) -> usize {
        query.overfetch(self.overfetch_factor).min(MAX_LIMIT)
    }

    fn build_request(&self, query: &SearchQuery) -> FetchRequest {
        let request = FetchRequest::get(format!("{}/paper/search", self.base_url))
            .param("query", query.text.trim())
            .param("limit", self.limit(query))
            .param("fields", SEARCH_FIELDS)
            .accept("application/json");

        match &self.api_key {
            Some(key) => request.header(HeaderName::from_static("x-api-key"), key),
            None => request,
        }
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic_scholar"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn tag(&self) -> SourceTag {
        SourceTag::SemanticScholar
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperRecord>, SourceError> {
        tracing::debug!("Searching Semantic Scholar for {:?}", query.text);

        let response = self.client.fetch(self.build_request(query)).await?;
        let records = records_from_payload(
            response.body(),
            PayloadFormat::Json,
            &self.tag(),
            self.limit(query),
        )?;

        tracing::info!("Semantic Scholar returned {} record(s)", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use mockito::Matcher;

    #[tokio::test]
    async fn test_search_with_api_key() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/graph/v1/paper/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), "protein folding".into()),
                Matcher::UrlEncoded("limit".into(), "10".into()),
            ]))
            .match_header("x-api-key", "k-123")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"total": 2, "offset": 0, "data": [
                    {"paperId": "p1", "url": "https://www.semanticscholar.org/paper/p1",
                     "title": "AlphaFold", "abstract": "Structure prediction.", "year": 2021,
                     "venue": "Nature", "citationCount": 12000,
                     "authors": [{"authorId": "1", "name": "John Jumper"}]},
                    {"paperId": "p2", "title": "No Abstract", "abstract": null,
                     "year": null, "authors": []}
                ]}"#,
            )
            .create_async()
            .await;

        let client = Arc::new(HttpClient::new(&TransportConfig::default()).unwrap());
        let source = SemanticScholarSource::new(
            client,
            &SemanticConfig {
                base_url: format!("{}/graph/v1/", server.url()),
                api_key: Some("k-123".to_string()),
            },
        );

        let records = source
            .search(&SearchQuery::new("protein folding").max_results(5))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id(), "https://www.semanticscholar.org/paper/p1");
        assert_eq!(records[0].citations(), 12000);
        assert_eq!(records[0].authors(), ["John Jumper"]);
        assert_eq!(records[1].id(), "p2");
        assert_eq!(records[1].abstract_text(), "");
        assert_eq!(records[1].year(), None);
        assert_eq!(records[1].source(), &SourceTag::SemanticScholar);
    }
}
