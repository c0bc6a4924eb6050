//! Paper metadata lookup used as the content for analysis.

use serde::Deserialize;
use std::sync::Arc;

use crate::config::{Config, MetadataConfig};
use crate::utils::{FetchRequest, HttpClient, NetworkError};

/// Metadata returned by the Graph API `paper/{id}` endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperContent {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub r#abstract: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub authors: Vec<ContentAuthor>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub publication_venue: Option<ContentVenue>,
    #[serde(default)]
    pub citation_count: Option<u64>,
    #[serde(default)]
    pub reference_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentAuthor {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContentVenue {
    #[serde(default)]
    pub name: Option<String>,
}

impl PaperContent {
    /// True when there is nothing worth sending to a model
    pub fn is_empty(&self) -> bool {
        let blank = |s: &Option<String>| s.as_deref().map_or(true, |s| s.trim().is_empty());
        blank(&self.title) && blank(&self.r#abstract)
    }

    /// Venue name, falling back to the structured publication venue
    pub fn venue_name(&self) -> &str {
        self.venue
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                self.publication_venue
                    .as_ref()
                    .and_then(|v| v.name.as_deref())
            })
            .unwrap_or_default()
    }

    /// Plain-text rendering fed to the generator
    pub fn to_prompt_text(&self) -> String {
        let authors: Vec<&str> = self
            .authors
            .iter()
            .filter_map(|a| a.name.as_deref())
            .collect();
        format!(
            "Title: {}\nAuthors: {}\nYear: {}\nVenue: {}\nAbstract: {}\nCitations: {}\nReferences: {}\n",
            self.title.as_deref().unwrap_or_default(),
            authors.join(", "),
            self.year.map(|y| y.to_string()).unwrap_or_default(),
            self.venue_name(),
            self.r#abstract.as_deref().unwrap_or_default(),
            self.citation_count.unwrap_or(0),
            self.reference_count.unwrap_or(0),
        )
    }
}

/// Errors from the metadata lookup
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error("invalid metadata response: {0}")]
    Decode(String),

    #[error("no title or abstract for {0}")]
    Empty(String),
}

/// Client for the metadata API
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Arc<HttpClient>,
    base_url: String,
    fields: String,
}

impl MetadataClient {
    pub fn new(client: Arc<HttpClient>, config: &MetadataConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            fields: config.fields.clone(),
        }
    }

    /// Build a client with the `[metadata]` attempt budget
    pub fn from_config(config: &Config) -> Result<Self, NetworkError> {
        let policy = config
            .transport
            .retry_policy()
            .max_attempts(config.metadata.max_attempts);
        let client = HttpClient::new(&config.transport)?.with_policy(policy);
        Ok(Self::new(Arc::new(client), &config.metadata))
    }

    /// Fetch metadata for a lookup key such as `arXiv:2301.12345`
    pub async fn fetch(&self, lookup_key: &str) -> Result<PaperContent, ContentError> {
        let url = format!("{}/paper/{}", self.base_url, encode_key(lookup_key));
        tracing::debug!("Fetching metadata from {}", url);

        let response = self
            .client
            .fetch(FetchRequest::get(url).param("fields", &self.fields))
            .await?;
        let content: PaperContent = response
            .json()
            .map_err(|e| ContentError::Decode(e.to_string()))?;

        if content.is_empty() {
            return Err(ContentError::Empty(lookup_key.to_string()));
        }
        Ok(content)
    }
}

/// Percent-encode a lookup key, keeping the `:` and `/` separators the API
/// expects in `arXiv:..` and `DOI:../..` keys
fn encode_key(key: &str) -> String {
    urlencoding::encode(key)
        .replace("%3A", ":")
        .replace("%2F", "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use mockito::Matcher;

    #[test]
    fn test_prompt_text() {
        let content: PaperContent = serde_json::from_str(
            r#"{"title": "Attention Is All You Need", "abstract": "Transformers.",
                "year": 2017, "venue": "", "publicationVenue": {"name": "NeurIPS"},
                "authors": [{"name": "Ashish Vaswani"}, {"name": "Noam Shazeer"}],
                "citationCount": 100000}"#,
        )
        .unwrap();

        assert_eq!(
            content.to_prompt_text(),
            "Title: Attention Is All You Need\n\
             Authors: Ashish Vaswani, Noam Shazeer\n\
             Year: 2017\n\
             Venue: NeurIPS\n\
             Abstract: Transformers.\n\
             Citations: 100000\n\
             References: 0\n"
        );
    }

    #[test]
    fn test_encode_key() {
        assert_eq!(encode_key("arXiv:2301.12345"), "arXiv:2301.12345");
        assert_eq!(encode_key("DOI:10.1145/3386569"), "DOI:10.1145/3386569");
        assert_eq!(encode_key("a b"), "a%20b");
    }

    #[tokio::test]
    async fn test_fetch_and_empty() {
        let mut server = mockito::Server::new_async().await;
        let found = server
            .mock("GET", "/paper/arXiv:1706.03762")
            .match_query(Matcher::UrlEncoded("fields".into(), "title,abstract".into()))
            .with_status(200)
            .with_body(r#"{"title": "Attention Is All You Need", "abstract": "A."}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/paper/arXiv:0000.00000")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"paperId": "x", "title": null}"#)
            .create_async()
            .await;

        let client = MetadataClient::new(
            Arc::new(HttpClient::new(&TransportConfig::default()).unwrap()),
            &MetadataConfig {
                base_url: server.url(),
                fields: "title,abstract".to_string(),
                max_attempts: 1,
            },
        );

        let content = client.fetch("arXiv:1706.03762").await.unwrap();
        found.assert_async().await;
        assert_eq!(content.title.as_deref(), Some("Attention Is All You Need"));

        let err = client.fetch("arXiv:0000.00000").await.unwrap_err();
        assert!(matches!(err, ContentError::Empty(_)));
    }
}
