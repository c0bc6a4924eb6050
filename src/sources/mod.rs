//! Research sources with a small trait-based plugin architecture.
//!
//! Every provider implements [`Source`]: it sends one search request through
//! the shared [`HttpClient`](crate::utils::HttpClient), parses the payload
//! with [`crate::parser`] and normalizes each entry with
//! [`crate::normalize`]. The [`Aggregator`] fans a query out to all enabled
//! sources and merges what comes back.
//!
//! # Runtime Source Configuration
//!
//! Enabled sources and their order come from the `[sources]` section of the
//! configuration file (or `RESEARCH_ASSISTANT__SOURCES__ENABLED`):
//!
//! ```toml
//! [sources]
//! enabled = ["arxiv", "semantic_scholar"]
//!
//! [sources.semantic]
//! api_key = "..."
//! ```
//!
//! Unknown names are logged and ignored. Results are merged in the
//! configured order, so the first source wins when two return the same paper.

mod aggregator;
mod arxiv;
mod registry;
mod semantic;

pub mod mock;

pub use aggregator::{AggregateResult, Aggregator, SearchError, SourceFailure};
pub use arxiv::ArxivSource;
pub use mock::MockSource;
pub use registry::{known_sources, SourceInfo, SourceRegistry};
pub use semantic::SemanticScholarSource;

use async_trait::async_trait;

use crate::models::{PaperRecord, SearchQuery, SourceTag};
use crate::normalize::normalize;
use crate::parser::{self, ParseError, PayloadFormat};
use crate::utils::NetworkError;

/// The Source trait defines the interface for all research source plugins.
///
/// # Implementing a New Source
///
/// 1. Create a new struct that implements `Source`
/// 2. Give it a [`SourceTag`] and teach [`crate::normalize`] its field names
/// 3. Add a constructor arm to the registry so it can be enabled by name
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (used in configuration, e.g. "arxiv")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Tag stamped on every record this source produces
    fn tag(&self) -> SourceTag;

    /// Search for papers matching the query.
    ///
    /// May return more than `query.max_results` records; trimming happens
    /// after deduplication in the aggregator.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<PaperRecord>, SourceError>;
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Transport failure after retries
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// The payload could not be read at all
    #[error("Parse error: {0}")]
    Parse(String),

    /// API error reported by the source
    #[error("API error: {0}")]
    Api(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<ParseError> for SourceError {
    fn from(err: ParseError) -> Self {
        SourceError::Parse(err.to_string())
    }
}

/// Parse a payload and normalize up to `limit` well-formed entries
pub(crate) fn records_from_payload(
    payload: &[u8],
    format: PayloadFormat,
    tag: &SourceTag,
    limit: usize,
) -> Result<Vec<PaperRecord>, SourceError> {
    let mut entries = parser::parse(payload, format)?;
    let records: Vec<PaperRecord> = entries
        .by_ref()
        .take(limit)
        .map(|fields| normalize(&fields, tag))
        .collect();

    if entries.skipped() > 0 {
        tracing::warn!(
            "{}: skipped {} malformed entr{}",
            tag,
            entries.skipped(),
            if entries.skipped() == 1 { "y" } else { "ies" }
        );
    }
    Ok(records)
}
