//! Canonical paper record shared by every source.

use serde::{Deserialize, Serialize};

/// The provider that produced a record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    Arxiv,
    SemanticScholar,
    #[serde(untagged)]
    Other(String),
}

impl SourceTag {
    /// Returns the display name of the source
    pub fn name(&self) -> &str {
        match self {
            SourceTag::Arxiv => "arXiv",
            SourceTag::SemanticScholar => "Semantic Scholar",
            SourceTag::Other(s) => s,
        }
    }

    /// Returns the source identifier (used in configuration)
    pub fn id(&self) -> &str {
        match self {
            SourceTag::Arxiv => "arxiv",
            SourceTag::SemanticScholar => "semantic_scholar",
            SourceTag::Other(s) => s,
        }
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A research paper in canonical form.
///
/// Records are built once by the normalizer and never changed afterwards:
/// there are no setters, later stages only filter or reorder them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaperRecord {
    id: String,
    title: String,
    authors: Vec<String>,
    r#abstract: String,
    year: Option<i32>,
    citations: u64,
    venue: String,
    source: SourceTag,
}

impl PaperRecord {
    /// Stable external identifier or URL (may be empty when the source omits it)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Authors in source order
    pub fn authors(&self) -> &[String] {
        &self.authors
    }

    pub fn first_author(&self) -> Option<&str> {
        self.authors.first().map(String::as_str)
    }

    pub fn abstract_text(&self) -> &str {
        &self.r#abstract
    }

    /// Publication year, `None` when the source value was unparsable
    pub fn year(&self) -> Option<i32> {
        self.year
    }

    pub fn citations(&self) -> u64 {
        self.citations
    }

    pub fn venue(&self) -> &str {
        &self.venue
    }

    pub fn source(&self) -> &SourceTag {
        &self.source
    }
}

/// Builder for constructing PaperRecord objects
#[derive(Debug, Clone)]
pub struct PaperRecordBuilder {
    record: PaperRecord,
}

impl PaperRecordBuilder {
    /// Create a new builder; every other field starts at its default
    pub fn new(id: impl Into<String>, source: SourceTag) -> Self {
        Self {
            record: PaperRecord {
                id: id.into(),
                title: String::new(),
                authors: Vec::new(),
                r#abstract: String::new(),
                year: None,
                citations: 0,
                venue: String::new(),
                source,
            },
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.record.title = title.into();
        self
    }

    pub fn authors<I, S>(mut self, authors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.record.authors = authors.into_iter().map(Into::into).collect();
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.record.r#abstract = abstract_text.into();
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.record.year = year;
        self
    }

    pub fn citations(mut self, count: u64) -> Self {
        self.record.citations = count;
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.record.venue = venue.into();
        self
    }

    pub fn build(self) -> PaperRecord {
        self.record
    }
}
