//! Paper analysis and summarization.
//!
//! Both flows share one pipeline: normalize the paper id, fetch metadata,
//! prompt the generator and slice its reply into sections with
//! [`extract`](crate::utils::extract). They differ only in their
//! [`ReportKind`].
//!
//! ```rust,no_run
//! use research_assistant::analysis::PaperAnalyst;
//! use research_assistant::config::Config;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let analyst = PaperAnalyst::from_config(&Config::default())?;
//! match analyst.analyze("https://arxiv.org/abs/1706.03762v7").await {
//!     Ok(report) => println!("{}", serde_json::to_string_pretty(&report)?),
//!     Err(err) => println!("{}", serde_json::to_string_pretty(&err.to_report("1706.03762"))?),
//! }
//! # Ok(())
//! # }
//! ```

mod content;
mod prompt;

pub use content::{ContentError, MetadataClient, PaperContent};
pub use prompt::{ReportKind, ANALYSIS, SUMMARY};

use regex::Regex;
use std::sync::{Arc, OnceLock};

use crate::config::Config;
use crate::llm::{generator_from_config, GenerationError, TextGenerator};
use crate::models::{PaperReport, ReportError};
use crate::parser::strip_version_suffix;
use crate::utils::extract;

/// Errors from the analysis and summary flows
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid paper id {0:?}")]
    InvalidPaperId(String),

    #[error("Could not retrieve paper content: {0}")]
    Content(#[from] ContentError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The reply contained none of the requested sections
    #[error("Failed to extract {kind} sections")]
    ExtractionFailed { kind: &'static str },
}

impl AnalysisError {
    /// Render as the error object handed back to callers
    pub fn to_report(&self, paper_id: &str) -> ReportError {
        let (error, details) = match self {
            AnalysisError::InvalidPaperId(_) => ("Invalid paper id".to_string(), None),
            AnalysisError::Content(e) => (
                "Could not retrieve paper content".to_string(),
                Some(e.to_string()),
            ),
            AnalysisError::Generation(e) => (
                "Failed to generate text with the language model".to_string(),
                Some(e.to_string()),
            ),
            AnalysisError::ExtractionFailed { kind } => (
                format!("Failed to extract {} sections", kind),
                Some("The language model response could not be parsed into sections".to_string()),
            ),
        };
        ReportError {
            error,
            paper_id: paper_id.to_string(),
            details,
        }
    }
}

/// Reduce a paper URL or id to its bare identifier.
///
/// `https://arxiv.org/abs/2301.12345v2`, `arXiv:2301.12345` and
/// `2301.12345v2` all become `2301.12345`. Only a trailing `v<digits>` is
/// removed, so identifiers that merely contain a `v` are left alone.
/// Old-style URLs keep their archive: `https://arxiv.org/abs/hep-th/9901001v1`
/// becomes `hep-th/9901001`.
pub fn normalize_paper_id(input: &str) -> Result<String, AnalysisError> {
    let mut id = input.trim();
    if id.to_lowercase().contains("arxiv.org") {
        let trimmed = id.trim_end_matches('/');
        id = ["/abs/", "/pdf/"]
            .iter()
            .find_map(|marker| trimmed.find(marker).map(|i| &trimmed[i + marker.len()..]))
            .unwrap_or_else(|| trimmed.rsplit('/').next().unwrap_or(trimmed));
        id = id.strip_suffix(".pdf").unwrap_or(id);
    }
    if let Some(rest) = id
        .get(..6)
        .filter(|prefix| prefix.eq_ignore_ascii_case("arxiv:"))
        .and_then(|_| id.get(6..))
    {
        id = rest;
    }
    let id = strip_version_suffix(id.trim());
    if id.is_empty() {
        return Err(AnalysisError::InvalidPaperId(input.to_string()));
    }
    Ok(id.to_string())
}

fn arxiv_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^(\d{4}\.\d{4,5}|[a-zA-Z\-]+(\.[A-Za-z]{2})?/\d{7})$").ok())
        .as_ref()
}

/// Key for the metadata API: arXiv ids get the `arXiv:` namespace, keys
/// that already carry a namespace (`DOI:..`, `CorpusId:..`) and bare
/// provider ids are passed through
pub fn metadata_key(id: &str) -> String {
    if id.contains(':') {
        return id.to_string();
    }
    match arxiv_pattern() {
        Some(re) if re.is_match(id) => format!("arXiv:{}", id),
        _ => id.to_string(),
    }
}

/// Runs analyses and summaries against one metadata API and one generator
#[derive(Debug, Clone)]
pub struct PaperAnalyst {
    metadata: MetadataClient,
    generator: Arc<dyn TextGenerator>,
}

impl PaperAnalyst {
    pub fn new(metadata: MetadataClient, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            metadata,
            generator,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, AnalysisError> {
        let metadata = MetadataClient::from_config(config).map_err(ContentError::from)?;
        let generator = generator_from_config(config)?;
        Ok(Self::new(metadata, generator))
    }

    /// Key findings, methodology, conclusions, limitations and future work
    pub async fn analyze(&self, paper_id: &str) -> Result<PaperReport, AnalysisError> {
        self.report(&ANALYSIS, paper_id).await
    }

    /// Objective, methods, findings and significance
    pub async fn summarize(&self, paper_id: &str) -> Result<PaperReport, AnalysisError> {
        self.report(&SUMMARY, paper_id).await
    }

    pub async fn report(&self, kind: &ReportKind, paper_id: &str) -> Result<PaperReport, AnalysisError> {
        let id = normalize_paper_id(paper_id)?;
        let key = metadata_key(&id);
        tracing::info!("Starting {} of {}", kind.name, key);

        let content = self.metadata.fetch(&key).await?;
        let prompt = kind.prompt(&content.to_prompt_text());
        let text = self.generator.generate(&prompt).await?;

        let sections = extract(&text, &kind.labels());
        if sections.is_all_empty() {
            tracing::warn!("No {} sections found in {} bytes of output", kind.name, text.len());
            return Err(AnalysisError::ExtractionFailed { kind: kind.name });
        }

        tracing::info!("Completed {} of {}", kind.name, key);
        Ok(PaperReport {
            paper_id: id,
            sections: sections.rekeyed(&kind.keys()),
        })
    }
}
