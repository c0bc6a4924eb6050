//! # Research Assistant
//!
//! Resilient retrieval of scholarly-paper metadata and LLM-backed paper
//! analysis.
//!
//! ## Architecture
//!
//! A search flows `Aggregator -> Source -> HttpClient -> parser -> normalize -> dedupe`:
//!
//! - [`utils`]: HTTP transport with retry and backoff, deduplication, section extraction
//! - [`parser`]: Atom and JSON payloads to lazy sequences of raw field maps
//! - [`normalize`]: raw field maps to canonical [`PaperRecord`]s
//! - [`sources`]: research source plugins and the multi-source [`Aggregator`]
//! - [`llm`]: generative backends (Ollama, OpenAI)
//! - [`analysis`]: analyze and summarize a paper by id
//! - [`models`]: core data structures
//! - [`config`]: configuration management

pub mod analysis;
pub mod config;
pub mod llm;
pub mod models;
pub mod normalize;
pub mod parser;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use analysis::{AnalysisError, PaperAnalyst};
pub use models::{ExtractionResult, PaperRecord, SearchQuery, SourceTag};
pub use sources::{Aggregator, SearchError, Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
