//! Core data models for papers, queries and extracted sections.

mod extraction;
mod paper;
mod raw;
mod search;

pub use extraction::{ExtractionResult, PaperReport, ReportError};
pub use paper::{PaperRecord, PaperRecordBuilder, SourceTag};
pub use raw::{FieldMap, RawField};
pub use search::{SearchQuery, DEFAULT_MAX_RESULTS};
