//! Response parsing: raw payload bytes to a lazy sequence of field maps.
//!
//! A malformed entry never fails the batch. It is logged, counted and
//! skipped, and iteration continues with the next entry. Only a payload
//! that cannot be read as a document at all (invalid UTF-8, JSON that does
//! not parse) is reported as an error.

mod atom;
mod json;

pub use atom::{arxiv_id_from_url, strip_version_suffix};

use crate::models::FieldMap;

/// Payload formats understood by [`parse`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadFormat {
    /// Atom feed with arXiv extensions
    Atom,
    /// JSON object with a `data` array of entries
    Json,
}

/// Errors raised while parsing a payload
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The payload as a whole is unreadable
    #[error("Unreadable payload: {0}")]
    Document(String),

    /// One entry could not be parsed; the rest of the batch is unaffected
    #[error("Malformed entry #{index}: {reason}")]
    Entry { index: usize, reason: String },
}

/// Parse a payload into a lazy sequence of entries.
///
/// Entries are produced on demand, so a caller that only needs the first
/// `n` can stop early with `.take(n)`.
pub fn parse(payload: &[u8], format: PayloadFormat) -> Result<Entries<'_>, ParseError> {
    let inner = match format {
        PayloadFormat::Atom => {
            let xml = std::str::from_utf8(payload)
                .map_err(|e| ParseError::Document(format!("XML is not UTF-8: {}", e)))?;
            Inner::Atom(atom::AtomEntries::new(xml))
        }
        PayloadFormat::Json => Inner::Json(json::JsonEntries::new(payload)?),
    };
    Ok(Entries { inner, skipped: 0 })
}

enum Inner<'a> {
    Atom(atom::AtomEntries<'a>),
    Json(json::JsonEntries),
}

/// Lazy iterator over the well-formed entries of a payload
pub struct Entries<'a> {
    inner: Inner<'a>,
    skipped: usize,
}

impl Entries<'_> {
    /// Number of malformed entries skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Iterator for Entries<'_> {
    type Item = FieldMap;

    fn next(&mut self) -> Option<FieldMap> {
        loop {
            let next = match &mut self.inner {
                Inner::Atom(entries) => entries.next(),
                Inner::Json(entries) => entries.next(),
            };
            match next? {
                Ok(fields) => return Some(fields),
                Err(err) => {
                    self.skipped += 1;
                    tracing::warn!("Skipping entry: {}", err);
                }
            }
        }
    }
}

impl std::fmt::Debug for Entries<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let format = match self.inner {
            Inner::Atom(_) => PayloadFormat::Atom,
            Inner::Json(_) => PayloadFormat::Json,
        };
        f.debug_struct("Entries")
            .field("format", &format)
            .field("skipped", &self.skipped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_utf8_is_document_error() {
        let err = parse(&[0xff, 0xfe, 0x00], PayloadFormat::Atom).unwrap_err();
        assert!(matches!(err, ParseError::Document(_)));
    }

    #[test]
    fn test_invalid_json_is_document_error() {
        let err = parse(b"{not json", PayloadFormat::Json).unwrap_err();
        assert!(matches!(err, ParseError::Document(_)));
    }
}
