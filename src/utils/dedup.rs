//! Deduplication of normalized records.

use std::collections::HashSet;

use crate::models::PaperRecord;

/// Identity used for duplicate detection: lower-cased title and first author.
///
/// Records without a title have no key.
pub fn dedup_key(paper: &PaperRecord) -> Option<(String, String)> {
    let title = paper.title().trim();
    if title.is_empty() {
        return None;
    }
    let author = paper
        .first_author()
        .map(|a| a.trim().to_lowercase())
        .unwrap_or_default();
    Some((title.to_lowercase(), author))
}

/// Remove duplicate papers, keeping the first occurrence of each key.
///
/// Output order follows input order. Records with an empty title are never
/// treated as duplicates.
pub fn dedupe(papers: Vec<PaperRecord>) -> Vec<PaperRecord> {
    let mut seen: HashSet<(String, String)> = HashSet::with_capacity(papers.len());
    let before = papers.len();

    let unique: Vec<PaperRecord> = papers
        .into_iter()
        .filter(|paper| match dedup_key(paper) {
            Some(key) => seen.insert(key),
            None => true,
        })
        .collect();

    if unique.len() < before {
        tracing::debug!("Removed {} duplicate record(s)", before - unique.len());
    }
    unique
}
