//! Slicing free-form generated text into labeled sections.

use crate::models::ExtractionResult;

/// Split `text` into one section per label.
///
/// A section starts at the first case-insensitive occurrence of its label
/// and runs to the end of that line, so multi-line sections keep only their
/// first line. The label itself is part of the section. Labels that do not
/// occur map to an empty string. An empty label never matches, so it also
/// maps to an empty string instead of the first line of `text`. Result keys
/// follow the order of `labels`.
pub fn extract<S: AsRef<str>>(text: &str, labels: &[S]) -> ExtractionResult {
    let mut result = ExtractionResult::new();
    for label in labels {
        let label = label.as_ref();
        let section = find_ignore_case(text, label)
            .map(|start| {
                let rest = &text[start..];
                let end = rest.find('\n').unwrap_or(rest.len());
                rest[..end].trim()
            })
            .unwrap_or_default();
        result.push(label, section);
    }
    result
}

/// Byte offset of the first case-insensitive match of `needle` in `haystack`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack
        .char_indices()
        .map(|(i, _)| i)
        .find(|&i| starts_with_ignore_case(&haystack[i..], needle))
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    let mut hay = haystack.chars().flat_map(char::to_lowercase);
    prefix
        .chars()
        .flat_map(char::to_lowercase)
        .all(|p| hay.next() == Some(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_labeled_lines() {
        let text = "Key findings: X improves Y.\nMethodology: used Z.";
        let result = extract(text, &["Key findings", "Methodology"]);

        assert_eq!(result.get("Key findings"), Some("Key findings: X improves Y."));
        assert_eq!(result.get("Methodology"), Some("Methodology: used Z."));
        assert_eq!(result.labels().collect::<Vec<_>>(), vec!["Key findings", "Methodology"]);
    }

    #[test]
    fn test_missing_labels_are_empty() {
        let result = extract("Nothing useful here.", &["Key findings", "Limitations"]);
        assert_eq!(result.get("Key findings"), Some(""));
        assert_eq!(result.get("Limitations"), Some(""));
        assert!(result.is_all_empty());
    }

    #[test]
    fn test_case_insensitive_and_label_order() {
        let text = "1. METHODOLOGY - survey of 40 papers\n2. key FINDINGS - it works   \n";
        let result = extract(text, &["Key findings", "Methodology"]);

        assert_eq!(result.get("Key findings"), Some("key FINDINGS - it works"));
        assert_eq!(result.get("Methodology"), Some("METHODOLOGY - survey of 40 papers"));
        assert_eq!(result.labels().next(), Some("Key findings"));
    }

    #[test]
    fn test_multiline_section_is_truncated() {
        let text = "Limitations:\n- small sample\n- one dataset";
        let result = extract(text, &["Limitations"]);
        assert_eq!(result.get("Limitations"), Some("Limitations:"));
    }

    #[test]
    fn test_first_occurrence_is_used() {
        let text = "Future work is discussed below.\nFuture work: scale up.";
        let result = extract(text, &["Future work"]);
        assert_eq!(result.get("Future work"), Some("Future work is discussed below."));
    }

    #[test]
    fn test_non_ascii_text() {
        let text = "Résumé: ça marche\nSignificance and impact: große Wirkung";
        let result = extract(text, &["significance AND impact", "résumé"]);
        assert_eq!(
            result.get("significance AND impact"),
            Some("Significance and impact: große Wirkung")
        );
        assert_eq!(result.get("résumé"), Some("Résumé: ça marche"));
    }

    #[test]
    fn test_empty_label() {
        let result = extract("First line\nSecond line", &["", "second"]);
        assert_eq!(result.get(""), Some(""));
        assert_eq!(result.get("second"), Some("Second line"));
    }
}
