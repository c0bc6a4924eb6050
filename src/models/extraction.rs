//! Results of decomposing generated text into labeled sections.

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Section label to extracted text, ordered by the caller's label list
/// (not by where the labels appear in the text).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionResult {
    sections: Vec<(String, String)>,
}

impl ExtractionResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, label: impl Into<String>, text: impl Into<String>) {
        self.sections.push((label.into(), text.into()));
    }

    /// Extracted text for a label; `None` if the label was never requested
    pub fn get(&self, label: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, text)| text.as_str())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.sections.iter().map(|(l, t)| (l.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// True when no requested section produced any text
    pub fn is_all_empty(&self) -> bool {
        self.sections.iter().all(|(_, text)| text.is_empty())
    }

    /// Re-key the sections positionally, e.g. from prompt labels to short
    /// output keys. Extra keys or sections are dropped.
    pub fn rekeyed<S: AsRef<str>>(self, keys: &[S]) -> Self {
        let sections = self
            .sections
            .into_iter()
            .zip(keys)
            .map(|((_, text), key)| (key.as_ref().to_string(), text))
            .collect();
        Self { sections }
    }
}

impl Serialize for ExtractionResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.sections.len()))?;
        for (label, text) in &self.sections {
            map.serialize_entry(label, text)?;
        }
        map.end()
    }
}

/// Successful analysis or summary of one paper
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PaperReport {
    pub paper_id: String,
    pub sections: ExtractionResult,
}

/// Error object returned to callers in place of a report
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReportError {
    pub error: String,
    pub paper_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_in_label_order() {
        let mut result = ExtractionResult::new();
        result.push("Methodology", "Methodology: used Z.");
        result.push("Key findings", "");

        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(
            json,
            r#"{"Methodology":"Methodology: used Z.","Key findings":""}"#
        );
        assert!(!result.is_all_empty());
    }

    #[test]
    fn test_rekeyed() {
        let mut result = ExtractionResult::new();
        result.push("Key findings", "Key findings: X");
        result.push("Methodology", "");

        let keyed = result.rekeyed(&["key_findings", "methodology"]);
        assert_eq!(keyed.get("key_findings"), Some("Key findings: X"));
        assert_eq!(keyed.get("methodology"), Some(""));
        assert_eq!(keyed.get("Key findings"), None);
    }

    #[test]
    fn test_report_error_omits_missing_details() {
        let err = ReportError {
            error: "Could not retrieve paper content".to_string(),
            paper_id: "2301.12345".to_string(),
            details: None,
        };
        let json = serde_json::to_value(&err).unwrap();
        assert!(json.get("details").is_none());
        assert_eq!(json["paper_id"], "2301.12345");
    }
}
