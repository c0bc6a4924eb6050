//! Prompt templates and section layouts for analysis and summary reports.

use crate::llm::PromptSections;

/// One kind of report: its prompt and the sections expected back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportKind {
    /// Short name used in logs and error messages
    pub name: &'static str,
    system: &'static str,
    request: &'static str,
    /// `(label in generated text, key in the report)`
    sections: &'static [(&'static str, &'static str)],
}

pub const ANALYSIS: ReportKind = ReportKind {
    name: "analysis",
    system: "You are a research paper analyzer. Analyze the given paper content and extract key information.",
    request: "Please analyze this research paper and provide:",
    sections: &[
        ("Key findings", "key_findings"),
        ("Methodology", "methodology"),
        ("Main conclusions", "conclusions"),
        ("Limitations", "limitations"),
        ("Future work", "future_work"),
    ],
};

pub const SUMMARY: ReportKind = ReportKind {
    name: "summary",
    system: "You are a research paper summarizer. Create a clear and concise summary of the given paper.",
    request: "Please summarize this research paper with the following structure:",
    sections: &[
        ("Main objective", "objective"),
        ("Key methods", "methods"),
        ("Principal findings", "findings"),
        ("Significance and impact", "significance"),
    ],
};

impl ReportKind {
    /// Labels searched for in the generated text, in report order
    pub fn labels(&self) -> Vec<&'static str> {
        self.sections.iter().map(|(label, _)| *label).collect()
    }

    /// Output keys, parallel to [`labels`](Self::labels)
    pub fn keys(&self) -> Vec<&'static str> {
        self.sections.iter().map(|(_, key)| *key).collect()
    }

    /// Build the prompt for the given paper content
    pub fn prompt(&self, content: &str) -> PromptSections {
        let mut user = String::new();
        user.push_str(self.request);
        user.push('\n');
        for (i, (label, _)) in self.sections.iter().enumerate() {
            user.push_str(&format!("{}. {}\n", i + 1, label));
        }
        user.push_str("\nStart each section on a new line with its label followed by a colon.\n");
        user.push_str("\nPaper content:\n");
        user.push_str(content.trim());
        PromptSections::new(self.system, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_and_keys_line_up() {
        assert_eq!(ANALYSIS.labels().len(), ANALYSIS.keys().len());
        assert_eq!(SUMMARY.labels()[3], "Significance and impact");
        assert_eq!(SUMMARY.keys()[3], "significance");
    }

    #[test]
    fn test_prompt_lists_every_label() {
        let prompt = ANALYSIS.prompt("Title: T\n");
        assert!(prompt.system.starts_with("You are a research paper analyzer"));
        for label in ANALYSIS.labels() {
            assert!(prompt.user.contains(label));
        }
        assert!(prompt.user.contains("1. Key findings\n"));
        assert!(prompt.user.ends_with("Paper content:\nTitle: T"));
    }
}
