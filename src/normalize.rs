//! Mapping raw field maps onto canonical [`PaperRecord`]s.
//!
//! This is the only place where provider-specific field names are known.
//! Every coercion is total: a field of an unexpected shape falls back to
//! the default for that field instead of failing the record.

use crate::models::{FieldMap, PaperRecord, PaperRecordBuilder, RawField, SourceTag};

const ARXIV_ABS_URL: &str = "https://arxiv.org/abs";
const ARXIV_VENUE: &str = "arXiv";

/// Build a canonical record from one parsed entry
pub fn normalize(fields: &FieldMap, source: &SourceTag) -> PaperRecord {
    match source {
        SourceTag::Arxiv => normalize_arxiv(fields),
        SourceTag::SemanticScholar => normalize_semantic(fields),
        SourceTag::Other(_) => normalize_generic(fields, source.clone()),
    }
}

fn normalize_arxiv(fields: &FieldMap) -> PaperRecord {
    let id = text(fields.get("id"))
        .map(|id| format!("{}/{}", ARXIV_ABS_URL, id))
        .unwrap_or_default();
    let venue = text(fields.get("primary_category")).unwrap_or_else(|| ARXIV_VENUE.to_string());

    PaperRecordBuilder::new(id, SourceTag::Arxiv)
        .title(text(fields.get("title")).unwrap_or_default())
        .authors(authors(fields.get("authors")))
        .abstract_text(text(fields.get("summary")).unwrap_or_default())
        .year(year(fields.get("year")))
        .citations(0)
        .venue(venue)
        .build()
}

fn normalize_semantic(fields: &FieldMap) -> PaperRecord {
    let id = text(fields.get("url"))
        .or_else(|| text(fields.get("paperId")))
        .unwrap_or_default();
    let venue = text(fields.get("venue"))
        .or_else(|| text(fields.get("publicationVenue")))
        .unwrap_or_default();

    PaperRecordBuilder::new(id, SourceTag::SemanticScholar)
        .title(text(fields.get("title")).unwrap_or_default())
        .authors(authors(fields.get("authors")))
        .abstract_text(text(fields.get("abstract")).unwrap_or_default())
        .year(year(fields.get("year")))
        .citations(citations(fields.get("citationCount")))
        .venue(venue)
        .build()
}

/// Records from sources without a dedicated mapping use the canonical
/// field names directly.
fn normalize_generic(fields: &FieldMap, source: SourceTag) -> PaperRecord {
    let abstract_field = match fields.get("abstract") {
        RawField::Absent => fields.get("summary"),
        field => field,
    };

    PaperRecordBuilder::new(text(fields.get("id")).unwrap_or_default(), source)
        .title(text(fields.get("title")).unwrap_or_default())
        .authors(authors(fields.get("authors")))
        .abstract_text(text(abstract_field).unwrap_or_default())
        .year(year(fields.get("year")))
        .citations(citations(fields.get("citations")))
        .venue(text(fields.get("venue")).unwrap_or_default())
        .build()
}

fn text(field: &RawField) -> Option<String> {
    match field {
        RawField::Text(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        RawField::Integer(i) => Some(i.to_string()),
        RawField::List(_) | RawField::Absent => None,
    }
}

/// Author lists arrive as lists, as one delimited string, or not at all
fn authors(field: &RawField) -> Vec<String> {
    match field {
        RawField::List(names) => names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .collect(),
        RawField::Text(s) => split_author_string(s),
        RawField::Integer(i) => vec![i.to_string()],
        RawField::Absent => Vec::new(),
    }
}

fn split_author_string(s: &str) -> Vec<String> {
    let parts: Vec<&str> = if s.contains(';') {
        s.split(';').collect()
    } else {
        s.split(" and ").collect()
    };
    parts
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn year(field: &RawField) -> Option<i32> {
    match field {
        RawField::Integer(i) => i32::try_from(*i).ok(),
        RawField::Text(s) => {
            let s = s.trim();
            // accept "2021" as well as "2021-05-01"
            s.get(..4)
                .filter(|y| y.chars().all(|c| c.is_ascii_digit()))
                .and_then(|y| y.parse().ok())
        }
        RawField::List(_) | RawField::Absent => None,
    }
}

fn citations(field: &RawField) -> u64 {
    match field {
        RawField::Integer(i) => u64::try_from(*i).unwrap_or(0),
        RawField::Text(s) => s.trim().parse().unwrap_or(0),
        RawField::List(_) | RawField::Absent => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arxiv_defaults() {
        let fields = FieldMap::new()
            .with("id", "1706.03762")
            .with("title", "Attention Is All You Need")
            .with("summary", "Transformers.")
            .with("authors", vec!["Ashish Vaswani".to_string()])
            .with("year", 2017i64);

        let record = normalize(&fields, &SourceTag::Arxiv);
        assert_eq!(record.id(), "https://arxiv.org/abs/1706.03762");
        assert_eq!(record.venue(), "arXiv");
        assert_eq!(record.citations(), 0);
        assert_eq!(record.year(), Some(2017));
        assert_eq!(record.abstract_text(), "Transformers.");
        assert_eq!(record.source(), &SourceTag::Arxiv);
    }

    #[test]
    fn test_arxiv_primary_category_is_venue() {
        let fields = FieldMap::new().with("id", "1").with("primary_category", "cs.LG");
        assert_eq!(normalize(&fields, &SourceTag::Arxiv).venue(), "cs.LG");
    }

    #[test]
    fn test_semantic_fields() {
        let fields = FieldMap::new()
            .with("paperId", "abc123")
            .with("url", "https://www.semanticscholar.org/paper/abc123")
            .with("title", "Deep Learning")
            .with("abstract", RawField::Absent)
            .with("year", "2015")
            .with("citationCount", -4i64)
            .with("publicationVenue", "Nature")
            .with("authors", vec!["Yann LeCun".to_string(), " ".to_string()]);

        let record = normalize(&fields, &SourceTag::SemanticScholar);
        assert_eq!(record.id(), "https://www.semanticscholar.org/paper/abc123");
        assert_eq!(record.abstract_text(), "");
        assert_eq!(record.year(), Some(2015));
        assert_eq!(record.citations(), 0);
        assert_eq!(record.venue(), "Nature");
        assert_eq!(record.authors(), ["Yann LeCun"]);
    }

    #[test]
    fn test_author_coercion() {
        assert_eq!(
            authors(&RawField::Text("A. Smith; B. Jones".to_string())),
            vec!["A. Smith", "B. Jones"]
        );
        assert_eq!(
            authors(&RawField::Text("A. Smith and B. Jones".to_string())),
            vec!["A. Smith", "B. Jones"]
        );
        assert_eq!(authors(&RawField::Text("Solo".to_string())), vec!["Solo"]);
        assert!(authors(&RawField::Absent).is_empty());
    }

    #[test]
    fn test_unparsable_year_is_absent() {
        assert_eq!(year(&RawField::Text("circa".to_string())), None);
        assert_eq!(year(&RawField::Text("2021-05-01".to_string())), Some(2021));
        assert_eq!(year(&RawField::Integer(i64::MAX)), None);
    }

    #[test]
    fn test_generic_source() {
        let fields = FieldMap::new()
            .with("id", "x-1")
            .with("title", "T")
            .with("summary", "S")
            .with("citations", 7i64);
        let record = normalize(&fields, &SourceTag::Other("mock".to_string()));
        assert_eq!(record.id(), "x-1");
        assert_eq!(record.abstract_text(), "S");
        assert_eq!(record.citations(), 7);
        assert_eq!(record.source().id(), "mock");
    }

    #[test]
    fn test_normalize_is_deterministic() {
        let fields = FieldMap::new().with("id", "1").with("title", "T");
        assert_eq!(
            normalize(&fields, &SourceTag::Arxiv),
            normalize(&fields, &SourceTag::Arxiv)
        );
    }
}
