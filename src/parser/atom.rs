//! Atom feed entries (arXiv export API).

use chrono::{Datelike, NaiveDateTime};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use serde::Deserialize;

use super::ParseError;
use crate::models::FieldMap;

const PUBLISHED_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<String>,
    title: Option<String>,
    summary: Option<String>,
    published: Option<String>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
    #[serde(rename = "arxiv:primary_category", alias = "primary_category")]
    primary_category: Option<AtomCategory>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomCategory {
    #[serde(rename = "@term")]
    term: Option<String>,
}

/// Walks the feed one `<entry>` at a time. Each entry is cut out of the
/// document and deserialized on its own.
pub(super) struct AtomEntries<'a> {
    xml: &'a str,
    reader: Reader<&'a [u8]>,
    index: usize,
    done: bool,
}

impl<'a> AtomEntries<'a> {
    pub(super) fn new(xml: &'a str) -> Self {
        let mut reader = Reader::from_str(xml);
        // entries are cut out by nesting depth; a mismatched close tag inside
        // one entry is rejected when that fragment is deserialized
        reader.config_mut().check_end_names = false;
        Self {
            xml,
            reader,
            index: 0,
            done: false,
        }
    }

    fn next_entry_span(&mut self) -> Result<Option<(usize, usize)>, quick_xml::Error> {
        loop {
            let start = self.reader.buffer_position() as usize;
            match self.reader.read_event()? {
                Event::Start(e) if e.local_name().as_ref() == b"entry" => {
                    let end_tag = e.to_end().into_owned();
                    self.reader.read_to_end(end_tag.name())?;
                    return Ok(Some((start, self.reader.buffer_position() as usize)));
                }
                Event::Empty(e) if e.local_name().as_ref() == b"entry" => {
                    return Ok(Some((start, self.reader.buffer_position() as usize)));
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }
}

impl Iterator for AtomEntries<'_> {
    type Item = Result<FieldMap, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let index = self.index;
        match self.next_entry_span() {
            Ok(Some((start, end))) => {
                self.index += 1;
                let fragment = self.xml.get(start..end).unwrap_or_default();
                Some(parse_entry(fragment).map_err(|reason| ParseError::Entry { index, reason }))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                // the reader cannot resynchronize after a syntax error
                self.done = true;
                Some(Err(ParseError::Entry {
                    index,
                    reason: format!("XML syntax error at byte {}: {}", self.reader.buffer_position(), e),
                }))
            }
        }
    }
}

fn parse_entry(fragment: &str) -> Result<FieldMap, String> {
    let entry: AtomEntry =
        quick_xml::de::from_str(fragment).map_err(|e| format!("invalid entry: {}", e))?;

    let id = required(entry.id, "id")?;
    let title = required(entry.title, "title")?;
    let summary = required(entry.summary, "summary")?;
    let published = required(entry.published, "published")?;

    let year = NaiveDateTime::parse_from_str(&published, PUBLISHED_FORMAT)
        .map_err(|e| format!("invalid published timestamp {:?}: {}", published, e))?
        .year();

    let authors = entry
        .authors
        .into_iter()
        .map(|author| required(author.name, "author name"))
        .collect::<Result<Vec<_>, _>>()?;

    let mut fields = FieldMap::new()
        .with("id", arxiv_id_from_url(&id))
        .with("title", title)
        .with("summary", summary)
        .with("authors", authors)
        .with("published", published)
        .with("year", i64::from(year));

    if let Some(term) = entry
        .primary_category
        .and_then(|c| c.term)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
    {
        fields.insert("primary_category", term);
    }

    Ok(fields)
}

fn required(value: Option<String>, field: &str) -> Result<String, String> {
    value
        .map(|v| clean_text(&v))
        .filter(|v| !v.is_empty())
        .ok_or_else(|| format!("missing {}", field))
}

fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Identifier from an entry URL: the last path segment without its
/// version suffix, e.g. `http://arxiv.org/abs/2301.12345v2` -> `2301.12345`
pub fn arxiv_id_from_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed.rsplit('/').next().unwrap_or(trimmed);
    strip_version_suffix(last).to_string()
}

/// Remove a trailing `v<digits>` version marker, if present
pub fn strip_version_suffix(id: &str) -> &str {
    let without_digits = id.trim_end_matches(|c: char| c.is_ascii_digit());
    if without_digits.len() == id.len() {
        return id;
    }
    without_digits.strip_suffix('v').unwrap_or(id)
}
