use serde::Serialize;
use serde_json::{json, Value};

use crate::apis::{BookDoc, SourceRecord, TopicItem};

/// Year used when a record carries no publication year.
pub const FALLBACK_YEAR: i32 = 2024;
pub const UNKNOWN_PUBLISHER: &str = "Unknown Publisher";
const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CitationKind {
    Book,
    Article,
}

impl CitationKind {
    /// Layout for a CSL `type`. Anything that is not a book is laid out as an article.
    pub fn from_csl_type(kind: Option<&str>) -> Self {
        match kind {
            Some("book" | "monograph" | "edited-book" | "reference-book") => CitationKind::Book,
            _ => CitationKind::Article,
        }
    }
}

/// Uniform citation shape fed to the formatter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCitation {
    pub kind: CitationKind,
    /// Never empty.
    pub title: String,
    /// In source order; empty for unattributed works.
    pub authors: Vec<String>,
    pub issued_year: i32,
    pub publisher: String,
}

impl NormalizedCitation {
    /// CSL-JSON with every author as a literal name.
    pub fn to_csl(&self) -> Value {
        let authors: Vec<Value> = self.authors.iter().map(|a| json!({ "literal": a })).collect();
        json!({
            "type": self.kind,
            "title": self.title,
            "author": authors,
            "issued": { "date-parts": [[self.issued_year]] },
            "publisher": self.publisher,
        })
    }
}

/// What the formatter adapter receives for one record.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatterInput {
    Csl(Value),
    /// Already prose; skips the formatter and is not APA-validated.
    PreFormatted(String),
}

/// Never fails: missing fields fall back to fixed defaults.
pub fn normalize(record: &SourceRecord) -> FormatterInput {
    match record {
        SourceRecord::Book(doc) => FormatterInput::Csl(normalize_book(doc).to_csl()),
        SourceRecord::Work(message) => FormatterInput::Csl(message.clone()),
        SourceRecord::Topic(item) => FormatterInput::PreFormatted(topic_text(item)),
    }
}

pub fn normalize_book(doc: &BookDoc) -> NormalizedCitation {
    let title = doc.title.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(UNTITLED)
        .to_string();
    let publisher = doc.publisher.as_ref()
        .and_then(|p| p.first())
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .unwrap_or(UNKNOWN_PUBLISHER)
        .to_string();
    NormalizedCitation {
        kind: CitationKind::Book,
        title,
        authors: doc.author_name.clone().unwrap_or_default(),
        issued_year: doc.first_publish_year.unwrap_or(FALLBACK_YEAR),
        publisher,
    }
}

pub fn topic_text(item: &TopicItem) -> String {
    format!("{} ({}). {}. {}.", item.author, item.year, item.title, item.publisher)
}
