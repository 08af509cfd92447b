//! Citation formatting.
//!
//! Formatting input is CSL-JSON: the normalizer produces it for catalog
//! records and DOI lookups already return it. [`ApaFormatter`] renders APA 7
//! plain text.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::normalize::{CitationKind, FormatterInput};

/// APA lists up to this many authors before eliding with an ellipsis.
const MAX_LISTED_AUTHORS: usize = 20;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("citation data is not an object")]
    NotAnObject,
    #[error("citation data has no title")]
    MissingTitle,
    #[error("malformed citation data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported citation style: {0}")]
    UnsupportedStyle(String),
    #[error("unsupported citation locale: {0}")]
    UnsupportedLocale(String),
}

pub trait CitationFormatter: Send + Sync {
    fn format(&self, item: &Value) -> Result<String, FormatError>;
}

/// Turn normalizer output into display text. Pre-formatted text passes through.
pub fn render(formatter: &dyn CitationFormatter, input: &FormatterInput) -> Result<String, FormatError> {
    match input {
        FormatterInput::Csl(item) => formatter.format(item),
        FormatterInput::PreFormatted(text) => Ok(text.clone()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    pub template: String,
    pub lang: String,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            template: "apa".to_string(),
            lang: "en-US".to_string(),
        }
    }
}

struct Terms {
    no_date: &'static str,
    and: &'static str,
}

const ENGLISH: Terms = Terms { no_date: "n.d.", and: "&" };

pub struct ApaFormatter {
    terms: Terms,
}

impl ApaFormatter {
    pub fn new(options: &FormatOptions) -> Result<Self, FormatError> {
        if !options.template.eq_ignore_ascii_case("apa") {
            return Err(FormatError::UnsupportedStyle(options.template.clone()));
        }
        let terms = match options.lang.as_str() {
            "en" | "en-US" | "en-GB" => ENGLISH,
            other => return Err(FormatError::UnsupportedLocale(other.to_string())),
        };
        Ok(Self { terms })
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Text {
    One(String),
    Many(Vec<String>),
}

impl Text {
    fn first(&self) -> Option<&str> {
        let s = match self {
            Text::One(s) => Some(s.as_str()),
            Text::Many(v) => v.first().map(String::as_str),
        };
        s.map(str::trim).filter(|s| !s.is_empty())
    }
}

#[derive(Deserialize)]
struct Name {
    family: Option<String>,
    given: Option<String>,
    literal: Option<String>,
    name: Option<String>,
}

#[derive(Deserialize)]
struct DateField {
    #[serde(rename = "date-parts")]
    date_parts: Option<Vec<Vec<Value>>>,
}

impl DateField {
    fn year(&self) -> Option<i64> {
        let first = self.date_parts.as_ref()?.first()?.first()?;
        match first {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct CslItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    title: Option<Text>,
    author: Option<Vec<Name>>,
    issued: Option<DateField>,
    published: Option<DateField>,
    #[serde(rename = "published-print")]
    published_print: Option<DateField>,
    #[serde(rename = "published-online")]
    published_online: Option<DateField>,
    #[serde(rename = "container-title")]
    container_title: Option<Text>,
    publisher: Option<String>,
    volume: Option<Value>,
    issue: Option<Value>,
    page: Option<Value>,
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

impl CslItem {
    fn year(&self) -> Option<i64> {
        [&self.issued, &self.published_print, &self.published_online, &self.published]
            .into_iter()
            .flatten()
            .find_map(DateField::year)
    }

    fn kind(&self) -> CitationKind {
        CitationKind::from_csl_type(self.kind.as_deref())
    }
}

impl CitationFormatter for ApaFormatter {
    fn format(&self, item: &Value) -> Result<String, FormatError> {
        if !item.is_object() {
            return Err(FormatError::NotAnObject);
        }
        let item = CslItem::deserialize(item)?;
        let title = item.title.as_ref().and_then(Text::first).ok_or(FormatError::MissingTitle)?;

        let authors: Vec<String> = item.author.iter().flatten().filter_map(apa_name).collect();
        let year = item
            .year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| self.terms.no_date.to_string());

        let mut parts = Vec::new();
        if authors.is_empty() {
            // No author: the title moves into the author position.
            parts.push(terminate(title));
            parts.push(format!("({}).", year));
        } else {
            parts.push(terminate(&self.author_list(&authors)));
            parts.push(format!("({}).", year));
            parts.push(terminate(title));
        }

        if item.kind() == CitationKind::Book {
            if let Some(publisher) = item.publisher.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
                parts.push(terminate(publisher));
            }
        } else if let Some(source) = source_line(&item) {
            parts.push(terminate(&source));
        }

        if let Some(doi) = item.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            parts.push(format!("https://doi.org/{}", doi));
        }

        Ok(parts.join(" "))
    }
}

impl ApaFormatter {
    fn author_list(&self, authors: &[String]) -> String {
        match authors {
            [] => String::new(),
            [only] => only.clone(),
            [first, second] => format!("{}, {} {}", first, self.terms.and, second),
            _ if authors.len() <= MAX_LISTED_AUTHORS => {
                let (rest, last) = authors.split_at(authors.len() - 1);
                format!("{}, {} {}", rest.join(", "), self.terms.and, last[0])
            }
            _ => {
                let head = authors[..MAX_LISTED_AUTHORS - 1].join(", ");
                let last = &authors[authors.len() - 1];
                format!("{}, . . . {}", head, last)
            }
        }
    }
}

fn apa_name(name: &Name) -> Option<String> {
    let trimmed = |s: &Option<String>| s.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
    match (trimmed(&name.family), trimmed(&name.given)) {
        (Some(family), Some(given)) => Some(format!("{}, {}", family, initials(&given))),
        (Some(family), None) => Some(family),
        _ => trimmed(&name.literal).or_else(|| trimmed(&name.name)),
    }
}

/// "Jean-Paul Ronald" -> "J.-P. R."
fn initials(given: &str) -> String {
    given
        .split_whitespace()
        .map(|word| {
            word.split('-')
                .filter_map(|part| part.chars().next())
                .map(|c| format!("{}.", c.to_uppercase()))
                .collect::<Vec<_>>()
                .join("-")
        })
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn source_line(item: &CslItem) -> Option<String> {
    let container = item.container_title.as_ref().and_then(Text::first)?;
    let mut line = container.to_string();
    let volume = item.volume.as_ref().and_then(scalar);
    let issue = item.issue.as_ref().and_then(scalar);
    match (volume, issue) {
        (Some(v), Some(i)) => line.push_str(&format!(", {}({})", v, i)),
        (Some(v), None) => line.push_str(&format!(", {}", v)),
        _ => {}
    }
    if let Some(page) = item.page.as_ref().and_then(scalar) {
        line.push_str(&format!(", {}", page.replace('-', "–")));
    }
    Some(line)
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn terminate(s: &str) -> String {
    let s = s.trim();
    if s.ends_with(['.', '?', '!']) {
        s.to_string()
    } else {
        format!("{}.", s)
    }
}
