use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::apis::{BookCatalog, SourceError, SourceRecord, TitleResolver, TopicCiter, WorkRegistry};
use crate::format::{render, CitationFormatter, FormatError};
use crate::normalize::normalize;
use crate::search::{aggregate, DisplayedCitation};

/// Only the first few catalog matches are shown.
pub const BOOK_RESULT_LIMIT: usize = 5;

#[derive(Debug, Error)]
pub enum CiteError {
    #[error("{service} request failed: {source}")]
    SourceUnavailable {
        service: String,
        #[source]
        source: SourceError,
    },
    #[error("could not format citation: {0}")]
    Format(#[from] FormatError),
    #[error("not a DOI: {0:?}")]
    InvalidDoi(String),
}

impl CiteError {
    fn unavailable(service: &str) -> impl FnOnce(SourceError) -> Self + '_ {
        move |source| CiteError::SourceUnavailable { service: service.to_string(), source }
    }

    /// Text shown to the user in place of results.
    pub fn user_message(&self) -> &'static str {
        match self {
            CiteError::SourceUnavailable { .. } => {
                "The citation service could not be reached. Please try again later."
            }
            CiteError::Format(_) => "The citation data returned was incomplete and could not be formatted.",
            CiteError::InvalidDoi(_) => "That does not look like a DOI.",
        }
    }
}

/// Pull the bare identifier out of a DOI, `doi:` string, or doi.org URL.
pub fn extract_doi(input: &str) -> Option<String> {
    let input = input.trim();
    let doi = match input.find("doi.org/") {
        Some(pos) => &input[pos + "doi.org/".len()..],
        None => match input.get(..4) {
            Some(prefix) if prefix.eq_ignore_ascii_case("doi:") => &input[4..],
            _ => input,
        },
    };
    let doi = doi.trim();
    (!doi.is_empty()).then(|| doi.to_string())
}

/// The three citation flows over their upstream services.
pub struct CitationService {
    books: Arc<dyn BookCatalog>,
    works: Arc<dyn WorkRegistry>,
    resolver: Arc<dyn TitleResolver>,
    topics: Arc<dyn TopicCiter>,
    formatter: Arc<dyn CitationFormatter>,
    enrich_timeout: Duration,
}

impl CitationService {
    pub fn new(
        books: Arc<dyn BookCatalog>,
        works: Arc<dyn WorkRegistry>,
        resolver: Arc<dyn TitleResolver>,
        topics: Arc<dyn TopicCiter>,
        formatter: Arc<dyn CitationFormatter>,
        enrich_timeout: Duration,
    ) -> Self {
        Self { books, works, resolver, topics, formatter, enrich_timeout }
    }

    /// An empty list means the catalog had no match.
    pub async fn search_books(&self, title: &str) -> Result<Vec<DisplayedCitation>, CiteError> {
        let title = title.trim();
        if title.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("Searching {} for {:?}", self.books.name(), title);

        let docs = self.books
            .search_books(title, BOOK_RESULT_LIMIT)
            .await
            .map_err(CiteError::unavailable(self.books.name()))?;
        if docs.is_empty() {
            tracing::info!("No books found for {:?}", title);
        }

        docs.into_iter()
            .take(BOOK_RESULT_LIMIT)
            .map(|doc| {
                let input = normalize(&SourceRecord::Book(doc));
                Ok::<_, CiteError>(DisplayedCitation::plain(render(self.formatter.as_ref(), &input)?))
            })
            .collect()
    }

    pub async fn lookup_doi(&self, input: &str) -> Result<Vec<DisplayedCitation>, CiteError> {
        if input.trim().is_empty() {
            return Ok(Vec::new());
        }
        let doi = extract_doi(input).ok_or_else(|| CiteError::InvalidDoi(input.to_string()))?;
        tracing::info!("Looking up DOI {} via {}", doi, self.works.name());

        let message = self.works
            .lookup_doi(&doi)
            .await
            .map_err(CiteError::unavailable(self.works.name()))?;
        let input = normalize(&SourceRecord::Work(message));
        let text = render(self.formatter.as_ref(), &input).inspect_err(|e| {
            tracing::warn!("DOI {} returned unformattable data: {}", doi, e);
        })?;
        Ok(vec![DisplayedCitation::plain(text)])
    }

    /// Topic citations are pre-formatted by the AI service and then enriched
    /// with DOI links.
    pub async fn cite_topic(&self, topic: &str) -> Result<Vec<DisplayedCitation>, CiteError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Ok(Vec::new());
        }
        tracing::info!("Requesting citations for topic {:?}", topic);

        let items = self.topics
            .cite_topic(topic)
            .await
            .map_err(CiteError::unavailable(self.topics.name()))?;
        Ok(aggregate(Arc::clone(&self.resolver), &items, self.enrich_timeout).await)
    }
}
