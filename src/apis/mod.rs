pub mod crossref;
pub mod openlibrary;
pub mod topic;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// One book from the catalog search, as the catalog returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookDoc {
    pub title: Option<String>,
    pub author_name: Option<Vec<String>>,
    pub first_publish_year: Option<i32>,
    pub publisher: Option<Vec<String>>,
    pub key: Option<String>,
}

/// One suggestion from the AI topic service. Every field arrives prose-ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicItem {
    #[serde(default, deserialize_with = "string_or_number")]
    pub author: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub year: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub publisher: String,
}

/// A raw upstream result, immutable once received.
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Book(BookDoc),
    /// The `message` object of a DOI lookup, kept opaque.
    Work(serde_json::Value),
    Topic(TopicItem),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
}

#[async_trait]
pub trait BookCatalog: Send + Sync {
    fn name(&self) -> &str;
    async fn search_books(&self, title: &str, limit: usize) -> Result<Vec<BookDoc>, SourceError>;
}

#[async_trait]
pub trait WorkRegistry: Send + Sync {
    fn name(&self) -> &str;
    /// Fetch the bibliographic body for a bare DOI.
    async fn lookup_doi(&self, doi: &str) -> Result<serde_json::Value, SourceError>;
}

#[async_trait]
pub trait TitleResolver: Send + Sync {
    /// DOI of the first journal article matching `title`, if any.
    async fn find_doi(&self, title: &str) -> Result<Option<String>, SourceError>;
}

#[async_trait]
pub trait TopicCiter: Send + Sync {
    fn name(&self) -> &str;
    async fn cite_topic(&self, topic: &str) -> Result<Vec<TopicItem>, SourceError>;
}

pub(crate) fn http_client(mailto: Option<&str>, timeout: Duration) -> Result<reqwest::Client, SourceError> {
    let ua = match mailto {
        Some(email) => format!("{} (mailto:{})", USER_AGENT, email),
        None => USER_AGENT.to_string(),
    };
    Ok(reqwest::Client::builder()
        .user_agent(ua)
        .timeout(timeout)
        .build()?)
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
