use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::apis::{crossref, openlibrary, topic};
use crate::cite::CitationService;
use crate::format::{ApaFormatter, FormatOptions};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub openlibrary_url: String,
    pub crossref_url: String,
    pub topic_url: String,
    pub mailto: Option<String>,
    pub timeout: Duration,
    pub format: FormatOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openlibrary_url: openlibrary::DEFAULT_BASE_URL.to_string(),
            crossref_url: crossref::DEFAULT_BASE_URL.to_string(),
            topic_url: topic::DEFAULT_BASE_URL.to_string(),
            mailto: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            format: FormatOptions::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let timeout = match var("APA_CITER_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    tracing::warn!(
                        "Ignoring APA_CITER_TIMEOUT_SECS={:?}, using {}s",
                        raw, DEFAULT_TIMEOUT_SECS
                    );
                    defaults.timeout
                }
            },
            None => defaults.timeout,
        };

        Self {
            openlibrary_url: var("APA_CITER_OPENLIBRARY_URL").unwrap_or(defaults.openlibrary_url),
            crossref_url: var("APA_CITER_CROSSREF_URL").unwrap_or(defaults.crossref_url),
            topic_url: var("APA_CITER_TOPIC_URL").unwrap_or(defaults.topic_url),
            mailto: var("APA_CITER_MAILTO"),
            timeout,
            format: FormatOptions {
                lang: var("APA_CITER_LANG").unwrap_or(defaults.format.lang),
                ..defaults.format
            },
        }
    }

    /// Wire the upstream clients and formatter into a service.
    pub fn build_service(&self) -> anyhow::Result<CitationService> {
        let books = openlibrary::OpenLibraryClient::new(&self.openlibrary_url, self.timeout)
            .context("Failed to build book catalog client")?;
        let crossref = Arc::new(
            crossref::CrossRefClient::new(&self.crossref_url, self.mailto.as_deref(), self.timeout)
                .context("Failed to build CrossRef client")?,
        );
        let topics = topic::TopicClient::new(&self.topic_url, self.timeout)
            .context("Failed to build topic client")?;
        let formatter = ApaFormatter::new(&self.format).context("Invalid citation format settings")?;

        Ok(CitationService::new(
            Arc::new(books),
            crossref.clone(),
            crossref,
            Arc::new(topics),
            Arc::new(formatter),
            self.timeout,
        ))
    }

    /// Return a list of upstream service descriptions.
    pub fn service_status(&self) -> Vec<ServiceStatus> {
        vec![
            ServiceStatus { name: "openlibrary".into(), url: self.openlibrary_url.clone(), note: "Book search".into() },
            ServiceStatus { name: "crossref".into(), url: self.crossref_url.clone(),
                note: if self.mailto.is_some() { "DOI lookup and enrichment, polite pool email set".into() } else { "DOI lookup and enrichment".into() } },
            ServiceStatus { name: "cite-topic".into(), url: self.topic_url.clone(), note: "AI topic citations (not APA-validated)".into() },
            ServiceStatus { name: "formatter".into(), url: String::new(),
                note: format!("{} ({}), timeout {}s", self.format.template, self.format.lang, self.timeout.as_secs()) },
        ]
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub url: String,
    pub note: String,
}
