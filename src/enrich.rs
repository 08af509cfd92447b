use std::time::Duration;

use serde::Serialize;

use crate::apis::TitleResolver;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub doi_link: Option<String>,
}

/// Look up a DOI link for `title`. Failures and timeouts yield no link,
/// and a blank title is never sent to the resolver.
pub async fn enrich(resolver: &dyn TitleResolver, title: &str, timeout: Duration) -> Enrichment {
    if title.trim().is_empty() {
        return Enrichment::default();
    }
    let doi = match tokio::time::timeout(timeout, resolver.find_doi(title)).await {
        Ok(Ok(doi)) => doi,
        Ok(Err(e)) => {
            tracing::debug!("Enrichment failed for {:?}: {}", title, e);
            None
        }
        Err(_) => {
            tracing::debug!("Enrichment timed out after {:?} for {:?}", timeout, title);
            None
        }
    };
    Enrichment {
        doi_link: doi
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .map(|d| format!("https://doi.org/{}", d)),
    }
}
