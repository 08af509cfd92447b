use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::apis::{TitleResolver, TopicItem};
use crate::enrich::enrich;
use crate::normalize::topic_text;

/// One row of the result list shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayedCitation {
    pub citation_text: String,
    /// Present only when enrichment found a DOI.
    pub doi_link: Option<String>,
}

impl DisplayedCitation {
    pub fn plain(citation_text: String) -> Self {
        Self { citation_text, doi_link: None }
    }
}

/// Build citation text for every topic item, then enrich all of them in
/// parallel and wait for every lookup to settle. Output order matches input
/// order. A failed lookup only loses that item's link.
pub async fn aggregate(
    resolver: Arc<dyn TitleResolver>,
    items: &[TopicItem],
    timeout: Duration,
) -> Vec<DisplayedCitation> {
    if items.is_empty() {
        return Vec::new();
    }

    let texts: Vec<String> = items.iter().map(topic_text).collect();

    let handles: Vec<_> = items
        .iter()
        .map(|item| {
            let resolver = Arc::clone(&resolver);
            let title = item.title.clone();
            tokio::spawn(async move { enrich(resolver.as_ref(), &title, timeout).await })
        })
        .collect();

    let settled = futures::future::join_all(handles).await;

    let citations: Vec<DisplayedCitation> = texts
        .into_iter()
        .zip(settled)
        .enumerate()
        .map(|(index, (citation_text, outcome))| {
            let doi_link = match outcome {
                Ok(enrichment) => enrichment.doi_link,
                Err(e) => {
                    tracing::warn!("Enrichment task {} panicked: {}", index, e);
                    None
                }
            };
            DisplayedCitation { citation_text, doi_link }
        })
        .collect();

    tracing::info!(
        "Aggregated {} topic citations, {} with DOI links",
        citations.len(),
        citations.iter().filter(|c| c.doi_link.is_some()).count()
    );
    citations
}
