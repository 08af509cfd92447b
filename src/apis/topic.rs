use std::time::Duration;

use super::{http_client, SourceError, TopicCiter, TopicItem};
use async_trait::async_trait;
use serde::Serialize;

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";

/// Client for the AI service that suggests citations for a topic.
pub struct TopicClient {
    client: reqwest::Client,
    base_url: String,
}

impl TopicClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(None, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Serialize)]
struct TopicRequest<'a> {
    topic: &'a str,
}

#[async_trait]
impl TopicCiter for TopicClient {
    fn name(&self) -> &str { "cite-topic" }

    async fn cite_topic(&self, topic: &str) -> Result<Vec<TopicItem>, SourceError> {
        let body = self.client
            .post(&format!("{}/cite-topic", self.base_url))
            .json(&TopicRequest { topic })
            .send().await?
            .error_for_status()?
            .text().await?;
        serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("unexpected topic response: {}", e)))
    }
}
