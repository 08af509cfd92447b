use std::time::Duration;

use super::{http_client, SourceError, TitleResolver, WorkRegistry};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://api.crossref.org";

pub struct CrossRefClient {
    client: reqwest::Client,
    base_url: String,
}

impl CrossRefClient {
    pub fn new(base_url: &str, mailto: Option<&str>, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(mailto, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Deserialize)]
struct CRSearchResponse {
    message: CRSearchMessage,
}
#[derive(Deserialize)]
struct CRSearchMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}
#[derive(Deserialize)]
struct CRItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[async_trait]
impl WorkRegistry for CrossRefClient {
    fn name(&self) -> &str { "crossref" }

    async fn lookup_doi(&self, doi: &str) -> Result<serde_json::Value, SourceError> {
        // DOIs may contain `#`, `?` or `;`, so the whole identifier is one encoded segment.
        let url = format!("{}/works/{}", self.base_url, urlencoding::encode(doi));
        let body = self.client
            .get(&url)
            .send().await?
            .error_for_status()?
            .text().await?;
        let mut envelope: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| SourceError::Parse(format!("DOI response is not JSON: {}", e)))?;
        // Whatever sits under `message` goes to the formatter untouched.
        Ok(envelope
            .get_mut("message")
            .map(serde_json::Value::take)
            .unwrap_or(serde_json::Value::Null))
    }
}

#[async_trait]
impl TitleResolver for CrossRefClient {
    async fn find_doi(&self, title: &str) -> Result<Option<String>, SourceError> {
        let resp: CRSearchResponse = self.client
            .get(&format!("{}/works", self.base_url))
            .query(&[
                ("query.bibliographic", title),
                ("filter", "type:journal-article"),
                ("rows", "1"),
            ])
            .send().await?
            .error_for_status()?
            .json().await?;
        // First hit wins; there is no tie-break between same-titled works.
        Ok(resp.message.items.into_iter().next().and_then(|item| item.doi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server, ServerGuard};
    use serde_json::json;

    fn client(server: &ServerGuard) -> CrossRefClient {
        CrossRefClient::new(&server.url(), None, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_lookup_doi_returns_message() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1%2Fxyz")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"status": "ok", "message": {"DOI": "10.1/xyz", "title": ["A Work"]}}).to_string())
            .create_async()
            .await;

        let message = client(&server).lookup_doi("10.1/xyz").await.unwrap();
        assert_eq!(message["DOI"], "10.1/xyz");
        assert_eq!(message["title"][0], "A Work");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_lookup_doi_not_found_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/works/10.1%2Fmissing")
            .with_status(404)
            .with_body("Resource not found.")
            .create_async()
            .await;

        let err = client(&server).lookup_doi("10.1/missing").await.unwrap_err();
        assert!(matches!(err, SourceError::Http(_)));
    }

    #[tokio::test]
    async fn test_lookup_doi_rejects_non_json() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/works/10.1%2Fhtml")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .create_async()
            .await;

        let err = client(&server).lookup_doi("10.1/html").await.unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_find_doi_takes_first_item() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query.bibliographic".into(), "Deep Learning".into()),
                Matcher::UrlEncoded("filter".into(), "type:journal-article".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"message": {"items": [{"DOI": "10.1038/nature14539"}, {"DOI": "10.9/other"}]}}).to_string())
            .create_async()
            .await;

        let doi = client(&server).find_doi("Deep Learning").await.unwrap();
        assert_eq!(doi.as_deref(), Some("10.1038/nature14539"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_find_doi_no_items() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/works")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(json!({"message": {"items": []}}).to_string())
            .create_async()
            .await;

        assert_eq!(client(&server).find_doi("Nothing").await.unwrap(), None);
    }
}
