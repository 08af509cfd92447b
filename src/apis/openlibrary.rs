use std::time::Duration;

use super::{http_client, BookCatalog, BookDoc, SourceError};
use async_trait::async_trait;
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://openlibrary.org";

pub struct OpenLibraryClient {
    client: reqwest::Client,
    base_url: String,
}

impl OpenLibraryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        Ok(Self {
            client: http_client(None, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[derive(Deserialize)]
struct OLResponse {
    #[serde(default)]
    docs: Vec<BookDoc>,
}

#[async_trait]
impl BookCatalog for OpenLibraryClient {
    fn name(&self) -> &str { "openlibrary" }

    async fn search_books(&self, title: &str, limit: usize) -> Result<Vec<BookDoc>, SourceError> {
        let limit_param = limit.to_string();
        let resp: OLResponse = self.client
            .get(&format!("{}/search.json", self.base_url))
            .query(&[("title", title), ("limit", limit_param.as_str())])
            .send().await?
            .error_for_status()?
            .json().await?;
        // The limit parameter is advisory upstream; enforce it here.
        Ok(resp.docs.into_iter().take(limit).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn test_search_books_truncates_in_source_order() {
        let mut server = Server::new_async().await;
        let docs: Vec<_> = (1..=7)
            .map(|i| json!({"title": format!("Book {}", i), "key": format!("/works/OL{}W", i)}))
            .collect();
        let mock = server
            .mock("GET", "/search.json")
            .match_query(Matcher::UrlEncoded("title".into(), "the hobbit".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"numFound": 7, "docs": docs}).to_string())
            .create_async()
            .await;

        let client = OpenLibraryClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        let books = client.search_books("the hobbit", 5).await.unwrap();
        let titles: Vec<_> = books.iter().map(|b| b.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Book 1", "Book 2", "Book 3", "Book 4", "Book 5"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_books_server_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/search.json")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = OpenLibraryClient::new(&server.url(), Duration::from_secs(5)).unwrap();
        assert!(client.search_books("anything", 5).await.is_err());
    }
}
