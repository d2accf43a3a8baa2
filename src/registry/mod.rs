//! Remote pack registry.

mod wire;

pub use wire::{WireRecord, parse_record};

use async_trait::async_trait;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::error::PackError;
use crate::http::{HttpClient, HttpError};
use crate::package::PackMetadata;

const DETAILS_ENDPOINT: &str = "api/details";
const SEARCH_ENDPOINT: &str = "api/search";

/// Source of pack metadata records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// The record for `pack_id`, or `None` when the registry does not know it.
    async fn details(&self, pack_id: &str) -> Result<Option<PackMetadata>, PackError>;

    /// Records matching a free-text query; an empty query lists the catalog.
    async fn search(&self, query: &str) -> Result<Vec<PackMetadata>, PackError>;
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    packs: Vec<Value>,
}

/// Registry served over HTTP at `{api_url}/api/details` and `{api_url}/api/search`.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    http: HttpClient,
    api_url: String,
}

impl HttpRegistry {
    pub fn new(http: HttpClient, api_url: impl Into<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url.trim_end_matches('/'), path)
    }
}

fn invalid_data(e: impl std::fmt::Display) -> PackError {
    PackError::Fetch(format!("Pack fetch received invalid data: {}", e))
}

#[async_trait]
impl Registry for HttpRegistry {
    #[tracing::instrument(skip(self))]
    async fn details(&self, pack_id: &str) -> Result<Option<PackMetadata>, PackError> {
        let url = self.endpoint(DETAILS_ENDPOINT);
        match self
            .http
            .get_json_with_query::<Value>(&url, &[("id", pack_id)])
            .await
        {
            Ok(value) => parse_record(value).map(Some).map_err(invalid_data),
            Err(HttpError::NotFound(_)) => {
                debug!("Registry has no pack {}", pack_id);
                Ok(None)
            }
            Err(HttpError::Decode(e)) => Err(invalid_data(e)),
            Err(e) => Err(PackError::Fetch(e.to_string())),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<PackMetadata>, PackError> {
        let url = self.endpoint(SEARCH_ENDPOINT);
        let response = match self
            .http
            .get_json_with_query::<SearchResponse>(&url, &[("query", query)])
            .await
        {
            Ok(response) => response,
            Err(e) => match e.status() {
                Some(status) if status <= 500 => {
                    warn!("Pack search failed: {}", e);
                    return Ok(Vec::new());
                }
                _ => return Err(PackError::Fetch(e.to_string())),
            },
        };

        response
            .packs
            .into_iter()
            .map(|value| parse_record(value).map_err(invalid_data))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn registry(url: &str) -> HttpRegistry {
        HttpRegistry::new(HttpClient::new(reqwest::Client::new()), url)
    }

    fn detailed(pack_id: &str) -> Value {
        json!({
            "pack_id": pack_id,
            "repo_url": "https://github.com/autopack/tests.git",
            "package_path": "tests.noop",
            "class_name": "NoopPack",
            "name": "noop_pack",
            "dependencies": [],
            "description": "Does nothing",
            "run_args": [{"name": "query", "type": "string"}]
        })
    }

    #[tokio::test]
    async fn test_details_success() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/details")
            .match_query(Matcher::UrlEncoded("id".into(), "autopack/tests/noop".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(detailed("autopack/tests/noop").to_string())
            .create_async()
            .await;

        let meta = registry(&server.url())
            .details("autopack/tests/noop")
            .await
            .unwrap()
            .unwrap();

        mock.assert_async().await;
        assert_eq!(meta.pack_id, "autopack/tests/noop");
    }

    #[tokio::test]
    async fn test_details_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/details")
            .match_query(Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let result = registry(&server.url()).details("a/b/c").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_details_error_status_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/details")
            .match_query(Matcher::Any)
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let err = registry(&server.url()).details("a/b/c").await.unwrap_err();
        mock.assert_async().await;
        assert!(matches!(err, PackError::Fetch(ref msg) if msg == "Error: 500"));
    }

    #[tokio::test]
    async fn test_details_invalid_data() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/details")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"pack_id": "a/b/c"}"#)
            .create_async()
            .await;

        let err = registry(&server.url()).details("a/b/c").await.unwrap_err();
        assert!(err.to_string().contains("invalid data"));
    }

    #[tokio::test]
    async fn test_search_success() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/search")
            .match_query(Matcher::UrlEncoded("query".into(), "noop".into()))
            .with_status(200)
            .with_body(json!({"packs": [detailed("a/b/one"), detailed("a/b/two")]}).to_string())
            .create_async()
            .await;

        let packs = registry(&format!("{}/", server.url()))
            .search("noop")
            .await
            .unwrap();
        let ids: Vec<&str> = packs.iter().map(|p| p.pack_id.as_str()).collect();
        assert_eq!(ids, vec!["a/b/one", "a/b/two"]);
    }

    #[tokio::test]
    async fn test_search_client_error_is_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/search")
            .match_query(Matcher::Any)
            .with_status(400)
            .create_async()
            .await;

        let packs = registry(&server.url()).search("x").await.unwrap();
        assert!(packs.is_empty());
    }

    #[tokio::test]
    async fn test_search_server_error_is_fetch_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/search")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let err = registry(&server.url()).search("x").await.unwrap_err();
        assert!(matches!(err, PackError::Fetch(_)));
    }
}
