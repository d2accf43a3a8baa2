//! Thin JSON-over-HTTP client.

use log::debug;
use reqwest::Client;
use serde::de::DeserializeOwned;

use super::error::{HttpError, classify_error};

/// HTTP client for registry calls. Failures are returned at once, never retried.
#[derive(Clone, Debug)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    /// Creates a new HTTP client wrapping the given reqwest Client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Performs a GET request with query parameters and deserializes the JSON response.
    #[tracing::instrument(skip(self, query))]
    pub async fn get_json_with_query<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T, HttpError> {
        debug!("GET JSON from {} with query {:?}...", url, query);

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(classify_error)?;

        let response = response.error_for_status().map_err(classify_error)?;

        response
            .json::<T>()
            .await
            .map_err(|e| HttpError::Decode(e.to_string()))
    }
}
