//! Thin JSON-over-HTTP request layer.
//!
//! Every call is exactly one round trip. Non-success responses become
//! [`ChorusError::ServerFailure`] carrying the response text; nothing here
//! retries.

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ChorusError, ChorusResult};

#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
}

impl Transport {
    pub fn new(config: &ApiConfig) -> ChorusResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ChorusError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(client, &config.base_url))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Sends one request and decodes the success body as `T`.
    pub async fn request<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> ChorusResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let response = self.send(method, path, body).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ChorusError::DecodeFailure(e.to_string()))
    }

    /// Sends one request and discards the success body.
    pub async fn request_unit<B>(&self, method: Method, path: &str, body: Option<&B>) -> ChorusResult<()>
    where
        B: Serialize + ?Sized,
    {
        self.send(method, path, body).await.map(|_| ())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ChorusResult<T> {
        self.request::<T, ()>(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> ChorusResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ChorusResult<T> {
        self.request::<T, ()>(Method::POST, path, None).await
    }

    /// Plain-text read; the body is returned verbatim instead of being decoded.
    pub async fn get_text(&self, path: &str) -> ChorusResult<String> {
        let response = self.send::<()>(Method::GET, path, None).await?;
        Ok(response.text().await?)
    }

    async fn send<B>(&self, method: Method, path: &str, body: Option<&B>) -> ChorusResult<Response>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path);
        debug!(method = %method, url = %url, "sending request");

        let mut builder: RequestBuilder = self.client.request(method, &url);
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), url = %url, "request failed");
        Err(ChorusError::server(status.as_u16(), text))
    }
}
