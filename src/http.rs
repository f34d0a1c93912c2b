//! Shared outbound HTTP client

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

use crate::config::HttpConfig;
use crate::error::{Error, FetchError, Result};

/// Thin wrapper over `reqwest::Client` that classifies responses into
/// [`FetchError`] outcomes.
///
/// Cloning is cheap; every provider in a process shares one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    /// Build a client with the configured timeout and user agent
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { inner })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.inner.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.inner.post(url)
    }

    /// Send a request and decode a 2xx JSON body.
    ///
    /// 429 maps to [`FetchError::RateLimited`], any other non-2xx to
    /// [`FetchError::Status`], an undecodable body to [`FetchError::Decode`].
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> std::result::Result<T, FetchError> {
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(FetchError::RateLimited);
        }
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::decode(e.to_string()))
    }
}
