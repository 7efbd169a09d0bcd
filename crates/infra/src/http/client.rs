//! Shared HTTP client for the hosted backends

use std::time::Duration;

use focusmode_domain::{FocusError, Result};
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::errors::{status_error, InfraError};

/// HTTP client with a request timeout and a fixed user agent.
///
/// One attempt per request; the orchestrator owns the retry policy for saves.
#[derive(Clone)]
pub struct HttpClient {
    client: ReqwestClient,
}

impl HttpClient {
    /// Start building a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a request builder using the underlying reqwest client.
    pub fn request<U>(&self, method: Method, url: U) -> RequestBuilder
    where
        U: reqwest::IntoUrl,
    {
        self.client.request(method, url)
    }

    /// Execute the request. Transport failures become domain errors; any
    /// status is returned as is.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build().map_err(|err| FocusError::from(InfraError::from(err)))?;
        let method = request.method().clone();
        let path = request.url().path().to_string();
        debug!(%method, %path, "sending HTTP request");

        match self.client.execute(request).await {
            Ok(response) => {
                debug!(%method, %path, status = %response.status(), "received HTTP response");
                Ok(response)
            }
            Err(err) => {
                debug!(%method, %path, error = %err, "HTTP request failed");
                Err(FocusError::from(InfraError::from(err)))
            }
        }
    }

    /// Send and turn any non-success status into a domain error carrying the
    /// server's message.
    pub async fn send_checked(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.send(builder).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &error_detail(&body)))
    }

    /// Send, check the status and decode a JSON body.
    pub async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.send_checked(builder).await?;
        response.json::<T>().await.map_err(|err| FocusError::from(InfraError::from(err)))
    }
}

/// Builder for [`HttpClient`].
#[derive(Debug)]
pub struct HttpClientBuilder {
    timeout: Duration,
    user_agent: Option<String>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(30), user_agent: None }
    }
}

impl HttpClientBuilder {
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    pub fn build(self) -> Result<HttpClient> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();
        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }
        let client = builder.build().map_err(|err| FocusError::from(InfraError::from(err)))?;
        Ok(HttpClient { client })
    }
}

/// Pull a human-readable message out of an error body. Understands the
/// Google API (`error.message`), PostgREST (`message`) and GoTrue
/// (`error_description`, `msg`) shapes; falls back to the raw text.
pub(crate) fn error_detail(body: &str) -> String {
    let body = body.trim();
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return body.chars().take(200).collect();
    };
    let candidates = [
        json.pointer("/error/message"),
        json.get("error_description"),
        json.get("msg"),
        json.get("message"),
        json.get("error"),
    ];
    let detail = candidates
        .into_iter()
        .flatten()
        .find_map(|value| value.as_str().map(str::to_string))
        .unwrap_or_else(|| body.chars().take(200).collect());
    detail
}
