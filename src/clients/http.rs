//! Shared HTTP plumbing for the remote API.

use backon::Retryable;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::utils::retry::{is_retryable_status, transport_backoff};

/// Errors raised by the HTTP layer.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid client configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl ClientError {
    /// HTTP status of a rejected request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Status { status, .. } => Some(*status),
            ClientError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Timeouts, connection failures, rate limits and server errors.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_timeout() || e.is_connect(),
            ClientError::Status { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(is_retryable_status)
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Failures where the server cannot have acted on the request: the
    /// connection never opened, or the server refused it outright.
    pub fn is_safe_to_resend(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect(),
            ClientError::Status { status, .. } => matches!(*status, 429 | 503),
            _ => false,
        }
    }
}

/// HTTP client bound to the API base URL.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::Config("API base URL not configured".to_string()));
        }

        let client = Client::builder().timeout(config.timeout()).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join an endpoint path onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// GET `path` and decode the JSON response.
    pub async fn get_json<T>(&self, path: &str, token: Option<&str>) -> Result<T, ClientError>
    where
        T: DeserializeOwned,
    {
        let response = self
            .execute(|| self.request(Method::GET, path, token), true)
            .await?;
        Ok(response.json().await?)
    }

    /// POST `body` as JSON to `path` and decode the JSON response.
    ///
    /// POSTs are only resent when the first attempt cannot have reached the
    /// server, so a lost response never stores the same body twice.
    pub async fn post_json<B, T>(
        &self,
        path: &str,
        body: &B,
        token: Option<&str>,
    ) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(|| self.request(Method::POST, path, token).json(body), false)
            .await?;
        Ok(response.json().await?)
    }

    /// POST `body` as JSON to `path`, ignoring the response body.
    pub async fn post<B>(&self, path: &str, body: &B, token: Option<&str>) -> Result<(), ClientError>
    where
        B: Serialize + ?Sized,
    {
        self.execute(|| self.request(Method::POST, path, token).json(body), false)
            .await?;
        Ok(())
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request, retrying transient failures with backoff.
    ///
    /// Non-idempotent requests are only retried on failures that
    /// [`ClientError::is_safe_to_resend`] accepts.
    async fn execute<F>(&self, build: F, idempotent: bool) -> Result<Response, ClientError>
    where
        F: Fn() -> RequestBuilder,
    {
        (|| async { Self::send_once(build()).await })
            .retry(transport_backoff())
            .when(|e: &ClientError| should_retry(e, idempotent))
            .notify(|e, delay| {
                warn!(error = %e, delay_ms = delay.as_millis() as u64, "Retrying API request");
            })
            .await
    }

    async fn send_once(request: RequestBuilder) -> Result<Response, ClientError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            debug!(url = %response.url(), status = %status, "API request succeeded");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body: body.chars().take(200).collect(),
        })
    }
}

fn should_retry(error: &ClientError, idempotent: bool) -> bool {
    if idempotent {
        error.is_retryable()
    } else {
        error.is_safe_to_resend()
    }
}
