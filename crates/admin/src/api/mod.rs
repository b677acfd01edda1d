//! REST client for the Comptoir backend.
//!
//! Every endpoint answers with a `{ success, message, data }` envelope (the
//! dashboard endpoints excepted, which return the payload bare). The client
//! unwraps the envelope and maps HTTP failures onto [`ApiError`].
//!
//! # Authentication
//!
//! A bearer token, when configured, is sent on every request as a default
//! header. Session handling itself belongs to the auth collaborator.

mod dashboard;
mod orders;
mod products;

pub use orders::*;
pub use products::*;

use std::sync::Arc;

use comptoir_core::ApiResponse;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::multipart::Form;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Retry delay assumed when a 429 carries no `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Comptoir backend client.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

/// Error body of the backend (`{ "message": ... }`).
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let mut headers = HeaderMap::new();

        if let Some(bearer) = config.bearer() {
            let mut value = HeaderValue::from_str(&bearer)
                .map_err(|e| ApiError::InvalidInput(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve `path` (no leading slash) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("Invalid endpoint '{path}': {e}")))
    }

    /// GET returning the whole envelope (list endpoints carry `meta`).
    pub(crate) async fn get_envelope<T: DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<ApiResponse<T>, ApiError> {
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(self.parse_error(response).await);
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))?;
        if !envelope.success {
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message: envelope.message,
            });
        }
        Ok(envelope)
    }

    /// GET an enveloped payload.
    pub(crate) async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.inner.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// GET a bare (non-enveloped) payload.
    pub(crate) async fn get_plain<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let response = self.inner.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(self.parse_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))
    }

    /// POST a JSON body.
    pub(crate) async fn post<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.inner.client.post(url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// PATCH a JSON body.
    pub(crate) async fn patch<T: DeserializeOwned, B: serde::Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.inner.client.patch(url).json(body).send().await?;
        self.handle_response(response).await
    }

    /// POST a multipart form.
    pub(crate) async fn post_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self.inner.client.post(url).multipart(form).send().await?;
        self.handle_response(response).await
    }

    /// PATCH a multipart form.
    pub(crate) async fn patch_form<T: DeserializeOwned>(
        &self,
        url: Url,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self.inner.client.patch(url).multipart(form).send().await?;
        self.handle_response(response).await
    }

    /// DELETE; any 2xx counts as success and the body is ignored.
    pub(crate) async fn delete(&self, url: Url) -> Result<(), ApiError> {
        let response = self.inner.client.delete(url).send().await?;
        if response.status().is_success() {
            return Ok(());
        }
        Err(self.parse_error(response).await)
    }

    /// Unwrap the envelope of a response.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let status = response.status();

        if status.is_success() {
            let envelope: ApiResponse<T> = response
                .json()
                .await
                .map_err(|e| ApiError::Parse(format!("Failed to parse response: {e}")))?;
            return envelope.into_data().map_err(|message| ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        Err(self.parse_error(response).await)
    }

    /// Map a non-2xx response onto an error.
    async fn parse_error(&self, response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS);
            return ApiError::RateLimited(retry_after);
        }

        if status == 401 {
            return ApiError::Unauthorized;
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text);

        match status {
            403 => ApiError::Forbidden(message),
            404 => ApiError::NotFound(message),
            500.. => ApiError::Server { status, message },
            _ => ApiError::Rejected { status, message },
        }
    }
}

/// Extract the backend's `message` from an error body, falling back to the
/// raw text.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.message)
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            if body.is_empty() {
                "Unknown error".to_string()
            } else {
                body.to_string()
            }
        })
}

/// Percent-encode an identifier for use as a path segment.
pub(crate) fn segment(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}
