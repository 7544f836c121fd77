//! HTTP wrapper around the MyCloud REST API.
//!
//! Every call takes a [`CancellationToken`]; a cancelled call resolves to
//! [`ApiError::Cancelled`] without waiting for the server. Before each
//! request the stored session token is attached as `Authorization: Token
//! <token>`, and every non-GET request first fetches a fresh anti-forgery
//! token from `/auth/csrf/` and sends it as `X-CSRFToken`.
//!
//! Failures are normalized here so callers only ever see display strings:
//! 401/403 become a fixed advisory (and drop the stored credential), other
//! statuses use the server's `error`/`detail` field or a generic fallback.

pub mod auth;
pub mod files;
pub mod users;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use mycloud_shared::constants::{AUTH_FAILURE_MESSAGE, GENERIC_FAILURE_MESSAGE};
use mycloud_shared::types::CsrfResponse;

use crate::config::ClientConfig;
use crate::error::{ApiError, ClientError, FieldErrors};
use crate::vault::TokenVault;

pub const CSRF_PATH: &str = "/auth/csrf/";
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Body keys that carry the summary message rather than a field error.
const MESSAGE_KEYS: [&str; 3] = ["error", "detail", "code"];

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
    vault: TokenVault,
}

impl ApiClient {
    pub fn new(config: &ClientConfig, vault: TokenVault) -> Result<Self, ClientError> {
        // Cookies carry the session half of the CSRF pair.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(concat!("mycloud-client/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            timeout: config.request_timeout,
            vault,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn vault(&self) -> &TokenVault {
        &self.vault
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Fetch a fresh anti-forgery token. `None` when the endpoint fails;
    /// the mutating request then goes out without the header.
    async fn csrf_token(&self) -> Option<String> {
        let response = self
            .http
            .get(self.url(CSRF_PATH))
            .header(header::ACCEPT, "application/json")
            .timeout(self.timeout)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => match resp.json::<CsrfResponse>().await {
                Ok(body) => Some(body.csrf_token),
                Err(e) => {
                    warn!(error = %e, "Malformed CSRF response");
                    None
                }
            },
            Ok(resp) => {
                warn!(status = %resp.status(), "CSRF endpoint refused");
                None
            }
            Err(e) => {
                warn!(error = %e, "Error getting CSRF token");
                None
            }
        }
    }

    /// Build a request with auth and anti-forgery headers attached.
    async fn prepare(&self, method: Method, path: &str) -> RequestBuilder {
        let mutating = method != Method::GET;
        let mut request = self
            .http
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.vault.load() {
            request = request.header(header::AUTHORIZATION, format!("Token {token}"));
        }

        if mutating {
            if let Some(csrf) = self.csrf_token().await {
                request = request.header(CSRF_HEADER, csrf);
            }
        }

        request
    }

    /// Send a request and turn any non-success status into an [`ApiError`].
    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await?;
        let status = response.status();
        debug!(status = %status, url = %response.url(), "API response");

        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        if is_auth_failure(status) {
            // the credential is no longer trusted by the server
            self.vault.clear();
        }
        Err(normalize_failure(status, &body))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::GET, path)
                .await
                .query(query)
                .timeout(self.timeout);
            decode_json(self.execute(request).await?).await
        })
        .await
    }

    /// GET a binary payload (file download).
    pub async fn get_bytes(&self, path: &str, cancel: &CancellationToken) -> Result<Bytes, ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::GET, path)
                .await
                .header(header::ACCEPT, "application/octet-stream");
            let response = self.execute(request).await?;
            Ok(response.bytes().await?)
        })
        .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::POST, path)
                .await
                .json(body)
                .timeout(self.timeout);
            decode_json(self.execute(request).await?).await
        })
        .await
    }

    /// POST where the response body is ignored (e.g. 204 No Content).
    pub async fn post_no_content<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::POST, path)
                .await
                .json(body)
                .timeout(self.timeout);
            self.execute(request).await?;
            Ok(())
        })
        .await
    }

    /// POST a multipart form. No timeout: uploads run as long as they make progress.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        cancellable(cancel, async {
            let request = self.prepare(Method::POST, path).await.multipart(form);
            decode_json(self.execute(request).await?).await
        })
        .await
    }

    pub async fn patch<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::PATCH, path)
                .await
                .json(body)
                .timeout(self.timeout);
            decode_json(self.execute(request).await?).await
        })
        .await
    }

    pub async fn delete(&self, path: &str, cancel: &CancellationToken) -> Result<(), ApiError> {
        cancellable(cancel, async {
            let request = self
                .prepare(Method::DELETE, path)
                .await
                .timeout(self.timeout);
            self.execute(request).await?;
            Ok(())
        })
        .await
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Race `fut` against the cancellation token.
async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    if cancel.is_cancelled() {
        return Err(ApiError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ApiError::Cancelled),
        result = fut => result,
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

fn is_auth_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN
}

/// Map a failed response to the display-string error callers see.
pub(crate) fn normalize_failure(status: StatusCode, body: &[u8]) -> ApiError {
    if is_auth_failure(status) {
        return ApiError::Unauthorized(AUTH_FAILURE_MESSAGE.to_string());
    }

    let value: Option<serde_json::Value> = serde_json::from_slice(body).ok();

    let message = value
        .as_ref()
        .and_then(|v| v.get("error").or_else(|| v.get("detail")))
        .and_then(message_text)
        .unwrap_or_else(|| GENERIC_FAILURE_MESSAGE.to_string());

    let fields = value.as_ref().map(field_errors).unwrap_or_default();

    ApiError::Server { message, fields }
}

fn message_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let parts: Vec<&str> = items.iter().filter_map(|v| v.as_str()).collect();
            (!parts.is_empty()).then(|| parts.join(" "))
        }
        _ => None,
    }
}

/// Collect DRF-style `{"field": ["msg", ...]}` validation messages.
fn field_errors(value: &serde_json::Value) -> FieldErrors {
    let mut fields = FieldErrors::new();
    let Some(object) = value.as_object() else {
        return fields;
    };

    for (key, entry) in object {
        if MESSAGE_KEYS.contains(&key.as_str()) {
            continue;
        }
        let messages: Vec<String> = match entry {
            serde_json::Value::String(s) => vec![s.clone()],
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            _ => continue,
        };
        if !messages.is_empty() {
            fields.insert(key.clone(), messages);
        }
    }
    fields
}
