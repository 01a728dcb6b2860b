//! API client for the Superfit REST endpoints.
//!
//! `ApiClient` builds requests against the configured base URL and sends
//! them through a `Transport`. Resource endpoints are reached through the
//! generic JSON verbs; login and logout have dedicated methods.

use std::time::Duration;

use reqwest::{header, Method, Request, Response, Url};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::auth::SessionContext;
use crate::config::Config;

use super::transport::{BearerAuth, ReqwestTransport, Transport};
use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Credential exchange endpoint
const LOGIN_PATH: &str = "/auth/login";

/// Server-side logout route (expires the server cookie)
pub const LOGOUT_PATH: &str = "/logout";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// The transport stack every session uses: cookies plus bearer header.
pub type SessionClient = ApiClient<BearerAuth<ReqwestTransport>>;

pub struct ApiClient<T> {
    transport: T,
    base_url: Url,
}

impl SessionClient {
    /// Compose the session transport stack. Call once per session and share
    /// the client; every request it sends carries the current credential.
    pub fn from_session(config: &Config, session: &SessionContext) -> anyhow::Result<Self> {
        let base = ReqwestTransport::new(config.request_timeout(), session.cookie_jar())?;
        let transport = BearerAuth::new(base, session.tokens());
        Ok(ApiClient::new(transport, config.base_url()?))
    }
}

impl<T: Transport> ApiClient<T> {
    /// A base URL with a path prefix (e.g. `http://host/superfit`) keeps it:
    /// every path is resolved beneath the prefix.
    pub fn new(transport: T, mut base_url: Url) -> Self {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            transport,
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Resolve a server path (e.g. `/aluno/dashboard`) beneath the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", path, e)))
    }

    fn build_request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Request, ApiError> {
        let mut request = Request::new(method, self.url(path)?);
        request
            .headers_mut()
            .insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(body) = body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode body: {}", e)))?;
            request.headers_mut().insert(
                header::CONTENT_TYPE,
                header::HeaderValue::from_static("application/json"),
            );
            *request.body_mut() = Some(bytes.into());
        }
        Ok(request)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Exchange email and password for a credential. Single attempt, no retry.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest { email, password };
        let request = self.build_request(Method::POST, LOGIN_PATH, Some(&body))?;

        let response = self.transport.execute(request).await?;
        let response = Self::check_response(response).await?;

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))
    }

    /// Ask the server to expire its session cookie.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let request = self.build_request::<()>(Method::GET, LOGOUT_PATH, None)?;
        let response = self.transport.execute(request).await?;
        Self::check_response(response).await?;
        Ok(())
    }

    /// Send a request, retrying with exponential backoff while rate limited.
    async fn send_with_retry<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, ApiError> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let request = self.build_request(method.clone(), path, body)?;
            let response = self.transport.execute(request).await?;

            if response.status() != reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Self::check_response(response).await;
            }

            retries += 1;
            if retries > MAX_RATE_LIMIT_RETRIES {
                return Err(ApiError::RateLimited);
            }
            warn!(path = path, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
            tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
            backoff_ms *= 2; // Exponential backoff
        }
    }

    async fn parse_json<R: DeserializeOwned>(response: Response, path: &str) -> Result<R, ApiError> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let response = self.send_with_retry::<()>(Method::GET, path, None).await?;
        Self::parse_json(response, path).await
    }

    pub async fn post_json<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let response = self.send_with_retry(Method::POST, path, Some(body)).await?;
        Self::parse_json(response, path).await
    }

    pub async fn put_json<R: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let response = self.send_with_retry(Method::PUT, path, Some(body)).await?;
        Self::parse_json(response, path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send_with_retry::<()>(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// Send an arbitrary request and return the response body as text.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<String, ApiError> {
        let response = self.send_with_retry(method, path, body).await?;
        let text = response.text().await?;
        debug!(path = path, bytes = text.len(), "Response received");
        Ok(text)
    }
}
