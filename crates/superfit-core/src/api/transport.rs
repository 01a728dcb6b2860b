//! HTTP transports.
//!
//! Call sites depend on `Transport`; the stack used in practice is
//! `BearerAuth<ReqwestTransport>`, composed once per session by
//! `ApiClient::from_session`.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::cookie::Jar;
use reqwest::{header, Client, Request, Response};
use tracing::debug;

use crate::auth::TokenStore;

use super::ApiError;

/// Dispatches a single HTTP request.
pub trait Transport: Send + Sync {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        (**self).execute(request)
    }
}

/// Base transport: a `reqwest::Client` that always sends the session cookies.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, jar: Arc<Jar>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_provider(jar)
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        Box::pin(async move {
            debug!(method = %request.method(), url = %request.url(), "Sending request");
            Ok(self.client.execute(request).await?)
        })
    }
}

/// Attaches `Authorization: Bearer <credential>` to every request that
/// passes through, when the token store holds a credential.
///
/// A caller-provided `Authorization` header is left as is, so wrapping a
/// transport twice never stacks headers.
pub struct BearerAuth<T> {
    inner: T,
    tokens: Arc<TokenStore>,
}

impl<T: Transport> BearerAuth<T> {
    pub fn new(inner: T, tokens: Arc<TokenStore>) -> Self {
        Self { inner, tokens }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    fn authorize(&self, request: &mut Request) -> Result<(), ApiError> {
        if request.headers().contains_key(header::AUTHORIZATION) {
            return Ok(());
        }
        if let Some(token) = self.tokens.retrieve() {
            let mut value = header::HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::InvalidCredential)?;
            value.set_sensitive(true);
            request.headers_mut().insert(header::AUTHORIZATION, value);
        }
        Ok(())
    }
}

impl<T: Transport> Transport for BearerAuth<T> {
    fn execute(&self, mut request: Request) -> BoxFuture<'_, Result<Response, ApiError>> {
        Box::pin(async move {
            self.authorize(&mut request)?;
            self.inner.execute(request).await
        })
    }
}
