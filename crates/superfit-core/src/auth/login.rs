//! Login and logout flows.
//!
//! `LoginFlow` walks `Idle -> Submitting -> Success | Failure`. A successful
//! login stores the credential and yields a `Redirect` to the landing page
//! for the role found in the token claims.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::{StatusCode, Url};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, ApiError, Transport};

use super::claims::{Claims, TokenError};
use super::role::{route, Destination};
use super::session::SessionContext;
use super::token_store::TokenStore;

const SUCCESS_MESSAGE: &str = "Login successful! Redirecting...";

/// Performs the redirect at the end of a login or logout.
pub trait Navigator: Send + Sync {
    fn navigate(&self, url: &Url);
}

#[derive(Error, Debug)]
pub enum LoginError {
    #[error("Email and password are required")]
    Validation,

    #[error("A login is already in progress")]
    AlreadySubmitting,

    #[error("Login rejected with status {status}")]
    Rejected {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Could not reach the server: {0}")]
    Connectivity(#[source] ApiError),

    #[error("Credential payload could not be decoded: {0}")]
    MalformedToken(#[from] TokenError),
}

impl LoginError {
    fn from_api(err: ApiError) -> Self {
        let message = match &err {
            ApiError::AccessDenied(detail) | ApiError::NotFound(detail) => Some(detail.clone()),
            ApiError::ServerError { body, .. } | ApiError::UnexpectedStatus { body, .. } => {
                Some(body.clone())
            }
            _ => None,
        }
        .filter(|m| !m.is_empty());

        match err {
            ApiError::NetworkError(_)
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidCredential
            | ApiError::InvalidUrl(_) => LoginError::Connectivity(err),
            other => match other.status() {
                Some(status) => LoginError::Rejected { status, message },
                None => LoginError::Connectivity(other),
            },
        }
    }

    /// Text shown next to the login form.
    pub fn user_message(&self) -> String {
        match self {
            LoginError::Validation => "Email and password are required.".to_string(),
            LoginError::AlreadySubmitting => "Login already in progress, please wait.".to_string(),
            LoginError::Rejected { status, .. } => format!(
                "Login failed. Status: {} - check your email and password.",
                status.as_u16()
            ),
            LoginError::Connectivity(_) => "Could not reach the server.".to_string(),
            LoginError::MalformedToken(_) => {
                "Login failed: the server returned an unreadable credential.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginState {
    Idle,
    Submitting,
    Success(Destination),
    Failure(String),
}

impl LoginState {
    pub fn message(&self) -> Option<&str> {
        match self {
            LoginState::Success(_) => Some(SUCCESS_MESSAGE),
            LoginState::Failure(message) => Some(message),
            LoginState::Idle | LoginState::Submitting => None,
        }
    }

    /// The form accepts a new submission in every state but `Submitting`.
    pub fn is_editable(&self) -> bool {
        !matches!(self, LoginState::Submitting)
    }
}

/// Where to go after a successful login, and how long to wait first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub destination: Destination,
    pub url: Url,
    pub delay: Duration,
}

/// Released on drop, so a cancelled or failed submit re-enables the form.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LoginFlow<T> {
    api: Arc<ApiClient<T>>,
    tokens: Arc<TokenStore>,
    redirect_delay: Duration,
    state: Mutex<LoginState>,
    in_flight: AtomicBool,
}

impl<T: Transport> LoginFlow<T> {
    pub fn new(api: Arc<ApiClient<T>>, tokens: Arc<TokenStore>, redirect_delay: Duration) -> Self {
        Self {
            api,
            tokens,
            redirect_delay,
            state: Mutex::new(LoginState::Idle),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> LoginState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    fn set_state(&self, state: LoginState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    fn fail(&self, err: LoginError) -> Result<Redirect, LoginError> {
        match err {
            LoginError::Validation => debug!("Login form incomplete"),
            LoginError::MalformedToken(ref e) => error!(error = %e, "Login returned an undecodable token"),
            ref other => warn!(error = %other, "Login failed"),
        }
        self.set_state(LoginState::Failure(err.user_message()));
        Err(err)
    }

    /// Validate the form and exchange the credentials for a token.
    ///
    /// On success the token is stored and the redirect is returned but not
    /// performed. A second call while one is pending fails with
    /// `AlreadySubmitting` and sends nothing.
    pub async fn submit(&self, email: &str, password: &str) -> Result<Redirect, LoginError> {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Ignoring submit while a login is in flight");
            return Err(LoginError::AlreadySubmitting);
        };

        let email = email.trim();
        let password = password.trim();
        if email.is_empty() || password.is_empty() {
            return self.fail(LoginError::Validation);
        }

        self.set_state(LoginState::Submitting);

        match self.exchange(email, password).await {
            Ok(redirect) => {
                self.set_state(LoginState::Success(redirect.destination));
                Ok(redirect)
            }
            Err(e) => self.fail(e),
        }
    }

    async fn exchange(&self, email: &str, password: &str) -> Result<Redirect, LoginError> {
        let response = self
            .api
            .authenticate(email, password)
            .await
            .map_err(LoginError::from_api)?;

        // Decode before storing: an unreadable token must not become the session
        let token = response.token.trim();
        let claims = Claims::decode(token)?;
        let destination = route(claims.role());

        self.tokens.store(token);
        info!(role = claims.role().unwrap_or("<none>"), %destination, "Login successful");

        let url = self
            .api
            .url(destination.path())
            .map_err(LoginError::Connectivity)?;

        Ok(Redirect {
            destination,
            url,
            delay: self.redirect_delay,
        })
    }

    /// Submit, then after the redirect delay hand the landing page to `navigator`.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        navigator: &dyn Navigator,
    ) -> Result<Destination, LoginError> {
        let redirect = self.submit(email, password).await?;
        tokio::time::sleep(redirect.delay).await;
        navigator.navigate(&redirect.url);
        Ok(redirect.destination)
    }
}

/// End the session locally, ask the server to drop its cookie, and go home.
/// Server failures are logged; the local credential is gone either way.
pub async fn logout<T: Transport>(
    api: &ApiClient<T>,
    session: &SessionContext,
    navigator: &dyn Navigator,
) {
    session.teardown();

    if let Err(e) = api.logout().await {
        warn!(error = %e, "Server logout failed");
    }

    match api.url(Destination::Home.path()) {
        Ok(url) => navigator.navigate(&url),
        Err(e) => warn!(error = %e, "Cannot build home URL"),
    }
}
