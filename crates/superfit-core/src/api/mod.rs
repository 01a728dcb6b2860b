//! REST API client module for the Superfit server.
//!
//! This module provides the `ApiClient` and the `Transport` stack it sends
//! requests through. The server authenticates API calls with a bearer
//! token obtained from `/auth/login`; `BearerAuth` attaches it.

pub mod client;
pub mod error;
pub mod transport;

pub use client::{ApiClient, LoginResponse, SessionClient, LOGOUT_PATH};
pub use error::ApiError;
pub use transport::{BearerAuth, ReqwestTransport, Transport};
