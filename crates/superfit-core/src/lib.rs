//! Superfit client core.
//!
//! Session handling for the Superfit academy portal: credential storage,
//! an API client whose transport attaches the credential to every request,
//! the login/logout flows, and role-based landing pages.

pub mod api;
pub mod auth;
pub mod config;

pub use api::{ApiClient, ApiError, SessionClient};
pub use auth::{Destination, LoginError, LoginFlow, Navigator, SessionContext};
pub use config::Config;
