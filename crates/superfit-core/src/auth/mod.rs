//! Authentication module for managing the session credential.
//!
//! This module provides:
//! - `TokenStore`: the current credential, persisted and mirrored to a cookie
//! - `Storage` backends: memory, JSON file, OS keyring
//! - `Claims`: decoding of the role and other claims inside the credential
//! - `route`: role to landing page mapping
//! - `SessionContext`: the per-session owner of the above
//! - `LoginFlow` and `logout`
//!
//! The client never enforces token expiry; the server rejects stale tokens.

pub mod claims;
pub mod login;
pub mod role;
pub mod session;
pub mod storage;
pub mod token_store;

pub use claims::{Claims, TokenError};
pub use login::{logout, LoginError, LoginFlow, LoginState, Navigator, Redirect};
pub use role::{route, Destination, Role};
pub use session::SessionContext;
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, Storage, StorageKind};
pub use token_store::{TokenStore, TOKEN_KEY};
