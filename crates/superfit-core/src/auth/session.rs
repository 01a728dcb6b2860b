use std::sync::Arc;

use anyhow::Result;
use reqwest::cookie::Jar;
use reqwest::Url;
use tracing::{debug, info};

use crate::config::Config;

use super::claims::{Claims, TokenError};
use super::storage::{FileStorage, KeyringStorage, MemoryStorage, Storage, StorageKind};
use super::token_store::TokenStore;

/// The session-wide state: one token store and the cookie jar it mirrors into.
///
/// Built once at startup with `init` and handed to whatever needs it.
/// `teardown` ends the session.
pub struct SessionContext {
    tokens: Arc<TokenStore>,
    jar: Arc<Jar>,
}

impl SessionContext {
    /// Build the storage backend chosen in `config` and restore any stored credential.
    pub fn init(config: &Config) -> Result<Self> {
        let storage: Box<dyn Storage> = match config.storage {
            StorageKind::File => Box::new(FileStorage::new(config.cache_dir()?)),
            StorageKind::Keyring => Box::new(KeyringStorage::new()),
            StorageKind::Memory => Box::new(MemoryStorage::new()),
        };
        debug!(storage = ?config.storage, "Session storage configured");
        Ok(Self::with_storage(storage, config.base_url()?))
    }

    pub fn with_storage(storage: Box<dyn Storage>, base_url: Url) -> Self {
        let jar = Arc::new(Jar::default());
        let tokens = TokenStore::new(storage).with_cookie_jar(jar.clone(), base_url);
        tokens.restore_cookie();
        Self {
            tokens: Arc::new(tokens),
            jar,
        }
    }

    pub fn tokens(&self) -> Arc<TokenStore> {
        self.tokens.clone()
    }

    pub fn cookie_jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.tokens.retrieve()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Decoded claims of the stored credential, `None` when logged out.
    pub fn claims(&self) -> Option<Result<Claims, TokenError>> {
        self.token().map(|t| Claims::decode(&t))
    }

    /// End the session: drop the stored credential and its cookie.
    pub fn teardown(&self) {
        self.tokens.clear();
        info!("Session ended");
    }
}
