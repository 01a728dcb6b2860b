//! Shared helpers for integration tests: tokens, sessions against a mock
//! server, and a navigator that records where it was sent.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use reqwest::Url;
use superfit_core::auth::{MemoryStorage, Navigator, StorageKind};
use superfit_core::{Config, SessionClient, SessionContext};
use wiremock::MockServer;

/// Build a compact token whose payload is the given JSON text.
pub fn token_with_payload(payload: &str) -> String {
    format!(
        "{}.{}.{}",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(payload),
        URL_SAFE_NO_PAD.encode("signature")
    )
}

pub fn token_for_role(role: &str) -> String {
    token_with_payload(&format!(r#"{{"sub":"a@b.com","role":"{}","iat":1700000000}}"#, role))
}

#[derive(Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn paths(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &Url) {
        self.visited.lock().unwrap().push(url.path().to_string());
    }
}

pub fn config_for(server: &MockServer) -> Config {
    Config {
        base_url: server.uri(),
        storage: StorageKind::Memory,
        redirect_delay_ms: 10,
        request_timeout_secs: 5,
        ..Config::default()
    }
}

/// Config pointing at a local port with nothing listening.
pub fn unreachable_config() -> Config {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    Config {
        base_url: format!("http://127.0.0.1:{}", port),
        storage: StorageKind::Memory,
        redirect_delay_ms: 10,
        request_timeout_secs: 5,
        ..Config::default()
    }
}

pub struct Harness {
    pub config: Config,
    pub session: SessionContext,
    pub api: Arc<SessionClient>,
}

pub fn harness(server: &MockServer) -> Harness {
    harness_for_url(config_for(server))
}

pub fn harness_for_url(config: Config) -> Harness {
    let base = config.base_url().unwrap();
    let session = SessionContext::with_storage(Box::new(MemoryStorage::new()), base);
    let api = Arc::new(SessionClient::from_session(&config, &session).unwrap());
    Harness {
        config,
        session,
        api,
    }
}
