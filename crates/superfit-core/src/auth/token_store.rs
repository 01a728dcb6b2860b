use std::sync::Arc;

use reqwest::cookie::Jar;
use reqwest::Url;
use tracing::{debug, warn};

use super::claims::Claims;
use super::storage::Storage;

/// Key under which the credential is stored, and name of the mirrored cookie
pub const TOKEN_KEY: &str = "jwtToken";

/// Lifetime of the mirrored cookie (24 hours, matching the server cookie)
const COOKIE_MAX_AGE_SECS: u64 = 24 * 60 * 60;

/// Holder of the current credential.
///
/// The credential is written to a durable `Storage` backend and mirrored to a
/// `jwtToken` cookie in the shared jar, so plain page requests that bypass the
/// bearer header still carry it. Backend failures are logged and otherwise
/// ignored: a broken backend behaves like an empty one.
pub struct TokenStore {
    storage: Box<dyn Storage>,
    cookies: Option<CookieMirror>,
}

struct CookieMirror {
    jar: Arc<Jar>,
    url: Url,
}

impl TokenStore {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self {
            storage,
            cookies: None,
        }
    }

    /// Also mirror the credential into `jar` as a cookie scoped to `url`.
    pub fn with_cookie_jar(mut self, jar: Arc<Jar>, url: Url) -> Self {
        self.cookies = Some(CookieMirror { jar, url });
        self
    }

    pub fn store(&self, credential: &str) {
        if let Err(e) = self.storage.set_item(TOKEN_KEY, credential) {
            warn!(error = %e, "Failed to persist credential");
        }
        self.set_cookie(credential);
        debug!("Credential stored");
    }

    pub fn retrieve(&self) -> Option<String> {
        match self.storage.get_item(TOKEN_KEY) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read credential");
                None
            }
        }
    }

    pub fn clear(&self) {
        if let Err(e) = self.storage.remove_item(TOKEN_KEY) {
            warn!(error = %e, "Failed to remove credential");
        }
        if let Some(ref mirror) = self.cookies {
            mirror.jar.add_cookie_str(&mirror_cookie("", 0), &mirror.url);
        }
        debug!("Credential cleared");
    }

    /// Re-add the cookie for an already stored credential (the jar is in-memory).
    ///
    /// The cookie lives no longer than the credential's `exp`, so a restart
    /// does not extend it. A credential without a readable `exp` gets the
    /// full lifetime.
    pub(crate) fn restore_cookie(&self) {
        let Some(credential) = self.retrieve() else {
            return;
        };
        let max_age = remaining_lifetime(&credential, chrono::Utc::now().timestamp());
        if max_age == 0 {
            debug!("Stored credential has expired, not restoring cookie");
            return;
        }
        if let Some(ref mirror) = self.cookies {
            mirror.jar.add_cookie_str(&mirror_cookie(&credential, max_age), &mirror.url);
        }
    }

    fn set_cookie(&self, credential: &str) {
        if let Some(ref mirror) = self.cookies {
            let cookie = mirror_cookie(credential, COOKIE_MAX_AGE_SECS);
            mirror.jar.add_cookie_str(&cookie, &mirror.url);
        }
    }
}

/// `Set-Cookie` value for the mirrored credential. A `max_age` of zero expires it.
fn mirror_cookie(credential: &str, max_age: u64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; SameSite=Lax",
        TOKEN_KEY,
        urlencoding::encode(credential),
        max_age
    )
}

/// Seconds the mirrored cookie may still live at `now`, capped at the cookie lifetime.
fn remaining_lifetime(credential: &str, now: i64) -> u64 {
    match Claims::decode(credential).ok().and_then(|c| c.exp) {
        Some(exp) => u64::try_from(exp.saturating_sub(now))
            .unwrap_or(0)
            .min(COOKIE_MAX_AGE_SECS),
        None => COOKIE_MAX_AGE_SECS,
    }
}
