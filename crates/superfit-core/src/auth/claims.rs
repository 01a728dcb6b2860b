//! Decoding of the claims carried in a compact signed token.
//!
//! Only the payload segment is read. The signature is never verified here:
//! the server is the authority, and the decoded role is used for routing only.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of dot-separated segments in a compact token (header.payload.signature)
const TOKEN_SEGMENTS: usize = 3;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token has {0} segments, expected 3")]
    Segments(usize),

    #[error("Token payload is not valid base64url: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Token payload is not a JSON claims object: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub role: Option<String>,
    /// Subject, the account email
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    /// Decode the payload segment of `token`.
    pub fn decode(token: &str) -> Result<Self, TokenError> {
        let segments: Vec<&str> = token.trim().split('.').collect();
        if segments.len() != TOKEN_SEGMENTS {
            return Err(TokenError::Segments(segments.len()));
        }
        // Some issuers keep the base64 padding
        let payload = segments[1].trim_end_matches('=');
        let decoded = URL_SAFE_NO_PAD.decode(payload)?;
        Ok(serde_json::from_slice(&decoded)?)
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.iat.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }

    /// Whether `exp` is in the past. Informational; requests are never
    /// blocked on this, the server decides.
    pub fn is_expired(&self) -> bool {
        self.expires_at().map(|exp| Utc::now() > exp).unwrap_or(false)
    }
}
