//! Bearer tokens, their embedded claims, and the token store seam

use crate::error::TokenError;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Opaque bearer credential
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Get the raw credential
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in log lines; never print the credential itself.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token(<{} bytes>)", self.0.len())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Claims embedded in a JWT payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Expiration time (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at (epoch seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

impl TokenClaims {
    /// Claims with only an expiry set
    #[must_use]
    pub const fn expiring_at(exp: i64) -> Self {
        Self {
            exp: Some(exp),
            iat: None,
            sub: None,
        }
    }

    /// Expiry usable for the expiration check.
    ///
    /// A zero `exp` carries no information and is treated like a missing one.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        self.exp.filter(|exp| *exp != 0)
    }

    /// Seconds from `now` until expiry; negative once expired
    #[must_use]
    pub fn seconds_until_expiry(&self, now: i64) -> Option<i64> {
        self.expires_at().map(|exp| exp.saturating_sub(now))
    }

    /// Encode these claims as an unsigned JWT (`alg: none`).
    ///
    /// Only useful for local sessions and tests; nothing here verifies
    /// signatures.
    ///
    /// # Errors
    ///
    /// Returns an error if the claims cannot be serialized
    pub fn to_unsigned_token(&self) -> Result<Token, TokenError> {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?);
        Ok(Token(format!("{header}.{payload}.")))
    }
}

/// Decode the (unverified) payload segment of a JWT.
///
/// # Errors
///
/// Returns an error if the token does not have three segments, or the payload
/// is not base64url-encoded JSON
pub fn decode_claims(token: &Token) -> Result<TokenClaims, TokenError> {
    let segments: Vec<&str> = token.as_str().split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(segments.len()));
    }

    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Shared token storage consulted by the monitor.
///
/// Implementations synchronize internally; every call is atomic from the
/// monitor's point of view.
pub trait TokenStore: Send + Sync {
    /// Current token, if any
    fn get_token(&self) -> Option<Token>;

    /// Decode a token's claims; `None` when undecodable
    fn decode_token(&self, token: &Token) -> Option<TokenClaims>;

    /// Store a token, optionally beyond the current session ("remember me")
    fn set_token(&self, token: Token, persist_beyond_session: bool);

    /// Forget the token everywhere
    fn clear_token(&self);
}

#[derive(Debug, Default)]
struct Slots {
    session: Option<Token>,
    persistent: Option<Token>,
}

/// In-memory token store with a session slot and a persistent slot
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    slots: RwLock<Slots>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding `token` in the session slot
    #[must_use]
    pub fn with_token(token: Token) -> Self {
        Self {
            slots: RwLock::new(Slots {
                session: Some(token),
                persistent: None,
            }),
        }
    }

    /// Whether the current token lives in the persistent slot
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.session.is_none() && slots.persistent.is_some()
    }
}

impl TokenStore for MemoryTokenStore {
    fn get_token(&self) -> Option<Token> {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.session.clone().or_else(|| slots.persistent.clone())
    }

    fn decode_token(&self, token: &Token) -> Option<TokenClaims> {
        match decode_claims(token) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!("Token could not be decoded: {}", e);
                None
            }
        }
    }

    fn set_token(&self, token: Token, persist_beyond_session: bool) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        if persist_beyond_session {
            slots.persistent = Some(token);
            slots.session = None;
        } else {
            slots.session = Some(token);
            slots.persistent = None;
        }
    }

    fn clear_token(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots.session = None;
        slots.persistent = None;
    }
}
