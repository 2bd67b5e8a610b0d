//! Authentication service.
//!
//! Credential validation sits behind the `Authenticator` trait and
//! yields a role; the service turns a validated identity into a
//! short-lived JWT and validates tokens on later requests. Role checks
//! are capability checks (`Role::can_approve`), not string comparisons
//! scattered through the routes.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Submitter,
    Approver,
    Admin,
}

impl Role {
    /// May act on pending forms (status transitions, deletion).
    pub fn can_approve(self) -> bool {
        matches!(self, Role::Approver | Role::Admin)
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "submitter" => Some(Role::Submitter),
            "approver" => Some(Role::Approver),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Submitter => "submitter",
            Role::Approver => "approver",
            Role::Admin => "admin",
        }
    }
}

/// Credential validation seam.
pub trait Authenticator: Send + Sync {
    fn authenticate(&self, username: &str, password: &str) -> Option<Role>;
}

/// Configuration-backed credential table.
#[derive(Default)]
pub struct StaticCredentials {
    entries: HashMap<String, (String, Role)>,
}

impl StaticCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `user:password:role[,user:password:role...]` spec, as
    /// carried by the APP_CREDENTIALS environment variable. Malformed
    /// entries are skipped with a warning.
    pub fn from_spec(spec: &str) -> Self {
        let mut entries = HashMap::new();
        for entry in spec.split(',').filter(|e| !e.trim().is_empty()) {
            let mut parts = entry.trim().splitn(3, ':');
            match (parts.next(), parts.next(), parts.next().and_then(Role::parse)) {
                (Some(user), Some(password), Some(role)) if !user.is_empty() => {
                    entries.insert(user.to_string(), (password.to_string(), role));
                }
                _ => warn!(entry = %entry, "Skipping malformed credential entry"),
            }
        }
        Self { entries }
    }

    pub fn with_user(mut self, username: &str, password: &str, role: Role) -> Self {
        self.entries
            .insert(username.to_string(), (password.to_string(), role));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Authenticator for StaticCredentials {
    fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        self.entries
            .get(username)
            .filter(|(stored, _)| stored == password)
            .map(|(_, role)| *role)
    }
}

/// JWT claims carried by an issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub role: Role,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid token: {0}")]
    InvalidToken(String),
}

/// Authentication service: injected credential validation plus token
/// issue/validation.
pub struct AuthService {
    authenticator: Arc<dyn Authenticator>,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_duration: Duration,
}

impl AuthService {
    pub fn new(authenticator: Arc<dyn Authenticator>, secret: &str) -> Self {
        Self {
            authenticator,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_duration: Duration::hours(8),
        }
    }

    /// Validate credentials and issue a token for the resulting role.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, Role), AuthError> {
        let role = self
            .authenticator
            .authenticate(username, password)
            .ok_or(AuthError::InvalidCredentials)?;

        let now = Utc::now();
        let claims = Claims {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.token_duration).timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Ok((token, role))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    /// Extract the token from an `Authorization: Bearer ...` header value.
    pub fn extract_bearer_token(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ").map(str::trim)
    }
}
