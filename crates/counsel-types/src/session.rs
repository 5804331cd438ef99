use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserProfile;

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Access credential issued by the backend (or the mock directory).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub access_token: String,
    pub token_type: String,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: DEFAULT_TOKEN_TYPE.to_string(),
            expires_at: None,
            refresh_token: None,
        }
    }

    pub fn expiring_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }

    /// Value for the `Authorization` header.
    pub fn authorization(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Client-side record of who is signed in.
///
/// A user is present exactly when a credential is; the enum makes the
/// half-authenticated state unrepresentable.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated {
        credential: Credential,
        user: UserProfile,
    },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            Session::Anonymous => None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        match self {
            Session::Authenticated { credential, .. } => Some(credential),
            Session::Anonymous => None,
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.credential().map(|c| c.access_token.as_str())
    }
}

/// Payload of a successful `/auth/login`, `/auth/register` or `/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Seconds until the access token expires
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub user_info: Option<UserProfile>,
}

/// `now + ttl_ms`, or `None` when that is not a representable instant.
pub fn expiry_after_ms(now: DateTime<Utc>, ttl_ms: u64) -> Option<DateTime<Utc>> {
    let ttl = Duration::try_milliseconds(i64::try_from(ttl_ms).ok()?)?;
    now.checked_add_signed(ttl)
}

fn default_token_type() -> String {
    DEFAULT_TOKEN_TYPE.to_string()
}

impl AuthGrant {
    /// Build the credential, using `fallback_ttl_ms` when the server gave no
    /// `expiresIn`. A lifetime past the end of the calendar never expires.
    pub fn credential(&self, now: DateTime<Utc>, fallback_ttl_ms: u64) -> Credential {
        let expires_at = match self.expires_in {
            Some(secs) if secs > 0 => {
                Duration::try_seconds(secs).and_then(|ttl| now.checked_add_signed(ttl))
            }
            _ => expiry_after_ms(now, fallback_ttl_ms),
        };
        Credential {
            access_token: self.access_token.clone(),
            token_type: self.token_type.clone(),
            expires_at,
            refresh_token: self.refresh_token.clone(),
        }
    }
}
