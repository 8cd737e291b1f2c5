//! Parsing of the redirect URL GoTrue sends users back to after an email
//! link or OAuth consent screen.
//!
//! Tokens arrive in the URL fragment (`#access_token=...&type=recovery`).
//! Some mobile deep-link handlers move them into the query string, so the
//! query is used when the fragment is empty.

use url::Url;

use super::{AuthError, AuthResult};
use crate::util::unix_timestamp_now;

/// What the redirect link was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    Recovery,
    SignUp,
    MagicLink,
    OAuth,
}

impl RedirectKind {
    fn from_type(value: Option<&str>) -> Self {
        match value {
            Some("recovery") => Self::Recovery,
            Some("signup" | "invite" | "email_change") => Self::SignUp,
            Some("magiclink") => Self::MagicLink,
            _ => Self::OAuth,
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct RedirectParams {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub kind: RedirectKind,
}

impl std::fmt::Debug for RedirectParams {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("RedirectParams")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("kind", &self.kind)
            .finish()
    }
}

impl RedirectParams {
    pub fn parse(redirect_url: &str) -> AuthResult<Self> {
        let url = Url::parse(redirect_url.trim())
            .map_err(|_| AuthError::InvalidConfiguration("Redirect URL is not a valid URL"))?;
        let raw = match url.fragment() {
            Some(fragment) if !fragment.is_empty() => fragment.to_string(),
            _ => url.query().unwrap_or_default().to_string(),
        };

        let mut access_token = None;
        let mut refresh_token = None;
        let mut expires_at = None;
        let mut expires_in = None;
        let mut kind = None;
        let mut error = None;
        let mut error_description = None;

        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            let value = value.into_owned();
            match key.as_ref() {
                "access_token" => access_token = Some(value),
                "refresh_token" => refresh_token = Some(value),
                "expires_at" => expires_at = value.parse::<i64>().ok(),
                "expires_in" => expires_in = value.parse::<i64>().ok(),
                "type" => kind = Some(value),
                "error" => error = Some(value),
                "error_description" => error_description = Some(value),
                _ => {}
            }
        }

        if let Some(message) = error_description.or(error) {
            return Err(AuthError::Api(message));
        }

        let (Some(access_token), Some(refresh_token)) = (access_token, refresh_token) else {
            return Err(AuthError::Api(
                "Redirect link did not include session tokens".to_string(),
            ));
        };
        let expires_at = expires_at
            .or_else(|| expires_in.map(|secs| unix_timestamp_now().saturating_add(secs)))
            .ok_or_else(|| AuthError::Api("Redirect link did not include an expiry".to_string()))?;

        Ok(Self {
            access_token,
            refresh_token,
            expires_at,
            kind: RedirectKind::from_type(kind.as_deref()),
        })
    }
}
