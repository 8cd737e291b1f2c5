//! Session snapshot mirrored from the identity provider.
//!
//! The controller never owns credentials. It holds whatever snapshot the
//! provider last reported and forwards it to the login callback.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthSession, AuthUser};
use crate::util::{email_local_part, normalize_text_option};

const FALLBACK_DISPLAY_NAME: &str = "User";
const AVATAR_PLACEHOLDER_BASE: &str = "https://api.dicebear.com/8.x/initials/svg";

/// Authenticated user as shown on the dashboard and sent to the callback.
///
/// Serializes with the keys the callback endpoint expects:
/// `uid`, `displayName`, `email`, `profilePicture`, `accessToken`, `refreshToken`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "uid")]
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
    pub profile_picture: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Session {
    /// Build a snapshot from a provider user, deriving display fields.
    pub fn from_user(user: &AuthUser) -> Self {
        let display_name = normalize_text_option(user.metadata.full_name.clone())
            .or_else(|| {
                user.email
                    .as_deref()
                    .and_then(email_local_part)
                    .map(ToString::to_string)
            })
            .unwrap_or_else(|| FALLBACK_DISPLAY_NAME.to_string());
        let profile_picture = normalize_text_option(user.metadata.avatar_url.clone())
            .unwrap_or_else(|| placeholder_avatar_url(&user.id));

        Self {
            id: user.id.clone(),
            display_name,
            email: user.email.clone(),
            profile_picture,
            access_token: None,
            refresh_token: None,
        }
    }

    #[must_use]
    pub fn with_tokens(mut self, access_token: &str, refresh_token: &str) -> Self {
        self.access_token = Some(access_token.to_string());
        self.refresh_token = Some(refresh_token.to_string());
        self
    }

    /// The provider's own picture, or `None` when showing the generated placeholder.
    pub fn custom_avatar(&self) -> Option<&str> {
        (self.profile_picture != placeholder_avatar_url(&self.id))
            .then_some(self.profile_picture.as_str())
    }

    /// Pretty JSON of the form `{ "user": <session> }` for handing to the game client.
    pub fn export_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&serde_json::json!({ "user": self }))
    }
}

impl From<&AuthSession> for Session {
    fn from(session: &AuthSession) -> Self {
        Self::from_user(&session.user).with_tokens(&session.access_token, &session.refresh_token)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |token: &Option<String>| token.as_ref().map(|_| "[REDACTED]");
        formatter
            .debug_struct("Session")
            .field("id", &self.id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("profile_picture", &self.profile_picture)
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .finish()
    }
}

/// Generated initials avatar used when the provider has no picture.
pub fn placeholder_avatar_url(seed: &str) -> String {
    format!(
        "{AVATAR_PLACEHOLDER_BASE}?seed={}",
        urlencoding::encode(seed)
    )
}
