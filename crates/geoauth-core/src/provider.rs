//! Identity provider contract consumed by the auth controller.
//!
//! The controller only talks to this trait, so the Supabase client can be
//! swapped for a test double.

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::sync::broadcast;

use crate::auth::{AuthResult, SignUpOutcome};
use crate::session::Session;

/// Session changes pushed by the provider outside of a local action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    SignedIn(Session),
    SignedOut,
    /// The user opened a password-recovery link. The provider is signed in
    /// with a short-lived recovery session until the new password is set.
    PasswordRecovery { session: Option<Session> },
}

/// Fields saved from the edit-profile screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Github => "github",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            "github" => Ok(Self::Github),
            other => Err(format!(
                "unsupported OAuth provider '{other}' (expected google or github)"
            )),
        }
    }
}

pub trait IdentityProvider: Send + Sync {
    /// Session the provider currently holds, restoring it from storage if needed.
    fn current_session(&self) -> impl Future<Output = AuthResult<Option<Session>>> + Send;

    fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<Session>> + Send;

    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = AuthResult<SignUpOutcome>> + Send;

    fn sign_in_anonymously(&self) -> impl Future<Output = AuthResult<Session>> + Send;

    fn request_password_reset(&self, email: &str) -> impl Future<Output = AuthResult<()>> + Send;

    /// Set a new password for the signed-in (or recovering) user.
    fn set_password(&self, new_password: &str) -> impl Future<Output = AuthResult<()>> + Send;

    /// Save profile fields and return the refreshed session snapshot.
    fn update_profile(
        &self,
        update: &ProfileUpdate,
    ) -> impl Future<Output = AuthResult<Session>> + Send;

    /// Ends the session. Local state is cleared even when this returns an error.
    fn sign_out(&self) -> impl Future<Output = AuthResult<()>> + Send;

    fn oauth_authorize_url(&self, provider: OAuthProvider) -> AuthResult<String>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}
