//! Runtime configuration for the auth flow.
//!
//! Provides `AuthConfig`, the set of public endpoints and keys needed to
//! reach Supabase Auth and the login callback. Secret credentials must never
//! be stored here; the anon key is public by design of Supabase.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{AuthError, AuthResult};
use crate::notify::DEFAULT_CALLBACK_TIMEOUT_SECS;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

pub const ENV_SUPABASE_URL: &str = "SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "SUPABASE_ANON_KEY";
pub const ENV_CALLBACK_URL: &str = "GEOAUTH_CALLBACK_URL";
pub const ENV_RESET_REDIRECT_URL: &str = "GEOAUTH_RESET_REDIRECT_URL";
pub const ENV_OAUTH_REDIRECT_URL: &str = "GEOAUTH_OAUTH_REDIRECT_URL";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    #[serde(default)]
    pub supabase_url: Option<String>,
    #[serde(default)]
    pub supabase_anon_key: Option<String>,
    /// Endpoint that receives the session snapshot after sign-in.
    #[serde(default)]
    pub callback_url: Option<String>,
    /// Link target for password-reset emails, e.g. the game's deep link.
    #[serde(default)]
    pub reset_redirect_url: Option<String>,
    #[serde(default)]
    pub oauth_redirect_url: Option<String>,
    #[serde(default)]
    pub callback_timeout_secs: Option<u64>,
}

impl AuthConfig {
    /// Read every field from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self {
            supabase_url: lookup(ENV_SUPABASE_URL),
            supabase_anon_key: lookup(ENV_SUPABASE_ANON_KEY),
            callback_url: lookup(ENV_CALLBACK_URL),
            reset_redirect_url: lookup(ENV_RESET_REDIRECT_URL),
            oauth_redirect_url: lookup(ENV_OAUTH_REDIRECT_URL),
            callback_timeout_secs: None,
        };
        config.normalize();
        config
    }

    /// Fill fields that are unset here from `fallback`.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        let mut merged = Self {
            supabase_url: self.supabase_url.or(fallback.supabase_url),
            supabase_anon_key: self.supabase_anon_key.or(fallback.supabase_anon_key),
            callback_url: self.callback_url.or(fallback.callback_url),
            reset_redirect_url: self.reset_redirect_url.or(fallback.reset_redirect_url),
            oauth_redirect_url: self.oauth_redirect_url.or(fallback.oauth_redirect_url),
            callback_timeout_secs: self.callback_timeout_secs.or(fallback.callback_timeout_secs),
        };
        merged.normalize();
        merged
    }

    pub fn normalize(&mut self) {
        self.supabase_url = normalize_url_option(self.supabase_url.take());
        self.supabase_anon_key = normalize_text_option(self.supabase_anon_key.take());
        self.callback_url = normalize_url_option(self.callback_url.take());
        self.reset_redirect_url = normalize_text_option(self.reset_redirect_url.take());
        self.oauth_redirect_url = normalize_text_option(self.oauth_redirect_url.take());
    }

    /// Check that present values are well-formed.
    pub fn validate(&self) -> Result<()> {
        if let Some(url) = &self.supabase_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "supabase_url must include http:// or https://".to_string(),
                ));
            }
        }
        if let Some(url) = &self.callback_url {
            if !is_http_url(url) {
                return Err(Error::Config(
                    "callback_url must include http:// or https://".to_string(),
                ));
            }
        }
        if self.callback_timeout_secs == Some(0) {
            return Err(Error::Config(
                "callback_timeout_secs must be greater than zero".to_string(),
            ));
        }
        resolve_optional_supabase_config(
            self.supabase_url.clone(),
            self.supabase_anon_key.clone(),
        )
        .map_err(|error| Error::Config(error.to_string()))?;
        Ok(())
    }

    /// Supabase URL and anon key, when both are configured.
    pub fn supabase(&self) -> AuthResult<Option<(String, String)>> {
        resolve_optional_supabase_config(self.supabase_url.clone(), self.supabase_anon_key.clone())
    }

    pub fn callback_timeout(&self) -> Duration {
        Duration::from_secs(
            self.callback_timeout_secs
                .unwrap_or(DEFAULT_CALLBACK_TIMEOUT_SECS),
        )
    }
}

/// Supabase URL and key must be set together or not at all.
pub fn resolve_optional_supabase_config(
    url: Option<String>,
    anon_key: Option<String>,
) -> AuthResult<Option<(String, String)>> {
    let url = normalize_text_option(url);
    let anon_key = normalize_text_option(anon_key);

    match (url, anon_key) {
        (None, None) => Ok(None),
        (Some(url), Some(anon_key)) => Ok(Some((url, anon_key))),
        _ => Err(AuthError::NotConfigured),
    }
}

fn normalize_url_option(value: Option<String>) -> Option<String> {
    normalize_text_option(value).map(|url| url.trim_end_matches('/').to_string())
}
