//! Supabase client wiring with secure keychain persistence.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, OnceLock};

#[cfg(not(test))]
use keyring::Entry;

use geoauth_core::auth::{
    AuthError, AuthResult, AuthSession, SessionPersistence, SupabaseAuthClient,
};
use geoauth_core::config::AuthConfig;

#[cfg(not(test))]
const KEYRING_SERVICE_NAME: &str = "geoauth-cli";

pub type CliAuthClient = SupabaseAuthClient<SessionStore>;

/// One keychain entry per CLI profile.
#[derive(Clone)]
pub struct SessionStore {
    username: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            username: format!("supabase_session:{profile_name}"),
        }
    }

    #[cfg(test)]
    fn test_store() -> &'static Mutex<HashMap<String, String>> {
        static STORE: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        STORE.get_or_init(|| Mutex::new(HashMap::new()))
    }

    #[cfg(not(test))]
    fn entry(&self) -> AuthResult<Entry> {
        Entry::new(KEYRING_SERVICE_NAME, &self.username)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }
}

impl SessionPersistence for SessionStore {
    #[cfg(not(test))]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let entry = self.entry()?;
        match entry.get_password() {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn load_session(&self) -> AuthResult<Option<AuthSession>> {
        let guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard
            .get(&self.username)
            .map(|raw| serde_json::from_str(raw))
            .transpose()
            .map_err(AuthError::from)
    }

    #[cfg(not(test))]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        self.entry()?
            .set_password(&raw)
            .map_err(|error| AuthError::SecureStorage(error.to_string()))
    }

    #[cfg(test)]
    fn save_session(&self, session: &AuthSession) -> AuthResult<()> {
        let raw = serde_json::to_string(session)?;
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.insert(self.username.clone(), raw);
        Ok(())
    }

    #[cfg(not(test))]
    fn clear_session(&self) -> AuthResult<()> {
        let entry = self.entry()?;
        match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(AuthError::SecureStorage(error.to_string())),
        }
    }

    #[cfg(test)]
    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = Self::test_store()
            .lock()
            .map_err(|error| AuthError::SecureStorage(error.to_string()))?;
        guard.remove(&self.username);
        Ok(())
    }
}

/// Build the profile's Supabase client. `None` when Supabase is not configured.
pub fn client_for_profile(
    profile_name: &str,
    config: &AuthConfig,
) -> AuthResult<Option<CliAuthClient>> {
    let Some((url, anon_key)) = config.supabase()? else {
        return Ok(None);
    };

    let client = SupabaseAuthClient::new(url, anon_key, SessionStore::new(profile_name))?
        .with_reset_redirect(config.reset_redirect_url.clone())
        .with_oauth_redirect(config.oauth_redirect_url.clone());
    Ok(Some(client))
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use geoauth_core::auth::{AuthUser, UserMetadata};
    use pretty_assertions::assert_eq;

    use super::*;

    fn sample_session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: 4_102_444_800,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("kerem@example.com".to_string()),
                metadata: UserMetadata::default(),
            },
        }
    }

    #[test]
    fn session_store_is_scoped_per_profile() {
        let work = SessionStore::new("store-test-work");
        let home = SessionStore::new("store-test-home");
        work.save_session(&sample_session()).unwrap();

        assert_eq!(work.load_session().unwrap(), Some(sample_session()));
        assert_eq!(home.load_session().unwrap(), None);

        clear_stored_session("store-test-work").unwrap();
        assert_eq!(work.load_session().unwrap(), None);
    }

    #[test]
    fn client_for_profile_requires_both_supabase_values() {
        let unconfigured = client_for_profile("default", &AuthConfig::default()).unwrap();
        assert!(unconfigured.is_none());

        let half = AuthConfig {
            supabase_url: Some("https://project.supabase.co".to_string()),
            ..AuthConfig::default()
        };
        assert!(matches!(
            client_for_profile("default", &half),
            Err(AuthError::NotConfigured)
        ));

        let full = AuthConfig {
            supabase_anon_key: Some("anon".to_string()),
            ..half
        };
        assert!(client_for_profile("default", &full).unwrap().is_some());
    }
}
