//! Supabase GoTrue client implementing [`IdentityProvider`].

use std::sync::{Arc, Mutex, PoisonError};

use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tokio::sync::broadcast;
use url::Url;

use super::{
    AuthConfigStatus, AuthError, AuthResult, AuthSession, AuthUser, RedirectKind, RedirectParams,
    SessionPersistence, SignUpOutcome, UserMetadata,
};
use crate::provider::{IdentityProvider, OAuthProvider, ProfileUpdate, ProviderEvent};
use crate::session::Session;
use crate::util::{compact_text, is_http_url, unix_timestamp_now};

const EVENT_CHANNEL_CAPACITY: usize = 16;

#[derive(Clone)]
pub struct SupabaseAuthClient<S: SessionPersistence> {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: S,
    current: Arc<Mutex<Option<AuthSession>>>,
    events: broadcast::Sender<ProviderEvent>,
    reset_redirect_url: Option<String>,
    oauth_redirect_url: Option<String>,
}

impl<S: SessionPersistence> SupabaseAuthClient<S> {
    pub fn new(url: impl AsRef<str>, anon_key: impl Into<String>, store: S) -> AuthResult<Self> {
        let auth_url = normalize_auth_url(url.as_ref())?;
        let anon_key = anon_key.into().trim().to_string();
        if anon_key.is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Supabase anon key must not be empty",
            ));
        }
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            auth_url,
            anon_key,
            client: Client::builder().build()?,
            store,
            current: Arc::new(Mutex::new(None)),
            events,
            reset_redirect_url: None,
            oauth_redirect_url: None,
        })
    }

    /// Where password-reset emails send the user (usually the game's deep link).
    #[must_use]
    pub fn with_reset_redirect(mut self, url: Option<String>) -> Self {
        self.reset_redirect_url = url;
        self
    }

    /// Where the OAuth consent screen returns the user.
    #[must_use]
    pub fn with_oauth_redirect(mut self, url: Option<String>) -> Self {
        self.oauth_redirect_url = url;
        self
    }

    pub async fn restore_session(&self) -> AuthResult<Option<AuthSession>> {
        let stored_session = match self.cached() {
            Some(session) => session,
            None => match self.store.load_session()? {
                Some(session) => session,
                None => return Ok(None),
            },
        };

        if !stored_session.is_expired() {
            self.remember(&stored_session);
            return Ok(Some(stored_session));
        }

        match self.refresh_session(&stored_session.refresh_token).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {}", error);
                self.forget()?;
                Ok(None)
            }
        }
    }

    pub async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Option<AuthSession>> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        match response.into_session()? {
            Some(session) => {
                self.adopt(&session)?;
                self.emit(ProviderEvent::SignedIn(Session::from(&session)));
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({
            "email": email,
            "password": password,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );

        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.adopt(&session)?;
        self.emit(ProviderEvent::SignedIn(Session::from(&session)));
        Ok(session)
    }

    pub async fn sign_in_anonymously(&self) -> AuthResult<AuthSession> {
        let payload = serde_json::json!({ "data": {} });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Guest sign-in response did not include an active session".to_string())
        })?;

        self.adopt(&session)?;
        self.emit(ProviderEvent::SignedIn(Session::from(&session)));
        Ok(session)
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> AuthResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({
            "refresh_token": refresh_token,
        });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            AuthError::Api("Refresh response did not include an active session".to_string())
        })?;

        self.adopt(&session)?;
        Ok(session)
    }

    pub async fn recover(&self, email: &str) -> AuthResult<()> {
        if email.trim().is_empty() {
            return Err(AuthError::Api("Email is required".to_string()));
        }

        let payload = serde_json::json!({ "email": email });
        let mut request = self
            .client
            .post(format!("{}/recover", self.auth_url))
            .json(&payload);
        if let Some(redirect_to) = &self.reset_redirect_url {
            request = request.query(&[("redirect_to", redirect_to)]);
        }

        let response = self.public_request(request).send().await?;
        ensure_success(response).await?;
        Ok(())
    }

    /// Store the session carried by an email-link or OAuth redirect and
    /// announce it to subscribers.
    pub async fn exchange_redirect(&self, redirect_url: &str) -> AuthResult<ProviderEvent> {
        let params = RedirectParams::parse(redirect_url)?;
        let user = self.fetch_user(&params.access_token).await?;
        let session = AuthSession {
            access_token: params.access_token,
            refresh_token: params.refresh_token,
            expires_at: params.expires_at,
            user,
        };
        self.adopt(&session)?;

        let snapshot = Session::from(&session);
        let event = if params.kind == RedirectKind::Recovery {
            ProviderEvent::PasswordRecovery {
                session: Some(snapshot),
            }
        } else {
            ProviderEvent::SignedIn(snapshot)
        };
        self.emit(event.clone());
        Ok(event)
    }

    pub async fn fetch_user(&self, access_token: &str) -> AuthResult<AuthUser> {
        let request = self
            .client
            .get(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json::<SupabaseUser>().await?.into())
    }

    pub async fn update_user(&self, payload: &serde_json::Value) -> AuthResult<AuthSession> {
        let session = self.active_session().await?;
        let request = self
            .client
            .put(format!("{}/user", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .json(payload);
        let response = ensure_success(request.send().await?).await?;
        let user: AuthUser = response.json::<SupabaseUser>().await?.into();

        let updated = AuthSession { user, ..session };
        self.adopt(&updated)?;
        Ok(updated)
    }

    /// Revoke the session remotely and clear it locally.
    ///
    /// Local state is always cleared; a remote failure is returned afterwards.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let stored = match self.cached() {
            Some(session) => Some(session),
            None => self.store.load_session()?,
        };
        let remote = match stored {
            Some(session) => self.revoke(&session.access_token).await,
            None => Ok(()),
        };

        self.forget()?;
        self.emit(ProviderEvent::SignedOut);
        remote
    }

    pub async fn verify_configuration(&self) -> AuthResult<AuthConfigStatus> {
        let request = self.public_request(
            self.client
                .get(format!("{}/settings", self.auth_url))
                .header("Accept", "application/json"),
        );
        let response = ensure_success(request.send().await?).await?;
        let payload = response.json::<SupabaseSettingsResponse>().await?;
        Ok(payload.into())
    }

    pub fn authorize_url(&self, provider: OAuthProvider) -> AuthResult<String> {
        let mut url = Url::parse(&format!("{}/authorize", self.auth_url))
            .map_err(|_| AuthError::InvalidConfiguration("Supabase URL is not a valid URL"))?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("provider", provider.as_str());
            if let Some(redirect_to) = &self.oauth_redirect_url {
                query.append_pair("redirect_to", redirect_to);
            }
        }
        Ok(url.into())
    }

    async fn revoke(&self, access_token: &str) -> AuthResult<()> {
        let request = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);

        let response = request.send().await?;
        if !(response.status().is_success() || response.status() == StatusCode::UNAUTHORIZED) {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }

    async fn active_session(&self) -> AuthResult<AuthSession> {
        self.restore_session().await?.ok_or(AuthError::NotSignedIn)
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> AuthResult<SupabaseAuthResponse> {
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json::<SupabaseAuthResponse>().await?)
    }

    fn cached(&self) -> Option<AuthSession> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn remember(&self, session: &AuthSession) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
    }

    fn adopt(&self, session: &AuthSession) -> AuthResult<()> {
        self.store.save_session(session)?;
        self.remember(session);
        Ok(())
    }

    fn forget(&self) -> AuthResult<()> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.store.clear_session()
    }

    fn emit(&self, event: ProviderEvent) {
        // No subscribers is fine; the event is only advisory for them.
        let _ = self.events.send(event);
    }
}

impl<S: SessionPersistence> IdentityProvider for SupabaseAuthClient<S> {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.restore_session().await?.as_ref().map(Session::from))
    }

    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self.sign_in(email, password).await?;
        Ok(Session::from(&session))
    }

    async fn register(&self, email: &str, password: &str) -> AuthResult<SignUpOutcome> {
        Ok(match self.sign_up(email, password).await? {
            Some(session) => SignUpOutcome::SignedIn(Session::from(&session)),
            None => SignUpOutcome::ConfirmationRequired,
        })
    }

    async fn sign_in_anonymously(&self) -> AuthResult<Session> {
        let session = Self::sign_in_anonymously(self).await?;
        Ok(Session::from(&session))
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        self.recover(email).await
    }

    async fn set_password(&self, new_password: &str) -> AuthResult<()> {
        if new_password.trim().is_empty() {
            return Err(AuthError::Api("Password is required".to_string()));
        }
        self.update_user(&serde_json::json!({ "password": new_password }))
            .await?;
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> AuthResult<Session> {
        let payload = serde_json::json!({
            "data": {
                "full_name": update.display_name,
                "avatar_url": update.avatar_url,
            }
        });
        let session = self.update_user(&payload).await?;
        Ok(Session::from(&session))
    }

    async fn sign_out(&self) -> AuthResult<()> {
        Self::sign_out(self).await
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider) -> AuthResult<String> {
        self.authorize_url(provider)
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

pub fn normalize_auth_url(url: &str) -> AuthResult<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must not be empty",
        ));
    }
    if !is_http_url(trimmed) {
        return Err(AuthError::InvalidConfiguration(
            "Supabase URL must include http:// or https://",
        ));
    }
    if trimmed.ends_with("/auth/v1") {
        Ok(trimmed.to_string())
    } else {
        Ok(format!("{trimmed}/auth/v1"))
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(AuthError::Api("Password is required".to_string()));
    }
    Ok(())
}

async fn ensure_success(response: Response) -> AuthResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Api(parse_api_error(status, &body)))
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
    session: Option<SupabaseAuthResponseSession>,
    /// Present when sign-up returns the bare user (email confirmation pending).
    id: Option<String>,
}

impl SupabaseAuthResponse {
    fn into_session(self) -> AuthResult<Option<AuthSession>> {
        let nested_session = self.session;
        let access_token = self.access_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.access_token.clone())
        });
        let refresh_token = self.refresh_token.or_else(|| {
            nested_session
                .as_ref()
                .and_then(|session| session.refresh_token.clone())
        });
        let expires_at = self
            .expires_at
            .or_else(|| {
                nested_session
                    .as_ref()
                    .and_then(|session| session.expires_at)
            })
            .or_else(|| {
                self.expires_in
                    .or_else(|| {
                        nested_session
                            .as_ref()
                            .and_then(|session| session.expires_in)
                    })
                    .map(|expires_in| unix_timestamp_now().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested_session.and_then(|session| session.user))
            .map(AuthUser::from);
        let bare_user = self.id.is_some();

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            (None, None, None, None) if bare_user => Ok(None),
            _ => Err(AuthError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseAuthResponseSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<SupabaseUser>,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Option<SupabaseUserMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct SupabaseUserMetadata {
    full_name: Option<String>,
    name: Option<String>,
    avatar_url: Option<String>,
    picture: Option<String>,
}

impl From<SupabaseUser> for AuthUser {
    fn from(value: SupabaseUser) -> Self {
        let metadata = value.user_metadata.unwrap_or_default();
        Self {
            id: value.id,
            // Anonymous users come back with an empty string.
            email: value.email.filter(|email| !email.trim().is_empty()),
            metadata: UserMetadata {
                full_name: metadata.full_name.or(metadata.name),
                avatar_url: metadata.avatar_url.or(metadata.picture),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseSettingsResponse {
    external: Option<SupabaseSettingsExternal>,
    disable_signup: Option<bool>,
    mailer_autoconfirm: Option<bool>,
    rate_limit_email_sent: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SupabaseSettingsExternal {
    email: Option<bool>,
    anonymous_users: Option<bool>,
}

impl From<SupabaseSettingsResponse> for AuthConfigStatus {
    fn from(value: SupabaseSettingsResponse) -> Self {
        let external = value.external;
        Self {
            email_enabled: external.as_ref().and_then(|cfg| cfg.email).unwrap_or(false),
            signup_enabled: !value.disable_signup.unwrap_or(true),
            anonymous_enabled: external
                .as_ref()
                .and_then(|cfg| cfg.anonymous_users)
                .unwrap_or(false),
            mailer_autoconfirm: value.mailer_autoconfirm.unwrap_or(false),
            rate_limit_email_sent: value.rate_limit_email_sent,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SupabaseErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
    message: Option<String>,
    msg: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<SupabaseErrorResponse>(body) {
        if let Some(message) = payload
            .message
            .or(payload.msg)
            .or(payload.error_description)
            .or(payload.error)
        {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}
