//! In-memory provider and notifier doubles for controller tests.

use std::sync::{Arc, Mutex};

use tokio::sync::broadcast;

use crate::auth::{AuthError, AuthResult, SignUpOutcome};
use crate::notify::{NotificationError, SessionNotifier};
use crate::provider::{IdentityProvider, OAuthProvider, ProfileUpdate, ProviderEvent};
use crate::session::{placeholder_avatar_url, Session};

pub fn sample_session(id: &str) -> Session {
    Session {
        id: id.to_string(),
        display_name: id.to_string(),
        email: Some(format!("{id}@example.com")),
        profile_picture: placeholder_avatar_url(id),
        access_token: Some(format!("{id}-access")),
        refresh_token: Some(format!("{id}-refresh")),
    }
}

/// Provider double that accepts one known password and records every call.
#[derive(Clone)]
pub struct FakeProvider {
    password: String,
    session: Arc<Mutex<Option<Session>>>,
    calls: Arc<Mutex<Vec<String>>>,
    sign_up_requires_confirmation: bool,
    fail_sign_out: bool,
    events: broadcast::Sender<ProviderEvent>,
}

impl FakeProvider {
    pub fn new(password: &str) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            password: password.to_string(),
            session: Arc::new(Mutex::new(None)),
            calls: Arc::new(Mutex::new(Vec::new())),
            sign_up_requires_confirmation: false,
            fail_sign_out: false,
            events,
        }
    }

    pub fn signed_in(self, session: Session) -> Self {
        *self.session.lock().unwrap() = Some(session);
        self
    }

    pub fn requiring_confirmation(mut self) -> Self {
        self.sign_up_requires_confirmation = true;
        self
    }

    pub fn failing_sign_out(mut self) -> Self {
        self.fail_sign_out = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn emit(&self, event: ProviderEvent) {
        let _ = self.events.send(event);
    }

    fn record(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }

    fn establish(&self, id: &str) -> Session {
        let session = sample_session(id);
        *self.session.lock().unwrap() = Some(session.clone());
        self.emit(ProviderEvent::SignedIn(session.clone()));
        session
    }
}

impl IdentityProvider for FakeProvider {
    async fn current_session(&self) -> AuthResult<Option<Session>> {
        Ok(self.session.lock().unwrap().clone())
    }

    async fn authenticate(&self, email: &str, password: &str) -> AuthResult<Session> {
        self.record("authenticate");
        if password != self.password {
            return Err(AuthError::Api("Invalid login credentials (400)".to_string()));
        }
        Ok(self.establish(email.split('@').next().unwrap_or(email)))
    }

    async fn register(&self, email: &str, _password: &str) -> AuthResult<SignUpOutcome> {
        self.record("register");
        if self.sign_up_requires_confirmation {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        Ok(SignUpOutcome::SignedIn(
            self.establish(email.split('@').next().unwrap_or(email)),
        ))
    }

    async fn sign_in_anonymously(&self) -> AuthResult<Session> {
        self.record("sign_in_anonymously");
        Ok(self.establish("guest"))
    }

    async fn request_password_reset(&self, email: &str) -> AuthResult<()> {
        self.record("request_password_reset");
        if email.contains('@') {
            Ok(())
        } else {
            Err(AuthError::Api(
                "Unable to validate email address: invalid format (400)".to_string(),
            ))
        }
    }

    async fn set_password(&self, _new_password: &str) -> AuthResult<()> {
        self.record("set_password");
        if self.session.lock().unwrap().is_none() {
            return Err(AuthError::NotSignedIn);
        }
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> AuthResult<Session> {
        self.record("update_profile");
        let mut guard = self.session.lock().unwrap();
        let session = guard.as_mut().ok_or(AuthError::NotSignedIn)?;
        session.display_name.clone_from(&update.display_name);
        if let Some(url) = &update.avatar_url {
            session.profile_picture.clone_from(url);
        }
        Ok(session.clone())
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.record("sign_out");
        self.session.lock().unwrap().take();
        self.emit(ProviderEvent::SignedOut);
        if self.fail_sign_out {
            return Err(AuthError::Api("HTTP 502".to_string()));
        }
        Ok(())
    }

    fn oauth_authorize_url(&self, provider: OAuthProvider) -> AuthResult<String> {
        Ok(format!("https://demo.supabase.co/auth/v1/authorize?provider={provider}"))
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        self.events.subscribe()
    }
}

/// Notifier double that keeps every delivered snapshot.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    delivered: Arc<Mutex<Vec<Session>>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn delivered(&self) -> Vec<Session> {
        self.delivered.lock().unwrap().clone()
    }
}

impl SessionNotifier for RecordingNotifier {
    async fn notify(&self, session: &Session) -> Result<(), NotificationError> {
        self.delivered.lock().unwrap().push(session.clone());
        if self.failing {
            return Err(NotificationError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(())
    }
}
