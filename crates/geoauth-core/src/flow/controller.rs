use std::collections::VecDeque;

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

use super::error::FlowError;
use super::notice::Notice;
use super::state::{AuthState, Completion, Effect, Message, ProviderCall, UserAction};
use super::view::Operation;
use crate::auth::AuthResult;
use crate::notify::SessionNotifier;
use crate::provider::{IdentityProvider, ProviderEvent};
use crate::session::Session;

/// What the UI has to show or do after a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    Notice(Notice),
    /// Send the user to the OAuth consent screen.
    OpenUrl(String),
    Export(String),
}

/// Runs the reducer against a real provider and notifier.
pub struct AuthController<P: IdentityProvider, N: SessionNotifier> {
    provider: P,
    notifier: N,
    state: AuthState,
    events: broadcast::Receiver<ProviderEvent>,
    outbox: Vec<Output>,
}

impl<P: IdentityProvider, N: SessionNotifier> AuthController<P, N> {
    pub fn new(provider: P, notifier: N) -> Self {
        let events = provider.subscribe();
        Self {
            provider,
            notifier,
            state: AuthState::default(),
            events,
            outbox: Vec::new(),
        }
    }

    pub const fn state(&self) -> &AuthState {
        &self.state
    }

    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Drain notices, URLs and exports produced since the last call.
    pub fn take_output(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.outbox)
    }

    /// Ask the provider for an existing session and pick the first screen.
    pub async fn start(&mut self) -> Result<(), FlowError> {
        let session = self.provider.current_session().await?;
        tracing::debug!(signed_in = session.is_some(), "auth controller started");
        let effects = self.state.reduce(Message::Started(session))?;
        self.run(effects).await
    }

    /// Like [`Self::start`], without announcing a restored session to the callback.
    pub async fn resume(&mut self) -> Result<(), FlowError> {
        let session = self.provider.current_session().await?;
        self.state = AuthState::initial(session);
        Ok(())
    }

    /// Apply a user action and run the provider call it triggers to completion.
    ///
    /// Provider failures are also queued as error notices. When the action
    /// produces a session for the login callback, the POST is awaited here, so
    /// a slow endpoint can hold this call for up to the notifier's timeout
    /// (`callback_timeout_secs`, 5 s by default).
    pub async fn dispatch(&mut self, action: UserAction) -> Result<(), FlowError> {
        let effects = self.state.reduce(Message::Action(action))?;
        self.run(effects).await
    }

    /// Apply every provider event received so far. Returns how many were applied.
    pub async fn pump_events(&mut self) -> usize {
        let mut applied = 0;
        loop {
            match self.events.try_recv() {
                Ok(event) => {
                    self.observe(event).await;
                    applied += 1;
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {skipped} provider events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => return applied,
            }
        }
    }

    /// Wait for the next provider event and apply it.
    ///
    /// Returns `false` once the provider's event stream has closed.
    pub async fn next_event(&mut self) -> bool {
        loop {
            match self.events.recv().await {
                Ok(event) => {
                    self.observe(event).await;
                    return true;
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {skipped} provider events");
                }
                Err(RecvError::Closed) => return false,
            }
        }
    }

    async fn observe(&mut self, event: ProviderEvent) {
        tracing::debug!(?event, "provider event");
        match self.state.reduce(Message::Provider(event)) {
            Ok(effects) => {
                if let Err(error) = self.run(effects).await {
                    tracing::warn!("Provider event follow-up failed: {error}");
                }
            }
            Err(error) => tracing::warn!("Provider event rejected: {error}"),
        }
    }

    async fn run(&mut self, effects: Vec<Effect>) -> Result<(), FlowError> {
        let mut queue = VecDeque::from(effects);
        let mut failure = None;

        while let Some(effect) = queue.pop_front() {
            match effect {
                Effect::Call { operation, call } => {
                    let message = match self.execute(call).await {
                        Ok(completion) => {
                            tracing::info!(operation = %operation, "auth operation completed");
                            Message::Completed {
                                operation,
                                completion,
                            }
                        }
                        Err(error) => {
                            tracing::info!(operation = %operation, "auth operation failed: {error}");
                            let message = Message::Failed {
                                operation,
                                message: error.to_string(),
                            };
                            if operation != Operation::SignOut {
                                failure = Some(error);
                            }
                            message
                        }
                    };
                    queue.extend(self.state.reduce(message)?);
                }
                Effect::Notify(session) => self.notify(&session).await,
                Effect::Authorize(provider) => match self.provider.oauth_authorize_url(provider) {
                    Ok(url) => self.outbox.push(Output::OpenUrl(url)),
                    Err(error) => {
                        self.outbox.push(Output::Notice(Notice::error(error.to_string())));
                        failure = Some(error);
                    }
                },
                Effect::Show(notice) => self.outbox.push(Output::Notice(notice)),
                Effect::Export(json) => self.outbox.push(Output::Export(json)),
            }
        }

        // Events the call itself caused are applied before returning.
        self.drain_pending().await;
        failure.map_or(Ok(()), |error| Err(FlowError::Provider(error)))
    }

    async fn drain_pending(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match self.state.reduce(Message::Provider(event)) {
                Ok(effects) => {
                    for effect in effects {
                        match effect {
                            Effect::Notify(session) => self.notify(&session).await,
                            Effect::Show(notice) => self.outbox.push(Output::Notice(notice)),
                            other => tracing::debug!(?other, "ignoring effect from provider event"),
                        }
                    }
                }
                Err(error) => tracing::warn!("Provider event rejected: {error}"),
            }
        }
    }

    async fn execute(&self, call: ProviderCall) -> AuthResult<Completion> {
        tracing::debug!(?call, "calling identity provider");
        match call {
            ProviderCall::Authenticate { email, password } => self
                .provider
                .authenticate(&email, &password)
                .await
                .map(Completion::SignedIn),
            ProviderCall::Register { email, password } => self
                .provider
                .register(&email, &password)
                .await
                .map(Completion::Registered),
            ProviderCall::SignInAnonymously => self
                .provider
                .sign_in_anonymously()
                .await
                .map(Completion::SignedIn),
            ProviderCall::RequestPasswordReset { email } => self
                .provider
                .request_password_reset(&email)
                .await
                .map(|()| Completion::ResetRequested),
            ProviderCall::SetPassword { new_password } => self
                .provider
                .set_password(&new_password)
                .await
                .map(|()| Completion::PasswordSet),
            ProviderCall::UpdateProfile(update) => self
                .provider
                .update_profile(&update)
                .await
                .map(Completion::ProfileSaved),
            ProviderCall::SignOut => self
                .provider
                .sign_out()
                .await
                .map(|()| Completion::SignedOut),
        }
    }

    async fn notify(&self, session: &Session) {
        if let Err(error) = self.notifier.notify(session).await {
            tracing::warn!(user = %session.id, "Login callback failed: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::flow::form::Field;
    use crate::flow::notice::{messages, NoticeLevel};
    use crate::flow::testing::{sample_session, FakeProvider, RecordingNotifier};
    use crate::flow::view::View;
    use crate::provider::OAuthProvider;

    type TestController = AuthController<FakeProvider, RecordingNotifier>;

    fn controller(provider: FakeProvider) -> (TestController, RecordingNotifier) {
        let notifier = RecordingNotifier::default();
        (AuthController::new(provider, notifier.clone()), notifier)
    }

    async fn fill(controller: &mut TestController, field: Field, value: &str) {
        controller
            .dispatch(UserAction::Input(field, value.to_string()))
            .await
            .unwrap();
    }

    fn notices(outputs: &[Output]) -> Vec<Notice> {
        outputs
            .iter()
            .filter_map(|output| match output {
                Output::Notice(notice) => Some(notice.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(flavor = "current_thread")]
    async fn valid_sign_in_reaches_dashboard_and_notifies_once() {
        let (mut controller, notifier) = controller(FakeProvider::new("hunter22"));
        controller.start().await.unwrap();
        assert_eq!(controller.state().view(), View::Login);

        fill(&mut controller, Field::Email, "kerem@example.com").await;
        fill(&mut controller, Field::Password, "hunter22").await;
        controller.dispatch(UserAction::SubmitSignIn).await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(
            controller.state().session().map(|session| session.id.as_str()),
            Some("kerem")
        );
        assert_eq!(notifier.delivered(), vec![sample_session("kerem")]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::LOGIN_SUCCESS)]
        );
        assert_eq!(controller.pump_events().await, 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn invalid_sign_in_stays_on_login_with_error_notice() {
        let (mut controller, notifier) = controller(FakeProvider::new("hunter22"));
        fill(&mut controller, Field::Email, "kerem@example.com").await;
        fill(&mut controller, Field::Password, "wrong").await;

        let error = controller.dispatch(UserAction::SubmitSignIn).await.unwrap_err();
        assert!(matches!(error, FlowError::Provider(_)));
        assert_eq!(controller.state().view(), View::Login);
        assert!(controller.state().session().is_none());
        assert!(!controller.state().is_busy());
        assert!(notifier.delivered().is_empty());

        let notices = notices(&controller.take_output());
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert!(notices[0].message.contains("Invalid login credentials"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn empty_email_never_reaches_provider() {
        let provider = FakeProvider::new("hunter22");
        let (mut controller, _) = controller(provider.clone());
        fill(&mut controller, Field::Password, "hunter22").await;

        let error = controller.dispatch(UserAction::SubmitSignIn).await.unwrap_err();
        assert!(matches!(error, FlowError::Validation(_)));
        assert!(provider.calls().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn reset_request_returns_to_login_with_check_email_notice() {
        let provider = FakeProvider::new("hunter22");
        let (mut controller, notifier) = controller(provider.clone());
        controller.dispatch(UserAction::ForgotPassword).await.unwrap();
        fill(&mut controller, Field::Email, "kerem@example.com").await;
        controller.dispatch(UserAction::SubmitReset).await.unwrap();

        assert_eq!(controller.state().view(), View::Login);
        assert!(controller.state().session().is_none());
        assert!(notifier.delivered().is_empty());
        assert_eq!(provider.calls(), vec!["request_password_reset".to_string()]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::RESET_SUCCESS)]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn failing_callback_does_not_undo_sign_in() {
        let notifier = RecordingNotifier::failing();
        let mut controller = AuthController::new(FakeProvider::new("hunter22"), notifier.clone());
        fill(&mut controller, Field::Email, "kerem@example.com").await;
        fill(&mut controller, Field::Password, "hunter22").await;

        controller.dispatch(UserAction::SubmitSignIn).await.unwrap();
        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(notifier.delivered().len(), 1);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_out_failure_still_clears_local_state() {
        let provider = FakeProvider::new("hunter22")
            .signed_in(sample_session("kerem"))
            .failing_sign_out();
        let (mut controller, _) = controller(provider);
        controller.start().await.unwrap();
        assert_eq!(controller.state().view(), View::Dashboard);

        controller.dispatch(UserAction::SignOut).await.unwrap();
        assert_eq!(controller.state().view(), View::Login);
        assert!(controller.state().session().is_none());
        assert!(notices(&controller.take_output())
            .iter()
            .all(|notice| !notice.is_error()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn start_with_existing_session_notifies_callback() {
        let provider = FakeProvider::new("hunter22").signed_in(sample_session("kerem"));
        let (mut controller, notifier) = controller(provider);
        controller.start().await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(notifier.delivered(), vec![sample_session("kerem")]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn resume_restores_session_without_callback() {
        let provider = FakeProvider::new("hunter22").signed_in(sample_session("kerem"));
        let (mut controller, notifier) = controller(provider);
        controller.resume().await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn next_event_applies_a_signed_out_event() {
        let provider = FakeProvider::new("hunter22").signed_in(sample_session("kerem"));
        let (mut controller, _) = controller(provider.clone());
        controller.resume().await.unwrap();

        provider.emit(ProviderEvent::SignedOut);
        assert!(controller.next_event().await);
        assert_eq!(controller.state().view(), View::Login);
        assert!(controller.state().session().is_none());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn recovery_event_switches_to_update_password() {
        let provider = FakeProvider::new("hunter22");
        let (mut controller, notifier) = controller(provider.clone());
        controller.start().await.unwrap();

        provider.emit(ProviderEvent::PasswordRecovery {
            session: Some(sample_session("kerem")),
        });
        assert_eq!(controller.pump_events().await, 1);
        assert_eq!(controller.state().view(), View::UpdatePassword);
        assert!(notifier.delivered().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn oauth_hands_authorize_url_to_the_ui() {
        let (mut controller, _) = controller(FakeProvider::new("hunter22"));
        controller
            .dispatch(UserAction::OAuth(OAuthProvider::Github))
            .await
            .unwrap();
        assert_eq!(
            controller.take_output(),
            vec![Output::OpenUrl(
                "https://demo.supabase.co/auth/v1/authorize?provider=github".to_string()
            )]
        );
        assert_eq!(controller.state().view(), View::Login);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn guest_sign_in_enters_dashboard() {
        let provider = FakeProvider::new("hunter22");
        let (mut controller, notifier) = controller(provider.clone());
        controller.dispatch(UserAction::GuestSignIn).await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(provider.calls(), vec!["sign_in_anonymously".to_string()]);
        assert_eq!(notifier.delivered(), vec![sample_session("guest")]);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_up_pending_confirmation_stays_on_login() {
        let provider = FakeProvider::new("hunter22").requiring_confirmation();
        let (mut controller, notifier) = controller(provider.clone());
        fill(&mut controller, Field::Email, "kerem@example.com").await;
        fill(&mut controller, Field::Password, "hunter22").await;

        controller.dispatch(UserAction::SubmitSignUp).await.unwrap();

        assert_eq!(controller.state().view(), View::Login);
        assert!(controller.state().session().is_none());
        assert!(notifier.delivered().is_empty());
        assert_eq!(provider.calls(), vec!["register".to_string()]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::CHECK_EMAIL)]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn sign_up_with_session_reaches_dashboard_and_notifies_once() {
        let (mut controller, notifier) = controller(FakeProvider::new("hunter22"));
        fill(&mut controller, Field::Email, "kerem@example.com").await;
        fill(&mut controller, Field::Password, "hunter22").await;

        controller.dispatch(UserAction::SubmitSignUp).await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(notifier.delivered(), vec![sample_session("kerem")]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::LOGIN_SUCCESS)]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn saving_profile_replaces_session_and_notifies() {
        let provider = FakeProvider::new("hunter22").signed_in(sample_session("user-1"));
        let (mut controller, notifier) = controller(provider.clone());
        controller.resume().await.unwrap();

        controller.dispatch(UserAction::EditProfile).await.unwrap();
        fill(&mut controller, Field::DisplayName, "Kerem K").await;
        controller.dispatch(UserAction::SaveProfile).await.unwrap();

        let mut expected = sample_session("user-1");
        expected.display_name = "Kerem K".to_string();
        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(controller.state().session(), Some(&expected));
        assert_eq!(notifier.delivered(), vec![expected]);
        assert_eq!(provider.calls(), vec!["update_profile".to_string()]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::PROFILE_UPDATED)]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn changing_password_returns_to_dashboard_without_callback() {
        let provider = FakeProvider::new("hunter22").signed_in(sample_session("user-1"));
        let (mut controller, notifier) = controller(provider.clone());
        controller.resume().await.unwrap();

        controller.dispatch(UserAction::ChangePassword).await.unwrap();
        assert_eq!(controller.state().view(), View::ChangePassword);
        fill(&mut controller, Field::NewPassword, "s3cret-new").await;
        controller.dispatch(UserAction::SavePassword).await.unwrap();

        assert_eq!(controller.state().view(), View::Dashboard);
        assert_eq!(controller.state().form().new_password, "");
        assert!(notifier.delivered().is_empty());
        assert_eq!(provider.calls(), vec!["set_password".to_string()]);
        assert_eq!(
            notices(&controller.take_output()),
            vec![Notice::success(messages::PASSWORD_UPDATED)]
        );
    }
}
