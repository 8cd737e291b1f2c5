use super::error::{FlowError, ValidationError};
use super::form::{Field, FormBuffer};
use super::notice::{messages, Notice};
use super::view::{Operation, View};
use crate::auth::SignUpOutcome;
use crate::provider::{OAuthProvider, ProfileUpdate, ProviderEvent};
use crate::session::Session;
use crate::util::is_http_url;

/// Something the user did on the auth card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserAction {
    Input(Field, String),
    SubmitSignIn,
    SubmitSignUp,
    GuestSignIn,
    OAuth(OAuthProvider),
    ForgotPassword,
    BackToLogin,
    SubmitReset,
    SubmitNewPassword,
    EditProfile,
    SaveProfile,
    ChangePassword,
    SavePassword,
    Cancel,
    SignOut,
    ExportSession,
}

impl UserAction {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Input(..) => "input",
            Self::SubmitSignIn => "sign in",
            Self::SubmitSignUp => "sign up",
            Self::GuestSignIn => "guest sign in",
            Self::OAuth(_) => "oauth sign in",
            Self::ForgotPassword => "forgot password",
            Self::BackToLogin => "back to login",
            Self::SubmitReset => "send reset link",
            Self::SubmitNewPassword => "set new password",
            Self::EditProfile => "edit profile",
            Self::SaveProfile => "save profile",
            Self::ChangePassword => "change password",
            Self::SavePassword => "save password",
            Self::Cancel => "cancel",
            Self::SignOut => "sign out",
            Self::ExportSession => "export session",
        }
    }
}

/// Provider call the controller must perform.
#[derive(Clone, PartialEq, Eq)]
pub enum ProviderCall {
    Authenticate { email: String, password: String },
    Register { email: String, password: String },
    SignInAnonymously,
    RequestPasswordReset { email: String },
    SetPassword { new_password: String },
    UpdateProfile(ProfileUpdate),
    SignOut,
}

impl std::fmt::Debug for ProviderCall {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Authenticate { email, .. } => write!(formatter, "Authenticate({email})"),
            Self::Register { email, .. } => write!(formatter, "Register({email})"),
            Self::SignInAnonymously => formatter.write_str("SignInAnonymously"),
            Self::RequestPasswordReset { email } => {
                write!(formatter, "RequestPasswordReset({email})")
            }
            Self::SetPassword { .. } => formatter.write_str("SetPassword([REDACTED])"),
            Self::UpdateProfile(update) => write!(formatter, "UpdateProfile({update:?})"),
            Self::SignOut => formatter.write_str("SignOut"),
        }
    }
}

/// Successful result of a [`ProviderCall`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    SignedIn(Session),
    Registered(SignUpOutcome),
    ResetRequested,
    PasswordSet,
    ProfileSaved(Session),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Call {
        operation: Operation,
        call: ProviderCall,
    },
    /// POST the snapshot to the login callback. Failures are only logged.
    Notify(Session),
    /// Build the OAuth consent URL and hand it to the UI.
    Authorize(OAuthProvider),
    Show(Notice),
    /// JSON handed to the game client (the web page copied it to the clipboard).
    Export(String),
}

/// Everything the reducer accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Session reported by the provider at start-up.
    Started(Option<Session>),
    Action(UserAction),
    Provider(ProviderEvent),
    Completed {
        operation: Operation,
        completion: Completion,
    },
    Failed {
        operation: Operation,
        message: String,
    },
}

/// Current screen, mirrored session, form inputs and in-flight tag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    view: View,
    session: Option<Session>,
    form: FormBuffer,
    in_flight: Option<Operation>,
}

impl AuthState {
    pub fn initial(session: Option<Session>) -> Self {
        let view = if session.is_some() {
            View::Dashboard
        } else {
            View::Login
        };
        Self {
            view,
            session,
            ..Self::default()
        }
    }

    pub const fn view(&self) -> View {
        self.view
    }

    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub const fn form(&self) -> &FormBuffer {
        &self.form
    }

    pub const fn in_flight(&self) -> Option<Operation> {
        self.in_flight
    }

    pub const fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Compute the next state and the effects to perform.
    ///
    /// Rejected actions leave the state untouched.
    pub fn reduce(&mut self, message: Message) -> Result<Vec<Effect>, FlowError> {
        let from = self.view;
        let effects = match message {
            Message::Started(session) => Ok(self.start(session)),
            Message::Action(action) => self.apply(action),
            Message::Provider(event) => Ok(self.observe(event)),
            Message::Completed {
                operation,
                completion,
            } => Ok(self.complete(operation, completion)),
            Message::Failed { operation, message } => Ok(self.fail(operation, &message)),
        }?;
        if from != self.view {
            tracing::debug!(from = %from, to = %self.view, "auth view changed");
        }
        Ok(effects)
    }

    fn start(&mut self, session: Option<Session>) -> Vec<Effect> {
        *self = Self::initial(session);
        self.session.clone().map(Effect::Notify).into_iter().collect()
    }

    fn apply(&mut self, action: UserAction) -> Result<Vec<Effect>, FlowError> {
        if let UserAction::Input(field, value) = action {
            self.form.set(field, value);
            return Ok(Vec::new());
        }
        if let Some(operation) = self.in_flight {
            return Err(FlowError::Busy(operation));
        }

        let not_available = FlowError::NotAvailable {
            action: action.name(),
            view: self.view,
        };
        match (self.view, action) {
            (View::Login, UserAction::SubmitSignIn) => {
                let (email, password) = self.credentials()?;
                Ok(self.begin(
                    Operation::SignIn,
                    ProviderCall::Authenticate { email, password },
                ))
            }
            (View::Login, UserAction::SubmitSignUp) => {
                let (email, password) = self.credentials()?;
                Ok(self.begin(
                    Operation::SignUp,
                    ProviderCall::Register { email, password },
                ))
            }
            (View::Login, UserAction::GuestSignIn) => {
                Ok(self.begin(Operation::GuestSignIn, ProviderCall::SignInAnonymously))
            }
            (View::Login, UserAction::OAuth(provider)) => Ok(vec![Effect::Authorize(provider)]),
            (View::Login, UserAction::ForgotPassword) => Ok(self.show(View::ResetRequest)),
            (View::ResetRequest, UserAction::BackToLogin) => Ok(self.show(View::Login)),
            (View::ResetRequest, UserAction::SubmitReset) => {
                let email = required(&self.form.email, ValidationError::MissingEmail)?;
                Ok(self.begin(
                    Operation::ResetRequest,
                    ProviderCall::RequestPasswordReset { email },
                ))
            }
            (View::UpdatePassword, UserAction::SubmitNewPassword) => {
                let new_password = self.new_password()?;
                Ok(self.begin(
                    Operation::UpdatePassword,
                    ProviderCall::SetPassword { new_password },
                ))
            }
            (View::Dashboard, UserAction::EditProfile) => {
                let Some(session) = &self.session else {
                    return Err(not_available);
                };
                self.form.prefill_profile(session);
                Ok(self.show(View::EditProfile))
            }
            (View::EditProfile, UserAction::SaveProfile) => {
                let update = self.profile_update()?;
                Ok(self.begin(Operation::SaveProfile, ProviderCall::UpdateProfile(update)))
            }
            (View::Dashboard, UserAction::ChangePassword) => {
                self.form.new_password.clear();
                Ok(self.show(View::ChangePassword))
            }
            (View::ChangePassword, UserAction::SavePassword) => {
                let new_password = self.new_password()?;
                Ok(self.begin(
                    Operation::ChangePassword,
                    ProviderCall::SetPassword { new_password },
                ))
            }
            (View::EditProfile | View::ChangePassword, UserAction::Cancel) => {
                self.form.new_password.clear();
                Ok(self.show(View::Dashboard))
            }
            (view, UserAction::SignOut) if view.is_authenticated() || self.session.is_some() => {
                Ok(self.begin(Operation::SignOut, ProviderCall::SignOut))
            }
            (View::Dashboard, UserAction::ExportSession) => match &self.session {
                Some(session) => match session.export_json() {
                    Ok(json) => Ok(vec![
                        Effect::Export(json),
                        Effect::Show(Notice::success(messages::SESSION_COPIED)),
                    ]),
                    Err(error) => Ok(vec![Effect::Show(Notice::error(error.to_string()))]),
                },
                None => Err(not_available),
            },
            _ => Err(not_available),
        }
    }

    fn observe(&mut self, event: ProviderEvent) -> Vec<Effect> {
        match event {
            ProviderEvent::SignedIn(session) => {
                let effects = self.adopt(session);
                if matches!(self.view, View::Login | View::ResetRequest) {
                    self.view = View::Dashboard;
                }
                effects
            }
            ProviderEvent::SignedOut => {
                self.reset_to_login();
                Vec::new()
            }
            ProviderEvent::PasswordRecovery { session } => {
                if session.is_some() {
                    self.session = session;
                }
                self.form.new_password.clear();
                self.view = View::UpdatePassword;
                Vec::new()
            }
        }
    }

    fn complete(&mut self, operation: Operation, completion: Completion) -> Vec<Effect> {
        self.finish(operation);
        match completion {
            Completion::SignedIn(session)
            | Completion::Registered(SignUpOutcome::SignedIn(session)) => {
                let mut effects = self.adopt(session);
                self.form.password.clear();
                self.view = View::Dashboard;
                effects.push(Effect::Show(Notice::success(messages::LOGIN_SUCCESS)));
                effects
            }
            Completion::Registered(SignUpOutcome::ConfirmationRequired) => {
                self.view = View::Login;
                vec![Effect::Show(Notice::success(messages::CHECK_EMAIL))]
            }
            Completion::ResetRequested => {
                self.view = View::Login;
                vec![Effect::Show(Notice::success(messages::RESET_SUCCESS))]
            }
            Completion::PasswordSet => {
                self.form.new_password.clear();
                self.view = View::Dashboard;
                let mut effects = Vec::new();
                if operation == Operation::UpdatePassword {
                    effects.extend(self.session.clone().map(Effect::Notify));
                }
                effects.push(Effect::Show(Notice::success(messages::PASSWORD_UPDATED)));
                effects
            }
            Completion::ProfileSaved(session) => {
                self.session = Some(session.clone());
                self.view = View::Dashboard;
                vec![
                    Effect::Notify(session),
                    Effect::Show(Notice::success(messages::PROFILE_UPDATED)),
                ]
            }
            Completion::SignedOut => {
                self.reset_to_login();
                vec![Effect::Show(Notice::info(messages::SIGNED_OUT))]
            }
        }
    }

    fn fail(&mut self, operation: Operation, message: &str) -> Vec<Effect> {
        self.finish(operation);
        if operation == Operation::SignOut {
            tracing::warn!("Sign-out failed, clearing local session anyway: {message}");
            self.reset_to_login();
            return vec![Effect::Show(Notice::info(messages::SIGNED_OUT))];
        }

        let message = message.trim();
        let text = if !message.is_empty() {
            message
        } else if operation.is_sign_in() {
            messages::LOGIN_ERROR
        } else {
            messages::GENERIC_ERROR
        };
        vec![Effect::Show(Notice::error(text))]
    }

    fn begin(&mut self, operation: Operation, call: ProviderCall) -> Vec<Effect> {
        self.in_flight = Some(operation);
        vec![Effect::Call { operation, call }]
    }

    fn finish(&mut self, operation: Operation) {
        if self.in_flight != Some(operation) {
            tracing::debug!(
                operation = %operation,
                in_flight = ?self.in_flight,
                "completion does not match the operation in flight"
            );
        }
        self.in_flight = None;
    }

    fn show(&mut self, view: View) -> Vec<Effect> {
        self.view = view;
        Vec::new()
    }

    /// Mirror a provider session, notifying only when the user changed.
    fn adopt(&mut self, session: Session) -> Vec<Effect> {
        let is_new = self
            .session
            .as_ref()
            .is_none_or(|current| current.id != session.id);
        self.session = Some(session.clone());
        if is_new {
            vec![Effect::Notify(session)]
        } else {
            Vec::new()
        }
    }

    fn reset_to_login(&mut self) {
        self.session = None;
        self.form.clear();
        self.view = View::Login;
    }

    fn credentials(&self) -> Result<(String, String), ValidationError> {
        let email = required(&self.form.email, ValidationError::MissingEmail)?;
        if self.form.password.trim().is_empty() {
            return Err(ValidationError::MissingPassword);
        }
        Ok((email, self.form.password.clone()))
    }

    fn new_password(&self) -> Result<String, ValidationError> {
        if self.form.new_password.trim().is_empty() {
            return Err(ValidationError::MissingNewPassword);
        }
        Ok(self.form.new_password.clone())
    }

    fn profile_update(&self) -> Result<ProfileUpdate, ValidationError> {
        let display_name = required(&self.form.display_name, ValidationError::MissingDisplayName)?;
        let avatar_url = match self.form.avatar_url.trim() {
            "" => None,
            url if is_http_url(url) => Some(url.to_string()),
            _ => return Err(ValidationError::InvalidAvatarUrl),
        };
        Ok(ProfileUpdate {
            display_name,
            avatar_url,
        })
    }
}

fn required(value: &str, missing: ValidationError) -> Result<String, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(missing)
    } else {
        Ok(value.to_string())
    }
}
