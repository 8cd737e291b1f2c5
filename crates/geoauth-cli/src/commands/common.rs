use geoauth_core::config::AuthConfig;
use geoauth_core::flow::{AuthController, AuthState, Field, NoticeLevel, Output, UserAction, View};
use geoauth_core::notify::CallbackNotifier;
use geoauth_core::Session;

use crate::auth::{client_for_profile, CliAuthClient};
use crate::cli::ConfigOverrides;
use crate::config_profiles::{resolve_auth_config, CliProfilesConfig};
use crate::error::CliError;

pub type CliController = AuthController<CliAuthClient, CallbackNotifier>;

/// Profile name plus the configuration resolved for this invocation.
#[derive(Debug, Clone)]
pub struct ProfileContext {
    pub name: String,
    pub config: AuthConfig,
}

impl ProfileContext {
    pub fn resolve(profile: Option<&str>, overrides: &ConfigOverrides) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let name = profiles.resolve_profile_name(profile);
        let config = resolve_auth_config(
            overrides.to_config(),
            AuthConfig::from_env(),
            profiles.profile(&name),
        );
        config.validate()?;
        Ok(Self { name, config })
    }

    pub fn client(&self) -> Result<Option<CliAuthClient>, CliError> {
        Ok(client_for_profile(&self.name, &self.config)?)
    }

    pub fn require_client(&self) -> Result<CliAuthClient, CliError> {
        self.client()?.ok_or(CliError::NotConfigured)
    }

    pub fn notifier(&self) -> Result<CallbackNotifier, CliError> {
        Ok(CallbackNotifier::from_endpoint(
            self.config.callback_url.as_deref(),
            self.config.callback_timeout(),
        )?)
    }

    pub fn controller(&self) -> Result<CliController, CliError> {
        Ok(AuthController::new(self.require_client()?, self.notifier()?))
    }
}

/// Controller with the stored session restored, for one-shot commands.
pub async fn resumed_controller(context: &ProfileContext) -> Result<CliController, CliError> {
    let mut controller = context.controller()?;
    controller.resume().await?;
    Ok(controller)
}

pub async fn fill(
    controller: &mut CliController,
    field: Field,
    value: &str,
) -> Result<(), CliError> {
    controller
        .dispatch(UserAction::Input(field, value.to_string()))
        .await?;
    Ok(())
}

/// Dispatch and print what the controller produced.
///
/// Error notices are left out because the returned error carries the same text.
pub async fn submit(controller: &mut CliController, action: UserAction) -> Result<(), CliError> {
    let result = controller.dispatch(action).await;
    for line in render_outputs(&controller.take_output(), result.is_err()) {
        println!("{line}");
    }
    result.map_err(CliError::from)
}

pub fn require_signed_out(state: &AuthState) -> Result<(), CliError> {
    match state.session() {
        Some(session) => Err(CliError::AlreadySignedIn(session_label(session))),
        None => Ok(()),
    }
}

pub fn require_signed_in(state: &AuthState) -> Result<&Session, CliError> {
    state.session().ok_or(CliError::NotSignedIn)
}

pub const fn notice_marker(level: NoticeLevel) -> &'static str {
    match level {
        NoticeLevel::Success => "✓",
        NoticeLevel::Info => "•",
        NoticeLevel::Error => "✗",
    }
}

pub fn render_output(output: &Output) -> String {
    match output {
        Output::Notice(notice) => format!("{} {}", notice_marker(notice.level), notice.message),
        Output::OpenUrl(url) => format!("Open this URL in a browser to continue:\n{url}"),
        Output::Export(json) => json.clone(),
    }
}

pub fn render_outputs(outputs: &[Output], skip_errors: bool) -> Vec<String> {
    outputs
        .iter()
        .filter(|output| {
            !(skip_errors && matches!(output, Output::Notice(notice) if notice.is_error()))
        })
        .map(render_output)
        .collect()
}

pub fn session_label(session: &Session) -> String {
    match &session.email {
        Some(email) => format!("{} <{email}>", session.display_name),
        None => format!("{} (guest)", session.display_name),
    }
}

/// Screen title and the commands that make sense on it.
pub fn render_view(state: &AuthState) -> Vec<String> {
    let form = state.form();
    match state.view() {
        View::Login => vec![
            "== Sign in ==".to_string(),
            "set email <address>, set password <secret>, then `signin` or `signup`".to_string(),
            "or: guest | oauth google | oauth github | forgot | redirect <url>".to_string(),
        ],
        View::ResetRequest => vec![
            "== Reset password ==".to_string(),
            "set email <address>, then `reset`; `back` returns to sign in".to_string(),
        ],
        View::UpdatePassword => vec![
            "== Choose a new password ==".to_string(),
            "set new_password <secret>, then `newpass`".to_string(),
        ],
        View::Dashboard => {
            let mut lines = vec!["== Account ==".to_string()];
            if let Some(session) = state.session() {
                lines.push(format!("Signed in as {}", session_label(session)));
                lines.push(format!("uid: {}", session.id));
                lines.push(format!("picture: {}", session.profile_picture));
            }
            lines.push("edit | password | export | logout".to_string());
            lines
        }
        View::EditProfile => vec![
            "== Edit profile ==".to_string(),
            format!("name: {}", form.display_name),
            format!("avatar: {}", form.avatar_url),
            "set name <text>, set avatar <url>, then `save` or `cancel`".to_string(),
        ],
        View::ChangePassword => vec![
            "== Change password ==".to_string(),
            "set new_password <secret>, then `savepass` or `cancel`".to_string(),
        ],
    }
}
