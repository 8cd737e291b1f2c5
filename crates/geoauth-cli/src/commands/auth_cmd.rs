use geoauth_core::flow::{Field, UserAction};
use geoauth_core::provider::{IdentityProvider, OAuthProvider, ProviderEvent};

use crate::auth::clear_stored_session;
use crate::commands::common::{
    fill, render_outputs, require_signed_in, require_signed_out, resumed_controller,
    session_label, submit, ProfileContext,
};
use crate::error::CliError;

pub async fn run_login(
    context: &ProfileContext,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_out(controller.state())?;

    fill(&mut controller, Field::Email, email).await?;
    fill(&mut controller, Field::Password, password).await?;
    submit(&mut controller, UserAction::SubmitSignIn).await?;

    let session = require_signed_in(controller.state())?;
    println!("Signed in profile '{}' as {}", context.name, session_label(session));
    Ok(())
}

pub async fn run_signup(
    context: &ProfileContext,
    email: &str,
    password: &str,
) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_out(controller.state())?;

    fill(&mut controller, Field::Email, email).await?;
    fill(&mut controller, Field::Password, password).await?;
    submit(&mut controller, UserAction::SubmitSignUp).await?;

    if let Some(session) = controller.state().session() {
        println!("Signed in profile '{}' as {}", context.name, session_label(session));
    }
    Ok(())
}

pub async fn run_guest(context: &ProfileContext) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_out(controller.state())?;

    submit(&mut controller, UserAction::GuestSignIn).await?;
    let session = require_signed_in(controller.state())?;
    println!("Signed in profile '{}' as {}", context.name, session_label(session));
    Ok(())
}

pub async fn run_oauth(context: &ProfileContext, provider: OAuthProvider) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_out(controller.state())?;

    submit(&mut controller, UserAction::OAuth(provider)).await?;
    println!("After signing in, run `geoauth redirect '<url>'` with the URL the browser lands on.");
    Ok(())
}

pub async fn run_reset(context: &ProfileContext, email: &str) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    require_signed_out(controller.state())?;

    submit(&mut controller, UserAction::ForgotPassword).await?;
    fill(&mut controller, Field::Email, email).await?;
    submit(&mut controller, UserAction::SubmitReset).await
}

/// Adopt the session carried by an email link or OAuth redirect.
///
/// Recovery links go on to set the new password in the same run.
pub async fn run_redirect(
    context: &ProfileContext,
    url: &str,
    new_password: Option<&str>,
) -> Result<(), CliError> {
    let mut controller = resumed_controller(context).await?;
    let event = controller.provider().exchange_redirect(url).await?;
    controller.pump_events().await;
    for line in render_outputs(&controller.take_output(), false) {
        println!("{line}");
    }

    if let ProviderEvent::PasswordRecovery { .. } = event {
        let new_password = new_password.ok_or(CliError::NewPasswordRequired)?;
        fill(&mut controller, Field::NewPassword, new_password).await?;
        submit(&mut controller, UserAction::SubmitNewPassword).await?;
    }

    let session = require_signed_in(controller.state())?;
    println!("Signed in profile '{}' as {}", context.name, session_label(session));
    Ok(())
}

pub async fn run_status(context: &ProfileContext, json: bool) -> Result<(), CliError> {
    let Some(client) = context.client()? else {
        println!("Profile '{}' is not configured.", context.name);
        return Ok(());
    };

    match client.current_session().await? {
        Some(session) if json => println!("{}", session.export_json()?),
        Some(session) => {
            println!("Profile '{}' is signed in as {}", context.name, session_label(&session));
            println!("uid: {}", session.id);
            println!("picture: {}", session.profile_picture);
        }
        None if json => return Err(CliError::NotSignedIn),
        None => println!("Profile '{}' is not signed in.", context.name),
    }
    Ok(())
}

pub async fn run_logout(context: &ProfileContext) -> Result<(), CliError> {
    if context.client()?.is_none() {
        clear_stored_session(&context.name)?;
        println!("Signed out profile '{}'", context.name);
        return Ok(());
    }

    let mut controller = resumed_controller(context).await?;
    if controller.state().session().is_none() {
        clear_stored_session(&context.name)?;
        println!("Profile '{}' is not signed in.", context.name);
        return Ok(());
    }

    submit(&mut controller, UserAction::SignOut).await?;
    println!("Signed out profile '{}'", context.name);
    Ok(())
}
