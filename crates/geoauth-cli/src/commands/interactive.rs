//! Line-driven front-end for the auth card: one prompt per screen.

use std::io::Write;

use geoauth_core::flow::{Field, UserAction};
use geoauth_core::provider::OAuthProvider;
use geoauth_core::FlowError;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::common::{render_outputs, render_view, CliController, ProfileContext};
use crate::error::CliError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Action(UserAction),
    /// Complete an email-link or OAuth redirect.
    Redirect(String),
    Show,
    Help,
    Quit,
}

pub const HELP: &[&str] = &[
    "set <field> <value>   fields: email, password, new_password, name, avatar",
    "signin | signup | guest | oauth <google|github>",
    "forgot | back | reset | newpass",
    "edit | save | password | savepass | cancel",
    "export | logout | redirect <url>",
    "show | help | quit",
];

/// Parse one prompt line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(verb, rest)| (verb, rest.trim()));

    let action = match verb.to_ascii_lowercase().as_str() {
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .map_or((rest, ""), |(field, value)| (field, value.trim()));
            if field.is_empty() {
                return Err("usage: set <field> <value>".to_string());
            }
            UserAction::Input(field.parse::<Field>()?, value.to_string())
        }
        "signin" | "login" => UserAction::SubmitSignIn,
        "signup" | "register" => UserAction::SubmitSignUp,
        "guest" => UserAction::GuestSignIn,
        "oauth" => UserAction::OAuth(rest.parse::<OAuthProvider>()?),
        "forgot" => UserAction::ForgotPassword,
        "back" => UserAction::BackToLogin,
        "reset" => UserAction::SubmitReset,
        "newpass" => UserAction::SubmitNewPassword,
        "edit" => UserAction::EditProfile,
        "save" => UserAction::SaveProfile,
        "password" => UserAction::ChangePassword,
        "savepass" => UserAction::SavePassword,
        "cancel" => UserAction::Cancel,
        "logout" | "signout" => UserAction::SignOut,
        "export" => UserAction::ExportSession,
        "redirect" if rest.is_empty() => return Err("usage: redirect <url>".to_string()),
        "redirect" => return Ok(Some(ReplCommand::Redirect(rest.to_string()))),
        "show" => return Ok(Some(ReplCommand::Show)),
        "help" | "?" => return Ok(Some(ReplCommand::Help)),
        "quit" | "exit" => return Ok(Some(ReplCommand::Quit)),
        other => return Err(format!("unknown command '{other}' (try `help`)")),
    };
    Ok(Some(ReplCommand::Action(action)))
}

pub async fn run_interactive(context: &ProfileContext) -> Result<(), CliError> {
    let mut controller = context.controller()?;
    controller.start().await?;
    println!("geoauth - profile '{}' (type `help` for commands)", context.name);
    print_lines(&render_view(controller.state()));
    flush_output(&mut controller);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{}> ", controller.state().view());
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        let before = controller.state().view();
        match parse_command(&line) {
            Ok(None) => continue,
            Ok(Some(ReplCommand::Quit)) => break,
            Ok(Some(ReplCommand::Help)) => print_lines(HELP),
            Ok(Some(ReplCommand::Show)) => print_lines(&render_view(controller.state())),
            Ok(Some(ReplCommand::Redirect(url))) => {
                if let Err(error) = controller.provider().exchange_redirect(&url).await {
                    eprintln!("✗ {error}");
                }
                controller.pump_events().await;
            }
            Ok(Some(ReplCommand::Action(action))) => {
                let result = controller.dispatch(action).await;
                match result {
                    // Provider failures already arrive as error notices.
                    Ok(()) | Err(FlowError::Provider(_)) => {}
                    Err(error) => eprintln!("✗ {error}"),
                }
            }
            Err(message) => eprintln!("{message}"),
        }

        flush_output(&mut controller);
        if controller.state().view() != before {
            print_lines(&render_view(controller.state()));
        }
    }

    Ok(())
}

fn flush_output(controller: &mut CliController) {
    for line in render_outputs(&controller.take_output(), false) {
        println!("{line}");
    }
}

fn print_lines<S: AsRef<str>>(lines: &[S]) {
    for line in lines {
        println!("{}", line.as_ref());
    }
}
