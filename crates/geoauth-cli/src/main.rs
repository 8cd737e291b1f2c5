//! geoauth CLI - GeoGame account flow from the terminal
//!
//! Sign in, sign up, reset passwords and edit the profile against Supabase
//! Auth, forwarding each new session to the game's login callback.

mod auth;
mod cli;
mod commands;
mod config_profiles;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::commands::account::{run_password, run_profile};
use crate::commands::auth_cmd::{
    run_guest, run_login, run_logout, run_oauth, run_redirect, run_reset, run_signup, run_status,
};
use crate::commands::common::ProfileContext;
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::interactive::run_interactive;
use crate::error::CliError;

const DEFAULT_LOG_FILTER: &str = "geoauth=info";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let profile = cli.profile.as_deref();
    let context = || ProfileContext::resolve(profile, &cli.overrides);

    match cli.command {
        None => run_interactive(&context()?).await,
        Some(Commands::Login { email, password }) => {
            run_login(&context()?, &email, &password).await
        }
        Some(Commands::Signup { email, password }) => {
            run_signup(&context()?, &email, &password).await
        }
        Some(Commands::Guest) => run_guest(&context()?).await,
        Some(Commands::Oauth { provider }) => run_oauth(&context()?, provider).await,
        Some(Commands::Reset { email }) => run_reset(&context()?, &email).await,
        Some(Commands::Redirect { url, new_password }) => {
            run_redirect(&context()?, &url, new_password.as_deref()).await
        }
        Some(Commands::Status { json }) => run_status(&context()?, json).await,
        Some(Commands::Profile { name, avatar_url }) => {
            run_profile(&context()?, &name, avatar_url.as_deref()).await
        }
        Some(Commands::Password { new_password }) => {
            run_password(&context()?, &new_password).await
        }
        Some(Commands::Logout) => run_logout(&context()?).await,
        Some(Commands::Config { command }) => run_config(command, profile, &cli.overrides).await,
        Some(Commands::Completions { shell, output }) => run_completions(shell, output.as_deref()),
    }
}
