use geoauth_core::config::AuthConfig;

use crate::cli::{ConfigCommands, ConfigOverrides};
use crate::commands::common::ProfileContext;
use crate::config_profiles::{resolve_auth_config, CliProfilesConfig};
use crate::error::CliError;

pub async fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            reset_redirect_url,
            oauth_redirect_url,
            callback_timeout_secs,
            no_activate,
        } => {
            let explicit = AuthConfig {
                reset_redirect_url,
                oauth_redirect_url,
                callback_timeout_secs,
                ..overrides.to_config()
            };
            run_config_init(global_profile, explicit, no_activate)
        }
        ConfigCommands::Show => {
            let context = ProfileContext::resolve(global_profile, overrides)?;
            println!("Profile: {}", context.name);
            println!("{}", render_config(&context.config)?);
            Ok(())
        }
        ConfigCommands::Verify => run_config_verify(global_profile, overrides).await,
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    explicit: AuthConfig,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let merged = merge_profile(explicit, AuthConfig::from_env(), config.profile(&profile_name))?;
    *config.profile_mut_or_default(&profile_name) = merged.clone();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let missing = missing_fields(&merged);
    if missing.is_empty() {
        println!(
            "Profile '{profile_name}' is ready. Run `geoauth login --email <email> --password <password>`."
        );
    } else {
        println!("Profile '{}' is missing: {}", profile_name, missing.join(", "));
    }
    Ok(())
}

async fn run_config_verify(
    global_profile: Option<&str>,
    overrides: &ConfigOverrides,
) -> Result<(), CliError> {
    let context = ProfileContext::resolve(global_profile, overrides)?;
    let client = context.require_client()?;
    let status = client.verify_configuration().await?;

    println!("Supabase auth settings for profile '{}':", context.name);
    println!("  email sign-in:      {}", enabled_label(status.email_enabled));
    println!("  sign-up:            {}", enabled_label(status.signup_enabled));
    println!("  guest sign-in:      {}", enabled_label(status.anonymous_enabled));
    println!("  email autoconfirm:  {}", enabled_label(status.mailer_autoconfirm));
    if let Some(limit) = status.rate_limit_email_sent {
        println!("  email rate limit:   {limit}/hour");
    }
    match context.config.callback_url.as_deref() {
        Some(url) => println!("  login callback:     {url}"),
        None => println!("  login callback:     disabled"),
    }
    Ok(())
}

/// Explicit values over environment over what the profile already holds.
pub fn merge_profile(
    explicit: AuthConfig,
    env: AuthConfig,
    existing: Option<&AuthConfig>,
) -> Result<AuthConfig, CliError> {
    let merged = resolve_auth_config(explicit, env, existing);
    merged.validate()?;
    Ok(merged)
}

pub fn missing_fields(config: &AuthConfig) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if config.supabase_url.is_none() {
        missing.push("supabase_url");
    }
    if config.supabase_anon_key.is_none() {
        missing.push("supabase_anon_key");
    }
    if config.callback_url.is_none() {
        missing.push("callback_url");
    }
    missing
}

/// Pretty JSON of `config` with the anon key shortened.
pub fn render_config(config: &AuthConfig) -> Result<String, CliError> {
    let mut shown = config.clone();
    shown.supabase_anon_key = shown.supabase_anon_key.as_deref().map(mask_secret);
    Ok(serde_json::to_string_pretty(&shown)?)
}

pub fn mask_secret(value: &str) -> String {
    const VISIBLE: usize = 6;
    if value.chars().count() <= VISIBLE {
        return "*".repeat(value.chars().count());
    }
    let prefix: String = value.chars().take(VISIBLE).collect();
    format!("{prefix}…")
}

const fn enabled_label(enabled: bool) -> &'static str {
    if enabled {
        "enabled"
    } else {
        "disabled"
    }
}
