use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use geoauth_core::config::AuthConfig;
use geoauth_core::provider::OAuthProvider;

#[derive(Parser)]
#[command(name = "geoauth")]
#[command(about = "Sign in to GeoGame from the command line")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// CLI profile name holding the auth configuration
    #[arg(long, global = true, value_name = "NAME")]
    pub profile: Option<String>,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

/// Per-invocation overrides. They win over the environment and the profile file.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Supabase project URL
    #[arg(long, global = true, value_name = "URL")]
    pub supabase_url: Option<String>,
    /// Supabase anon/public key
    #[arg(long, global = true, value_name = "KEY")]
    pub supabase_anon_key: Option<String>,
    /// Endpoint that receives the session after sign-in
    #[arg(long, global = true, value_name = "URL")]
    pub callback_url: Option<String>,
}

impl ConfigOverrides {
    pub fn to_config(&self) -> AuthConfig {
        let mut config = AuthConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            callback_url: self.callback_url.clone(),
            ..AuthConfig::default()
        };
        config.normalize();
        config
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in with email and password
    #[command(alias = "signin")]
    Login {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Create an account with email and password
    #[command(alias = "register")]
    Signup {
        #[arg(long, value_name = "EMAIL")]
        email: String,
        #[arg(long, value_name = "PASSWORD")]
        password: String,
    },
    /// Continue as an anonymous guest
    Guest,
    /// Print the OAuth consent URL for a provider
    Oauth {
        /// google or github
        provider: OAuthProvider,
    },
    /// Send a password-reset link
    Reset {
        #[arg(long, value_name = "EMAIL")]
        email: String,
    },
    /// Complete an email or OAuth redirect
    Redirect {
        /// Full URL the browser landed on, including the #fragment
        url: String,
        /// New password, required for password-recovery links
        #[arg(long, value_name = "PASSWORD")]
        new_password: Option<String>,
    },
    /// Show who is signed in
    Status {
        /// Print the session as JSON for the game client
        #[arg(long)]
        json: bool,
    },
    /// Update display name and profile picture
    Profile {
        #[arg(long, value_name = "NAME")]
        name: String,
        /// http(s) URL of the profile picture
        #[arg(long, value_name = "URL")]
        avatar_url: Option<String>,
    },
    /// Change the password of the signed-in user
    Password {
        #[arg(long, value_name = "PASSWORD")]
        new_password: String,
    },
    /// Sign out and clear the stored session
    Logout,
    /// Configure CLI profiles
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Initialize or update a profile
    Init {
        /// Link target for password-reset emails
        #[arg(long, value_name = "URL")]
        reset_redirect_url: Option<String>,
        /// Where the OAuth consent screen returns the user
        #[arg(long, value_name = "URL")]
        oauth_redirect_url: Option<String>,
        /// Login callback timeout in seconds
        #[arg(long, value_name = "SECS")]
        callback_timeout_secs: Option<u64>,
        /// Keep current active profile instead of activating this one
        #[arg(long)]
        no_activate: bool,
    },
    /// Print the resolved configuration
    Show,
    /// Check the Supabase project settings
    Verify,
}
