use std::io;

use geoauth_core::auth::AuthError;
use geoauth_core::notify::NotificationError;
use geoauth_core::FlowError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] geoauth_core::Error),
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Supabase is not configured. Run `geoauth config init --supabase-url <URL> --supabase-anon-key <KEY>` or set SUPABASE_URL and SUPABASE_ANON_KEY."
    )]
    NotConfigured,
    #[error("Already signed in as {0}. Run `geoauth logout` first.")]
    AlreadySignedIn(String),
    #[error("Not signed in. Run `geoauth login` first.")]
    NotSignedIn,
    #[error("This is a password-recovery link. Pass --new-password to set the new password.")]
    NewPasswordRequired,
}
