use thiserror::Error;

use super::view::{Operation, View};
use crate::auth::AuthError;

/// Client-side check that failed before any provider call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Email is required")]
    MissingEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("New password is required")]
    MissingNewPassword,
    #[error("Display name is required")]
    MissingDisplayName,
    #[error("Profile picture must be an http:// or https:// URL")]
    InvalidAvatarUrl,
}

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Provider(#[from] AuthError),
    #[error("{0} is already in progress")]
    Busy(Operation),
    #[error("'{action}' is not available on the {view} screen")]
    NotAvailable { action: &'static str, view: View },
}
