use std::fmt;

use serde::{Deserialize, Serialize};

/// Screen of the auth card. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Login,
    ResetRequest,
    /// Only reachable through the provider's password-recovery event.
    UpdatePassword,
    Dashboard,
    EditProfile,
    ChangePassword,
}

impl View {
    pub const ALL: [Self; 6] = [
        Self::Login,
        Self::ResetRequest,
        Self::UpdatePassword,
        Self::Dashboard,
        Self::EditProfile,
        Self::ChangePassword,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::ResetRequest => "reset_request",
            Self::UpdatePassword => "update_password",
            Self::Dashboard => "dashboard",
            Self::EditProfile => "edit_profile",
            Self::ChangePassword => "change_password",
        }
    }

    /// Views that only make sense with a signed-in user.
    pub const fn is_authenticated(self) -> bool {
        matches!(
            self,
            Self::UpdatePassword | Self::Dashboard | Self::EditProfile | Self::ChangePassword
        )
    }
}

impl fmt::Display for View {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Tag of the provider call currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SignIn,
    SignUp,
    GuestSignIn,
    ResetRequest,
    UpdatePassword,
    SaveProfile,
    ChangePassword,
    SignOut,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignIn => "sign_in",
            Self::SignUp => "sign_up",
            Self::GuestSignIn => "guest_sign_in",
            Self::ResetRequest => "reset_request",
            Self::UpdatePassword => "update_password",
            Self::SaveProfile => "save_profile",
            Self::ChangePassword => "change_password",
            Self::SignOut => "sign_out",
        }
    }

    /// Sign-in style operations share the credential error fallback text.
    pub const fn is_sign_in(self) -> bool {
        matches!(self, Self::SignIn | Self::SignUp | Self::GuestSignIn)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}
