use std::fmt;

/// User-facing notice texts.
pub mod messages {
    pub const LOGIN_SUCCESS: &str = "Successfully logged in!";
    pub const LOGIN_ERROR: &str = "Login failed. Please check your credentials.";
    pub const CHECK_EMAIL: &str = "Check your email for the confirmation link!";
    pub const RESET_SUCCESS: &str = "Reset link sent! Check your email.";
    pub const PASSWORD_UPDATED: &str = "Password updated.";
    pub const PROFILE_UPDATED: &str = "Profile updated.";
    pub const SIGNED_OUT: &str = "Signed out.";
    pub const SESSION_COPIED: &str = "User data copied! Return to the app.";
    pub const GENERIC_ERROR: &str = "Something went wrong. Please try again.";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

/// Transient toast shown after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub const fn is_error(&self) -> bool {
        matches!(self.level, NoticeLevel::Error)
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}
