use std::fmt;
use std::str::FromStr;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Email,
    Password,
    NewPassword,
    DisplayName,
    AvatarUrl,
}

impl FromStr for Field {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "email" => Ok(Self::Email),
            "password" => Ok(Self::Password),
            "new_password" => Ok(Self::NewPassword),
            "display_name" | "name" => Ok(Self::DisplayName),
            "avatar_url" | "avatar" => Ok(Self::AvatarUrl),
            other => Err(format!("unknown field '{other}'")),
        }
    }
}

/// Values typed into the auth card. Cleared on sign-out.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct FormBuffer {
    pub email: String,
    pub password: String,
    pub new_password: String,
    pub display_name: String,
    pub avatar_url: String,
}

impl FormBuffer {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Email => &self.email,
            Field::Password => &self.password,
            Field::NewPassword => &self.new_password,
            Field::DisplayName => &self.display_name,
            Field::AvatarUrl => &self.avatar_url,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
            Field::NewPassword => &mut self.new_password,
            Field::DisplayName => &mut self.display_name,
            Field::AvatarUrl => &mut self.avatar_url,
        };
        *slot = value;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Seed the edit-profile inputs from the current session.
    pub fn prefill_profile(&mut self, session: &Session) {
        self.display_name.clone_from(&session.display_name);
        self.avatar_url = session.custom_avatar().unwrap_or_default().to_string();
    }
}

impl fmt::Debug for FormBuffer {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |value: &str| if value.is_empty() { "" } else { "[REDACTED]" };
        formatter
            .debug_struct("FormBuffer")
            .field("email", &self.email)
            .field("password", &mask(&self.password))
            .field("new_password", &mask(&self.new_password))
            .field("display_name", &self.display_name)
            .field("avatar_url", &self.avatar_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_names_accept_cli_spellings() {
        assert_eq!("new-password".parse::<Field>(), Ok(Field::NewPassword));
        assert_eq!("Avatar".parse::<Field>(), Ok(Field::AvatarUrl));
        assert!("username".parse::<Field>().is_err());
    }

    #[test]
    fn set_get_and_clear() {
        let mut form = FormBuffer::default();
        form.set(Field::Email, "kerem@example.com".to_string());
        form.set(Field::Password, "hunter22".to_string());
        assert_eq!(form.get(Field::Email), "kerem@example.com");
        assert!(!form.is_empty());

        form.clear();
        assert!(form.is_empty());
    }

    #[test]
    fn debug_masks_passwords() {
        let form = FormBuffer {
            password: "hunter22".to_string(),
            ..FormBuffer::default()
        };
        let rendered = format!("{form:?}");
        assert!(!rendered.contains("hunter22"));
    }
}
