//! Request bodies sent by the sign-in, sign-up, password and profile pages.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FormError {
    #[error("Reset link is missing its token")]
    MissingResetToken,

    #[error("Password confirmation does not match")]
    ConfirmationMismatch,
}

/// Email and password submitted to `POST /sessions`.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up body for `POST /users`.
#[derive(Clone, Serialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Profile form submitted to `PUT /profile`.
///
/// The password fields only travel when `old_password` is filled in;
/// otherwise the server would treat the request as a password change.
#[derive(Clone, Default)]
pub struct ProfileUpdate {
    pub name: String,
    pub email: String,
    pub old_password: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Serialize)]
pub struct ProfileBody<'a> {
    name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password_confirmation: Option<&'a str>,
}

impl ProfileUpdate {
    pub fn changes_password(&self) -> bool {
        !self.old_password.is_empty()
    }

    /// Check the confirmation when a password change was requested
    pub fn validate(&self) -> Result<(), FormError> {
        if self.changes_password() && self.password != self.password_confirmation {
            return Err(FormError::ConfirmationMismatch);
        }
        Ok(())
    }

    pub fn body(&self) -> ProfileBody<'_> {
        let changing = self.changes_password();
        ProfileBody {
            name: &self.name,
            email: &self.email,
            old_password: changing.then_some(self.old_password.as_str()),
            password: changing.then_some(self.password.as_str()),
            password_confirmation: changing.then_some(self.password_confirmation.as_str()),
        }
    }
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("changes_password", &self.changes_password())
            .finish()
    }
}

/// Body for `POST /password/reset`.
#[derive(Clone, Serialize)]
pub struct ResetPassword {
    pub password: String,
    pub password_confirmation: String,
    pub token: String,
}

impl ResetPassword {
    /// Build a reset request from the query string of the emailed link
    /// (`?token=...`). An absent or empty token is rejected.
    pub fn from_query(
        query: &str,
        password: impl Into<String>,
        password_confirmation: impl Into<String>,
    ) -> Result<Self, FormError> {
        let token = token_from_query(query).ok_or(FormError::MissingResetToken)?;
        let reset = Self {
            password: password.into(),
            password_confirmation: password_confirmation.into(),
            token,
        };
        if reset.password != reset.password_confirmation {
            return Err(FormError::ConfirmationMismatch);
        }
        Ok(reset)
    }
}

impl fmt::Debug for ResetPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResetPassword").finish_non_exhaustive()
    }
}

/// Extract the `token` parameter from a query string, with or without
/// the leading `?`.
pub fn token_from_query(query: &str) -> Option<String> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "token")
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(old_password: &str) -> ProfileUpdate {
        ProfileUpdate {
            name: "Jhon Doe".to_string(),
            email: "johndoe@example.com.br".to_string(),
            old_password: old_password.to_string(),
            password: "new-secret".to_string(),
            password_confirmation: "new-secret".to_string(),
        }
    }

    #[test]
    fn test_profile_body_without_password_change() {
        let body = serde_json::to_value(profile("").body()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"name": "Jhon Doe", "email": "johndoe@example.com.br"})
        );
    }

    #[test]
    fn test_profile_body_with_password_change() {
        let body = serde_json::to_value(profile("old-secret").body()).unwrap();
        assert_eq!(body["old_password"], "old-secret");
        assert_eq!(body["password"], "new-secret");
        assert_eq!(body["password_confirmation"], "new-secret");
    }

    #[test]
    fn test_profile_validate_confirmation() {
        let mut update = profile("old-secret");
        assert!(update.validate().is_ok());
        update.password_confirmation = "typo".to_string();
        assert_eq!(update.validate(), Err(FormError::ConfirmationMismatch));

        // Confirmation is irrelevant when the password is not being changed
        update.old_password.clear();
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_token_from_query() {
        assert_eq!(token_from_query("?token=abc-123"), Some("abc-123".to_string()));
        assert_eq!(token_from_query("token=abc"), Some("abc".to_string()));
        assert_eq!(token_from_query("?utm=x&token=abc"), Some("abc".to_string()));
        assert_eq!(token_from_query("?token="), None);
        assert_eq!(token_from_query(""), None);
    }

    #[test]
    fn test_reset_password_from_query() {
        let reset = ResetPassword::from_query("?token=t1", "pw", "pw").unwrap();
        assert_eq!(reset.token, "t1");

        assert_eq!(
            ResetPassword::from_query("", "pw", "pw").unwrap_err(),
            FormError::MissingResetToken
        );
        assert_eq!(
            ResetPassword::from_query("?token=t1", "pw", "other").unwrap_err(),
            FormError::ConfirmationMismatch
        );
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let creds = Credentials::new("a@b.com", "hunter2");
        let printed = format!("{:?}", creds);
        assert!(printed.contains("a@b.com"));
        assert!(!printed.contains("hunter2"));
    }
}
