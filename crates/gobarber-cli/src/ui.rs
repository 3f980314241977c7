//! Toast-style banners and user-facing error messages.
//!
//! Everything the user reads about a failure is worded here; the core only
//! hands back typed errors.

use std::fmt;

use gobarber_core::{ApiError, SessionError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
}

impl ToastKind {
    fn marker(&self) -> &'static str {
        match self {
            ToastKind::Success => "✓",
            ToastKind::Error => "✗",
            ToastKind::Info => "•",
        }
    }
}

/// A short banner with an optional second line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub title: String,
    pub description: Option<String>,
}

impl Toast {
    pub fn success(title: impl Into<String>) -> Self {
        Self::new(ToastKind::Success, title)
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(ToastKind::Error, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(ToastKind::Info, title)
    }

    fn new(kind: ToastKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Print to stderr so stdout stays clean for command output
    pub fn show(&self) {
        eprintln!("{}", self);
    }
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind.marker(), self.title)?;
        if let Some(ref description) = self.description {
            write!(f, "\n  {}", description)?;
        }
        Ok(())
    }
}

/// Describe a failed sign-in
pub fn sign_in_failure(err: &SessionError) -> Toast {
    let description = match err {
        SessionError::Cancelled => return Toast::info("Sign-in cancelled"),
        SessionError::Storage(_) => "Could not save the session on this machine. Nothing was changed.".to_string(),
        _ => match err.api_error() {
            Some(ApiError::Unauthorized) | Some(ApiError::Validation(_)) => {
                "Invalid email or password. Check your credentials.".to_string()
            }
            Some(api) => request_failure_reason(api),
            None => err.to_string(),
        },
    };
    Toast::error("Authentication error").with_description(description)
}

/// Describe a failed request made on behalf of a page
pub fn request_failure(title: &str, err: &ApiError) -> Toast {
    Toast::error(title).with_description(request_failure_reason(err))
}

fn request_failure_reason(err: &ApiError) -> String {
    match err {
        ApiError::Unauthorized => "Your session has expired. Sign in again.".to_string(),
        ApiError::Validation(message) if !message.is_empty() => message.clone(),
        ApiError::RateLimited => "Too many requests. Please wait a moment and try again.".to_string(),
        e if e.is_connectivity() => "Unable to connect to server. Check your internet connection.".to_string(),
        e => e.to_string(),
    }
}
