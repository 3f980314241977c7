use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Errors raised by the session core.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The remote endpoint rejected the credentials or could not be reached.
    /// Callers decide how to present it.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(#[source] ApiError),

    /// The new session could not be written to durable storage
    #[error("Failed to persist session: {0}")]
    Storage(#[from] StorageError),

    /// The stored user entry did not deserialize. Only ever logged during
    /// hydration, which then treats the session as absent.
    #[error("Stored session is malformed: {0}")]
    MalformedStoredSession(#[source] serde_json::Error),

    /// Session state was requested before a provider was installed
    #[error("Session provider is not initialized")]
    NotInitialized,

    /// `update_user` requires a signed-in session
    #[error("No active session")]
    NoActiveSession,

    /// The sign-in was cancelled before it committed
    #[error("Sign-in cancelled")]
    Cancelled,
}

impl SessionError {
    /// The underlying API error for a failed sign-in
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            SessionError::AuthenticationFailed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = SessionError::AuthenticationFailed(ApiError::Unauthorized);
        assert!(err.to_string().starts_with("Authentication failed"));
        assert!(matches!(err.api_error(), Some(ApiError::Unauthorized)));

        assert_eq!(
            SessionError::NotInitialized.to_string(),
            "Session provider is not initialized"
        );
        assert!(SessionError::NoActiveSession.api_error().is_none());
    }

    #[test]
    fn test_storage_error_converts() {
        let err: SessionError = StorageError::LockPoisoned.into();
        assert!(matches!(err, SessionError::Storage(StorageError::LockPoisoned)));
    }
}
