use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, TokenSource};
use crate::models::{Credentials, User};
use crate::storage::{KeyValueStorage, StorageError, TOKEN_KEY, USER_KEY};

use super::SessionError;

/// A committed session. Token and user only ever exist together.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub user: User,
}

impl SessionData {
    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Owner of the session and the only writer of its storage entries.
///
/// In-memory state lives in a watch channel: every transition is published
/// to all subscribers, and the last write wins.
pub struct SessionStore {
    storage: Arc<dyn KeyValueStorage>,
    api: ApiClient,
    state: watch::Sender<Option<SessionData>>,
}

impl SessionStore {
    /// Create an empty store. Call `initialize` to hydrate from storage.
    pub fn new(storage: Arc<dyn KeyValueStorage>, api: ApiClient) -> Self {
        let (state, _) = watch::channel(None);
        Self { storage, api, state }
    }

    /// Hydrate the session from storage. Any read failure or malformed entry
    /// leaves the session empty.
    pub fn initialize(&self) {
        let restored = self.read_stored();
        match &restored {
            Some(data) => info!(user_id = %data.user.id, "Session restored from storage"),
            None => debug!("No stored session"),
        }
        self.state.send_replace(restored);
    }

    fn read_stored(&self) -> Option<SessionData> {
        let token = self.read_entry(TOKEN_KEY)?;
        let raw_user = self.read_entry(USER_KEY)?;

        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => Some(SessionData { token, user }),
            Err(e) => {
                let err = SessionError::MalformedStoredSession(e);
                warn!(error = %err, "Ignoring stored session");
                None
            }
        }
    }

    /// Empty entries count as absent
    fn read_entry(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored session entry");
                None
            }
        }
    }

    /// Authenticate and commit the returned session.
    ///
    /// Storage is written before the new state is published. On failure
    /// nothing observable changes and the error is returned as-is.
    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), SessionError> {
        let data = self
            .api
            .create_session(credentials)
            .await
            .map_err(SessionError::AuthenticationFailed)?;
        self.commit(data)
    }

    /// Like `sign_in`, but a cancelled token prevents the commit even if the
    /// server already answered.
    pub async fn sign_in_cancellable(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        let data = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Sign-in cancelled while waiting for the server");
                return Err(SessionError::Cancelled);
            }
            result = self.api.create_session(credentials) => {
                result.map_err(SessionError::AuthenticationFailed)?
            }
        };

        if cancel.is_cancelled() {
            debug!("Sign-in cancelled after the server answered");
            return Err(SessionError::Cancelled);
        }
        self.commit(data)
    }

    fn commit(&self, data: SessionData) -> Result<(), SessionError> {
        let previous = (*self.state.borrow()).clone();

        if let Err(e) = self.persist(&data) {
            warn!(error = %e, "Failed to persist session, restoring previous entries");
            self.restore(previous.as_ref());
            return Err(e.into());
        }

        info!(user_id = %data.user.id, "Signed in");
        self.state.send_replace(Some(data));
        Ok(())
    }

    fn persist(&self, data: &SessionData) -> Result<(), StorageError> {
        let user = serde_json::to_string(&data.user)?;
        self.storage.set(TOKEN_KEY, &data.token)?;
        self.storage.set(USER_KEY, &user)?;
        Ok(())
    }

    /// Best effort: put storage back the way the committed state describes it
    fn restore(&self, previous: Option<&SessionData>) {
        let result = match previous {
            Some(data) => self.persist(data),
            None => self.clear_storage(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to restore stored session");
        }
    }

    fn clear_storage(&self) -> Result<(), StorageError> {
        // Attempt both removals even if the first fails
        let token = self.storage.remove(TOKEN_KEY);
        let user = self.storage.remove(USER_KEY);
        token.and(user)
    }

    /// Forget the session. Never fails: storage errors are logged.
    pub fn sign_out(&self) {
        if let Err(e) = self.clear_storage() {
            warn!(error = %e, "Failed to remove stored session");
        }
        if self.state.send_replace(None).is_some() {
            info!("Signed out");
        }
    }

    /// Replace the cached user, keeping the token.
    ///
    /// Requires an active session; without one nothing is written and
    /// `NoActiveSession` is returned. A storage failure is logged and the
    /// in-memory user is still replaced.
    pub fn update_user(&self, user: User) -> Result<(), SessionError> {
        if !self.is_session_active() {
            return Err(SessionError::NoActiveSession);
        }

        match serde_json::to_string(&user) {
            Ok(raw) => {
                if let Err(e) = self.storage.set(USER_KEY, &raw) {
                    warn!(error = %e, "Failed to store updated user");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize updated user"),
        }

        let user_id = user.id.clone();
        let updated = self.state.send_if_modified(|state| match state {
            Some(data) => {
                data.user = user;
                true
            }
            None => false,
        });

        if updated {
            debug!(user_id = %user_id, "User updated");
            Ok(())
        } else {
            // Signed out between the check and the update
            Err(SessionError::NoActiveSession)
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().as_ref().map(|data| data.user.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().as_ref().map(|data| data.token.clone())
    }

    /// `Authorization` header value for the active session
    pub fn authorization(&self) -> Option<String> {
        self.state.borrow().as_ref().map(SessionData::authorization)
    }

    pub fn is_session_active(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn snapshot(&self) -> Option<SessionData> {
        (*self.state.borrow()).clone()
    }

    /// Receiver that observes every session transition
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionData>> {
        self.state.subscribe()
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::storage::MemoryStorage;

    const STORED_USER: &str =
        r#"{"id":"u1","name":"Jhon Doe","email":"johndoe@example.com.br"}"#;

    /// Storage double that refuses writes to one key
    struct FailingStorage {
        inner: MemoryStorage,
        fail_key: &'static str,
    }

    impl KeyValueStorage for FailingStorage {
        fn get(&self, key: &str) -> crate::storage::Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> crate::storage::Result<()> {
            if key == self.fail_key {
                return Err(StorageError::Io(std::io::Error::other("disk full")));
            }
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> crate::storage::Result<()> {
            self.inner.remove(key)
        }
    }

    fn api() -> ApiClient {
        ApiClient::new(&ApiConfig::default()).unwrap()
    }

    fn store_with(storage: Arc<dyn KeyValueStorage>) -> SessionStore {
        let store = SessionStore::new(storage, api());
        store.initialize();
        store
    }

    fn signed_in_storage() -> Arc<MemoryStorage> {
        Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "tok-1"),
            (USER_KEY, STORED_USER),
        ]))
    }

    #[test]
    fn test_initialize_restores_stored_session() {
        let store = store_with(signed_in_storage());
        let user = store.current_user().unwrap();
        assert_eq!(user.email, "johndoe@example.com.br");
        assert_eq!(store.authorization().as_deref(), Some("Bearer tok-1"));
        assert!(store.is_session_active());
    }

    #[test]
    fn test_initialize_with_empty_storage() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        assert!(store.current_user().is_none());
        assert!(store.authorization().is_none());
    }

    #[test]
    fn test_initialize_requires_both_entries() {
        let token_only = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "tok-1")]));
        assert!(!store_with(token_only).is_session_active());

        let user_only = Arc::new(MemoryStorage::with_entries([(USER_KEY, STORED_USER)]));
        assert!(!store_with(user_only).is_session_active());

        let empty_token = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, ""),
            (USER_KEY, STORED_USER),
        ]));
        assert!(!store_with(empty_token).is_session_active());
    }

    #[test]
    fn test_initialize_tolerates_malformed_user() {
        for raw in ["not json", "{\"id\":\"u1\"}", "[]", ""] {
            let storage = Arc::new(MemoryStorage::with_entries([(TOKEN_KEY, "tok-1"), (USER_KEY, raw)]));
            let store = store_with(storage);
            assert!(store.current_user().is_none(), "entry {:?} should be ignored", raw);
            assert!(store.authorization().is_none());
        }
    }

    #[test]
    fn test_sign_out_clears_state_and_storage() {
        let storage = signed_in_storage();
        let store = store_with(storage.clone());

        store.sign_out();
        assert!(store.current_user().is_none());
        assert!(store.token().is_none());
        assert!(storage.is_empty());

        // Idempotent
        store.sign_out();
        assert!(storage.is_empty());

        // A reload sees nothing either
        assert!(!store_with(storage).is_session_active());
    }

    #[test]
    fn test_update_user_preserves_token() {
        let storage = signed_in_storage();
        let store = store_with(storage.clone());

        let updated = User::new("u1", "Jhon Updated", "new@example.com").with_avatar("user.jpg");
        store.update_user(updated.clone()).unwrap();

        assert_eq!(store.current_user(), Some(updated.clone()));
        assert_eq!(store.authorization().as_deref(), Some("Bearer tok-1"));

        let stored: User = serde_json::from_str(&storage.get(USER_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, updated);
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_update_user_without_session_is_rejected() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(storage.clone());

        let result = store.update_user(User::new("u1", "Jhon", "j@example.com"));
        assert!(matches!(result, Err(SessionError::NoActiveSession)));
        assert!(store.current_user().is_none());
        assert!(storage.is_empty());
    }

    #[test]
    fn test_update_user_survives_storage_failure() {
        let storage = Arc::new(FailingStorage {
            inner: MemoryStorage::with_entries([(TOKEN_KEY, "tok-1"), (USER_KEY, STORED_USER)]),
            fail_key: USER_KEY,
        });
        let store = store_with(storage);

        let updated = User::new("u1", "Renamed", "j@example.com");
        store.update_user(updated.clone()).unwrap();
        assert_eq!(store.current_user(), Some(updated));
    }

    #[test]
    fn test_commit_failure_restores_previous_entries() {
        let storage = Arc::new(FailingStorage {
            inner: MemoryStorage::with_entries([(TOKEN_KEY, "tok-1"), (USER_KEY, STORED_USER)]),
            fail_key: USER_KEY,
        });
        let store = store_with(storage.clone());

        let fresh = SessionData {
            token: "tok-2".to_string(),
            user: User::new("u2", "Other", "other@example.com"),
        };
        let result = store.commit(fresh);
        assert!(matches!(result, Err(SessionError::Storage(_))));

        // In-memory state untouched, stored token rolled back
        assert_eq!(store.token().as_deref(), Some("tok-1"));
        assert_eq!(storage.get(TOKEN_KEY).unwrap().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_commit_publishes_to_subscribers() {
        let store = store_with(Arc::new(MemoryStorage::new()));
        let mut rx = store.subscribe();
        assert!(!rx.has_changed().unwrap());

        store
            .commit(SessionData {
                token: "tok-9".to_string(),
                user: User::new("u9", "Nine", "nine@example.com"),
            })
            .unwrap();

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().as_ref().unwrap().user.id, "u9");
    }

    #[test]
    fn test_token_source_follows_session() {
        let store = Arc::new(store_with(signed_in_storage()));
        let client = api().with_token_source(store.clone());
        assert_eq!(client.authorization().as_deref(), Some("Bearer tok-1"));

        store.sign_out();
        assert!(client.authorization().is_none());
    }

    #[test]
    fn test_session_data_debug_redacts_token() {
        let data = SessionData {
            token: "secret-token".to_string(),
            user: User::new("u1", "Jhon", "j@example.com"),
        };
        assert!(!format!("{:?}", data).contains("secret-token"));
        assert_eq!(data.authorization(), "Bearer secret-token");
    }
}
