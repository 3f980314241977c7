//! Distribution of the single `SessionStore` to every consumer.
//!
//! One `SessionProvider` is built by the composition root. Consumers get a
//! `SessionHandle`: a read view of the current user, the three session
//! operations, and a change notification that fires on every transition.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::models::{Credentials, User};

use super::{SessionData, SessionError, SessionStore};

#[derive(Clone)]
pub struct SessionProvider {
    store: Arc<SessionStore>,
}

impl SessionProvider {
    pub fn new(store: Arc<SessionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// A consumer handle bound to this provider's store
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            store: self.store.clone(),
            updates: self.store.subscribe(),
        }
    }
}

/// What a consumer sees of the session.
#[derive(Clone)]
pub struct SessionHandle {
    store: Arc<SessionStore>,
    updates: watch::Receiver<Option<SessionData>>,
}

impl SessionHandle {
    pub fn current_user(&self) -> Option<User> {
        self.store.current_user()
    }

    pub fn is_session_active(&self) -> bool {
        self.store.is_session_active()
    }

    pub async fn sign_in(&self, credentials: &Credentials) -> Result<(), SessionError> {
        self.store.sign_in(credentials).await
    }

    pub async fn sign_in_cancellable(
        &self,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<(), SessionError> {
        self.store.sign_in_cancellable(credentials, cancel).await
    }

    /// Run the sign-in on a background task owned by the returned handle.
    /// Dropping the `SignInTask` (consumer teardown) cancels the commit.
    pub fn spawn_sign_in(&self, credentials: Credentials) -> SignInTask {
        let cancel = CancellationToken::new();
        let store = self.store.clone();
        let task_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            store.sign_in_cancellable(&credentials, &task_cancel).await
        });
        SignInTask {
            cancel,
            join: Some(join),
        }
    }

    pub fn sign_out(&self) {
        self.store.sign_out()
    }

    pub fn update_user(&self, user: User) -> Result<(), SessionError> {
        self.store.update_user(user)
    }

    /// Wait for the next session transition and return the user after it.
    pub async fn changed(&mut self) -> Option<User> {
        // The handle keeps the store, and with it the sender, alive
        let _ = self.updates.changed().await;
        self.updates.borrow_and_update().as_ref().map(|data| data.user.clone())
    }

    /// Raw receiver for consumers that drive their own select loops
    pub fn subscribe(&self) -> watch::Receiver<Option<SessionData>> {
        self.store.subscribe()
    }
}

/// A sign-in running in the background on behalf of a consumer.
pub struct SignInTask {
    cancel: CancellationToken,
    join: Option<JoinHandle<Result<(), SessionError>>>,
}

impl SignInTask {
    /// Opt out of committing the result. A sign-in that already committed
    /// stays committed.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn wait(mut self) -> Result<(), SessionError> {
        let Some(join) = self.join.as_mut() else {
            return Err(SessionError::Cancelled);
        };
        let outcome = join.await;
        self.join = None;
        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(error = %e, "Sign-in task did not complete");
                Err(SessionError::Cancelled)
            }
        }
    }
}

impl Drop for SignInTask {
    fn drop(&mut self) {
        // Only a task that is still pending is affected
        if self.join.is_some() {
            self.cancel.cancel();
        }
    }
}
