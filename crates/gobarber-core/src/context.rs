//! Composition root wiring storage, the API client and the session provider.
//!
//! The context is built once per process and passed by reference to the view
//! layer. Asking for the session before a provider was installed fails with
//! `SessionError::NotInitialized`, in debug and release builds alike.

use std::sync::Arc;

use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::auth::{SessionError, SessionHandle, SessionProvider, SessionStore};
use crate::config::Config;
use crate::routes::{RouteDecision, RouteTable};
use crate::storage::KeyValueStorage;

pub struct AppContext {
    config: Config,
    api: ApiClient,
    routes: RouteTable,
    provider: Option<SessionProvider>,
}

impl AppContext {
    /// A context without a session provider
    pub fn new(config: Config, api: ApiClient) -> Self {
        Self {
            config,
            api,
            routes: RouteTable::default(),
            provider: None,
        }
    }

    /// Build the full application: hydrate the session from `storage` and
    /// hand out an API client that authenticates with it.
    pub fn bootstrap(config: Config, storage: Arc<dyn KeyValueStorage>) -> Result<Self, ApiError> {
        let anonymous = ApiClient::new(&config.api_config())?;

        let store = Arc::new(SessionStore::new(storage, anonymous.clone()));
        store.initialize();
        debug!(active = store.is_session_active(), "Session store initialized");

        let api = anonymous.with_token_source(store.clone());
        let mut context = Self::new(config, api);
        context.provide_session(SessionProvider::new(store));
        Ok(context)
    }

    pub fn provide_session(&mut self, provider: SessionProvider) {
        self.provider = Some(provider);
    }

    pub fn session(&self) -> Result<SessionHandle, SessionError> {
        self.provider
            .as_ref()
            .map(SessionProvider::handle)
            .ok_or(SessionError::NotInitialized)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut Config {
        &mut self.config
    }

    /// Client for collaborators; carries the session's bearer token
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Run the route guard for `path` against the current session
    pub fn navigate(&self, path: &str) -> Result<RouteDecision, SessionError> {
        let present = self.session()?.is_session_active();
        Ok(self.routes.resolve(path, present))
    }
}
