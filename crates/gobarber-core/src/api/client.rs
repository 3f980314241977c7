//! API client for communicating with the GoBarber REST API.
//!
//! This module provides the `ApiClient` struct. Requests are built in one
//! place (`ApiClient::request`), which is where the bearer credential is
//! attached.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Deserialize};
use tracing::debug;

use crate::auth::SessionData;
use crate::models::{
    Appointment, Credentials, MonthAvailabilityItem, NewUser, ProfileUpdate, ResetPassword, User,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL of a locally running backend
pub const DEFAULT_BASE_URL: &str = "http://localhost:3333";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Supplies the bearer token for outgoing requests.
///
/// Implemented by the session store, so the credential a request carries is
/// always the one held by the session at the moment the request is built.
pub trait TokenSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionResponse {
    token: String,
    user: User,
}

/// API client for the GoBarber backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: Option<Arc<dyn TokenSource>>,
}

impl ApiClient {
    /// Create a new API client without credentials
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens: None,
        })
    }

    /// Create a new ApiClient that authenticates with tokens from `tokens`,
    /// sharing the connection pool.
    pub fn with_token_source(&self, tokens: Arc<dyn TokenSource>) -> Self {
        Self {
            client: self.client.clone(), // Cheap clone, shares connection pool
            base_url: self.base_url.clone(),
            tokens: Some(tokens),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The `Authorization` header value the next request would carry
    pub fn authorization(&self) -> Option<String> {
        self.tokens
            .as_ref()
            .and_then(|tokens| tokens.bearer_token())
            .map(|token| format!("Bearer {}", token))
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self
            .client
            .request(method, self.url(path))
            .header(header::ACCEPT, "application/json");

        match self.authorization() {
            Some(value) => builder.header(header::AUTHORIZATION, value),
            None => builder,
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn send_json<T: DeserializeOwned>(builder: RequestBuilder, what: &str) -> Result<T, ApiError> {
        let response = Self::check_response(builder.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse {}: {}", what, e)))
    }

    async fn send_empty(builder: RequestBuilder) -> Result<(), ApiError> {
        Self::check_response(builder.send().await?).await?;
        Ok(())
    }

    // ===== Sessions =====

    /// Exchange credentials for a bearer token and the user record
    pub async fn create_session(&self, credentials: &Credentials) -> Result<SessionData, ApiError> {
        debug!(email = %credentials.email, "POST /sessions");
        let builder = self.request(Method::POST, "sessions").json(credentials);
        let response: SessionResponse = Self::send_json(builder, "session response").await?;

        if response.token.is_empty() {
            return Err(ApiError::InvalidResponse("Session response has an empty token".to_string()));
        }

        Ok(SessionData {
            token: response.token,
            user: response.user,
        })
    }

    // ===== Accounts =====

    pub async fn create_user(&self, new_user: &NewUser) -> Result<User, ApiError> {
        debug!(email = %new_user.email, "POST /users");
        let builder = self.request(Method::POST, "users").json(new_user);
        Self::send_json(builder, "created user").await
    }

    pub async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        debug!(email, "POST /password/forgot");
        let builder = self
            .request(Method::POST, "password/forgot")
            .json(&serde_json::json!({ "email": email }));
        Self::send_empty(builder).await
    }

    pub async fn reset_password(&self, reset: &ResetPassword) -> Result<(), ApiError> {
        debug!("POST /password/reset");
        let builder = self.request(Method::POST, "password/reset").json(reset);
        Self::send_empty(builder).await
    }

    // ===== Profile =====

    /// Returns the full updated user, meant to be fed into the session store
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        debug!(changes_password = update.changes_password(), "PUT /profile");
        let builder = self.request(Method::PUT, "profile").json(&update.body());
        Self::send_json(builder, "updated profile").await
    }

    /// Upload a new avatar image as the multipart field `avatar`
    pub async fn update_avatar(&self, file_name: &str, bytes: Vec<u8>) -> Result<User, ApiError> {
        debug!(file_name, size = bytes.len(), "PATCH /users/avatar");
        let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = multipart::Form::new().part("avatar", part);
        let builder = self.request(Method::PATCH, "users/avatar").multipart(form);
        Self::send_json(builder, "updated avatar").await
    }

    // ===== Schedule =====

    pub async fn fetch_month_availability(
        &self,
        provider_id: &str,
        year: i32,
        month: u32,
    ) -> Result<Vec<MonthAvailabilityItem>, ApiError> {
        let path = format!("providers/{}/month-availability", provider_id);
        let builder = self
            .request(Method::GET, &path)
            .query(&[("year", year.to_string()), ("month", month.to_string())]);
        Self::send_json(builder, "month availability").await
    }

    pub async fn fetch_appointments(&self, date: NaiveDate) -> Result<Vec<Appointment>, ApiError> {
        let builder = self.request(Method::GET, "appointments/me").query(&[
            ("year", date.year().to_string()),
            ("month", date.month().to_string()),
            ("day", date.day().to_string()),
        ]);
        Self::send_json(builder, "appointments").await
    }
}

// ============================================================================
// Tests
// ============================================================================
