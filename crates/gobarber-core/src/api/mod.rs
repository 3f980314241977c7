//! REST API client module for the GoBarber backend.
//!
//! This module provides the `ApiClient` for the session, account, profile
//! and schedule endpoints.
//!
//! Authenticated endpoints carry a JWT bearer token. The token is not stored
//! on the client: every request asks its `TokenSource` for the current token
//! while the request is being built.

pub mod client;
pub mod error;

pub use client::{ApiClient, ApiConfig, TokenSource};
pub use error::ApiError;
