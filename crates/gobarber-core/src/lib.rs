//! Core library for gobarber.
//!
//! This crate holds the client-side session core of the GoBarber scheduling
//! app and everything it is built on:
//!
//! - `storage`: durable key-value storage for the session entries
//! - `api`: HTTP client for the GoBarber REST API
//! - `auth`: the session store, provider and consumer handles
//! - `routes`: the route guard
//! - `context`: the composition root tying them together
//! - `models`, `config`: data types and configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod routes;
pub mod storage;

pub use api::{ApiClient, ApiConfig, ApiError};
pub use auth::{SessionData, SessionError, SessionHandle, SessionProvider, SessionStore, SignInTask};
pub use config::Config;
pub use context::AppContext;
pub use models::{Credentials, User};
pub use routes::{Page, RouteDecision, RouteTable};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
