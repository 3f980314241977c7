//! Authentication module owning the signed-in session.
//!
//! This module provides:
//! - `SessionStore`: the single owner of `{ token, user }` and its durable copy
//! - `SessionProvider` / `SessionHandle`: hands the store to every consumer
//!   and notifies them of each transition
//! - `SessionError`: failures surfaced by the session core
//!
//! The session is hydrated from storage once at startup and lives until
//! sign-out. There is no expiry or refresh on the client side.

pub mod error;
pub mod provider;
pub mod session;

pub use error::SessionError;
pub use provider::{SessionHandle, SessionProvider, SignInTask};
pub use session::{SessionData, SessionStore};
