//! Core library for portal.
//!
//! Provides the REST API client with bearer-token refresh, the persisted
//! token store, the session controller consumed by front ends, and the
//! client-side form validation rules.

pub mod api;
pub mod auth;
pub mod config;
pub mod forms;
pub mod models;

pub use api::{ApiClient, ApiError};
pub use auth::{Session, SessionError, SessionState, TokenStore};
pub use config::{Config, TokenBackend};
pub use models::{AuthenticatedUser, NewUser, SessionTokens, User};
