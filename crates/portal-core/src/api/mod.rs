//! REST API client module for the user service.
//!
//! This module provides the `ApiClient` for the login, signup, "who am I"
//! and token refresh endpoints.
//!
//! Protected requests carry a JWT bearer token read from the `TokenStore`.
//! An expired token is refreshed once per request and the request replayed.

pub mod client;
pub mod error;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::ApiError;
