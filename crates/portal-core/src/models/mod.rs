//! Data models exchanged with the user API.
//!
//! - `User`: the "who am I" payload
//! - `AuthenticatedUser`: login/signup payload, user fields plus `tokens`
//! - `SessionTokens`: access/refresh token pair
//! - `NewUser`: signup request body

pub mod user;

pub use user::{AuthenticatedUser, NewUser, SessionTokens, User};
