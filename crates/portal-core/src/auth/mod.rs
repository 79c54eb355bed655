//! Authentication module for managing user sessions and tokens.
//!
//! This module provides:
//! - `TokenStore`: the persisted access/refresh token pair
//! - `FileStore`, `MemoryStore`, `KeyringStore`: key/value backends for it
//! - `Session`: current-user state and the login/signup/signout operations
//!
//! Both tokens are stored or neither is; a half-written pair is discarded.

pub mod credentials;
pub mod session;
pub mod store;

pub use credentials::KeyringStore;
pub use session::{Session, SessionError, SessionState};
pub use store::{
    FileStore, KeyValueStore, MemoryStore, TokenStore, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY,
};
