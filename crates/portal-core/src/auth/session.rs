use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuthenticatedUser, NewUser, User};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Stored tokens have not been checked yet
    Initializing,
    Authenticated(User),
    Anonymous,
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("{0}")]
    LoginFailed(String),

    /// Cause is kept for logs; the message shown is always the same.
    #[error("Failed to create account")]
    SignupFailed(#[source] ApiError),

    #[error("Token storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Current-user state and the operations that change it.
///
/// Owned by the front end and handed to whatever renders views.
pub struct Session {
    api: ApiClient,
    state: SessionState,
}

impl Session {
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            state: SessionState::Initializing,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&User> {
        match self.state {
            SessionState::Authenticated(ref user) => Some(user),
            _ => None,
        }
    }

    pub fn is_initializing(&self) -> bool {
        matches!(self.state, SessionState::Initializing)
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some()
    }

    /// Restore the session from stored tokens.
    ///
    /// Any failure clears the tokens and leaves the session anonymous.
    pub async fn initialize(&mut self) -> &SessionState {
        self.state = SessionState::Initializing;

        let has_tokens = match self.api.tokens().has_tokens() {
            Ok(has) => has,
            Err(e) => {
                warn!(error = %e, "Failed to read stored tokens, discarding them");
                self.clear_tokens();
                false
            }
        };

        if !has_tokens {
            debug!("No stored session");
            self.state = SessionState::Anonymous;
            return &self.state;
        }

        match self.api.me().await {
            Ok(user) => {
                info!(email = %user.email, "Session restored");
                self.state = SessionState::Authenticated(user);
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore session");
                self.clear_tokens();
                self.state = SessionState::Anonymous;
            }
        }
        &self.state
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<User, SessionError> {
        match self.api.login(email, password).await {
            Ok(auth) => {
                let user = self.establish(auth)?;
                info!(email = %user.email, "Login successful");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.clear_tokens();
                self.state = SessionState::Anonymous;
                Err(SessionError::LoginFailed(e.user_message()))
            }
        }
    }

    pub async fn signup(&mut self, new_user: &NewUser) -> Result<User, SessionError> {
        match self.api.create_user(new_user).await {
            Ok(auth) => {
                let user = self.establish(auth)?;
                info!(email = %user.email, "Account created");
                Ok(user)
            }
            Err(e) => {
                warn!(error = %e, "Signup failed");
                self.clear_tokens();
                self.state = SessionState::Anonymous;
                Err(SessionError::SignupFailed(e))
            }
        }
    }

    /// Forget the current user and tokens. No network call.
    pub fn signout(&mut self) {
        self.clear_tokens();
        self.state = SessionState::Anonymous;
        info!("Signed out");
    }

    fn establish(&mut self, auth: AuthenticatedUser) -> Result<User, SessionError> {
        self.api
            .tokens()
            .save(&auth.tokens)
            .map_err(SessionError::Storage)?;
        self.state = SessionState::Authenticated(auth.user.clone());
        Ok(auth.user)
    }

    fn clear_tokens(&self) {
        if let Err(e) = self.api.tokens().clear() {
            warn!(error = %e, "Failed to clear stored tokens");
        }
    }
}
