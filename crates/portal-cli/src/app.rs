//! Application state for the portal front end.
//!
//! `App` owns the configuration and the `Session`, and drives each view:
//! it initializes the session, collects form input, and renders the result.

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use portal_core::forms::{LoginForm, SignupForm};
use portal_core::{ApiClient, Config, Session, SessionState};

use crate::views;

/// Flags given to `portal signup`; anything missing is prompted for.
pub struct SignupArgs {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub accept_terms: bool,
}

pub struct App {
    config: Config,
    session: Session,
}

impl App {
    pub fn new(config: Config) -> Result<Self> {
        let tokens = config.token_store()?;
        debug!(backend = %tokens.backend_name(), "Token store configured");
        let api = ApiClient::new(&config.api_base_url, tokens)?;

        Ok(Self {
            config,
            session: Session::new(api),
        })
    }

    /// Home view. Fails when nobody is signed in.
    pub async fn home(&mut self) -> Result<()> {
        self.session.initialize().await;
        match self.session.user() {
            Some(user) => {
                views::home(user);
                Ok(())
            }
            None => Err(anyhow!(views::signed_out())),
        }
    }

    pub async fn login(&mut self, email: Option<String>) -> Result<()> {
        self.session.initialize().await;
        if let Some(user) = self.session.user() {
            views::notice("Already signed in.");
            views::home(user);
            return Ok(());
        }

        let email = match email {
            Some(email) => email,
            None => views::prompt_with_default("Email", self.config.last_email.as_deref())?,
        };
        let password = match views::password_from_env() {
            Some(password) => password,
            None => views::prompt_password("Password")?,
        };

        let form = LoginForm { email, password };
        let credentials = form.validate().map_err(|errors| {
            views::field_errors(&errors);
            anyhow!("Please fix the fields above")
        })?;

        // Only the session's own message is shown, never the cause chain
        let user = self
            .session
            .login(&credentials.email, &credentials.password)
            .await
            .map_err(|e| anyhow!("{}", e))?;

        if let Err(e) = Config::remember_email(&user.email) {
            warn!(error = %e, "Failed to save config");
        }

        views::notice("Login successful");
        views::home(&user);
        Ok(())
    }

    pub async fn signup(&mut self, args: SignupArgs) -> Result<()> {
        self.session.initialize().await;
        if let Some(user) = self.session.user() {
            views::notice("Already signed in. Run `portal signout` first to create another account.");
            views::home(user);
            return Ok(());
        }

        let first_name = match args.first_name {
            Some(v) => v,
            None => views::prompt("First name")?,
        };
        let last_name = match args.last_name {
            Some(v) => v,
            None => views::prompt("Last name")?,
        };
        let email = match args.email {
            Some(v) => v,
            None => views::prompt("Email")?,
        };
        let (password, password_confirmation) = match views::password_from_env() {
            Some(password) => (password.clone(), password),
            None => (
                views::prompt_password("Password")?,
                views::prompt_password("Confirm password")?,
            ),
        };
        let accepted_terms = args.accept_terms
            || views::confirm("Accept the terms of use and privacy policy?")?;

        let form = SignupForm {
            first_name,
            last_name,
            email,
            password,
            password_confirmation,
            accepted_terms,
        };
        let new_user = form.validate().map_err(|errors| {
            views::field_errors(&errors);
            anyhow!("Please fix the fields above")
        })?;

        let user = self
            .session
            .signup(&new_user)
            .await
            .map_err(|e| anyhow!("{}", e))?;

        if let Err(e) = Config::remember_email(&user.email) {
            warn!(error = %e, "Failed to save config");
        }

        views::notice("Account created!");
        views::home(&user);
        Ok(())
    }

    pub fn signout(&mut self) {
        self.session.signout();
        views::notice("Signed out.");
    }

    pub async fn status(&mut self) -> Result<()> {
        let state = self.session.initialize().await;
        match state {
            SessionState::Authenticated(user) => {
                println!("Status:      signed in as {} <{}>", user.full_name(), user.email)
            }
            _ => println!("Status:      Not signed in"),
        }
        println!("API:         {}", self.session.api().base_url());
        println!("Token store: {}", self.session.api().tokens().backend_name());
        Ok(())
    }
}
