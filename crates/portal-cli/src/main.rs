//! Portal - terminal front end for the user service.
//!
//! Provides login, signup and home views backed by the REST API, keeping the
//! session between runs through the configured token store.

mod app;
mod views;

use std::io;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;
use portal_core::Config;

#[derive(Parser)]
#[command(name = "portal", version, about = "Log in, sign up and see who you are")]
struct Cli {
    /// Override the API base URL for this run
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Log in with email and password
    Login {
        #[arg(long)]
        email: Option<String>,
    },
    /// Create an account
    Signup {
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Accept the terms of use and privacy policy without prompting
        #[arg(long)]
        accept_terms: bool,
    },
    /// Show the signed-in user (default)
    Home,
    /// Forget the stored session
    Signout,
    /// Show session and storage details
    Status,
}

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        views::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url;
    }
    info!(api = %config.api_base_url, backend = ?config.token_backend, "Portal starting");

    let mut app = App::new(config)?;

    match cli.command.unwrap_or(Command::Home) {
        Command::Login { email } => app.login(email).await,
        Command::Signup {
            first_name,
            last_name,
            email,
            accept_terms,
        } => {
            app.signup(app::SignupArgs {
                first_name,
                last_name,
                email,
                accept_terms,
            })
            .await
        }
        Command::Home => app.home().await,
        Command::Signout => {
            app.signout();
            Ok(())
        }
        Command::Status => app.status().await,
    }
}
