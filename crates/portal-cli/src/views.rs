//! Terminal rendering and prompts.

use std::io::{self, Write};

use anyhow::Result;
use portal_core::forms::FieldError;
use portal_core::User;

/// Environment variable read instead of prompting for a password
pub const PASSWORD_ENV: &str = "PORTAL_PASSWORD";

pub fn home(user: &User) {
    println!("Hello, {}", user.first_name);
    println!("Signed in as {}. Run `portal signout` to sign out.", user.email);
}

pub fn signed_out() -> String {
    "Not signed in. Run `portal login` or `portal signup`.".to_string()
}

/// Success notice
pub fn notice(message: &str) {
    println!("{}", message);
}

/// Error notice
pub fn error(message: &str) {
    eprintln!("Error: {}", message);
}

pub fn field_errors(errors: &[FieldError]) {
    for e in errors {
        eprintln!("  {}", e);
    }
}

pub fn prompt(label: &str) -> Result<String> {
    print!("{}: ", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim_end_matches(['\r', '\n']).to_string())
}

/// Prompt with a default shown in brackets; empty input keeps the default
pub fn prompt_with_default(label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => {
            let input = prompt(&format!("{} [{}]", label, default))?;
            if input.trim().is_empty() {
                Ok(default.to_string())
            } else {
                Ok(input)
            }
        }
        None => prompt(label),
    }
}

pub fn prompt_password(label: &str) -> Result<String> {
    Ok(rpassword::prompt_password(format!("{}: ", label))?)
}

pub fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/N]", question))?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// The password from `PORTAL_PASSWORD`, if set
pub fn password_from_env() -> Option<String> {
    std::env::var(PASSWORD_ENV).ok().filter(|p| !p.is_empty())
}
