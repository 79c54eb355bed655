//! Client-side validation for the login and signup forms.
//!
//! Validation reports every failing field, in form order, so a view can
//! show all messages at once. Values are trimmed before checking and the
//! trimmed values are what gets sent.

use std::fmt;

use crate::models::NewUser;

/// Minimum password length, counted after trimming
pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    FirstName,
    LastName,
    Email,
    Password,
    PasswordConfirmation,
    Terms,
}

impl Field {
    pub fn label(&self) -> &'static str {
        match self {
            Field::FirstName => "First name",
            Field::LastName => "Last name",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::PasswordConfirmation => "Password confirmation",
            Field::Terms => "Terms",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub message: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field.label(), self.message)
    }
}

/// Validated login credentials
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, Vec<FieldError>> {
        let mut errors = Vec::new();
        let email = check_email(&self.email, &mut errors);
        let password = check_password(&self.password, &mut errors);

        if errors.is_empty() {
            Ok(Credentials { email, password })
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub accepted_terms: bool,
}

impl SignupForm {
    pub fn validate(&self) -> Result<NewUser, Vec<FieldError>> {
        let mut errors = Vec::new();

        let first_name = self.first_name.trim().to_string();
        if first_name.is_empty() {
            errors.push(FieldError {
                field: Field::FirstName,
                message: "First name is required",
            });
        }
        let last_name = self.last_name.trim().to_string();
        if last_name.is_empty() {
            errors.push(FieldError {
                field: Field::LastName,
                message: "Last name is required",
            });
        }

        let email = check_email(&self.email, &mut errors);
        let password = check_password(&self.password, &mut errors);

        if self.password_confirmation.trim() != password {
            errors.push(FieldError {
                field: Field::PasswordConfirmation,
                message: "Passwords do not match",
            });
        }
        if !self.accepted_terms {
            errors.push(FieldError {
                field: Field::Terms,
                message: "You must accept the terms of use and privacy policy",
            });
        }

        if errors.is_empty() {
            Ok(NewUser {
                first_name,
                last_name,
                email,
                password,
            })
        } else {
            Err(errors)
        }
    }
}

fn check_email(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let email = raw.trim().to_string();
    if email.is_empty() {
        errors.push(FieldError {
            field: Field::Email,
            message: "Email is required",
        });
    } else if !is_valid_email(&email) {
        errors.push(FieldError {
            field: Field::Email,
            message: "Email is invalid",
        });
    }
    email
}

fn check_password(raw: &str, errors: &mut Vec<FieldError>) -> String {
    let password = raw.trim().to_string();
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(FieldError {
            field: Field::Password,
            message: "Password must be at least 6 characters",
        });
    }
    password
}

/// Loose address check: `local@domain.tld`, no whitespace, alphabetic TLD.
pub fn is_valid_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || s.chars().any(char::is_whitespace) {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty() || l.starts_with('-')) {
        return false;
    }
    labels
        .last()
        .map(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false)
}
