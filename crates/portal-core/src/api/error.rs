use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Access denied: {detail}")]
    AccessDenied { detail: String, message: Option<String> },

    #[error("Unauthorized - token may be expired")]
    Unauthorized { message: Option<String> },

    #[error("Resource not found: {detail}")]
    NotFound { detail: String, message: Option<String> },

    #[error("Conflict: {detail}")]
    Conflict { detail: String, message: Option<String> },

    #[error("Rate limited - please wait before retrying")]
    RateLimited { message: Option<String> },

    #[error("Server error: {detail}")]
    ServerError { detail: String, message: Option<String> },

    #[error("Unexpected status {status}: {detail}")]
    Status {
        status: reqwest::StatusCode,
        detail: String,
        message: Option<String>,
    },

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Token storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Pull `message` out of a JSON error body, if there is one.
    fn extract_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.message)
            .filter(|m| !m.trim().is_empty())
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = Self::extract_message(body);
        let detail = message.clone().unwrap_or_else(|| Self::truncate_body(body));
        match status.as_u16() {
            401 => ApiError::Unauthorized { message },
            403 => ApiError::AccessDenied { detail, message },
            404 => ApiError::NotFound { detail, message },
            409 => ApiError::Conflict { detail, message },
            429 => ApiError::RateLimited { message },
            500..=599 => ApiError::ServerError { detail, message },
            _ => ApiError::Status {
                status,
                detail,
                message,
            },
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized { .. })
    }

    /// The `message` the server sent with an error status, if any
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ApiError::AccessDenied { message, .. }
            | ApiError::Unauthorized { message }
            | ApiError::NotFound { message, .. }
            | ApiError::Conflict { message, .. }
            | ApiError::RateLimited { message }
            | ApiError::ServerError { message, .. }
            | ApiError::Status { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        if let Some(message) = self.server_message() {
            return message.to_string();
        }
        match self {
            ApiError::Unauthorized { .. } => "Invalid email or password".to_string(),
            ApiError::NetworkError(e) if e.is_timeout() => {
                "Connection timed out. Please try again.".to_string()
            }
            ApiError::NetworkError(_) => {
                "Unable to connect to server. Check your internet connection.".to_string()
            }
            other => other.to_string(),
        }
    }
}
