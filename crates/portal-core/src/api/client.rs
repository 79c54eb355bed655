//! API client for the user service REST API.
//!
//! This module provides the `ApiClient` struct for the public login call
//! and the bearer-authenticated user endpoints, including the
//! refresh-and-replay handling of expired access tokens.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error, info, warn};

use crate::auth::TokenStore;
use crate::models::{AuthenticatedUser, NewUser, SessionTokens, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when none is configured
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Refresh-and-replay cycles allowed for a single protected request.
const MAX_REFRESH_ATTEMPTS: u32 = 1;

const LOGIN_PATH: &str = "/users/login";
const USERS_PATH: &str = "/users";
const ME_PATH: &str = "/users/me";
pub(crate) const REFRESH_PATH: &str = "/users/refresh-token";

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshRequest<'a> {
    #[serde(rename = "refreshToken")]
    refresh_token: &'a str,
}

/// A request that can be dispatched more than once.
struct ApiRequest<'a> {
    method: Method,
    path: &'a str,
    body: Option<serde_json::Value>,
}

impl<'a> ApiRequest<'a> {
    fn get(path: &'a str) -> Self {
        Self {
            method: Method::GET,
            path,
            body: None,
        }
    }

    fn post<B: Serialize>(path: &'a str, body: &B) -> Result<Self, ApiError> {
        Ok(Self {
            method: Method::POST,
            path,
            body: Some(serde_json::to_value(body).map_err(|e| {
                ApiError::InvalidResponse(format!("Failed to encode request body: {}", e))
            })?),
        })
    }

    fn is_refresh(&self) -> bool {
        self.path == REFRESH_PATH
    }
}

/// API client for the user service.
/// Clone is cheap - reqwest::Client and TokenStore share state internally.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    tokens: TokenStore,
}

impl ApiClient {
    /// Create a new API client reading and writing tokens through `tokens`
    pub fn new(base_url: &str, tokens: TokenStore) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ===== Endpoints =====

    /// Exchange credentials for a user and token pair. Sent without a token.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, ApiError> {
        let request = ApiRequest::post(LOGIN_PATH, &LoginRequest { email, password })?;
        let response = self.dispatch(&request, None).await?;
        Self::parse(Self::check_response(response).await?).await
    }

    /// Create an account. Returns the new user and its token pair.
    pub async fn create_user(&self, new_user: &NewUser) -> Result<AuthenticatedUser, ApiError> {
        self.post(USERS_PATH, new_user).await
    }

    /// Fetch the user the stored access token belongs to
    pub async fn me(&self) -> Result<User, ApiError> {
        self.get(ME_PATH).await
    }

    /// Mint a new token pair. Never refreshed or replayed itself.
    pub async fn refresh_tokens(&self, refresh_token: &str) -> Result<SessionTokens, ApiError> {
        let request = ApiRequest::post(REFRESH_PATH, &RefreshRequest { refresh_token })?;
        let bearer = self.tokens.access_token().map_err(ApiError::Storage)?;
        let response = self.dispatch(&request, bearer.as_deref()).await?;
        Self::parse(Self::check_response(response).await?).await
    }

    // ===== Protected request helpers =====

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .execute(&ApiRequest::get(path), MAX_REFRESH_ATTEMPTS)
            .await?;
        Self::parse(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .execute(&ApiRequest::post(path, body)?, MAX_REFRESH_ATTEMPTS)
            .await?;
        Self::parse(response).await
    }

    /// Send a protected request, refreshing the token and replaying the
    /// request on 401 while `refreshes_left` allows.
    async fn execute(
        &self,
        request: &ApiRequest<'_>,
        mut refreshes_left: u32,
    ) -> Result<reqwest::Response, ApiError> {
        let mut bearer = self.tokens.access_token().map_err(ApiError::Storage)?;

        loop {
            let response = self.dispatch(request, bearer.as_deref()).await?;

            if response.status() != StatusCode::UNAUTHORIZED
                || refreshes_left == 0
                || request.is_refresh()
            {
                return Self::check_response(response).await;
            }

            refreshes_left -= 1;
            let original = Self::error_from(response).await;
            warn!(path = request.path, "Request unauthorized, attempting token refresh");

            let refresh_token = match self.tokens.refresh_token().map_err(ApiError::Storage)? {
                Some(token) => token,
                None => {
                    debug!("No refresh token stored");
                    return Err(original);
                }
            };

            let refreshed = match self.refresh_tokens(&refresh_token).await {
                Ok(tokens) => self
                    .tokens
                    .save(&tokens)
                    .map(|()| tokens)
                    .map_err(ApiError::Storage),
                Err(e) => Err(e),
            };

            match refreshed {
                Ok(tokens) => {
                    info!(path = request.path, "Token refreshed, replaying request");
                    bearer = Some(tokens.access_token);
                }
                Err(e) => {
                    // A failed save may have written only one of the pair
                    error!(error = %e, "Error while refreshing token");
                    if let Err(e) = self.tokens.clear() {
                        warn!(error = %e, "Failed to clear tokens after refresh failure");
                    }
                    return Err(original);
                }
            }
        }
    }

    /// Send one HTTP call, attaching `bearer` when given
    async fn dispatch(
        &self,
        request: &ApiRequest<'_>,
        bearer: Option<&str>,
    ) -> Result<reqwest::Response, ApiError> {
        debug!(
            method = %request.method,
            path = request.path,
            authenticated = bearer.is_some(),
            "Sending request"
        );

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(request.path));
        if let Some(token) = bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        Ok(builder.send().await?)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from(response).await)
        }
    }

    async fn error_from(response: reqwest::Response) -> ApiError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        ApiError::from_status(status, &body)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let url = response.url().to_string();
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", url, e))
        })
    }
}
