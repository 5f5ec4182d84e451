//! Endpoint contract consumed by the session manager

mod client;

pub use client::HttpAuthApi;

use async_trait::async_trait;

use crate::error::{AuthError, Result};
use crate::models::{
    ApiRequest, ApiResponse, AuthResponse, LoginRequest, OAuthCallbackRequest, OAuthProvider,
    RefreshResponse, RegisterRequest, RegisteredUser,
};

/// Path prefix of the auth service
pub const AUTH_PREFIX: &str = "/api/auth";

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /login`. Non-2xx maps to [`crate::AuthError`].
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse>;

    /// `POST /register`
    async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser>;

    /// `POST /refresh`. A rejected token maps to [`crate::RefreshFailure::Rejected`].
    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse>;

    /// `POST /logout`
    async fn logout(&self, access_token: Option<&str>, refresh_token: &str) -> Result<()>;

    /// Send an arbitrary request with an optional bearer token.
    ///
    /// Returns every HTTP status as data; only transport failures are errors.
    async fn send(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<ApiResponse>;

    /// `POST /oauth/{provider}/callback`. Answers like `login`.
    async fn oauth_callback(
        &self,
        provider: OAuthProvider,
        request: &OAuthCallbackRequest,
    ) -> Result<AuthResponse> {
        let request = ApiRequest::post(
            format!("{AUTH_PREFIX}/oauth/{provider}/callback"),
            serde_json::to_value(request)?,
        );
        let response = self.send(&request, None).await?;
        if !response.is_success() {
            return Err(AuthError::from_status(response.status, response.error_message()).into());
        }
        response.json()
    }

    /// Where the browser is sent to start an OAuth sign-in
    fn oauth_login_url(&self, provider: OAuthProvider) -> String {
        format!("{AUTH_PREFIX}/oauth/{provider}")
    }
}
