use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use devhub_core::Config;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{AuthApi, AUTH_PREFIX};
use crate::error::{AuthError, RefreshFailure, Result, SessionError};
use crate::models::{
    ApiRequest, ApiResponse, AuthResponse, LoginRequest, OAuthCallbackRequest, OAuthProvider,
    RefreshResponse, RegisterRequest, RegisterResponse, RegisteredUser,
};

/// HTTP binding of [`AuthApi`] on top of `reqwest-middleware`.
///
/// Login and refresh go through `single_shot`, which never carries the retry
/// middleware: a refresh token is consumed by the first attempt that reaches
/// the server.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Arc<ClientWithMiddleware>,
    single_shot: Arc<ClientWithMiddleware>,
    base_url: String,
}

impl HttpAuthApi {
    pub fn new(config: &Config) -> Result<Self> {
        let http = Self::build_http_client(config)?;
        let single_shot = ClientBuilder::new(http.clone()).build();
        let client = Self::build_middleware_client(http, config.max_retries);
        Ok(Self::with_clients(client, single_shot, config.api_base_url()))
    }

    /// Use `client` for every call.
    pub fn with_client(client: ClientWithMiddleware, base_url: impl Into<String>) -> Self {
        Self::with_clients(client.clone(), client, base_url)
    }

    pub fn with_clients(
        client: ClientWithMiddleware,
        single_shot: ClientWithMiddleware,
        base_url: impl Into<String>,
    ) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: Arc::new(client),
            single_shot: Arc::new(single_shot),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_http_client(config: &Config) -> Result<Client> {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| SessionError::Network(format!("Failed to build HTTP client: {e}")))
    }

    fn build_middleware_client(client: Client, max_retries: u32) -> ClientWithMiddleware {
        let builder = ClientBuilder::new(client);
        if max_retries == 0 {
            return builder.build();
        }

        // Transient failures only (5xx, connect errors); 401 is never retried here.
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(max_retries);
        builder
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn auth_path(endpoint: &str) -> String {
        format!("{AUTH_PREFIX}{endpoint}")
    }

    async fn dispatch(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<ApiResponse> {
        self.dispatch_with(&self.client, request, access_token).await
    }

    async fn dispatch_with(
        &self,
        client: &ClientWithMiddleware,
        request: &ApiRequest,
        access_token: Option<&str>,
    ) -> Result<ApiResponse> {
        let url = self.url(&request.path);
        let mut builder = client
            .request(request.method.clone(), &url)
            .header("Accept", "application/json");

        if let Some(token) = access_token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!("Sending {} {}", request.method, url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await?;

        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        debug!("{} {} -> HTTP {}", request.method, url, status);

        Ok(ApiResponse { status, body })
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse> {
        let body = serde_json::to_value(request)?;
        let request = ApiRequest::post(Self::auth_path("/login"), body);
        let response = self.dispatch_with(&self.single_shot, &request, None).await?;

        if !response.is_success() {
            return Err(AuthError::from_status(response.status, response.error_message()).into());
        }
        response.json()
    }

    async fn register(&self, request: &RegisterRequest) -> Result<RegisteredUser> {
        let body = serde_json::to_value(request)?;
        let response = self
            .dispatch(&ApiRequest::post(Self::auth_path("/register"), body), None)
            .await?;

        if !response.is_success() {
            return Err(AuthError::from_status(response.status, response.error_message()).into());
        }
        let registered: RegisterResponse = response.json()?;
        if let Some(message) = &registered.message {
            debug!("Registration accepted: {message}");
        }
        Ok(registered.user)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<RefreshResponse> {
        let request = ApiRequest::post(
            Self::auth_path("/refresh"),
            json!({ "refreshToken": refresh_token }),
        );
        let response = self.dispatch_with(&self.single_shot, &request, None).await?;

        if !response.is_success() {
            return Err(RefreshFailure::Rejected(response.error_message()).into());
        }
        response.json()
    }

    async fn logout(&self, access_token: Option<&str>, refresh_token: &str) -> Result<()> {
        let request = ApiRequest::post(
            Self::auth_path("/logout"),
            json!({ "refreshToken": refresh_token }),
        );
        let response = self.dispatch(&request, access_token).await?;

        if !response.is_success() {
            warn!("Logout returned HTTP {}", response.status);
            return Err(AuthError::from_status(response.status, response.error_message()).into());
        }
        Ok(())
    }

    async fn send(&self, request: &ApiRequest, access_token: Option<&str>) -> Result<ApiResponse> {
        self.dispatch(request, access_token).await
    }

    async fn oauth_callback(
        &self,
        provider: OAuthProvider,
        request: &OAuthCallbackRequest,
    ) -> Result<AuthResponse> {
        let request = ApiRequest::post(
            Self::auth_path(&format!("/oauth/{provider}/callback")),
            serde_json::to_value(request)?,
        );
        let response = self.dispatch_with(&self.single_shot, &request, None).await?;

        if !response.is_success() {
            return Err(AuthError::from_status(response.status, response.error_message()).into());
        }
        response.json()
    }

    fn oauth_login_url(&self, provider: OAuthProvider) -> String {
        self.url(&Self::auth_path(&format!("/oauth/{provider}")))
    }
}
