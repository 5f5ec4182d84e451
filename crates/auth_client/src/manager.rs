//! Session manager
//!
//! Owns the [`AuthState`], the token store and the auth endpoint binding.
//! Every async flow captures the session epoch before it goes to the network
//! and only applies its result if the epoch is unchanged; logout and any
//! session teardown bump the epoch so a late response can never resurrect a
//! cleared session or rewrite the token store.

use std::sync::Arc;

use chrono::Utc;
use devhub_core::Config;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::api::{AuthApi, HttpAuthApi, AUTH_PREFIX};
use crate::error::{RefreshFailure, Result, SessionError, ValidationError};
use crate::masking::mask_token;
use crate::models::{
    ActiveSession, ApiRequest, ApiResponse, AuthResponse, LoginHistoryPage, LoginRequest,
    OAuthCallbackRequest, OAuthProvider, ProfileUpdate, RegisterRequest, RegisteredUser,
    TokenPair, TwoFactorSetup, UserIdentity,
};
use crate::refresh::{RefreshGate, RefreshOutcome};
use crate::state::{AuthAction, AuthState, Session};
use crate::token_store::{FileTokenStore, TokenStore};
use crate::validation;

#[derive(Debug, Default)]
struct ManagedState {
    auth: AuthState,
    epoch: u64,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PermissionsBody {
    #[serde(default)]
    permissions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RolesBody {
    #[serde(default)]
    roles: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PermissionCheckBody {
    #[serde(default)]
    has_permission: bool,
}

pub struct SessionManager {
    api: Arc<dyn AuthApi>,
    store: Arc<dyn TokenStore>,
    state: RwLock<ManagedState>,
    refresh_gate: RefreshGate,
}

impl SessionManager {
    /// Create a manager with an empty session. Nothing is read from the store.
    pub fn new(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            store,
            state: RwLock::new(ManagedState::default()),
            refresh_gate: RefreshGate::new(),
        }
    }

    /// Create a manager and rehydrate any persisted token pair.
    ///
    /// Rehydrated tokens are not trusted until [`check_status`](Self::check_status)
    /// confirms them.
    pub async fn init(api: Arc<dyn AuthApi>, store: Arc<dyn TokenStore>) -> Result<Self> {
        let manager = Self::new(api, store);
        if let Some(tokens) = manager.store.load().await? {
            debug!(
                "Rehydrated persisted tokens (access {})",
                mask_token(&tokens.access_token)
            );
            manager
                .state
                .write()
                .await
                .auth
                .reduce(AuthAction::Rehydrated(tokens));
        }
        Ok(manager)
    }

    /// HTTP endpoints and a file token store, both taken from `config`
    pub async fn from_config(config: &Config) -> Result<Self> {
        let api = Arc::new(HttpAuthApi::new(config)?);
        let store = Arc::new(FileTokenStore::new(config.token_store_path()));
        Self::init(api, store).await
    }

    pub async fn state(&self) -> AuthState {
        self.state.read().await.auth.clone()
    }

    pub async fn session(&self) -> Option<Session> {
        self.state.read().await.auth.session()
    }

    pub fn is_refreshing(&self) -> bool {
        self.refresh_gate.is_refreshing()
    }

    pub async fn login(&self, username: &str, password: &str, remember_me: bool) -> Result<Session> {
        validation::validate_login(username, password)?;

        let epoch = {
            let mut state = self.state.write().await;
            state.auth.reduce(AuthAction::LoginPending);
            state.epoch
        };

        let request = LoginRequest {
            username: username.trim().to_string(),
            password: password.to_string(),
            remember_me,
        };
        let outcome = self.api.login(&request).await;
        self.finish_login(epoch, outcome, &request.username).await
    }

    /// Complete an OAuth sign-in with the code the provider redirected back with.
    pub async fn handle_oauth_callback(
        &self,
        provider: OAuthProvider,
        code: &str,
        oauth_state: Option<&str>,
    ) -> Result<Session> {
        if code.trim().is_empty() {
            return Err(ValidationError::new("code", "is required").into());
        }

        let epoch = {
            let mut state = self.state.write().await;
            state.auth.reduce(AuthAction::LoginPending);
            state.epoch
        };

        let request = OAuthCallbackRequest {
            code: code.to_string(),
            state: oauth_state.map(str::to_owned),
        };
        let outcome = self.api.oauth_callback(provider, &request).await;
        self.finish_login(epoch, outcome, provider.as_str()).await
    }

    pub fn oauth_login_url(&self, provider: OAuthProvider) -> String {
        self.api.oauth_login_url(provider)
    }

    async fn finish_login(
        &self,
        epoch: u64,
        outcome: Result<AuthResponse>,
        attempted_by: &str,
    ) -> Result<Session> {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            debug!("Discarding login result for a superseded session");
            return Err(SessionError::Superseded);
        }

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!("Login failed for {attempted_by}: {err}");
                state.auth.reduce(AuthAction::LoginRejected(err.to_string()));
                return Err(err);
            }
        };

        let tokens = response.tokens();
        if let Err(err) = self.store.save(&tokens).await {
            error!("Failed to persist tokens after login: {err}");
            state.auth.reduce(AuthAction::LoginRejected(err.to_string()));
            return Err(err);
        }

        info!("Logged in as {}", response.user.username);
        // A new session invalidates anything still in flight for the old one.
        state.epoch += 1;
        state.auth.reduce(AuthAction::LoginFulfilled {
            user: response.user,
            tokens,
            at: Utc::now(),
        });
        state.auth.session().ok_or(SessionError::NotAuthenticated)
    }

    /// Registration never authenticates the session.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> Result<RegisteredUser> {
        validation::validate_registration(username, email, password, confirm_password)?;

        self.begin_operation().await;
        let request = RegisterRequest {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            confirm_password: confirm_password.to_string(),
        };
        let outcome = self.api.register(&request).await;
        if outcome.is_ok() {
            info!("Registered account {username}");
        }
        self.settle_operation(outcome).await
    }

    /// Verify persisted tokens against `GET /me`.
    ///
    /// Never refreshes: any failure clears the store and the session.
    pub async fn check_status(&self) -> Result<Session> {
        let (access_token, epoch) = {
            let mut state = self.state.write().await;
            state.auth.reduce(AuthAction::CheckStatusPending);
            (state.auth.access_token().map(str::to_owned), state.epoch)
        };

        let Some(access_token) = access_token else {
            let mut state = self.state.write().await;
            self.clear_locked(&mut state, AuthAction::CheckStatusRejected)
                .await;
            return Err(SessionError::NotAuthenticated);
        };

        let request = ApiRequest::get(format!("{AUTH_PREFIX}/me"));
        let outcome = match self.api.send(&request, Some(&access_token)).await {
            Ok(response) if response.is_success() => response.json::<UserIdentity>(),
            Ok(response) if response.is_unauthorized() => Err(SessionError::NotAuthenticated),
            Ok(response) => Err(Self::api_error(&response)),
            Err(err) => Err(err),
        };

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return Err(SessionError::Superseded);
        }
        match outcome {
            Ok(user) => {
                debug!("Session restored for {}", user.username);
                state.auth.reduce(AuthAction::CheckStatusFulfilled(user));
                state.auth.session().ok_or(SessionError::NotAuthenticated)
            }
            Err(err) => {
                info!("Persisted session is no longer valid: {err}");
                self.clear_locked(&mut state, AuthAction::CheckStatusRejected)
                    .await;
                Err(err)
            }
        }
    }

    /// Rotate the token pair. Concurrent callers share one refresh.
    pub async fn refresh(&self) -> Result<TokenPair> {
        self.refresh_gate
            .run(move || self.perform_refresh(None))
            .await
            .map_err(SessionError::from)
    }

    /// Clear the session and notify the server. Never fails.
    pub async fn logout(&self) {
        let tokens = {
            let mut state = self.state.write().await;
            let tokens = state.auth.tokens.clone();
            self.clear_locked(&mut state, AuthAction::LoggedOut).await;
            tokens
        };
        info!("Logged out");

        if let Some(tokens) = tokens {
            if let Err(err) = self
                .api
                .logout(Some(&tokens.access_token), &tokens.refresh_token)
                .await
            {
                warn!("Logout notification failed: {err}");
            }
        }
    }

    /// Send `request` with the current access token.
    ///
    /// A 401 triggers at most one refresh and exactly one retry. A second
    /// 401 is [`SessionError::Unauthorized`]; other non-2xx statuses are
    /// [`SessionError::Api`].
    pub async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let access_token = self.current_access_token().await;
        let response = self.api.send(&request, access_token.as_deref()).await?;
        if !response.is_unauthorized() {
            return Self::into_result(response);
        }

        debug!("{} {} returned 401, refreshing", request.method, request.path);
        let retry_token = self.refresh_after_rejection(access_token).await?;
        let retried = self.api.send(&request, Some(&retry_token)).await?;
        if retried.is_unauthorized() {
            warn!(
                "{} {} still unauthorized after refresh",
                request.method, request.path
            );
            return Err(SessionError::Unauthorized);
        }
        Self::into_result(retried)
    }

    pub async fn execute_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        self.execute(request).await?.json()
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<UserIdentity> {
        let epoch = self.begin_operation().await;
        let request = ApiRequest::put(format!("{AUTH_PREFIX}/profile"), serde_json::to_value(update)?);
        let outcome = self.execute_json::<UserIdentity>(request).await;

        // A refresh failure has already torn the session down; surface it as is.
        if let Err(err @ SessionError::Refresh(_)) = outcome {
            return Err(err);
        }

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return Err(SessionError::Superseded);
        }
        match outcome {
            Ok(user) => {
                state.auth.reduce(AuthAction::ProfileUpdated(user.clone()));
                Ok(user)
            }
            Err(err) => {
                state.auth.reduce(AuthAction::OperationRejected(err.to_string()));
                Err(err)
            }
        }
    }

    pub async fn change_password(&self, old_password: &str, new_password: &str) -> Result<()> {
        if old_password.is_empty() {
            return Err(ValidationError::new("oldPassword", "is required").into());
        }
        validation::validate_password("newPassword", new_password)?;

        self.begin_operation().await;
        let request = ApiRequest::put(
            format!("{AUTH_PREFIX}/password"),
            json!({ "oldPassword": old_password, "newPassword": new_password }),
        );
        let outcome = self.execute(request).await.map(|_| ());
        self.settle_operation(outcome).await
    }

    /// Returns the server's confirmation message, if any.
    pub async fn forgot_password(&self, email: &str) -> Result<String> {
        validation::validate_email(email)?;
        self.message_call(ApiRequest::post(
            format!("{AUTH_PREFIX}/forgot-password"),
            json!({ "email": email }),
        ))
        .await
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<String> {
        if token.trim().is_empty() {
            return Err(ValidationError::new("token", "is required").into());
        }
        validation::validate_password("newPassword", new_password)?;
        self.message_call(ApiRequest::post(
            format!("{AUTH_PREFIX}/reset-password"),
            json!({ "token": token, "newPassword": new_password }),
        ))
        .await
    }

    pub async fn verify_email(&self, token: &str) -> Result<String> {
        if token.trim().is_empty() {
            return Err(ValidationError::new("token", "is required").into());
        }
        self.message_call(ApiRequest::post(
            format!("{AUTH_PREFIX}/verify-email"),
            json!({ "token": token }),
        ))
        .await
    }

    pub async fn fetch_permissions(&self) -> Result<Vec<String>> {
        let body: PermissionsBody = self
            .execute_json(ApiRequest::get(format!("{AUTH_PREFIX}/permissions")))
            .await?;
        Ok(body.permissions)
    }

    pub async fn fetch_roles(&self) -> Result<Vec<String>> {
        let body: RolesBody = self
            .execute_json(ApiRequest::get(format!("{AUTH_PREFIX}/roles")))
            .await?;
        Ok(body.roles)
    }

    /// Ask the server whether the signed-in user holds `permission`.
    ///
    /// Any failure answers `false`.
    pub async fn check_permission(&self, permission: &str) -> bool {
        if permission.trim().is_empty() {
            return false;
        }
        let request = ApiRequest::get(format!("{AUTH_PREFIX}/permissions/check"))
            .with_query("permission", permission);
        match self.execute_json::<PermissionCheckBody>(request).await {
            Ok(body) => body.has_permission,
            Err(err) => {
                debug!("Permission check for {permission} failed: {err}");
                false
            }
        }
    }

    pub async fn resend_verification_email(&self) -> Result<String> {
        self.message_call(ApiRequest::new(
            Method::POST,
            format!("{AUTH_PREFIX}/resend-verification"),
        ))
        .await
    }

    /// Start two-factor enrolment. Nothing changes until the code is verified.
    pub async fn enable_two_factor(&self) -> Result<TwoFactorSetup> {
        self.begin_operation().await;
        let outcome = self
            .execute_json::<TwoFactorSetup>(ApiRequest::new(
                Method::POST,
                format!("{AUTH_PREFIX}/2fa/enable"),
            ))
            .await;
        self.settle_operation(outcome).await
    }

    pub async fn verify_two_factor(&self, code: &str) -> Result<String> {
        self.two_factor_call("/2fa/verify", code, true).await
    }

    pub async fn disable_two_factor(&self, code: &str) -> Result<String> {
        self.two_factor_call("/2fa/disable", code, false).await
    }

    /// `page` starts at 1.
    pub async fn login_history(&self, page: u32, size: u32) -> Result<LoginHistoryPage> {
        if page == 0 {
            return Err(ValidationError::new("page", "must be at least 1").into());
        }
        if size == 0 {
            return Err(ValidationError::new("size", "must be at least 1").into());
        }
        self.execute_json(
            ApiRequest::get(format!("{AUTH_PREFIX}/login-history"))
                .with_query("page", page)
                .with_query("size", size),
        )
        .await
    }

    pub async fn active_sessions(&self) -> Result<Vec<ActiveSession>> {
        self.execute_json(ApiRequest::get(format!("{AUTH_PREFIX}/sessions")))
            .await
    }

    pub async fn revoke_session(&self, session_id: &str) -> Result<String> {
        if session_id.is_empty() || session_id.contains(&['/', '?', '#'][..]) {
            return Err(ValidationError::new("sessionId", "is not a valid session id").into());
        }
        self.message_call(ApiRequest::delete(format!(
            "{AUTH_PREFIX}/sessions/{session_id}"
        )))
        .await
    }

    /// Sign out every device. The local session is left to the next 401.
    pub async fn revoke_all_sessions(&self) -> Result<String> {
        self.message_call(ApiRequest::new(
            Method::POST,
            format!("{AUTH_PREFIX}/revoke-sessions"),
        ))
        .await
    }

    pub async fn clear_error(&self) {
        self.state.write().await.auth.reduce(AuthAction::ClearError);
    }

    /// Drop in-memory state and invalidate in-flight flows. The token store is
    /// kept so the next process start can rehydrate.
    pub async fn dispose(&self) {
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.auth = AuthState::default();
        debug!("Session manager disposed");
    }

    async fn current_access_token(&self) -> Option<String> {
        self.state
            .read()
            .await
            .auth
            .access_token()
            .map(str::to_owned)
    }

    async fn refresh_after_rejection(&self, failed_token: Option<String>) -> Result<String> {
        let tokens = self
            .refresh_gate
            .run(move || self.perform_refresh(failed_token))
            .await?;
        Ok(tokens.access_token)
    }

    /// Leader body of the refresh gate.
    ///
    /// With `failed_token` set, a pair that was already rotated by another
    /// flow is returned without a network call.
    async fn perform_refresh(&self, failed_token: Option<String>) -> RefreshOutcome {
        let (current, epoch) = {
            let state = self.state.read().await;
            (state.auth.tokens.clone(), state.epoch)
        };

        if let (Some(failed), Some(current)) = (failed_token.as_deref(), current.as_ref()) {
            if current.access_token != failed {
                debug!("Access token already rotated, reusing current pair");
                return Ok(current.clone());
            }
        }

        let Some(refresh_token) = current.map(|tokens| tokens.refresh_token) else {
            return self
                .expire_session(epoch, RefreshFailure::MissingRefreshToken)
                .await;
        };

        debug!("Refreshing access token with {}", mask_token(&refresh_token));
        match self.api.refresh(&refresh_token).await {
            Ok(response) => {
                let tokens = TokenPair::new(
                    response.access_token,
                    response.refresh_token.unwrap_or(refresh_token),
                );

                let mut state = self.state.write().await;
                if state.epoch != epoch {
                    debug!("Discarding refreshed tokens for a superseded session");
                    return Err(RefreshFailure::Superseded);
                }
                if let Err(err) = self.store.save(&tokens).await {
                    error!("Failed to persist refreshed tokens: {err}");
                }
                state.auth.reduce(AuthAction::TokensRefreshed(tokens.clone()));
                info!("Access token refreshed ({})", mask_token(&tokens.access_token));
                Ok(tokens)
            }
            Err(err) => {
                let failure = match err {
                    SessionError::Refresh(failure) => failure,
                    other => RefreshFailure::Transport(other.to_string()),
                };
                self.expire_session(epoch, failure).await
            }
        }
    }

    async fn expire_session(&self, epoch: u64, failure: RefreshFailure) -> RefreshOutcome {
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return Err(RefreshFailure::Superseded);
        }
        warn!("{failure}; clearing session");
        self.clear_locked(&mut state, AuthAction::RefreshRejected)
            .await;
        Err(failure)
    }

    /// Tear down the session while the caller holds the state lock.
    async fn clear_locked(&self, state: &mut ManagedState, action: AuthAction) {
        state.epoch += 1;
        if let Err(err) = self.store.clear().await {
            error!("Failed to clear token store: {err}");
        }
        state.auth.reduce(action);
    }

    async fn begin_operation(&self) -> u64 {
        let mut state = self.state.write().await;
        state.auth.reduce(AuthAction::OperationPending);
        state.epoch
    }

    async fn settle_operation<T>(&self, outcome: Result<T>) -> Result<T> {
        let mut state = self.state.write().await;
        match &outcome {
            Ok(_) => state.auth.reduce(AuthAction::OperationSettled),
            Err(err) => state.auth.reduce(AuthAction::OperationRejected(err.to_string())),
        }
        outcome
    }

    async fn two_factor_call(&self, endpoint: &str, code: &str, enabled: bool) -> Result<String> {
        if code.trim().is_empty() {
            return Err(ValidationError::new("code", "is required").into());
        }
        let message = self
            .message_call(ApiRequest::post(
                format!("{AUTH_PREFIX}{endpoint}"),
                json!({ "code": code.trim() }),
            ))
            .await?;
        self.state
            .write()
            .await
            .auth
            .reduce(AuthAction::TwoFactorToggled(enabled));
        Ok(message)
    }

    async fn message_call(&self, request: ApiRequest) -> Result<String> {
        self.begin_operation().await;
        let outcome = self
            .execute_json::<MessageBody>(request)
            .await
            .map(|body| body.message.unwrap_or_default());
        self.settle_operation(outcome).await
    }

    fn into_result(response: ApiResponse) -> Result<ApiResponse> {
        if response.is_success() {
            Ok(response)
        } else {
            Err(Self::api_error(&response))
        }
    }

    fn api_error(response: &ApiResponse) -> SessionError {
        SessionError::Api {
            status: response.status,
            message: response.error_message(),
        }
    }
}
