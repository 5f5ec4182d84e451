//! Authentication state and its reducer
//!
//! Every change to [`AuthState`] is expressed as an [`AuthAction`] and applied
//! by [`AuthState::reduce`]; the match is exhaustive so an action can never be
//! silently dropped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{TokenPair, UserIdentity};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthState {
    pub user: Option<UserIdentity>,
    #[serde(skip)]
    pub tokens: Option<TokenPair>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub login_time: Option<DateTime<Utc>>,
}

/// Snapshot of an authenticated session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: UserIdentity,
    pub tokens: TokenPair,
    pub login_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthAction {
    /// Tokens found in the store at startup, not yet verified
    Rehydrated(TokenPair),

    LoginPending,
    LoginFulfilled {
        user: UserIdentity,
        tokens: TokenPair,
        at: DateTime<Utc>,
    },
    LoginRejected(String),

    CheckStatusPending,
    CheckStatusFulfilled(UserIdentity),
    CheckStatusRejected,

    TokensRefreshed(TokenPair),
    RefreshRejected,

    LoggedOut,

    /// Register, profile update and password change share the same loading/error shape
    OperationPending,
    OperationSettled,
    OperationRejected(String),

    ProfileUpdated(UserIdentity),
    TwoFactorToggled(bool),

    ClearError,
}

impl AuthState {
    pub fn reduce(&mut self, action: AuthAction) {
        match action {
            AuthAction::Rehydrated(tokens) => {
                self.tokens = Some(tokens);
                self.is_authenticated = false;
            }
            AuthAction::LoginPending => {
                self.is_loading = true;
                self.error = None;
            }
            AuthAction::LoginFulfilled { user, tokens, at } => {
                self.is_loading = false;
                self.is_authenticated = true;
                self.user = Some(user);
                self.tokens = Some(tokens);
                self.login_time = Some(at);
                self.error = None;
            }
            // A failed attempt leaves any existing session as it was.
            AuthAction::LoginRejected(message) => {
                self.is_loading = false;
                self.error = Some(message);
            }
            AuthAction::CheckStatusPending => {
                self.is_loading = true;
            }
            AuthAction::CheckStatusFulfilled(user) => {
                self.is_loading = false;
                self.is_authenticated = true;
                self.user = Some(user);
                self.error = None;
            }
            AuthAction::CheckStatusRejected => {
                self.is_loading = false;
                self.clear_session();
            }
            AuthAction::TokensRefreshed(tokens) => {
                self.tokens = Some(tokens);
            }
            AuthAction::RefreshRejected => {
                self.is_loading = false;
                self.clear_session();
            }
            AuthAction::LoggedOut => {
                self.clear_session();
                self.is_loading = false;
                self.error = None;
            }
            AuthAction::OperationPending => {
                self.is_loading = true;
                self.error = None;
            }
            AuthAction::OperationSettled => {
                self.is_loading = false;
            }
            AuthAction::OperationRejected(message) => {
                self.is_loading = false;
                self.error = Some(message);
            }
            AuthAction::ProfileUpdated(user) => {
                self.is_loading = false;
                self.user = Some(user);
            }
            AuthAction::TwoFactorToggled(enabled) => {
                if let Some(user) = self.user.as_mut() {
                    user.two_factor_enabled = enabled;
                }
            }
            AuthAction::ClearError => {
                self.error = None;
            }
        }
    }

    fn clear_session(&mut self) {
        self.user = None;
        self.tokens = None;
        self.is_authenticated = false;
        self.login_time = None;
    }

    pub fn access_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.access_token.as_str())
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.tokens.as_ref().map(|t| t.refresh_token.as_str())
    }

    /// `Some` only while authenticated with a known user and token pair
    pub fn session(&self) -> Option<Session> {
        if !self.is_authenticated {
            return None;
        }
        Some(Session {
            user: self.user.clone()?,
            tokens: self.tokens.clone()?,
            login_time: self.login_time,
        })
    }
}
