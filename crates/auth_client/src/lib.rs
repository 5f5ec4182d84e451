//! # Auth Client
//!
//! Owns the authentication session of the DevHub client: login, registration,
//! token persistence, single-flight token refresh and the request decorator
//! that transparently re-authenticates outbound calls.

pub mod api;
pub mod error;
pub mod manager;
pub mod masking;
pub mod models;
mod refresh;
pub mod selectors;
pub mod state;
pub mod token_store;
pub mod validation;

// Re-exports
pub use api::{AuthApi, HttpAuthApi};
pub use devhub_core::Config;
pub use error::{AuthError, RefreshFailure, Result, SessionError, ValidationError};
pub use manager::SessionManager;
pub use models::{
    ActiveSession, ApiRequest, ApiResponse, AuthResponse, LoginHistoryEntry, LoginHistoryPage,
    OAuthProvider, ProfileUpdate, RefreshResponse, RegisteredUser, TokenPair, TwoFactorSetup,
    UserIdentity,
};
pub use state::{AuthAction, AuthState, Session};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
