//! Pure projections of [`AuthState`] for the UI layer

use crate::models::UserIdentity;
use crate::state::AuthState;

pub fn select_user(state: &AuthState) -> Option<&UserIdentity> {
    state.user.as_ref()
}

pub fn select_is_authenticated(state: &AuthState) -> bool {
    state.is_authenticated
}

pub fn select_is_loading(state: &AuthState) -> bool {
    state.is_loading
}

pub fn select_auth_error(state: &AuthState) -> Option<&str> {
    state.error.as_deref()
}

pub fn has_permission(state: &AuthState, permission: &str) -> bool {
    state
        .user
        .as_ref()
        .is_some_and(|user| user.permissions.contains(permission))
}

pub fn has_role(state: &AuthState, role: &str) -> bool {
    state
        .user
        .as_ref()
        .is_some_and(|user| user.roles.contains(role))
}
