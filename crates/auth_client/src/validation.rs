//! Client-side validation. Every check here runs before a request is built,
//! so a failing form never reaches the network.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;

static USERNAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid username regex"));

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$")
        .expect("valid email regex")
});

const USERNAME_MIN: usize = 3;
const USERNAME_MAX: usize = 20;
const PASSWORD_MIN: usize = 8;

pub fn validate_login(username: &str, password: &str) -> Result<(), ValidationError> {
    if username.trim().is_empty() {
        return Err(ValidationError::new("username", "is required"));
    }
    if password.is_empty() {
        return Err(ValidationError::new("password", "is required"));
    }
    Ok(())
}

pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(USERNAME_MIN..=USERNAME_MAX).contains(&len) {
        return Err(ValidationError::new(
            "username",
            format!("must be {USERNAME_MIN}-{USERNAME_MAX} characters"),
        ));
    }
    if !USERNAME_PATTERN.is_match(username) {
        return Err(ValidationError::new(
            "username",
            "may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationError::new("email", "is not a valid address"));
    }
    Ok(())
}

/// Password rule shared by registration, password change and reset.
pub fn validate_password(field: &'static str, password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < PASSWORD_MIN {
        return Err(ValidationError::new(
            field,
            format!("must be at least {PASSWORD_MIN} characters"),
        ));
    }
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !(has_upper && has_lower && has_digit) {
        return Err(ValidationError::new(
            field,
            "must contain an uppercase letter, a lowercase letter and a digit",
        ));
    }
    Ok(())
}

/// Fields are checked in form order; the first violation wins.
pub fn validate_registration(
    username: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    validate_username(username)?;
    validate_email(email)?;
    validate_password("password", password)?;
    if confirm_password != password {
        return Err(ValidationError::new("confirmPassword", "does not match password"));
    }
    Ok(())
}
