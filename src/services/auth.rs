//! Auth service
//!
//! Registration and login flows over the user repository.
//!
//! Registration collects every violated field into one `FieldErrors` map
//! instead of failing on the first problem. Login deliberately collapses
//! "unknown username" and "wrong password" into the same error so callers
//! cannot probe which accounts exist.

use crate::db::repositories::UserRepository;
use crate::models::{FieldErrors, User};
use crate::services::password::{hash_password, verify_password};
use anyhow::Context;
use std::sync::Arc;

/// Minimum accepted password length
const MIN_PASSWORD_LENGTH: usize = 8;

/// Passwords rejected outright. A short list of the usual suspects; the
/// check is case-insensitive.
const COMMON_PASSWORDS: &[&str] = &[
    "password", "password1", "password123", "123456", "12345678", "123456789",
    "1234567890", "qwerty", "qwerty123", "abc123", "iloveyou", "admin",
    "welcome", "welcome1", "monkey", "dragon", "letmein", "sunshine",
    "princess", "football", "baseball", "superman", "batman", "trustno1",
    "master", "shadow", "cosplay", "anime123", "naruto", "pikachu",
];

/// Error types for auth operations
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    /// One or more fields failed validation
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Credentials are wrong or the account does not exist.
    ///
    /// Both cases produce this same variant on purpose.
    #[error("invalid username or password")]
    Unauthorized,

    /// Internal error (storage failure)
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Input for user registration
#[derive(Debug, Clone)]
pub struct RegisterInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password2: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Input for user login
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

impl LoginInput {
    /// Create a new login input
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Auth service for registration and credential checks
pub struct AuthService {
    users: Arc<dyn UserRepository>,
}

impl AuthService {
    /// Create a new auth service
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    /// Register a new account.
    ///
    /// Validations, in order: username presence and uniqueness, email
    /// presence/format/uniqueness, password strength, password
    /// confirmation. Every violated field is reported in the error map.
    /// On success only the password hash is stored; no tokens are issued.
    pub async fn register(&self, input: RegisterInput) -> Result<User, AuthServiceError> {
        let mut errors = FieldErrors::new();

        let username = input.username.trim();
        if username.is_empty() {
            errors.push("username", "This field may not be blank.");
        } else if self
            .users
            .get_by_username(username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            errors.push("username", "A user with that username already exists.");
        }

        let email = input.email.trim();
        if email.is_empty() {
            errors.push("email", "This field may not be blank.");
        } else if !is_valid_email(email) {
            errors.push("email", "Enter a valid email address.");
        } else if self
            .users
            .get_by_email(email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            errors.push("email", "This email is already registered.");
        }

        for message in password_strength_errors(&input.password, username, email) {
            errors.push("password", message);
        }

        if input.password != input.password2 {
            errors.push("password", "The password fields didn't match.");
        }

        if !errors.is_empty() {
            return Err(AuthServiceError::Validation(errors));
        }

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;

        let user = User::new(
            username.to_string(),
            email.to_string(),
            password_hash,
            input.first_name.unwrap_or_default(),
            input.last_name.unwrap_or_default(),
        );

        let created = self
            .users
            .create(&user)
            .await
            .context("Failed to create user")?;

        Ok(created)
    }

    /// Check login credentials and return the account.
    ///
    /// Fails with `Unauthorized` for an unknown username and for a wrong
    /// password alike; the two are indistinguishable to the caller.
    pub async fn login(&self, input: LoginInput) -> Result<User, AuthServiceError> {
        let user = self
            .users
            .get_by_username(&input.username)
            .await
            .context("Failed to look up user")?
            .ok_or(AuthServiceError::Unauthorized)?;

        let valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;

        if !valid {
            return Err(AuthServiceError::Unauthorized);
        }

        Ok(user)
    }

    /// Get an account by id
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, AuthServiceError> {
        Ok(self
            .users
            .get_by_id(id)
            .await
            .context("Failed to get user")?)
    }
}

/// Collect password strength violations.
///
/// Mirrors the usual validator chain: minimum length, not entirely
/// numeric, not a common password, not too similar to the username or the
/// email local part.
fn password_strength_errors(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if password.len() < MIN_PASSWORD_LENGTH {
        messages.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        messages.push("This password is entirely numeric.".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        messages.push("This password is too common.".to_string());
    }

    if is_too_similar(&lowered, username) {
        messages.push("The password is too similar to the username.".to_string());
    } else if is_too_similar(&lowered, email.split('@').next().unwrap_or("")) {
        messages.push("The password is too similar to the email address.".to_string());
    }

    messages
}

/// Containment-based similarity check between a password and an account
/// attribute, case-insensitive. Short attributes are ignored to avoid
/// rejecting every password containing a two-letter username.
fn is_too_similar(lowered_password: &str, attribute: &str) -> bool {
    let attribute = attribute.to_lowercase();
    if attribute.len() < 4 || lowered_password.is_empty() {
        return false;
    }
    lowered_password.contains(&attribute) || attribute.contains(lowered_password)
}

/// Minimal structural email check: one '@' with a non-empty local part and
/// a domain containing a dot
fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    }
}
