//! User model
//!
//! Defines the `User` account entity. Role information is carried by the
//! `is_staff` / `is_superuser` flags; write access to the event catalogue
//! is restricted to superusers (see `api::permissions`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User entity representing a registered account.
///
/// The password hash is never serialized; API responses use an explicit
/// projection built in the handler layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: i64,
    /// Username (unique)
    pub username: String,
    /// Email address (unique)
    pub email: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// First name (optional, empty when not provided)
    #[serde(default)]
    pub first_name: String,
    /// Last name (optional, empty when not provided)
    #[serde(default)]
    pub last_name: String,
    /// Staff flag (may access the admin console)
    pub is_staff: bool,
    /// Superuser flag (unrestricted write access)
    pub is_superuser: bool,
    /// When a token pair was last issued for this account
    pub last_login: Option<DateTime<Utc>>,
    /// Account creation timestamp
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// Create a new regular account.
    ///
    /// The password must already be hashed; use
    /// `services::password::hash_password()`.
    pub fn new(
        username: String,
        email: String,
        password_hash: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            username,
            email,
            password_hash,
            first_name,
            last_name,
            is_staff: false,
            is_superuser: false,
            last_login: None,
            date_joined: Utc::now(),
        }
    }

    /// Create a superuser account (staff + superuser flags set)
    pub fn new_superuser(username: String, email: String, password_hash: String) -> Self {
        let mut user = Self::new(
            username,
            email,
            password_hash,
            String::new(),
            String::new(),
        );
        user.is_staff = true;
        user.is_superuser = true;
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new_defaults() {
        let user = User::new(
            "kira".to_string(),
            "kira@example.com".to_string(),
            "hash".to_string(),
            "Kira".to_string(),
            String::new(),
        );

        assert_eq!(user.id, 0);
        assert!(!user.is_staff);
        assert!(!user.is_superuser);
        assert!(user.last_login.is_none());
    }

    #[test]
    fn test_new_superuser_sets_flags() {
        let user = User::new_superuser(
            "admin".to_string(),
            "admin@example.com".to_string(),
            "hash".to_string(),
        );

        assert!(user.is_staff);
        assert!(user.is_superuser);
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new(
            "kira".to_string(),
            "kira@example.com".to_string(),
            "secret-hash".to_string(),
            String::new(),
            String::new(),
        );

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
