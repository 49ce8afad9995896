pub mod extractors;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::User;

// Re-export necessary items
pub use extractors::AuthenticatedUser;
pub use middleware::AuthMiddleware;
pub use password::{hash_password, verify_password};
pub use token::{generate_token, verify_token, Claims};

lazy_static! {
    // Normalized usernames: lowercase alphanumeric, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-z0-9_-]+$").unwrap();
}

/// Canonical form of a username: surrounding whitespace trimmed, lowercased.
///
/// Uniqueness is enforced on this form, so `" Alice "` and `"alice"` are the same account.
pub fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Represents the payload for a user login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new user registration request.
///
/// Validate after [`RegisterRequest::normalize`], so the username rules apply to the stored form.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    /// 3 to 32 characters; lowercase letters, digits, underscores or hyphens once normalized.
    #[validate(
        length(min = 3, max = 32),
        regex(
            path = "USERNAME_REGEX",
            message = "Username must be alphanumeric, underscores, or hyphens"
        )
    )]
    pub username: String,
    /// Must be at least 6 characters long.
    #[validate(length(min = 6, max = 72))]
    pub password: String,
}

impl RegisterRequest {
    pub fn normalize(mut self) -> Self {
        self.username = normalize_username(&self.username);
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self
    }
}

/// Response structure after successful authentication (login or registration).
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    /// The JWT for session authentication.
    pub token: String,
    pub user: User,
}

/// Result of `GET /api/auth/check-username/{username}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct UsernameAvailability {
    pub username: String,
    pub available: bool,
}
