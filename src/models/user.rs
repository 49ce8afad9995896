use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Column list matching [`User`]'s `FromRow` layout.
pub const USER_COLUMNS: &str =
    "id, first_name, last_name, username, password_hash, image_url, bio, created_at";

/// A user account as stored in the `users` table.
///
/// The password hash is loaded for login checks but never serialized.
#[derive(Debug, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    /// Always the normalized (trimmed, lowercased) form.
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub image_url: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for `PUT /api/users/{username}`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(length(max = 500))]
    pub bio: Option<String>,
}

impl UpdateProfileRequest {
    /// Trims the names and drops a blank bio. Validate after this.
    pub fn normalize(mut self) -> Self {
        self.first_name = self.first_name.trim().to_string();
        self.last_name = self.last_name.trim().to_string();
        self.bio = self
            .bio
            .map(|bio| bio.trim().to_string())
            .filter(|bio| !bio.is_empty());
        self
    }
}
