//! User model for storage and API.

use argon2::{
    password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// A stored media asset: the provider id used for later deletion plus the
/// durable URL served to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAsset {
    pub public_id: String,
    pub url: String,
}

/// User profile stored in Firestore.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Document id (UUID v4)
    pub id: String,
    /// Unique handle, always stored lowercase
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Display name
    pub full_name: String,
    /// Argon2 PHC string; excluded from every API projection
    pub password_hash: String,
    /// Avatar image (required at registration)
    pub avatar: MediaAsset,
    /// Optional cover image
    pub cover_image: Option<MediaAsset>,
    /// Currently valid refresh token; None once logged out or revoked
    pub refresh_token: Option<String>,
    /// Ordered video ids, oldest first
    pub watch_history: Vec<String>,
    /// When the account was created (RFC3339)
    pub created_at: String,
    /// Last mutation timestamp (RFC3339)
    pub updated_at: String,
}

impl User {
    /// Check a plaintext password against the stored argon2 hash.
    pub fn verify_password(&self, password: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(&self.password_hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid stored password hash: {e}")))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to hash password: {e}")))
}

/// User projection with credential material removed. This is the shape
/// every handler returns; `password_hash` and `refresh_token` never leave
/// the store layer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub avatar: MediaAsset,
    pub cover_image: Option<MediaAsset>,
    pub created_at: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            avatar: user.avatar.clone(),
            cover_image: user.cover_image.clone(),
            created_at: user.created_at.clone(),
        }
    }
}

/// Channel view of a user, with subscription aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub username: String,
    pub subscribers_count: u64,
    pub channel_subscribed_to_count: u64,
    /// Whether the requesting identity (if any) subscribes to this channel
    pub is_subscribed: bool,
    pub avatar: MediaAsset,
    pub cover_image: Option<MediaAsset>,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_user(password: &str) -> User {
        User {
            id: "u-1".to_string(),
            username: "jane".to_string(),
            email: "jane@x.com".to_string(),
            full_name: "Jane Doe".to_string(),
            password_hash: hash_password(password).unwrap(),
            avatar: MediaAsset {
                public_id: "a1".to_string(),
                url: "https://cdn.example.com/a1.png".to_string(),
            },
            cover_image: None,
            refresh_token: None,
            watch_history: vec![],
            created_at: "2026-01-01T00:00:00Z".to_string(),
            updated_at: "2026-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_password_verify_roundtrip() {
        let user = test_user("secret1");
        assert!(user.verify_password("secret1").unwrap());
        assert!(!user.verify_password("secret2").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let a = hash_password("secret1").unwrap();
        let b = hash_password("secret1").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_public_user_omits_credentials() {
        let mut user = test_user("secret1");
        user.refresh_token = Some("some.jwt.value".to_string());

        let json = serde_json::to_value(PublicUser::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("refreshToken").is_none());
        assert_eq!(json["fullName"], "Jane Doe");
    }
}
