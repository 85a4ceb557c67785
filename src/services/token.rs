// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Access/refresh token issuance and verification.
//!
//! Access tokens are short-lived and carry enough identity to answer
//! `/current-user` without a store read. Refresh tokens carry only the
//! user id and are mirrored onto the user document: a presented refresh
//! token is valid only while it equals the stored value, so rotation
//! invalidates the previous token by overwrite rather than a denylist.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::FirestoreDb;
use crate::error::AppError;
use crate::models::User;
use crate::time_utils;

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// User id
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "fullName")]
    pub full_name: String,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// Claims carried by a refresh token. Identity only; everything else is
/// looked up at rotation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// User id
    pub sub: String,
    pub iat: u64,
    pub exp: u64,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token service holding the per-type signing keys and lifetimes.
#[derive(Clone)]
pub struct TokenService {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    validation: Validation,
    access_expiry: u64,
    refresh_expiry: u64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        // No clock leeway: a rotated-out token must die exactly at exp
        validation.leeway = 0;

        Self {
            access_encoding: EncodingKey::from_secret(&config.access_token_secret),
            access_decoding: DecodingKey::from_secret(&config.access_token_secret),
            refresh_encoding: EncodingKey::from_secret(&config.refresh_token_secret),
            refresh_decoding: DecodingKey::from_secret(&config.refresh_token_secret),
            validation,
            access_expiry: config.access_token_expiry,
            refresh_expiry: config.refresh_token_expiry,
        }
    }

    /// Access token lifetime in seconds (drives the cookie Max-Age).
    pub fn access_expiry(&self) -> u64 {
        self.access_expiry
    }

    /// Refresh token lifetime in seconds.
    pub fn refresh_expiry(&self) -> u64 {
        self.refresh_expiry
    }

    /// Sign an access token for a user.
    pub fn sign_access_token(&self, user: &User) -> Result<String, AppError> {
        let now = unix_now()?;
        let claims = AccessClaims {
            sub: user.id.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iat: now,
            exp: now + self.access_expiry,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.access_encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign access token: {}", e)))
    }

    /// Sign a refresh token for a user.
    pub fn sign_refresh_token(&self, user: &User) -> Result<String, AppError> {
        let now = unix_now()?;
        let claims = RefreshClaims {
            sub: user.id.clone(),
            iat: now,
            exp: now + self.refresh_expiry,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to sign refresh token: {}", e)))
    }

    /// Validate an access token's signature and expiry.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, AppError> {
        decode::<AccessClaims>(token, &self.access_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired access token".to_string()))
    }

    /// Validate a refresh token's signature and expiry.
    ///
    /// Callers must additionally compare the presented token against the
    /// value stored on the user record; a signature-valid token that was
    /// already rotated out is still unauthorized.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, AppError> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized("Invalid or expired refresh token".to_string()))
    }

    /// Issue a new token pair and persist the refresh token onto the user
    /// record, invalidating any previously issued refresh token.
    pub async fn issue_token_pair(
        &self,
        db: &FirestoreDb,
        user: &User,
    ) -> Result<TokenPair, AppError> {
        let access_token = self.sign_access_token(user)?;
        let refresh_token = self.sign_refresh_token(user)?;

        let mut updated = user.clone();
        updated.refresh_token = Some(refresh_token.clone());
        updated.updated_at = time_utils::now_rfc3339();

        // Only the refresh-token field is written. The generic message is
        // deliberate: the failed write involves credential material.
        db.set_refresh_token(&updated).await.map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "Failed to persist refresh token");
            AppError::Internal(anyhow::anyhow!("Failed to persist session state"))
        })?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }
}

fn unix_now() -> Result<u64, AppError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))
}
