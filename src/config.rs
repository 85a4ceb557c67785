//! Application configuration loaded from environment variables.
//!
//! All secrets and connection settings are read once at startup into an
//! explicit `Config` value that is passed into `AppState`; nothing in the
//! crate reads process environment after boot.

use std::env;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Server ---
    /// Server port
    pub port: u16,
    /// Frontend URL allowed by CORS (cookies require credentialed requests)
    pub frontend_url: String,

    // --- Firestore ---
    /// GCP project ID
    pub gcp_project_id: String,

    // --- Tokens ---
    /// HS256 secret for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// Access token lifetime in seconds (default: 15 minutes)
    pub access_token_expiry: u64,
    /// HS256 secret for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Refresh token lifetime in seconds (default: 10 days)
    pub refresh_token_expiry: u64,

    // --- Media CDN ---
    /// Base URL of the media upload provider
    pub media_base_url: String,
    /// Media provider API key
    pub media_api_key: String,
    /// Media provider API secret (signs upload/destroy requests)
    pub media_api_secret: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        Ok(Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),

            access_token_secret: env::var("ACCESS_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("ACCESS_TOKEN_SECRET"))?
                .into_bytes(),
            access_token_expiry: parse_expiry("ACCESS_TOKEN_EXPIRY", 900),
            refresh_token_secret: env::var("REFRESH_TOKEN_SECRET")
                .map_err(|_| ConfigError::Missing("REFRESH_TOKEN_SECRET"))?
                .into_bytes(),
            refresh_token_expiry: parse_expiry("REFRESH_TOKEN_EXPIRY", 864_000),

            media_base_url: env::var("MEDIA_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_BASE_URL"))?,
            media_api_key: env::var("MEDIA_API_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_KEY"))?,
            media_api_secret: env::var("MEDIA_API_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("MEDIA_API_SECRET"))?,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            port: 8080,
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            access_token_secret: b"test_access_secret_32_bytes_min!".to_vec(),
            access_token_expiry: 900,
            refresh_token_secret: b"test_refresh_secret_32_bytes_ok!".to_vec(),
            refresh_token_expiry: 864_000,
            media_base_url: "http://localhost:9090".to_string(),
            media_api_key: "test_media_key".to_string(),
            media_api_secret: "test_media_secret".to_string(),
        }
    }
}

fn parse_expiry(var: &str, default: u64) -> u64 {
    env::var(var)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or(default)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
