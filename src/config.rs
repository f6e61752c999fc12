//! Application configuration loaded from environment variables.
//!
//! Values are read once at startup. A `.env` file is honoured for local
//! development.

use crate::guard::ProfileErrorPolicy;
use std::env;
use std::time::Duration;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Supabase project URL, e.g. `https://xxxx.supabase.co`
    pub supabase_url: String,
    /// Supabase anon (publishable) key, sent as `apikey`
    pub supabase_anon_key: String,
    /// Base URL of the project REST API
    pub api_base_url: String,
    /// Frontend URL (cookie attributes, CORS, OAuth redirects)
    pub frontend_url: String,
    /// Directory holding the built single-page application
    pub static_dir: String,
    /// Server port
    pub port: u16,
    /// Upper bound for one session + profile check
    pub guard_check_timeout: Duration,
    /// What the guard does when the profile lookup fails
    pub profile_error_policy: ProfileErrorPolicy,

    // --- Secrets ---
    /// Supabase JWT secret for local access-token verification (optional)
    pub supabase_jwt_secret: Option<Vec<u8>>,
    /// HMAC key for signing the OAuth state parameter
    pub oauth_state_key: Vec<u8>,
}

impl Config {
    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            supabase_url: "http://127.0.0.1:54321".to_string(),
            supabase_anon_key: "test_anon_key".to_string(),
            api_base_url: "http://127.0.0.1:8000".to_string(),
            frontend_url: "http://localhost:5173".to_string(),
            static_dir: "dist".to_string(),
            port: 8080,
            guard_check_timeout: Duration::from_millis(500),
            profile_error_policy: ProfileErrorPolicy::Onboarding,
            supabase_jwt_secret: Some(b"test_jwt_secret_32_bytes_minimum!".to_vec()),
            oauth_state_key: b"test_oauth_state_key".to_vec(),
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let profile_error_policy = match env::var("PROFILE_ERROR_POLICY") {
            Ok(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("PROFILE_ERROR_POLICY", v))?,
            Err(_) => ProfileErrorPolicy::default(),
        };

        Ok(Self {
            supabase_url: env::var("SUPABASE_URL")
                .map(|v| v.trim().trim_end_matches('/').to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_URL"))?,
            supabase_anon_key: env::var("SUPABASE_ANON_KEY")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("SUPABASE_ANON_KEY"))?,
            api_base_url: env::var("API_BASE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            static_dir: env::var("STATIC_DIR").unwrap_or_else(|_| "dist".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            guard_check_timeout: Duration::from_millis(
                env::var("GUARD_CHECK_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(5000),
            ),
            profile_error_policy,

            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(String::into_bytes),
            oauth_state_key: env::var("OAUTH_STATE_KEY")
                .map_err(|_| ConfigError::Missing("OAUTH_STATE_KEY"))?
                .into_bytes(),
        })
    }

    /// Whether cookies should carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.frontend_url.starts_with("https://")
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
