// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase Auth (GoTrue) client.
//!
//! Handles:
//! - Password sign-in and sign-up
//! - OAuth authorize URLs with PKCE and code exchange
//! - Silent session refresh and sign-out
//! - Access-token verification (local HS256 or remote `/user`, cached)

use crate::config::Config;
use crate::models::Session;
use anyhow::Context;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use dashmap::DashMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
/// Upper bound on how long a remotely verified token stays cached.
const USER_CACHE_TTL: Duration = Duration::from_secs(300);
const JWT_AUDIENCE: &str = "authenticated";

/// Supabase Auth error categories.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials: {0}")]
    InvalidCredentials(String),

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Supabase auth rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Supabase auth request failed: {0}")]
    Transport(String),

    #[error("Unexpected Supabase auth response: {0}")]
    Decode(String),

    #[error("Unsupported OAuth provider: {0}")]
    UnsupportedProvider(String),
}

/// OAuth providers enabled for the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OAuthProvider {
    Google,
    Github,
}

impl OAuthProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
            OAuthProvider::Github => "github",
        }
    }

    fn scopes(&self) -> Option<&'static str> {
        match self {
            OAuthProvider::Github => Some("read:user user:email"),
            OAuthProvider::Google => None,
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OAuthProvider {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google" => Ok(OAuthProvider::Google),
            "github" => Ok(OAuthProvider::Github),
            other => Err(AuthError::UnsupportedProvider(other.to_string())),
        }
    }
}

/// User record returned by GoTrue.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Token grant response.
#[derive(Debug, Clone, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUserRecord,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        let expires_at = self
            .expires_at
            .or_else(|| self.expires_in.map(|secs| unix_now() + secs));
        Session {
            user_id: self.user.id,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            email: self.user.email,
            expires_at,
        }
    }
}

/// Result of a sign-up request.
#[derive(Debug, Clone)]
pub enum SignUpOutcome {
    /// Email confirmation is disabled; the user is signed in.
    SignedIn(Session),
    /// A confirmation email was sent.
    ConfirmationRequired { user_id: String },
}

/// Claims carried by Supabase access tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: i64,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub aud: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone)]
struct CachedUser {
    user_id: String,
    email: Option<String>,
    expires_at: Option<i64>,
    cached_until: Instant,
}

/// Supabase Auth client.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    jwt_key: Option<Arc<DecodingKey>>,
    /// Remotely verified tokens keyed by SHA-256 of the token.
    user_cache: Arc<DashMap<String, CachedUser>>,
}

impl SupabaseAuth {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building Supabase auth HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("{}/auth/v1", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
            jwt_key: config
                .supabase_jwt_secret
                .as_deref()
                .map(|secret| Arc::new(DecodingKey::from_secret(secret))),
            user_cache: Arc::new(DashMap::new()),
        })
    }

    /// Sign in with email and password.
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/token?grant_type=password", self.base_url);
        let body = serde_json::json!({ "email": email, "password": password });
        let response = self.post(&url, &body).send().await.map_err(transport)?;

        match self.check_json::<TokenResponse>(response).await {
            Ok(tokens) => Ok(tokens.into_session()),
            Err(AuthError::Rejected { status: 400, message }) => {
                Err(AuthError::InvalidCredentials(message))
            }
            Err(e) => Err(e),
        }
    }

    /// Register a new user. `full_name` is stored in the user metadata.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: Option<&str>,
    ) -> Result<SignUpOutcome, AuthError> {
        let url = format!("{}/signup", self.base_url);
        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(name) = full_name {
            body["data"] = serde_json::json!({ "full_name": name });
        }
        let response = self.post(&url, &body).send().await.map_err(transport)?;
        let value: serde_json::Value = self.check_json(response).await?;

        if value.get("access_token").is_some() {
            let tokens: TokenResponse =
                serde_json::from_value(value).map_err(|e| AuthError::Decode(e.to_string()))?;
            return Ok(SignUpOutcome::SignedIn(tokens.into_session()));
        }

        // Without a session GoTrue returns the bare user (or wraps it).
        let user = value.get("user").cloned().unwrap_or(value);
        let user: AuthUserRecord =
            serde_json::from_value(user).map_err(|e| AuthError::Decode(e.to_string()))?;
        Ok(SignUpOutcome::ConfirmationRequired { user_id: user.id })
    }

    /// Exchange a refresh token for a renewed session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, AuthError> {
        let url = format!("{}/token?grant_type=refresh_token", self.base_url);
        let body = serde_json::json!({ "refresh_token": refresh_token });
        let response = self.post(&url, &body).send().await.map_err(transport)?;

        match self.check_json::<TokenResponse>(response).await {
            Ok(tokens) => Ok(tokens.into_session()),
            Err(AuthError::Rejected { status, .. }) if status == 400 || status == 401 => {
                Err(AuthError::InvalidToken)
            }
            Err(e) => Err(e),
        }
    }

    /// Revoke the session on the provider side.
    pub async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/logout", self.base_url);
        let response = self
            .http
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        self.forget_token(access_token);
        self.check(response).await
    }

    /// Fetch the user behind an access token.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUserRecord, AuthError> {
        let url = format!("{}/user", self.base_url);
        let response = self
            .http
            .get(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        match self.check_json(response).await {
            Err(AuthError::Rejected { status, .. }) if status == 401 || status == 403 => {
                Err(AuthError::InvalidToken)
            }
            other => other,
        }
    }

    /// Build the provider authorize URL for a PKCE flow.
    pub fn authorize_url(
        &self,
        provider: OAuthProvider,
        redirect_to: &str,
        code_challenge: &str,
    ) -> String {
        let mut url = format!(
            "{}/authorize?provider={}&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.base_url,
            provider,
            urlencoding::encode(redirect_to),
            code_challenge,
        );
        if let Some(scopes) = provider.scopes() {
            url.push_str("&scopes=");
            url.push_str(&urlencoding::encode(scopes));
        }
        url
    }

    /// Exchange an OAuth authorization code (PKCE grant).
    pub async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session, AuthError> {
        let url = format!("{}/token?grant_type=pkce", self.base_url);
        let body = serde_json::json!({
            "auth_code": auth_code,
            "code_verifier": code_verifier,
        });
        let response = self.post(&url, &body).send().await.map_err(transport)?;
        let tokens: TokenResponse = self.check_json(response).await?;
        Ok(tokens.into_session())
    }

    /// Turn a bearer token into a session.
    ///
    /// With a configured JWT secret the token is verified locally; otherwise
    /// GoTrue is asked and the answer cached until the token expires.
    pub async fn verify_access_token(&self, token: &str) -> Result<Session, AuthError> {
        if let Some(key) = &self.jwt_key {
            let claims = verify_claims(token, key)?;
            return Ok(Session {
                user_id: claims.sub,
                access_token: token.to_string(),
                refresh_token: None,
                email: claims.email,
                expires_at: Some(claims.exp),
            });
        }

        let cache_key = token_fingerprint(token);
        if let Some(cached) = self.user_cache.get(&cache_key) {
            if Instant::now() < cached.cached_until {
                return Ok(Session {
                    user_id: cached.user_id.clone(),
                    access_token: token.to_string(),
                    refresh_token: None,
                    email: cached.email.clone(),
                    expires_at: cached.expires_at,
                });
            }
        }

        let user = self.get_user(token).await?;
        let expires_at = unverified_expiry(token);
        let ttl = expires_at
            .map(|exp| Duration::from_secs((exp - unix_now()).max(0) as u64))
            .map_or(USER_CACHE_TTL, |left| left.min(USER_CACHE_TTL));

        self.remember(
            cache_key,
            CachedUser {
                user_id: user.id.clone(),
                email: user.email.clone(),
                expires_at,
                cached_until: Instant::now() + ttl,
            },
        );

        Ok(Session {
            user_id: user.id,
            access_token: token.to_string(),
            refresh_token: None,
            email: user.email,
            expires_at,
        })
    }

    /// Cache a verified user, evicting entries that have lapsed.
    fn remember(&self, cache_key: String, user: CachedUser) {
        let now = Instant::now();
        self.user_cache.retain(|_, cached| cached.cached_until > now);
        self.user_cache.insert(cache_key, user);
    }

    /// Drop a token from the verification cache.
    pub fn forget_token(&self, token: &str) {
        self.user_cache.remove(&token_fingerprint(token));
    }

    fn post(&self, url: &str, body: &serde_json::Value) -> reqwest::RequestBuilder {
        self.http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(body)
    }

    async fn check(&self, response: reqwest::Response) -> Result<(), AuthError> {
        if response.status().is_success() {
            return Ok(());
        }
        Err(rejected(response).await)
    }

    async fn check_json<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, AuthError> {
        if !response.status().is_success() {
            return Err(rejected(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| AuthError::Decode(format!("JSON parse error: {}", e)))
    }
}

fn transport(e: reqwest::Error) -> AuthError {
    AuthError::Transport(e.to_string())
}

/// Pull GoTrue's error message out of a failed response.
async fn rejected(response: reqwest::Response) -> AuthError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            ["error_description", "msg", "message", "error"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or(body);
    AuthError::Rejected { status, message }
}

/// Verify signature, expiry and audience of a Supabase access token.
pub fn verify_claims(token: &str, key: &DecodingKey) -> Result<AccessClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[JWT_AUDIENCE]);
    decode::<AccessClaims>(token, key, &validation)
        .map(|data| data.claims)
        .map_err(|_| AuthError::InvalidToken)
}

/// Read `exp` without checking the signature (cache bounds only).
fn unverified_expiry(token: &str) -> Option<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)
        .ok()
        .map(|data| data.claims.exp)
}

fn token_fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// PKCE verifier/challenge helpers (RFC 7636, S256).
pub mod pkce {
    use super::*;
    use ring::rand::{SecureRandom, SystemRandom};

    /// Random 43-character URL-safe verifier.
    pub fn generate_verifier() -> anyhow::Result<String> {
        let mut bytes = [0u8; 32];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| anyhow::anyhow!("system RNG unavailable"))?;
        Ok(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn challenge(verifier: &str) -> String {
        URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
    }
}
