// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Supabase authentication routes: password login, sign-up, OAuth (PKCE),
//! and logout.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use validator::Validate;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::{AppError, Result};
use crate::guard::{AppRoute, RouteDecision};
use crate::middleware::auth::{clear_session_cookies, set_session_cookies, TOKEN_COOKIE};
use crate::models::Session;
use crate::services::supabase_auth::{pkce, OAuthProvider, SignUpOutcome};
use crate::services::FixedSession;
use crate::AppState;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the PKCE verifier between the OAuth start and callback.
const PKCE_COOKIE: &str = "synapse_pkce";
const CALLBACK_PATH: &str = "/auth/callback";
/// Maximum age of a signed OAuth state.
const STATE_MAX_AGE_MS: u128 = 10 * 60 * 1000;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/signup", post(signup))
        .route("/auth/oauth/{provider}", get(oauth_start))
        .route(CALLBACK_PATH, get(oauth_callback))
        .route("/auth/logout", post(logout))
}

// ─── Password login ──────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "invalid email address"))]
    email: String,
    #[validate(length(min = 1, message = "password is required"))]
    password: String,
}

/// Successful login response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LoginResponse {
    pub user_id: String,
    pub email: Option<String>,
    /// Page the client should open next
    pub next: String,
}

async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = state
        .auth
        .sign_in_with_password(body.email.trim(), &body.password)
        .await?;

    tracing::info!(user_id = %session.user_id, "Password login succeeded");

    let next = landing_page(&state, &session).await;
    let jar = set_session_cookies(jar, &state.config, &session);

    Ok((
        jar,
        Json(LoginResponse {
            user_id: session.user_id,
            email: session.email,
            next,
        }),
    ))
}

/// Where a freshly signed-in user lands: home, unless the guard says otherwise.
async fn landing_page(state: &AppState, session: &Session) -> String {
    let source = FixedSession(Some(session.clone()));
    match state.guard.check(&source, &AppRoute::Home).await {
        RouteDecision::Redirect(target) => target.path().to_string(),
        RouteDecision::Stay | RouteDecision::Retry => AppRoute::Home.path().to_string(),
    }
}

// ─── Sign-up ─────────────────────────────────────────────────

#[derive(Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(email(message = "invalid email address"))]
    email: String,
    #[validate(length(min = 6, message = "password must be at least 6 characters"))]
    password: String,
    #[serde(default)]
    full_name: Option<String>,
}

/// Sign-up response.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SignUpResponse {
    pub user_id: String,
    pub confirmation_required: bool,
    pub next: String,
}

async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignUpRequest>,
) -> Result<(CookieJar, Json<SignUpResponse>)> {
    body.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let full_name = body
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty());

    let outcome = state
        .auth
        .sign_up(body.email.trim(), &body.password, full_name)
        .await?;

    match outcome {
        SignUpOutcome::SignedIn(session) => {
            tracing::info!(user_id = %session.user_id, "Sign-up completed with session");
            let jar = set_session_cookies(jar, &state.config, &session);
            Ok((
                jar,
                Json(SignUpResponse {
                    user_id: session.user_id,
                    confirmation_required: false,
                    next: AppRoute::Onboarding.path().to_string(),
                }),
            ))
        }
        SignUpOutcome::ConfirmationRequired { user_id } => {
            tracing::info!(user_id = %user_id, "Sign-up awaiting email confirmation");
            Ok((
                jar,
                Json(SignUpResponse {
                    user_id,
                    confirmation_required: true,
                    next: AppRoute::Login.path().to_string(),
                }),
            ))
        }
    }
}

// ─── OAuth (PKCE) ────────────────────────────────────────────

/// Start OAuth flow - redirect to the provider via Supabase.
async fn oauth_start(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    let provider: OAuthProvider = provider
        .parse()
        .map_err(|e: crate::services::AuthError| AppError::NotFound(e.to_string()))?;

    let verifier = pkce::generate_verifier()?;
    let challenge = pkce::challenge(&verifier);

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();
    let oauth_state = sign_state(&challenge, timestamp, &state.config.oauth_state_key)?;

    let callback_url = format!(
        "{}{}?state={}",
        service_url(&headers),
        CALLBACK_PATH,
        oauth_state
    );
    let auth_url = state.auth.authorize_url(provider, &callback_url, &challenge);

    let verifier_cookie = Cookie::build((PKCE_COOKIE, verifier))
        .path(CALLBACK_PATH)
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.secure_cookies())
        .max_age(time::Duration::minutes(10))
        .build();

    tracing::info!(provider = %provider, "Starting OAuth flow");

    Ok((jar.add(verifier_cookie), Redirect::temporary(&auth_url)))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth callback - check state, exchange code, set session cookies.
async fn oauth_callback(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Response {
    if let Some(error) = &params.error {
        tracing::warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "OAuth error from provider"
        );
        return login_error(jar, "oauth_denied");
    }

    let Some(verifier) = jar.get(PKCE_COOKIE).map(|c| c.value().to_string()) else {
        tracing::warn!("OAuth callback without PKCE verifier cookie");
        return login_error(jar, "missing_verifier");
    };

    let state_ok = params.state.as_deref().is_some_and(|s| {
        verify_state(
            s,
            &pkce::challenge(&verifier),
            &state.config.oauth_state_key,
            now_millis(),
        )
    });
    if !state_ok {
        tracing::error!("OAuth state verification failed");
        return login_error(jar, "invalid_state");
    }

    let Some(code) = params.code.as_deref().filter(|c| !c.is_empty()) else {
        return login_error(jar, "missing_code");
    };

    match state.auth.exchange_code(code, &verifier).await {
        Ok(session) => {
            tracing::info!(user_id = %session.user_id, "OAuth login succeeded");
            let jar = set_session_cookies(remove_verifier(jar), &state.config, &session);
            // The guard moves onboarded users on to /home
            (jar, Redirect::to(AppRoute::Onboarding.path())).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "OAuth code exchange failed");
            login_error(jar, "exchange_failed")
        }
    }
}

fn login_error(jar: CookieJar, code: &str) -> Response {
    let target = format!("{}?error={}", AppRoute::Login.path(), code);
    (remove_verifier(jar), Redirect::to(&target)).into_response()
}

fn remove_verifier(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(PKCE_COOKIE).path(CALLBACK_PATH))
}

/// Externally visible base URL of this service, from the Host header.
fn service_url(headers: &HeaderMap) -> String {
    let host = headers
        .get(axum::http::header::HOST)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("localhost:8080");

    let scheme = if host.contains("localhost") || host.contains("127.0.0.1") {
        "http"
    } else {
        "https"
    };
    format!("{}://{}", scheme, host)
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

/// Sign `challenge|timestamp_hex` and encode it for the URL.
///
/// Binding the PKCE challenge means a state is only valid together with the
/// verifier cookie set by the same start request.
fn sign_state(challenge: &str, timestamp_ms: u128, secret: &[u8]) -> Result<String> {
    let payload = format!("{}|{:x}", challenge, timestamp_ms);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed_state = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed_state.as_bytes()))
}

/// Check signature, challenge binding, and age of an OAuth state.
fn verify_state(state: &str, challenge: &str, secret: &[u8], now_ms: u128) -> bool {
    let Some(state_str) = URL_SAFE_NO_PAD
        .decode(state)
        .ok()
        .and_then(|b| String::from_utf8(b).ok())
    else {
        return false;
    };

    // Format is "challenge|timestamp_hex|signature_hex"
    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    let [state_challenge, timestamp_hex, signature_hex] = parts.as_slice() else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret) else {
        return false;
    };
    mac.update(format!("{}|{}", state_challenge, timestamp_hex).as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if !bool::from(expected.as_bytes().ct_eq(signature_hex.as_bytes())) {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return false;
    }

    if !bool::from(state_challenge.as_bytes().ct_eq(challenge.as_bytes())) {
        tracing::warn!("OAuth state does not match PKCE verifier cookie");
        return false;
    }

    match u128::from_str_radix(timestamp_hex, 16) {
        Ok(issued) => now_ms.saturating_sub(issued) <= STATE_MAX_AGE_MS && issued <= now_ms,
        Err(_) => false,
    }
}

// ─── Logout ──────────────────────────────────────────────────

/// Revoke the session (best effort) and clear cookies.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> impl IntoResponse {
    if let Some(token) = jar.get(TOKEN_COOKIE).map(|c| c.value().to_string()) {
        if let Err(e) = state.auth.sign_out(&token).await {
            tracing::warn!(error = %e, "Provider sign-out failed, clearing cookies anyway");
        }
    }

    (
        clear_session_cookies(jar, &state.config),
        StatusCode::NO_CONTENT,
    )
}
