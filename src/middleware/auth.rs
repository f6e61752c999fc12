// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session cookies and authentication middleware.

use crate::config::Config;
use crate::error::AppError;
use crate::guard::AuthSessionSource;
use crate::models::Session;
use crate::services::supabase_auth::{AuthError, SupabaseAuth};
use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use std::sync::{Arc, Mutex};

pub const TOKEN_COOKIE: &str = "synapse_token";
pub const REFRESH_COOKIE: &str = "synapse_refresh";
/// Non-HttpOnly hint so the SPA knows a session cookie exists.
pub const LOGGED_IN_COOKIE: &str = "synapse_logged_in";

const DEFAULT_ACCESS_TTL_SECS: i64 = 60 * 60;
const REFRESH_TTL_SECS: i64 = 30 * 24 * 60 * 60;

/// Authenticated user attached to API requests.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub session: Session,
}

/// Session source backed by the request's cookies or bearer header.
///
/// An expired or rejected access token is renewed with the refresh cookie
/// when one is present; the renewed session is kept so the caller can set
/// fresh cookies on the response.
pub struct CookieSession {
    auth: SupabaseAuth,
    access_token: Option<String>,
    refresh_token: Option<String>,
    renewed: Mutex<Option<Session>>,
}

impl CookieSession {
    pub fn from_request(auth: &SupabaseAuth, jar: &CookieJar, headers: &HeaderMap) -> Self {
        // Try cookie first, then header
        let access_token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty())
            .or_else(|| bearer_token(headers));
        let refresh_token = jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|v| !v.is_empty());

        Self {
            auth: auth.clone(),
            access_token,
            refresh_token,
            renewed: Mutex::new(None),
        }
    }

    /// Session renewed while resolving, if any.
    pub fn take_renewed(&self) -> Option<Session> {
        self.renewed.lock().ok().and_then(|mut r| r.take())
    }

    async fn renew(&self) -> Result<Option<Session>, AuthError> {
        let Some(refresh_token) = &self.refresh_token else {
            return Ok(None);
        };
        match self.auth.refresh_session(refresh_token).await {
            Ok(session) => {
                tracing::debug!(user_id = %session.user_id, "Session renewed from refresh cookie");
                if let Ok(mut slot) = self.renewed.lock() {
                    *slot = Some(session.clone());
                }
                Ok(Some(session))
            }
            Err(AuthError::InvalidToken) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AuthSessionSource for CookieSession {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        let Some(token) = &self.access_token else {
            return self.renew().await;
        };

        match self.auth.verify_access_token(token).await {
            Ok(mut session) => {
                session.refresh_token = self.refresh_token.clone();
                Ok(Some(session))
            }
            Err(AuthError::InvalidToken) => self.renew().await,
            Err(e) => Err(e),
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware that requires an authenticated session.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let source = CookieSession::from_request(&state.auth, &jar, request.headers());

    let session = match source.current_session().await {
        Ok(Some(session)) => session,
        Ok(None) => return AppError::Unauthorized.into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "Session lookup failed");
            return AppError::Unauthorized.into_response();
        }
    };

    request.extensions_mut().insert(AuthUser { session });
    let response = next.run(request).await;

    match source.take_renewed() {
        Some(renewed) => (
            set_session_cookies(CookieJar::new(), &state.config, &renewed),
            response,
        )
            .into_response(),
        None => response,
    }
}

fn base_cookie(config: &Config, name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .same_site(SameSite::Lax)
        .secure(config.secure_cookies())
        .build()
}

/// Add the session cookies for `session` to `jar`.
pub fn set_session_cookies(jar: CookieJar, config: &Config, session: &Session) -> CookieJar {
    let now = chrono::Utc::now().timestamp();
    let access_ttl = session
        .expires_at
        .map(|exp| (exp - now).max(0))
        .unwrap_or(DEFAULT_ACCESS_TTL_SECS);

    let mut token = base_cookie(config, TOKEN_COOKIE, session.access_token.clone());
    token.set_http_only(true);
    token.set_max_age(time::Duration::seconds(access_ttl));

    let mut hint = base_cookie(config, LOGGED_IN_COOKIE, "1".to_string());
    hint.set_max_age(time::Duration::seconds(REFRESH_TTL_SECS));

    let mut jar = jar.add(token).add(hint);

    if let Some(refresh_token) = &session.refresh_token {
        let mut refresh = base_cookie(config, REFRESH_COOKIE, refresh_token.clone());
        refresh.set_http_only(true);
        refresh.set_max_age(time::Duration::seconds(REFRESH_TTL_SECS));
        jar = jar.add(refresh);
    }

    jar
}

/// Expire every session cookie.
pub fn clear_session_cookies(jar: CookieJar, config: &Config) -> CookieJar {
    let expired = |name: &'static str, http_only: bool| {
        let mut cookie = base_cookie(config, name, String::new());
        cookie.set_http_only(http_only);
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    };

    jar.add(expired(TOKEN_COOKIE, true))
        .add(expired(REFRESH_COOKIE, true))
        .add(expired(LOGGED_IN_COOKIE, false))
}
