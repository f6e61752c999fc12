//! Route guard for application pages.
//!
//! Every page request runs the session + onboarding check before the SPA
//! shell is served. Redirects use 303 so the browser always follows with a
//! GET and replaces the guarded URL.

use crate::guard::{AppRoute, RouteDecision};
use crate::middleware::auth::{set_session_cookies, CookieSession};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

const RETRY_AFTER_SECS: &str = "2";

/// Decide the request's page route and either serve it or redirect.
pub async fn guard_pages(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let route = AppRoute::parse(request.uri().path());
    let source = CookieSession::from_request(&state.auth, &jar, request.headers());

    let decision = state.guard.check(&source, &route).await;

    let response = match &decision {
        RouteDecision::Stay => next.run(request).await,
        RouteDecision::Redirect(target) => {
            tracing::info!(from = %route, to = %target, "Redirecting page request");
            Redirect::to(target.path()).into_response()
        }
        RouteDecision::Retry => retry_later(),
    };

    match source.take_renewed() {
        Some(renewed) => (
            set_session_cookies(CookieJar::new(), &state.config, &renewed),
            response,
        )
            .into_response(),
        None => response,
    }
}

fn retry_later() -> Response {
    let body = Json(serde_json::json!({
        "error": "profile_unavailable",
        "details": "Profile lookup failed, try again shortly",
    }));
    let mut response = (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
    response
        .headers_mut()
        .insert(header::RETRY_AFTER, HeaderValue::from_static(RETRY_AFTER_SECS));
    response
}
