// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Auth route and cookie attribute tests.
//!
//! Most paths never reach Supabase: logout without a token, the OAuth
//! start redirect, callback failures, and request validation. Silent
//! session renewal runs against a loopback GoTrue.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
};
use serde_json::json;
use synapse_gate::config::Config;
use tower::ServiceExt;

mod common;

fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

fn find_cookie(headers: &[String], name: &str) -> String {
    headers
        .iter()
        .find(|value| value.starts_with(&format!("{name}=")))
        .cloned()
        .unwrap_or_else(|| panic!("missing Set-Cookie header for {name}: {headers:?}"))
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("missing Location header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_logout_clears_cookies_localhost() {
    let (app, _, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .header(header::COOKIE, "synapse_logged_in=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let set_cookies = set_cookie_headers(&response);
    let token_cookie = find_cookie(&set_cookies, "synapse_token");
    let refresh_cookie = find_cookie(&set_cookies, "synapse_refresh");
    let hint_cookie = find_cookie(&set_cookies, "synapse_logged_in");

    for cookie in [&token_cookie, &refresh_cookie] {
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    assert!(hint_cookie.contains("Path=/"));
    assert!(hint_cookie.contains("Max-Age=0"));
    assert!(!hint_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_logout_cookies_secure_in_production() {
    let mut config = Config::test_default();
    config.frontend_url = "https://synapse.example.org".to_string();
    let (app, _, _) = common::create_test_app_with_config(config);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/auth/logout")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let set_cookies = set_cookie_headers(&response);
    assert!(find_cookie(&set_cookies, "synapse_token").contains("Secure"));
    assert!(find_cookie(&set_cookies, "synapse_logged_in").contains("Secure"));
}

#[tokio::test]
async fn test_oauth_start_redirects_with_pkce() {
    let (app, _, _) = common::create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/auth/oauth/github")
                .header(header::HOST, "localhost:8080")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);

    let target = location(&response);
    assert!(target.starts_with("http://127.0.0.1:54321/auth/v1/authorize?provider=github"));
    assert!(target.contains("code_challenge_method=s256"));
    assert!(target.contains(&format!(
        "redirect_to={}",
        urlencoding::encode("http://localhost:8080/auth/callback?state=")
    )));

    let set_cookies = set_cookie_headers(&response);
    let verifier = find_cookie(&set_cookies, "synapse_pkce");
    assert!(verifier.contains("Path=/auth/callback"));
    assert!(verifier.contains("HttpOnly"));
    assert!(verifier.contains("SameSite=Lax"));
}

#[tokio::test]
async fn test_oauth_start_unknown_provider() {
    let (app, _, _) = common::create_test_app();
    let response = app
        .oneshot(common::get("/auth/oauth/myspace", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_oauth_callback_failures_return_to_login() {
    let (app, _, _) = common::create_test_app();

    let cases = [
        ("/auth/callback?error=access_denied", None, "/login?error=oauth_denied"),
        ("/auth/callback?code=abc&state=xyz", None, "/login?error=missing_verifier"),
        (
            "/auth/callback?code=abc&state=bm90LWEtc3RhdGU",
            Some("synapse_pkce=verifier"),
            "/login?error=invalid_state",
        ),
    ];

    for (uri, cookie, expected) in cases {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(location(&response), expected, "{uri}");
    }
}

#[tokio::test]
async fn test_login_validation() {
    let (app, _, _) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(common::post_json(
            "/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "secret" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(common::post_json(
            "/auth/signup",
            None,
            json!({ "email": "ada@synapse.test", "password": "123" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ─── Silent renewal ──────────────────────────────────────────

fn expired_with_refresh(refresh_token: &str) -> String {
    format!(
        "synapse_token={}; synapse_refresh={}",
        common::mint_token(common::STUB_USER_ID, -3600),
        refresh_token
    )
}

fn with_cookies(uri: &str, cookies: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::COOKIE, cookies)
        .body(Body::empty())
        .unwrap()
}

fn assert_renewed_cookies(response: &Response) {
    let set_cookies = set_cookie_headers(response);
    let token_cookie = find_cookie(&set_cookies, "synapse_token");
    let refresh_cookie = find_cookie(&set_cookies, "synapse_refresh");
    find_cookie(&set_cookies, "synapse_logged_in");

    assert!(token_cookie.contains("HttpOnly"));
    assert!(!token_cookie.contains("Max-Age=0"));
    assert!(refresh_cookie.starts_with(&format!(
        "synapse_refresh={}",
        common::STUB_ROTATED_REFRESH_TOKEN
    )));
}

#[tokio::test]
async fn test_page_guard_renews_expired_session() {
    let config = common::config_with_auth_stub().await;
    let (app, _, profiles) = common::create_test_app_with_config(config);
    profiles.insert(common::onboarded_profile(common::STUB_USER_ID));

    let response = app
        .oneshot(with_cookies(
            "/home",
            &expired_with_refresh(common::STUB_REFRESH_TOKEN),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_renewed_cookies(&response);
}

#[tokio::test]
async fn test_page_guard_renews_with_only_refresh_cookie() {
    let config = common::config_with_auth_stub().await;
    let (app, _, profiles) = common::create_test_app_with_config(config);
    profiles.insert(common::onboarded_profile(common::STUB_USER_ID));

    let cookies = format!("synapse_refresh={}", common::STUB_REFRESH_TOKEN);
    let response = app.oneshot(with_cookies("/", &cookies)).await.unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/home");
    assert_renewed_cookies(&response);
}

#[tokio::test]
async fn test_api_renews_expired_session() {
    let config = common::config_with_auth_stub().await;
    let (app, _, profiles) = common::create_test_app_with_config(config);
    profiles.insert(common::onboarded_profile(common::STUB_USER_ID));

    let response = app
        .oneshot(with_cookies(
            "/api/profile",
            &expired_with_refresh(common::STUB_REFRESH_TOKEN),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_renewed_cookies(&response);
    let body = common::body_json(response).await;
    assert_eq!(body["name"], "Ada Lovelace");
}

#[tokio::test]
async fn test_rejected_refresh_cookie_is_signed_out() {
    let config = common::config_with_auth_stub().await;
    let (app, _, profiles) = common::create_test_app_with_config(config);
    profiles.insert(common::onboarded_profile(common::STUB_USER_ID));
    let cookies = expired_with_refresh("revoked");

    let response = app
        .clone()
        .oneshot(with_cookies("/home", &cookies))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/login");
    assert!(set_cookie_headers(&response).is_empty());

    let response = app
        .oneshot(with_cookies("/api/profile", &cookies))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
