// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::extract::Query;
use axum::http::{header, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use synapse_gate::config::Config;
use synapse_gate::models::{Profile, Role, Session};
use synapse_gate::routes::create_router;
use synapse_gate::services::{ApiClient, MemoryProfileStore, SupabaseAuth};
use synapse_gate::AppState;

#[derive(Serialize)]
struct TestClaims<'a> {
    sub: &'a str,
    exp: i64,
    aud: &'a str,
    email: &'a str,
    role: &'a str,
}

#[allow(dead_code)]
fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

/// Mint a Supabase-style access token signed with the test JWT secret.
#[allow(dead_code)]
pub fn mint_token(user_id: &str, ttl_secs: i64) -> String {
    mint_token_with(user_id, ttl_secs, "authenticated", test_secret())
}

#[allow(dead_code)]
pub fn mint_token_with(user_id: &str, ttl_secs: i64, aud: &str, secret: &[u8]) -> String {
    let claims = TestClaims {
        sub: user_id,
        exp: now() + ttl_secs,
        aud,
        email: "student@synapse.test",
        role: "authenticated",
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .expect("Failed to create JWT")
}

#[allow(dead_code)]
fn test_secret() -> &'static [u8] {
    b"test_jwt_secret_32_bytes_minimum!"
}

/// Session for `user_id` carrying a valid minted token.
#[allow(dead_code)]
pub fn test_session(user_id: &str) -> Session {
    let mut session = Session::new(user_id, mint_token(user_id, 3600));
    session.email = Some("student@synapse.test".to_string());
    session
}

/// Completed profile row.
#[allow(dead_code)]
pub fn onboarded_profile(user_id: &str) -> Profile {
    Profile {
        id: user_id.to_string(),
        full_name: Some("Ada Lovelace".to_string()),
        email: Some("student@synapse.test".to_string()),
        role: Role::Leader,
        onboarding_completed: Some(true),
    }
}

/// GET `uri` with an optional `synapse_token` cookie.
#[allow(dead_code)]
pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("synapse_token={}", token));
    }
    builder.body(Body::empty()).unwrap()
}

/// POST a JSON body to `uri` with an optional `synapse_token` cookie.
#[allow(dead_code)]
pub fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("synapse_token={}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Create a test app with offline dependencies.
/// Returns the router, the shared state and the profile store behind it.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryProfileStore) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(
    config: Config,
) -> (axum::Router, Arc<AppState>, MemoryProfileStore) {
    let profiles = MemoryProfileStore::new();
    let auth = SupabaseAuth::new(&config).unwrap();
    let api = ApiClient::new(&config).unwrap();

    let state = Arc::new(AppState::new(
        config,
        auth,
        Arc::new(profiles.clone()),
        api,
    ));

    (create_router(state.clone()), state, profiles)
}

/// User the stub auth server signs in.
#[allow(dead_code)]
pub const STUB_USER_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";
#[allow(dead_code)]
pub const STUB_PASSWORD: &str = "correct horse battery";
/// Refresh token the stub auth server accepts.
#[allow(dead_code)]
pub const STUB_REFRESH_TOKEN: &str = "refresh-1";
/// Refresh token handed out by every successful grant.
#[allow(dead_code)]
pub const STUB_ROTATED_REFRESH_TOKEN: &str = "refresh-2";

fn stub_grant() -> Response {
    Json(json!({
        "access_token": mint_token(STUB_USER_ID, 3600),
        "refresh_token": STUB_ROTATED_REFRESH_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "user": { "id": STUB_USER_ID, "email": "student@synapse.test" },
    }))
    .into_response()
}

fn stub_rejection(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_grant", "error_description": message })),
    )
        .into_response()
}

async fn stub_token(
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<serde_json::Value>,
) -> Response {
    match params.get("grant_type").map(String::as_str) {
        Some("password") if body["password"] == STUB_PASSWORD => stub_grant(),
        Some("password") => stub_rejection("Invalid login credentials"),
        Some("refresh_token") if body["refresh_token"] == STUB_REFRESH_TOKEN => stub_grant(),
        Some("refresh_token") => stub_rejection("Invalid Refresh Token: Refresh Token Not Found"),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Serve a minimal GoTrue on a loopback port and return its base URL.
///
/// Supports the password and refresh-token grants and logout; access
/// tokens are signed with the test JWT secret.
#[allow(dead_code)]
pub async fn spawn_auth_stub() -> String {
    let app = Router::new()
        .route("/auth/v1/token", post(stub_token))
        .route("/auth/v1/logout", post(|| async { StatusCode::NO_CONTENT }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Test config whose Supabase URL points at a fresh auth stub.
#[allow(dead_code)]
pub async fn config_with_auth_stub() -> Config {
    let mut config = Config::test_default();
    config.supabase_url = spawn_auth_stub().await;
    config
}
