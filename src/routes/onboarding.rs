// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Onboarding submission.

use crate::error::{AppError, Result};
use crate::guard::AppRoute;
use crate::middleware::auth::AuthUser;
use crate::models::OnboardingForm;
use crate::AppState;
use axum::{extract::State, routing::post, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/onboarding", post(complete_onboarding))
}

/// Response after onboarding is stored.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OnboardingResponse {
    pub next: String,
}

/// Store the onboarding form as the user's profile row.
///
/// The upsert writes the whole row, so resubmitting overwrites the name and
/// role chosen earlier.
async fn complete_onboarding(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(form): Json<OnboardingForm>,
) -> Result<Json<OnboardingResponse>> {
    let form = form
        .normalized()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let session = &user.session;
    let profile = form.into_profile(&session.user_id, session.email.clone());

    state.profiles.upsert_profile(session, &profile).await?;

    tracing::info!(
        user_id = %session.user_id,
        role = %profile.role,
        "Onboarding completed"
    );

    Ok(Json(OnboardingResponse {
        next: AppRoute::Home.path().to_string(),
    }))
}
