// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Project creation and activity feeds, forwarded to the project API.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{ProjectDraft, Session};
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", post(create_project))
        .route("/api/projects/{id}/activities", get(project_activities))
        .route("/api/alerts", get(alerts))
}

// ─── Create ──────────────────────────────────────────────────

/// Response for a created project.
#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CreateProjectResponse {
    #[cfg_attr(feature = "binding-generation", ts(type = "string | number | null"))]
    pub id: Option<serde_json::Value>,
    pub title: String,
    /// Team members that will receive an invitation
    pub invitations: usize,
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(draft): Json<ProjectDraft>,
) -> Result<Json<CreateProjectResponse>> {
    let invitations = draft.team_members.len();
    let leader_name = leader_name(&state, &user.session).await;

    let payload = draft
        .into_payload(leader_name)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let created = state.api.create_project(&user.session, &payload).await?;

    tracing::info!(
        user_id = %user.session.user_id,
        title = %payload.title,
        invitations,
        "Project created"
    );

    Ok(Json(CreateProjectResponse {
        id: created.id,
        title: created.title.unwrap_or(payload.title),
        invitations,
    }))
}

/// Profile name, else account email, else "Unknown".
async fn leader_name(state: &AppState, session: &Session) -> String {
    let profile_name = match state.profiles.get_profile(session).await {
        Ok(profile) => profile
            .and_then(|p| p.full_name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
        Err(e) => {
            tracing::warn!(error = %e, "Profile lookup failed, using email as leader name");
            None
        }
    };

    profile_name
        .or_else(|| session.email.clone())
        .unwrap_or_else(|| "Unknown".to_string())
}

// ─── Feeds ───────────────────────────────────────────────────

async fn project_activities(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(project_id): Path<String>,
) -> Result<Json<Vec<serde_json::Value>>> {
    let timeline = state
        .api
        .project_timeline(&user.session, &project_id)
        .await?;
    Ok(Json(timeline))
}

async fn alerts(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<serde_json::Value>>> {
    Ok(Json(state.api.all_activities(&user.session).await?))
}
