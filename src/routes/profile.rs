//! Profile card for the signed-in user.

use crate::error::Result;
use crate::middleware::auth::AuthUser;
use crate::models::{Profile, Role};
use crate::AppState;
use axum::{extract::State, routing::get, Extension, Json, Router};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

const GUEST_NAME: &str = "Guest User";
const UNREGISTERED: &str = "UNREGISTERED";
const ROLL_NO_LEN: usize = 8;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile))
}

/// Display-ready profile.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileView {
    pub name: String,
    pub roll_no: String,
    pub role_title: String,
    pub role: String,
    pub onboarding_completed: bool,
}

impl ProfileView {
    /// Roll number is the first characters of the profile row id; a user
    /// without a row is shown as unregistered.
    pub fn from_profile(profile: Option<&Profile>) -> Self {
        let role = profile.map(|p| p.role).unwrap_or(Role::Member);
        let name = profile
            .and_then(|p| p.full_name.as_deref())
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(GUEST_NAME)
            .to_string();
        let roll_no = profile
            .map(|p| p.id.as_str())
            .filter(|id| !id.is_empty())
            .map_or_else(
                || UNREGISTERED.to_string(),
                |id| id.chars().take(ROLL_NO_LEN).collect(),
            );

        Self {
            name,
            roll_no,
            role_title: role.title().to_string(),
            role: role.as_str().to_string(),
            onboarding_completed: profile.is_some_and(Profile::is_onboarded),
        }
    }
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileView>> {
    let profile = state.profiles.get_profile(&user.session).await?;
    Ok(Json(ProfileView::from_profile(profile.as_ref())))
}
