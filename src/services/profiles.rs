// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Profile storage: the Supabase `profiles` table via PostgREST, plus an
//! in-memory store for tests and offline runs.

use crate::config::Config;
use crate::guard::ProfileStore;
use crate::models::{Profile, Session};
use anyhow::Context;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const PROFILE_COLUMNS: &str = "id,full_name,email,role,onboarding_completed";

/// Profile store errors. A missing row is not an error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProfileError {
    #[error("Not authorized to access profile")]
    Unauthorized,

    #[error("Profile request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Profile request failed: {0}")]
    Transport(String),

    #[error("Unexpected profile response: {0}")]
    Decode(String),
}

/// PostgREST-backed profile store.
#[derive(Clone)]
pub struct SupabaseProfiles {
    http: reqwest::Client,
    table_url: String,
    anon_key: String,
}

impl SupabaseProfiles {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building PostgREST HTTP client")?;

        Ok(Self {
            http,
            table_url: format!("{}/rest/v1/profiles", config.supabase_url),
            anon_key: config.supabase_anon_key.clone(),
        })
    }

    async fn check(&self, response: reqwest::Response) -> Result<reqwest::Response, ProfileError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(ProfileError::Unauthorized);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or(body);
        Err(ProfileError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ProfileStore for SupabaseProfiles {
    async fn get_profile(&self, session: &Session) -> Result<Option<Profile>, ProfileError> {
        let response = self
            .http
            .get(&self.table_url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .query(&[
                ("id", format!("eq.{}", session.user_id)),
                ("select", PROFILE_COLUMNS.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        let rows: Vec<Profile> = self
            .check(response)
            .await?
            .json()
            .await
            .map_err(|e| ProfileError::Decode(e.to_string()))?;

        Ok(rows.into_iter().next())
    }

    async fn upsert_profile(
        &self,
        session: &Session,
        profile: &Profile,
    ) -> Result<(), ProfileError> {
        let response = self
            .http
            .post(&self.table_url)
            .header("apikey", &self.anon_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .bearer_auth(&session.access_token)
            .json(&[profile])
            .send()
            .await
            .map_err(|e| ProfileError::Transport(e.to_string()))?;

        self.check(response).await?;
        tracing::info!(user_id = %profile.id, role = %profile.role, "Profile upserted");
        Ok(())
    }
}

/// In-process profile store.
///
/// Failure and latency can be injected to exercise the guard's fail-closed
/// and timeout paths.
#[derive(Clone, Default)]
pub struct MemoryProfileStore {
    rows: Arc<DashMap<String, Profile>>,
    failing: Arc<AtomicBool>,
    delay: Option<Duration>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn insert(&self, profile: Profile) {
        self.rows.insert(profile.id.clone(), profile);
    }

    pub fn get(&self, user_id: &str) -> Option<Profile> {
        self.rows.get(user_id).map(|p| p.clone())
    }

    /// Make every call fail with a transport error until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    async fn simulate(&self) -> Result<(), ProfileError> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProfileError::Transport("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn get_profile(&self, session: &Session) -> Result<Option<Profile>, ProfileError> {
        self.simulate().await?;
        Ok(self.get(&session.user_id))
    }

    async fn upsert_profile(
        &self,
        session: &Session,
        profile: &Profile,
    ) -> Result<(), ProfileError> {
        self.simulate().await?;
        if profile.id != session.user_id {
            return Err(ProfileError::Unauthorized);
        }
        self.insert(profile.clone());
        Ok(())
    }
}
