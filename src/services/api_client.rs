// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Client for the project REST API.
//!
//! Every call is authenticated with the user's Supabase access token as a
//! bearer token. There is no retry: failures go straight back to the caller.

use crate::config::Config;
use crate::models::project::{CreatedProject, ProjectCreate};
use crate::models::Session;
use anyhow::Context;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Project API errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ApiError {
    /// No session; nothing was sent.
    #[error("Authentication required. Please log in.")]
    Unauthenticated,

    /// Non-2xx answer; `data` holds the JSON body when it parsed.
    #[error("API error: HTTP {status}")]
    Status {
        status: u16,
        data: Option<serde_json::Value>,
    },

    #[error("API connection error: {0}")]
    Transport(String),

    #[error("API response parse error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Unauthenticated => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Authenticated JSON client for the project API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .context("failed building project API HTTP client")?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one request. `endpoint` starts with `/`.
    pub async fn request<B, T>(
        &self,
        session: Option<&Session>,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = session
            .map(|s| s.access_token.as_str())
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthenticated)?;

        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .http
            .request(method.clone(), url.as_str())
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(%method, endpoint, error = %e, "API connection error");
            ApiError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let data = response.json::<serde_json::Value>().await.ok();
            tracing::warn!(%method, endpoint, status = status.as_u16(), "API returned error status");
            return Err(ApiError::Status {
                status: status.as_u16(),
                data,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        session: Option<&Session>,
        endpoint: &str,
    ) -> Result<T, ApiError> {
        self.request::<(), T>(session, Method::GET, endpoint, None)
            .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: Option<&Session>,
        endpoint: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.request(session, Method::POST, endpoint, Some(body))
            .await
    }

    pub async fn create_project(
        &self,
        session: &Session,
        project: &ProjectCreate,
    ) -> Result<CreatedProject, ApiError> {
        self.post(Some(session), "/projects/", project).await
    }

    /// Activity timeline for one project.
    pub async fn project_timeline(
        &self,
        session: &Session,
        project_id: &str,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let endpoint = format!("/projects/{}/activities", urlencoding::encode(project_id));
        self.get(Some(session), &endpoint).await
    }

    /// Activity feed across the user's projects.
    pub async fn all_activities(
        &self,
        session: &Session,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        self.get(Some(session), "/activities").await
    }
}
