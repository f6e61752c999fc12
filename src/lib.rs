// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Synapse-Gate: session router guard for the SynapseX student platform
//!
//! This crate serves the single-page application behind a route guard that
//! keeps unauthenticated users on the login pages and sends users who have
//! not finished onboarding to the onboarding page. It also hosts the
//! authentication, onboarding, profile and project API routes.

pub mod config;
pub mod error;
pub mod guard;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use config::Config;
use guard::{ProfileStore, RouteGuard};
use services::{ApiClient, SupabaseAuth};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub auth: SupabaseAuth,
    pub profiles: Arc<dyn ProfileStore>,
    pub guard: RouteGuard,
    pub api: ApiClient,
}

impl AppState {
    /// Assemble the state; the route guard shares the profile store.
    pub fn new(
        config: Config,
        auth: SupabaseAuth,
        profiles: Arc<dyn ProfileStore>,
        api: ApiClient,
    ) -> Self {
        let guard = RouteGuard::new(
            profiles.clone(),
            config.profile_error_policy,
            config.guard_check_timeout,
        );
        Self {
            config,
            auth,
            profiles,
            guard,
            api,
        }
    }
}
