// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Synapse-Gate Server
//!
//! Serves the SynapseX web application behind the session and onboarding
//! route guard, backed by Supabase Auth and the project REST API.

use synapse_gate::{
    config::Config,
    services::{ApiClient, SupabaseAuth, SupabaseProfiles},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured JSON logging
    init_logging()?;

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        policy = ?config.profile_error_policy,
        local_jwt = config.supabase_jwt_secret.is_some(),
        "Starting Synapse-Gate"
    );

    let auth = SupabaseAuth::new(&config)?;
    let profiles = Arc::new(SupabaseProfiles::new(&config)?);
    let api = ApiClient::new(&config)?;
    tracing::info!(
        supabase = %config.supabase_url,
        api = %api.base_url(),
        "Upstream clients initialized"
    );

    let state = Arc::new(AppState::new(config.clone(), auth, profiles, api));

    // Build router
    let app = synapse_gate::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("synapse_gate=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
