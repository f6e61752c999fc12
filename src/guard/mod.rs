// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session/onboarding route guard.
//!
//! [`decide_route`] is the pure decision, [`RouteGuard`] gathers the session
//! and profile observations, and [`GuardRuntime`] keeps re-evaluating as the
//! route or the session changes.

pub mod check;
pub mod decision;
pub mod route;
pub mod runtime;

pub use check::RouteGuard;
pub use decision::{
    decide_route, ProfileErrorPolicy, ProfileStatus, RouteDecision, SessionObservation,
};
pub use route::{Access, AppRoute};
pub use runtime::{GuardRuntime, GuardState, Navigator};

use crate::models::{Profile, Session};
use crate::services::profiles::ProfileError;
use crate::services::supabase_auth::AuthError;
use async_trait::async_trait;

/// Supplies the current session, if any.
#[async_trait]
pub trait AuthSessionSource: Send + Sync {
    async fn current_session(&self) -> Result<Option<Session>, AuthError>;
}

/// Profile rows keyed by user id.
///
/// The session is passed whole because row-level security on the backing
/// table needs the user's own access token.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` means no row exists for the session's user.
    async fn get_profile(&self, session: &Session) -> Result<Option<Profile>, ProfileError>;

    /// Insert or fully replace the row keyed by `profile.id`.
    async fn upsert_profile(&self, session: &Session, profile: &Profile)
        -> Result<(), ProfileError>;
}
