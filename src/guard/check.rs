//! Asynchronous session + profile lookup feeding the routing decision.

use super::decision::{
    decide_route, ProfileErrorPolicy, ProfileStatus, RouteDecision, SessionObservation,
};
use super::route::AppRoute;
use super::{AuthSessionSource, ProfileStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};

/// Evaluates the session/onboarding gate against live collaborators.
///
/// Errors from either lookup never escape: they are logged and folded into
/// the observation handed to [`decide_route`].
#[derive(Clone)]
pub struct RouteGuard {
    profiles: Arc<dyn ProfileStore>,
    policy: ProfileErrorPolicy,
    check_timeout: Duration,
}

impl RouteGuard {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        policy: ProfileErrorPolicy,
        check_timeout: Duration,
    ) -> Self {
        Self {
            profiles,
            policy,
            check_timeout,
        }
    }

    pub fn policy(&self) -> ProfileErrorPolicy {
        self.policy
    }

    pub fn profiles(&self) -> &Arc<dyn ProfileStore> {
        &self.profiles
    }

    /// Run the full chain for `route` and return the decision.
    pub async fn check(&self, source: &dyn AuthSessionSource, route: &AppRoute) -> RouteDecision {
        let observation = self.observe(source).await;
        let decision = decide_route(route, &observation, self.policy);
        tracing::debug!(
            route = %route,
            observation = ?observation,
            decision = ?decision,
            "Route guard decided"
        );
        decision
    }

    /// Look up the session, then the profile, within one shared deadline.
    pub async fn observe(&self, source: &dyn AuthSessionSource) -> SessionObservation {
        let deadline = Instant::now() + self.check_timeout;

        let session = match timeout_at(deadline, source.current_session()).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Session lookup failed, treating as signed out");
                None
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "Session lookup timed out, treating as signed out"
                );
                None
            }
        };

        let Some(session) = session else {
            return SessionObservation::NoSession;
        };

        let status = match timeout_at(deadline, self.profiles.get_profile(&session)).await {
            Ok(Ok(Some(profile))) if profile.is_onboarded() => ProfileStatus::Onboarded,
            Ok(Ok(Some(_))) => ProfileStatus::NotOnboarded,
            Ok(Ok(None)) => ProfileStatus::NotFound,
            Ok(Err(e)) => {
                tracing::warn!(user_id = %session.user_id, error = %e, "Profile lookup failed");
                ProfileStatus::FetchFailed
            }
            Err(_) => {
                tracing::warn!(
                    user_id = %session.user_id,
                    timeout_ms = self.check_timeout.as_millis() as u64,
                    "Profile lookup timed out"
                );
                ProfileStatus::FetchFailed
            }
        };

        SessionObservation::Session(status)
    }
}
