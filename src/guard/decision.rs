//! Pure routing decision for the session/onboarding gate.
//!
//! Nothing here performs I/O: the caller gathers a [`SessionObservation`]
//! and feeds it to [`decide_route`].

use super::route::{Access, AppRoute};
use std::str::FromStr;

/// What the profile lookup produced for a signed-in user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStatus {
    Onboarded,
    /// Row exists but onboarding is not complete
    NotOnboarded,
    /// No row for this user yet
    NotFound,
    /// The store failed or timed out
    FetchFailed,
}

/// Session and profile state observed for one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionObservation {
    NoSession,
    Session(ProfileStatus),
}

/// Routing of a failed profile lookup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProfileErrorPolicy {
    /// Fail closed: treat the failure like a missing profile.
    #[default]
    Onboarding,
    /// Hold on the current page and ask the caller to retry.
    Retry,
}

impl FromStr for ProfileErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "onboarding" => Ok(ProfileErrorPolicy::Onboarding),
            "retry" => Ok(ProfileErrorPolicy::Retry),
            other => Err(format!("unknown profile error policy: {}", other)),
        }
    }
}

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Render the requested page.
    Stay,
    /// Replace the current location with another page.
    Redirect(AppRoute),
    /// The profile could not be loaded; show nothing and retry later.
    Retry,
}

impl RouteDecision {
    /// Redirect target, if any.
    pub fn target(&self) -> Option<&AppRoute> {
        match self {
            RouteDecision::Redirect(route) => Some(route),
            _ => None,
        }
    }
}

/// Decide which page a user may see for `route`.
pub fn decide_route(
    route: &AppRoute,
    observation: &SessionObservation,
    policy: ProfileErrorPolicy,
) -> RouteDecision {
    let status = match observation {
        SessionObservation::NoSession => {
            return if route.access() == Access::Public {
                RouteDecision::Stay
            } else {
                RouteDecision::Redirect(AppRoute::Login)
            };
        }
        SessionObservation::Session(status) => *status,
    };

    let onboarded = match (status, policy) {
        (ProfileStatus::Onboarded, _) => true,
        (ProfileStatus::FetchFailed, ProfileErrorPolicy::Retry) => return RouteDecision::Retry,
        (ProfileStatus::NotOnboarded, _)
        | (ProfileStatus::NotFound, _)
        | (ProfileStatus::FetchFailed, ProfileErrorPolicy::Onboarding) => false,
    };

    if !onboarded {
        return if *route == AppRoute::Onboarding {
            RouteDecision::Stay
        } else {
            RouteDecision::Redirect(AppRoute::Onboarding)
        };
    }

    match route {
        AppRoute::Root
        | AppRoute::Login
        | AppRoute::SignUp
        | AppRoute::Onboarding
        | AppRoute::Unknown(_) => RouteDecision::Redirect(AppRoute::Home),
        _ => RouteDecision::Stay,
    }
}
