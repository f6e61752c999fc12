// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Route guard scenarios against in-memory collaborators.
//!
//! Covers the session/onboarding gate, fail-closed handling of profile
//! errors and timeouts, and the long-lived runtime's superseding rules.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use synapse_gate::guard::{
    AppRoute, AuthSessionSource, GuardRuntime, GuardState, Navigator, ProfileErrorPolicy,
    ProfileStore, RouteDecision, RouteGuard,
};
use synapse_gate::models::{Profile, Role, Session};
use synapse_gate::services::{
    AuthError, FixedSession, MemoryProfileStore, ProfileError, SessionStore,
};

mod common;

fn guard(profiles: &MemoryProfileStore, policy: ProfileErrorPolicy) -> RouteGuard {
    RouteGuard::new(Arc::new(profiles.clone()), policy, Duration::from_secs(2))
}

fn signed_in(user_id: &str) -> FixedSession {
    FixedSession(Some(Session::new(user_id, "token")))
}

#[tokio::test]
async fn test_signed_out_user_is_sent_to_login() {
    let profiles = MemoryProfileStore::new();
    let guard = guard(&profiles, ProfileErrorPolicy::Onboarding);

    let decision = guard.check(&FixedSession(None), &AppRoute::Home).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Login));

    let decision = guard.check(&FixedSession(None), &AppRoute::SignUp).await;
    assert_eq!(decision, RouteDecision::Stay);
}

#[tokio::test]
async fn test_user_without_profile_is_sent_to_onboarding() {
    let profiles = MemoryProfileStore::new();
    let guard = guard(&profiles, ProfileErrorPolicy::Onboarding);

    let decision = guard.check(&signed_in("u1"), &AppRoute::Home).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Onboarding));

    let decision = guard.check(&signed_in("u1"), &AppRoute::Onboarding).await;
    assert_eq!(decision, RouteDecision::Stay);
}

#[tokio::test]
async fn test_incomplete_profile_is_sent_to_onboarding() {
    let profiles = MemoryProfileStore::new();
    profiles.insert(Profile {
        id: "u1".to_string(),
        full_name: Some("Ada".to_string()),
        email: None,
        role: Role::Member,
        onboarding_completed: None,
    });
    let guard = guard(&profiles, ProfileErrorPolicy::Onboarding);

    let decision = guard.check(&signed_in("u1"), &AppRoute::Community).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Onboarding));
}

#[tokio::test]
async fn test_onboarded_user_skips_auth_pages() {
    let profiles = MemoryProfileStore::new();
    profiles.insert(common::onboarded_profile("u1"));
    let guard = guard(&profiles, ProfileErrorPolicy::Onboarding);

    for route in [AppRoute::Login, AppRoute::SignUp, AppRoute::Onboarding, AppRoute::Root] {
        let decision = guard.check(&signed_in("u1"), &route).await;
        assert_eq!(decision, RouteDecision::Redirect(AppRoute::Home), "{route}");
    }

    let decision = guard.check(&signed_in("u1"), &AppRoute::Alerts).await;
    assert_eq!(decision, RouteDecision::Stay);
}

#[tokio::test]
async fn test_profile_fetch_failure_fails_closed() {
    let profiles = MemoryProfileStore::new();
    profiles.insert(common::onboarded_profile("u1"));
    profiles.set_failing(true);

    let fail_closed = guard(&profiles, ProfileErrorPolicy::Onboarding);
    let decision = fail_closed.check(&signed_in("u1"), &AppRoute::Profile).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Onboarding));

    let retrying = guard(&profiles, ProfileErrorPolicy::Retry);
    let decision = retrying.check(&signed_in("u1"), &AppRoute::Profile).await;
    assert_eq!(decision, RouteDecision::Retry);
}

#[tokio::test]
async fn test_slow_profile_lookup_times_out() {
    let profiles = MemoryProfileStore::new().with_delay(Duration::from_millis(500));
    profiles.insert(common::onboarded_profile("u1"));
    let guard = RouteGuard::new(
        Arc::new(profiles.clone()),
        ProfileErrorPolicy::Onboarding,
        Duration::from_millis(50),
    );

    let decision = guard.check(&signed_in("u1"), &AppRoute::Home).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Onboarding));
}

struct BrokenSessionSource;

#[async_trait]
impl AuthSessionSource for BrokenSessionSource {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        Err(AuthError::Transport("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_session_lookup_error_counts_as_signed_out() {
    let profiles = MemoryProfileStore::new();
    let guard = guard(&profiles, ProfileErrorPolicy::Onboarding);

    let decision = guard.check(&BrokenSessionSource, &AppRoute::Home).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Login));

    let decision = guard.check(&BrokenSessionSource, &AppRoute::Login).await;
    assert_eq!(decision, RouteDecision::Stay);
}

struct HangingSessionSource;

#[async_trait]
impl AuthSessionSource for HangingSessionSource {
    async fn current_session(&self) -> Result<Option<Session>, AuthError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_session_lookup_timeout_counts_as_signed_out() {
    let profiles = MemoryProfileStore::new();
    let guard = RouteGuard::new(
        Arc::new(profiles),
        ProfileErrorPolicy::Onboarding,
        Duration::from_millis(50),
    );

    let decision = guard.check(&HangingSessionSource, &AppRoute::Home).await;
    assert_eq!(decision, RouteDecision::Redirect(AppRoute::Login));

    let decision = guard.check(&HangingSessionSource, &AppRoute::SignUp).await;
    assert_eq!(decision, RouteDecision::Stay);
}

// ─── Runtime ─────────────────────────────────────────────────

#[derive(Clone, Default)]
struct RecordingNavigator {
    redirects: Arc<Mutex<Vec<AppRoute>>>,
}

impl RecordingNavigator {
    fn redirects(&self) -> Vec<AppRoute> {
        self.redirects.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn replace(&self, route: &AppRoute) {
        self.redirects.lock().unwrap().push(route.clone());
    }
}

/// Wait for the runtime to settle on a page it may stay on.
async fn settled(runtime: &GuardRuntime) -> AppRoute {
    let mut rx = runtime.watch();
    let state = tokio::time::timeout(
        Duration::from_secs(5),
        rx.wait_for(|s| {
            matches!(
                s,
                GuardState::Decided {
                    decision: RouteDecision::Stay,
                    ..
                }
            )
        }),
    )
    .await
    .expect("guard did not settle")
    .expect("guard runtime stopped")
    .clone();

    match state {
        GuardState::Decided { route, .. } => route,
        GuardState::Checking => unreachable!(),
    }
}

#[tokio::test]
async fn test_runtime_redirects_and_follows_sign_in() {
    let profiles = MemoryProfileStore::new();
    profiles.insert(common::onboarded_profile("u1"));
    let store = SessionStore::new(None);
    let navigator = RecordingNavigator::default();

    let runtime = GuardRuntime::spawn(
        guard(&profiles, ProfileErrorPolicy::Onboarding),
        store.clone(),
        navigator.clone(),
        AppRoute::parse("/home"),
    );

    assert_eq!(settled(&runtime).await, AppRoute::Login);
    assert_eq!(navigator.redirects(), vec![AppRoute::Login]);

    // Signing in re-runs the guard on the login page
    let mut rx = runtime.watch();
    store.set(Some(Session::new("u1", "token")));
    rx.wait_for(|s| {
        matches!(s, GuardState::Decided { route: AppRoute::Home, decision: RouteDecision::Stay })
    })
    .await
    .unwrap();
    assert_eq!(navigator.redirects(), vec![AppRoute::Login, AppRoute::Home]);

    runtime.shutdown();
}

#[tokio::test]
async fn test_runtime_drops_superseded_check() {
    let profiles = MemoryProfileStore::new().with_delay(Duration::from_millis(200));
    profiles.insert(common::onboarded_profile("u1"));
    let store = SessionStore::new(Some(Session::new("u1", "token")));
    let navigator = RecordingNavigator::default();

    let runtime = GuardRuntime::spawn(
        guard(&profiles, ProfileErrorPolicy::Onboarding),
        store,
        navigator.clone(),
        AppRoute::parse("/community"),
    );
    runtime.navigate("/alerts");

    let decided = runtime.decided().await;
    assert_eq!(
        decided,
        GuardState::Decided {
            route: AppRoute::Alerts,
            decision: RouteDecision::Stay,
        }
    );
    assert!(navigator.redirects().is_empty());
}

#[tokio::test]
async fn test_sign_out_during_check_wins() {
    let profiles = MemoryProfileStore::new().with_delay(Duration::from_millis(200));
    profiles.insert(common::onboarded_profile("u1"));
    let store = SessionStore::new(Some(Session::new("u1", "token")));
    let navigator = RecordingNavigator::default();

    let runtime = GuardRuntime::spawn(
        guard(&profiles, ProfileErrorPolicy::Onboarding),
        store.clone(),
        navigator.clone(),
        AppRoute::parse("/home"),
    );

    // Let the first check reach the slow profile lookup
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(runtime.state().is_checking());
    store.set(None);

    assert_eq!(settled(&runtime).await, AppRoute::Login);
    assert_eq!(navigator.redirects(), vec![AppRoute::Login]);
}

#[tokio::test]
async fn test_runtime_state_starts_checking() {
    let profiles = MemoryProfileStore::new().with_delay(Duration::from_millis(100));
    let runtime = GuardRuntime::spawn(
        guard(&profiles, ProfileErrorPolicy::Onboarding),
        SessionStore::new(Some(Session::new("u1", "token"))),
        RecordingNavigator::default(),
        AppRoute::Home,
    );
    assert!(runtime.state().is_checking());
}

/// Profile store that counts lookups which ran to completion.
#[derive(Clone)]
struct CountingProfiles {
    inner: MemoryProfileStore,
    delay: Duration,
    completed: Arc<AtomicUsize>,
}

impl CountingProfiles {
    fn new(delay: Duration) -> Self {
        let inner = MemoryProfileStore::new();
        inner.insert(common::onboarded_profile("u1"));
        Self {
            inner,
            delay,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ProfileStore for CountingProfiles {
    async fn get_profile(&self, session: &Session) -> Result<Option<Profile>, ProfileError> {
        tokio::time::sleep(self.delay).await;
        let profile = self.inner.get_profile(session).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        profile
    }

    async fn upsert_profile(
        &self,
        session: &Session,
        profile: &Profile,
    ) -> Result<(), ProfileError> {
        self.inner.upsert_profile(session, profile).await
    }
}

fn counting_runtime(profiles: &CountingProfiles) -> GuardRuntime {
    GuardRuntime::spawn(
        RouteGuard::new(
            Arc::new(profiles.clone()),
            ProfileErrorPolicy::Onboarding,
            Duration::from_secs(2),
        ),
        SessionStore::new(Some(Session::new("u1", "token"))),
        RecordingNavigator::default(),
        AppRoute::Home,
    )
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_check() {
    let profiles = CountingProfiles::new(Duration::from_millis(200));
    let runtime = counting_runtime(&profiles);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(runtime.state().is_checking());
    runtime.shutdown();

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(profiles.completed(), 0);
}

#[tokio::test]
async fn test_dropping_runtime_cancels_in_flight_check() {
    let profiles = CountingProfiles::new(Duration::from_millis(200));
    let runtime = counting_runtime(&profiles);

    tokio::time::sleep(Duration::from_millis(50)).await;
    drop(runtime);

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(profiles.completed(), 0);
}

#[tokio::test]
async fn test_runtime_completes_check_while_running() {
    let profiles = CountingProfiles::new(Duration::from_millis(20));
    let runtime = counting_runtime(&profiles);

    assert_eq!(
        runtime.decided().await,
        GuardState::Decided {
            route: AppRoute::Home,
            decision: RouteDecision::Stay,
        }
    );
    assert_eq!(profiles.completed(), 1);
}
