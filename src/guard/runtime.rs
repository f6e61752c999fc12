// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Long-lived guard driver for in-process navigation.
//!
//! The runtime re-runs the guard whenever the requested route changes or the
//! session store publishes a change. Each check is tagged with a generation;
//! only the newest generation may publish a decision, and superseded checks
//! are aborted.

use super::check::RouteGuard;
use super::decision::RouteDecision;
use super::route::AppRoute;
use crate::services::session_store::SessionStore;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Performs redirects decided by the guard.
pub trait Navigator: Send + Sync + 'static {
    /// Replace the current location (no new history entry).
    fn replace(&self, route: &AppRoute);
}

/// Published guard state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardState {
    /// A check is in flight; render nothing.
    Checking,
    Decided {
        route: AppRoute,
        decision: RouteDecision,
    },
}

impl GuardState {
    pub fn is_checking(&self) -> bool {
        matches!(self, GuardState::Checking)
    }
}

/// Handle to the running guard loop. Dropping it stops the loop.
pub struct GuardRuntime {
    navigate_tx: mpsc::UnboundedSender<AppRoute>,
    state_rx: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
}

impl GuardRuntime {
    /// Start guarding `initial`. Must be called inside a Tokio runtime.
    pub fn spawn<N: Navigator>(
        guard: RouteGuard,
        store: SessionStore,
        navigator: N,
        initial: AppRoute,
    ) -> Self {
        let (navigate_tx, navigate_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(GuardState::Checking);

        let driver = Driver {
            guard: Arc::new(guard),
            store,
            navigator: Arc::new(navigator),
            state_tx,
            route: initial,
            generation: 0,
            in_flight: None,
        };
        let task = tokio::spawn(driver.run(navigate_rx));

        Self {
            navigate_tx,
            state_rx,
            task,
        }
    }

    /// Request a new page.
    pub fn navigate(&self, path: &str) {
        if self.navigate_tx.send(AppRoute::parse(path)).is_err() {
            tracing::warn!(path, "Guard runtime stopped, navigation ignored");
        }
    }

    /// Current state snapshot.
    pub fn state(&self) -> GuardState {
        self.state_rx.borrow().clone()
    }

    /// Receiver for state changes.
    pub fn watch(&self) -> watch::Receiver<GuardState> {
        self.state_rx.clone()
    }

    /// Wait until the guard leaves `Checking`.
    pub async fn decided(&self) -> GuardState {
        let mut rx = self.state_rx.clone();
        let state = match rx.wait_for(|s| !s.is_checking()).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        };
        state
    }

    /// Stop the loop and any in-flight check.
    pub fn shutdown(self) {
        self.task.abort();
    }
}

impl Drop for GuardRuntime {
    fn drop(&mut self) {
        self.task.abort();
    }
}

type Completion = (u64, RouteDecision);

struct Driver<N: Navigator> {
    guard: Arc<RouteGuard>,
    store: SessionStore,
    navigator: Arc<N>,
    state_tx: watch::Sender<GuardState>,
    route: AppRoute,
    generation: u64,
    in_flight: Option<JoinHandle<()>>,
}

impl<N: Navigator> Driver<N> {
    async fn run(mut self, mut navigate_rx: mpsc::UnboundedReceiver<AppRoute>) {
        let mut sessions = self.store.subscribe();
        let mut sessions_open = true;
        let (done_tx, mut done_rx) = mpsc::unbounded_channel::<Completion>();

        self.start_check(&done_tx);

        loop {
            tokio::select! {
                next = navigate_rx.recv() => match next {
                    Some(route) => {
                        self.route = route;
                        self.start_check(&done_tx);
                    }
                    None => break,
                },
                changed = sessions.changed(), if sessions_open => {
                    if changed {
                        tracing::debug!(route = %self.route, "Session changed, re-checking");
                        self.start_check(&done_tx);
                    } else {
                        sessions_open = false;
                    }
                }
                Some((generation, decision)) = done_rx.recv() => {
                    self.apply(generation, decision, &done_tx);
                }
            }
        }
    }

    fn start_check(&mut self, done_tx: &mpsc::UnboundedSender<Completion>) {
        if let Some(previous) = self.in_flight.take() {
            previous.abort();
        }
        self.generation += 1;
        self.state_tx.send_replace(GuardState::Checking);

        let generation = self.generation;
        let guard = self.guard.clone();
        let store = self.store.clone();
        let route = self.route.clone();
        let done_tx = done_tx.clone();

        self.in_flight = Some(tokio::spawn(async move {
            let decision = guard.check(&store, &route).await;
            let _ = done_tx.send((generation, decision));
        }));
    }

    fn apply(
        &mut self,
        generation: u64,
        decision: RouteDecision,
        done_tx: &mpsc::UnboundedSender<Completion>,
    ) {
        if generation != self.generation {
            tracing::debug!(
                generation,
                current = self.generation,
                "Dropping superseded guard result"
            );
            return;
        }
        self.in_flight = None;

        let redirect = decision
            .target()
            .filter(|target| **target != self.route)
            .cloned();

        self.state_tx.send_replace(GuardState::Decided {
            route: self.route.clone(),
            decision,
        });

        if let Some(target) = redirect {
            tracing::info!(from = %self.route, to = %target, "Guard redirect");
            self.navigator.replace(&target);
            self.route = target;
            self.start_check(done_tx);
        }
    }
}

// Also runs when the driver task is aborted while suspended.
impl<N: Navigator> Drop for Driver<N> {
    fn drop(&mut self) {
        if let Some(handle) = self.in_flight.take() {
            handle.abort();
        }
    }
}
