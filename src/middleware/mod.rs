// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Middleware modules (authentication, page guard, security).

pub mod auth;
pub mod guard;
pub mod security;

pub use auth::require_session;
pub use guard::guard_pages;
