// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod profile;
pub mod project;
pub mod session;

pub use profile::{OnboardingForm, Profile, Role};
pub use project::{DraftError, ProjectCreate, ProjectDraft};
pub use session::Session;
