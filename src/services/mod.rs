// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - clients for the external collaborators.

pub mod api_client;
pub mod profiles;
pub mod session_store;
pub mod supabase_auth;

pub use api_client::{ApiClient, ApiError};
pub use profiles::{MemoryProfileStore, ProfileError, SupabaseProfiles};
pub use session_store::{FixedSession, SessionStore, SessionSubscription};
pub use supabase_auth::{AuthError, OAuthProvider, SignUpOutcome, SupabaseAuth};
