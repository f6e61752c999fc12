//! Authenticated session as issued by Supabase Auth.

use serde::{Deserialize, Serialize};

/// Proof of current authentication.
///
/// Owned by the identity provider; the application only ever holds a
/// cached copy. Renewal keeps `user_id` and swaps the tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Supabase user id (UUID string)
    pub user_id: String,
    /// Bearer access token (a Supabase-issued JWT)
    pub access_token: String,
    /// Refresh token, when the provider handed one out
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Email address, when known
    #[serde(default)]
    pub email: Option<String>,
    /// Access token expiry (Unix seconds)
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl Session {
    /// Build a session with only the identity and access token set.
    pub fn new(user_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            access_token: access_token.into(),
            refresh_token: None,
            email: None,
            expires_at: None,
        }
    }

    /// Same identity, new tokens.
    pub fn is_renewal_of(&self, other: &Session) -> bool {
        self.user_id == other.user_id && self.access_token != other.access_token
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_requires_same_user_and_new_token() {
        let a = Session::new("u1", "t1");
        let b = Session::new("u1", "t2");
        let c = Session::new("u2", "t3");
        assert!(b.is_renewal_of(&a));
        assert!(!a.is_renewal_of(&a));
        assert!(!c.is_renewal_of(&a));
    }
}
