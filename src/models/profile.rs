//! Profile row stored in the Supabase `profiles` table.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Community role chosen during onboarding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Member,
    Leader,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Leader => "leader",
        }
    }

    /// Display title used on the profile page.
    pub fn title(&self) -> &'static str {
        match self {
            Role::Leader => "Lead Architect & AI Innovator",
            Role::Member => "Full Stack Contributor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "leader" => Ok(Role::Leader),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Onboarding and display metadata for a user.
///
/// A row exists only after the onboarding form was submitted; a missing
/// row means "authenticated but not onboarded".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Same as the session's user id
    pub id: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    /// Null in the table is read as not completed
    #[serde(default)]
    pub onboarding_completed: Option<bool>,
}

impl Profile {
    /// Completed onboarding with a usable name.
    ///
    /// A row flagged complete but without a name is treated as incomplete.
    pub fn is_onboarded(&self) -> bool {
        self.onboarding_completed == Some(true)
            && self
                .full_name
                .as_deref()
                .is_some_and(|n| !n.trim().is_empty())
    }
}

/// Onboarding form submission.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct OnboardingForm {
    #[validate(length(min = 1, max = 100, message = "full name must be 1-100 characters"))]
    pub full_name: String,
    #[serde(default)]
    pub role: Role,
}

impl OnboardingForm {
    /// Trim the name and validate the form.
    pub fn normalized(mut self) -> Result<Self, validator::ValidationErrors> {
        self.full_name = self.full_name.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    /// The complete row written by the onboarding upsert.
    pub fn into_profile(self, user_id: &str, email: Option<String>) -> Profile {
        Profile {
            id: user_id.to_string(),
            full_name: Some(self.full_name),
            email,
            role: self.role,
            onboarding_completed: Some(true),
        }
    }
}
