//! Static route table for the single-page application.

use std::fmt;

/// Who may view a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Anyone, signed in or not
    Public,
    /// Any signed-in user, onboarded or not
    RequiresSession,
    /// Signed-in users who finished onboarding
    RequiresOnboarding,
}

/// Known application pages.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AppRoute {
    Root,
    Login,
    SignUp,
    Onboarding,
    Home,
    Community,
    CurrentProject,
    CreateProject,
    Alerts,
    Profile,
    /// Catch-all for paths outside the table
    Unknown(String),
}

impl AppRoute {
    /// Every known page, in table order.
    pub const KNOWN: [AppRoute; 10] = [
        AppRoute::Root,
        AppRoute::Login,
        AppRoute::SignUp,
        AppRoute::Onboarding,
        AppRoute::Home,
        AppRoute::Community,
        AppRoute::CurrentProject,
        AppRoute::CreateProject,
        AppRoute::Alerts,
        AppRoute::Profile,
    ];

    /// Map a request path to a route. Query strings, fragments and a single
    /// trailing slash are ignored.
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or("");
        let trimmed = if path.len() > 1 {
            path.strip_suffix('/').unwrap_or(path)
        } else {
            path
        };

        match trimmed {
            "/" | "" => AppRoute::Root,
            "/login" => AppRoute::Login,
            "/signup" => AppRoute::SignUp,
            "/onboarding" => AppRoute::Onboarding,
            "/home" => AppRoute::Home,
            "/community" => AppRoute::Community,
            "/currentproject" => AppRoute::CurrentProject,
            "/createproject" => AppRoute::CreateProject,
            "/alerts" => AppRoute::Alerts,
            "/profile" => AppRoute::Profile,
            other => AppRoute::Unknown(other.to_string()),
        }
    }

    pub fn path(&self) -> &str {
        match self {
            AppRoute::Root => "/",
            AppRoute::Login => "/login",
            AppRoute::SignUp => "/signup",
            AppRoute::Onboarding => "/onboarding",
            AppRoute::Home => "/home",
            AppRoute::Community => "/community",
            AppRoute::CurrentProject => "/currentproject",
            AppRoute::CreateProject => "/createproject",
            AppRoute::Alerts => "/alerts",
            AppRoute::Profile => "/profile",
            AppRoute::Unknown(path) => path,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            AppRoute::Login | AppRoute::SignUp => Access::Public,
            AppRoute::Root | AppRoute::Onboarding => Access::RequiresSession,
            AppRoute::Home
            | AppRoute::Community
            | AppRoute::CurrentProject
            | AppRoute::CreateProject
            | AppRoute::Alerts
            | AppRoute::Profile
            | AppRoute::Unknown(_) => Access::RequiresOnboarding,
        }
    }

    /// Login or sign-up page.
    pub fn is_auth_page(&self) -> bool {
        matches!(self, AppRoute::Login | AppRoute::SignUp)
    }
}

impl fmt::Display for AppRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
