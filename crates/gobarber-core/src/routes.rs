//! Route guard deciding whether a page renders or redirects.
//!
//! A route is either private (needs a session) or public-only (sign-in and
//! friends). The decision is a pure function of the route and whether a
//! session is present, so it is re-run on every navigation and every
//! session change.

/// Public entry route (the sign-in page)
pub const SIGN_IN_PATH: &str = "/";

/// Where signed-in users land
pub const LANDING_PATH: &str = "/dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    SignIn,
    SignUp,
    ForgotPassword,
    ResetPassword,
    Dashboard,
    Profile,
}

impl Page {
    pub fn title(&self) -> &'static str {
        match self {
            Page::SignIn => "Sign in",
            Page::SignUp => "Sign up",
            Page::ForgotPassword => "Forgot password",
            Page::ResetPassword => "Reset password",
            Page::Dashboard => "Dashboard",
            Page::Profile => "Profile",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub page: Page,
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Render(Page),
    /// `from` is the path that was requested, so the target can send the
    /// user back after signing in
    Redirect { to: &'static str, from: String },
    NotFound,
}

/// Render iff `route.is_private == session_present`
pub fn guard(route: &Route, session_present: bool, requested: &str) -> RouteDecision {
    if route.is_private == session_present {
        RouteDecision::Render(route.page)
    } else {
        let to = if route.is_private { SIGN_IN_PATH } else { LANDING_PATH };
        RouteDecision::Redirect {
            to,
            from: requested.to_string(),
        }
    }
}

pub struct RouteTable {
    routes: Vec<Route>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            routes: vec![
                Route { path: SIGN_IN_PATH, page: Page::SignIn, is_private: false },
                Route { path: "/signup", page: Page::SignUp, is_private: false },
                Route { path: "/forgot-password", page: Page::ForgotPassword, is_private: false },
                Route { path: "/reset-password", page: Page::ResetPassword, is_private: false },
                Route { path: LANDING_PATH, page: Page::Dashboard, is_private: true },
                Route { path: "/profile", page: Page::Profile, is_private: true },
            ],
        }
    }
}

impl RouteTable {
    pub fn find(&self, path: &str) -> Option<&Route> {
        let path = normalize(path);
        self.routes.iter().find(|route| route.path == path)
    }

    pub fn for_page(&self, page: Page) -> Option<&Route> {
        self.routes.iter().find(|route| route.page == page)
    }

    /// Resolve a requested location (query string allowed)
    pub fn resolve(&self, requested: &str, session_present: bool) -> RouteDecision {
        match self.find(requested) {
            Some(route) => guard(route, session_present, requested),
            None => RouteDecision::NotFound,
        }
    }
}

/// Strip the query string and any trailing slash (except on `/` itself)
fn normalize(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        SIGN_IN_PATH
    } else {
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE: Route = Route { path: "/dashboard", page: Page::Dashboard, is_private: true };
    const PUBLIC: Route = Route { path: "/", page: Page::SignIn, is_private: false };

    #[test]
    fn test_guard_all_combinations() {
        assert_eq!(guard(&PRIVATE, true, "/dashboard"), RouteDecision::Render(Page::Dashboard));
        assert_eq!(
            guard(&PRIVATE, false, "/dashboard"),
            RouteDecision::Redirect { to: "/", from: "/dashboard".to_string() }
        );
        assert_eq!(guard(&PUBLIC, false, "/"), RouteDecision::Render(Page::SignIn));
        assert_eq!(
            guard(&PUBLIC, true, "/"),
            RouteDecision::Redirect { to: "/dashboard", from: "/".to_string() }
        );
    }

    #[test]
    fn test_resolve_known_routes() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/profile", true), RouteDecision::Render(Page::Profile));
        assert_eq!(table.resolve("/signup", false), RouteDecision::Render(Page::SignUp));
        assert!(matches!(
            table.resolve("/signup", true),
            RouteDecision::Redirect { to: LANDING_PATH, .. }
        ));
    }

    #[test]
    fn test_resolve_keeps_query_in_from() {
        let table = RouteTable::default();
        assert_eq!(
            table.resolve("/reset-password?token=abc", false),
            RouteDecision::Render(Page::ResetPassword)
        );
        assert_eq!(
            table.resolve("/profile?tab=avatar", false),
            RouteDecision::Redirect { to: "/", from: "/profile?tab=avatar".to_string() }
        );
    }

    #[test]
    fn test_resolve_normalizes_trailing_slash() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/dashboard/", true), RouteDecision::Render(Page::Dashboard));
        assert_eq!(table.resolve("", false), RouteDecision::Render(Page::SignIn));
    }

    #[test]
    fn test_resolve_unknown_route() {
        let table = RouteTable::default();
        assert_eq!(table.resolve("/nowhere", true), RouteDecision::NotFound);
    }

    #[test]
    fn test_for_page() {
        let table = RouteTable::default();
        assert_eq!(table.for_page(Page::Profile).unwrap().path, "/profile");
        assert!(table.for_page(Page::Dashboard).unwrap().is_private);
    }
}
