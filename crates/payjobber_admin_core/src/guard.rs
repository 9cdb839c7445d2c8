//! crates/payjobber_admin_core/src/guard.rs
//!
//! Route guarding as a pure decision over a session snapshot and the
//! requirements a route declares.

use crate::domain::SessionSnapshot;

pub const LOGIN_PATH: &str = "/auth/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";
pub const ADMIN_HOME_PATH: &str = "/retiros";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const UPLOAD_PATH: &str = "/retiros/carga-excel";
pub const UPLOAD_LOG_PATH: &str = "/retiros/log";
pub const POLICY_HISTORY_PATH: &str = "/retiros/politicas-historial";

/// Who may enter a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any authenticated session; a non-empty role list also restricts roles.
    Authenticated { roles: Vec<String> },
}

impl Access {
    pub fn any_session() -> Self {
        Access::Authenticated { roles: Vec::new() }
    }

    pub fn roles<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Access::Authenticated {
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub title: String,
    pub access: Access,
}

/// Where a denied navigation is sent instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    Login { return_url: String },
    Unauthorized,
}

impl Redirect {
    pub fn path(&self) -> String {
        match self {
            Redirect::Login { return_url } => {
                format!("{}?returnUrl={}", LOGIN_PATH, urlencoding::encode(return_url))
            }
            Redirect::Unauthorized => UNAUTHORIZED_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectTo(Redirect),
}

/// Decides one navigation attempt to `target` (the full requested path).
pub fn check(session: &SessionSnapshot, target: &str, access: &Access) -> GuardDecision {
    let roles = match access {
        Access::Public => return GuardDecision::Allow,
        Access::Authenticated { roles } => roles,
    };

    if !session.is_authenticated() {
        return GuardDecision::RedirectTo(Redirect::Login {
            return_url: target.to_string(),
        });
    }

    if roles.is_empty() {
        return GuardDecision::Allow;
    }

    match session.role.as_deref() {
        Some(role) if roles.iter().any(|r| r == role) => GuardDecision::Allow,
        _ => GuardDecision::RedirectTo(Redirect::Unauthorized),
    }
}

//=========================================================================================
// Route Table
//=========================================================================================

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    /// Finds the route for a path, ignoring any query string or trailing slash.
    pub fn lookup(&self, target: &str) -> Option<&Route> {
        let path = target.split('?').next().unwrap_or(target);
        let path = match path.trim_end_matches('/') {
            "" => "/",
            trimmed => trimmed,
        };
        self.routes.iter().find(|r| r.path.eq_ignore_ascii_case(path))
    }

    /// Access rules for a path. Paths the table does not know still require
    /// a session.
    pub fn access_for(&self, target: &str) -> Access {
        self.lookup(target)
            .map(|r| r.access.clone())
            .unwrap_or_else(Access::any_session)
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        let route = |path: &str, title: &str, access: Access| Route {
            path: path.to_string(),
            title: title.to_string(),
            access,
        };
        Self::new(vec![
            route(LOGIN_PATH, "Login", Access::Public),
            route(UNAUTHORIZED_PATH, "Unauthorized", Access::Public),
            route(DASHBOARD_PATH, "Dashboard", Access::any_session()),
            route(ADMIN_HOME_PATH, "Withdrawals", Access::roles(["admin"])),
            route(UPLOAD_PATH, "Availability Upload", Access::roles(["admin"])),
            route(UPLOAD_LOG_PATH, "Upload History", Access::roles(["admin"])),
            route(POLICY_HISTORY_PATH, "Policy Acceptance Log", Access::roles(["admin"])),
        ])
    }
}
